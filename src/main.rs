use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use tracing_subscriber::EnvFilter;

use chrono::Utc;
use context_engine::anchors::{format_anchor_status, now_iso8601, AnchorManager, AnchorSummary};
use context_engine::config::{
    find_project_root, init_project, load_config, load_current_context, save_current_context,
    CurrentContext, REPO_MAP_PATH,
};
use context_engine::context::{BpeTokenizer, ContextAssembler, HeuristicTokenizer, Tokenizer};
use context_engine::errors::{ContextEngineError, Result};
use context_engine::extraction::{GrammarRegistry, SymbolExtractor};
use context_engine::health::{check_health, Severity};
use context_engine::index::{build_index, get_index_path, load_index, save_index};
use context_engine::packets::{create_packet, transition_packet, NewPacket};
use context_engine::pool::default_workers;
use context_engine::search::{SearchKind, SearchOptions, Searcher};
use context_engine::store::{DocumentStore, FsDocumentStore};
use context_engine::types::*;
use context_engine::vcs::GitRevisionSource;

/// Context curation for AI-assisted development.
#[derive(Parser)]
#[command(name = "ce", version, about = "Semantic anchors and token-bounded context packs")]
struct Cli {
    /// Project root (default: nearest directory containing `context/`)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the context directory layout and default config
    Init {
        /// Project name recorded in the config
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List the symbols extracted from a source file
    Symbols {
        file: PathBuf,
        /// Only list symbols of this kind (function, class, method, ...)
        #[arg(short, long, value_parser = parse_symbol_kind)]
        kind: Option<SymbolKind>,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Manage work packets
    Packet {
        #[command(subcommand)]
        command: PacketCommands,
    },
    /// Make a packet the current one
    Switch { packet: String },
    /// Manage semantic anchors
    Anchor {
        #[command(subcommand)]
        command: AnchorCommands,
    },
    /// Assemble a context pack for a packet
    Assemble {
        /// Packet id (default: the current packet)
        packet: Option<String>,
        /// Token budget for the whole pack
        #[arg(short = 't', long, default_value = "8000")]
        max_tokens: usize,
        /// Write the pack to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Count tokens as chars/4 instead of with the gpt-4 encoding
        #[arg(long)]
        approximate: bool,
    },
    /// Build and save the keyword index
    Index,
    /// Search packets, decision records, journal entries, and the repo map
    Query {
        text: String,
        /// Boost results by relevance to this packet
        #[arg(long)]
        packet: Option<String>,
        /// Maximum results
        #[arg(short = 'n', long, default_value = "10")]
        max: usize,
        /// Comma-separated kinds: packet,adr,journal,repo-map
        #[arg(short = 't', long = "type", value_delimiter = ',', value_parser = parse_search_kind)]
        kinds: Vec<SearchKind>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report anchor drift, packets without anchors, and stale packets
    Health {
        /// Exit with status 1 if any issue is found
        #[arg(long)]
        fail: bool,
    },
}

#[derive(Subcommand)]
enum PacketCommands {
    /// Create a draft packet
    Create {
        /// feat, bug, chore, refactor, docs, or test
        #[arg(value_parser = parse_packet_type)]
        packet_type: PacketType,
        title: String,
        #[arg(short, long)]
        goal: String,
        /// Definition of Done item (repeatable)
        #[arg(short, long = "dod", required = true)]
        dod: Vec<String>,
        /// Constraint (repeatable)
        #[arg(short, long = "constraint")]
        constraints: Vec<String>,
    },
    /// Set a packet to active
    Start { packet: String },
    /// Mark a packet as blocked
    Block { packet: String },
    /// Mark a packet as completed and move it to the completed set
    Complete { packet: String },
    /// Cancel a packet
    Cancel { packet: String },
    /// Show a packet's status
    Status { packet: String },
}

#[derive(Subcommand)]
enum AnchorCommands {
    /// Anchor a symbol into a packet
    Add {
        packet: String,
        file: PathBuf,
        symbol: String,
    },
    /// Check a packet's anchors for drift
    Check { packet: String },
    /// Refresh every anchor that is not valid
    Refresh { packet: String },
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr, filtered by `CE_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_env("CE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { name } => {
            let root = match cli.path {
                Some(p) => p,
                None => std::env::current_dir()?,
            };
            let name = name.unwrap_or_else(|| {
                root.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "project".to_string())
            });
            init_project(&root, &name)?;
            println!("Initialized context at {}", root.display());
        }
        Commands::Symbols { file, kind, json } => {
            let root = resolve_root(cli.path)?;
            let file = resolve_file(&root, &file);
            let language = detect_language(&file)?;
            let source = fs::read_to_string(&file)?;
            let registry = GrammarRegistry::new();
            let mut symbols = SymbolExtractor::new(&registry).find_all_symbols(&source, language)?;
            if let Some(kind) = kind {
                symbols.retain(|s| s.kind == kind);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&symbols)?);
            } else if symbols.is_empty() {
                println!("No symbols found in {}", file.display());
            } else {
                for s in &symbols {
                    println!(
                        "{} ({}) {}-{}",
                        s.name,
                        s.kind.as_str(),
                        s.start_line,
                        s.end_line
                    );
                    println!("  {}", s.signature);
                }
            }
        }
        Commands::Anchor { command } => {
            let root = resolve_root(cli.path)?;
            run_anchor(&root, command)?;
        }
        Commands::Packet { command } => {
            let root = resolve_root(cli.path)?;
            run_packet(&root, command)?;
        }
        Commands::Switch { packet: id } => {
            let root = resolve_root(cli.path)?;
            let store = FsDocumentStore::new(&root);
            let packet = store.load_packet(&id)?;
            save_current_context(
                &root,
                &CurrentContext {
                    packet_id: Some(packet.id.clone()),
                    switched_at: Some(now_iso8601()),
                },
            )?;
            println!("Switched to: {}", packet.id);
            print_packet_summary(&packet);
            println!("\nQuick actions:");
            println!("  ce assemble                 Assemble context pack");
            println!("  ce anchor check {}    Check for drift", packet.id);
        }
        Commands::Assemble {
            packet,
            max_tokens,
            out,
            approximate,
        } => {
            let root = resolve_root(cli.path)?;
            let packet = match packet {
                Some(id) => id,
                None => load_current_context(&root)?
                    .and_then(|c| c.packet_id)
                    .ok_or_else(|| ContextEngineError::InvalidOperation {
                        message: "No packet given and no current packet (run `ce switch <id>`)"
                            .to_string(),
                    })?,
            };
            let config = load_config(&root)?;
            let store = FsDocumentStore::new(&root);
            let tokenizer: Box<dyn Tokenizer> = if approximate {
                Box::new(HeuristicTokenizer::default())
            } else {
                Box::new(BpeTokenizer::cl100k()?)
            };
            let options = AssembleOptions {
                max_tokens,
                out_file: out,
            };
            let pack = ContextAssembler::new(&store, tokenizer.as_ref(), &config.relevance)
                .assemble(&packet, &options)?;
            match &options.out_file {
                Some(path) => {
                    fs::write(path, &pack)?;
                    println!(
                        "Context pack written to {} ({} tokens)",
                        path.display(),
                        tokenizer.count_tokens(&pack)
                    );
                }
                None => println!("{}", pack),
            }
        }
        Commands::Index => {
            let root = resolve_root(cli.path)?;
            let store = FsDocumentStore::new(&root);
            let index = build_index(&store)?;
            save_index(&root, &index)?;
            println!(
                "Indexed {} documents ({} symbols, {}) into {}",
                index.entries.len(),
                index.symbol_map.len(),
                plural(index.path_map.len(), "path"),
                get_index_path(&root).display()
            );
        }
        Commands::Query {
            text,
            packet,
            max,
            kinds,
            json,
        } => {
            let root = resolve_root(cli.path)?;
            let config = load_config(&root)?;
            let store = FsDocumentStore::new(&root);
            let index = match load_index(&root)? {
                Some(index) => index,
                None => build_index(&store)?,
            };
            let repo_map = fs::read_to_string(root.join(REPO_MAP_PATH)).ok();
            let mut searcher = Searcher::new(&store, &index, &config.relevance);
            if let Some(repo_map) = &repo_map {
                searcher = searcher.with_repo_map(repo_map);
            }
            let options = SearchOptions {
                max_results: max,
                kinds,
                packet_id: packet,
            };
            let results = searcher.search(&text, &options)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No results found");
            } else {
                println!("Found {}:\n", plural(results.len(), "result"));
                for result in &results {
                    println!("[{}] {}", result.kind.as_str().to_uppercase(), result.title);
                    println!("  Id: {}", result.id);
                    println!("  Score: {:.2}", result.score);
                    if !result.matches.is_empty() {
                        println!("  Matches: {}", result.matches.join(", "));
                    }
                    if !result.snippet.is_empty() {
                        let snippet: String = result
                            .snippet
                            .replace('\n', " ")
                            .chars()
                            .take(100)
                            .collect();
                        println!("  Snippet: {snippet}...");
                    }
                    println!();
                }
            }
        }
        Commands::Health { fail } => {
            let root = resolve_root(cli.path)?;
            let store = FsDocumentStore::new(&root);
            let registry = GrammarRegistry::new();
            let revisions = GitRevisionSource::new(&root);
            let manager = AnchorManager::new(&registry, &root, &revisions);
            let report = check_health(&root, &store, &manager, Utc::now())?;

            println!("Context Health Report\n");
            if report.is_healthy() {
                println!("✓ All checks passed!\n");
            }
            for (severity, heading, icon) in [
                (Severity::Error, "Errors:", "✗"),
                (Severity::Warning, "Warnings:", "⚠"),
            ] {
                let issues: Vec<_> = report.issues_with(severity).collect();
                if issues.is_empty() {
                    continue;
                }
                println!("{heading}");
                for issue in issues {
                    println!("  {icon} {}", issue.message);
                }
                println!();
            }
            let mark = |ok: bool| if ok { "✓" } else { "⚠" };
            println!("Summary:");
            println!("  {} Semantic drift: {}", mark(report.drift_count == 0), report.drift_count);
            println!("  {} Orphan packets: {}", mark(report.orphan_count == 0), report.orphan_count);
            println!("  {} Stale packets: {}", mark(report.stale_count == 0), report.stale_count);
            println!(
                "  {} Repo map: {}",
                mark(!report.missing_repo_map),
                if report.missing_repo_map { "missing" } else { "present" }
            );
            if fail && !report.is_healthy() {
                process::exit(1);
            }
        }
    }
    Ok(())
}

fn run_anchor(root: &Path, command: AnchorCommands) -> Result<()> {
    let store = FsDocumentStore::new(root);
    let registry = GrammarRegistry::new();
    let revisions = GitRevisionSource::new(root);
    let manager = AnchorManager::new(&registry, root, &revisions);

    match command {
        AnchorCommands::Add {
            packet,
            file,
            symbol,
        } => {
            let mut packet = store.load_packet(&packet)?;
            let anchor = manager.anchor_symbol(&resolve_file(root, &file), &symbol)?;
            println!(
                "Anchored {} ({}) in {}",
                anchor.symbol,
                anchor.symbol_type.as_str(),
                anchor.path
            );
            match packet
                .repo_truth
                .iter_mut()
                .find(|a| a.path == anchor.path && a.symbol == anchor.symbol)
            {
                Some(existing) => *existing = anchor,
                None => packet.repo_truth.push(anchor),
            }
            packet.metadata.updated_at = now_iso8601();
            store.save_packet(&packet)?;
        }
        AnchorCommands::Check { packet: id } => {
            let packet = store.load_packet(&id)?;
            if packet.repo_truth.is_empty() {
                println!("No anchors defined for this packet");
                return Ok(());
            }
            let results = manager.check_all(&packet.repo_truth, default_workers());
            for result in &results {
                println!("  {}", format_anchor_status(result));
            }
            let summary = AnchorSummary::from_results(&results);
            println!(
                "\nSummary: {} valid, {} drifted, {} deleted",
                summary.valid, summary.drifted, summary.deleted
            );
            if summary.has_issues() {
                println!("\nTo refresh anchors:\n  ce anchor refresh {}", id);
                process::exit(1);
            }
        }
        AnchorCommands::Refresh { packet: id } => {
            let mut packet = store.load_packet(&id)?;
            let results = manager.check_all(&packet.repo_truth, default_workers());
            if results.iter().all(|r| r.status == DriftStatus::Valid) {
                println!("All anchors are already valid");
                return Ok(());
            }

            let mut refreshed = 0;
            let mut failed = 0;
            for (anchor, result) in packet.repo_truth.iter_mut().zip(&results) {
                if result.status == DriftStatus::Valid {
                    continue;
                }
                match manager.refresh_anchor(anchor) {
                    Ok(updated) => {
                        *anchor = updated;
                        refreshed += 1;
                    }
                    Err(e) => {
                        eprintln!("  ✗ {}: {}", anchor.symbol, e);
                        failed += 1;
                    }
                }
            }

            packet.metadata.updated_at = now_iso8601();
            store.save_packet(&packet)?;
            println!("Refreshed {}", plural(refreshed, "anchor"));
            if failed > 0 {
                println!("Failed to refresh {}", plural(failed, "anchor"));
            }
        }
    }
    Ok(())
}

fn run_packet(root: &Path, command: PacketCommands) -> Result<()> {
    let store = FsDocumentStore::new(root);
    let (id, next) = match command {
        PacketCommands::Create {
            packet_type,
            title,
            goal,
            dod,
            constraints,
        } => {
            let packet = create_packet(
                &store,
                NewPacket {
                    packet_type,
                    title,
                    goal,
                    dod,
                    constraints,
                },
                &now_iso8601(),
            )?;
            println!("Created packet: {}", packet.id);
            println!("\nNext steps:");
            println!("  ce packet start {}", packet.id);
            println!("  ce anchor add {} <file> <symbol>", packet.id);
            return Ok(());
        }
        PacketCommands::Status { packet } => {
            let packet = store.load_packet(&packet)?;
            println!("Packet: {}", packet.id);
            print_packet_summary(&packet);
            println!("  DoD: {}", plural(packet.dod.len(), "item"));
            println!("  Created: {}", packet.metadata.created_at);
            println!("  Updated: {}", packet.metadata.updated_at);
            return Ok(());
        }
        PacketCommands::Start { packet } => (packet, PacketStatus::Active),
        PacketCommands::Block { packet } => (packet, PacketStatus::Blocked),
        PacketCommands::Complete { packet } => (packet, PacketStatus::Completed),
        PacketCommands::Cancel { packet } => (packet, PacketStatus::Cancelled),
    };

    let packet = transition_packet(&store, &id, next, &now_iso8601())?;
    println!("Packet {} status changed to {}", packet.id, packet.status.as_str());
    Ok(())
}

fn print_packet_summary(packet: &Packet) {
    println!("  Title: {}", packet.title);
    println!("  Status: {}", packet.status.as_str());
    println!("  Goal: {}", packet.goal);
    println!("  Anchors: {}", packet.repo_truth.len());
}

fn parse_symbol_kind(s: &str) -> std::result::Result<SymbolKind, String> {
    SymbolKind::from_str(s).ok_or_else(|| format!("unknown symbol kind '{s}'"))
}

fn parse_packet_type(s: &str) -> std::result::Result<PacketType, String> {
    PacketType::from_str(s).ok_or_else(|| {
        let valid: Vec<&str> = PacketType::ALL.iter().map(PacketType::as_str).collect();
        format!("invalid packet type '{s}' (valid: {})", valid.join(", "))
    })
}

fn parse_search_kind(s: &str) -> std::result::Result<SearchKind, String> {
    SearchKind::from_str(s.trim()).ok_or_else(|| format!("unknown result type '{s}'"))
}

/// Uses `--path` if given, otherwise the nearest ancestor with a `context/`
/// directory.
fn resolve_root(path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(p) = path {
        return Ok(p);
    }
    let cwd = std::env::current_dir()?;
    find_project_root(&cwd).ok_or_else(|| ContextEngineError::NotFound {
        message: "Not a context project (run `ce init` first)".to_string(),
        path: cwd.display().to_string(),
    })
}

fn resolve_file(root: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        root.join(file)
    }
}

fn detect_language(file: &Path) -> Result<Language> {
    let name = file.to_string_lossy();
    Language::from_path(&name).ok_or_else(|| ContextEngineError::UnsupportedLanguage {
        language: file
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default(),
    })
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
