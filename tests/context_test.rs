use std::fs;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use context_engine::config::RelevanceConfig;
use context_engine::context::*;
use context_engine::errors::ContextEngineError;
use context_engine::store::FsDocumentStore;
use context_engine::types::*;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn packet_md(related_adr: &str) -> String {
    format!(
        r#"---
id: FEAT-001
type: feat
title: OAuth Login Feature
status: active
goal: Implement OAuth authentication
dod:
  - Login works
constraints:
  - No new services
repo_truth:
  - path: src/auth/oauth.ts
    symbol: handleOAuthCallback
    language: ts
    symbol_type: function
    anchor_type: semantic_hash
    semantic_hash: sha256:1111111111111111111111111111111111111111111111111111111111111111
    git_ref: abc1234
    captured_at: 2026-03-01T00:00:00.000Z
metadata:
  related_adrs:
    - {related_adr}
---
"#
    )
}

fn adr_md(id: &str, title: &str, decision: &str, area: &str) -> String {
    format!(
        "---\nid: {id}\ntitle: {title}\nstatus: accepted\ndecision: {decision}\nconsequences: []\naffected_areas:\n  - {area}\ncreated_at: 2026-01-10\n---\n"
    )
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "context/packets/active/FEAT-001.md",
        &packet_md("ADR-001"),
    );
    write(
        dir.path(),
        "context/adrs/ADR-001.md",
        &adr_md(
            "ADR-001",
            "Use OAuth",
            "Decided to use OAuth for authentication",
            "src/auth",
        ),
    );
    write(
        dir.path(),
        "context/adrs/ADR-002.md",
        &adr_md("ADR-002", "Billing cadence", "Invoices go out monthly", "billing"),
    );
    write(dir.path(), "context/adrs/broken.md", "---\nid: [\n---\n");

    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    write(
        dir.path(),
        "context/journal/current.md",
        &format!(
            "## [{now}] FEAT-001\n**Packet:** FEAT-001\n**Commit:** cafebabe1234\n\n### Changed Files\n- src/auth/oauth.ts\n\n### Summary\nWired the OAuth callback into the login route\n\n\
## [2020-01-01T00:00:00.000Z] FEAT-000\n**Packet:** FEAT-000\n**Commit:** deadbeef5678\n\n### Summary\nAncient OAuth work\n"
        ),
    );
    dir
}

#[test]
fn test_assemble_full_pack() {
    let dir = project();
    let store = FsDocumentStore::new(dir.path());
    let tokenizer = HeuristicTokenizer::default();
    let config = RelevanceConfig::default();

    let pack = ContextAssembler::new(&store, &tokenizer, &config)
        .assemble("FEAT-001", &AssembleOptions::default())
        .unwrap();

    assert!(pack.starts_with("# Context Pack: FEAT-001"));
    assert!(pack.contains("## Constraints\n- No new services"));
    assert!(pack.contains("## Repo Truth (Semantic Anchors)"));
    assert!(pack.contains("`sha256:1111111111111...`"));
    assert!(pack.contains("## Rules for Agent"));
    assert!(pack.contains("## Related Context"));
    assert!(pack.contains("**Use OAuth** (score:"));
    assert!(pack.contains("explicit_link: linked in packet"));
    assert!(pack.contains("### Recent Journal Entries"));
    assert!(pack.contains("**Journal: Wired the OAuth callback into the login route...**"));
    assert!(!pack.contains("Ancient OAuth work"));
}

#[test]
fn test_pack_respects_token_budget() {
    let dir = project();
    for i in 0..60 {
        write(
            dir.path(),
            &format!("context/adrs/ADR-1{i:02}.md"),
            &adr_md(
                &format!("ADR-1{i:02}"),
                &format!("OAuth authentication decision number {i} with a long descriptive title"),
                "Implement OAuth login feature handling with refresh tokens and session storage",
                "src/auth",
            ),
        );
    }
    let store = FsDocumentStore::new(dir.path());
    let tokenizer = HeuristicTokenizer::default();
    let config = RelevanceConfig::default();
    let assembler = ContextAssembler::new(&store, &tokenizer, &config);

    for max_tokens in [8000, 1500, 900] {
        let options = AssembleOptions {
            max_tokens,
            out_file: None,
        };
        let pack = assembler.assemble("FEAT-001", &options).unwrap();
        assert!(
            tokenizer.count_tokens(&pack) <= max_tokens,
            "{} tokens over a budget of {max_tokens}",
            tokenizer.count_tokens(&pack)
        );
    }
}

#[test]
fn test_related_context_omitted_when_nothing_relevant() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "context/packets/active/FEAT-001.md",
        &packet_md("ADR-999"),
    );
    write(
        dir.path(),
        "context/adrs/ADR-002.md",
        &adr_md("ADR-002", "Billing cadence", "Invoices go out monthly", "billing"),
    );
    let store = FsDocumentStore::new(dir.path());
    let tokenizer = HeuristicTokenizer::default();
    let config = RelevanceConfig::default();

    let pack = ContextAssembler::new(&store, &tokenizer, &config)
        .assemble("FEAT-001", &AssembleOptions::default())
        .unwrap();
    assert!(!pack.contains("## Related Context"));
    assert_eq!(pack.matches(SECTION_SEPARATOR).count(), 2);
}

#[test]
fn test_missing_packet_fails_assembly() {
    let dir = project();
    let store = FsDocumentStore::new(dir.path());
    let tokenizer = HeuristicTokenizer::default();
    let config = RelevanceConfig::default();
    let err = ContextAssembler::new(&store, &tokenizer, &config)
        .assemble("FEAT-404", &AssembleOptions::default())
        .unwrap_err();
    assert!(matches!(err, ContextEngineError::NotFound { .. }));
}

#[test]
fn test_assembly_is_repeatable() {
    let dir = project();
    let store = FsDocumentStore::new(dir.path());
    let tokenizer = HeuristicTokenizer::default();
    let config = RelevanceConfig::default();
    let assembler = ContextAssembler::new(&store, &tokenizer, &config);
    let now = Utc::now();
    let options = AssembleOptions::default();
    assert_eq!(
        assembler.assemble_at("FEAT-001", &options, now).unwrap(),
        assembler.assemble_at("FEAT-001", &options, now).unwrap()
    );
}

#[test]
fn test_journal_candidate_ids() {
    assert_eq!(journal_id("cafebabe1234"), "journal-cafebabe");
    assert_eq!(journal_id("abc"), "journal-abc");
}

#[test]
fn test_pack_respects_gpt4_token_budget() {
    let dir = project();
    for i in 0..40 {
        write(
            dir.path(),
            &format!("context/adrs/ADR-2{i:02}.md"),
            &adr_md(
                &format!("ADR-2{i:02}"),
                &format!("OAuth callback handling rule {i} fn(a:&[u8])->Option<(u8,u8)>"),
                "Implement OAuth login with handleOAuthCallback(req.query.code?.trim()!)",
                "src/auth",
            ),
        );
    }
    let store = FsDocumentStore::new(dir.path());
    let tokenizer = BpeTokenizer::cl100k().unwrap();
    let config = RelevanceConfig::default();
    let assembler = ContextAssembler::new(&store, &tokenizer, &config);

    for max_tokens in [8000, 1200] {
        let options = AssembleOptions {
            max_tokens,
            out_file: None,
        };
        let pack = assembler.assemble("FEAT-001", &options).unwrap();
        assert!(tokenizer.count_tokens(&pack) <= max_tokens);
    }
}
