use std::fs;
use std::path::{Component, Path};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::errors::{ContextEngineError, Result};
use crate::extraction::{GrammarRegistry, SymbolExtractor};
use crate::pool::map_bounded;
use crate::types::*;
use crate::vcs::RevisionSource;

/// Creates, drift-checks, and refreshes semantic anchors against the files
/// under a project root.
pub struct AnchorManager<'a> {
    extractor: SymbolExtractor<'a>,
    root: &'a Path,
    revisions: &'a dyn RevisionSource,
}

/// Counts of check outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnchorSummary {
    pub valid: usize,
    pub drifted: usize,
    pub deleted: usize,
}

impl AnchorSummary {
    pub fn from_results(results: &[AnchorCheckResult]) -> Self {
        let mut summary = AnchorSummary::default();
        for result in results {
            match result.status {
                DriftStatus::Valid => summary.valid += 1,
                DriftStatus::SemanticDrift => summary.drifted += 1,
                DriftStatus::Deleted => summary.deleted += 1,
            }
        }
        summary
    }

    /// Returns `true` if any anchor needs attention.
    pub fn has_issues(&self) -> bool {
        self.drifted > 0 || self.deleted > 0
    }
}

impl<'a> AnchorManager<'a> {
    /// Creates a manager for files under `root`.
    pub fn new(
        registry: &'a GrammarRegistry,
        root: &'a Path,
        revisions: &'a dyn RevisionSource,
    ) -> Self {
        Self {
            extractor: SymbolExtractor::new(registry),
            root,
            revisions,
        }
    }

    /// Captures an anchor for an already-extracted symbol.
    ///
    /// The symbol's hash, signature, and lines are copied verbatim; the
    /// revision and timestamp are taken now.
    pub fn create_anchor(&self, file_path: &Path, symbol: &Symbol) -> Result<SemanticAnchor> {
        let git_ref = self.revisions.current_revision()?;
        Ok(SemanticAnchor {
            path: self.relative_path(file_path)?,
            symbol: symbol.name.clone(),
            language: symbol.language,
            symbol_type: symbol.kind,
            anchor_type: AnchorType::SemanticHash,
            semantic_hash: symbol.content_hash.clone(),
            git_ref,
            captured_at: now_iso8601(),
            signature: Some(symbol.signature.clone()),
            line_start: Some(symbol.start_line),
            line_end: Some(symbol.end_line),
        })
    }

    /// Reads `file_path`, finds `symbol_name`, and anchors it.
    pub fn anchor_symbol(&self, file_path: &Path, symbol_name: &str) -> Result<SemanticAnchor> {
        let full_path = if file_path.is_absolute() {
            file_path.to_path_buf()
        } else {
            self.root.join(file_path)
        };
        let display = self.relative_path(&full_path)?;
        let language = Language::from_path(&display).ok_or_else(|| {
            ContextEngineError::UnsupportedLanguage {
                language: display.rsplit('.').next().unwrap_or_default().to_string(),
            }
        })?;
        if !full_path.is_file() {
            return Err(ContextEngineError::NotFound {
                message: format!("File not found: {display}"),
                path: display,
            });
        }
        let content = fs::read_to_string(&full_path)?;
        let symbol = self
            .extractor
            .find_symbol(&content, symbol_name, language)?
            .ok_or_else(|| ContextEngineError::NotFound {
                message: format!("Symbol '{symbol_name}' not found in {display}"),
                path: display.clone(),
            })?;
        self.create_anchor(&full_path, &symbol)
    }

    /// Compares an anchor against the current source.
    ///
    /// Always returns one of `valid`, `semantic_drift`, or `deleted`. Files or
    /// symbols that cannot be located are reported as `deleted`.
    pub fn check_anchor(&self, anchor: &SemanticAnchor) -> AnchorCheckResult {
        let result = match self.resolve(anchor) {
            Ok(symbol) if symbol.content_hash == anchor.semantic_hash => AnchorCheckResult {
                anchor: anchor.clone(),
                status: DriftStatus::Valid,
                message: "Anchor is valid".to_string(),
                current_hash: Some(symbol.content_hash),
            },
            Ok(symbol) => AnchorCheckResult {
                anchor: anchor.clone(),
                status: DriftStatus::SemanticDrift,
                message: format!("Semantic drift detected in '{}'", anchor.symbol),
                current_hash: Some(symbol.content_hash),
            },
            Err(ContextEngineError::NotFound { message, .. }) => AnchorCheckResult {
                anchor: anchor.clone(),
                status: DriftStatus::Deleted,
                message,
                current_hash: None,
            },
            Err(e) => {
                warn!(path = %anchor.path, symbol = %anchor.symbol, error = %e, "anchor could not be checked");
                AnchorCheckResult {
                    anchor: anchor.clone(),
                    status: DriftStatus::Deleted,
                    message: format!("Cannot read '{}': {e}", anchor.path),
                    current_hash: None,
                }
            }
        };
        debug!(symbol = %anchor.symbol, status = result.status.as_str(), "checked anchor");
        result
    }

    /// Checks many anchors on a bounded worker pool.
    ///
    /// Results are in the same order as `anchors`.
    pub fn check_all(&self, anchors: &[SemanticAnchor], workers: usize) -> Vec<AnchorCheckResult> {
        map_bounded(anchors, workers, |anchor| self.check_anchor(anchor))
    }

    /// Recomputes an anchor from the current source.
    ///
    /// Path, symbol, language, and kind are kept; hash, signature, lines,
    /// revision, and timestamp are replaced together. Fails with `NotFound`
    /// when the file or symbol is gone.
    pub fn refresh_anchor(&self, anchor: &SemanticAnchor) -> Result<SemanticAnchor> {
        let symbol = self.resolve(anchor)?;
        let git_ref = self.revisions.current_revision()?;
        Ok(SemanticAnchor {
            semantic_hash: symbol.content_hash,
            git_ref,
            captured_at: now_iso8601(),
            signature: Some(symbol.signature),
            line_start: Some(symbol.start_line),
            line_end: Some(symbol.end_line),
            ..anchor.clone()
        })
    }

    fn resolve(&self, anchor: &SemanticAnchor) -> Result<Symbol> {
        let full_path = self.root.join(&anchor.path);
        if !full_path.is_file() {
            return Err(ContextEngineError::NotFound {
                message: format!("File not found: {}", anchor.path),
                path: anchor.path.clone(),
            });
        }
        let content = fs::read_to_string(&full_path)?;
        self.extractor
            .find_symbol(&content, &anchor.symbol, anchor.language)?
            .ok_or_else(|| ContextEngineError::NotFound {
                message: format!("Symbol '{}' not found in {}", anchor.symbol, anchor.path),
                path: anchor.path.clone(),
            })
    }

    /// Renders `file_path` relative to the root with forward slashes.
    ///
    /// Files outside the root cannot be checked later, so they are rejected.
    fn relative_path(&self, file_path: &Path) -> Result<String> {
        let outside = || ContextEngineError::NotFound {
            message: format!("{} is outside the project root", file_path.display()),
            path: file_path.display().to_string(),
        };
        let relative = match file_path.strip_prefix(self.root) {
            Ok(relative) => relative,
            Err(_) if file_path.is_absolute() => return Err(outside()),
            Err(_) => file_path,
        };

        let mut parts: Vec<String> = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                Component::ParentDir => {
                    parts.pop().ok_or_else(outside)?;
                }
                Component::RootDir | Component::Prefix(_) => return Err(outside()),
            }
        }
        Ok(parts.join("/"))
    }
}

/// One-line status for terminal output.
pub fn format_anchor_status(result: &AnchorCheckResult) -> String {
    let icon = match result.status {
        DriftStatus::Valid => "✓",
        DriftStatus::SemanticDrift => "⚠",
        DriftStatus::Deleted => "✗",
    };
    format!(
        "{} {} ({}): {}",
        icon, result.anchor.symbol, result.anchor.path, result.message
    )
}

pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
