use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ContextEngineError, Result};

/// Source languages the symbol extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ts,
    Tsx,
    Js,
    Jsx,
    Py,
    Rs,
    Go,
}

impl Language {
    /// Every language tag, in registry order.
    pub const ALL: [Language; 7] = [
        Language::Ts,
        Language::Tsx,
        Language::Js,
        Language::Jsx,
        Language::Py,
        Language::Rs,
        Language::Go,
    ];

    /// Returns the short tag used in anchors and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Ts => "ts",
            Language::Tsx => "tsx",
            Language::Js => "js",
            Language::Jsx => "jsx",
            Language::Py => "py",
            Language::Rs => "rs",
            Language::Go => "go",
        }
    }

    /// Parses a language tag, failing with `UnsupportedLanguage` for unknown tags.
    pub fn from_tag(tag: &str) -> Result<Language> {
        Language::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == tag)
            .ok_or_else(|| ContextEngineError::UnsupportedLanguage {
                language: tag.to_string(),
            })
    }

    /// Detects the language of a file from its extension.
    pub fn from_path(path: &str) -> Option<Language> {
        let ext = path.rsplit_once('.')?.1;
        match ext {
            "ts" | "mts" | "cts" => Some(Language::Ts),
            "tsx" => Some(Language::Tsx),
            "js" | "mjs" | "cjs" => Some(Language::Js),
            "jsx" => Some(Language::Jsx),
            "py" => Some(Language::Py),
            "rs" => Some(Language::Rs),
            "go" => Some(Language::Go),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of named declarations that can be anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Method,
    Interface,
    Type,
    Enum,
    Variable,
}

#[allow(clippy::should_implement_trait)]
impl SymbolKind {
    /// Returns the string representation of this symbol kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Method => "method",
            SymbolKind::Interface => "interface",
            SymbolKind::Type => "type",
            SymbolKind::Enum => "enum",
            SymbolKind::Variable => "variable",
        }
    }

    /// Parses a string into a `SymbolKind`, returning `None` for unrecognized values.
    pub fn from_str(s: &str) -> Option<SymbolKind> {
        match s {
            "function" => Some(SymbolKind::Function),
            "class" => Some(SymbolKind::Class),
            "method" => Some(SymbolKind::Method),
            "interface" => Some(SymbolKind::Interface),
            "type" => Some(SymbolKind::Type),
            "enum" => Some(SymbolKind::Enum),
            "variable" => Some(SymbolKind::Variable),
            _ => None,
        }
    }
}

/// A named declaration found in a source file.
///
/// Produced fresh on every parse; line numbers are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub language: Language,
    /// `sha256:<64 hex>` over the normalized syntax of the declaration.
    pub content_hash: String,
    pub signature: String,
    pub start_line: u32,
    pub end_line: u32,
}

/// Fingerprinting scheme recorded in an anchor. Only one exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorType {
    #[default]
    #[serde(rename = "semantic_hash")]
    SemanticHash,
}

/// A hash-verifiable pointer from a packet to a named code symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticAnchor {
    /// Forward-slash path relative to the project root.
    pub path: String,
    pub symbol: String,
    pub language: Language,
    pub symbol_type: SymbolKind,
    #[serde(default)]
    pub anchor_type: AnchorType,
    pub semantic_hash: String,
    pub git_ref: String,
    /// ISO-8601 capture time.
    pub captured_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
}

/// Outcome of comparing an anchor against the current source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatus {
    Valid,
    SemanticDrift,
    Deleted,
}

impl DriftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftStatus::Valid => "valid",
            DriftStatus::SemanticDrift => "semantic_drift",
            DriftStatus::Deleted => "deleted",
        }
    }
}

/// Result of checking a single anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorCheckResult {
    pub anchor: SemanticAnchor,
    pub status: DriftStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketType {
    Feat,
    Bug,
    Chore,
    Refactor,
    Docs,
    Test,
}

#[allow(clippy::should_implement_trait)]
impl PacketType {
    pub const ALL: [PacketType; 6] = [
        PacketType::Feat,
        PacketType::Bug,
        PacketType::Chore,
        PacketType::Refactor,
        PacketType::Docs,
        PacketType::Test,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PacketType::Feat => "feat",
            PacketType::Bug => "bug",
            PacketType::Chore => "chore",
            PacketType::Refactor => "refactor",
            PacketType::Docs => "docs",
            PacketType::Test => "test",
        }
    }

    pub fn from_str(s: &str) -> Option<PacketType> {
        PacketType::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Upper-case prefix used in packet ids, e.g. `FEAT`.
    pub fn id_prefix(&self) -> String {
        self.as_str().to_uppercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketStatus {
    Draft,
    Active,
    Blocked,
    Completed,
    Cancelled,
}

impl PacketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PacketStatus::Draft => "draft",
            PacketStatus::Active => "active",
            PacketStatus::Blocked => "blocked",
            PacketStatus::Completed => "completed",
            PacketStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses reachable from this one. Completed and cancelled are final.
    pub fn allowed_transitions(&self) -> &'static [PacketStatus] {
        match self {
            PacketStatus::Draft => &[PacketStatus::Active],
            PacketStatus::Active => &[
                PacketStatus::Blocked,
                PacketStatus::Completed,
                PacketStatus::Cancelled,
            ],
            PacketStatus::Blocked => &[PacketStatus::Active, PacketStatus::Cancelled],
            PacketStatus::Completed | PacketStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: PacketStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PacketMetadata {
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_adrs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_packets: Vec<String>,
}

/// A unit of work: goal, definition of done, and the anchors it relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub id: String,
    #[serde(rename = "type")]
    pub packet_type: PacketType,
    pub title: String,
    pub status: PacketStatus,
    pub goal: String,
    #[serde(default)]
    pub dod: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<String>,
    #[serde(default)]
    pub repo_truth: Vec<SemanticAnchor>,
    #[serde(default)]
    pub metadata: PacketMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdrStatus {
    Proposed,
    Accepted,
    Deprecated,
    Superseded,
}

impl AdrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdrStatus::Proposed => "proposed",
            AdrStatus::Accepted => "accepted",
            AdrStatus::Deprecated => "deprecated",
            AdrStatus::Superseded => "superseded",
        }
    }
}

/// An architecture decision record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adr {
    pub id: String,
    pub title: String,
    pub status: AdrStatus,
    pub decision: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub consequences: Vec<String>,
    #[serde(default)]
    pub affected_areas: Vec<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// One commit-level entry of the development journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub packet_id: String,
    pub commit_sha: String,
    pub changed_files: Vec<String>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_steps: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateType {
    Adr,
    Journal,
    Packet,
}

impl CandidateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateType::Adr => "adr",
            CandidateType::Journal => "journal",
            CandidateType::Packet => "packet",
        }
    }
}

/// A piece of contextual material eligible for a context pack.
///
/// Empty `keywords` means none were precomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    #[serde(rename = "type")]
    pub candidate_type: CandidateType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
}

impl Candidate {
    /// Creates a candidate with only the required fields set.
    pub fn new(id: impl Into<String>, candidate_type: CandidateType, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            candidate_type,
            title: None,
            text: text.into(),
            keywords: Vec::new(),
            timestamp: None,
            paths: Vec::new(),
            symbols: Vec::new(),
        }
    }
}

/// Score of one candidate against a packet, with the factors that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceResult {
    pub id: String,
    #[serde(rename = "type")]
    pub candidate_type: CandidateType,
    pub score: f64,
    pub reasons: Vec<String>,
}

/// Options for assembling a context pack.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembleOptions {
    pub max_tokens: usize,
    /// Where the CLI writes the pack; stdout when absent.
    pub out_file: Option<PathBuf>,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        AssembleOptions {
            max_tokens: 8000,
            out_file: None,
        }
    }
}
