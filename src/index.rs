use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::INDEX_PATH;
use crate::context::{journal_id, parse_timestamp};
use crate::errors::Result;
use crate::relevance::extract_keywords;
use crate::store::DocumentStore;
use crate::types::{Candidate, CandidateType};

pub const INDEX_VERSION: &str = "2.0.0";

/// Precomputed keywords and links for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: CandidateType,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl IndexEntry {
    /// A candidate whose keywords are the precomputed ones.
    pub fn to_candidate(&self) -> Candidate {
        Candidate {
            keywords: self.keywords.clone(),
            timestamp: self.timestamp.as_deref().and_then(parse_timestamp),
            paths: self.paths.clone(),
            symbols: self.symbols.clone(),
            ..Candidate::new(self.id.clone(), self.entry_type, self.keywords.join(" "))
        }
    }
}

/// Keyword index over packets, decision records, and journal entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextIndex {
    pub version: String,
    pub built_at: String,
    pub entries: Vec<IndexEntry>,
    /// Anchor symbol name to the packets anchoring it.
    pub symbol_map: BTreeMap<String, Vec<String>>,
    /// Anchor file path to the packets anchoring it.
    pub path_map: BTreeMap<String, Vec<String>>,
}

impl ContextIndex {
    pub fn packets_for_symbol(&self, symbol: &str) -> &[String] {
        self.symbol_map.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn packets_for_path(&self, path: &str) -> &[String] {
        self.path_map.get(path).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn keyword_list(text: &str) -> Vec<String> {
    extract_keywords(text).into_iter().collect()
}

/// Reads every document in `store` and builds the index.
pub fn build_index(store: &dyn DocumentStore) -> Result<ContextIndex> {
    let mut entries = Vec::new();
    let mut symbol_map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut path_map: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for packet in store.packets()? {
        let text = format!("{} {} {}", packet.title, packet.goal, packet.dod.join(" "));
        let paths: Vec<String> = packet.repo_truth.iter().map(|a| a.path.clone()).collect();
        let symbols: Vec<String> = packet.repo_truth.iter().map(|a| a.symbol.clone()).collect();

        for symbol in &symbols {
            symbol_map.entry(symbol.clone()).or_default().push(packet.id.clone());
        }
        for path in &paths {
            path_map.entry(path.clone()).or_default().push(packet.id.clone());
        }

        entries.push(IndexEntry {
            id: packet.id,
            entry_type: CandidateType::Packet,
            keywords: keyword_list(&text),
            paths,
            symbols,
            timestamp: None,
            status: Some(packet.status.as_str().to_string()),
        });
    }

    for adr in store.decision_records()? {
        let text = format!(
            "{} {} {} {}",
            adr.title,
            adr.decision,
            adr.consequences.join(" "),
            adr.affected_areas.join(" ")
        );
        entries.push(IndexEntry {
            id: adr.id,
            entry_type: CandidateType::Adr,
            keywords: keyword_list(&text),
            paths: adr.affected_areas,
            symbols: Vec::new(),
            timestamp: None,
            status: Some(adr.status.as_str().to_string()),
        });
    }

    for entry in store.journal_entries()? {
        let text = format!("{} {}", entry.summary, entry.changed_files.join(" "));
        entries.push(IndexEntry {
            id: journal_id(&entry.commit_sha),
            entry_type: CandidateType::Journal,
            keywords: keyword_list(&text),
            paths: entry.changed_files,
            symbols: Vec::new(),
            timestamp: Some(entry.timestamp),
            status: None,
        });
    }

    info!(
        entries = entries.len(),
        symbols = symbol_map.len(),
        paths = path_map.len(),
        "built context index"
    );

    Ok(ContextIndex {
        version: INDEX_VERSION.to_string(),
        built_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        entries,
        symbol_map,
        path_map,
    })
}

pub fn get_index_path(project_root: &Path) -> PathBuf {
    project_root.join(INDEX_PATH)
}

/// Writes the index as pretty JSON.
pub fn save_index(project_root: &Path, index: &ContextIndex) -> Result<()> {
    let path = get_index_path(project_root);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(&path, serde_json::to_string_pretty(index)?)?;
    Ok(())
}

/// Loads the saved index, or `None` if it has not been built.
pub fn load_index(project_root: &Path) -> Result<Option<ContextIndex>> {
    let path = get_index_path(project_root);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_candidate_keeps_precomputed_keywords() {
        let entry = IndexEntry {
            id: "journal-abcdef01".to_string(),
            entry_type: CandidateType::Journal,
            keywords: vec!["oauth".to_string(), "session".to_string()],
            paths: vec!["src/auth.ts".to_string()],
            symbols: vec![],
            timestamp: Some("2026-03-01T00:00:00.000Z".to_string()),
            status: None,
        };
        let candidate = entry.to_candidate();
        assert_eq!(candidate.keywords, vec!["oauth", "session"]);
        assert_eq!(candidate.candidate_type, CandidateType::Journal);
        assert!(candidate.timestamp.is_some());
    }

    #[test]
    fn test_lookup_missing_symbol_is_empty() {
        let index = ContextIndex {
            version: INDEX_VERSION.to_string(),
            built_at: String::new(),
            entries: vec![],
            symbol_map: BTreeMap::new(),
            path_map: BTreeMap::new(),
        };
        assert!(index.packets_for_symbol("nothing").is_empty());
        assert!(index.packets_for_path("src/x.ts").is_empty());
    }
}
