//! Free-text search over packets, decision records, journal entries, and the
//! repository map.
//!
//! Packet symbol and path matches come from the saved [`ContextIndex`], so a
//! query naming an anchored symbol finds the packets that pin it.

use serde::Serialize;
use tracing::debug;

use crate::config::RelevanceConfig;
use crate::context::journal_id;
use crate::errors::Result;
use crate::index::ContextIndex;
use crate::relevance::{extract_keywords, jaccard, rank_candidates, KeywordSet};
use crate::store::DocumentStore;
use crate::types::{Candidate, CandidateType, Packet};

/// Score for an exact id or a title containing the whole query.
const TITLE_MATCH_SCORE: f64 = 1.0;
/// Score per anchored symbol or path named in the query.
const LINK_MATCH_SCORE: f64 = 0.5;
/// Weight of keyword overlap with the document text.
const KEYWORD_WEIGHT: f64 = 0.3;
/// Base score for a journal entry containing the query.
const JOURNAL_MATCH_SCORE: f64 = 0.5;
/// Score for a repository map containing the query.
const REPO_MAP_SCORE: f64 = 0.4;
/// Weight of the relevance score against `SearchOptions::packet_id`.
const PACKET_RELEVANCE_WEIGHT: f64 = 0.5;
const SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchKind {
    Packet,
    Adr,
    Journal,
    RepoMap,
}

#[allow(clippy::should_implement_trait)]
impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Packet => "packet",
            SearchKind::Adr => "adr",
            SearchKind::Journal => "journal",
            SearchKind::RepoMap => "repo-map",
        }
    }

    pub fn from_str(s: &str) -> Option<SearchKind> {
        match s {
            "packet" => Some(SearchKind::Packet),
            "adr" => Some(SearchKind::Adr),
            "journal" => Some(SearchKind::Journal),
            "repo-map" => Some(SearchKind::RepoMap),
            _ => None,
        }
    }

    fn candidate_type(&self) -> Option<CandidateType> {
        match self {
            SearchKind::Packet => Some(CandidateType::Packet),
            SearchKind::Adr => Some(CandidateType::Adr),
            SearchKind::Journal => Some(CandidateType::Journal),
            SearchKind::RepoMap => None,
        }
    }
}

/// One search hit with the reasons it matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SearchKind,
    pub title: String,
    pub snippet: String,
    pub score: f64,
    pub matches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub max_results: usize,
    /// Restricts results to these kinds; all kinds when empty.
    pub kinds: Vec<SearchKind>,
    /// Boosts results by their relevance to this packet.
    pub packet_id: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 10,
            kinds: Vec::new(),
            packet_id: None,
        }
    }
}

/// Searches the documents of one project.
pub struct Searcher<'a> {
    store: &'a dyn DocumentStore,
    index: &'a ContextIndex,
    config: &'a RelevanceConfig,
    repo_map: Option<&'a str>,
}

impl<'a> Searcher<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        index: &'a ContextIndex,
        config: &'a RelevanceConfig,
    ) -> Self {
        Self {
            store,
            index,
            config,
            repo_map: None,
        }
    }

    /// Includes the repository map text in searches.
    pub fn with_repo_map(mut self, repo_map: &'a str) -> Self {
        self.repo_map = Some(repo_map);
        self
    }

    /// Results sorted by descending score, ties in document order, at most
    /// `options.max_results` of them.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<QueryResult>> {
        let query_lower = query.trim().to_lowercase();
        if query_lower.is_empty() {
            return Ok(Vec::new());
        }
        let query_keywords = extract_keywords(query);
        let wanted = |kind: SearchKind| options.kinds.is_empty() || options.kinds.contains(&kind);

        let mut results = Vec::new();
        if wanted(SearchKind::Packet) {
            for packet in self.store.packets()? {
                if let Some(result) = self.match_packet(&packet, &query_lower, &query_keywords) {
                    results.push(result);
                }
            }
        }
        if wanted(SearchKind::Adr) {
            for adr in self.store.decision_records()? {
                let text = format!("{} {} {} {}", adr.id, adr.title, adr.decision, adr.context);
                let mut scored = Scored::default();
                scored.title_match(&adr.id, &adr.title, &query_lower);
                scored.keyword_overlap(&text, &query_keywords);
                if let Some(result) = scored.into_result(adr.id, SearchKind::Adr, adr.title, &adr.decision) {
                    results.push(result);
                }
            }
        }
        if wanted(SearchKind::Journal) {
            for entry in self.store.journal_entries()? {
                let text = format!(
                    "{} {} {} {} {}",
                    entry.packet_id,
                    entry.summary,
                    entry.changed_files.join(" "),
                    entry.risks.join(" "),
                    entry.next_steps.join(" ")
                );
                if !text.to_lowercase().contains(&query_lower) {
                    continue;
                }
                let overlap = jaccard(&query_keywords, &extract_keywords(&text));
                let date: String = entry.timestamp.chars().take(10).collect();
                results.push(QueryResult {
                    id: journal_id(&entry.commit_sha),
                    kind: SearchKind::Journal,
                    title: format!("{} ({date})", entry.packet_id),
                    snippet: snippet(&entry.summary),
                    score: JOURNAL_MATCH_SCORE + overlap * KEYWORD_WEIGHT,
                    matches: vec!["content match".to_string()],
                });
            }
        }
        if wanted(SearchKind::RepoMap) {
            if let Some(repo_map) = self.repo_map {
                if repo_map.to_lowercase().contains(&query_lower) {
                    results.push(QueryResult {
                        id: "repo-map".to_string(),
                        kind: SearchKind::RepoMap,
                        title: "Repository Map".to_string(),
                        snippet: snippet(repo_map),
                        score: REPO_MAP_SCORE,
                        matches: vec!["content match".to_string()],
                    });
                }
            }
        }

        if let Some(packet_id) = &options.packet_id {
            self.boost_by_packet(packet_id, &mut results)?;
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(options.max_results);
        debug!(query = %query, results = results.len(), "searched context");
        Ok(results)
    }

    fn match_packet(
        &self,
        packet: &Packet,
        query_lower: &str,
        query_keywords: &KeywordSet,
    ) -> Option<QueryResult> {
        let mut scored = Scored::default();
        scored.title_match(&packet.id, &packet.title, query_lower);

        for symbol in self.index.symbol_map.keys() {
            if query_lower.contains(&symbol.to_lowercase())
                && self.index.packets_for_symbol(symbol).contains(&packet.id)
            {
                scored.add(LINK_MATCH_SCORE, format!("symbol: {symbol}"));
            }
        }
        for path in self.index.path_map.keys() {
            if query_lower.contains(&path.to_lowercase())
                && self.index.packets_for_path(path).contains(&packet.id)
            {
                scored.add(LINK_MATCH_SCORE, format!("path: {path}"));
            }
        }

        let text = format!(
            "{} {} {} {} {}",
            packet.id,
            packet.title,
            packet.goal,
            packet.dod.join(" "),
            packet.constraints.join(" ")
        );
        scored.keyword_overlap(&text, query_keywords);
        scored.into_result(
            packet.id.clone(),
            SearchKind::Packet,
            packet.title.clone(),
            &packet.goal,
        )
    }

    /// Adds the weighted relevance of each indexed document to `packet_id`.
    fn boost_by_packet(&self, packet_id: &str, results: &mut [QueryResult]) -> Result<()> {
        let packet = self.store.load_packet(packet_id)?;
        let candidates: Vec<Candidate> = self
            .index
            .entries
            .iter()
            .filter(|e| !(e.entry_type == CandidateType::Packet && e.id == packet.id))
            .map(|e| e.to_candidate())
            .collect();

        for ranked in rank_candidates(&packet, &candidates, self.config) {
            for result in results.iter_mut() {
                if result.id == ranked.id && result.kind.candidate_type() == Some(ranked.candidate_type) {
                    result.score += ranked.score * PACKET_RELEVANCE_WEIGHT;
                    result
                        .matches
                        .push(format!("relevance to {}: {:.2}", packet.id, ranked.score));
                }
            }
        }
        Ok(())
    }
}

/// Running score and match reasons for one document.
#[derive(Default)]
struct Scored {
    score: f64,
    matches: Vec<String>,
}

impl Scored {
    fn add(&mut self, score: f64, reason: String) {
        self.score += score;
        self.matches.push(reason);
    }

    fn title_match(&mut self, id: &str, title: &str, query_lower: &str) {
        if id.to_lowercase() == query_lower || title.to_lowercase().contains(query_lower) {
            self.add(TITLE_MATCH_SCORE, "title/id match".to_string());
        }
    }

    fn keyword_overlap(&mut self, text: &str, query_keywords: &KeywordSet) {
        let overlap = jaccard(query_keywords, &extract_keywords(text));
        if overlap > 0.0 {
            self.add(
                overlap * KEYWORD_WEIGHT,
                format!("keyword overlap: {:.0}%", overlap * 100.0),
            );
        }
    }

    fn into_result(
        self,
        id: String,
        kind: SearchKind,
        title: String,
        snippet_source: &str,
    ) -> Option<QueryResult> {
        (self.score > 0.0).then(|| QueryResult {
            id,
            kind,
            title,
            snippet: snippet(snippet_source),
            score: self.score,
            matches: self.matches,
        })
    }
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}
