use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::config::RelevanceConfig;
use crate::context::candidates::{adr_candidate, journal_candidate};
use crate::context::formatter::*;
use crate::context::tokenizer::Tokenizer;
use crate::errors::Result;
use crate::relevance::{rank_candidates_at, select_with_policy, BudgetPolicy};
use crate::store::DocumentStore;
use crate::types::*;

/// Tokens held back for section headings and separators.
pub const SAFETY_RESERVE_TOKENS: usize = 200;

/// Builds token-bounded context packs from a document store.
///
/// Holds no state between calls; the output depends only on the store
/// contents, the configuration, and the clock.
pub struct ContextAssembler<'a> {
    store: &'a dyn DocumentStore,
    tokenizer: &'a dyn Tokenizer,
    config: &'a RelevanceConfig,
    policy: BudgetPolicy,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        tokenizer: &'a dyn Tokenizer,
        config: &'a RelevanceConfig,
    ) -> Self {
        Self {
            store,
            tokenizer,
            config,
            policy: BudgetPolicy::default(),
        }
    }

    /// Replaces the default early-stop policy used during selection.
    pub fn with_policy(mut self, policy: BudgetPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Assembles the pack for `packet_id` as of the current time.
    pub fn assemble(&self, packet_id: &str, options: &AssembleOptions) -> Result<String> {
        self.assemble_at(packet_id, options, Utc::now())
    }

    /// Assembles the pack for `packet_id` as of `now`.
    ///
    /// Fails only if the packet cannot be loaded. Decision records and
    /// journal entries that cannot be read are skipped.
    pub fn assemble_at(
        &self,
        packet_id: &str,
        options: &AssembleOptions,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let packet = self.store.load_packet(packet_id)?;

        let mut sections = vec![format_header(&packet), format_anchors(&packet)];
        sections.push(format_rules().to_string());
        let used: usize = sections
            .iter()
            .map(|s| self.tokenizer.count_tokens(s))
            .sum();
        let remaining = options
            .max_tokens
            .saturating_sub(used)
            .saturating_sub(SAFETY_RESERVE_TOKENS);

        let candidates = self.gather_candidates(now)?;
        let ranked = rank_candidates_at(&packet, &candidates, self.config, now);

        let mut by_id: HashMap<&str, &Candidate> = HashMap::new();
        for candidate in &candidates {
            by_id.entry(candidate.id.as_str()).or_insert(candidate);
        }

        // Estimate from the rendered entry so the budget covers what is emitted.
        let mut rendered: HashMap<String, String> = HashMap::new();
        let mut estimates: HashMap<String, usize> = HashMap::new();
        for result in &ranked {
            if let Some(candidate) = by_id.get(result.id.as_str()) {
                let entry = format_related_entry(candidate, result);
                estimates.insert(result.id.clone(), self.tokenizer.count_tokens(&entry));
                rendered.insert(result.id.clone(), entry);
            }
        }

        let selection = select_with_policy(&ranked, &estimates, remaining, 0, self.policy);

        let mut adr_entries = Vec::new();
        let mut journal_entries = Vec::new();
        for result in &selection.selected {
            let Some(entry) = rendered.remove(&result.id) else {
                continue;
            };
            match result.candidate_type {
                CandidateType::Adr => adr_entries.push(entry),
                CandidateType::Journal => journal_entries.push(entry),
                CandidateType::Packet => {}
            }
        }

        if let Some(related) = format_related_section(&adr_entries, &journal_entries) {
            sections.push(related);
        }

        info!(
            packet = %packet.id,
            model = self.tokenizer.model(),
            fixed_tokens = used,
            candidates = candidates.len(),
            selected = selection.selected.len(),
            "assembled context pack"
        );
        Ok(sections.join(SECTION_SEPARATOR))
    }

    /// Every decision record plus the journal entries inside the trailing
    /// `journal_window_days` window.
    pub fn gather_candidates(&self, now: DateTime<Utc>) -> Result<Vec<Candidate>> {
        let mut candidates: Vec<Candidate> = self
            .store
            .decision_records()?
            .iter()
            .map(adr_candidate)
            .collect();

        // A window reaching past the earliest representable date keeps everything.
        let cutoff = now
            .checked_sub_signed(Duration::days(i64::from(self.config.journal_window_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        for entry in self.store.journal_entries()? {
            match journal_candidate(&entry) {
                Some(candidate) if candidate.timestamp.is_some_and(|ts| ts >= cutoff) => {
                    candidates.push(candidate)
                }
                Some(_) => {}
                None => debug!(
                    commit = %entry.commit_sha,
                    timestamp = %entry.timestamp,
                    "skipping journal entry with unparseable timestamp"
                ),
            }
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HeuristicTokenizer;
    use crate::errors::ContextEngineError;

    struct MemoryStore {
        packet: Packet,
        adrs: Vec<Adr>,
        journal: Vec<JournalEntry>,
    }

    impl DocumentStore for MemoryStore {
        fn load_packet(&self, id: &str) -> Result<Packet> {
            if id == self.packet.id {
                Ok(self.packet.clone())
            } else {
                Err(ContextEngineError::NotFound {
                    message: format!("Packet {id} not found"),
                    path: String::new(),
                })
            }
        }

        fn save_packet(&self, _packet: &Packet) -> Result<()> {
            Ok(())
        }

        fn create_packet(&self, _packet: &Packet, _body: &str) -> Result<()> {
            Ok(())
        }

        fn packets(&self) -> Result<Vec<Packet>> {
            Ok(vec![self.packet.clone()])
        }

        fn decision_records(&self) -> Result<Vec<Adr>> {
            Ok(self.adrs.clone())
        }

        fn journal_entries(&self) -> Result<Vec<JournalEntry>> {
            Ok(self.journal.clone())
        }
    }

    fn store() -> MemoryStore {
        MemoryStore {
            packet: Packet {
                id: "FEAT-001".to_string(),
                packet_type: PacketType::Feat,
                title: "OAuth Login Feature".to_string(),
                status: PacketStatus::Active,
                goal: "Implement OAuth authentication".to_string(),
                dod: vec!["Login works".to_string()],
                constraints: vec![],
                tests: vec![],
                repo_truth: vec![],
                metadata: PacketMetadata::default(),
            },
            adrs: vec![Adr {
                id: "ADR-001".to_string(),
                title: "OAuth provider".to_string(),
                status: AdrStatus::Accepted,
                decision: "Decided to use OAuth for authentication".to_string(),
                context: String::new(),
                consequences: vec![],
                affected_areas: vec![],
                created_at: "2026-01-01".to_string(),
                updated_at: None,
            }],
            journal: vec![JournalEntry {
                packet_id: "FEAT-000".to_string(),
                commit_sha: "0123456789".to_string(),
                changed_files: vec!["src/auth/oauth.ts".to_string()],
                summary: "OAuth authentication scaffolding".to_string(),
                risks: vec![],
                next_steps: vec![],
                timestamp: "2025-01-01T00:00:00Z".to_string(),
            }],
        }
    }

    #[test]
    fn test_unknown_packet_is_fatal() {
        let store = store();
        let tokenizer = HeuristicTokenizer::default();
        let config = RelevanceConfig::default();
        let assembler = ContextAssembler::new(&store, &tokenizer, &config);
        let err = assembler
            .assemble("NOPE", &AssembleOptions::default())
            .unwrap_err();
        assert!(matches!(err, ContextEngineError::NotFound { .. }));
    }

    #[test]
    fn test_journal_outside_window_not_gathered() {
        let store = store();
        let tokenizer = HeuristicTokenizer::default();
        let config = RelevanceConfig::default();
        let assembler = ContextAssembler::new(&store, &tokenizer, &config);
        let now = DateTime::parse_from_rfc3339("2026-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let candidates = assembler.gather_candidates(now).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "ADR-001");
    }

    #[test]
    fn test_window_past_earliest_date_keeps_all_journal_entries() {
        let store = store();
        let tokenizer = HeuristicTokenizer::default();
        let config = RelevanceConfig {
            journal_window_days: u32::MAX,
            ..RelevanceConfig::default()
        };
        let assembler = ContextAssembler::new(&store, &tokenizer, &config);
        let candidates = assembler.gather_candidates(Utc::now()).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].candidate_type, CandidateType::Journal);
    }

    #[test]
    fn test_pack_includes_related_adr() {
        let store = store();
        let tokenizer = HeuristicTokenizer::default();
        let config = RelevanceConfig::default();
        let assembler = ContextAssembler::new(&store, &tokenizer, &config);
        let pack = assembler
            .assemble("FEAT-001", &AssembleOptions::default())
            .unwrap();
        assert!(pack.starts_with("# Context Pack: FEAT-001"));
        assert!(pack.contains("## Rules for Agent"));
        assert!(pack.contains("### Related ADRs"));
        assert!(pack.contains("**OAuth provider** (score:"));
        assert_eq!(pack.matches(SECTION_SEPARATOR).count(), 3);
    }

    #[test]
    fn test_tiny_budget_omits_related_context() {
        let store = store();
        let tokenizer = HeuristicTokenizer::default();
        let config = RelevanceConfig::default();
        let assembler = ContextAssembler::new(&store, &tokenizer, &config);
        let options = AssembleOptions {
            max_tokens: 100,
            out_file: None,
        };
        let pack = assembler.assemble("FEAT-001", &options).unwrap();
        assert!(!pack.contains("## Related Context"));
        assert_eq!(pack.matches(SECTION_SEPARATOR).count(), 2);
    }
}
