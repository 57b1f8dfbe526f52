/// Keyword extraction from free text and identifiers.
pub mod keywords;

/// Candidate scoring and ranking against a packet.
pub mod scoring;

/// Greedy token-budget selection over ranked candidates.
pub mod budget;

pub use budget::{
    select_by_token_budget, select_with_policy, BudgetPolicy, SelectionResult,
    DEFAULT_TOKEN_ESTIMATE,
};
pub use keywords::{
    candidate_keywords, extract_keywords, jaccard, packet_keywords, split_identifier, KeywordSet,
};
pub use scoring::{
    rank_candidates, rank_candidates_at, recency_boost, score_candidate, score_candidate_at,
    MAX_SCORE,
};
