use std::collections::HashMap;

use crate::types::RelevanceResult;

/// Token cost assumed for a candidate with no estimate.
pub const DEFAULT_TOKEN_ESTIMATE: usize = 500;

/// When greedy selection may stop before trying every candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetPolicy {
    /// Selection stops once the running total reaches this fraction of the
    /// available budget (`max_tokens - reserved_tokens`), even if a smaller
    /// later item would still fit.
    pub early_stop_ratio: f64,
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        Self {
            early_stop_ratio: 0.95,
        }
    }
}

/// Candidates chosen under a token budget.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionResult {
    pub selected: Vec<RelevanceResult>,
    /// Tokens accounted for, including the reserved amount.
    pub total_tokens: usize,
}

/// Greedy selection with the default early-stop policy.
pub fn select_by_token_budget(
    ranked: &[RelevanceResult],
    token_estimates: &HashMap<String, usize>,
    max_tokens: usize,
    reserved_tokens: usize,
) -> SelectionResult {
    select_with_policy(
        ranked,
        token_estimates,
        max_tokens,
        reserved_tokens,
        BudgetPolicy::default(),
    )
}

/// Walks `ranked` in order, taking each item whose estimate still fits under
/// `max_tokens` and skipping those that do not.
pub fn select_with_policy(
    ranked: &[RelevanceResult],
    token_estimates: &HashMap<String, usize>,
    max_tokens: usize,
    reserved_tokens: usize,
    policy: BudgetPolicy,
) -> SelectionResult {
    let mut selected = Vec::new();
    let mut total_tokens = reserved_tokens;
    let stop_at = max_tokens.saturating_sub(reserved_tokens) as f64 * policy.early_stop_ratio;

    for result in ranked {
        let estimate = token_estimates
            .get(&result.id)
            .copied()
            .unwrap_or(DEFAULT_TOKEN_ESTIMATE);
        if total_tokens + estimate <= max_tokens {
            selected.push(result.clone());
            total_tokens += estimate;
        }

        if total_tokens as f64 >= stop_at {
            break;
        }
    }

    SelectionResult {
        selected,
        total_tokens,
    }
}
