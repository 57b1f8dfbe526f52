use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::RelevanceConfig;
use crate::pool::{default_workers, map_bounded};
use crate::relevance::keywords::{candidate_keywords, jaccard, packet_keywords, KeywordSet};
use crate::types::*;

/// Hard ceiling on a candidate's combined score.
pub const MAX_SCORE: f64 = 1.5;

/// Below this many candidates, scoring stays on the calling thread.
const PARALLEL_THRESHOLD: usize = 64;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Linear recency boost for a timestamp: `max(0, journal_max - days * decay)`.
pub fn recency_boost(
    timestamp: Option<DateTime<Utc>>,
    config: &RelevanceConfig,
    now: DateTime<Utc>,
) -> f64 {
    match timestamp {
        Some(ts) => {
            let days = days_between(ts, now);
            (config.recency.journal_max - days * config.recency.decay_per_day).max(0.0)
        }
        None => 0.0,
    }
}

fn days_between(earlier: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - earlier).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY
}

/// Scores a candidate against a packet as of the current time.
pub fn score_candidate(packet: &Packet, candidate: &Candidate, config: &RelevanceConfig) -> RelevanceResult {
    score_candidate_at(packet, candidate, config, Utc::now())
}

/// Scores a candidate against a packet as of `now`.
pub fn score_candidate_at(
    packet: &Packet,
    candidate: &Candidate,
    config: &RelevanceConfig,
    now: DateTime<Utc>,
) -> RelevanceResult {
    let keywords = packet_keywords(packet);
    score_with_keywords(packet, &keywords, candidate, config, now)
}

fn score_with_keywords(
    packet: &Packet,
    packet_keywords: &KeywordSet,
    candidate: &Candidate,
    config: &RelevanceConfig,
    now: DateTime<Utc>,
) -> RelevanceResult {
    let candidate_keywords = candidate_keywords(candidate);
    let mut reasons: Vec<String> = Vec::new();

    let overlap = jaccard(packet_keywords, &candidate_keywords);
    let shared: Vec<&str> = packet_keywords
        .intersection(&candidate_keywords)
        .take(5)
        .map(String::as_str)
        .collect();
    if !shared.is_empty() {
        reasons.push(format!("keyword_overlap: {}", shared.join(", ")));
    }

    let matched_symbols: Vec<&str> = packet
        .repo_truth
        .iter()
        .filter(|anchor| {
            candidate_keywords.contains(&anchor.symbol.to_lowercase())
                || candidate.symbols.contains(&anchor.symbol)
        })
        .map(|anchor| anchor.symbol.as_str())
        .collect();
    let symbol_boost = if matched_symbols.is_empty() {
        0.0
    } else {
        reasons.push(format!("symbol_match: {}", matched_symbols.join(", ")));
        config.boosts.symbol_match
    };

    let mut matched_paths: Vec<&str> = Vec::new();
    for anchor in &packet.repo_truth {
        for path in &candidate.paths {
            if path.contains(anchor.path.as_str()) || anchor.path.contains(path.as_str()) {
                matched_paths.push(path);
            }
        }
    }
    let path_boost = if matched_paths.is_empty() {
        0.0
    } else {
        matched_paths.truncate(3);
        reasons.push(format!("path_overlap: {}", matched_paths.join(", ")));
        config.boosts.path_overlap
    };

    let explicit_boost = if candidate.candidate_type == CandidateType::Adr
        && packet.metadata.related_adrs.contains(&candidate.id)
    {
        reasons.push("explicit_link: linked in packet".to_string());
        config.boosts.explicit_link
    } else {
        0.0
    };

    let recency = if candidate.candidate_type == CandidateType::Journal {
        let boost = recency_boost(candidate.timestamp, config, now);
        if boost > 0.0 {
            let days_ago = candidate
                .timestamp
                .map(|ts| days_between(ts, now).floor() as i64)
                .unwrap_or(0);
            reasons.push(format!("recency: {days_ago} days ago"));
        }
        boost
    } else {
        0.0
    };

    let score = (overlap + symbol_boost + path_boost + explicit_boost + recency).min(MAX_SCORE);

    RelevanceResult {
        id: candidate.id.clone(),
        candidate_type: candidate.candidate_type,
        score,
        reasons,
    }
}

/// Scores, filters, and orders candidates as of the current time.
pub fn rank_candidates(
    packet: &Packet,
    candidates: &[Candidate],
    config: &RelevanceConfig,
) -> Vec<RelevanceResult> {
    rank_candidates_at(packet, candidates, config, Utc::now())
}

/// Scores every candidate, drops those under `min_score`, sorts by
/// descending score (ties keep input order), and keeps the top
/// `max_candidates`.
pub fn rank_candidates_at(
    packet: &Packet,
    candidates: &[Candidate],
    config: &RelevanceConfig,
    now: DateTime<Utc>,
) -> Vec<RelevanceResult> {
    let keywords = packet_keywords(packet);
    let workers = if candidates.len() < PARALLEL_THRESHOLD {
        1
    } else {
        default_workers()
    };

    let scored = map_bounded(candidates, workers, |candidate| {
        score_with_keywords(packet, &keywords, candidate, config, now)
    });

    let mut ranked: Vec<RelevanceResult> = scored
        .into_iter()
        .filter(|r| r.score >= config.min_score)
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(config.max_candidates);

    debug!(
        packet = %packet.id,
        candidates = candidates.len(),
        kept = ranked.len(),
        "ranked candidates"
    );
    ranked
}
