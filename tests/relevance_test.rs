use chrono::{Duration, TimeZone, Utc};
use context_engine::config::RelevanceConfig;
use context_engine::relevance::*;
use context_engine::types::*;

fn oauth_packet() -> Packet {
    Packet {
        id: "FEAT-001".to_string(),
        packet_type: PacketType::Feat,
        title: "OAuth Login Feature".to_string(),
        status: PacketStatus::Active,
        goal: "Implement OAuth authentication".to_string(),
        dod: vec![],
        constraints: vec![],
        tests: vec![],
        repo_truth: vec![],
        metadata: PacketMetadata::default(),
    }
}

fn anchor(path: &str, symbol: &str) -> SemanticAnchor {
    SemanticAnchor {
        path: path.to_string(),
        symbol: symbol.to_string(),
        language: Language::Ts,
        symbol_type: SymbolKind::Function,
        anchor_type: AnchorType::SemanticHash,
        semantic_hash: format!("sha256:{}", "0".repeat(64)),
        git_ref: "abc".to_string(),
        captured_at: "2026-01-01T00:00:00.000Z".to_string(),
        signature: None,
        line_start: None,
        line_end: None,
    }
}

#[test]
fn test_keyword_overlap_scenario() {
    let candidate = Candidate::new(
        "ADR-001",
        CandidateType::Adr,
        "Decided to use OAuth for authentication",
    );
    let result = score_candidate(&oauth_packet(), &candidate, &RelevanceConfig::default());
    assert!(result.score > 0.0);
    assert!(result.reasons.iter().any(|r| r.starts_with("keyword_overlap")));
}

#[test]
fn test_symbol_boost_scenario() {
    let mut packet = oauth_packet();
    packet
        .repo_truth
        .push(anchor("src/auth/oauth.ts", "handleOAuthCallback"));

    let mut with_symbol = Candidate::new("A", CandidateType::Adr, "OAuth callback handling");
    with_symbol.symbols = vec!["handleOAuthCallback".to_string()];
    let without_symbol = Candidate::new("B", CandidateType::Adr, "OAuth callback handling");

    let config = RelevanceConfig::default();
    let a = score_candidate(&packet, &with_symbol, &config);
    let b = score_candidate(&packet, &without_symbol, &config);
    assert!(a.score > b.score);
    assert!(a.reasons.iter().any(|r| r.starts_with("symbol_match")));
    assert!(!b.reasons.iter().any(|r| r.starts_with("symbol_match")));
}

#[test]
fn test_symbol_match_through_keywords_is_case_insensitive() {
    let mut packet = oauth_packet();
    packet.repo_truth.push(anchor("src/a.ts", "parseToken"));
    let candidate = Candidate::new("A", CandidateType::Adr, "Rewrote PARSETOKEN for speed");
    let result = score_candidate(&packet, &candidate, &RelevanceConfig::default());
    assert!(result.reasons.iter().any(|r| r == "symbol_match: parseToken"));
}

#[test]
fn test_symbol_boost_applied_once() {
    let mut packet = oauth_packet();
    packet.repo_truth.push(anchor("lib/a.ts", "alpha"));
    packet.repo_truth.push(anchor("lib/b.ts", "beta"));
    let mut candidate = Candidate::new("A", CandidateType::Adr, "unrelated words");
    candidate.symbols = vec!["alpha".to_string(), "beta".to_string()];

    let config = RelevanceConfig::default();
    let result = score_candidate(&packet, &candidate, &config);
    let overlap = jaccard(&packet_keywords(&packet), &candidate_keywords(&candidate));
    assert!((result.score - (overlap + config.boosts.symbol_match)).abs() < 1e-9);
    assert!(result.reasons.contains(&"symbol_match: alpha, beta".to_string()));
}

#[test]
fn test_path_overlap_in_either_direction() {
    let mut packet = oauth_packet();
    packet.repo_truth.push(anchor("src/auth/oauth.ts", "x"));
    let config = RelevanceConfig::default();

    let mut broader = Candidate::new("A", CandidateType::Adr, "zzz");
    broader.paths = vec!["src/auth".to_string()];
    let result = score_candidate(&packet, &broader, &config);
    assert!(result.reasons.iter().any(|r| r == "path_overlap: src/auth"));

    let mut narrower = Candidate::new("B", CandidateType::Adr, "zzz");
    narrower.paths = vec!["packages/web/src/auth/oauth.ts".to_string()];
    let result = score_candidate(&packet, &narrower, &config);
    assert!(result.reasons.iter().any(|r| r.starts_with("path_overlap")));

    let mut unrelated = Candidate::new("C", CandidateType::Adr, "zzz");
    unrelated.paths = vec!["docs/readme.md".to_string()];
    let result = score_candidate(&packet, &unrelated, &config);
    assert!(result.reasons.is_empty());
    assert_eq!(result.score, 0.0);
}

#[test]
fn test_explicit_link_only_for_decision_records() {
    let mut packet = oauth_packet();
    packet.metadata.related_adrs = vec!["ADR-009".to_string()];
    let config = RelevanceConfig::default();

    let adr = Candidate::new("ADR-009", CandidateType::Adr, "zzz");
    let result = score_candidate(&packet, &adr, &config);
    assert!((result.score - config.boosts.explicit_link).abs() < 1e-9);
    assert!(result.reasons.contains(&"explicit_link: linked in packet".to_string()));

    let journal = Candidate::new("ADR-009", CandidateType::Journal, "zzz");
    let result = score_candidate(&packet, &journal, &config);
    assert!(!result.reasons.iter().any(|r| r.starts_with("explicit_link")));
}

#[test]
fn test_recency_decay_scenario() {
    let now = Utc.with_ymd_and_hms(2026, 3, 31, 12, 0, 0).unwrap();
    let config = RelevanceConfig::default();
    let packet = oauth_packet();

    let mut recent = Candidate::new("j1", CandidateType::Journal, "OAuth token handling");
    recent.timestamp = Some(now);
    let mut old = recent.clone();
    old.id = "j2".to_string();
    old.timestamp = Some(now - Duration::days(30));

    let recent_score = score_candidate_at(&packet, &recent, &config, now);
    let old_score = score_candidate_at(&packet, &old, &config, now);
    let diff = recent_score.score - old_score.score;
    assert!(diff > 0.0);
    assert!((diff - 0.06).abs() < 1e-6, "diff was {diff}");
    assert!(old_score.reasons.contains(&"recency: 30 days ago".to_string()));
}

#[test]
fn test_recency_never_negative() {
    let now = Utc.with_ymd_and_hms(2026, 3, 31, 0, 0, 0).unwrap();
    let config = RelevanceConfig::default();
    assert_eq!(
        recency_boost(Some(now - Duration::days(1000)), &config, now),
        0.0
    );
    assert_eq!(recency_boost(None, &config, now), 0.0);
}

#[test]
fn test_score_is_capped() {
    let mut packet = oauth_packet();
    packet.repo_truth.push(anchor("src/auth/oauth.ts", "handleOAuthCallback"));
    packet.metadata.related_adrs = vec!["ADR-001".to_string()];

    let mut candidate = Candidate::new("ADR-001", CandidateType::Adr, "OAuth Login Feature");
    candidate.title = Some("Implement OAuth authentication".to_string());
    candidate.symbols = vec!["handleOAuthCallback".to_string()];
    candidate.paths = vec!["src/auth/oauth.ts".to_string()];
    candidate.keywords = packet_keywords(&packet).into_iter().collect();

    let result = score_candidate(&packet, &candidate, &RelevanceConfig::default());
    assert_eq!(result.score, MAX_SCORE);
}

#[test]
fn test_precomputed_keywords_replace_text() {
    let packet = oauth_packet();
    let mut candidate = Candidate::new("A", CandidateType::Adr, "OAuth authentication");
    candidate.keywords = vec!["unrelated".to_string()];
    let result = score_candidate(&packet, &candidate, &RelevanceConfig::default());
    assert_eq!(result.score, 0.0);
}

#[test]
fn test_ranking_invariants() {
    let packet = oauth_packet();
    let texts = [
        "OAuth authentication login feature",
        "nothing relevant here",
        "OAuth only",
        "implement login",
        "feature flags for billing",
        "authentication middleware",
    ];
    let candidates: Vec<Candidate> = (0..80)
        .map(|i| {
            Candidate::new(
                format!("c{i}"),
                CandidateType::Adr,
                texts[i % texts.len()],
            )
        })
        .collect();

    let mut config = RelevanceConfig::default();
    config.max_candidates = 25;
    config.min_score = 0.1;
    let ranked = rank_candidates(&packet, &candidates, &config);

    assert!(ranked.len() <= 25);
    assert!(ranked.iter().all(|r| r.score >= 0.1));
    assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn test_ranking_ties_keep_input_order() {
    let packet = oauth_packet();
    let candidates: Vec<Candidate> = ["first", "second", "third"]
        .iter()
        .map(|id| Candidate::new(*id, CandidateType::Adr, "OAuth login"))
        .collect();
    let ranked = rank_candidates(&packet, &candidates, &RelevanceConfig::default());
    let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
}

#[test]
fn test_ranking_empty_input() {
    let ranked = rank_candidates(&oauth_packet(), &[], &RelevanceConfig::default());
    assert!(ranked.is_empty());
}

#[test]
fn test_extract_keywords_splits_identifiers() {
    let keywords = extract_keywords("Fix handleOAuthCallback in session_store.ts");
    for expected in ["fix", "handle", "oauth", "callback", "handleoauthcallback", "session", "store", "session_store"] {
        assert!(keywords.contains(expected), "missing {expected}: {keywords:?}");
    }
    assert!(!keywords.contains("in"));
}

#[test]
fn test_jaccard_bounds() {
    let a = extract_keywords("oauth login");
    let b = extract_keywords("oauth login");
    let empty = KeywordSet::new();
    assert_eq!(jaccard(&a, &b), 1.0);
    assert_eq!(jaccard(&empty, &empty), 0.0);
    assert_eq!(jaccard(&a, &empty), 0.0);
}
