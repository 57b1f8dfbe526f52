use chrono::SecondsFormat;

use crate::types::{Candidate, CandidateType, Packet, RelevanceResult};

/// Placed between the sections of a context pack.
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

const HASH_PREVIEW_CHARS: usize = 20;

const RULES: &str = "## Rules for Agent

When working on this packet:

1. **Cite file paths and symbols**: Always reference the exact file paths and symbol names from the anchors above.
2. **Do not assume line numbers**: Line numbers may have changed; use semantic anchors to locate code.
3. **Check for drift**: If code structure seems different from the anchors, flag it for review.
4. **Respect constraints**: Follow all constraints listed above.
5. **Complete DoD items**: Work toward completing each definition-of-done item.
";

/// Title, status, goal, definition of done, and constraints.
pub fn format_header(packet: &Packet) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Context Pack: {}\n\n", packet.id));
    out.push_str(&format!("**Title:** {}\n", packet.title));
    out.push_str(&format!("**Status:** {}\n\n", packet.status.as_str()));
    out.push_str(&format!("## Goal\n{}\n\n", packet.goal));
    out.push_str("## Definition of Done");
    for item in &packet.dod {
        out.push_str(&format!("\n- [ ] {item}"));
    }

    if !packet.constraints.is_empty() {
        out.push_str("\n\n## Constraints");
        for constraint in &packet.constraints {
            out.push_str(&format!("\n- {constraint}"));
        }
    }
    out
}

/// One block per semantic anchor with a shortened hash.
pub fn format_anchors(packet: &Packet) -> String {
    if packet.repo_truth.is_empty() {
        return "## Repo Truth\n\n_No anchors defined._".to_string();
    }

    let mut out = String::from("## Repo Truth (Semantic Anchors)\n\n");
    for anchor in &packet.repo_truth {
        let hash = anchor
            .semantic_hash
            .get(..HASH_PREVIEW_CHARS)
            .unwrap_or(&anchor.semantic_hash);
        out.push_str(&format!("### `{}`\n", anchor.symbol));
        out.push_str(&format!("- **Path:** `{}`\n", anchor.path));
        out.push_str(&format!("- **Type:** {}\n", anchor.symbol_type.as_str()));
        out.push_str(&format!("- **Hash:** `{hash}...`\n"));
        out.push_str(&format!("- **Captured:** {}\n", anchor.captured_at));
        if let Some(ref sig) = anchor.signature {
            out.push_str(&format!("- **Signature:** `{sig}`\n"));
        }
        if let (Some(start), Some(end)) = (anchor.line_start, anchor.line_end) {
            out.push_str(&format!("- **Lines:** {start}-{end}\n"));
        }
        out.push('\n');
    }
    out
}

pub fn format_rules() -> &'static str {
    RULES
}

/// Renders one selected candidate as it appears under Related Context.
///
/// Decision records show their score; journal entries show their timestamp.
pub fn format_related_entry(candidate: &Candidate, result: &RelevanceResult) -> String {
    let title = candidate.title.as_deref().unwrap_or(&candidate.id);
    let reasons = result.reasons.join(", ");

    match candidate.timestamp {
        Some(ts) if result.candidate_type == CandidateType::Journal => format!(
            "**{title}**\n_Timestamp: {}_\n_Reasons: {reasons}_\n\n",
            ts.to_rfc3339_opts(SecondsFormat::Millis, true)
        ),
        _ => format!(
            "**{title}** (score: {:.2})\n_Reasons: {reasons}_\n\n",
            result.score
        ),
    }
}

/// Groups rendered entries under their headings.
///
/// Returns `None` when nothing was selected, so the section is left out.
pub fn format_related_section(adr_entries: &[String], journal_entries: &[String]) -> Option<String> {
    if adr_entries.is_empty() && journal_entries.is_empty() {
        return None;
    }

    let mut out = String::from("## Related Context\n\n");
    if !adr_entries.is_empty() {
        out.push_str("### Related ADRs\n\n");
        for entry in adr_entries {
            out.push_str(entry);
        }
    }
    if !journal_entries.is_empty() {
        out.push_str("### Recent Journal Entries\n\n");
        for entry in journal_entries {
            out.push_str(entry);
        }
    }
    Some(out.trim_end().to_string())
}
