/// Parsing of Markdown journal files.
use chrono::{SecondsFormat, Utc};

use crate::types::JournalEntry;

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Files,
    Summary,
    Risks,
    NextSteps,
}

/// Parses every `## [timestamp] ...` block in a journal file.
///
/// Blocks without both a `**Packet:**` and a `**Commit:**` line are skipped.
/// A header without a bracketed timestamp is stamped with the current time.
pub fn parse_journal_entries(content: &str) -> Vec<JournalEntry> {
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    for line in content.lines() {
        if let Some(header) = line.strip_prefix("## ") {
            blocks.push(vec![header]);
        } else if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }

    blocks.iter().filter_map(|b| parse_block(b)).collect()
}

fn parse_block(lines: &[&str]) -> Option<JournalEntry> {
    let header = lines.first()?;
    let timestamp = header
        .find('[')
        .and_then(|start| {
            header[start + 1..]
                .find(']')
                .map(|end| header[start + 1..start + 1 + end].to_string())
        })
        .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

    let mut packet_id = String::new();
    let mut commit_sha = String::new();
    let mut changed_files = Vec::new();
    let mut summary: Vec<&str> = Vec::new();
    let mut risks = Vec::new();
    let mut next_steps = Vec::new();
    let mut section = Section::None;

    for line in &lines[1..] {
        if let Some(rest) = line.strip_prefix("**Packet:**") {
            packet_id = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("**Commit:**") {
            commit_sha = rest.trim().to_string();
        } else if line.starts_with("### Changed Files") {
            section = Section::Files;
        } else if line.starts_with("### Summary") {
            section = Section::Summary;
        } else if line.starts_with("### Risks") {
            section = Section::Risks;
        } else if line.starts_with("### Next Steps") {
            section = Section::NextSteps;
        } else if let Some(item) = line.strip_prefix("- ") {
            let item = item.trim().to_string();
            match section {
                Section::Files => changed_files.push(item),
                Section::Risks => risks.push(item),
                Section::NextSteps => next_steps.push(item),
                Section::None | Section::Summary => {}
            }
        } else if section == Section::Summary && !line.trim().is_empty() {
            summary.push(line.trim());
        }
    }

    if packet_id.is_empty() || commit_sha.is_empty() {
        return None;
    }

    Some(JournalEntry {
        packet_id,
        commit_sha,
        changed_files,
        summary: summary.join(" "),
        risks,
        next_steps,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOURNAL: &str = "# March 2026\n\n\
## [2026-03-02T10:00:00.000Z] FEAT-001\n\
**Packet:** FEAT-001\n\
**Commit:** 0123456789abcdef\n\
\n\
### Changed Files\n\
- src/auth/oauth.ts\n\
- src/auth/session.ts\n\
\n\
### Summary\n\
Added the OAuth callback handler.\n\
Stores the session token.\n\
\n\
### Risks\n\
- Token refresh untested\n\
\n\
## [2026-03-03T09:00:00.000Z] orphan\n\
Nothing here.\n";

    #[test]
    fn test_parses_complete_entry() {
        let entries = parse_journal_entries(JOURNAL);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.packet_id, "FEAT-001");
        assert_eq!(entry.commit_sha, "0123456789abcdef");
        assert_eq!(entry.timestamp, "2026-03-02T10:00:00.000Z");
        assert_eq!(entry.changed_files, vec!["src/auth/oauth.ts", "src/auth/session.ts"]);
        assert_eq!(
            entry.summary,
            "Added the OAuth callback handler. Stores the session token."
        );
        assert_eq!(entry.risks, vec!["Token refresh untested"]);
        assert!(entry.next_steps.is_empty());
    }

    #[test]
    fn test_empty_file() {
        assert!(parse_journal_entries("").is_empty());
    }
}
