use chrono::{DateTime, NaiveDate, Utc};

use crate::types::{Adr, Candidate, CandidateType, JournalEntry};

const JOURNAL_ID_SHA_LEN: usize = 8;
const JOURNAL_TITLE_CHARS: usize = 50;

/// Parses an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value.trim()) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// `journal-<first 8 chars of the commit sha>`.
pub fn journal_id(commit_sha: &str) -> String {
    let short: String = commit_sha.chars().take(JOURNAL_ID_SHA_LEN).collect();
    format!("journal-{short}")
}

pub fn adr_candidate(adr: &Adr) -> Candidate {
    let mut text = format!("{}\n{}", adr.title, adr.decision);
    for consequence in &adr.consequences {
        text.push('\n');
        text.push_str(consequence);
    }

    Candidate {
        title: Some(adr.title.clone()),
        timestamp: parse_timestamp(&adr.created_at),
        paths: adr.affected_areas.clone(),
        ..Candidate::new(adr.id.clone(), CandidateType::Adr, text)
    }
}

/// Converts a journal entry. Returns `None` when its timestamp is unparseable.
pub fn journal_candidate(entry: &JournalEntry) -> Option<Candidate> {
    let timestamp = parse_timestamp(&entry.timestamp)?;
    let head: String = entry.summary.chars().take(JOURNAL_TITLE_CHARS).collect();

    let mut text = entry.summary.clone();
    for file in &entry.changed_files {
        text.push('\n');
        text.push_str(file);
    }

    Some(Candidate {
        title: Some(format!("Journal: {head}...")),
        timestamp: Some(timestamp),
        paths: entry.changed_files.clone(),
        ..Candidate::new(journal_id(&entry.commit_sha), CandidateType::Journal, text)
    })
}
