//! Project health: anchor drift, packets without anchors, and packets with no
//! recent journal activity.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::anchors::AnchorManager;
use crate::config::REPO_MAP_PATH;
use crate::context::parse_timestamp;
use crate::errors::Result;
use crate::pool::default_workers;
use crate::store::DocumentStore;
use crate::types::{DriftStatus, PacketStatus};

/// An active packet with no journal activity for longer than this is stale.
pub const STALE_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Missing,
    Orphan,
    Drift,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthIssue {
    pub kind: IssueKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_id: Option<String>,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthReport {
    pub drift_count: usize,
    pub orphan_count: usize,
    pub stale_count: usize,
    pub missing_repo_map: bool,
    pub issues: Vec<HealthIssue>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues_with(&self, severity: Severity) -> impl Iterator<Item = &HealthIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    fn push(&mut self, kind: IssueKind, packet_id: Option<&str>, message: String, severity: Severity) {
        self.issues.push(HealthIssue {
            kind,
            packet_id: packet_id.map(str::to_string),
            message,
            severity,
        });
    }
}

/// Builds the health report for the project at `root` as of `now`.
///
/// Only packets with status `active` are examined. A non-valid anchor is a
/// drift issue; a deleted one is an error, everything else a warning.
pub fn check_health(
    root: &Path,
    store: &dyn DocumentStore,
    anchors: &AnchorManager<'_>,
    now: DateTime<Utc>,
) -> Result<HealthReport> {
    let mut report = HealthReport::default();

    if !root.join(REPO_MAP_PATH).is_file() {
        report.missing_repo_map = true;
        report.push(
            IssueKind::Missing,
            None,
            "REPO_MAP.md is missing".to_string(),
            Severity::Warning,
        );
    }

    let mut last_activity: HashMap<String, DateTime<Utc>> = HashMap::new();
    for entry in store.journal_entries()? {
        let Some(ts) = parse_timestamp(&entry.timestamp) else {
            debug!(commit = %entry.commit_sha, "journal entry without a usable timestamp");
            continue;
        };
        last_activity
            .entry(entry.packet_id)
            .and_modify(|latest| *latest = (*latest).max(ts))
            .or_insert(ts);
    }

    let workers = default_workers();
    for packet in store.packets()? {
        if packet.status != PacketStatus::Active {
            continue;
        }

        if packet.repo_truth.is_empty() {
            report.orphan_count += 1;
            report.push(
                IssueKind::Orphan,
                Some(&packet.id),
                format!("Packet {} has no semantic anchors", packet.id),
                Severity::Warning,
            );
        } else {
            for result in anchors.check_all(&packet.repo_truth, workers) {
                if result.status == DriftStatus::Valid {
                    continue;
                }
                report.drift_count += 1;
                let severity = match result.status {
                    DriftStatus::Deleted => Severity::Error,
                    _ => Severity::Warning,
                };
                report.push(
                    IssueKind::Drift,
                    Some(&packet.id),
                    format!(
                        "{}: {} has {}",
                        packet.id,
                        result.anchor.symbol,
                        result.status.as_str()
                    ),
                    severity,
                );
            }
        }

        let stale_after = Duration::days(STALE_DAYS);
        let stale = match last_activity.get(&packet.id) {
            Some(latest) => {
                let idle = now - *latest;
                (idle > stale_after).then(|| {
                    format!(
                        "Packet {} has no journal activity in {} days",
                        packet.id,
                        idle.num_days()
                    )
                })
            }
            None => parse_timestamp(&packet.metadata.created_at).and_then(|created| {
                let age = now - created;
                (age > stale_after).then(|| {
                    format!(
                        "Packet {} has no journal entries (created {} days ago)",
                        packet.id,
                        age.num_days()
                    )
                })
            }),
        };
        if let Some(message) = stale {
            report.stale_count += 1;
            report.push(IssueKind::Stale, Some(&packet.id), message, Severity::Warning);
        }
    }

    info!(
        drift = report.drift_count,
        orphans = report.orphan_count,
        stale = report.stale_count,
        "checked context health"
    );
    Ok(report)
}
