//! Packet lifecycle: id allocation, creation, and status transitions.

use tracing::info;

use crate::errors::{ContextEngineError, Result};
use crate::store::DocumentStore;
use crate::types::{Packet, PacketMetadata, PacketStatus, PacketType};

/// Body written below the front matter of a new packet.
pub const PACKET_BODY_TEMPLATE: &str = "## Notes

Add implementation notes here.

## Progress

- [ ] Started
- [ ] In progress
- [ ] Ready for review
- [ ] Completed";

/// Fields supplied when creating a packet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPacket {
    pub packet_type: PacketType,
    pub title: String,
    pub goal: String,
    pub dod: Vec<String>,
    pub constraints: Vec<String>,
}

/// Next id for `packet_type`: one past the highest `<PREFIX>-<n>` in
/// `existing`, zero-padded to three digits.
pub fn next_packet_id(packet_type: PacketType, existing: &[String]) -> String {
    let prefix = packet_type.id_prefix();
    let highest = existing
        .iter()
        .filter_map(|id| id.strip_prefix(&prefix)?.strip_prefix('-'))
        .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{prefix}-{:03}", highest + 1)
}

/// Strips list markers (`- `, `* `) and drops blank items.
pub fn clean_list_items(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            item.trim()
                .trim_start_matches(['-', '*'])
                .trim()
                .to_string()
        })
        .filter(|item| !item.is_empty())
        .collect()
}

/// Creates a draft packet under the next free id and stores it.
pub fn create_packet(store: &dyn DocumentStore, new: NewPacket, now: &str) -> Result<Packet> {
    let title = new.title.trim();
    let goal = new.goal.trim();
    if title.is_empty() {
        return Err(ContextEngineError::InvalidOperation {
            message: "Packet title is required".to_string(),
        });
    }
    if goal.is_empty() {
        return Err(ContextEngineError::InvalidOperation {
            message: "Packet goal is required".to_string(),
        });
    }
    let dod = clean_list_items(&new.dod);
    if dod.is_empty() {
        return Err(ContextEngineError::InvalidOperation {
            message: "At least one Definition of Done item is required".to_string(),
        });
    }

    let id = next_packet_id(new.packet_type, &store.packet_ids()?);
    let packet = Packet {
        id,
        packet_type: new.packet_type,
        title: title.to_string(),
        status: PacketStatus::Draft,
        goal: goal.to_string(),
        dod,
        constraints: clean_list_items(&new.constraints),
        tests: Vec::new(),
        repo_truth: Vec::new(),
        metadata: PacketMetadata {
            created_at: now.to_string(),
            updated_at: now.to_string(),
            ..PacketMetadata::default()
        },
    };
    store.create_packet(&packet, PACKET_BODY_TEMPLATE)?;
    info!(packet = %packet.id, "created packet");
    Ok(packet)
}

/// Moves packet `id` to `next`, rejecting transitions the lifecycle forbids.
pub fn transition_packet(
    store: &dyn DocumentStore,
    id: &str,
    next: PacketStatus,
    now: &str,
) -> Result<Packet> {
    let mut packet = store.load_packet(id)?;
    if !packet.status.can_transition_to(next) {
        let allowed: Vec<&str> = packet
            .status
            .allowed_transitions()
            .iter()
            .map(PacketStatus::as_str)
            .collect();
        return Err(ContextEngineError::InvalidOperation {
            message: format!(
                "Invalid status transition: {} -> {} (allowed: {})",
                packet.status.as_str(),
                next.as_str(),
                if allowed.is_empty() {
                    "none".to_string()
                } else {
                    allowed.join(", ")
                }
            ),
        });
    }

    packet.status = next;
    packet.metadata.updated_at = now.to_string();
    store.save_packet(&packet)?;
    info!(packet = %packet.id, status = next.as_str(), "changed packet status");
    Ok(packet)
}
