use std::fs;

use context_engine::errors::ContextEngineError;
use context_engine::packets::*;
use context_engine::store::{DocumentStore, FsDocumentStore};
use context_engine::types::*;
use tempfile::TempDir;

const NOW: &str = "2026-03-01T00:00:00.000Z";

fn oauth_packet() -> NewPacket {
    NewPacket {
        packet_type: PacketType::Feat,
        title: "OAuth login".to_string(),
        goal: "Implement OAuth authentication".to_string(),
        dod: vec!["- Callback handled".to_string(), "".to_string()],
        constraints: vec!["No new services".to_string()],
    }
}

#[test]
fn test_create_allocates_sequential_ids() {
    let dir = TempDir::new().unwrap();
    let store = FsDocumentStore::new(dir.path());

    let first = create_packet(&store, oauth_packet(), NOW).unwrap();
    let second = create_packet(&store, oauth_packet(), NOW).unwrap();
    let bug = create_packet(
        &store,
        NewPacket {
            packet_type: PacketType::Bug,
            ..oauth_packet()
        },
        NOW,
    )
    .unwrap();

    assert_eq!(first.id, "FEAT-001");
    assert_eq!(second.id, "FEAT-002");
    assert_eq!(bug.id, "BUG-001");
    assert_eq!(first.status, PacketStatus::Draft);
    assert_eq!(first.dod, vec!["Callback handled"]);
    assert_eq!(first.metadata.created_at, NOW);

    let path = dir.path().join("context/packets/active/FEAT-001.md");
    let content = fs::read_to_string(path).unwrap();
    assert!(content.contains("## Progress"));
    assert_eq!(store.load_packet("FEAT-001").unwrap(), first);
}

#[test]
fn test_create_requires_goal_and_dod() {
    let dir = TempDir::new().unwrap();
    let store = FsDocumentStore::new(dir.path());

    let no_goal = NewPacket {
        goal: "  ".to_string(),
        ..oauth_packet()
    };
    assert!(matches!(
        create_packet(&store, no_goal, NOW),
        Err(ContextEngineError::InvalidOperation { .. })
    ));

    let no_dod = NewPacket {
        dod: vec!["- ".to_string()],
        ..oauth_packet()
    };
    assert!(matches!(
        create_packet(&store, no_dod, NOW),
        Err(ContextEngineError::InvalidOperation { .. })
    ));
    assert!(store.packet_ids().unwrap().is_empty());
}

#[test]
fn test_lifecycle_to_completion() {
    let dir = TempDir::new().unwrap();
    let store = FsDocumentStore::new(dir.path());
    let packet = create_packet(&store, oauth_packet(), NOW).unwrap();

    let later = "2026-03-02T00:00:00.000Z";
    let active = transition_packet(&store, &packet.id, PacketStatus::Active, later).unwrap();
    assert_eq!(active.status, PacketStatus::Active);
    assert_eq!(active.metadata.updated_at, later);

    transition_packet(&store, &packet.id, PacketStatus::Blocked, later).unwrap();
    transition_packet(&store, &packet.id, PacketStatus::Active, later).unwrap();
    transition_packet(&store, &packet.id, PacketStatus::Completed, later).unwrap();

    assert!(!dir.path().join("context/packets/active/FEAT-001.md").exists());
    let completed = dir.path().join("context/packets/completed/FEAT-001.md");
    assert!(fs::read_to_string(completed).unwrap().contains("## Notes"));
}

#[test]
fn test_invalid_transitions_are_rejected() {
    let dir = TempDir::new().unwrap();
    let store = FsDocumentStore::new(dir.path());
    let packet = create_packet(&store, oauth_packet(), NOW).unwrap();

    let err = transition_packet(&store, &packet.id, PacketStatus::Completed, NOW).unwrap_err();
    match err {
        ContextEngineError::InvalidOperation { message } => {
            assert!(message.contains("draft -> completed"));
            assert!(message.contains("allowed: active"));
        }
        other => panic!("expected invalid operation, got {other}"),
    }

    transition_packet(&store, &packet.id, PacketStatus::Active, NOW).unwrap();
    transition_packet(&store, &packet.id, PacketStatus::Cancelled, NOW).unwrap();
    let err = transition_packet(&store, &packet.id, PacketStatus::Active, NOW).unwrap_err();
    match err {
        ContextEngineError::InvalidOperation { message } => assert!(message.contains("none")),
        other => panic!("expected invalid operation, got {other}"),
    }
    assert_eq!(
        store.load_packet(&packet.id).unwrap().status,
        PacketStatus::Cancelled
    );
}

#[test]
fn test_transition_of_missing_packet() {
    let dir = TempDir::new().unwrap();
    let store = FsDocumentStore::new(dir.path());
    let err = transition_packet(&store, "FEAT-404", PacketStatus::Active, NOW).unwrap_err();
    assert!(matches!(err, ContextEngineError::NotFound { .. }));
}

#[test]
fn test_status_transition_table() {
    assert!(PacketStatus::Draft.can_transition_to(PacketStatus::Active));
    assert!(!PacketStatus::Draft.can_transition_to(PacketStatus::Blocked));
    assert!(PacketStatus::Blocked.can_transition_to(PacketStatus::Cancelled));
    assert!(PacketStatus::Completed.allowed_transitions().is_empty());
    assert_eq!(PacketType::from_str("refactor"), Some(PacketType::Refactor));
    assert_eq!(PacketType::Docs.id_prefix(), "DOCS");
    assert_eq!(PacketType::from_str("epic"), None);
}
