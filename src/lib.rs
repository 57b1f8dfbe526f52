//! Context curation for AI-assisted development.
//!
//! Work is tracked as packets. A packet pins the code it depends on through
//! semantic anchors: structure-only hashes of named declarations that survive
//! reformatting but change when the code does. Context packs combine a packet
//! with the decision records and journal entries most relevant to it, cut to
//! a token budget.

pub mod anchors;
pub mod config;
pub mod context;
pub mod errors;
pub mod extraction;
pub mod health;
pub mod index;
pub mod packets;
pub mod pool;
pub mod relevance;
pub mod search;
pub mod store;
pub mod types;
pub mod vcs;
