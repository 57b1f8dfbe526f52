/// Assembles context packs from a packet and its related documents.
pub mod builder;

/// Converts decision records and journal entries into scoring candidates.
pub mod candidates;

/// Renders the Markdown sections of a context pack.
pub mod formatter;

/// Token counting for budget enforcement.
pub mod tokenizer;

pub use builder::{ContextAssembler, SAFETY_RESERVE_TOKENS};
pub use candidates::{adr_candidate, journal_candidate, journal_id, parse_timestamp};
pub use formatter::SECTION_SEPARATOR;
pub use tokenizer::{BpeTokenizer, HeuristicTokenizer, Tokenizer};
