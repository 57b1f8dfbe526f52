//! Document storage for packets, decision records, and journal entries.
//!
//! The assembler and indexer only see the [`DocumentStore`] trait. The
//! filesystem implementation keeps everything as Markdown under `context/`.

mod frontmatter;
mod fs;
mod journal;

pub use frontmatter::{parse_front_matter, render_front_matter};
pub use fs::FsDocumentStore;
pub use journal::parse_journal_entries;

use crate::errors::Result;
use crate::types::{Adr, JournalEntry, Packet};

/// Source of the documents a context pack is built from.
///
/// Listing methods skip unreadable documents rather than failing, so a
/// single bad file never hides the rest of the corpus.
pub trait DocumentStore {
    /// Loads one packet. A missing packet is `NotFound`, a malformed one `Parse`.
    fn load_packet(&self, id: &str) -> Result<Packet>;

    /// Writes a packet, replacing its front matter and keeping its body.
    /// A packet that becomes completed moves to the completed set.
    fn save_packet(&self, packet: &Packet) -> Result<()>;

    /// Writes a new packet with `body` below its front matter. Fails with
    /// `InvalidOperation` if the id is taken.
    fn create_packet(&self, packet: &Packet, body: &str) -> Result<()>;

    /// Ids of every stored packet, readable or not.
    fn packet_ids(&self) -> Result<Vec<String>> {
        Ok(self.packets()?.into_iter().map(|p| p.id).collect())
    }

    /// Every readable packet, active first.
    fn packets(&self) -> Result<Vec<Packet>>;

    /// Every readable decision record.
    fn decision_records(&self) -> Result<Vec<Adr>>;

    /// Every journal entry across all journal files.
    fn journal_entries(&self) -> Result<Vec<JournalEntry>>;
}
