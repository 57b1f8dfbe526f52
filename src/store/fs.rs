use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{ADRS_DIR, JOURNAL_DIR, PACKETS_ACTIVE_DIR, PACKETS_COMPLETED_DIR};
use crate::errors::{ContextEngineError, Result};
use crate::store::frontmatter::{parse_front_matter, render_front_matter};
use crate::store::journal::parse_journal_entries;
use crate::store::DocumentStore;
use crate::types::{Adr, JournalEntry, Packet, PacketStatus};

/// Markdown documents under a project's `context/` directory.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of an existing packet document, active before completed.
    pub fn packet_path(&self, id: &str) -> Option<PathBuf> {
        [PACKETS_ACTIVE_DIR, PACKETS_COMPLETED_DIR]
            .iter()
            .map(|dir| self.root.join(dir).join(format!("{id}.md")))
            .find(|path| path.is_file())
    }

    /// Where a packet without a document is written, by status.
    fn new_packet_path(&self, packet: &Packet) -> PathBuf {
        let dir = match packet.status {
            PacketStatus::Completed => PACKETS_COMPLETED_DIR,
            _ => PACKETS_ACTIVE_DIR,
        };
        self.root.join(dir).join(format!("{}.md", packet.id))
    }

    fn write_packet(&self, path: &Path, packet: &Packet, body: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, render_front_matter(packet, body)?)?;
        debug!(packet = %packet.id, path = %path.display(), "saved packet");
        Ok(())
    }

    fn read_document<T: DeserializeOwned>(&self, path: &Path) -> Result<(T, String)> {
        let content = fs::read_to_string(path)?;
        parse_front_matter(&content, &path.display().to_string())
    }

    /// Parses every Markdown document in `dir`, skipping the ones that fail.
    fn read_all<T: DeserializeOwned>(&self, dir: &Path, max_depth: usize) -> Vec<T> {
        markdown_files(dir, max_depth)
            .into_iter()
            .filter_map(|path| match self.read_document::<T>(&path) {
                Ok((doc, _)) => Some(doc),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable document");
                    None
                }
            })
            .collect()
    }
}

impl DocumentStore for FsDocumentStore {
    fn load_packet(&self, id: &str) -> Result<Packet> {
        let path = self
            .packet_path(id)
            .ok_or_else(|| ContextEngineError::NotFound {
                message: format!("Packet {id} not found"),
                path: self.root.join(PACKETS_ACTIVE_DIR).join(format!("{id}.md")).display().to_string(),
            })?;
        let (packet, _) = self.read_document::<Packet>(&path)?;
        Ok(packet)
    }

    fn save_packet(&self, packet: &Packet) -> Result<()> {
        let existing = self.packet_path(&packet.id);
        let body = match &existing {
            Some(path) => self.read_document::<serde_yaml::Value>(path)?.1,
            None => String::new(),
        };
        let path = match (&existing, packet.status) {
            (_, PacketStatus::Completed) => self.new_packet_path(packet),
            (Some(path), _) => path.clone(),
            (None, _) => self.new_packet_path(packet),
        };

        self.write_packet(&path, packet, &body)?;
        if let Some(old) = existing.filter(|old| *old != path) {
            fs::remove_file(&old)?;
            debug!(packet = %packet.id, from = %old.display(), "moved packet");
        }
        Ok(())
    }

    fn create_packet(&self, packet: &Packet, body: &str) -> Result<()> {
        if let Some(path) = self.packet_path(&packet.id) {
            return Err(ContextEngineError::InvalidOperation {
                message: format!("Packet {} already exists at {}", packet.id, path.display()),
            });
        }
        self.write_packet(&self.new_packet_path(packet), packet, body)
    }

    fn packet_ids(&self) -> Result<Vec<String>> {
        let ids = [PACKETS_ACTIVE_DIR, PACKETS_COMPLETED_DIR]
            .iter()
            .flat_map(|dir| markdown_files(&self.root.join(dir), 1))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        Ok(ids)
    }

    fn packets(&self) -> Result<Vec<Packet>> {
        let mut packets = self.read_all::<Packet>(&self.root.join(PACKETS_ACTIVE_DIR), 1);
        packets.extend(self.read_all::<Packet>(&self.root.join(PACKETS_COMPLETED_DIR), 1));
        Ok(packets)
    }

    fn decision_records(&self) -> Result<Vec<Adr>> {
        Ok(self.read_all(&self.root.join(ADRS_DIR), 1))
    }

    fn journal_entries(&self) -> Result<Vec<JournalEntry>> {
        let mut entries = Vec::new();
        for path in markdown_files(&self.root.join(JOURNAL_DIR), usize::MAX) {
            match fs::read_to_string(&path) {
                Ok(content) => entries.extend(parse_journal_entries(&content)),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable journal"),
            }
        }
        Ok(entries)
    }
}

/// Markdown files under `dir`, sorted by path. A missing directory is empty.
fn markdown_files(dir: &Path, max_depth: usize) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
        .collect()
}
