use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{ContextEngineError, Result};

/// Supplies the revision string recorded when an anchor is captured.
pub trait RevisionSource: Send + Sync {
    fn current_revision(&self) -> Result<String>;
}

/// Reads the HEAD commit of the git repository containing `root`.
pub struct GitRevisionSource {
    root: PathBuf,
}

impl GitRevisionSource {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl RevisionSource for GitRevisionSource {
    fn current_revision(&self) -> Result<String> {
        let repo = gix::discover(&self.root).map_err(|e| git_error(&self.root, e))?;
        let head = repo.head_id().map_err(|e| git_error(&self.root, e))?;
        let sha = head.to_string();
        debug!(revision = %sha, "resolved HEAD");
        Ok(sha)
    }
}

fn git_error(root: &Path, e: impl std::fmt::Display) -> ContextEngineError {
    ContextEngineError::External {
        collaborator: "git".to_string(),
        message: format!("cannot resolve HEAD in '{}': {e}", root.display()),
    }
}

/// A revision known up front.
#[derive(Debug, Clone)]
pub struct FixedRevision(pub String);

impl RevisionSource for FixedRevision {
    fn current_revision(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
