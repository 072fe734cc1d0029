//! Context file persistence
//!
//! The whole context is read and rewritten on every turn. Writes go through
//! a temp file in the same directory followed by a rename, so a crash
//! mid-write never truncates the log.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

use super::ConversationContext;

/// Load/save access to one context file
pub struct ContextStore {
    path: PathBuf,
}

impl ContextStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full context from disk
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(&self) -> Result<ConversationContext> {
        let content = std::fs::read_to_string(&self.path)?;
        let context = serde_json::from_str(&content)?;
        Ok(context)
    }

    /// Rewrite the full context atomically
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the write or rename fails; the
    /// in-memory context is untouched and the caller can retry or report.
    pub fn save(&self, context: &ConversationContext) -> Result<()> {
        let json = serde_json::to_string(context)?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| Error::Persistence(format!("temp file in {}: {e}", dir.display())))?;

        std::fs::write(tmp.path(), json)
            .map_err(|e| Error::Persistence(format!("write {}: {e}", self.path.display())))?;

        tmp.persist(&self.path)
            .map_err(|e| Error::Persistence(format!("rename to {}: {e}", self.path.display())))?;

        tracing::debug!(path = %self.path.display(), "context saved");
        Ok(())
    }
}
