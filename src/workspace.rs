//! Workspace file service contract
//!
//! The editor surface owns the real file tree; the core only consumes this
//! narrow list/read/write interface. A non-OK result means "file unavailable"
//! and callers degrade instead of aborting.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Entry kind reported by the file listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
}

/// One entry in the workspace listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub kind: FileKind,
    pub path: String,
}

/// File service consumed by indexing, context assembly, and the agent loop
#[async_trait]
pub trait WorkspaceFiles: Send + Sync {
    /// Ordered listing of all workspace entries
    async fn list_files(&self) -> Result<Vec<FileEntry>>;

    /// Full content of one file
    async fn read_file(&self, path: &str) -> Result<String>;

    /// Persist content to backend storage
    async fn write_file(&self, path: &str, content: &str) -> Result<()>;
}
