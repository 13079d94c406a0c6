//! Local semantic code index
//!
//! Turns workspace files into embedded chunks and answers nearest-neighbor
//! queries over them. The index is session-local: nothing is persisted and
//! entries live until the process ends.

use crate::config::IndexConfig;
use crate::error::Result;
use crate::metrics::METRICS;
use crate::workspace::{FileKind, WorkspaceFiles};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub mod chunker;
pub mod embedder;
pub mod store;

pub use chunker::{Chunk, Chunker, Language};
pub use embedder::{CachedEmbedder, Embedder, HttpEmbedder};
pub use store::{IndexEntry, SearchHit, VectorStore};

/// One retrieval hit, shaped for direct use as pack material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    /// Source path of the chunk
    pub title: String,
    /// Also the source path; kept separate for link rendering upstream
    pub url: String,
    pub content: String,
    /// Raw cosine similarity, monotonic, not normalized
    pub score: f32,
}

#[derive(Debug, Clone)]
struct ChunkDocument {
    title: String,
    url: String,
    content: String,
}

/// Queryable nearest-neighbor store over chunk embeddings
pub struct EmbeddingIndex {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    store: VectorStore,
    documents: DashMap<String, ChunkDocument>,
    ready: OnceCell<bool>,
    indexing: AtomicBool,
    excluded: Vec<glob::Pattern>,
}

impl EmbeddingIndex {
    pub fn new(config: IndexConfig, embedder: Arc<dyn Embedder>) -> Self {
        let excluded = config
            .excluded_patterns
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("Ignoring invalid exclusion pattern {:?}: {}", p, e);
                    None
                }
            })
            .collect();

        Self {
            chunker: Chunker::new(config.window_lines),
            embedder,
            store: VectorStore::new(),
            documents: DashMap::new(),
            ready: OnceCell::new(),
            indexing: AtomicBool::new(false),
            excluded,
        }
    }

    /// Warm up the embedding model exactly once. Concurrent callers await the
    /// same in-flight initialization; a failure is cached as "not ready" and
    /// every later operation degrades to empty results.
    pub async fn init(&self) -> bool {
        *self
            .ready
            .get_or_init(|| async {
                match self.embedder.prepare().await {
                    Ok(()) => {
                        info!(
                            "Embedding index ready, dimension {}",
                            self.embedder.dimension()
                        );
                        true
                    }
                    Err(e) => {
                        warn!("Embedding index initialization failed: {}", e);
                        false
                    }
                }
            })
            .await
    }

    /// Chunk and embed one file. Re-adding a path overwrites its chunk ids,
    /// so unchanged files do not grow the index.
    pub async fn add_file(&self, path: &str, content: &str) -> Result<()> {
        if !self.init().await {
            debug!("Index not ready, skipping {}", path);
            return Ok(());
        }

        let chunks = self.chunker.chunk_file(path, content);
        if chunks.is_empty() {
            return Ok(());
        }

        let count = chunks.len();
        for chunk in chunks {
            let vector = self.embedder.embed(&chunk.text).await?;
            self.documents.insert(
                chunk.id.clone(),
                ChunkDocument {
                    title: chunk.source_path.clone(),
                    url: chunk.source_path.clone(),
                    content: chunk.text.clone(),
                },
            );
            self.store.upsert(IndexEntry {
                id: chunk.id.clone(),
                vector,
                chunk,
            });
        }

        METRICS.files_indexed.inc();
        METRICS.chunks_indexed.inc_by(count as u64);
        debug!("Indexed {} ({} chunks)", path, count);

        Ok(())
    }

    /// Nearest-neighbor retrieval for a free-text query. Never errors: an
    /// unready index or a failed query embedding yields an empty list.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<RetrievedChunk> {
        if limit == 0 {
            return Vec::new();
        }

        if !self.init().await {
            return Vec::new();
        }

        let query_vector = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Query embedding failed: {}", e);
                return Vec::new();
            }
        };

        METRICS.searches_total.inc();

        self.store
            .search(&query_vector, limit)
            .into_iter()
            .filter_map(|hit| {
                self.documents.get(&hit.id).map(|doc| RetrievedChunk {
                    id: hit.id,
                    title: doc.title.clone(),
                    url: doc.url.clone(),
                    content: doc.content.clone(),
                    score: hit.score,
                })
            })
            .collect()
    }

    /// Index every non-excluded workspace file, sequentially. A second call
    /// while a pass is running is a no-op; callers re-trigger for freshness.
    pub async fn index_workspace(&self, files: &dyn WorkspaceFiles) -> Result<()> {
        if self
            .indexing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Workspace indexing already in progress, skipping");
            return Ok(());
        }

        let result = self.index_workspace_inner(files).await;
        self.indexing.store(false, Ordering::SeqCst);
        result
    }

    async fn index_workspace_inner(&self, files: &dyn WorkspaceFiles) -> Result<()> {
        let entries = files.list_files().await?;
        let mut indexed = 0usize;

        for entry in entries {
            if entry.kind != FileKind::File {
                continue;
            }
            if self.is_excluded(&entry.name) {
                debug!("Skipping excluded file {}", entry.path);
                continue;
            }

            let content = match files.read_file(&entry.path).await {
                Ok(c) => c,
                Err(e) => {
                    warn!("Failed to read {}: {}", entry.path, e);
                    continue;
                }
            };

            if let Err(e) = self.add_file(&entry.path, &content).await {
                warn!("Failed to index {}: {}", entry.path, e);
                continue;
            }

            indexed += 1;
        }

        info!("Workspace indexing complete: {} files", indexed);
        Ok(())
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.excluded.iter().any(|p| p.matches(name))
    }

    /// Total stored entries
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Stored entries for one source path
    pub fn entries_for_path(&self, path: &str) -> usize {
        self.store.entries_for_path(path)
    }
}
