//! In-memory vector store
//!
//! Session-local, append/overwrite only. Search is brute-force cosine
//! similarity over every stored vector; scores are raw cosine values,
//! monotonic but not normalized.

use super::chunker::Chunk;
use dashmap::DashMap;

/// One stored chunk with its embedding
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

/// Nearest-neighbor hit
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
}

/// Id-keyed vector store; upserting an existing id overwrites it
#[derive(Default)]
pub struct VectorStore {
    entries: DashMap<String, IndexEntry>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, entry: IndexEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries stored for one source path
    pub fn entries_for_path(&self, path: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.chunk.source_path == path)
            .count()
    }

    /// Top `limit` entries by cosine similarity to `query`, best first
    pub fn search(&self, query: &[f32], limit: usize) -> Vec<SearchHit> {
        if limit == 0 || query.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|entry| SearchHit {
                id: entry.id.clone(),
                score: cosine_sim(query, &entry.vector),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        hits
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            vector,
            chunk: Chunk {
                id: id.to_string(),
                source_path: "test.py".to_string(),
                text: "text".to_string(),
            },
        }
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let store = VectorStore::new();
        store.upsert(entry("a", vec![1.0, 0.0]));
        store.upsert(entry("b", vec![0.0, 1.0]));
        store.upsert(entry("c", vec![0.7, 0.7]));

        let hits = store.search(&[1.0, 0.0], 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].id, "c");
        assert_eq!(hits[2].id, "b");
        assert!(hits[0].score > hits[1].score);
        assert!(hits[1].score > hits[2].score);
    }

    #[test]
    fn test_upsert_overwrites_same_id() {
        let store = VectorStore::new();
        store.upsert(entry("a", vec![1.0, 0.0]));
        store.upsert(entry("a", vec![0.0, 1.0]));

        assert_eq!(store.len(), 1);
        let hits = store.search(&[0.0, 1.0], 1);
        assert!(hits[0].score > 0.99);
    }

    #[test]
    fn test_search_limit_zero_is_empty() {
        let store = VectorStore::new();
        store.upsert(entry("a", vec![1.0, 0.0]));
        assert!(store.search(&[1.0, 0.0], 0).is_empty());
        assert!(store.search(&[], 5).is_empty());
    }

    #[test]
    fn test_cosine_mismatched_dimensions() {
        assert_eq!(cosine_sim(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_sim(&[], &[]), 0.0);
        assert_eq!(cosine_sim(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
