use std::collections::HashSet;
use std::sync::Arc;

use esync_blobstore::{BlobStore, BlobStoreJsonExt};
use esync_domain::{TenantArtifact, TenantId};
use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::SearchError;
use crate::hit::SearchHit;

struct Row {
    filename: String,
    filepath: String,
    embedding: Vec<f32>,
    norm: f32,
}

/// In-memory, request-scoped embedding matrix for one tenant. Construct per
/// request and discard; there is no cross-request caching.
pub struct SearchIndex {
    rows: Vec<Row>,
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

impl SearchIndex {
    pub async fn load(blobs: &Arc<dyn BlobStore>, uuid: &TenantId) -> Result<Self, SearchError> {
        let key = format!("{uuid}.json");
        let artifact: TenantArtifact = blobs
            .get_json(&key)
            .await?
            .ok_or(SearchError::NotFound)?;
        Ok(Self::from_artifact(artifact))
    }

    fn from_artifact(artifact: TenantArtifact) -> Self {
        let rows = artifact
            .entries
            .into_iter()
            .filter(|e| !e.is_corrupt)
            .filter_map(|e| {
                let embedding = e.embedding?;
                let n = norm(&embedding);
                Some(Row {
                    filename: e.filename,
                    filepath: e.filepath,
                    embedding,
                    norm: n,
                })
            })
            .collect::<Vec<_>>();
        debug!(rows = rows.len(), "search index constructed");
        Self { rows }
    }

    fn candidate_indices(&self, exclude: &HashSet<String>) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| !exclude.contains(&r.filename))
            .map(|(i, _)| i)
            .collect()
    }

    fn similarity_at(&self, idx: usize, q: &[f32], q_norm: f32) -> f32 {
        let row = &self.rows[idx];
        if row.norm == 0.0 || q_norm == 0.0 {
            return 0.0;
        }
        dot(&row.embedding, q) / (row.norm * q_norm)
    }

    fn hit_at(&self, idx: usize, similarity: Option<f32>) -> SearchHit {
        let row = &self.rows[idx];
        SearchHit {
            filename: row.filename.clone(),
            filepath: row.filepath.clone(),
            similarity,
        }
    }

    pub fn search_ranked(&self, q: &[f32], top_k: usize, exclude: &HashSet<String>) -> Vec<SearchHit> {
        let q_norm = norm(q);
        let mut scored: Vec<(usize, f32)> = self
            .candidate_indices(exclude)
            .into_iter()
            .map(|idx| (idx, self.similarity_at(idx, q, q_norm)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(top_k)
            .map(|(idx, sim)| self.hit_at(idx, Some(sim)))
            .collect()
    }

    pub fn search_shuffle(
        &self,
        q: &[f32],
        top_k: usize,
        pool: Option<usize>,
        exclude: &HashSet<String>,
    ) -> Vec<SearchHit> {
        let pool_size = match pool {
            Some(p) => p.max(top_k),
            None => (top_k * 3).max(20),
        };
        let q_norm = norm(q);
        let mut scored: Vec<(usize, f32)> = self
            .candidate_indices(exclude)
            .into_iter()
            .map(|idx| (idx, self.similarity_at(idx, q, q_norm)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(pool_size);

        let mut rng = rand::thread_rng();
        let mut sampled: Vec<(usize, f32)> = scored
            .choose_multiple(&mut rng, top_k.min(scored.len()))
            .cloned()
            .collect();
        sampled.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        sampled
            .into_iter()
            .map(|(idx, sim)| self.hit_at(idx, Some(sim)))
            .collect()
    }

    pub fn search_random(&self, count: usize, exclude: &HashSet<String>) -> Vec<SearchHit> {
        let candidates = self.candidate_indices(exclude);
        let mut rng = rand::thread_rng();
        candidates
            .choose_multiple(&mut rng, count.min(candidates.len()))
            .map(|&idx| self.hit_at(idx, None))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esync_domain::EmbeddingEntry;

    fn entry(filename: &str, folder: &str, embedding: Vec<f32>) -> EmbeddingEntry {
        EmbeddingEntry::valid(
            filename.to_string(),
            format!("https://example.com/{filename}"),
            folder.to_string(),
            embedding,
        )
    }

    fn sample_index() -> SearchIndex {
        let artifact = TenantArtifact {
            entries: vec![
                entry("a.jpg", "", vec![1.0, 0.0, 0.0]),
                entry("b.jpg", "", vec![0.0, 1.0, 0.0]),
                entry("c.jpg", "", vec![0.9, 0.1, 0.0]),
                {
                    let mut corrupt = entry("d.jpg", "", vec![0.0, 0.0, 1.0]);
                    corrupt.is_corrupt = true;
                    corrupt.embedding = None;
                    corrupt
                },
            ],
        };
        SearchIndex::from_artifact(artifact)
    }

    #[test]
    fn corrupt_entries_are_excluded_from_index() {
        let idx = sample_index();
        assert_eq!(idx.len(), 3);
    }

    #[test]
    fn search_ranked_orders_by_cosine_descending() {
        let idx = sample_index();
        let hits = idx.search_ranked(&[1.0, 0.0, 0.0], 2, &HashSet::new());
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].filename, "a.jpg");
        assert_eq!(hits[1].filename, "c.jpg");
    }

    #[test]
    fn search_ranked_applies_exclusion() {
        let idx = sample_index();
        let mut exclude = HashSet::new();
        exclude.insert("a.jpg".to_string());
        let hits = idx.search_ranked(&[1.0, 0.0, 0.0], 2, &exclude);
        assert!(hits.iter().all(|h| h.filename != "a.jpg"));
    }

    #[test]
    fn search_random_never_exceeds_available_rows() {
        let idx = sample_index();
        let hits = idx.search_random(100, &HashSet::new());
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| h.similarity.is_none()));
    }

    #[test]
    fn search_shuffle_respects_top_k_and_pool_floor() {
        let idx = sample_index();
        let hits = idx.search_shuffle(&[1.0, 0.0, 0.0], 2, None, &HashSet::new());
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn load_missing_artifact_is_not_found() {
        use esync_blobstore::MemoryBlobStore;
        let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let uuid = TenantId::new(uuid::Uuid::new_v4());
        let result = SearchIndex::load(&blobs, &uuid).await;
        assert!(matches!(result, Err(SearchError::NotFound)));
    }

    #[tokio::test]
    async fn load_reads_artifact_and_filters_corrupt() {
        use esync_blobstore::MemoryBlobStore;
        let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let uuid = TenantId::new(uuid::Uuid::new_v4());
        let artifact = TenantArtifact {
            entries: vec![entry("a.jpg", "", vec![1.0, 0.0])],
        };
        blobs.put_json(&format!("{uuid}.json"), &artifact).await.unwrap();

        let idx = SearchIndex::load(&blobs, &uuid).await.unwrap();
        assert_eq!(idx.len(), 1);
    }
}
