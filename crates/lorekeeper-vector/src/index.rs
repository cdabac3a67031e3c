use std::collections::HashMap;

use async_trait::async_trait;
use hnsw_rs::prelude::*;
use parking_lot::Mutex;
use tracing::debug;

use lorekeeper_core::error::{Error, Result};
use lorekeeper_core::model::EMBEDDING_DIM;
use lorekeeper_core::traits::VectorIndex;

/// Maximum number of graph layers; 16 comfortably covers the element
/// counts a single-process deployment of this system is expected to hold.
const MAX_LAYERS: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct VectorIndexConfig {
    pub dimension: usize,
    pub max_elements: usize,
    pub m: usize,
    pub ef_construction: usize,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        VectorIndexConfig {
            dimension: EMBEDDING_DIM,
            max_elements: 200_000,
            m: 16,
            ef_construction: 200,
        }
    }
}

struct PointMeta {
    article_id: String,
    lang: String,
}

/// Embedded HNSW realization of C6.
pub struct HnswVectorIndex {
    config: VectorIndexConfig,
    graph: Mutex<Hnsw<'static, f32, DistCosine>>,
    /// internal HNSW point id -> (article id, lang); entries are removed
    /// (not the underlying vector) on delete or upsert-overwrite.
    meta: Mutex<HashMap<usize, PointMeta>>,
    /// article id -> current internal point id, so re-upserting an id
    /// orphans its previous point rather than growing the mapping unbounded.
    by_article_id: Mutex<HashMap<String, usize>>,
    next_id: Mutex<usize>,
}

impl HnswVectorIndex {
    #[must_use]
    pub fn new(config: VectorIndexConfig) -> Self {
        let graph = Hnsw::<f32, DistCosine>::new(
            config.m,
            config.max_elements,
            MAX_LAYERS,
            config.ef_construction,
            DistCosine {},
        );
        HnswVectorIndex {
            config,
            graph: Mutex::new(graph),
            meta: Mutex::new(HashMap::new()),
            by_article_id: Mutex::new(HashMap::new()),
            next_id: Mutex::new(0),
        }
    }

    /// Number of ids currently resolvable (excludes orphaned points).
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.meta.lock().len()
    }

    fn validate_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.config.dimension {
            return Err(Error::validation(format!(
                "expected a {}-dimension vector, got {}",
                self.config.dimension,
                vector.len()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for HnswVectorIndex {
    async fn upsert(&self, id: &str, vector: &[f32], lang: &str) -> Result<()> {
        self.validate_dimension(vector)?;

        let internal_id = {
            let mut next_id = self.next_id.lock();
            let internal_id = *next_id;
            *next_id += 1;
            internal_id
        };

        self.graph.lock().insert((vector, internal_id));
        self.meta.lock().insert(
            internal_id,
            PointMeta {
                article_id: id.to_string(),
                lang: lang.to_string(),
            },
        );

        // Re-upserting an id orphans whatever internal point it used to
        // resolve to; search already filters orphans via the meta map.
        if let Some(previous) = self
            .by_article_id
            .lock()
            .insert(id.to_string(), internal_id)
        {
            self.meta.lock().remove(&previous);
            debug!(id, previous, "orphaned previous vector on upsert overwrite");
        }

        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        size: usize,
        lang: Option<&str>,
    ) -> Result<Vec<(String, f32)>> {
        self.validate_dimension(query)?;

        if size == 0 {
            return Ok(Vec::new());
        }

        // Over-fetch when filtering by language since some neighbours in
        // the raw HNSW result may belong to other languages or be orphans.
        let over_fetch_factor = if lang.is_some() { 4 } else { 2 };
        let search_k = size * over_fetch_factor;
        let ef_search = (search_k * 2).max(200);

        let neighbours = self.graph.lock().search(query, search_k, ef_search);

        let meta = self.meta.lock();
        let mut results = Vec::with_capacity(size);
        for n in neighbours {
            let Some(m) = meta.get(&n.d_id) else {
                continue; // orphaned point
            };
            if let Some(lang) = lang {
                if m.lang != lang {
                    continue;
                }
            }
            // DistCosine reports 1 - cosine_similarity; invert back to a
            // [-1, 1] similarity score (typically [0, 1] for unit vectors).
            let score = 1.0 - n.distance;
            results.push((m.article_id.clone(), score));
            if results.len() >= size {
                break;
            }
        }

        Ok(results)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if let Some(internal_id) = self.by_article_id.lock().remove(id) {
            self.meta.lock().remove(&internal_id);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn unit_vector(dim: usize, hot: usize) -> Vec<f32> {
        let mut v = vec![0.0_f32; dim];
        v[hot % dim] = 1.0;
        v
    }

    fn small_config() -> VectorIndexConfig {
        VectorIndexConfig {
            dimension: 8,
            max_elements: 1000,
            m: 16,
            ef_construction: 200,
        }
    }

    #[tokio::test]
    async fn upsert_then_search_returns_self_as_top_hit() {
        let index = HnswVectorIndex::new(small_config());
        let v = unit_vector(8, 0);
        index.upsert("a", &v, "en").await.unwrap();

        let hits = index.search(&v, 1, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "a");
        assert!(hits[0].1 >= 0.999, "score was {}", hits[0].1);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let index = HnswVectorIndex::new(small_config());
        let err = index.upsert("a", &[0.0, 1.0], "en").await.unwrap_err();
        assert_eq!(err.category(), "ValidationFailed");

        let err = index.search(&[0.0, 1.0], 1, None).await.unwrap_err();
        assert_eq!(err.category(), "ValidationFailed");
    }

    #[tokio::test]
    async fn delete_removes_id_from_subsequent_search() {
        let index = HnswVectorIndex::new(small_config());
        let v = unit_vector(8, 1);
        index.upsert("b", &v, "en").await.unwrap();
        assert_eq!(index.live_count(), 1);

        index.delete("b").await.unwrap();
        assert_eq!(index.live_count(), 0);

        let hits = index.search(&v, 5, None).await.unwrap();
        assert!(hits.iter().all(|(id, _)| id != "b"));
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_a_no_op() {
        let index = HnswVectorIndex::new(small_config());
        index.delete("never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn upsert_overwrite_orphans_previous_point() {
        let index = HnswVectorIndex::new(small_config());
        let v1 = unit_vector(8, 2);
        let v2 = unit_vector(8, 3);
        index.upsert("c", &v1, "en").await.unwrap();
        assert_eq!(index.live_count(), 1);
        index.upsert("c", &v2, "en").await.unwrap();
        assert_eq!(index.live_count(), 1);

        let hits = index.search(&v2, 1, None).await.unwrap();
        assert_eq!(hits[0].0, "c");
    }

    #[tokio::test]
    async fn search_filters_by_language() {
        let index = HnswVectorIndex::new(small_config());
        let v = unit_vector(8, 4);
        index.upsert("en-doc", &v, "en").await.unwrap();
        index.upsert("ja-doc", &v, "ja").await.unwrap();

        let hits = index.search(&v, 5, Some("ja")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "ja-doc");
    }

    #[tokio::test]
    async fn search_with_size_zero_returns_empty() {
        let index = HnswVectorIndex::new(small_config());
        let hits = index.search(&unit_vector(8, 0), 0, None).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn concurrent_upserts_are_all_visible() {
        let index = std::sync::Arc::new(HnswVectorIndex::new(small_config()));
        let mut handles = Vec::new();
        for i in 0..16 {
            let index = index.clone();
            handles.push(tokio::spawn(async move {
                let v = unit_vector(8, i);
                index.upsert(&format!("doc-{i}"), &v, "en").await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(index.live_count(), 16);
    }
}
