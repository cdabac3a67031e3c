//! A minimal BM25 postings index: one per language plus one default.

use std::collections::{HashMap, HashSet};

/// Term-frequency saturation parameter.
const K1: f32 = 2.0;
/// Document-length normalization parameter.
const B: f32 = 0.75;

#[derive(Debug, Default)]
pub struct Bm25Index {
    /// term -> (doc id -> term frequency in that doc)
    postings: HashMap<String, HashMap<String, u32>>,
    doc_len: HashMap<String, u32>,
    total_len: u64,
}

impl Bm25Index {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn num_docs(&self) -> usize {
        self.doc_len.len()
    }

    fn avg_doc_len(&self) -> f32 {
        if self.doc_len.is_empty() {
            0.0
        } else {
            self.total_len as f32 / self.doc_len.len() as f32
        }
    }

    /// Idempotent by `id`: re-adding an id first removes its prior entry.
    pub fn put(&mut self, id: &str, tokens: &[String]) {
        self.remove(id);

        let mut tf: HashMap<&str, u32> = HashMap::new();
        for t in tokens {
            *tf.entry(t.as_str()).or_insert(0) += 1;
        }

        for (term, count) in tf {
            self.postings
                .entry(term.to_string())
                .or_default()
                .insert(id.to_string(), count);
        }

        let len = tokens.len() as u32;
        self.doc_len.insert(id.to_string(), len);
        self.total_len += u64::from(len);
    }

    pub fn remove(&mut self, id: &str) {
        if let Some(len) = self.doc_len.remove(id) {
            self.total_len = self.total_len.saturating_sub(u64::from(len));
        }
        for postings in self.postings.values_mut() {
            postings.remove(id);
        }
    }

    /// BM25 score for each document matching at least one query term.
    #[must_use]
    pub fn score(&self, query_tokens: &[String]) -> HashMap<String, f32> {
        let n = self.num_docs();
        if n == 0 {
            return HashMap::new();
        }
        let avgdl = self.avg_doc_len().max(1.0);

        let mut seen = HashSet::new();
        let mut scores: HashMap<String, f32> = HashMap::new();

        for term in query_tokens {
            if !seen.insert(term.as_str()) {
                continue;
            }
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let df = postings.len();
            if df == 0 {
                continue;
            }
            let idf = (((n as f32 - df as f32 + 0.5) / (df as f32 + 0.5)) + 1.0).ln();

            for (doc_id, &tf) in postings {
                let dl = *self.doc_len.get(doc_id).unwrap_or(&0) as f32;
                let denom = tf as f32 + K1 * (1.0 - B + B * dl / avgdl);
                let contribution = idf * (tf as f32 * (K1 + 1.0)) / denom;
                *scores.entry(doc_id.clone()).or_insert(0.0) += contribution;
            }
        }

        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn exact_term_match_scores_higher_than_unrelated_document() {
        let mut idx = Bm25Index::new();
        idx.put("a", &toks("rust systems programming language"));
        idx.put("b", &toks("python data science notebooks"));

        let scores = idx.score(&toks("rust programming"));
        assert!(scores.contains_key("a"));
        assert!(!scores.contains_key("b"));
    }

    #[test]
    fn put_is_idempotent_by_id() {
        let mut idx = Bm25Index::new();
        idx.put("a", &toks("one two three"));
        idx.put("a", &toks("one two three four"));
        assert_eq!(idx.num_docs(), 1);
        assert_eq!(*idx.doc_len.get("a").unwrap(), 4);
    }

    #[test]
    fn remove_drops_document_from_scoring() {
        let mut idx = Bm25Index::new();
        idx.put("a", &toks("rust programming"));
        idx.remove("a");
        let scores = idx.score(&toks("rust"));
        assert!(scores.is_empty());
        assert_eq!(idx.num_docs(), 0);
    }

    #[test]
    fn empty_index_scores_nothing() {
        let idx = Bm25Index::new();
        assert!(idx.score(&toks("anything")).is_empty());
    }

    #[test]
    fn term_frequency_increases_score() {
        let mut idx = Bm25Index::new();
        idx.put("a", &toks("rust rust rust"));
        idx.put("b", &toks("rust python java"));
        let scores = idx.score(&toks("rust"));
        assert!(scores["a"] > scores["b"]);
    }
}
