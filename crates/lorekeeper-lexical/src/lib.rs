//! Embedded per-language BM25 lexical index (C5).
//!
//! One [`bm25::Bm25Index`] per supported language plus one default index
//! built from casefolded Unicode words across every article, so a query
//! issued against a language subfield that scores nothing falls back to
//! the default field (§4.5). Durable storage is `rusqlite`; the BM25
//! postings are rebuilt from it on [`SqliteLexicalIndex::open`].

pub mod analyzer;
pub mod bm25;
pub mod storage;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use lorekeeper_core::error::Result;
use lorekeeper_core::model::{Article, Hit};
use lorekeeper_core::traits::LexicalIndex;

use bm25::Bm25Index;
use storage::SqlitePool;

pub struct SqliteLexicalIndex {
    pool: SqlitePool,
    by_lang: Mutex<HashMap<String, Bm25Index>>,
    default_index: Mutex<Bm25Index>,
}

impl SqliteLexicalIndex {
    pub fn open(database_path: &str) -> Result<Self> {
        let pool = storage::open_pool(database_path)?;
        let index = Self {
            pool,
            by_lang: Mutex::new(HashMap::new()),
            default_index: Mutex::new(Bm25Index::new()),
        };
        index.rebuild()?;
        Ok(index)
    }

    fn rebuild(&self) -> Result<()> {
        let articles = storage::list_all_articles(&self.pool)?;
        let mut by_lang = self.by_lang.lock();
        let mut default_index = self.default_index.lock();
        by_lang.clear();
        *default_index = Bm25Index::new();
        for article in &articles {
            index_article(&mut by_lang, &mut default_index, article);
        }
        Ok(())
    }

    fn searchable_text(article: &Article) -> String {
        format!(
            "{} {} {}",
            article.title, article.summary, article.content
        )
    }
}

fn index_article(
    by_lang: &mut HashMap<String, Bm25Index>,
    default_index: &mut Bm25Index,
    article: &Article,
) {
    let text = SqliteLexicalIndex::searchable_text(article);
    let lang_tokens = analyzer::analyze(&article.lang, &text);
    by_lang
        .entry(article.lang.clone())
        .or_default()
        .put(&article.id, &lang_tokens);

    let default_tokens = analyzer::default_tokenize(&text);
    default_index.put(&article.id, &default_tokens);
}

fn deindex_article(
    by_lang: &mut HashMap<String, Bm25Index>,
    default_index: &mut Bm25Index,
    id: &str,
) {
    for idx in by_lang.values_mut() {
        idx.remove(id);
    }
    default_index.remove(id);
}

#[async_trait]
impl LexicalIndex for SqliteLexicalIndex {
    async fn put(&self, article: &Article) -> Result<()> {
        storage::put_article(&self.pool, article)?;

        let mut by_lang = self.by_lang.lock();
        let mut default_index = self.default_index.lock();
        deindex_article(&mut by_lang, &mut default_index, &article.id);
        index_article(&mut by_lang, &mut default_index, article);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        storage::delete_article(&self.pool, id)?;
        let mut by_lang = self.by_lang.lock();
        let mut default_index = self.default_index.lock();
        deindex_article(&mut by_lang, &mut default_index, id);
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Article>> {
        storage::get_article(&self.pool, id)
    }

    async fn search(&self, query: &str, lang: Option<&str>, size: usize) -> Result<Vec<Hit>> {
        let scores = {
            let by_lang = self.by_lang.lock();
            let default_index = self.default_index.lock();

            let lang_scores = lang.and_then(|l| {
                let tokens = analyzer::analyze(l, query);
                by_lang.get(l).map(|idx| idx.score(&tokens))
            });

            match lang_scores {
                Some(scores) if !scores.is_empty() => scores,
                _ => {
                    let tokens = analyzer::default_tokenize(query);
                    default_index.score(&tokens)
                }
            }
        };

        let mut ranked: Vec<(String, f32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(size);

        let mut hits = Vec::with_capacity(ranked.len());
        for (id, score) in ranked {
            if let Some(article) = storage::get_article(&self.pool, &id)? {
                hits.push(Hit { article, score });
            }
        }
        Ok(hits)
    }

    async fn list_by_owner(
        &self,
        owner: &str,
        date_from: Option<DateTime<Utc>>,
        date_to: Option<DateTime<Utc>>,
        from: usize,
        size: usize,
    ) -> Result<(usize, Vec<Article>)> {
        storage::list_by_owner(&self.pool, owner, date_from, date_to, from, size)
    }
}
