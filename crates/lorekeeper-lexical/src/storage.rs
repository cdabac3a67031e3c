//! `rusqlite`-backed durable storage for the article payload. The BM25
//! postings built over these rows are in-memory only and rebuilt from
//! this table on startup.

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

use lorekeeper_core::error::{Error, Result};
use lorekeeper_core::model::Article;

pub type SqlitePool = Pool<SqliteConnectionManager>;

pub fn open_pool(path: &str) -> Result<SqlitePool> {
    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::new(manager).map_err(|e| Error::internal(format!("opening sqlite pool: {e}")))?;
    init_schema(&pool)?;
    Ok(pool)
}

pub fn init_schema(pool: &SqlitePool) -> Result<()> {
    let conn = pool.get()?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS articles (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            summary TEXT NOT NULL,
            tags TEXT NOT NULL,
            lang TEXT NOT NULL,
            author TEXT,
            original_url TEXT,
            created_date TEXT NOT NULL,
            registrar TEXT NOT NULL,
            title_embedding TEXT NOT NULL,
            summary_embedding TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_articles_registrar ON articles(registrar);
        CREATE INDEX IF NOT EXISTS idx_articles_created_date ON articles(created_date);",
    )?;
    Ok(())
}

pub fn put_article(pool: &SqlitePool, article: &Article) -> Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO articles
            (id, title, content, summary, tags, lang, author, original_url, created_date, registrar, title_embedding, summary_embedding)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            content = excluded.content,
            summary = excluded.summary,
            tags = excluded.tags,
            lang = excluded.lang,
            author = excluded.author,
            original_url = excluded.original_url,
            created_date = excluded.created_date,
            registrar = excluded.registrar,
            title_embedding = excluded.title_embedding,
            summary_embedding = excluded.summary_embedding",
        params![
            article.id,
            article.title,
            article.content,
            article.summary,
            serde_json::to_string(&article.tags).unwrap_or_default(),
            article.lang,
            article.author,
            article.original_url,
            article.created_date.to_rfc3339(),
            article.registrar,
            serde_json::to_string(&article.title_embedding).unwrap_or_default(),
            serde_json::to_string(&article.summary_embedding).unwrap_or_default(),
        ],
    )?;
    Ok(())
}

pub fn delete_article(pool: &SqlitePool, id: &str) -> Result<()> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM articles WHERE id = ?1", params![id])?;
    Ok(())
}

pub fn get_article(pool: &SqlitePool, id: &str) -> Result<Option<Article>> {
    let conn = pool.get()?;
    let row = conn
        .query_row(
            "SELECT id, title, content, summary, tags, lang, author, original_url, created_date, registrar, title_embedding, summary_embedding
             FROM articles WHERE id = ?1",
            params![id],
            row_to_article,
        )
        .optional()?;
    Ok(row)
}

pub fn list_all_articles(pool: &SqlitePool) -> Result<Vec<Article>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, title, content, summary, tags, lang, author, original_url, created_date, registrar, title_embedding, summary_embedding
         FROM articles",
    )?;
    let rows = stmt.query_map([], row_to_article)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn list_by_owner(
    pool: &SqlitePool,
    owner: &str,
    date_from: Option<DateTime<Utc>>,
    date_to: Option<DateTime<Utc>>,
    from: usize,
    size: usize,
) -> Result<(usize, Vec<Article>)> {
    let conn = pool.get()?;
    let from_str = date_from.map(|d| d.to_rfc3339());
    let to_str = date_to.map(|d| d.to_rfc3339());

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM articles
         WHERE registrar = ?1
           AND (?2 IS NULL OR created_date >= ?2)
           AND (?3 IS NULL OR created_date <= ?3)",
        params![owner, from_str, to_str],
        |r| r.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT id, title, content, summary, tags, lang, author, original_url, created_date, registrar, title_embedding, summary_embedding
         FROM articles
         WHERE registrar = ?1
           AND (?2 IS NULL OR created_date >= ?2)
           AND (?3 IS NULL OR created_date <= ?3)
         ORDER BY created_date DESC
         LIMIT ?4 OFFSET ?5",
    )?;
    let rows = stmt.query_map(
        params![owner, from_str, to_str, size as i64, from as i64],
        row_to_article,
    )?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok((total.max(0) as usize, out))
}

fn row_to_article(row: &rusqlite::Row<'_>) -> rusqlite::Result<Article> {
    let tags_json: String = row.get(4)?;
    let created_date_str: String = row.get(8)?;
    let title_embedding_json: String = row.get(10)?;
    let summary_embedding_json: String = row.get(11)?;

    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        summary: row.get(3)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        lang: row.get(5)?,
        author: row.get(6)?,
        original_url: row.get(7)?,
        created_date: DateTime::parse_from_rfc3339(&created_date_str)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        registrar: row.get(9)?,
        title_embedding: serde_json::from_str(&title_embedding_json).unwrap_or_default(),
        summary_embedding: serde_json::from_str(&summary_embedding_json).unwrap_or_default(),
    })
}
