//! SQLite-backed collection of named cache stores.
//!
//! A [`CacheManager`] owns the backing database and hands out [`CacheStore`]
//! handles by name. Stores hold full responses keyed by absolute URL. The
//! methods present the async surface the rest of the crate works against;
//! each call is a single SQLite primitive under a mutex, so individual
//! operations are atomic but no coordination exists across calls.

mod migrations;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection};
use thiserror::Error;
use url::Url;

use crate::response::CachedResponse;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to create cache directory: {0}")]
    CreateDir(std::io::Error),
    #[error("Invalid stored header set: {0}")]
    Headers(#[from] serde_json::Error),
    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Cache database wrapper. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct CacheManager {
    conn: Arc<Mutex<Connection>>,
    /// Path to the database file
    pub path: PathBuf,
}

impl CacheManager {
    /// Open or create the cache database at the specified path
    pub fn open(path: PathBuf) -> Result<Self, CacheError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(CacheError::CreateDir)?;
        }

        let mut conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        migrations::run_migrations(&mut conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Open the cache database in the default location (~/.larder/larder.db)
    pub fn open_default() -> Result<Self, CacheError> {
        Self::open(crate::util::store_db_path())
    }

    /// Execute a closure with the connection
    fn with_connection<F, T>(&self, f: F) -> Result<T, CacheError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| CacheError::LockPoisoned)?;
        f(&conn).map_err(CacheError::Sqlite)
    }

    /// Open a store by name, creating it on first open.
    pub async fn open_store(&self, name: &str) -> Result<CacheStore, CacheError> {
        let id = self.with_connection(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                params![name, chrono::Utc::now().to_rfc3339()],
            )?;
            conn.query_row(
                "SELECT id FROM stores WHERE name = ?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
        })?;

        Ok(CacheStore {
            name: name.to_string(),
            id,
            conn: self.conn.clone(),
        })
    }

    /// Names of all existing stores, oldest first.
    pub async fn store_names(&self) -> Result<Vec<String>, CacheError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY id")?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(names)
        })
    }

    /// Delete a store and every entry in it. Returns whether the store existed.
    pub async fn delete_store(&self, name: &str) -> Result<bool, CacheError> {
        // Entries go with the store via ON DELETE CASCADE
        let deleted = self.with_connection(|conn| {
            conn.execute("DELETE FROM stores WHERE name = ?1", params![name])
        })?;
        Ok(deleted > 0)
    }

    /// Look a URL up across every store. When the same URL is present in more
    /// than one store, the store created earliest wins.
    pub async fn match_url(&self, url: &Url) -> Result<Option<CachedResponse>, CacheError> {
        let entry = self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT e.status, e.headers, e.body FROM entries e
                 JOIN stores s ON s.id = e.store_id
                 WHERE e.url = ?1
                 ORDER BY s.id
                 LIMIT 1",
            )?;
            let mut rows = stmt.query(params![url.as_str()])?;
            if let Some(row) = rows.next()? {
                Ok(Some((
                    row.get::<_, u16>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                )))
            } else {
                Ok(None)
            }
        })?;

        entry.map(decode_entry).transpose()
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("path", &self.path)
            .finish()
    }
}

/// Handle to one named store. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct CacheStore {
    name: String,
    id: i64,
    conn: Arc<Mutex<Connection>>,
}

impl CacheStore {
    /// The store's name as passed to [`CacheManager::open_store`].
    pub fn name(&self) -> &str {
        &self.name
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T, CacheError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| CacheError::LockPoisoned)?;
        f(&conn).map_err(CacheError::Sqlite)
    }

    /// Store a response under a URL, replacing any existing entry for that URL.
    pub async fn put(&self, url: &Url, response: &CachedResponse) -> Result<(), CacheError> {
        let headers = serde_json::to_string(&response.headers)?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO entries (store_id, url, status, headers, body, stored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    self.id,
                    url.as_str(),
                    response.status,
                    headers,
                    response.body,
                    chrono::Utc::now().to_rfc3339()
                ],
            )?;
            Ok(())
        })
    }

    /// Look up the response stored under a URL in this store only.
    pub async fn get(&self, url: &Url) -> Result<Option<CachedResponse>, CacheError> {
        let entry = self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT status, headers, body FROM entries WHERE store_id = ?1 AND url = ?2",
            )?;
            let mut rows = stmt.query(params![self.id, url.as_str()])?;
            if let Some(row) = rows.next()? {
                Ok(Some((
                    row.get::<_, u16>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                )))
            } else {
                Ok(None)
            }
        })?;

        entry.map(decode_entry).transpose()
    }

    /// URLs of every entry in this store, sorted.
    pub async fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.with_connection(|conn| {
            let mut stmt =
                conn.prepare("SELECT url FROM entries WHERE store_id = ?1 ORDER BY url")?;
            let urls = stmt
                .query_map(params![self.id], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(urls)
        })
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("name", &self.name)
            .finish()
    }
}

fn decode_entry(entry: (u16, String, Vec<u8>)) -> Result<CachedResponse, CacheError> {
    let (status, headers, body) = entry;
    let headers = serde_json::from_str(&headers)?;
    Ok(CachedResponse::new(status, headers, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_manager() -> (CacheManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let manager = CacheManager::open(dir.path().join("cache.db")).unwrap();
        (manager, dir)
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn page(body: &str) -> CachedResponse {
        CachedResponse::new(
            200,
            vec![("content-type".to_string(), "text/html".to_string())],
            body.as_bytes().to_vec(),
        )
    }

    #[test]
    fn test_cache_database_creation() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("cache.db");
        let _manager = CacheManager::open(db_path.clone()).unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_open_store_is_idempotent() {
        let (manager, _dir) = open_manager();

        let store = manager.open_store("app-static-v1").await.unwrap();
        manager.open_store("app-static-v1").await.unwrap();

        assert_eq!(store.name(), "app-static-v1");
        assert_eq!(
            manager.store_names().await.unwrap(),
            vec!["app-static-v1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let (manager, _dir) = open_manager();
        let store = manager.open_store("app-static-v1").await.unwrap();
        let key = url("https://example.com/index.html");
        let response = page("<html>home</html>");

        store.put(&key, &response).await.unwrap();
        let loaded = store.get(&key).await.unwrap().unwrap();

        assert_eq!(loaded, response);
    }

    #[tokio::test]
    async fn test_put_replaces_existing_entry() {
        let (manager, _dir) = open_manager();
        let store = manager.open_store("app-dynamic-v1").await.unwrap();
        let key = url("https://example.com/feed");

        store.put(&key, &page("old")).await.unwrap();
        store.put(&key, &page("new")).await.unwrap();

        let loaded = store.get(&key).await.unwrap().unwrap();
        assert_eq!(loaded.body, b"new");
        assert_eq!(store.keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_match_prefers_earliest_store() {
        let (manager, _dir) = open_manager();
        let first = manager.open_store("app-static-v1").await.unwrap();
        let second = manager.open_store("app-dynamic-v1").await.unwrap();
        let key = url("https://example.com/index.html");

        // Insertion order should not matter, only store creation order
        second.put(&key, &page("dynamic copy")).await.unwrap();
        first.put(&key, &page("static copy")).await.unwrap();

        let matched = manager.match_url(&key).await.unwrap().unwrap();
        assert_eq!(matched.body, b"static copy");
    }

    #[tokio::test]
    async fn test_match_misses_when_no_store_has_url() {
        let (manager, _dir) = open_manager();
        manager.open_store("app-static-v1").await.unwrap();

        let matched = manager
            .match_url(&url("https://example.com/missing"))
            .await
            .unwrap();
        assert!(matched.is_none());
    }

    #[tokio::test]
    async fn test_delete_store_removes_entries() {
        let (manager, _dir) = open_manager();
        let first = manager.open_store("app-static-v1").await.unwrap();
        let second = manager.open_store("app-static-v2").await.unwrap();
        let key = url("https://example.com/index.html");
        first.put(&key, &page("v1")).await.unwrap();
        second.put(&key, &page("v2")).await.unwrap();

        assert!(manager.delete_store("app-static-v1").await.unwrap());

        assert_eq!(
            manager.store_names().await.unwrap(),
            vec!["app-static-v2".to_string()]
        );
        // With the older store gone, the match falls through to the survivor
        let matched = manager.match_url(&key).await.unwrap().unwrap();
        assert_eq!(matched.body, b"v2");
    }

    #[tokio::test]
    async fn test_delete_missing_store_returns_false() {
        let (manager, _dir) = open_manager();
        assert!(!manager.delete_store("never-created").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_into_deleted_store_fails() {
        let (manager, _dir) = open_manager();
        let store = manager.open_store("app-dynamic-v1").await.unwrap();
        manager.delete_store("app-dynamic-v1").await.unwrap();

        let result = store.put(&url("https://example.com/feed"), &page("late")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_keys_lists_urls_sorted() {
        let (manager, _dir) = open_manager();
        let store = manager.open_store("app-static-v1").await.unwrap();

        store.put(&url("https://example.com/b"), &page("b")).await.unwrap();
        store.put(&url("https://example.com/a"), &page("a")).await.unwrap();

        assert_eq!(
            store.keys().await.unwrap(),
            vec![
                "https://example.com/a".to_string(),
                "https://example.com/b".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_reopen_preserves_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let key = url("https://example.com/index.html");

        {
            let manager = CacheManager::open(path.clone()).unwrap();
            let store = manager.open_store("app-static-v1").await.unwrap();
            store.put(&key, &page("persisted")).await.unwrap();
        }

        let manager = CacheManager::open(path).unwrap();
        let store = manager.open_store("app-static-v1").await.unwrap();
        let loaded = store.get(&key).await.unwrap().unwrap();
        assert_eq!(loaded.body, b"persisted");
    }
}
