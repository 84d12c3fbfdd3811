// SQLite persistence for the durable cache tier.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::cache::{CacheEntry, DurableTier};

/// SQLite-backed key/value store for cached aggregates. Several processes
/// may open the same file; WAL mode plus a busy timeout keeps them from
/// tripping over each other, and the last write to a key wins.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure the schema
    /// exists. Pass `":memory:"` for an ephemeral database (useful for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS cache_entries (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                written_at TEXT NOT NULL,
                ttl_ms     INTEGER NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection. A poisoned lock is reported as an
    /// error, which the cache treats like any other durable-tier failure.
    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database mutex poisoned"))
    }

    /// Write an entry, replacing whatever was stored under `key`.
    pub fn put_entry(&self, key: &str, entry: &CacheEntry<String>) -> Result<()> {
        let conn = self.conn()?;
        let ttl_ms = i64::try_from(entry.ttl.as_millis()).unwrap_or(i64::MAX);
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (key, value, written_at, ttl_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![key, entry.value, entry.written_at.to_rfc3339(), ttl_ms],
        )
        .context("failed to write cache entry")?;
        Ok(())
    }

    /// Read the entry stored under `key`, expired or not. Returns `None` if
    /// the key does not exist.
    pub fn get_entry(&self, key: &str) -> Result<Option<CacheEntry<String>>> {
        let conn = self.conn()?;
        let row: Option<(String, String, i64)> = conn
            .query_row(
                "SELECT value, written_at, ttl_ms FROM cache_entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .context("failed to read cache entry")?;

        let Some((value, written_at, ttl_ms)) = row else {
            return Ok(None);
        };

        let written_at = DateTime::parse_from_rfc3339(&written_at)
            .with_context(|| format!("corrupt timestamp for cache key {key}"))?
            .with_timezone(&Utc);
        let ttl_ms = u64::try_from(ttl_ms)
            .with_context(|| format!("negative ttl for cache key {key}"))?;

        Ok(Some(CacheEntry::new(
            value,
            written_at,
            Duration::from_millis(ttl_ms),
        )))
    }

    pub fn delete_entry(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
            .context("failed to delete cache entry")?;
        Ok(())
    }

    /// Delete every entry whose key contains `pattern`. Uses `instr` rather
    /// than `LIKE` so `%` and `_` in the pattern match literally.
    pub fn delete_matching(&self, pattern: &str) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn
            .execute(
                "DELETE FROM cache_entries WHERE instr(key, ?1) > 0",
                params![pattern],
            )
            .context("failed to delete matching cache entries")?;
        Ok(removed)
    }

    pub fn clear_entries(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM cache_entries", [])
            .context("failed to clear cache entries")?;
        Ok(())
    }

    /// Return the number of stored entries, expired ones included.
    pub fn entry_count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
            .context("failed to count cache entries")?;
        Ok(count as usize)
    }
}

impl DurableTier for Database {
    fn load(&self, key: &str) -> Result<Option<CacheEntry<String>>> {
        self.get_entry(key)
    }

    fn store(&self, key: &str, entry: &CacheEntry<String>) -> Result<()> {
        self.put_entry(key, entry)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.delete_entry(key)
    }

    fn remove_matching(&self, pattern: &str) -> Result<usize> {
        self.delete_matching(pattern)
    }

    fn clear(&self) -> Result<()> {
        self.clear_entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn entry(value: &str) -> CacheEntry<String> {
        CacheEntry::new(value.to_string(), Utc::now(), Duration::from_secs(60))
    }

    #[test]
    fn open_creates_cache_table() {
        let db = test_db();
        let conn = db.conn().unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"cache_entries".to_string()));
    }

    #[test]
    fn put_and_get_round_trip_keeps_stamp() {
        let db = test_db();
        let original = CacheEntry::new(
            "{\"a\":1}".to_string(),
            DateTime::parse_from_rfc3339("2024-05-01T12:00:00.250Z")
                .unwrap()
                .with_timezone(&Utc),
            Duration::from_millis(1500),
        );

        db.put_entry("stats:player:p1", &original).unwrap();
        let loaded = db.get_entry("stats:player:p1").unwrap().unwrap();

        assert_eq!(loaded, original);
    }

    #[test]
    fn get_missing_key_is_none() {
        let db = test_db();
        assert!(db.get_entry("nope").unwrap().is_none());
    }

    #[test]
    fn put_overwrites_previous_value() {
        let db = test_db();
        db.put_entry("games:all", &entry("1")).unwrap();
        db.put_entry("games:all", &entry("2")).unwrap();

        assert_eq!(db.get_entry("games:all").unwrap().unwrap().value, "2");
        assert_eq!(db.entry_count().unwrap(), 1);
    }

    #[test]
    fn delete_matching_is_literal_substring() {
        let db = test_db();
        db.put_entry("stats:player:p1", &entry("1")).unwrap();
        db.put_entry("stats:top_players:30", &entry("2")).unwrap();
        db.put_entry("stats:topxplayers", &entry("3")).unwrap();
        db.put_entry("games:all", &entry("4")).unwrap();

        // Under LIKE the `_` would also match "stats:topxplayers".
        let removed = db.delete_matching("stats:top_").unwrap();
        assert_eq!(removed, 1);
        assert!(db.get_entry("stats:topxplayers").unwrap().is_some());

        let removed = db.delete_matching("stats:").unwrap();
        assert_eq!(removed, 2);
        assert!(db.get_entry("games:all").unwrap().is_some());
    }

    #[test]
    fn delete_and_clear() {
        let db = test_db();
        db.put_entry("a", &entry("1")).unwrap();
        db.put_entry("b", &entry("2")).unwrap();

        db.delete_entry("a").unwrap();
        assert!(db.get_entry("a").unwrap().is_none());
        assert_eq!(db.entry_count().unwrap(), 1);

        db.clear_entries().unwrap();
        assert_eq!(db.entry_count().unwrap(), 0);
    }

    #[test]
    fn corrupt_timestamp_is_an_error() {
        let db = test_db();
        db.conn()
            .unwrap()
            .execute(
                "INSERT INTO cache_entries (key, value, written_at, ttl_ms) VALUES ('k', '1', 'yesterday', 10)",
                [],
            )
            .unwrap();

        assert!(db.get_entry("k").is_err());
    }

    #[test]
    fn poisoned_lock_is_an_error_the_cache_swallows() {
        use crate::cache::{CacheKey, ResultCache, TtlCategory, TtlPolicy};

        let db = test_db();
        let crashed = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = db.conn.lock().unwrap();
                panic!("writer crashed while holding the connection");
            })
            .join()
        });
        assert!(crashed.is_err());
        assert!(db.get_entry("games:all").is_err());

        let cache = ResultCache::new(Box::new(db), TtlPolicy::default());
        cache.set(&CacheKey::games(), &7, TtlCategory::Games);
        assert_eq!(cache.get::<i32>(&CacheKey::games()), Some(7));
        assert_eq!(cache.stats().durable_errors, 1);
    }

    #[test]
    fn file_database_is_shared_between_handles() {
        let path = std::env::temp_dir().join("courtside_db_shared_test.db");
        let _ = std::fs::remove_file(&path);
        let path_str = path.to_str().unwrap();

        let writer = Database::open(path_str).unwrap();
        let reader = Database::open(path_str).unwrap();
        writer.put_entry("seasons:all", &entry("[]")).unwrap();

        assert_eq!(reader.get_entry("seasons:all").unwrap().unwrap().value, "[]");

        drop(writer);
        drop(reader);
        let _ = std::fs::remove_file(&path);
    }
}
