//! Stream Key Storage
//! Mission: Persist the key registry the media server checks on publish

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

/// A stream key known to the media server.
#[derive(Debug, Clone, Serialize)]
pub struct StreamKey {
    #[serde(rename = "streamId")]
    pub id: i64,
    #[serde(rename = "streamKey")]
    pub stream_key: String,
    #[serde(rename = "isLive")]
    pub is_live: bool,
}

/// Stream key registry with SQLite backend
pub struct StreamKeyStore {
    db_path: PathBuf,
}

impl StreamKeyStore {
    /// Create a new registry and initialize the schema.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            db_path: db_path.into(),
        };
        store.init_db()?;
        Ok(store)
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path).context("Failed to open stream key database")
    }

    fn init_db(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS stream_keys (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                stream_key TEXT NOT NULL UNIQUE,
                is_live INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Mint a new key. Keys start out idle.
    pub fn create(&self) -> Result<StreamKey> {
        let key = Uuid::new_v4().to_string();

        let conn = self.open()?;
        conn.execute(
            "INSERT INTO stream_keys (stream_key, is_live) VALUES (?1, 0)",
            params![key],
        )
        .context("Failed to insert stream key")?;

        info!("🔑 Created stream key: {}", key);

        Ok(StreamKey {
            id: conn.last_insert_rowid(),
            stream_key: key,
            is_live: false,
        })
    }

    /// List all keys.
    pub fn list(&self) -> Result<Vec<StreamKey>> {
        let conn = self.open()?;

        let mut stmt =
            conn.prepare("SELECT id, stream_key, is_live FROM stream_keys ORDER BY id")?;

        let keys = stmt
            .query_map([], |row| {
                Ok(StreamKey {
                    id: row.get(0)?,
                    stream_key: row.get(1)?,
                    is_live: row.get::<_, i64>(2)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(keys)
    }

    /// Flip a key's live flag. Returns false when the key is unknown.
    pub fn set_live(&self, stream_key: &str, live: bool) -> Result<bool> {
        let conn = self.open()?;

        let rows = conn.execute(
            "UPDATE stream_keys SET is_live = ?1 WHERE stream_key = ?2",
            params![live as i64, stream_key],
        )?;

        Ok(rows == 1)
    }

    /// Delete a key by id.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.open()?;

        let rows = conn.execute("DELETE FROM stream_keys WHERE id = ?1", params![id])?;
        if rows == 1 {
            info!("🗑️  Deleted stream key: {}", id);
        }

        Ok(rows == 1)
    }
}
