use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use super::ObjectStore;
use crate::error::{Error, Result};

/// Default database path (~/.local/share/bucket-inspector/snapshots.db or platform equivalent)
pub fn default_db_path() -> Result<PathBuf> {
    let data_dir = directories::ProjectDirs::from("", "", "bucket-inspector")
        .ok_or_else(|| Error::Config("could not determine data directory".to_string()))?
        .data_dir()
        .to_path_buf();
    Ok(data_dir.join("snapshots.db"))
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS objects (
            key TEXT PRIMARY KEY NOT NULL,
            body BLOB NOT NULL,
            written_at INTEGER NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Object store in a single SQLite file. Open once per command.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io("create database directory", parent, e))?;
        }
        let conn = Connection::open(&path)?;
        init_schema(&conn)?;
        Ok(SqliteStore { conn, path })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(SqliteStore {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }
}

impl ObjectStore for SqliteStore {
    fn put(&self, key: &str, body: &[u8]) -> Result<()> {
        let written_at = chrono::Utc::now().timestamp();
        self.conn.execute(
            "INSERT OR REPLACE INTO objects (key, body, written_at) VALUES (?1, ?2, ?3)",
            params![key, body, written_at],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM objects WHERE key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(body)
    }

    fn list(&self, from: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM objects WHERE key >= ?1 ORDER BY key ASC")?;
        let keys = stmt
            .query_map(params![from], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
    }

    fn location(&self, key: &str) -> String {
        format!("sqlite://{}#{key}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reopening_keeps_objects() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("snapshots.db");

        SqliteStore::open(&path).unwrap().put("a.json", b"{\"x\":1}").unwrap();

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("a.json").unwrap().as_deref(), Some(&b"{\"x\":1}"[..]));
        assert!(store.get("b.json").unwrap().is_none());
    }

    #[test]
    fn list_uses_text_ordering() {
        let store = SqliteStore::open_in_memory().unwrap();
        for key in ["2024-05-03.json", "whitelist.json", "2024-05-01.json"] {
            store.put(key, b"{}").unwrap();
        }
        assert_eq!(
            store.list("2024-05-02").unwrap(),
            vec!["2024-05-03.json", "whitelist.json"]
        );
    }

    #[test]
    fn location_names_file_and_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.location("k.json"), "sqlite://:memory:#k.json");
    }
}
