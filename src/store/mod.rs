//! SQLite backing store
//!
//! One database file holds both tables:
//!
//! ```text
//! indices(   token TEXT PRIMARY KEY, posting_list BLOB NOT NULL )
//! documents( id INTEGER PRIMARY KEY AUTOINCREMENT,
//!            title TEXT NOT NULL, content BLOB NOT NULL )
//! ```
//!
//! Connections run with journaling and synchronous writes disabled:
//! throughput over durability. Callers who need durability arrange their
//! own snapshots of the file.

pub mod documents;
pub mod indices;

pub use documents::DocumentStore;
pub use indices::IndexStore;

use std::path::Path;

use rusqlite::Connection;

use crate::error::{FalconError, Result};

/// Open (or create) the backing store at `path` and ensure the schema.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(FalconError::storage("store.open"))?;
    init(&conn)?;
    Ok(conn)
}

/// Open a store that lives entirely in memory.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().map_err(FalconError::storage("store.open"))?;
    init(&conn)?;
    Ok(conn)
}

fn init(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "OFF")
        .map_err(FalconError::storage("store.pragma"))?;
    conn.pragma_update(None, "synchronous", "OFF")
        .map_err(FalconError::storage("store.pragma"))?;
    create_tables(conn, "main")
}

fn create_tables(conn: &Connection, schema: &str) -> Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {schema}.indices (
              token TEXT PRIMARY KEY
            , posting_list BLOB NOT NULL
        );
        CREATE TABLE IF NOT EXISTS {schema}.documents (
              id INTEGER PRIMARY KEY AUTOINCREMENT
            , title TEXT NOT NULL
            , content BLOB NOT NULL
        );"
    ))
    .map_err(FalconError::storage("store.create_tables"))
}

/// Copy both tables into the on-disk database at `path`. Pre-existing
/// target tables are dropped and recreated.
pub fn copy_to_file(conn: &Connection, path: &Path) -> Result<()> {
    let target = path.to_string_lossy();
    conn.execute("ATTACH DATABASE ?1 AS dst", [target.as_ref()])
        .map_err(FalconError::storage("store.attach"))?;

    let copied = copy_tables(conn);

    // Detach even when the copy failed, so the connection stays usable.
    let detached = conn
        .execute("DETACH DATABASE dst", [])
        .map_err(FalconError::storage("store.detach"));
    copied.and(detached.map(|_| ()))
}

fn copy_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS dst.indices;
         DROP TABLE IF EXISTS dst.documents;",
    )
    .map_err(FalconError::storage("store.copy"))?;
    create_tables(conn, "dst")?;
    conn.execute_batch(
        "INSERT INTO dst.indices SELECT token, posting_list FROM main.indices;
         INSERT INTO dst.documents SELECT id, title, content FROM main.documents;",
    )
    .map_err(FalconError::storage("store.copy"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_schema() {
        let conn = open_in_memory().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
                 AND name IN ('indices', 'documents')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_open_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("falcon.db");
        drop(open(&path).unwrap());
        drop(open(&path).unwrap());
    }

    #[test]
    fn test_copy_to_file_overwrites_existing_tables() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.db");

        // Seed the target with a stale row.
        let stale = open(&path).unwrap();
        stale
            .execute(
                "INSERT INTO documents (title, content) VALUES ('old', x'00')",
                [],
            )
            .unwrap();
        drop(stale);

        let mem = open_in_memory().unwrap();
        mem.execute(
            "INSERT INTO documents (title, content) VALUES ('new', x'01')",
            [],
        )
        .unwrap();
        copy_to_file(&mem, &path).unwrap();

        let copied = open(&path).unwrap();
        let title: String = copied
            .query_row("SELECT title FROM documents", [], |row| row.get(0))
            .unwrap();
        assert_eq!(title, "new");
    }
}
