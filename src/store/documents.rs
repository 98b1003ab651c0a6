//! Compressed document storage
//!
//! Rows are `(id, title, content)` with the content UTF-8 encoded and
//! bzip2-compressed at the highest level. Ids are assigned by SQLite and
//! strictly increase; documents are never mutated or individually deleted.

use std::io::Read;

use bzip2::read::{BzDecoder, BzEncoder};
use bzip2::Compression;
use rusqlite::{params, params_from_iter, Connection};
use tracing::debug;

use crate::error::{FalconError, Result};
use crate::index::DocId;

pub struct DocumentStore<'c> {
    conn: &'c Connection,
}

impl<'c> DocumentStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Store a document and return its assigned id.
    pub fn insert(&self, title: &str, content: &str) -> Result<DocId> {
        if title.is_empty() {
            return Err(FalconError::InvalidInput("document title is empty".into()));
        }
        let compressed = compress(content)?;
        self.conn
            .execute(
                "INSERT INTO documents (title, content) VALUES (?1, ?2)",
                params![title, compressed],
            )
            .map_err(FalconError::storage("documents.insert"))?;
        let doc_id = self.conn.last_insert_rowid();
        debug!(doc_id, title, "stored document");
        Ok(doc_id)
    }

    /// Fetch `(id, title)` rows. Missing ids are silently omitted; order is
    /// unspecified.
    pub fn fetch(&self, ids: &[DocId]) -> Result<Vec<(DocId, String)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id, title FROM documents WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(FalconError::storage("documents.fetch"))?;
        let rows = stmt
            .query_map(params_from_iter(ids.iter()), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .map_err(FalconError::storage("documents.fetch"))?;

        let mut out = Vec::with_capacity(ids.len());
        for row in rows {
            out.push(row.map_err(FalconError::storage("documents.fetch"))?);
        }
        Ok(out)
    }

    /// Like [`fetch`](Self::fetch) but with decompressed content.
    pub fn fetch_with_content(&self, ids: &[DocId]) -> Result<Vec<(DocId, String, String)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id, title, content FROM documents WHERE id IN ({})",
            placeholders(ids.len())
        );
        self.rows_with_content(&sql, params_from_iter(ids.iter()))
    }

    /// All documents in id order, decompressed.
    pub fn dump_all(&self) -> Result<Vec<(DocId, String, String)>> {
        self.rows_with_content(
            "SELECT id, title, content FROM documents ORDER BY id",
            params![],
        )
    }

    fn rows_with_content<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<(DocId, String, String)>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(FalconError::storage("documents.fetch"))?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((row.get(0)?, row.get(1)?, row.get::<_, Vec<u8>>(2)?))
            })
            .map_err(FalconError::storage("documents.fetch"))?;

        let mut out = Vec::new();
        for row in rows {
            let (doc_id, title, blob) = row.map_err(FalconError::storage("documents.fetch"))?;
            out.push((doc_id, title, decompress(&blob)?));
        }
        Ok(out)
    }

    /// Delete every document. Destructive; does not touch the index table.
    pub fn wipe(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM documents", [])
            .map_err(FalconError::storage("documents.wipe"))?;
        Ok(())
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn compress(content: &str) -> Result<Vec<u8>> {
    let mut encoder = BzEncoder::new(content.as_bytes(), Compression::best());
    let mut buf = Vec::new();
    encoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn decompress(blob: &[u8]) -> Result<String> {
    let mut decoder = BzDecoder::new(blob);
    let mut raw = Vec::new();
    decoder
        .read_to_end(&mut raw)
        .map_err(|e| FalconError::Corruption(format!("document content does not decompress: {e}")))?;
    String::from_utf8(raw)
        .map_err(|_| FalconError::Corruption("document content is not UTF-8".into()))
}
