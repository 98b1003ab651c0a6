//! Ingestion pipeline
//!
//! Drives tokenization and the in-memory merge buffer. The buffer maps
//! token → [`PostingList`] and is flushed to the index store either when the
//! buffered position total exceeds [`TOKEN_POSITION_LIMIT`] or on close.
//! The indexer exclusively owns the buffer; flushing drains it in one
//! atomic upsert batch.
//!
//! Concurrent writers on the same store are not supported.

use std::path::Path;

use ahash::{AHashMap, AHashSet};
use rusqlite::Connection;
use tracing::debug;

use crate::config::{TokenizerKind, TOKEN_POSITION_LIMIT};
use crate::error::{FalconError, Result};
use crate::index::searcher::Searcher;
use crate::index::tokenizer::NgramTokenizer;
use crate::index::{DocId, PostingList};
use crate::store::{self, DocumentStore, IndexStore};

pub struct Indexer {
    conn: Connection,
    tokenizer: NgramTokenizer,
    buffer: AHashMap<String, PostingList>,
    position_limit: u64,
}

impl Indexer {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path, kind: TokenizerKind) -> Result<Self> {
        Ok(Self::with_connection(store::open(path)?, kind))
    }

    /// Build the index entirely in memory; persist later with
    /// [`flush_to_file`](Self::flush_to_file).
    pub fn open_in_memory(kind: TokenizerKind) -> Result<Self> {
        Ok(Self::with_connection(store::open_in_memory()?, kind))
    }

    fn with_connection(conn: Connection, kind: TokenizerKind) -> Self {
        Self {
            conn,
            tokenizer: NgramTokenizer::new(kind),
            buffer: AHashMap::new(),
            position_limit: TOKEN_POSITION_LIMIT,
        }
    }

    /// Override the flush threshold. Mainly for tests and bulk-ingest
    /// tuning.
    pub fn with_position_limit(mut self, limit: u64) -> Self {
        self.position_limit = limit;
        self
    }

    /// Store and index a document, returning its assigned id.
    pub fn add(&mut self, title: &str, content: &str) -> Result<DocId> {
        let doc_id = DocumentStore::new(&self.conn).insert(title, content)?;
        self.index_document(doc_id, title, content)?;
        self.flush_if_needed(false)?;
        Ok(doc_id)
    }

    /// Index under an externally assigned id. The document row itself is
    /// the caller's responsibility, and the id must not collide with
    /// store-assigned ones.
    pub fn add_with_id(&mut self, doc_id: DocId, title: &str, content: &str) -> Result<()> {
        if title.is_empty() {
            return Err(FalconError::InvalidInput("document title is empty".into()));
        }
        self.index_document(doc_id, title, content)?;
        self.flush_if_needed(false)
    }

    fn index_document(&mut self, doc_id: DocId, title: &str, content: &str) -> Result<()> {
        let tokens = self.tokenizer.tokenize(title, Some(content));
        debug!(doc_id, tokens = tokens.len(), "indexing document");

        // Merge occurrences of already-buffered tokens in place; collect
        // the rest for one bulk fetch.
        let mut pending = Vec::new();
        for token in &tokens {
            match self.buffer.get_mut(&token.text) {
                Some(list) => list.add(doc_id, token.position),
                None => pending.push(token),
            }
        }
        if pending.is_empty() {
            return Ok(());
        }

        let mut seen = AHashSet::new();
        let distinct: Vec<&str> = pending
            .iter()
            .filter(|token| seen.insert(token.text.as_str()))
            .map(|token| token.text.as_str())
            .collect();
        for list in IndexStore::new(&self.conn).get_many(&distinct)? {
            self.buffer.insert(list.token().to_string(), list);
        }

        for token in pending {
            match self.buffer.get_mut(&token.text) {
                Some(list) => list.add(doc_id, token.position),
                None => {
                    let list = PostingList::new(&token.text, doc_id, token.position);
                    self.buffer.insert(token.text.clone(), list);
                }
            }
        }
        Ok(())
    }

    /// Flush the merge buffer when `final_flush` is set or the buffered
    /// position total exceeds the limit. A no-op on an empty buffer, so
    /// double-flushing is harmless.
    pub fn flush_if_needed(&mut self, final_flush: bool) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let total = self.buffered_positions();
        if !final_flush && total <= self.position_limit {
            return Ok(());
        }
        debug!(tokens = self.buffer.len(), positions = total, "flushing merge buffer");
        IndexStore::new(&self.conn).upsert_many(self.buffer.values())?;
        self.buffer.clear();
        Ok(())
    }

    /// Total positions currently buffered across all tokens.
    pub fn buffered_positions(&self) -> u64 {
        self.buffer.values().map(PostingList::positions_count).sum()
    }

    /// Final flush, then release the store.
    pub fn close(mut self) -> Result<()> {
        self.flush_if_needed(true)
    }

    /// Final flush, then hand the connection to a searcher over the same
    /// store. Used by the in-memory mode.
    pub fn into_searcher(mut self) -> Result<Searcher> {
        self.flush_if_needed(true)?;
        Ok(Searcher::with_connection(self.conn, self.tokenizer))
    }

    /// Persist the store to `path`. Flushes the buffer first; pre-existing
    /// tables at the target are overwritten.
    pub fn flush_to_file(&mut self, path: &Path) -> Result<()> {
        self.flush_if_needed(true)?;
        store::copy_to_file(&self.conn, path)
    }

    /// Delete the entire persistent index and drop any buffered updates.
    pub fn wipe_index(&mut self) -> Result<()> {
        self.buffer.clear();
        IndexStore::new(&self.conn).wipe()
    }

    /// Delete every stored document. Does not touch the index table; wipe
    /// both for a clean slate.
    pub fn wipe_documents(&self) -> Result<()> {
        DocumentStore::new(&self.conn).wipe()
    }
}
