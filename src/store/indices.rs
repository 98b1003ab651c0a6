//! Persistent inverted index: token → serialized posting list
//!
//! Blobs are produced and consumed only by [`PostingList`]; the store treats
//! them as opaque. Upserts run as one SQLite transaction so a batch is
//! all-or-nothing.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{FalconError, Result};
use crate::index::PostingList;

pub struct IndexStore<'c> {
    conn: &'c Connection,
}

impl<'c> IndexStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Point lookup of one token.
    pub fn get(&self, token: &str) -> Result<Option<PostingList>> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT posting_list FROM indices WHERE token = ?1",
                [token],
                |row| row.get(0),
            )
            .optional()
            .map_err(FalconError::storage("indices.get"))?;
        blob.map(|blob| PostingList::deserialize(&blob)).transpose()
    }

    /// Bulk lookup. Missing tokens are omitted from the result.
    pub fn get_many(&self, tokens: &[&str]) -> Result<Vec<PostingList>> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT posting_list FROM indices WHERE token IN ({})",
            vec!["?"; tokens.len()].join(", ")
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(FalconError::storage("indices.get_many"))?;
        let rows = stmt
            .query_map(params_from_iter(tokens.iter()), |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .map_err(FalconError::storage("indices.get_many"))?;

        let mut out = Vec::with_capacity(tokens.len());
        for row in rows {
            let blob = row.map_err(FalconError::storage("indices.get_many"))?;
            out.push(PostingList::deserialize(&blob)?);
        }
        Ok(out)
    }

    /// Insert-or-replace a batch of posting lists atomically.
    pub fn upsert_many<'a, I>(&self, lists: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a PostingList>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(FalconError::storage("indices.upsert"))?;
        let mut count = 0usize;
        {
            let mut stmt = tx
                .prepare("INSERT OR REPLACE INTO indices (token, posting_list) VALUES (?1, ?2)")
                .map_err(FalconError::storage("indices.upsert"))?;
            for list in lists {
                stmt.execute(params![list.token(), list.serialize()])
                    .map_err(FalconError::storage("indices.upsert"))?;
                count += 1;
            }
        }
        tx.commit().map_err(FalconError::storage("indices.upsert"))?;
        debug!(tokens = count, "upserted posting lists");
        Ok(())
    }

    /// All posting lists in token order.
    pub fn dump(&self) -> Result<Vec<PostingList>> {
        let mut stmt = self
            .conn
            .prepare("SELECT posting_list FROM indices ORDER BY token")
            .map_err(FalconError::storage("indices.dump"))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, Vec<u8>>(0))
            .map_err(FalconError::storage("indices.dump"))?;

        let mut out = Vec::new();
        for row in rows {
            let blob = row.map_err(FalconError::storage("indices.dump"))?;
            out.push(PostingList::deserialize(&blob)?);
        }
        Ok(out)
    }

    /// Delete every token. Destructive; does not touch the documents table.
    pub fn wipe(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM indices", [])
            .map_err(FalconError::storage("indices.wipe"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;

    #[test]
    fn test_get_round_trips() {
        let conn = store::open_in_memory().unwrap();
        let indices = IndexStore::new(&conn);

        let mut pl = PostingList::new("ab", 1, 0);
        pl.add(2, 5);
        indices.upsert_many([&pl]).unwrap();

        assert_eq!(indices.get("ab").unwrap(), Some(pl));
        assert_eq!(indices.get("zz").unwrap(), None);
    }

    #[test]
    fn test_upsert_replaces_by_token() {
        let conn = store::open_in_memory().unwrap();
        let indices = IndexStore::new(&conn);

        indices.upsert_many([&PostingList::new("ab", 1, 0)]).unwrap();
        let mut updated = PostingList::new("ab", 1, 0);
        updated.add(2, 3);
        indices.upsert_many([&updated]).unwrap();

        assert_eq!(indices.get("ab").unwrap(), Some(updated));
        let stored: i64 = conn
            .query_row("SELECT COUNT(*) FROM indices", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stored, 1);
    }

    #[test]
    fn test_get_many_omits_missing() {
        let conn = store::open_in_memory().unwrap();
        let indices = IndexStore::new(&conn);

        indices
            .upsert_many([&PostingList::new("ab", 1, 0), &PostingList::new("bc", 1, 1)])
            .unwrap();

        let mut tokens: Vec<String> = indices
            .get_many(&["ab", "bc", "cd"])
            .unwrap()
            .into_iter()
            .map(|pl| pl.token().to_string())
            .collect();
        tokens.sort();
        assert_eq!(tokens, vec!["ab", "bc"]);

        assert!(indices.get_many(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_dump_orders_by_token() {
        let conn = store::open_in_memory().unwrap();
        let indices = IndexStore::new(&conn);

        indices
            .upsert_many([
                &PostingList::new("cd", 1, 2),
                &PostingList::new("ab", 1, 0),
                &PostingList::new("bc", 1, 1),
            ])
            .unwrap();

        let tokens: Vec<String> = indices
            .dump()
            .unwrap()
            .into_iter()
            .map(|pl| pl.token().to_string())
            .collect();
        assert_eq!(tokens, vec!["ab", "bc", "cd"]);
    }

    #[test]
    fn test_corrupt_blob_surfaces_as_error() {
        let conn = store::open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO indices (token, posting_list) VALUES ('ab', x'ff')",
            [],
        )
        .unwrap();

        let indices = IndexStore::new(&conn);
        assert!(matches!(indices.get("ab"), Err(FalconError::Corruption(_))));
    }

    #[test]
    fn test_wipe() {
        let conn = store::open_in_memory().unwrap();
        let indices = IndexStore::new(&conn);
        indices.upsert_many([&PostingList::new("ab", 1, 0)]).unwrap();
        indices.wipe().unwrap();
        assert!(indices.dump().unwrap().is_empty());
    }
}
