//! Posting list: one token's document → positions map
//!
//! Serialized into an opaque blob stored under the token key. The layout is
//! engine-private, versioned, and little-endian:
//!
//! ```text
//! u8   format version
//! u16  token byte length, then the token's UTF-8 bytes
//! u32  document count
//! per document, ascending id:
//!     i64  doc id
//!     u32  position count
//!     u32  positions, strictly increasing
//! ```
//!
//! `positions_count` is recomputed on deserialize. Serialization is
//! deterministic for the same logical value because the map is ordered.

use std::collections::BTreeMap;

use crate::error::{FalconError, Result};
use crate::index::{DocId, Position};

const FORMAT_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingList {
    token: String,
    postings: BTreeMap<DocId, Vec<Position>>,
    positions_count: u64,
}

impl PostingList {
    /// Initialize with a single occurrence.
    pub fn new(token: &str, doc_id: DocId, position: Position) -> Self {
        let mut postings = BTreeMap::new();
        postings.insert(doc_id, vec![position]);
        Self {
            token: token.to_string(),
            postings,
            positions_count: 1,
        }
    }

    /// Append an occurrence. The caller keeps positions monotonic per
    /// document; this holds naturally when the tokenizer emits a single
    /// document's grams in offset order.
    pub fn add(&mut self, doc_id: DocId, position: Position) {
        self.postings.entry(doc_id).or_default().push(position);
        self.positions_count += 1;
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Total number of positions across all documents.
    pub fn positions_count(&self) -> u64 {
        self.positions_count
    }

    pub fn doc_count(&self) -> usize {
        self.postings.len()
    }

    pub fn get(&self, doc_id: DocId) -> Option<&[Position]> {
        self.postings.get(&doc_id).map(|v| v.as_slice())
    }

    /// Iterate entries in ascending document order.
    pub fn iter(&self) -> impl Iterator<Item = (DocId, &[Position])> {
        self.postings.iter().map(|(&doc_id, positions)| (doc_id, positions.as_slice()))
    }

    pub fn serialize(&self) -> Vec<u8> {
        let token_bytes = self.token.as_bytes();
        let mut buf = Vec::with_capacity(
            1 + 2 + token_bytes.len() + 4 + self.postings.len() * 12 + self.positions_count as usize * 4,
        );
        buf.push(FORMAT_VERSION);
        buf.extend_from_slice(&(token_bytes.len() as u16).to_le_bytes());
        buf.extend_from_slice(token_bytes);
        buf.extend_from_slice(&(self.postings.len() as u32).to_le_bytes());
        for (doc_id, positions) in &self.postings {
            buf.extend_from_slice(&doc_id.to_le_bytes());
            buf.extend_from_slice(&(positions.len() as u32).to_le_bytes());
            for &position in positions {
                buf.extend_from_slice(&position.to_le_bytes());
            }
        }
        buf
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(buf);

        let version = reader.read_u8()?;
        if version != FORMAT_VERSION {
            return Err(FalconError::Corruption(format!(
                "posting list blob has unsupported version {version}"
            )));
        }

        let token_len = reader.read_u16()? as usize;
        let token = std::str::from_utf8(reader.take(token_len)?)
            .map_err(|_| FalconError::Corruption("posting list token is not UTF-8".into()))?
            .to_string();

        let doc_count = reader.read_u32()? as usize;
        let mut postings = BTreeMap::new();
        let mut positions_count = 0u64;
        for _ in 0..doc_count {
            let doc_id = reader.read_i64()?;
            let pos_count = reader.read_u32()? as usize;
            // Bound the claimed count by the bytes actually left before
            // sizing the allocation; a corrupt count must error, not abort.
            if pos_count.saturating_mul(4) > reader.remaining() {
                return Err(FalconError::Corruption(format!(
                    "posting list blob truncated: document {doc_id} claims {pos_count} positions"
                )));
            }
            let mut positions = Vec::with_capacity(pos_count);
            for _ in 0..pos_count {
                positions.push(reader.read_u32()?);
            }
            positions_count += pos_count as u64;
            postings.insert(doc_id, positions);
        }

        Ok(Self {
            token,
            postings,
            positions_count,
        })
    }
}

/// Bounds-checked little-endian reader over a blob.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.buf.len());
        match end {
            Some(end) => {
                let slice = &self.buf[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(FalconError::Corruption(format!(
                "posting list blob truncated at byte {} (wanted {} more)",
                self.pos, len
            ))),
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_i64(&mut self) -> Result<i64> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_add() {
        let mut pl = PostingList::new("ab", 1, 0);
        pl.add(1, 4);
        pl.add(2, 7);

        assert_eq!(pl.token(), "ab");
        assert_eq!(pl.doc_count(), 2);
        assert_eq!(pl.positions_count(), 3);
        assert_eq!(pl.get(1), Some(&[0, 4][..]));
        assert_eq!(pl.get(2), Some(&[7][..]));
        assert_eq!(pl.get(3), None);
    }

    #[test]
    fn test_round_trip() {
        let mut pl = PostingList::new("東京", 1, 0);
        pl.add(1, 12);
        pl.add(42, 3);
        pl.add(42, 9);
        pl.add(7, 0);

        let blob = pl.serialize();
        let restored = PostingList::deserialize(&blob).unwrap();
        assert_eq!(restored, pl);
        assert_eq!(restored.positions_count(), 5);
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let mut a = PostingList::new("cd", 3, 5);
        a.add(1, 2);
        let mut b = PostingList::new("cd", 1, 2);
        b.add(3, 5);

        // Same logical value regardless of insertion order.
        assert_eq!(a.serialize(), b.serialize());
    }

    #[test]
    fn test_iteration_ascends_by_doc_id() {
        let mut pl = PostingList::new("xy", 9, 1);
        pl.add(2, 4);
        pl.add(5, 6);

        let doc_ids: Vec<DocId> = pl.iter().map(|(doc_id, _)| doc_id).collect();
        assert_eq!(doc_ids, vec![2, 5, 9]);
    }

    #[test]
    fn test_deserialize_rejects_truncation() {
        let blob = PostingList::new("ab", 1, 0).serialize();
        for len in 0..blob.len() {
            assert!(PostingList::deserialize(&blob[..len]).is_err());
        }
    }

    #[test]
    fn test_deserialize_rejects_oversized_position_count() {
        // Claim u32::MAX positions while only one is present; the count
        // must be rejected before it sizes an allocation.
        let mut blob = PostingList::new("ab", 1, 0).serialize();
        let pos_count_at = blob.len() - 8;
        blob[pos_count_at..pos_count_at + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            PostingList::deserialize(&blob),
            Err(FalconError::Corruption(_))
        ));
    }

    #[test]
    fn test_deserialize_rejects_unknown_version() {
        let mut blob = PostingList::new("ab", 1, 0).serialize();
        blob[0] = 99;
        assert!(PostingList::deserialize(&blob).is_err());
    }
}
