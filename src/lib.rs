//! Falcon: embeddable phrase search over short documents
//!
//! Documents are a title plus a body. A query of whitespace-separated words
//! returns the documents in which every word occurs as a contiguous
//! character substring, reconstructed from character n-gram positions
//! (bigram or trigram). Everything persists into a single SQLite file.
//!
//! ## Architecture
//! - Store layer: document rows (bzip2-compressed content) and one opaque
//!   posting-list blob per token, in two SQLite tables
//! - Index layer: tokenizer, posting lists, merge-buffered indexer,
//!   positional phrase searcher
//! - Boundary: a thin HTTP routing layer and a CLI binary
//!
//! ```no_run
//! use falcon::{Indexer, Searcher, SearchOutcome, TokenizerKind};
//!
//! # fn main() -> falcon::Result<()> {
//! let path = std::path::Path::new("falcon.db");
//! let mut indexer = Indexer::open(path, TokenizerKind::Bigram)?;
//! indexer.add("greeting", "Good morning everyone")?;
//! indexer.close()?;
//!
//! let searcher = Searcher::open(path, TokenizerKind::Bigram)?;
//! if let SearchOutcome::Found(hits) = searcher.search("morning")? {
//!     for hit in hits {
//!         println!("{} {}", hit.id, hit.title);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod http;
pub mod index;
pub mod store;

mod error;

pub use config::{TokenizerKind, DEFAULT_HTTP_PORT, TOKEN_POSITION_LIMIT};
pub use error::{FalconError, Result};
pub use index::{
    DocHit, DocId, Indexer, NgramTokenizer, Position, PostingList, SearchOutcome, Searcher, Token,
};
pub use store::{DocumentStore, IndexStore};
