//! Phrase search
//!
//! A query is split into whitespace-separated words. Each word matches a
//! document when the word occurs in it as a contiguous character substring,
//! reconstructed from n-gram positions. Across words the query is an AND
//! over document sets; word order and adjacency in the document are
//! irrelevant.

use std::path::Path;

use ahash::{AHashMap, AHashSet};
use rusqlite::Connection;
use tracing::debug;

use crate::config::TokenizerKind;
use crate::error::{FalconError, Result};
use crate::index::tokenizer::{NgramTokenizer, Token};
use crate::index::{DocId, Position};
use crate::store::{self, DocumentStore, IndexStore};

/// One matching document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocHit {
    pub id: DocId,
    pub title: String,
}

/// Search outcome. `NotFound` is a first-class result, not an error,
/// produced when a query word yields no indexable n-grams (a word shorter
/// than n, or made of stopword characters, matches nothing rather than
/// everything) or when none of a word's grams exist in the index. A query
/// whose words all produced posting lists but whose intersection is empty
/// is `Found` with no hits, which callers may treat differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(Vec<DocHit>),
    NotFound,
}

/// Positions of each query gram inside one candidate document.
type GramPositions<'a> = AHashMap<&'a str, AHashSet<Position>>;

pub struct Searcher {
    conn: Connection,
    tokenizer: NgramTokenizer,
}

impl Searcher {
    /// Open a searcher over the store at `path`.
    pub fn open(path: &Path, kind: TokenizerKind) -> Result<Self> {
        Ok(Self::with_connection(store::open(path)?, NgramTokenizer::new(kind)))
    }

    pub(crate) fn with_connection(conn: Connection, tokenizer: NgramTokenizer) -> Self {
        Self { conn, tokenizer }
    }

    /// Phrase-search the store. A whitespace-only query is invalid input.
    pub fn search(&self, query: &str) -> Result<SearchOutcome> {
        let trimmed = query.trim_matches(is_query_whitespace);
        if trimmed.is_empty() {
            return Err(FalconError::InvalidInput("query contains no words".into()));
        }

        let mut matched: Option<AHashSet<DocId>> = None;
        for word in trimmed.split(is_query_whitespace).filter(|w| !w.is_empty()) {
            let tokens = self.tokenizer.tokenize(word, None);
            if tokens.is_empty() {
                debug!(word, "word yields no n-grams");
                return Ok(SearchOutcome::NotFound);
            }

            let mut seen = AHashSet::new();
            let distinct: Vec<&str> = tokens
                .iter()
                .filter(|token| seen.insert(token.text.as_str()))
                .map(|token| token.text.as_str())
                .collect();
            let lists = IndexStore::new(&self.conn).get_many(&distinct)?;
            if lists.is_empty() {
                return Ok(SearchOutcome::NotFound);
            }

            let mut candidates: AHashMap<DocId, GramPositions> = AHashMap::new();
            for list in &lists {
                for (doc_id, positions) in list.iter() {
                    candidates
                        .entry(doc_id)
                        .or_default()
                        .entry(list.token())
                        .or_default()
                        .extend(positions.iter().copied());
                }
            }

            // An empty match set stays in play: the AND cannot recover,
            // but later words still get their own NotFound triggers.
            let word_matches = phrase_match(candidates, &tokens, matched.as_ref());
            debug!(word, matches = word_matches.len(), "word matched");
            matched = Some(word_matches);
        }

        let Some(matched) = matched else {
            return Ok(SearchOutcome::NotFound);
        };
        let ids: Vec<DocId> = matched.into_iter().collect();
        let hits = DocumentStore::new(&self.conn)
            .fetch(&ids)?
            .into_iter()
            .map(|(id, title)| DocHit { id, title })
            .collect();
        Ok(SearchOutcome::Found(hits))
    }
}

/// Query-splitting whitespace: ASCII whitespace plus the ideographic space.
fn is_query_whitespace(c: char) -> bool {
    c.is_ascii_whitespace() || c == '\u{3000}'
}

/// Decide which candidate documents contain the query word.
///
/// `tokens` is the word's n-gram sequence in ascending offset order. Each
/// occurrence of the first gram anchors a candidate run; the document
/// matches when every other gram appears at its offset relative to that
/// anchor. Grams the tokenizer dropped from the word (stopword characters
/// inside it) leave gaps on both the query and the index side, so offsets
/// are compared relative to the first emitted gram rather than stepped by
/// one. Documents outside `prior` (when given) are skipped, which
/// implements the AND across words.
fn phrase_match(
    candidates: AHashMap<DocId, GramPositions>,
    tokens: &[Token],
    prior: Option<&AHashSet<DocId>>,
) -> AHashSet<DocId> {
    let required: AHashSet<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    let first = &tokens[0];

    let mut matched = AHashSet::new();
    for (doc_id, grams) in candidates {
        if let Some(prior) = prior {
            if !prior.contains(&doc_id) {
                continue;
            }
        }
        // A document holding fewer distinct grams than the query requires
        // cannot contain the word.
        if grams.len() < required.len() {
            continue;
        }
        let Some(anchors) = grams.get(first.text.as_str()) else {
            continue;
        };

        'anchors: for &anchor in anchors {
            for token in &tokens[1..] {
                let expected = anchor + (token.position - first.position);
                match grams.get(token.text.as_str()) {
                    Some(positions) if positions.contains(&expected) => {}
                    _ => continue 'anchors,
                }
            }
            // First completed run wins; matches are not overlapped within
            // a document.
            matched.insert(doc_id);
            break;
        }
    }
    matched
}
