//! Engine configuration and defaults

use crate::{FalconError, Result};

/// Flush threshold for the indexer merge buffer, counted in buffered
/// positions across all tokens. Small documents accumulate many shared
/// n-grams in memory; large ingests spill periodically rather than
/// per-document.
pub const TOKEN_POSITION_LIMIT: u64 = 5_000_000;

/// Default port for the HTTP front-end.
pub const DEFAULT_HTTP_PORT: u16 = 8888;

/// Tokenizer selection: bigram (default) or trigram character windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenizerKind {
    #[default]
    Bigram,
    Trigram,
}

impl TokenizerKind {
    /// Resolve a tokenizer by name. Unknown names are a config error.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "Bigram" => Ok(TokenizerKind::Bigram),
            "Trigram" => Ok(TokenizerKind::Trigram),
            other => Err(FalconError::Config(format!(
                "unknown tokenizer: {other} (expected Bigram or Trigram)"
            ))),
        }
    }

    /// Window length in code points.
    pub fn n(self) -> usize {
        match self {
            TokenizerKind::Bigram => 2,
            TokenizerKind::Trigram => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(TokenizerKind::from_name("Bigram").unwrap(), TokenizerKind::Bigram);
        assert_eq!(TokenizerKind::from_name("Trigram").unwrap(), TokenizerKind::Trigram);
        assert!(TokenizerKind::from_name("Quadgram").is_err());
        assert!(TokenizerKind::from_name("bigram").is_err());
    }

    #[test]
    fn test_window_length() {
        assert_eq!(TokenizerKind::Bigram.n(), 2);
        assert_eq!(TokenizerKind::Trigram.n(), 3);
    }
}
