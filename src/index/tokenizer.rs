//! Character n-gram tokenizer
//!
//! Turns `title || content` into a stream of `(position, ngram)` pairs.
//! Positions are code-point offsets into the concatenation. An n-gram is
//! dropped when any of its characters belongs to the stopword class.

use crate::config::TokenizerKind;
use crate::index::Position;

/// ASCII punctuation rejected from n-grams.
const ASCII_STOPCHARS: &str = r#",.!?"'$%&-+=/#:;{}[]()<>^~_"#;

/// Non-ASCII stopword characters: CJK and fullwidth punctuation plus a few
/// symbols carried over from the observable indexing contract.
const WIDE_STOPCHARS: &str = r"→｡@･ﾞ､｢｣…★☆♭\–▼♪⇔♥°‐――≠※∞◇×、。（）：；「」『』【】［］｛｝〈〉《》〔〕〜～�｜｀＼＠？！”＃＄％＆’＝＋＊＜＞＿＾￥／，・´ ▽ ．－￤";

/// Stopword class membership. The Latin letter `i` is a member; this is a
/// quirk of the indexing contract and is preserved deliberately.
pub fn is_stopword(c: char) -> bool {
    c.is_ascii_digit()
        || c.is_ascii_whitespace()
        || c == '\x0b'
        || c == 'i'
        || ASCII_STOPCHARS.contains(c)
        || WIDE_STOPCHARS.contains(c)
}

/// One emitted n-gram and its offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub position: Position,
}

/// Sliding-window n-gram tokenizer (n = 2 or 3).
#[derive(Debug, Clone, Copy)]
pub struct NgramTokenizer {
    n: usize,
}

impl NgramTokenizer {
    pub fn new(kind: TokenizerKind) -> Self {
        Self { n: kind.n() }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Tokenize `title` concatenated with `content` (when present).
    ///
    /// Emits every window of exactly `n` code points that contains no
    /// stopword character, in ascending offset order. Pure; output length
    /// is at most `len - n + 1`.
    pub fn tokenize(&self, title: &str, content: Option<&str>) -> Vec<Token> {
        let document: Vec<char> = match content {
            Some(content) => title.chars().chain(content.chars()).collect(),
            None => title.chars().collect(),
        };
        if document.len() < self.n {
            return Vec::new();
        }

        document
            .windows(self.n)
            .enumerate()
            .filter(|(_, window)| !window.iter().any(|&c| is_stopword(c)))
            .map(|(i, window)| Token {
                text: window.iter().collect(),
                position: i as Position,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<(Position, &str)> {
        tokens.iter().map(|t| (t.position, t.text.as_str())).collect()
    }

    #[test]
    fn test_bigram_plain() {
        let tokenizer = NgramTokenizer::new(TokenizerKind::Bigram);
        let tokens = tokenizer.tokenize("abcd", None);
        assert_eq!(texts(&tokens), vec![(0, "ab"), (1, "bc"), (2, "cd")]);
    }

    #[test]
    fn test_bigram_skips_whitespace_windows() {
        let tokenizer = NgramTokenizer::new(TokenizerKind::Bigram);
        let tokens = tokenizer.tokenize("a cd", None);
        assert_eq!(texts(&tokens), vec![(2, "cd")]);
    }

    #[test]
    fn test_trigram() {
        let tokenizer = NgramTokenizer::new(TokenizerKind::Trigram);
        let tokens = tokenizer.tokenize("abcde", None);
        assert_eq!(texts(&tokens), vec![(0, "abc"), (1, "bcd"), (2, "cde")]);

        let tokens = tokenizer.tokenize("ab def", None);
        assert_eq!(texts(&tokens), vec![(3, "def")]);
    }

    #[test]
    fn test_shorter_than_n_is_empty() {
        let bigram = NgramTokenizer::new(TokenizerKind::Bigram);
        assert!(bigram.tokenize("a", None).is_empty());
        assert!(bigram.tokenize("", None).is_empty());

        let trigram = NgramTokenizer::new(TokenizerKind::Trigram);
        assert!(trigram.tokenize("ab", None).is_empty());
    }

    #[test]
    fn test_title_content_concatenation() {
        let tokenizer = NgramTokenizer::new(TokenizerKind::Bigram);
        // "ab" + "cd" tokenizes like "abcd"; the window spanning the seam
        // is emitted too.
        let tokens = tokenizer.tokenize("ab", Some("cd"));
        assert_eq!(texts(&tokens), vec![(0, "ab"), (1, "bc"), (2, "cd")]);
    }

    #[test]
    fn test_letter_i_is_a_stopword() {
        let tokenizer = NgramTokenizer::new(TokenizerKind::Bigram);
        assert!(tokenizer.tokenize("if", None).is_empty());
        // "hi" and "is" both contain 'i'; only "st" survives from "hist".
        let tokens = tokenizer.tokenize("hist", None);
        assert_eq!(texts(&tokens), vec![(2, "st")]);
    }

    #[test]
    fn test_digits_and_punctuation_rejected() {
        let tokenizer = NgramTokenizer::new(TokenizerKind::Bigram);
        assert!(tokenizer.tokenize("a1b2", None).is_empty());
        assert!(tokenizer.tokenize("x,y.z", None).is_empty());
    }

    #[test]
    fn test_cjk_punctuation_rejected() {
        let tokenizer = NgramTokenizer::new(TokenizerKind::Bigram);
        let tokens = tokenizer.tokenize("東京、大阪", None);
        assert_eq!(texts(&tokens), vec![(0, "東京"), (3, "大阪")]);
    }

    #[test]
    fn test_offsets_are_code_points_not_bytes() {
        let tokenizer = NgramTokenizer::new(TokenizerKind::Bigram);
        let tokens = tokenizer.tokenize("犬猫鳥", None);
        assert_eq!(texts(&tokens), vec![(0, "犬猫"), (1, "猫鳥")]);
    }

    #[test]
    fn test_every_emitted_gram_is_clean() {
        let tokenizer = NgramTokenizer::new(TokenizerKind::Trigram);
        let tokens = tokenizer.tokenize("Good morning, everyone 123", None);
        for token in &tokens {
            assert_eq!(token.text.chars().count(), 3);
            assert!(!token.text.chars().any(is_stopword), "dirty gram {:?}", token);
        }
    }
}
