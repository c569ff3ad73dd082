//! Built-in tokenizer used when no morphological analyzer is configured.

use storyloom_core::ports::{Token, Tokenizer};

/// Splits on every non-alphanumeric character and lowercases the pieces.
///
/// Tags purely numeric tokens `NUM` and everything else `WORD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTokenizer;

impl Tokenizer for SimpleTokenizer {
    fn analyze(&self, text: &str) -> Vec<Token> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|piece| !piece.is_empty())
            .map(|piece| Token {
                morpheme: piece.to_lowercase(),
                part_of_speech: if piece.chars().all(|c| c.is_numeric()) {
                    "NUM".to_owned()
                } else {
                    "WORD".to_owned()
                },
            })
            .collect()
    }
}
