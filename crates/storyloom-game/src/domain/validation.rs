//! Prompt validation: banned terms and card usage.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use storyloom_core::error::DomainError;
use storyloom_core::ports::Tokenizer;

use super::session::PlayerHand;

/// How a spend keyword is matched against prompt tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeywordMatch {
    /// The keyword's tokens must appear contiguously in the prompt.
    #[default]
    Exact,
    /// Exact matching, plus a token containing the keyword or a keyword
    /// containing a token that is at most one character shorter than it.
    Substring,
}

impl FromStr for KeywordMatch {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "substring" => Ok(Self::Substring),
            other => Err(DomainError::Validation(format!(
                "unknown keyword match mode {other}"
            ))),
        }
    }
}

/// Banned terms, matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct Denylist {
    terms: Vec<String>,
    normalized: Vec<String>,
}

impl Denylist {
    /// Builds a denylist. Blank terms are ignored.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms: Vec<String> = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        let normalized = terms
            .iter()
            .map(|t| normalize(t))
            .filter(|t| !t.is_empty())
            .collect();
        Self { terms, normalized }
    }

    /// Parses one term per line. Lines starting with `#` are comments.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        )
    }

    /// Number of terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` if there are no terms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns `true` if `text` contains a banned term, either verbatim or
    /// once whitespace and punctuation are stripped.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        if self.terms.iter().any(|t| lowered.contains(t.as_str())) {
            return true;
        }
        let squashed = normalize(&lowered);
        self.normalized.iter().any(|t| squashed.contains(t.as_str()))
    }
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Checks that a prompt is clean and spends exactly one held card.
pub struct PromptValidator {
    denylist: Denylist,
    tokenizer: Box<dyn Tokenizer>,
    keyword_match: KeywordMatch,
}

impl fmt::Debug for PromptValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptValidator")
            .field("denylist_terms", &self.denylist.len())
            .field("keyword_match", &self.keyword_match)
            .finish_non_exhaustive()
    }
}

impl PromptValidator {
    /// Create a validator.
    #[must_use]
    pub fn new(
        denylist: Denylist,
        tokenizer: Box<dyn Tokenizer>,
        keyword_match: KeywordMatch,
    ) -> Self {
        Self {
            denylist,
            tokenizer,
            keyword_match,
        }
    }

    /// Returns the id of the single story card `prompt` spends.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ProfanityDetected` if the prompt contains a
    /// banned term, `DomainError::MultipleCardsUsed` if it spends more than
    /// one card, and `DomainError::NoCardUsed` if it spends none.
    pub fn validate(&self, prompt: &str, hand: &PlayerHand) -> Result<u32, DomainError> {
        if self.denylist.matches(prompt) {
            return Err(DomainError::ProfanityDetected);
        }

        let tokens: Vec<String> = self
            .tokenizer
            .analyze(prompt)
            .into_iter()
            .map(|t| t.morpheme.to_lowercase())
            .collect();

        let used: BTreeSet<u32> = hand
            .story_cards
            .iter()
            .filter(|card| card.spend_keywords().any(|kw| self.mentions(&tokens, kw)))
            .map(|card| card.id)
            .collect();

        match used.len() {
            0 => Err(DomainError::NoCardUsed),
            1 => used.first().copied().ok_or(DomainError::NoCardUsed),
            _ => Err(DomainError::MultipleCardsUsed(used.into_iter().collect())),
        }
    }

    fn mentions(&self, tokens: &[String], keyword: &str) -> bool {
        let needle: Vec<String> = self
            .tokenizer
            .analyze(keyword)
            .into_iter()
            .map(|t| t.morpheme.to_lowercase())
            .collect();
        if needle.is_empty() {
            return false;
        }
        if tokens.windows(needle.len()).any(|w| w == needle.as_slice()) {
            return true;
        }
        match self.keyword_match {
            KeywordMatch::Exact => false,
            KeywordMatch::Substring => {
                let joined = needle.concat();
                let keyword_len = joined.chars().count();
                tokens.iter().any(|t| {
                    let token_len = t.chars().count();
                    t.contains(joined.as_str())
                        || (token_len >= 2
                            && token_len + 1 >= keyword_len
                            && joined.contains(t.as_str()))
                })
            }
        }
    }
}
