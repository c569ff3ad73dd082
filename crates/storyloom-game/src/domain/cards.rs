//! Card reference data: story cards, ending cards and the catalog they are
//! loaded from.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use storyloom_core::error::DomainError;

/// Category of a story card. Every hand holds exactly one card of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardCategory {
    /// A character.
    Person,
    /// A thing.
    Object,
    /// A location.
    Place,
    /// Something that happens.
    Event,
    /// A condition or mood.
    State,
}

impl CardCategory {
    /// Every category, Person first.
    pub const ALL: [Self; 5] = [
        Self::Person,
        Self::Object,
        Self::Place,
        Self::Event,
        Self::State,
    ];

    /// The categories dealt after the Person card.
    pub const NON_PERSON: [Self; 4] = [Self::Object, Self::Place, Self::Event, Self::State];

    /// Lowercase name used on the wire and in error messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Object => "object",
            Self::Place => "place",
            Self::Event => "event",
            Self::State => "state",
        }
    }
}

impl fmt::Display for CardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A story card. Writing its keyword, or one of its variants, spends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryCard {
    /// Card identifier, unique within the catalog.
    pub id: u32,
    /// Card category.
    pub category: CardCategory,
    /// Canonical keyword.
    pub keyword: String,
    /// Additional spellings and inflections.
    #[serde(default)]
    pub variant_keywords: Vec<String>,
}

impl StoryCard {
    /// The keyword followed by every variant.
    pub fn spend_keywords(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.keyword.as_str()).chain(self.variant_keywords.iter().map(String::as_str))
    }
}

/// A card describing how a player's story may end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingCard {
    /// Card identifier, unique among ending cards.
    pub id: u32,
    /// The ending sentence.
    pub content: String,
}

/// On-disk shape of the card catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CardCatalog {
    /// All story cards, any order.
    pub story_cards: Vec<StoryCard>,
    /// All ending cards.
    pub ending_cards: Vec<EndingCard>,
}

/// The master card lists, grouped by category. Immutable once built.
#[derive(Debug, Clone)]
pub struct CardPool {
    by_category: BTreeMap<CardCategory, Vec<StoryCard>>,
    ending_cards: Vec<EndingCard>,
}

impl CardPool {
    /// Builds a pool from a catalog.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if an id repeats or a keyword is
    /// blank.
    pub fn from_catalog(catalog: CardCatalog) -> Result<Self, DomainError> {
        let mut seen = HashSet::new();
        let mut by_category: BTreeMap<CardCategory, Vec<StoryCard>> = BTreeMap::new();
        for card in catalog.story_cards {
            if !seen.insert(card.id) {
                return Err(DomainError::Validation(format!(
                    "duplicate story card id {}",
                    card.id
                )));
            }
            if card.keyword.trim().is_empty() {
                return Err(DomainError::Validation(format!(
                    "story card {} has a blank keyword",
                    card.id
                )));
            }
            by_category.entry(card.category).or_default().push(card);
        }

        let mut seen = HashSet::new();
        for card in &catalog.ending_cards {
            if !seen.insert(card.id) {
                return Err(DomainError::Validation(format!(
                    "duplicate ending card id {}",
                    card.id
                )));
            }
        }

        Ok(Self {
            by_category,
            ending_cards: catalog.ending_cards,
        })
    }

    /// Parses a JSON catalog and builds a pool from it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the JSON is malformed or the
    /// catalog is inconsistent.
    pub fn from_json(text: &str) -> Result<Self, DomainError> {
        let catalog: CardCatalog = serde_json::from_str(text)
            .map_err(|e| DomainError::Validation(format!("invalid card catalog: {e}")))?;
        Self::from_catalog(catalog)
    }

    /// Story cards of one category, in catalog order.
    #[must_use]
    pub fn story_cards(&self, category: CardCategory) -> &[StoryCard] {
        self.by_category.get(&category).map_or(&[], Vec::as_slice)
    }

    /// Every ending card, in catalog order.
    #[must_use]
    pub fn ending_cards(&self) -> &[EndingCard] {
        &self.ending_cards
    }
}
