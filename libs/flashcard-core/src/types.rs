//! Core types for the native card store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of native card.
///
/// Persisted as text (`basic-cloze`, `choice`, `image-fill`), modeled as a
/// closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardType {
    /// Front/back card; blanks (`<<blank|...>>`) are optional.
    BasicCloze,
    /// Question with an ordered list of choices.
    Choice,
    /// Image with selection rectangles to fill in.
    ImageFill,
}

impl Default for CardType {
    fn default() -> Self {
        Self::BasicCloze
    }
}

impl CardType {
    /// Get the persisted name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BasicCloze => "basic-cloze",
            Self::Choice => "choice",
            Self::ImageFill => "image-fill",
        }
    }

    /// Parse from the persisted name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "basic-cloze" => Some(Self::BasicCloze),
            "choice" => Some(Self::Choice),
            "image-fill" => Some(Self::ImageFill),
            _ => None,
        }
    }

    /// Whether the card uses the front/back field group.
    pub fn uses_front_back(&self) -> bool {
        !matches!(self, Self::Choice)
    }
}

/// One option of a choice card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceData {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl ChoiceData {
    /// Create an incorrect choice with the given label.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_correct: false,
        }
    }
}

/// Rectangle hidden on an image-fill card, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Native card as stored in `cards/<id>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardData {
    pub id: String,
    #[serde(default = "new_identifier")]
    pub guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(rename = "type", default)]
    pub card_type: CardType,
    #[serde(default)]
    pub front: String,
    #[serde(default)]
    pub back: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub choices: Vec<ChoiceData>,
    #[serde(default)]
    pub selection_rects: Vec<SelectionRect>,
}

/// Generate a fresh opaque identifier.
pub fn new_identifier() -> String {
    Uuid::new_v4().to_string()
}

impl CardData {
    /// Create a front/back card with fresh identifiers.
    pub fn basic(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            ..Self::empty(CardType::BasicCloze)
        }
    }

    /// Create a choice card with fresh identifiers.
    pub fn choice(
        question: impl Into<String>,
        explanation: impl Into<String>,
        choices: Vec<ChoiceData>,
    ) -> Self {
        Self {
            question: question.into(),
            explanation: explanation.into(),
            choices,
            ..Self::empty(CardType::Choice)
        }
    }

    fn empty(card_type: CardType) -> Self {
        Self {
            id: new_identifier(),
            guid: new_identifier(),
            created_at: None,
            modified_at: None,
            card_type,
            front: String::new(),
            back: String::new(),
            question: String::new(),
            explanation: String::new(),
            choices: Vec::new(),
            selection_rects: Vec::new(),
        }
    }

    /// Copy of the card with the field groups the type does not use cleared.
    ///
    /// Choice cards keep question/explanation/choices; every other type keeps
    /// front/back.
    pub fn normalized(&self) -> Self {
        let mut card = self.clone();
        if card.card_type.uses_front_back() {
            card.question.clear();
            card.explanation.clear();
            card.choices.clear();
        } else {
            card.front.clear();
            card.back.clear();
        }
        if card.card_type != CardType::ImageFill {
            card.selection_rects.clear();
        }
        card
    }

    /// 1-based indices of the correct choices.
    pub fn correct_choices(&self) -> Vec<usize> {
        self.choices
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_correct)
            .map(|(i, _)| i + 1)
            .collect()
    }
}
