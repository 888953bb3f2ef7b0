//! Configuration for package conversion.
//!
//! Every lookup table and threshold the converters use lives here so that a
//! converter owns its configuration instead of reading module-level state.

use crate::error::Result;
use crate::markup::{NamedColor, Palette, Rgb};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for import and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterchangeSettings {
    /// Named colors available to `{{color|text}}` runs.
    pub palette: Vec<NamedColor>,
    /// Channels below this are considered dark.
    pub dark_channel_max: u8,
    /// A channel above this with the other two dark is a primary color.
    pub dominant_channel_min: u8,
    /// Shortest question text accepted when rebuilding a choice card.
    pub min_question_chars: usize,
    /// Question used when choices are preceded by nothing.
    pub placeholder_question: String,
    /// Notices written by exporters in place of real content.
    pub system_messages: Vec<String>,
    /// Block-level tags rendered as line breaks.
    pub block_tags: Vec<String>,
}

impl Default for InterchangeSettings {
    fn default() -> Self {
        Self {
            palette: vec![
                NamedColor::new("red", Rgb::new(244, 67, 54)),
                NamedColor::new("orange", Rgb::new(255, 152, 0)),
                NamedColor::new("yellow", Rgb::new(255, 235, 59)),
                NamedColor::new("green", Rgb::new(76, 175, 80)),
                NamedColor::new("blue", Rgb::new(33, 150, 243)),
                NamedColor::new("purple", Rgb::new(156, 39, 176)),
                NamedColor::new("pink", Rgb::new(233, 30, 99)),
                NamedColor::new("gray", Rgb::new(158, 158, 158)),
            ],
            dark_channel_max: 50,
            dominant_channel_min: 100,
            min_question_chars: 10,
            placeholder_question: "Select the correct answer.".to_string(),
            system_messages: vec![
                "Please update to the latest Anki version, then import the .colpkg/.apkg file again."
                    .to_string(),
                "This file requires a newer version of Anki.".to_string(),
                "Please update to the latest Anki version, then import the .colpkg file again."
                    .to_string(),
            ],
            block_tags: [
                "div", "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "tr",
                "section", "article", "header", "footer",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl InterchangeSettings {
    /// Parse settings from JSON; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Palette with the configured thresholds.
    pub fn palette(&self) -> Palette {
        Palette::new(
            self.palette.clone(),
            self.dark_channel_max,
            self.dominant_channel_min,
        )
    }

    /// Whether the text contains one of the known exporter notices.
    pub fn is_system_message(&self, text: &str) -> bool {
        self.system_messages
            .iter()
            .any(|m| !m.is_empty() && text.contains(m.as_str()))
    }
}
