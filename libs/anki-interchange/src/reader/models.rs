//! Note model parsing from the collection's `models` blob.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Model `type` value marking a cloze model.
pub const CLOZE_MODEL_TYPE: i64 = 1;

/// Field declaration of a note model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelField {
    pub name: String,
    #[serde(default)]
    pub ord: i64,
}

/// The parts of a note model the reader relies on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NoteModel {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: i64,
    #[serde(default)]
    pub flds: Vec<ModelField>,
}

impl NoteModel {
    pub fn is_cloze(&self) -> bool {
        self.kind == CLOZE_MODEL_TYPE
    }
}

/// Why one model entry was dropped.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model id {0:?} is not a valid 64-bit integer")]
    InvalidId(String),

    #[error("model {id} is malformed: {source}")]
    InvalidBody {
        id: i64,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse every entry of the models blob independently.
pub fn parse_model_entries(
    blob: &str,
) -> Result<Vec<Result<(i64, NoteModel), ModelError>>, serde_json::Error> {
    let entries: Map<String, Value> = serde_json::from_str(blob)?;
    Ok(entries.into_iter().map(|(key, body)| parse_entry(&key, body)).collect())
}

fn parse_entry(key: &str, body: Value) -> Result<(i64, NoteModel), ModelError> {
    let id = key
        .trim()
        .parse::<i64>()
        .map_err(|_| ModelError::InvalidId(key.to_string()))?;
    let model = serde_json::from_value(body).map_err(|source| ModelError::InvalidBody { id, source })?;
    Ok((id, model))
}

/// Models keyed by id; malformed entries are logged and dropped.
pub fn load_models(blob: &str) -> HashMap<i64, NoteModel> {
    let entries = match parse_model_entries(blob) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Ignoring unreadable models blob: {}", e);
            return HashMap::new();
        }
    };

    let mut models = HashMap::new();
    for entry in entries {
        match entry {
            Ok((id, model)) => {
                models.insert(id, model);
            }
            Err(e) => tracing::warn!("Skipping note model: {}", e),
        }
    }
    models
}
