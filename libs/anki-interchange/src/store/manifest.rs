//! `cards.txt`: a card count line followed by `id,"yyyy-MM-dd HH:mm:ss"` lines.

use crate::error::{InterchangeError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use flashcard_core::CardData;

/// Name of the manifest inside a note folder.
pub const MANIFEST_FILE: &str = "cards.txt";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One `id,timestamp` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub id: String,
    pub timestamp: NaiveDateTime,
}

impl ManifestEntry {
    /// Entry for a card, timestamped with its last modification, else its
    /// creation, else `now`.
    pub fn for_card(card: &CardData, now: DateTime<Utc>) -> Self {
        let at = card.modified_at.or(card.created_at).unwrap_or(now);
        Self {
            id: card.id.clone(),
            timestamp: at.naive_utc(),
        }
    }
}

pub fn format_manifest(entries: &[ManifestEntry]) -> String {
    let mut out = format!("{}\n", entries.len());
    for entry in entries {
        out.push_str(&format!(
            "{},\"{}\"\n",
            entry.id,
            entry.timestamp.format(TIMESTAMP_FORMAT)
        ));
    }
    out
}

/// Parse a manifest. A count that disagrees with the number of lines is
/// logged, not rejected.
pub fn parse_manifest(text: &str) -> Result<Vec<ManifestEntry>> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let header = lines
        .next()
        .ok_or_else(|| InterchangeError::InvalidData("empty card manifest".to_string()))?;
    let count: usize = header
        .parse()
        .map_err(|_| InterchangeError::InvalidData(format!("bad card count {:?}", header)))?;

    let entries = lines.map(parse_line).collect::<Result<Vec<_>>>()?;
    if entries.len() != count {
        tracing::warn!(
            "Card manifest declares {} cards but lists {}",
            count,
            entries.len()
        );
    }
    Ok(entries)
}

fn parse_line(line: &str) -> Result<ManifestEntry> {
    let invalid = || InterchangeError::InvalidData(format!("bad card manifest line {:?}", line));

    let (id, stamp) = line.rsplit_once(',').ok_or_else(invalid)?;
    let id = id.trim();
    if id.is_empty() {
        return Err(invalid());
    }
    let stamp = stamp.trim().trim_matches('"');
    let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).map_err(|_| invalid())?;

    Ok(ManifestEntry {
        id: id.to_string(),
        timestamp,
    })
}
