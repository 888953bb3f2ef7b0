//! Package reader: a foreign `.apkg` archive to native cards.
//!
//! Structural problems (no collection database, an unreadable database) fail
//! the whole import. Problems confined to one model or one note are logged and
//! that unit is skipped; the rest of the package is still converted.

pub mod choice;
pub mod html;
pub mod models;

use crate::cloze::ClozeSyntax;
use crate::error::{InterchangeError, Result};
use crate::media::{sanitize_file_name, ForeignMediaManifest, MANIFEST_NAME};
use crate::writer::FIELD_SEPARATOR;
use chrono::{DateTime, Utc};
use choice::ChoiceExtractor;
use flashcard_core::{new_identifier, CardData, InterchangeSettings};
use html::HtmlNormalizer;
use models::{load_models, NoteModel};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::ZipArchive;

/// Collection database names, newest first.
pub const COLLECTION_CANDIDATES: [&str; 2] = ["collection.anki21", "collection.anki2"];

/// Note ids in this range are read as creation times in milliseconds
/// (2000-01-01 to 2100-01-01).
const PLAUSIBLE_NOTE_ID_MILLIS: std::ops::Range<i64> = 946_684_800_000..4_102_444_800_000;

/// Why a note produced no card.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("note has no fields")]
    NoFields,

    #[error("field data is not valid UTF-8")]
    InvalidEncoding,

    #[error("note carries an exporter notice instead of content")]
    SystemMessage,

    #[error("all fields are empty")]
    EmptyContent,

    #[error("row could not be read: {0}")]
    Database(String),
}

/// Result of converting one note.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteOutcome {
    Parsed(CardData),
    Skipped(SkipReason),
}

/// A note that was left out of the import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedNote {
    pub note_id: Option<i64>,
    pub reason: SkipReason,
}

/// Everything an import produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub cards: Vec<CardData>,
    pub skipped: Vec<SkippedNote>,
    pub media_restored: usize,
}

/// Columns of one `notes` row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNote {
    pub id: i64,
    pub guid: Option<String>,
    pub model_id: i64,
    pub modified: i64,
    pub fields: Vec<u8>,
}

impl RawNote {
    /// Note with UTF-8 fields joined by the field separator.
    pub fn from_fields(id: i64, model_id: i64, fields: &[&str]) -> Self {
        Self {
            id,
            guid: None,
            model_id,
            modified: 0,
            fields: fields.join(FIELD_SEPARATOR).into_bytes(),
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let fields = match row.get_ref(4)? {
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => bytes.to_vec(),
            ValueRef::Integer(i) => i.to_string().into_bytes(),
            ValueRef::Real(f) => f.to_string().into_bytes(),
            ValueRef::Null => Vec::new(),
        };
        Ok(Self {
            id: row.get(0)?,
            guid: row.get(1)?,
            model_id: row.get(2)?,
            modified: row.get(3)?,
            fields,
        })
    }
}

/// Converts foreign packages into native cards.
#[derive(Debug, Clone)]
pub struct PackageReader {
    settings: InterchangeSettings,
    normalizer: HtmlNormalizer,
    choices: ChoiceExtractor,
    cloze: ClozeSyntax,
    media_dir: Option<PathBuf>,
}

impl PackageReader {
    pub fn new(settings: InterchangeSettings) -> Result<Self> {
        Ok(Self {
            normalizer: HtmlNormalizer::new(&settings)?,
            choices: ChoiceExtractor::new(&settings)?,
            cloze: ClozeSyntax::new()?,
            settings,
            media_dir: None,
        })
    }

    /// Copy the package's media into `dir` under their original names.
    pub fn with_media_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.media_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Import the package at `path`.
    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<ImportReport> {
        let path = path.as_ref();
        let staging = tempfile::tempdir()?;

        let mut archive = ZipArchive::new(File::open(path)?)?;
        archive.extract(staging.path())?;
        tracing::debug!(
            "Extracted {} entries from {} into {}",
            archive.len(),
            path.display(),
            staging.path().display()
        );

        let db_path = COLLECTION_CANDIDATES
            .iter()
            .map(|name| staging.path().join(name))
            .find(|p| p.is_file())
            .ok_or_else(|| InterchangeError::MissingFile(COLLECTION_CANDIDATES.join(" or ")))?;

        let mut report = self.read_collection(&db_path)?;

        if let Some(media_dir) = &self.media_dir {
            report.media_restored = restore_media(staging.path(), media_dir)?;
        }

        tracing::info!(
            "Imported {} cards from {} ({} notes skipped, {} media files restored)",
            report.cards.len(),
            path.display(),
            report.skipped.len(),
            report.media_restored
        );
        Ok(report)
    }

    fn read_collection(&self, db_path: &Path) -> Result<ImportReport> {
        let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

        let blob: Option<String> = conn
            .query_row("SELECT models FROM col LIMIT 1", [], |row| row.get(0))
            .optional()?;
        let models = match blob {
            Some(blob) => load_models(&blob),
            None => {
                tracing::warn!("Collection row is missing; reading notes without models");
                HashMap::new()
            }
        };
        tracing::debug!("Loaded {} note models", models.len());

        let mut report = ImportReport::default();
        let mut stmt = conn.prepare("SELECT id, guid, mid, mod, flds FROM notes ORDER BY id")?;
        let mut rows = stmt.query([])?;

        while let Some(row) = rows.next()? {
            let (note_id, outcome) = match RawNote::from_row(row) {
                Ok(raw) => (Some(raw.id), self.convert_note(&raw, &models)),
                Err(e) => (
                    row.get::<_, i64>(0).ok(),
                    NoteOutcome::Skipped(SkipReason::Database(e.to_string())),
                ),
            };

            match outcome {
                NoteOutcome::Parsed(card) => report.cards.push(card),
                NoteOutcome::Skipped(reason) => {
                    tracing::warn!("Skipping note {:?}: {}", note_id, reason);
                    report.skipped.push(SkippedNote { note_id, reason });
                }
            }
        }

        Ok(report)
    }

    /// Convert one stored note into a native card.
    pub fn convert_note(&self, raw: &RawNote, models: &HashMap<i64, NoteModel>) -> NoteOutcome {
        let text = match std::str::from_utf8(&raw.fields) {
            Ok(text) => text,
            Err(_) => return NoteOutcome::Skipped(SkipReason::InvalidEncoding),
        };
        if text.is_empty() {
            return NoteOutcome::Skipped(SkipReason::NoFields);
        }

        let mut fields = text.split(FIELD_SEPARATOR);
        let front = self
            .normalizer
            .process_html_content(fields.next().unwrap_or_default());
        let back = self
            .normalizer
            .process_html_content(fields.next().unwrap_or_default());

        if self.settings.is_system_message(&front) || self.settings.is_system_message(&back) {
            return NoteOutcome::Skipped(SkipReason::SystemMessage);
        }
        if front.trim().is_empty() && back.trim().is_empty() {
            return NoteOutcome::Skipped(SkipReason::EmptyContent);
        }

        let cloze_model = models.get(&raw.model_id).is_some_and(NoteModel::is_cloze);
        let mut card = if cloze_model || self.cloze.has_cloze(&front) || self.cloze.has_cloze(&back) {
            CardData::basic(self.cloze.cloze_to_blanks(&front), self.cloze.cloze_to_blanks(&back))
        } else if let Some(parsed) = self.choices.reconstruct(&front, &back) {
            CardData::choice(parsed.question, back, parsed.choices)
        } else {
            CardData::basic(front, back)
        };

        card.guid = raw
            .guid
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .unwrap_or_else(new_identifier);
        card.modified_at = positive_unix_time(raw.modified);
        card.created_at = note_creation_time(raw.id);

        tracing::debug!("Converted note {} as {}", raw.id, card.card_type.as_str());
        NoteOutcome::Parsed(card)
    }
}

/// Import a package with default settings and no media restore.
pub fn import_package<P: AsRef<Path>>(path: P) -> Result<ImportReport> {
    PackageReader::new(InterchangeSettings::default())?.read(path)
}

/// Seconds since the epoch as a timestamp, if positive and representable.
pub fn positive_unix_time(secs: i64) -> Option<DateTime<Utc>> {
    if secs <= 0 {
        None
    } else {
        DateTime::from_timestamp(secs, 0)
    }
}

fn note_creation_time(note_id: i64) -> Option<DateTime<Utc>> {
    if PLAUSIBLE_NOTE_ID_MILLIS.contains(&note_id) {
        DateTime::from_timestamp_millis(note_id)
    } else {
        None
    }
}

/// Copy numbered media files back under their manifest names.
fn restore_media(extracted: &Path, media_dir: &Path) -> Result<usize> {
    let manifest_path = extracted.join(MANIFEST_NAME);
    if !manifest_path.is_file() {
        return Ok(0);
    }

    let manifest: ForeignMediaManifest = match serde_json::from_str(&fs::read_to_string(&manifest_path)?) {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::warn!("Ignoring unreadable media manifest: {}", e);
            return Ok(0);
        }
    };

    fs::create_dir_all(media_dir)?;
    let mut claimed = HashSet::new();
    let mut restored = 0;
    for (key, entry) in &manifest {
        let source = extracted.join(key);
        let Some(name) = sanitize_file_name(entry.name()) else {
            tracing::warn!("Skipping media {} with unusable name {:?}", key, entry.name());
            continue;
        };
        if !source.is_file() {
            tracing::warn!("Media {} ({}) is listed but missing from the package", key, name);
            continue;
        }
        match restore_one(&source, media_dir, &name, &mut claimed) {
            Ok(stored) => {
                if stored != name {
                    tracing::warn!("Media {} collides with another file, restored as {}", name, stored);
                }
                restored += 1;
            }
            Err(e) => tracing::warn!("Failed to restore media {}: {}", name, e),
        }
    }
    Ok(restored)
}

/// Copy one media file without clobbering a different file of the same name.
///
/// Returns the name it was stored under. An existing file with identical
/// content is reused; otherwise the first free `stem_N.ext` variant is taken.
fn restore_one(source: &Path, media_dir: &Path, name: &str, claimed: &mut HashSet<String>) -> std::io::Result<String> {
    let bytes = fs::read(source)?;
    let mut attempt = 0;
    loop {
        let candidate = numbered_name(name, attempt);
        attempt += 1;
        if claimed.contains(&candidate) {
            continue;
        }
        let target = media_dir.join(&candidate);
        if target.exists() {
            if fs::read(&target)? != bytes {
                continue;
            }
        } else {
            fs::write(&target, &bytes)?;
        }
        claimed.insert(candidate.clone());
        return Ok(candidate);
    }
}

fn numbered_name(name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, attempt, ext),
        _ => format!("{}_{}", name, attempt),
    }
}
