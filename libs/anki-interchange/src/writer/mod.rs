//! Package writer: native cards to an `.apkg` archive.
//!
//! The collection database is built in a scratch directory, then zipped
//! together with the media manifest and numbered media files. The scratch
//! directory is removed whether or not the export succeeds, and a partially
//! written archive is deleted before the error is returned.

pub mod collection;
pub mod html;
pub mod schema;

use crate::cloze::ClozeSyntax;
use crate::error::Result;
use crate::media::{MediaManifest, MediaRecord, MediaSource, MANIFEST_NAME};
use chrono::Utc;
use collection::{write_collection, BASIC_MODEL_ID, CLOZE_MODEL_ID};
use flashcard_core::{
    field_checksum, new_identifier, sha1_digest, stable_id, CardData, CardType,
    InterchangeSettings,
};
use html::HtmlRenderer;
use rusqlite::{params, Connection};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the collection database inside a package.
pub const COLLECTION_FILE: &str = "collection.anki2";

/// Separator between note fields in `notes.flds`.
pub const FIELD_SEPARATOR: &str = "\x1f";

/// Counts reported after a successful export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ExportSummary {
    pub notes: usize,
    pub cards: usize,
    pub media_files: usize,
}

/// Note ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedNote {
    pub model_id: i64,
    pub fields: [String; 2],
    pub sort_field: String,
    pub checksum: i32,
    /// Number of card rows (one per distinct cloze ordinal, at least one).
    pub card_count: usize,
}

/// Writes native cards as a single-deck package.
pub struct PackageWriter<'a> {
    deck_name: String,
    settings: InterchangeSettings,
    media: Option<&'a dyn MediaSource>,
}

impl<'a> PackageWriter<'a> {
    pub fn new(deck_name: impl Into<String>) -> Self {
        Self {
            deck_name: deck_name.into(),
            settings: InterchangeSettings::default(),
            media: None,
        }
    }

    pub fn with_settings(mut self, settings: InterchangeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Include the files listed by `media` in the package.
    pub fn with_media(mut self, media: &'a dyn MediaSource) -> Self {
        self.media = Some(media);
        self
    }

    /// Export `cards` to `output`, replacing any file already there.
    pub fn write<P: AsRef<Path>>(&self, cards: &[CardData], output: P) -> Result<ExportSummary> {
        let output = output.as_ref();
        let staging = tempfile::tempdir()?;
        let db_path = staging.path().join(COLLECTION_FILE);

        let mut summary = self.build_collection(&db_path, cards)?;

        match self.assemble_archive(&db_path, output) {
            Ok(media_files) => summary.media_files = media_files,
            Err(e) => {
                if output.exists() {
                    if let Err(remove_err) = fs::remove_file(output) {
                        tracing::warn!(
                            "Failed to remove partial package {}: {}",
                            output.display(),
                            remove_err
                        );
                    }
                }
                return Err(e);
            }
        }

        tracing::info!(
            "Exported {} notes ({} cards, {} media files) to {}",
            summary.notes,
            summary.cards,
            summary.media_files,
            output.display()
        );
        Ok(summary)
    }

    fn build_collection(&self, db_path: &Path, cards: &[CardData]) -> Result<ExportSummary> {
        let now = Utc::now();
        let deck_id = stable_id(&self.deck_name);
        let syntax = ClozeSyntax::new()?;
        let renderer = HtmlRenderer::new(self.settings.palette())?;

        let mut conn = Connection::open(db_path)?;
        schema::create_schema(&conn)?;
        write_collection(&conn, deck_id, &self.deck_name, now)?;

        let mut summary = ExportSummary::default();
        let tx = conn.transaction()?;
        {
            let base_id = now.timestamp_millis();
            let mut next_card_id = base_id;

            for (idx, card) in cards.iter().enumerate() {
                let note = prepare_note(card, &syntax, &renderer);
                let note_id = base_id + idx as i64;
                let guid = if card.guid.trim().is_empty() {
                    new_identifier()
                } else {
                    card.guid.clone()
                };
                let modified = card
                    .modified_at
                    .map(|t| t.timestamp())
                    .unwrap_or_else(|| now.timestamp());
                let flds = note.fields.join(FIELD_SEPARATOR);

                tx.execute(
                    "INSERT INTO notes (id, guid, mid, mod, usn, tags, flds, sfld, csum, flags, data)
                     VALUES (?1, ?2, ?3, ?4, -1, '', ?5, ?6, ?7, 0, '')",
                    params![
                        note_id,
                        guid,
                        note.model_id,
                        modified,
                        flds,
                        note.sort_field,
                        note.checksum
                    ],
                )?;

                for ord in 0..note.card_count {
                    tx.execute(
                        "INSERT INTO cards (id, nid, did, ord, mod, usn, type, queue, due, ivl, factor, reps, lapses, left, odue, odid, flags, data)
                         VALUES (?1, ?2, ?3, ?4, ?5, -1, 0, 0, ?6, 0, 0, 0, 0, 0, 0, 0, 0, '')",
                        params![next_card_id, note_id, deck_id, ord as i64, modified, idx as i64 + 1],
                    )?;
                    next_card_id += 1;
                }

                summary.notes += 1;
                summary.cards += note.card_count;
            }
        }
        tx.commit()?;
        conn.close().map_err(|(_, e)| e)?;

        tracing::debug!(
            "Built collection with {} notes and {} cards",
            summary.notes,
            summary.cards
        );
        Ok(summary)
    }

    fn assemble_archive(&self, db_path: &Path, output: &Path) -> Result<usize> {
        let file = File::create(output)?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file(COLLECTION_FILE, options)?;
        zip.write_all(&fs::read(db_path)?)?;

        let files = match self.media {
            Some(source) => source.media_files()?,
            None => Vec::new(),
        };

        let mut manifest = MediaManifest::new();
        for (index, path) in files.iter().enumerate() {
            let bytes = fs::read(path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| index.to_string());
            let key = index.to_string();

            zip.start_file(key.as_str(), options)?;
            zip.write_all(&bytes)?;

            manifest.insert(
                key,
                MediaRecord {
                    name,
                    size: bytes.len() as u64,
                    sha1: sha1_digest(&bytes).to_vec(),
                },
            );
        }

        zip.start_file(MANIFEST_NAME, options)?;
        zip.write_all(serde_json::to_string(&manifest)?.as_bytes())?;
        zip.finish()?;

        Ok(files.len())
    }
}

/// Build the note fields, model and card fan-out for one card.
pub fn prepare_note(card: &CardData, syntax: &ClozeSyntax, renderer: &HtmlRenderer) -> PreparedNote {
    let card = card.normalized();
    let (front, back) = match card.card_type {
        CardType::Choice => choice_fields(&card),
        CardType::BasicCloze | CardType::ImageFill => (card.front.clone(), card.back.clone()),
    };

    let had_blanks = syntax.has_blanks(&front) || syntax.has_blanks(&back);
    let mut next = 1;
    let front = syntax.blanks_to_cloze(&front, &mut next);
    let back = syntax.blanks_to_cloze(&back, &mut next);
    let is_cloze = had_blanks || syntax.has_cloze(&front) || syntax.has_cloze(&back);

    let (model_id, card_count) = if is_cloze {
        let ordinals = syntax.ordinals([front.as_str(), back.as_str()]);
        (CLOZE_MODEL_ID, ordinals.len().max(1))
    } else {
        (BASIC_MODEL_ID, 1)
    };

    PreparedNote {
        model_id,
        checksum: field_checksum(&front),
        fields: [renderer.render(&front), renderer.render(&back)],
        sort_field: front,
        card_count,
    }
}

/// Front: question and numbered choices. Back: answer line and explanation.
fn choice_fields(card: &CardData) -> (String, String) {
    let mut front = card.question.trim().to_string();
    for (i, choice) in card.choices.iter().enumerate() {
        if !front.is_empty() {
            front.push('\n');
        }
        front.push_str(&format!("{}. {}", i + 1, choice.text.trim()));
    }

    let correct = card.correct_choices();
    let explanation = card.explanation.trim();
    let back = if correct.is_empty() {
        explanation.to_string()
    } else {
        let answers = correct
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join("、");
        if explanation.is_empty() {
            format!("正解：{}", answers)
        } else {
            format!("正解：{}\n\n{}", answers, explanation)
        }
    };
    (front, back)
}

/// Export cards to a package with default settings.
pub fn write_package<P: AsRef<Path>>(
    cards: &[CardData],
    deck_name: &str,
    media: Option<&dyn MediaSource>,
    output: P,
) -> Result<ExportSummary> {
    let mut writer = PackageWriter::new(deck_name);
    if let Some(media) = media {
        writer = writer.with_media(media);
    }
    writer.write(cards, output)
}
