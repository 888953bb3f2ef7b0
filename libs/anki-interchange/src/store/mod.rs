//! Local store writer: native cards to a note folder and its container
//! archive.

pub mod manifest;
pub mod storage;

use crate::error::{InterchangeError, Result};
use crate::media::sanitize_file_name;
use chrono::Utc;
use flashcard_core::CardData;
use manifest::{format_manifest, ManifestEntry, MANIFEST_FILE};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub use manifest::parse_manifest;
pub use storage::{load_cards, FsNoteStorage, NoteStorage};

/// Directory holding one JSON file per card.
pub const CARDS_DIR: &str = "cards";

/// Error returned by an upload collaborator.
pub type UploadError = Box<dyn std::error::Error + Send + Sync>;

/// Best-effort remote copy of written files.
pub trait CloudUploader {
    fn upload(&self, local: &Path, key: &str) -> std::result::Result<(), UploadError>;
}

/// Outcome of a local store write.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct StoreSummary {
    pub cards: usize,
    pub files_written: usize,
    pub uploads_failed: usize,
}

/// Writes cards into a note folder and packs the folder into an archive.
pub struct LocalStoreWriter<'a> {
    work_dir: PathBuf,
    uploader: Option<&'a dyn CloudUploader>,
}

impl<'a> LocalStoreWriter<'a> {
    pub fn new<P: AsRef<Path>>(work_dir: P) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
            uploader: None,
        }
    }

    /// Upload every written file once the local write has succeeded.
    pub fn with_uploader(mut self, uploader: &'a dyn CloudUploader) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Write `cards` and rebuild the container archive at `archive_path`.
    pub fn write<P: AsRef<Path>>(&self, cards: &[CardData], archive_path: P) -> Result<StoreSummary> {
        let archive_path = archive_path.as_ref();
        let now = Utc::now();
        let cards_dir = self.work_dir.join(CARDS_DIR);
        let cards: Vec<CardData> = cards.iter().map(CardData::normalized).collect();
        for card in &cards {
            if sanitize_file_name(&card.id).as_deref() != Some(card.id.as_str()) {
                return Err(InterchangeError::InvalidData(format!("unusable card id {:?}", card.id)));
            }
        }

        fs::create_dir_all(&cards_dir)?;
        let keep: HashSet<String> = cards.iter().map(|c| format!("{}.json", c.id)).collect();
        remove_stale_cards(&cards_dir, &keep)?;

        let mut written = Vec::with_capacity(cards.len() + 2);
        let mut entries = Vec::with_capacity(cards.len());
        for card in &cards {
            let path = cards_dir.join(format!("{}.json", card.id));
            fs::write(&path, serde_json::to_string_pretty(&card)?)?;
            written.push(path);
            entries.push(ManifestEntry::for_card(card, now));
        }

        let manifest_path = self.work_dir.join(MANIFEST_FILE);
        fs::write(&manifest_path, format_manifest(&entries))?;
        written.push(manifest_path);

        if let Err(e) = self.pack(archive_path) {
            if archive_path.exists() {
                if let Err(remove_err) = fs::remove_file(archive_path) {
                    tracing::warn!(
                        "Failed to remove partial archive {}: {}",
                        archive_path.display(),
                        remove_err
                    );
                }
            }
            return Err(e);
        }
        written.push(archive_path.to_path_buf());

        let uploads_failed = self.upload_all(&written);
        tracing::info!(
            "Stored {} cards in {} ({} upload failures)",
            cards.len(),
            archive_path.display(),
            uploads_failed
        );

        Ok(StoreSummary {
            cards: cards.len(),
            files_written: written.len(),
            uploads_failed,
        })
    }

    fn pack(&self, archive_path: &Path) -> Result<()> {
        let mut files = Vec::new();
        collect_files(&self.work_dir, &mut files)?;

        let file = File::create(archive_path)?;
        let excluded = fs::canonicalize(archive_path).ok();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for path in &files {
            if excluded.is_some() && fs::canonicalize(path).ok() == excluded {
                continue;
            }
            let name = self.entry_name(path)?;
            zip.start_file(name.as_str(), options)?;
            zip.write_all(&fs::read(path)?)?;
        }
        zip.finish()?;

        tracing::debug!("Packed {} files into {}", files.len(), archive_path.display());
        Ok(())
    }

    fn entry_name(&self, path: &Path) -> Result<String> {
        let relative = path
            .strip_prefix(&self.work_dir)
            .map_err(|_| InterchangeError::InvalidData(format!("{} is outside the note folder", path.display())))?;
        Ok(relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"))
    }

    fn upload_all(&self, written: &[PathBuf]) -> usize {
        let Some(uploader) = self.uploader else {
            return 0;
        };

        let mut failed = 0;
        for path in written {
            let key = self
                .entry_name(path)
                .ok()
                .or_else(|| path.file_name().map(|n| n.to_string_lossy().to_string()))
                .unwrap_or_default();
            if let Err(e) = uploader.upload(path, &key) {
                tracing::warn!("Upload of {} failed: {}", path.display(), e);
                failed += 1;
            }
        }
        failed
    }
}

/// Delete card files left by an earlier write that are not in `keep`.
fn remove_stale_cards(cards_dir: &Path, keep: &HashSet<String>) -> Result<()> {
    for entry in fs::read_dir(cards_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.ends_with(".json") || keep.contains(&name) || !entry.file_type()?.is_file() {
            continue;
        }
        fs::remove_file(entry.path())?;
        tracing::debug!("Removed stale card file {}", name);
    }
    Ok(())
}

/// Files under `dir`, recursively, in sorted order.
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        let kind = entry.file_type()?;
        if kind.is_dir() {
            collect_files(&path, out)?;
        } else if kind.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::io::Read;

    struct RecordingUploader {
        keys: RefCell<Vec<String>>,
        fail_on: &'static str,
    }

    impl CloudUploader for RecordingUploader {
        fn upload(&self, _local: &Path, key: &str) -> std::result::Result<(), UploadError> {
            self.keys.borrow_mut().push(key.to_string());
            if key.ends_with(self.fail_on) {
                return Err("remote unavailable".into());
            }
            Ok(())
        }
    }

    fn archive_names(path: &Path) -> Vec<String> {
        let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    #[test]
    fn writes_manifest_cards_and_archive() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("note");
        fs::create_dir_all(work.join("media")).unwrap();
        fs::write(work.join("media/pic.png"), b"png").unwrap();

        let mut card = CardData::basic("front", "back");
        card.id = "card-1".into();
        card.question = "stale".into();
        let archive = dir.path().join("note.zip");

        let summary = LocalStoreWriter::new(&work).write(&[card], &archive).unwrap();
        assert_eq!(summary.cards, 1);
        assert_eq!(summary.files_written, 3);

        let manifest = fs::read_to_string(work.join(MANIFEST_FILE)).unwrap();
        assert!(manifest.starts_with("1\ncard-1,\""));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(work.join("cards/card-1.json")).unwrap()).unwrap();
        assert_eq!(json["type"], "basic-cloze");
        assert_eq!(json["front"], "front");
        assert_eq!(json["question"], "");

        assert_eq!(
            archive_names(&archive),
            vec!["cards.txt", "cards/card-1.json", "media/pic.png"]
        );
    }

    #[test]
    fn overwrites_existing_archive_and_skips_itself() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("note");
        fs::create_dir_all(&work).unwrap();
        let archive = work.join("note.zip");
        fs::write(&archive, b"old contents").unwrap();

        let mut card = CardData::basic("q", "a");
        card.id = "c".into();
        LocalStoreWriter::new(&work).write(&[card], &archive).unwrap();

        assert_eq!(archive_names(&archive), vec!["cards.txt", "cards/c.json"]);
        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut text = String::new();
        zip.by_name("cards.txt").unwrap().read_to_string(&mut text).unwrap();
        assert!(text.starts_with("1\n"));
    }

    #[test]
    fn rewrite_drops_cards_that_were_removed() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("note");
        let archive = dir.path().join("note.zip");
        let card = |id: &str| {
            let mut card = CardData::basic(id, "back");
            card.id = id.into();
            card
        };
        let writer = LocalStoreWriter::new(&work);

        writer.write(&[card("a"), card("b")], &archive).unwrap();
        assert!(work.join("cards/b.json").is_file());

        writer.write(&[card("a")], &archive).unwrap();
        assert!(!work.join("cards/b.json").exists());
        assert_eq!(archive_names(&archive), vec!["cards.txt", "cards/a.json"]);
    }

    #[test]
    fn upload_failures_do_not_fail_the_write() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("note");
        let uploader = RecordingUploader {
            keys: RefCell::new(Vec::new()),
            fail_on: "cards.txt",
        };

        let mut card = CardData::basic("q", "a");
        card.id = "c".into();
        let summary = LocalStoreWriter::new(&work)
            .with_uploader(&uploader)
            .write(&[card], dir.path().join("note.zip"))
            .unwrap();

        assert_eq!(summary.uploads_failed, 1);
        assert_eq!(
            uploader.keys.into_inner(),
            vec!["cards/c.json", "cards.txt", "note.zip"]
        );
    }

    #[test]
    fn rejects_ids_that_are_not_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut card = CardData::basic("q", "a");
        card.id = "../escape".into();
        let result = LocalStoreWriter::new(dir.path()).write(&[card], dir.path().join("x.zip"));
        assert!(matches!(result, Err(InterchangeError::InvalidData(_))));
    }
}
