//! Reading a native note folder back through a storage collaborator.

use super::manifest::{parse_manifest, MANIFEST_FILE};
use super::CARDS_DIR;
use crate::error::{InterchangeError, Result};
use flashcard_core::CardData;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Per-user note storage.
///
/// Paths are relative to the user's storage root.
pub trait NoteStorage {
    /// Files directly inside `subfolder`, sorted.
    fn note_list(&self, uid: &str, subfolder: &str) -> Result<Vec<PathBuf>>;

    /// Content of one file, or `None` if it does not exist.
    fn note_content(&self, uid: &str, path: &Path) -> Result<Option<String>>;
}

/// Storage laid out as `<root>/<uid>/<path>` on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsNoteStorage {
    root: PathBuf,
}

impl FsNoteStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, uid: &str, relative: &Path) -> Result<PathBuf> {
        let escapes = |p: &Path| {
            p.components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        };
        if uid.is_empty() || escapes(Path::new(uid)) || escapes(relative) {
            return Err(InterchangeError::InvalidData(format!(
                "path {:?} for user {:?} leaves the storage root",
                relative, uid
            )));
        }
        Ok(self.root.join(uid).join(relative))
    }
}

impl NoteStorage for FsNoteStorage {
    fn note_list(&self, uid: &str, subfolder: &str) -> Result<Vec<PathBuf>> {
        let dir = self.resolve(uid, Path::new(subfolder))?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(Path::new(subfolder).join(entry.file_name()));
            }
        }
        files.sort();
        Ok(files)
    }

    fn note_content(&self, uid: &str, path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(self.resolve(uid, path)?) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Load the cards of one note folder.
///
/// Cards are returned in manifest order. Without a manifest every JSON file in
/// the cards directory is read. Card files that are missing or unreadable are
/// logged and skipped.
pub fn load_cards(storage: &dyn NoteStorage, uid: &str, note_folder: &str) -> Result<Vec<CardData>> {
    let folder = Path::new(note_folder);
    let card_paths: Vec<PathBuf> = match storage.note_content(uid, &folder.join(MANIFEST_FILE))? {
        Some(text) => parse_manifest(&text)?
            .into_iter()
            .map(|entry| folder.join(CARDS_DIR).join(format!("{}.json", entry.id)))
            .collect(),
        None => {
            let subfolder = folder.join(CARDS_DIR);
            storage
                .note_list(uid, &subfolder.to_string_lossy())?
                .into_iter()
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect()
        }
    };

    let mut cards = Vec::with_capacity(card_paths.len());
    for path in card_paths {
        let Some(content) = storage.note_content(uid, &path)? else {
            tracing::warn!("Card file {} is listed but missing", path.display());
            continue;
        };
        match serde_json::from_str::<CardData>(&content) {
            Ok(card) => cards.push(card),
            Err(e) => tracing::warn!("Skipping unreadable card {}: {}", path.display(), e),
        }
    }

    tracing::debug!("Loaded {} cards from {}/{}", cards.len(), uid, note_folder);
    Ok(cards)
}
