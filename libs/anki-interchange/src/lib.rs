//! Conversion between native cards and Anki `.apkg` packages.
//!
//! Provides:
//! - Package writer (cards to a single-deck package with media)
//! - Package reader (best-effort import of foreign packages)
//! - Local store writer (cards to the native `cards.txt` + JSON container)

pub mod cloze;
pub mod error;
pub mod media;
pub mod reader;
pub mod store;
pub mod writer;

pub use error::{InterchangeError, Result};
pub use media::{MediaDirectory, MediaSource};
pub use reader::{import_package, ImportReport, NoteOutcome, PackageReader, SkipReason, SkippedNote};
pub use store::{load_cards, parse_manifest, CloudUploader, FsNoteStorage, LocalStoreWriter, NoteStorage, StoreSummary};
pub use writer::{write_package, ExportSummary, PackageWriter};
