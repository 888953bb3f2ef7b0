//! Media manifest and media enumeration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the manifest inside a package.
pub const MANIFEST_NAME: &str = "media";

/// Manifest record for one numbered media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub name: String,
    pub size: u64,
    pub sha1: Vec<u8>,
}

/// Manifest value as found in foreign packages.
///
/// Older exporters write a bare file name instead of a record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MediaEntry {
    Record(MediaRecord),
    Name(String),
}

impl MediaEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Record(r) => &r.name,
            Self::Name(n) => n,
        }
    }
}

/// Manifest written on export, keyed by numeric file name.
pub type MediaManifest = BTreeMap<String, MediaRecord>;

/// Manifest read on import.
pub type ForeignMediaManifest = BTreeMap<String, MediaEntry>;

/// Lists the media files that belong in a package.
pub trait MediaSource {
    fn media_files(&self) -> io::Result<Vec<PathBuf>>;
}

/// Files directly under `<work_dir>/media`.
#[derive(Debug, Clone)]
pub struct MediaDirectory {
    dir: PathBuf,
}

impl MediaDirectory {
    pub fn new<P: AsRef<Path>>(work_dir: P) -> Self {
        Self {
            dir: work_dir.as_ref().join("media"),
        }
    }
}

impl MediaSource for MediaDirectory {
    fn media_files(&self) -> io::Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Reduce a manifest name to a bare file name safe to join onto a directory.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next()?.trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_both_manifest_forms() {
        let json = r#"{"0": {"name": "a.png", "size": 3, "sha1": [1, 2]}, "1": "b.mp3"}"#;
        let manifest: ForeignMediaManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest["0"].name(), "a.png");
        assert_eq!(manifest["1"].name(), "b.mp3");
        assert!(matches!(manifest["0"], MediaEntry::Record(ref r) if r.size == 3));
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_file_name("dir\\img.png").as_deref(), Some("img.png"));
        assert_eq!(sanitize_file_name(".."), None);
        assert_eq!(sanitize_file_name(""), None);
    }

    #[test]
    fn missing_media_dir_is_empty() {
        let source = MediaDirectory::new("/nonexistent/work/dir");
        assert!(source.media_files().unwrap().is_empty());
    }
}
