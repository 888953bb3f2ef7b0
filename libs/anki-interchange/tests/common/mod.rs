//! Common fixtures for integration tests.
//!
//! Packages are assembled directly with rusqlite and zip, the way a foreign
//! exporter would write them, so the reader is tested against files it did not
//! produce itself.

#![allow(dead_code)]

use anki_interchange::writer::schema::create_schema;
use rusqlite::{params, Connection};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub const BASIC_MODEL: i64 = 1_342_697_561_419;
pub const CLOZE_MODEL: i64 = 1_342_697_561_420;

/// Separator between fields in `notes.flds`.
pub const SEP: &str = "\x1f";

/// Models blob with one basic and one cloze model.
pub fn default_models() -> String {
    format!(
        r#"{{"{basic}": {{"name": "Basic", "type": 0, "flds": [{{"name": "Front", "ord": 0}}, {{"name": "Back", "ord": 1}}]}},
            "{cloze}": {{"name": "Cloze", "type": 1, "flds": [{{"name": "Text", "ord": 0}}, {{"name": "Extra", "ord": 1}}]}}}}"#,
        basic = BASIC_MODEL,
        cloze = CLOZE_MODEL
    )
}

enum Fields {
    Text(String),
    Bytes(Vec<u8>),
}

struct FixtureNote {
    id: i64,
    guid: String,
    mid: i64,
    modified: i64,
    fields: Fields,
}

/// Builder for a foreign package.
pub struct PackageFixture {
    db_name: Option<String>,
    models: String,
    notes: Vec<FixtureNote>,
    media: Vec<(String, Vec<u8>)>,
    legacy_manifest: bool,
}

impl PackageFixture {
    pub fn new() -> Self {
        Self {
            db_name: Some("collection.anki2".to_string()),
            models: default_models(),
            notes: Vec::new(),
            media: Vec::new(),
            legacy_manifest: false,
        }
    }

    /// Store the collection under another name, or leave it out with `None`.
    pub fn db_name(mut self, name: Option<&str>) -> Self {
        self.db_name = name.map(str::to_string);
        self
    }

    pub fn models(mut self, json: &str) -> Self {
        self.models = json.to_string();
        self
    }

    /// Add a note whose fields are joined with the field separator.
    pub fn note(mut self, id: i64, mid: i64, fields: &[&str]) -> Self {
        self.notes.push(FixtureNote {
            id,
            guid: format!("guid-{}", id),
            mid,
            modified: 1_600_000_000,
            fields: Fields::Text(fields.join(SEP)),
        });
        self
    }

    /// Add a note whose field column holds raw bytes.
    pub fn raw_note(mut self, id: i64, mid: i64, bytes: &[u8]) -> Self {
        self.notes.push(FixtureNote {
            id,
            guid: format!("guid-{}", id),
            mid,
            modified: 1_600_000_000,
            fields: Fields::Bytes(bytes.to_vec()),
        });
        self
    }

    pub fn media(mut self, name: &str, bytes: &[u8]) -> Self {
        self.media.push((name.to_string(), bytes.to_vec()));
        self
    }

    /// Write the manifest as `{"0": "name"}` instead of records.
    pub fn legacy_manifest(mut self) -> Self {
        self.legacy_manifest = true;
        self
    }

    /// Write the package into `dir` and return its path.
    pub fn build(&self, dir: &Path) -> PathBuf {
        let scratch = tempfile::tempdir().unwrap();
        let db_path = scratch.path().join("collection.db");
        self.write_database(&db_path);

        let package = dir.join("fixture.apkg");
        let mut zip = ZipWriter::new(File::create(&package).unwrap());
        let options = SimpleFileOptions::default();

        if let Some(name) = &self.db_name {
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(&fs::read(&db_path).unwrap()).unwrap();
        }

        let mut manifest = serde_json::Map::new();
        for (index, (name, bytes)) in self.media.iter().enumerate() {
            let key = index.to_string();
            zip.start_file(key.as_str(), options).unwrap();
            zip.write_all(bytes).unwrap();
            let entry = if self.legacy_manifest {
                serde_json::json!(name)
            } else {
                serde_json::json!({ "name": name, "size": bytes.len(), "sha1": [] })
            };
            manifest.insert(key, entry);
        }
        zip.start_file("media", options).unwrap();
        zip.write_all(serde_json::Value::Object(manifest).to_string().as_bytes())
            .unwrap();
        zip.finish().unwrap();

        package
    }

    fn write_database(&self, path: &Path) {
        let conn = Connection::open(path).unwrap();
        create_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO col (id, crt, mod, scm, ver, dty, usn, ls, conf, models, decks, dconf, tags)
             VALUES (1, 0, 0, 0, 11, 0, 0, 0, '{}', ?1, '{}', '{}', '{}')",
            params![self.models],
        )
        .unwrap();

        for note in &self.notes {
            let insert = "INSERT INTO notes (id, guid, mid, mod, usn, tags, flds, sfld, csum, flags, data)
                          VALUES (?1, ?2, ?3, ?4, -1, '', ?5, '', 0, 0, '')";
            match &note.fields {
                Fields::Text(text) => conn.execute(
                    insert,
                    params![note.id, note.guid, note.mid, note.modified, text],
                ),
                Fields::Bytes(bytes) => conn.execute(
                    insert,
                    params![note.id, note.guid, note.mid, note.modified, bytes],
                ),
            }
            .unwrap();
        }
    }
}

/// Extract one entry of a package into `dir`.
pub fn extract_entry(package: &Path, name: &str, dir: &Path) -> PathBuf {
    let mut archive = ZipArchive::new(File::open(package).unwrap()).unwrap();
    let mut bytes = Vec::new();
    archive.by_name(name).unwrap().read_to_end(&mut bytes).unwrap();
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}
