//! Package export tests: database contents, media and failure cleanup.

mod common;

use anki_interchange::media::{MediaManifest, MediaSource};
use anki_interchange::writer::collection::{BASIC_MODEL_ID, CLOZE_MODEL_ID};
use anki_interchange::writer::COLLECTION_FILE;
use anki_interchange::{write_package, MediaDirectory, PackageWriter};
use common::extract_entry;
use flashcard_core::{field_checksum, sha1_digest, stable_id, CardData};
use pretty_assertions::assert_eq;
use rusqlite::Connection;
use std::fs;
use std::io;
use std::path::PathBuf;

fn open_collection(package: &std::path::Path, dir: &std::path::Path) -> Connection {
    Connection::open(extract_entry(package, COLLECTION_FILE, dir)).unwrap()
}

#[test]
fn cloze_note_fans_out_one_card_per_blank() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("deck.apkg");
    let cards = vec![
        CardData::basic("<<blank|H>> and <<blank|O>> form <<blank|water>>", "<<blank|H2O>>"),
        CardData::basic("plain", "card"),
    ];

    let summary = write_package(&cards, "Chemistry", None, &output).unwrap();
    assert_eq!((summary.notes, summary.cards), (2, 5));

    let conn = open_collection(&output, dir.path());
    let mut stmt = conn
        .prepare("SELECT n.id, n.mid, c.ord, c.did FROM notes n JOIN cards c ON c.nid = n.id ORDER BY n.id, c.ord")
        .unwrap();
    let rows: Vec<(i64, i64, i64, i64)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();

    let cloze_nid = rows[0].0;
    let cloze: Vec<i64> = rows.iter().filter(|r| r.0 == cloze_nid).map(|r| r.2).collect();
    assert_eq!(cloze, vec![0, 1, 2, 3]);
    assert!(rows.iter().filter(|r| r.0 == cloze_nid).all(|r| r.1 == CLOZE_MODEL_ID));

    let plain: Vec<&(i64, i64, i64, i64)> = rows.iter().filter(|r| r.0 != cloze_nid).collect();
    assert_eq!(plain.len(), 1);
    assert_eq!((plain[0].1, plain[0].2), (BASIC_MODEL_ID, 0));

    assert!(rows.iter().all(|r| r.3 == stable_id("Chemistry")));
}

#[test]
fn notes_carry_separator_sort_field_and_checksum() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("deck.apkg");
    let mut card = CardData::basic("a < b", "line one\nline two");
    card.guid = "fixed-guid".into();
    write_package(&[card], "Maths", None, &output).unwrap();

    let conn = open_collection(&output, dir.path());
    let (guid, flds, sfld, csum): (String, String, String, i64) = conn
        .query_row("SELECT guid, flds, sfld, csum FROM notes", [], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
        })
        .unwrap();

    assert_eq!(guid, "fixed-guid");
    assert_eq!(flds, "a &lt; b\x1fline one<br>line two");
    assert_eq!(sfld, "a < b");
    assert_eq!(csum, field_checksum("a < b") as i64);

    let decks: String = conn.query_row("SELECT decks FROM col", [], |r| r.get(0)).unwrap();
    let decks: serde_json::Value = serde_json::from_str(&decks).unwrap();
    assert_eq!(decks[stable_id("Maths").to_string()]["name"], "Maths");
}

#[test]
fn media_files_get_numbered_names_and_manifest_records() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    fs::create_dir_all(work.join("media")).unwrap();
    fs::write(work.join("media/a.png"), b"first").unwrap();
    fs::write(work.join("media/b.mp3"), b"second!").unwrap();
    let output = dir.path().join("deck.apkg");

    let media = MediaDirectory::new(&work);
    let summary = PackageWriter::new("Media")
        .with_media(&media)
        .write(&[CardData::basic("q", "a")], &output)
        .unwrap();
    assert_eq!(summary.media_files, 2);

    let manifest_path = extract_entry(&output, "media", dir.path());
    let manifest: MediaManifest = serde_json::from_str(&fs::read_to_string(manifest_path).unwrap()).unwrap();
    assert_eq!(manifest["0"].name, "a.png");
    assert_eq!(manifest["1"].name, "b.mp3");
    assert_eq!(manifest["1"].size, 7);
    assert_eq!(manifest["1"].sha1, sha1_digest(b"second!").to_vec());
    assert_eq!(fs::read(extract_entry(&output, "1", dir.path())).unwrap(), b"second!");
}

struct VanishingMedia(PathBuf);

impl MediaSource for VanishingMedia {
    fn media_files(&self) -> io::Result<Vec<PathBuf>> {
        Ok(vec![self.0.clone()])
    }
}

#[test]
fn failed_export_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("deck.apkg");
    fs::write(&output, b"previous export").unwrap();

    let media = VanishingMedia(dir.path().join("gone.png"));
    let result = PackageWriter::new("Deck")
        .with_media(&media)
        .write(&[CardData::basic("q", "a")], &output);

    assert!(result.is_err());
    assert!(!output.exists());
}

#[test]
fn export_replaces_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("deck.apkg");
    fs::write(&output, b"stale").unwrap();

    write_package(&[CardData::basic("q", "a")], "Deck", None, &output).unwrap();
    let conn = open_collection(&output, dir.path());
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM notes", [], |r| r.get(0)).unwrap();
    assert_eq!(count, 1);
}
