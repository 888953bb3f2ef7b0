//! Export followed by import.

use anki_interchange::store::LocalStoreWriter;
use anki_interchange::{import_package, load_cards, write_package, FsNoteStorage};
use flashcard_core::{CardData, CardType, ChoiceData};
use pretty_assertions::assert_eq;

fn export_then_import(cards: &[CardData]) -> Vec<CardData> {
    let dir = tempfile::tempdir().unwrap();
    let package = dir.path().join("deck.apkg");
    write_package(cards, "Round Trip", None, &package).unwrap();
    let report = import_package(&package).unwrap();
    assert!(report.skipped.is_empty(), "skipped: {:?}", report.skipped);
    report.cards
}

#[test]
fn plain_text_survives_export_and_import() {
    let cards = vec![
        CardData::basic("What is the capital of France?", "Paris"),
        CardData::basic("Symbols & signs <kept>", "a \"quoted\" answer\nover two lines"),
        CardData::basic("Front only", ""),
    ];

    let imported = export_then_import(&cards);
    assert_eq!(imported.len(), cards.len());
    for (original, copy) in cards.iter().zip(&imported) {
        assert_eq!(copy.front, original.front);
        assert_eq!(copy.back, original.back);
        assert_eq!(copy.card_type, CardType::BasicCloze);
        assert_eq!(copy.guid, original.guid);
        assert_ne!(copy.id, original.id);
    }
}

#[test]
fn blanks_and_markup_survive() {
    let cards = vec![
        CardData::basic("<<blank|Water>> boils at <<blank|100>> degrees", "at sea level"),
        CardData::basic("**Important** and {{blue|calm}}", "plain"),
    ];

    let imported = export_then_import(&cards);
    assert_eq!(imported[0].front, "<<blank|Water>> boils at <<blank|100>> degrees");
    assert_eq!(imported[0].back, "at sea level");
    assert_eq!(imported[1].front, "**Important** and {{blue|calm}}");
}

#[test]
fn colored_blank_survives() {
    let imported = export_then_import(&[CardData::basic("<<blank|{{red|Paris}}>> is a city", "x")]);
    assert_eq!(imported[0].front, "<<blank|{{red|Paris}}>> is a city");
    assert_eq!(imported[0].back, "x");
}

#[test]
fn choice_cards_are_rebuilt() {
    let card = CardData::choice(
        "Which planets are gas giants?",
        "Both are mostly hydrogen.",
        vec![
            ChoiceData::new("Mars"),
            ChoiceData {
                text: "Jupiter".into(),
                is_correct: true,
            },
            ChoiceData {
                text: "Saturn".into(),
                is_correct: true,
            },
        ],
    );

    let imported = export_then_import(std::slice::from_ref(&card));
    let copy = &imported[0];
    assert_eq!(copy.card_type, CardType::Choice);
    assert_eq!(copy.question, card.question);
    assert_eq!(copy.choices, card.choices);
    assert_eq!(copy.explanation, "正解：2、3\n\nBoth are mostly hydrogen.");
}

#[test]
fn imported_cards_persist_to_the_local_store() {
    let dir = tempfile::tempdir().unwrap();
    let imported = export_then_import(&[
        CardData::basic("first", "1"),
        CardData::basic("second <<blank|gap>>", "2"),
    ]);

    let note_dir = dir.path().join("user-1").join("biology");
    let archive = dir.path().join("biology.zip");
    LocalStoreWriter::new(&note_dir).write(&imported, &archive).unwrap();
    assert!(archive.is_file());

    let loaded = load_cards(&FsNoteStorage::new(dir.path()), "user-1", "biology").unwrap();
    assert_eq!(loaded, imported);
}
