//! Default collection row: scheduler config, note models, deck and deck config.
//!
//! These values exist so that the consuming application accepts the file.
//! Nothing here carries scheduling meaning for the native store.

use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde_json::{json, Value};

/// Model id of the two-field front/back model.
pub const BASIC_MODEL_ID: i64 = 1_700_000_000_001;

/// Model id of the cloze model.
pub const CLOZE_MODEL_ID: i64 = 1_700_000_000_002;

/// Deck and deck-config id the format reserves for the default deck.
pub const DEFAULT_DECK_ID: i64 = 1;

const CARD_CSS: &str = ".card {\n font-family: arial;\n font-size: 20px;\n text-align: center;\n color: black;\n background-color: white;\n}\n";
const CLOZE_CSS: &str = ".card {\n font-family: arial;\n font-size: 20px;\n text-align: center;\n color: black;\n background-color: white;\n}\n.cloze {\n font-weight: bold;\n color: blue;\n}\n";
const LATEX_PRE: &str = "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage[utf8]{inputenc}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n";
const LATEX_POST: &str = "\\end{document}";

fn field(name: &str, ord: i64) -> Value {
    json!({
        "name": name,
        "ord": ord,
        "sticky": false,
        "rtl": false,
        "font": "Arial",
        "size": 20,
        "media": []
    })
}

fn template(name: &str, qfmt: &str, afmt: &str) -> Value {
    json!({
        "name": name,
        "ord": 0,
        "qfmt": qfmt,
        "afmt": afmt,
        "did": null,
        "bqfmt": "",
        "bafmt": ""
    })
}

/// Scheduler configuration blob.
pub fn default_conf() -> Value {
    json!({
        "nextPos": 1,
        "estTimes": true,
        "activeDecks": [DEFAULT_DECK_ID],
        "sortType": "noteFld",
        "timeLim": 0,
        "sortBackwards": false,
        "addToCur": true,
        "curDeck": DEFAULT_DECK_ID,
        "newBury": true,
        "newSpread": 0,
        "dueCounts": true,
        "curModel": BASIC_MODEL_ID.to_string(),
        "collapseTime": 1200
    })
}

/// The `Basic` and `Cloze` models, keyed by id.
pub fn default_models(deck_id: i64, mod_secs: i64) -> Value {
    let basic = json!({
        "id": BASIC_MODEL_ID,
        "name": "Basic",
        "type": 0,
        "mod": mod_secs,
        "usn": -1,
        "sortf": 0,
        "did": deck_id,
        "tmpls": [template("Card 1", "{{Front}}", "{{FrontSide}}\n\n<hr id=answer>\n\n{{Back}}")],
        "flds": [field("Front", 0), field("Back", 1)],
        "css": CARD_CSS,
        "latexPre": LATEX_PRE,
        "latexPost": LATEX_POST,
        "tags": [],
        "vers": [],
        "req": [[0, "any", [0]]]
    });
    let cloze = json!({
        "id": CLOZE_MODEL_ID,
        "name": "Cloze",
        "type": 1,
        "mod": mod_secs,
        "usn": -1,
        "sortf": 0,
        "did": deck_id,
        "tmpls": [template("Cloze", "{{cloze:Text}}", "{{cloze:Text}}<br>\n{{Back Extra}}")],
        "flds": [field("Text", 0), field("Back Extra", 1)],
        "css": CLOZE_CSS,
        "latexPre": LATEX_PRE,
        "latexPost": LATEX_POST,
        "tags": [],
        "vers": []
    });

    let mut models = serde_json::Map::new();
    models.insert(BASIC_MODEL_ID.to_string(), basic);
    models.insert(CLOZE_MODEL_ID.to_string(), cloze);
    Value::Object(models)
}

fn deck(id: i64, name: &str, mod_secs: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "desc": "",
        "conf": DEFAULT_DECK_ID,
        "mod": mod_secs,
        "usn": -1,
        "collapsed": false,
        "browserCollapsed": false,
        "newToday": [0, 0],
        "revToday": [0, 0],
        "lrnToday": [0, 0],
        "timeToday": [0, 0],
        "dyn": 0,
        "extendNew": 10,
        "extendRev": 50
    })
}

/// The default deck plus the exported deck.
pub fn default_decks(deck_id: i64, deck_name: &str, mod_secs: i64) -> Value {
    let mut decks = serde_json::Map::new();
    decks.insert(
        DEFAULT_DECK_ID.to_string(),
        deck(DEFAULT_DECK_ID, "Default", mod_secs),
    );
    decks.insert(deck_id.to_string(), deck(deck_id, deck_name, mod_secs));
    Value::Object(decks)
}

/// Single deck configuration.
pub fn default_deck_config() -> Value {
    json!({
        "1": {
            "id": DEFAULT_DECK_ID,
            "name": "Default",
            "new": {
                "delays": [1, 10],
                "ints": [1, 4, 7],
                "initialFactor": 2500,
                "order": 1,
                "perDay": 20,
                "bury": true,
                "separate": true
            },
            "rev": {
                "perDay": 200,
                "ease4": 1.3,
                "fuzz": 0.05,
                "ivlFct": 1,
                "maxIvl": 36500,
                "bury": true,
                "minSpace": 1
            },
            "lapse": {
                "delays": [10],
                "mult": 0,
                "minInt": 1,
                "leechFails": 8,
                "leechAction": 0
            },
            "maxTaken": 60,
            "timer": 0,
            "autoplay": true,
            "replayq": true,
            "mod": 0,
            "usn": 0,
            "dyn": false
        }
    })
}

/// Write the collection row (id 1), replacing any existing one.
pub fn write_collection(
    conn: &Connection,
    deck_id: i64,
    deck_name: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let mod_secs = now.timestamp();
    let mod_ms = now.timestamp_millis();
    let crt = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|d| d.and_utc().timestamp())
        .unwrap_or(mod_secs);

    conn.execute(
        "INSERT OR REPLACE INTO col (id, crt, mod, scm, ver, dty, usn, ls, conf, models, decks, dconf, tags)
         VALUES (1, ?1, ?2, ?3, ?4, 0, 0, 0, ?5, ?6, ?7, ?8, '{}')",
        params![
            crt,
            mod_ms,
            mod_ms,
            super::schema::SCHEMA_VERSION,
            default_conf().to_string(),
            default_models(deck_id, mod_secs).to_string(),
            default_decks(deck_id, deck_name, mod_secs).to_string(),
            default_deck_config().to_string(),
        ],
    )?;
    Ok(())
}
