//! Collection database schema.

use crate::error::Result;
use rusqlite::Connection;

/// Collection schema version written to `col.ver`.
pub const SCHEMA_VERSION: i64 = 11;

/// Tables and indexes of a legacy collection.
pub const SCHEMA: &str = r#"
-- Collection (single row)
CREATE TABLE IF NOT EXISTS col (
    id      INTEGER PRIMARY KEY,
    crt     INTEGER NOT NULL,
    mod     INTEGER NOT NULL,
    scm     INTEGER NOT NULL,
    ver     INTEGER NOT NULL,
    dty     INTEGER NOT NULL,
    usn     INTEGER NOT NULL,
    ls      INTEGER NOT NULL,
    conf    TEXT NOT NULL,
    models  TEXT NOT NULL,
    decks   TEXT NOT NULL,
    dconf   TEXT NOT NULL,
    tags    TEXT NOT NULL
);

-- Notes
CREATE TABLE IF NOT EXISTS notes (
    id      INTEGER PRIMARY KEY,
    guid    TEXT NOT NULL,
    mid     INTEGER NOT NULL,
    mod     INTEGER NOT NULL,
    usn     INTEGER NOT NULL,
    tags    TEXT NOT NULL,
    flds    TEXT NOT NULL,
    sfld    INTEGER NOT NULL,
    csum    INTEGER NOT NULL,
    flags   INTEGER NOT NULL,
    data    TEXT NOT NULL
);

-- Cards (scheduling columns hold new-card defaults)
CREATE TABLE IF NOT EXISTS cards (
    id      INTEGER PRIMARY KEY,
    nid     INTEGER NOT NULL,
    did     INTEGER NOT NULL,
    ord     INTEGER NOT NULL,
    mod     INTEGER NOT NULL,
    usn     INTEGER NOT NULL,
    type    INTEGER NOT NULL,
    queue   INTEGER NOT NULL,
    due     INTEGER NOT NULL,
    ivl     INTEGER NOT NULL,
    factor  INTEGER NOT NULL,
    reps    INTEGER NOT NULL,
    lapses  INTEGER NOT NULL,
    left    INTEGER NOT NULL,
    odue    INTEGER NOT NULL,
    odid    INTEGER NOT NULL,
    flags   INTEGER NOT NULL,
    data    TEXT NOT NULL
);

-- Review log
CREATE TABLE IF NOT EXISTS revlog (
    id      INTEGER PRIMARY KEY,
    cid     INTEGER NOT NULL,
    usn     INTEGER NOT NULL,
    ease    INTEGER NOT NULL,
    ivl     INTEGER NOT NULL,
    lastIvl INTEGER NOT NULL,
    factor  INTEGER NOT NULL,
    time    INTEGER NOT NULL,
    type    INTEGER NOT NULL
);

-- Tombstones
CREATE TABLE IF NOT EXISTS graves (
    usn     INTEGER NOT NULL,
    oid     INTEGER NOT NULL,
    type    INTEGER NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS ix_notes_usn ON notes (usn);
CREATE INDEX IF NOT EXISTS ix_cards_usn ON cards (usn);
CREATE INDEX IF NOT EXISTS ix_revlog_usn ON revlog (usn);
CREATE INDEX IF NOT EXISTS ix_cards_nid ON cards (nid);
CREATE INDEX IF NOT EXISTS ix_cards_sched ON cards (did, queue, due);
CREATE INDEX IF NOT EXISTS ix_revlog_cid ON revlog (cid);
CREATE INDEX IF NOT EXISTS ix_notes_csum ON notes (csum);
"#;

/// Create every table and index. Safe to call repeatedly.
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
