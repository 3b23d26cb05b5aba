use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS gears (
            id             TEXT PRIMARY KEY,
            x              REAL NOT NULL,
            y              REAL NOT NULL,
            teeth_count    INTEGER NOT NULL,
            color          TEXT NOT NULL,
            rotation       REAL NOT NULL DEFAULT 0,
            phase_offset   REAL NOT NULL DEFAULT 0,
            image_url      TEXT,
            image_offset_x REAL NOT NULL DEFAULT 0,
            image_offset_y REAL NOT NULL DEFAULT 0,
            image_scale    REAL NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS outputs (
            id               TEXT PRIMARY KEY,
            kind             TEXT NOT NULL,
            x                REAL NOT NULL,
            y                REAL NOT NULL,
            attached_to_gear TEXT,
            color            TEXT NOT NULL
        );
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}
