use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use gears_core::project::{WireGear, WireImage, WireOutput, WireSettings};
use gears_core::{CURRENT_VERSION, GearSystem, ProjectDocument};

use crate::error::{Result, StoreError};
use crate::schema;

const KEY_SETTINGS: &str = "settings";
const KEY_DRIVER: &str = "driver_gear_id";
const KEY_VERSION: &str = "document_version";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        set_metadata_on(&self.conn, key, value)
    }

    /// True once a project has been saved into this database.
    pub fn has_project(&self) -> Result<bool> {
        Ok(self.get_metadata(KEY_SETTINGS)?.is_some())
    }

    // --- Save ---

    /// Replace the stored project with the authored state of `system`.
    pub fn save_system(&self, system: &GearSystem) -> Result<()> {
        self.save_document(&ProjectDocument::from_system(system))
    }

    pub fn save_document(&self, doc: &ProjectDocument) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute_batch("DELETE FROM outputs; DELETE FROM gears;")?;

        let settings = serde_json::to_string(&doc.settings)
            .map_err(|e| StoreError::InvalidData(format!("settings: {e}")))?;
        set_metadata_on(&tx, KEY_SETTINGS, &settings)?;
        set_metadata_on(&tx, KEY_VERSION, &doc.version)?;
        match &doc.driver_gear_id {
            Some(id) => set_metadata_on(&tx, KEY_DRIVER, id)?,
            None => {
                tx.execute("DELETE FROM metadata WHERE key = ?1", [KEY_DRIVER])?;
            }
        }

        for gear in &doc.gears {
            save_gear_on(&tx, gear)?;
        }
        for output in &doc.outputs {
            save_output_on(&tx, output)?;
        }

        tx.commit()?;
        tracing::debug!(
            gears = doc.gears.len(),
            outputs = doc.outputs.len(),
            "project saved"
        );
        Ok(())
    }

    // --- Load ---

    /// Load the stored project. Derived state is rebuilt by the engine.
    pub fn load_system(&self) -> Result<GearSystem> {
        Ok(self.load_document()?.into_system())
    }

    pub fn load_document(&self) -> Result<ProjectDocument> {
        let settings = match self.get_metadata(KEY_SETTINGS)? {
            Some(json) => serde_json::from_str::<WireSettings>(&json)
                .map_err(|e| StoreError::InvalidData(format!("settings: {e}")))?,
            None => WireSettings::default(),
        };
        let version = self
            .get_metadata(KEY_VERSION)?
            .unwrap_or_else(|| CURRENT_VERSION.to_string());

        Ok(ProjectDocument {
            version,
            settings,
            gears: self.load_gears()?,
            outputs: self.load_outputs()?,
            driver_gear_id: self.get_metadata(KEY_DRIVER)?,
        })
    }

    fn load_gears(&self) -> Result<Vec<WireGear>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, x, y, teeth_count, color, rotation, phase_offset,
                    image_url, image_offset_x, image_offset_y, image_scale
             FROM gears ORDER BY rowid",
        )?;

        let gears = stmt
            .query_map([], |row| {
                let image_url: Option<String> = row.get(7)?;
                Ok(WireGear {
                    id: row.get(0)?,
                    x: row.get(1)?,
                    y: row.get(2)?,
                    teeth_count: row.get(3)?,
                    color: row.get(4)?,
                    rotation: row.get(5)?,
                    phase_offset: row.get(6)?,
                    attached_image: match image_url {
                        Some(url) => Some(WireImage {
                            url,
                            offset_x: row.get(8)?,
                            offset_y: row.get(9)?,
                            scale: row.get(10)?,
                        }),
                        None => None,
                    },
                })
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(gears)
    }

    fn load_outputs(&self) -> Result<Vec<WireOutput>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, x, y, attached_to_gear, color FROM outputs ORDER BY rowid",
        )?;

        let outputs = stmt
            .query_map([], |row| {
                Ok(WireOutput {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    x: row.get(2)?,
                    y: row.get(3)?,
                    attached_to_gear: row.get(4)?,
                    color: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(outputs)
    }

    pub fn gear_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM gears", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn set_metadata_on(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

fn save_gear_on(conn: &Connection, gear: &WireGear) -> Result<()> {
    let image = gear.attached_image.as_ref();
    conn.execute(
        "INSERT INTO gears (id, x, y, teeth_count, color, rotation, phase_offset,
                            image_url, image_offset_x, image_offset_y, image_scale)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            gear.id,
            gear.x,
            gear.y,
            gear.teeth_count,
            gear.color,
            gear.rotation,
            gear.phase_offset,
            image.map(|i| i.url.as_str()),
            image.map_or(0.0, |i| i.offset_x),
            image.map_or(0.0, |i| i.offset_y),
            image.map_or(1.0, |i| i.scale),
        ],
    )?;
    Ok(())
}

fn save_output_on(conn: &Connection, output: &WireOutput) -> Result<()> {
    conn.execute(
        "INSERT INTO outputs (id, kind, x, y, attached_to_gear, color)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            output.id,
            output.kind,
            output.x,
            output.y,
            output.attached_to_gear,
            output.color,
        ],
    )?;
    Ok(())
}
