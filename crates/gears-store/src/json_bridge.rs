use std::fs;
use std::path::Path;

use gears_core::{GearSystem, import_json};

use crate::error::{Result, StoreError};
use crate::store::Store;

impl Store {
    /// Import a version 1.0 project document file into this store,
    /// replacing its contents. Returns the rebuilt system.
    pub fn import_json_file(&self, path: &Path) -> Result<GearSystem> {
        let json = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        self.import_json_str(&json)
    }

    /// Import a version 1.0 project document string into this store.
    pub fn import_json_str(&self, json: &str) -> Result<GearSystem> {
        let system =
            import_json(json).map_err(|e| StoreError::InvalidData(format!("invalid JSON: {e}")))?;
        self.save_system(&system)?;
        tracing::info!(gears = system.gears().len(), "project imported");
        Ok(system)
    }

    /// Export the stored project to a JSON file.
    pub fn export_json_file(&self, path: &Path) -> Result<()> {
        let json = self.export_json_string()?;
        fs::write(path, json).map_err(|e| {
            StoreError::InvalidData(format!("failed to write {}: {e}", path.display()))
        })
    }

    /// Export the stored project as a JSON string.
    pub fn export_json_string(&self) -> Result<String> {
        let doc = self.load_document()?;
        serde_json::to_string_pretty(&doc)
            .map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))
    }
}
