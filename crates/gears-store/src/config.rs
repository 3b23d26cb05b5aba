//! `config.toml` in the data directory: defaults applied to new projects.
//!
//! ```toml
//! [defaults]
//! grid_snap = false
//! spin_speed = 2.0
//! spin_direction = "counter_clockwise"
//! background_color = "#000000"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use gears_core::{Color, Settings, SpinDirection};

use crate::error::Result;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub defaults: SettingsDefaults,
}

/// Per-field overrides of the built-in project settings.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsDefaults {
    pub grid_snap: Option<bool>,
    pub grid_size: Option<f64>,
    pub auto_spin_enabled: Option<bool>,
    pub spin_speed: Option<f64>,
    pub spin_direction: Option<SpinDirection>,
    pub tooth_thickness: Option<f64>,
    pub tooth_depth: Option<f64>,
    pub background_color: Option<String>,
}

impl StoreConfig {
    /// Read a config file. A missing file yields the built-in defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Settings for a freshly created project.
    pub fn project_settings(&self) -> Settings {
        self.defaults.apply(Settings::default())
    }
}

impl SettingsDefaults {
    pub fn apply(&self, mut s: Settings) -> Settings {
        if let Some(v) = self.grid_snap {
            s.grid_snap = v;
        }
        if let Some(v) = self.grid_size {
            s.grid_size = v;
        }
        if let Some(v) = self.auto_spin_enabled {
            s.auto_spin_enabled = v;
        }
        if let Some(v) = self.spin_speed {
            s.spin_speed = v;
        }
        if let Some(v) = self.spin_direction {
            s.spin_direction = v;
        }
        if let Some(v) = self.tooth_thickness {
            s.tooth_thickness = v;
        }
        if let Some(v) = self.tooth_depth {
            s.tooth_depth = v;
        }
        if let Some(color) = self.background_color.as_deref() {
            match Color::parse(color) {
                Some(c) => s.background_color = c,
                None => tracing::warn!(color, "ignoring invalid background_color in config"),
            }
        }
        s.sanitized()
    }
}
