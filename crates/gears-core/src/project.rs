//! JSON serde for the version 1.0 project document.
//!
//! The wire format uses camelCase field names, flat `x`/`y` coordinates and a
//! numeric spin direction (`1` or `-1`). Only authored state is stored:
//! speeds, meshing lists and lock status are rebuilt on import.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::angle::Point;
use crate::color::Color;
use crate::constants::{GEAR_COLORS, MAX_TEETH, MIN_TEETH};
use crate::gear::{AttachedImage, Gear, GearId};
use crate::output::{Output, OutputId, OutputKind};
use crate::settings::{Settings, SpinDirection};
use crate::system::GearSystem;

pub const CURRENT_VERSION: &str = "1.0";

// --- Wire format types ---

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProjectDocument {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub settings: WireSettings,
    #[serde(default)]
    pub gears: Vec<WireGear>,
    #[serde(default)]
    pub outputs: Vec<WireOutput>,
    #[serde(rename = "driverGearId", default)]
    pub driver_gear_id: Option<String>,
}

fn default_version() -> String {
    CURRENT_VERSION.to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct WireSettings {
    pub grid_snap: bool,
    pub grid_size: f64,
    pub auto_spin_enabled: bool,
    pub spin_speed: f64,
    pub spin_direction: f64,
    pub tooth_thickness: f64,
    pub tooth_depth: f64,
    pub background_color: String,
}

impl Default for WireSettings {
    fn default() -> Self {
        WireSettings::from_settings(&Settings::default())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WireGear {
    #[serde(default)]
    pub id: String,
    pub x: f64,
    pub y: f64,
    #[serde(deserialize_with = "deserialize_teeth")]
    pub teeth_count: i64,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub phase_offset: f64,
    #[serde(default)]
    pub attached_image: Option<WireImage>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WireImage {
    pub url: String,
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WireOutput {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub attached_to_gear: Option<String>,
    #[serde(default)]
    pub color: String,
}

// --- Conversion: Domain → Wire ---

impl WireSettings {
    pub fn from_settings(s: &Settings) -> Self {
        WireSettings {
            grid_snap: s.grid_snap,
            grid_size: s.grid_size,
            auto_spin_enabled: s.auto_spin_enabled,
            spin_speed: s.spin_speed,
            spin_direction: s.spin_direction.sign(),
            tooth_thickness: s.tooth_thickness,
            tooth_depth: s.tooth_depth,
            background_color: s.background_color.to_string(),
        }
    }

    /// Convert to domain settings, clamping out-of-range values.
    pub fn into_settings(self) -> Settings {
        let defaults = Settings::default();
        Settings {
            grid_snap: self.grid_snap,
            grid_size: self.grid_size,
            auto_spin_enabled: self.auto_spin_enabled,
            spin_speed: self.spin_speed,
            spin_direction: SpinDirection::from_sign(self.spin_direction),
            tooth_thickness: self.tooth_thickness,
            tooth_depth: self.tooth_depth,
            background_color: Color::parse(&self.background_color)
                .unwrap_or(defaults.background_color),
        }
        .sanitized()
    }
}

impl ProjectDocument {
    /// Snapshot the authored state of a system.
    pub fn from_system(system: &GearSystem) -> Self {
        ProjectDocument {
            version: CURRENT_VERSION.to_string(),
            settings: WireSettings::from_settings(system.settings()),
            gears: system.gears().iter().map(domain_gear_to_wire).collect(),
            outputs: system.outputs().iter().map(domain_output_to_wire).collect(),
            driver_gear_id: system.driver_id().map(|id| id.to_string()),
        }
    }

    /// Build a live system. Gears and outputs with duplicate ids (first one
    /// wins) and outputs of an unknown type are skipped; everything derived
    /// is recomputed.
    pub fn into_system(self) -> GearSystem {
        let settings = self.settings.into_settings();

        let mut seen = HashSet::new();
        let gears: Vec<Gear> = self
            .gears
            .into_iter()
            .map(wire_gear_to_domain)
            .filter(|g| seen.insert(g.id.clone()))
            .collect();

        let mut seen_outputs = HashSet::new();
        let outputs: Vec<Output> = self
            .outputs
            .into_iter()
            .filter_map(wire_output_to_domain)
            .filter(|o| seen_outputs.insert(o.id.clone()))
            .collect();

        let driver = self
            .driver_gear_id
            .filter(|id| !id.is_empty())
            .map(GearId::from);

        GearSystem::restore(settings, gears, outputs, driver)
    }
}

fn domain_gear_to_wire(g: &Gear) -> WireGear {
    WireGear {
        id: g.id.to_string(),
        x: g.position.x,
        y: g.position.y,
        teeth_count: i64::from(g.teeth_count()),
        color: g.color.to_string(),
        rotation: g.rotation,
        phase_offset: g.phase_offset,
        attached_image: g.attached_image.as_ref().map(|img| WireImage {
            url: img.url.clone(),
            offset_x: img.offset_x,
            offset_y: img.offset_y,
            scale: img.scale,
        }),
    }
}

fn domain_output_to_wire(o: &Output) -> WireOutput {
    WireOutput {
        id: o.id.to_string(),
        kind: o.kind.as_str().to_string(),
        x: o.position.x,
        y: o.position.y,
        attached_to_gear: o.attached_to_gear.as_ref().map(|id| id.to_string()),
        color: o.color.to_string(),
    }
}

// --- Conversion: Wire → Domain ---

/// Tooth counts written as floats (`12.0`, `12.6`) round to the nearest
/// integer; range clamping happens in `wire_gear_to_domain`.
fn deserialize_teeth<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if raw.is_finite() {
        Ok(raw.round().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
    } else {
        Ok(i64::from(MIN_TEETH))
    }
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v } else { fallback }
}

fn wire_gear_to_domain(wire: WireGear) -> Gear {
    let id = if wire.id.is_empty() {
        GearId::generate()
    } else {
        GearId::from(wire.id)
    };
    let teeth = wire.teeth_count.clamp(i64::from(MIN_TEETH), i64::from(MAX_TEETH)) as u32;
    let color =
        Color::parse(&wire.color).unwrap_or_else(|| Color::from_palette(GEAR_COLORS[0]));
    let position = Point::new(finite_or(wire.x, 0.0), finite_or(wire.y, 0.0));

    let mut gear = Gear::new(id, position, teeth, color);
    gear.rotation = finite_or(wire.rotation, 0.0);
    gear.phase_offset = finite_or(wire.phase_offset, 0.0);
    gear.attached_image = wire
        .attached_image
        .filter(|img| !img.url.is_empty())
        .map(|img| AttachedImage {
            url: img.url,
            offset_x: finite_or(img.offset_x, 0.0),
            offset_y: finite_or(img.offset_y, 0.0),
            scale: finite_or(img.scale, 1.0),
        });
    gear
}

fn wire_output_to_domain(wire: WireOutput) -> Option<Output> {
    let kind = OutputKind::from_str_opt(&wire.kind)?;
    let id = if wire.id.is_empty() {
        OutputId::generate()
    } else {
        OutputId::from(wire.id)
    };
    let position = Point::new(finite_or(wire.x, 0.0), finite_or(wire.y, 0.0));

    let mut output = Output::new(id, kind, position);
    output.attached_to_gear = wire
        .attached_to_gear
        .filter(|id| !id.is_empty())
        .map(GearId::from);
    if let Some(color) = Color::parse(&wire.color) {
        output.color = color;
    }
    Some(output)
}

/// Deserialize a version 1.0 project document into a live system.
pub fn import_json(json: &str) -> Result<GearSystem, serde_json::Error> {
    let doc: ProjectDocument = serde_json::from_str(json)?;
    Ok(doc.into_system())
}

/// Serialize a system to the version 1.0 project document.
pub fn export_json(system: &GearSystem) -> Result<String, serde_json::Error> {
    let doc = ProjectDocument::from_system(system);
    serde_json::to_string_pretty(&doc)
}
