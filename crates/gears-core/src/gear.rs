use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::angle::{Point, angular_pitch};
use crate::color::Color;
use crate::constants::{GEAR_HIT_MARGIN, MAX_TEETH, MIN_TEETH, MODULE_SIZE};

/// Session-stable gear identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GearId(String);

impl GearId {
    pub fn generate() -> Self {
        Self(format!("gear_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GearId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GearId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for GearId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decorative image that rotates with a gear.
///
/// Only the persisted reference lives here. Fetching and caching the bitmap
/// belongs to the renderer, which keeps its own handle keyed by `url`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttachedImage {
    pub url: String,
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
}

impl AttachedImage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            offset_x: 0.0,
            offset_y: 0.0,
            scale: 1.0,
        }
    }
}

/// Clamp a requested tooth count into the supported range.
pub fn clamp_teeth(teeth: u32) -> u32 {
    teeth.clamp(MIN_TEETH, MAX_TEETH)
}

/// Pitch radius for a tooth count.
pub fn radius_for_teeth(teeth: u32) -> f64 {
    teeth as f64 * MODULE_SIZE / 2.0
}

/// A rigid spur gear on the plane.
///
/// `rotation_speed`, `phase_offset` and `meshing_with` are derived by the
/// engine and are overwritten on every rebuild.
#[derive(Clone, Debug)]
pub struct Gear {
    pub id: GearId,
    pub position: Point,
    teeth_count: u32,
    pub color: Color,
    /// Absolute angle in radians. Unbounded.
    pub rotation: f64,
    /// Signed angular velocity in revolutions per second.
    pub rotation_speed: f64,
    pub phase_offset: f64,
    /// Ids of gears in tooth contact, in detection order.
    pub meshing_with: Vec<GearId>,
    pub attached_image: Option<AttachedImage>,
}

impl Gear {
    pub fn new(id: GearId, position: Point, teeth: u32, color: Color) -> Self {
        Self {
            id,
            position,
            teeth_count: clamp_teeth(teeth),
            color,
            rotation: 0.0,
            rotation_speed: 0.0,
            phase_offset: 0.0,
            meshing_with: Vec::new(),
            attached_image: None,
        }
    }

    pub fn teeth_count(&self) -> u32 {
        self.teeth_count
    }

    /// Set the tooth count (clamped). Radius follows automatically.
    pub fn set_teeth_count(&mut self, teeth: u32) {
        self.teeth_count = clamp_teeth(teeth);
    }

    pub fn radius(&self) -> f64 {
        radius_for_teeth(self.teeth_count)
    }

    pub fn angular_pitch(&self) -> f64 {
        angular_pitch(self.teeth_count)
    }

    /// Pairwise speed ratio when this gear drives `other`.
    pub fn ratio_to(&self, other: &Gear) -> f64 {
        self.teeth_count as f64 / other.teeth_count as f64
    }

    pub fn rpm(&self) -> f64 {
        self.rotation_speed * 60.0
    }

    pub fn is_meshed_with(&self, id: &GearId) -> bool {
        self.meshing_with.contains(id)
    }

    /// Pointer hit test including a small margin outside the rim.
    pub fn contains(&self, p: Point) -> bool {
        self.position.distance(p) <= self.radius() + GEAR_HIT_MARGIN
    }
}
