use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::angle::Point;
use crate::color::Color;
use crate::gear::GearId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputId(String);

impl OutputId {
    pub fn generate() -> Self {
        Self(format!("output_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OutputId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for OutputId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What an output looks like. Kinematically all kinds behave the same.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Fan,
    Clock,
    Platform,
}

impl OutputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fan => "fan",
            Self::Clock => "clock",
            Self::Platform => "platform",
        }
    }

    /// Parse from string, returns None for unknown kinds.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fan" => Some(Self::Fan),
            "clock" => Some(Self::Clock),
            "platform" => Some(Self::Platform),
            _ => None,
        }
    }

    pub fn default_color(&self) -> Color {
        let hex = match self {
            Self::Fan => "#3498db",
            Self::Clock => "#2c3e50",
            Self::Platform => "#95a5a6",
        };
        Color::from_palette(hex)
    }

    /// Pointer pick radius; fan blades reach further than the hub.
    pub fn hit_radius(&self) -> f64 {
        match self {
            Self::Fan => 55.0,
            Self::Clock => 45.0,
            Self::Platform => 40.0,
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A passive prop that mirrors the rotation of the gear it is attached to.
///
/// `attached_to_gear` is a lookup key resolved every tick, never ownership.
#[derive(Clone, Debug)]
pub struct Output {
    pub id: OutputId,
    pub kind: OutputKind,
    pub position: Point,
    pub rotation: f64,
    pub attached_to_gear: Option<GearId>,
    pub color: Color,
}

impl Output {
    pub fn new(id: OutputId, kind: OutputKind, position: Point) -> Self {
        Self {
            id,
            kind,
            position,
            rotation: 0.0,
            attached_to_gear: None,
            color: kind.default_color(),
        }
    }

    pub fn is_attached_to(&self, gear: &GearId) -> bool {
        self.attached_to_gear.as_ref() == Some(gear)
    }

    pub fn contains(&self, p: Point) -> bool {
        self.position.distance(p) <= self.kind.hit_radius()
    }
}
