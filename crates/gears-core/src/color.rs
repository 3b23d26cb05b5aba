use std::fmt;
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::GEAR_COLORS;

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());

/// A `#rrggbb` color. Carried opaquely by the engine for the renderer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    /// Parse a hex color, normalizing to lowercase. Returns None if malformed.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        HEX_COLOR
            .is_match(trimmed)
            .then(|| Self(trimmed.to_ascii_lowercase()))
    }

    /// Built-in palette entries are known-valid lowercase hex.
    pub(crate) fn from_palette(hex: &'static str) -> Self {
        Self(hex.to_string())
    }

    /// Pick a color from the gear palette.
    pub fn random(rng: &mut impl Rng) -> Self {
        let idx = rng.random_range(0..GEAR_COLORS.len());
        Self::from_palette(GEAR_COLORS[idx])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Red, green, blue components.
    pub fn rgb(&self) -> (u8, u8, u8) {
        let v = u32::from_str_radix(&self.0[1..], 16).unwrap_or(0);
        ((v >> 16) as u8, (v >> 8) as u8, v as u8)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
