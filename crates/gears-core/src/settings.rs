use serde::{Deserialize, Serialize};

use crate::angle::Point;
use crate::color::Color;
use crate::constants::{BASE_ROTATION_SPEED, MAX_SPIN_SPEED, MIN_SPIN_SPEED};

/// Direction the driver turns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinDirection {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl SpinDirection {
    /// +1 for clockwise, -1 for counter-clockwise.
    pub fn sign(self) -> f64 {
        match self {
            Self::Clockwise => 1.0,
            Self::CounterClockwise => -1.0,
        }
    }

    /// Any non-negative sign maps to clockwise.
    pub fn from_sign(sign: f64) -> Self {
        if sign < 0.0 {
            Self::CounterClockwise
        } else {
            Self::Clockwise
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Self::Clockwise => Self::CounterClockwise,
            Self::CounterClockwise => Self::Clockwise,
        }
    }
}

/// Per-project settings. Tooth geometry and background are render-only.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub grid_snap: bool,
    pub grid_size: f64,
    pub auto_spin_enabled: bool,
    pub spin_speed: f64,
    pub spin_direction: SpinDirection,
    /// Tooth width as a fraction of angular pitch, 0.3..=0.7
    pub tooth_thickness: f64,
    /// Tooth height in plane units, 4..=14
    pub tooth_depth: f64,
    pub background_color: Color,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grid_snap: true,
            grid_size: 20.0,
            auto_spin_enabled: false,
            spin_speed: 1.0,
            spin_direction: SpinDirection::Clockwise,
            tooth_thickness: 0.6,
            tooth_depth: 4.0,
            background_color: Color::from_palette("#1a1a2e"),
        }
    }
}

impl Settings {
    /// Target driver velocity before load: spin_speed * direction * base speed.
    pub fn driver_velocity(&self) -> f64 {
        self.spin_speed * self.spin_direction.sign() * BASE_ROTATION_SPEED
    }

    /// Round a point to the grid when grid snapping is on.
    pub fn snap_to_grid(&self, p: Point) -> Point {
        if !self.grid_snap || self.grid_size <= 0.0 {
            return p;
        }
        let g = self.grid_size;
        Point::new((p.x / g).round() * g, (p.y / g).round() * g)
    }

    /// Clamp every field into its valid range.
    pub fn sanitized(mut self) -> Self {
        if !self.spin_speed.is_finite() {
            self.spin_speed = 1.0;
        }
        self.spin_speed = self.spin_speed.clamp(MIN_SPIN_SPEED, MAX_SPIN_SPEED);
        self.tooth_thickness = if self.tooth_thickness.is_finite() {
            self.tooth_thickness.clamp(0.3, 0.7)
        } else {
            0.6
        };
        self.tooth_depth = if self.tooth_depth.is_finite() {
            self.tooth_depth.clamp(4.0, 14.0)
        } else {
            4.0
        };
        if !self.grid_size.is_finite() || self.grid_size <= 0.0 {
            self.grid_size = 20.0;
        }
        self
    }
}
