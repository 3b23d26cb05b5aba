use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

/// A position on the shared 2D plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Direction from `self` towards `other`, in radians.
    pub fn angle_to(self, other: Self) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// Point at `distance` from `self` along `angle`.
    pub fn offset(self, angle: f64, distance: f64) -> Self {
        Self::new(self.x + angle.cos() * distance, self.y + angle.sin() * distance)
    }
}

/// Angle between adjacent teeth: 2π / teeth.
pub fn angular_pitch(teeth: u32) -> f64 {
    TAU / teeth as f64
}

/// Angle of the center of tooth `index` for a gear at `rotation`.
pub fn tooth_angle(teeth: u32, rotation: f64, index: u32) -> f64 {
    index as f64 * angular_pitch(teeth) + rotation
}

/// Angle of the center of the valley after tooth `index`.
pub fn gap_angle(teeth: u32, rotation: f64, index: u32) -> f64 {
    (index as f64 + 0.5) * angular_pitch(teeth) + rotation
}

/// Wrap an angle into (-π, π].
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Angle of the contact point as seen from `from`, i.e. the direction of `to`'s center.
pub fn contact_angle(from: Point, to: Point) -> f64 {
    from.angle_to(to)
}

/// Angle of a pointer at (x, y) around `center`. Used for manual drive gestures.
pub fn pointer_angle(center: Point, x: f64, y: f64) -> f64 {
    center.angle_to(Point::new(x, y))
}
