/// Tooth module: pitch radius = teeth * MODULE_SIZE / 2
pub const MODULE_SIZE: f64 = 5.0;

/// Smallest tooth count a gear may have
pub const MIN_TEETH: u32 = 8;

/// Largest tooth count a gear may have
pub const MAX_TEETH: u32 = 48;

/// Center-distance error below which two gears count as meshed
pub const MESH_TOLERANCE: f64 = 15.0;

/// Center-distance error below which a dragged gear snaps into mesh
pub const SNAP_TOLERANCE: f64 = 30.0;

/// Driver speed at 1x, in revolutions per second (9 RPM)
pub const BASE_ROTATION_SPEED: f64 = 0.15;

/// Relative speed mismatch tolerated on a redundant mesh edge before locking
pub const SPEED_TOLERANCE_RATIO: f64 = 0.01;

/// Absolute floor on the speed mismatch tolerance (zero-velocity loops)
pub const SPEED_TOLERANCE_FLOOR: f64 = 1e-4;

/// Load contributed per unit of radius by every driven gear
pub const GEAR_LOAD_FACTOR: f64 = 0.5;

/// Fixed load contributed by every output attached to the driven train
pub const OUTPUT_LOAD: f64 = 20.0;

/// Driver power per unit of driver radius
pub const DRIVER_POWER_FACTOR: f64 = 2.0;

/// Outputs attach to a gear whose center is closer than radius + this margin
pub const OUTPUT_ATTACH_MARGIN: f64 = 30.0;

/// Pointer slack around a gear rim for hit testing
pub const GEAR_HIT_MARGIN: f64 = 8.0;

/// Allowed range of the spin speed multiplier
pub const MIN_SPIN_SPEED: f64 = 0.1;
pub const MAX_SPIN_SPEED: f64 = 5.0;

/// Palette new gears draw from when no color is given
pub const GEAR_COLORS: [&str; 8] = [
    "#6c5ce7", "#a855f7", "#3498db", "#1abc9c", "#e74c3c", "#f39c12", "#e91e63", "#00bcd4",
];
