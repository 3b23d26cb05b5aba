//! Planar gear-train kinematics engine.
//!
//! Spur gears placed on a 2-D plane mesh when their pitch circles touch.
//! One gear is the driver; the engine derives every other gear's speed,
//! direction and tooth phase from it, detects kinematic locks in
//! inconsistent loops, and estimates a load-dependent driver slowdown.
//!
//! Zero I/O. Rendering, persistence and input belong to callers.

pub mod angle;
pub mod color;
pub mod constants;
pub mod gear;
pub mod load;
pub mod mesh;
pub mod output;
pub mod phase;
pub mod project;
pub mod propagate;
pub mod settings;
pub mod sync;
pub mod system;

pub use angle::{Point, angular_pitch, contact_angle, normalize_angle};
pub use color::Color;
pub use constants::{
    BASE_ROTATION_SPEED, GEAR_COLORS, MAX_TEETH, MESH_TOLERANCE, MIN_TEETH, MODULE_SIZE,
    SNAP_TOLERANCE,
};
pub use gear::{AttachedImage, Gear, GearId};
pub use load::{LoadReport, estimate_load};
pub use mesh::{MeshGraph, can_approach, detect_meshing, rebuild_adjacency};
pub use output::{Output, OutputId, OutputKind};
pub use phase::{mesh_phase_offset, resolve_phases};
pub use project::{CURRENT_VERSION, ProjectDocument, export_json, import_json};
pub use propagate::{LockState, propagate_speeds};
pub use settings::{Settings, SpinDirection};
pub use sync::synchronize_rotations;
pub use system::{GearSystem, SystemStatus};
