//! Load estimation: a resistance-derived speed multiplier for the driver.

use crate::constants::{DRIVER_POWER_FACTOR, GEAR_LOAD_FACTOR, OUTPUT_LOAD};
use crate::gear::Gear;
use crate::mesh::MeshGraph;
use crate::output::Output;

/// Result of one load estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadReport {
    /// Driver speed multiplier in (0, 1]; 0 only when locked.
    pub multiplier: f64,
    /// Display load, 0..=100.
    pub percentage: f64,
    pub locked: bool,
}

impl LoadReport {
    /// No driver or nothing connected.
    pub fn idle() -> Self {
        Self {
            multiplier: 1.0,
            percentage: 0.0,
            locked: false,
        }
    }

    pub fn locked() -> Self {
        Self {
            multiplier: 0.0,
            percentage: 100.0,
            locked: true,
        }
    }
}

impl Default for LoadReport {
    fn default() -> Self {
        Self::idle()
    }
}

/// Estimate the load the driven subgraph puts on `driver`.
///
/// Every connected non-driver gear adds `radius * 0.5`, every output attached
/// to a connected gear adds 20. The multiplier follows
/// `power / (power + load)` with `power = 2 * driver radius`; the display
/// percentage is `min(100, load / power * 50)`.
pub fn estimate_load(
    gears: &[Gear],
    outputs: &[Output],
    graph: &MeshGraph,
    driver: usize,
    locked: bool,
) -> LoadReport {
    if locked {
        return LoadReport::locked();
    }
    let Some(driver_gear) = gears.get(driver) else {
        return LoadReport::idle();
    };

    let connected = graph.reachable(driver);
    let mut in_train = vec![false; gears.len()];
    let mut total_load = 0.0;
    for &idx in &connected {
        in_train[idx] = true;
        if idx != driver {
            total_load += gears[idx].radius() * GEAR_LOAD_FACTOR;
        }
    }

    let attached_outputs = outputs
        .iter()
        .filter_map(|o| o.attached_to_gear.as_ref())
        .filter_map(|id| graph.index_of(id))
        .filter(|&idx| in_train[idx])
        .count();
    total_load += attached_outputs as f64 * OUTPUT_LOAD;

    let driver_power = driver_gear.radius() * DRIVER_POWER_FACTOR;
    LoadReport {
        multiplier: driver_power / (driver_power + total_load),
        percentage: (total_load / driver_power * 50.0).min(100.0),
        locked: false,
    }
}
