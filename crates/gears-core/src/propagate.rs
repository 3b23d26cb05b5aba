//! Speed propagation with kinematic conflict (lock) detection.

use std::collections::{BTreeSet, VecDeque};

use crate::constants::{SPEED_TOLERANCE_FLOOR, SPEED_TOLERANCE_RATIO};
use crate::gear::{Gear, GearId};
use crate::mesh::MeshGraph;

/// Outcome of the last propagation. Derived state, never persisted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LockState {
    pub locked: bool,
    pub locked_gears: BTreeSet<GearId>,
}

impl LockState {
    pub fn unlocked() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &GearId) -> bool {
        self.locked_gears.contains(id)
    }
}

/// Velocity a meshed child must have when `parent` turns at `parent_speed`.
/// Meshed gears counter-rotate; the smaller gear spins faster.
pub fn meshed_speed(parent: &Gear, child: &Gear, parent_speed: f64) -> f64 {
    -parent_speed * parent.ratio_to(child)
}

/// True when a redundant edge demands a speed incompatible with the one
/// already assigned.
pub fn speeds_conflict(existing: f64, expected: f64) -> bool {
    let tolerance = existing.abs() * SPEED_TOLERANCE_RATIO + SPEED_TOLERANCE_FLOOR;
    (existing - expected).abs() > tolerance
}

/// Recompute every gear's `rotation_speed` from the driver by BFS.
///
/// All non-driver speeds are reset first, so gears not connected to the
/// driver end at zero. Any conflicting loop locks the whole system and forces
/// every speed, the driver's included, to zero.
pub fn propagate_speeds(
    gears: &mut [Gear],
    graph: &MeshGraph,
    driver: usize,
    driver_velocity: f64,
) -> LockState {
    let mut lock = LockState::unlocked();
    if driver >= gears.len() {
        return lock;
    }

    for (i, gear) in gears.iter_mut().enumerate() {
        if i != driver {
            gear.rotation_speed = 0.0;
        }
    }
    gears[driver].rotation_speed = driver_velocity;

    let mut assigned: Vec<Option<f64>> = vec![None; gears.len()];
    assigned[driver] = Some(driver_velocity);
    let mut queue = VecDeque::from([driver]);

    while let Some(current) = queue.pop_front() {
        let current_speed = gears[current].rotation_speed;
        for &next in graph.neighbors(current) {
            let expected = meshed_speed(&gears[current], &gears[next], current_speed);
            match assigned[next] {
                Some(existing) => {
                    if speeds_conflict(existing, expected) {
                        lock.locked = true;
                        lock.locked_gears.insert(gears[current].id.clone());
                        lock.locked_gears.insert(gears[next].id.clone());
                    }
                }
                None => {
                    gears[next].rotation_speed = expected;
                    assigned[next] = Some(expected);
                    queue.push_back(next);
                }
            }
        }
    }

    if lock.locked {
        for gear in gears.iter_mut() {
            gear.rotation_speed = 0.0;
        }
    }

    lock
}

/// Zero every speed. Used when no driver is set.
pub fn stop_all(gears: &mut [Gear]) {
    for gear in gears.iter_mut() {
        gear.rotation_speed = 0.0;
    }
}
