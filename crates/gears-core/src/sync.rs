//! Per-tick rotation synchronization.
//!
//! Every driven gear's absolute angle is derived from its BFS parent's
//! current angle, never integrated from its own velocity, so tooth alignment
//! cannot drift over a long session.

use std::collections::VecDeque;

use crate::gear::Gear;
use crate::mesh::MeshGraph;

/// Propagate the driver's current `rotation` and `rotation_speed` to every
/// reachable gear. The driver itself is not modified.
pub fn synchronize_rotations(gears: &mut [Gear], graph: &MeshGraph, driver: usize) {
    if driver >= gears.len() {
        return;
    }
    let driver_speed = gears[driver].rotation_speed;

    let mut visited = vec![false; gears.len()];
    visited[driver] = true;
    // (gear index, cumulative signed ratio relative to the driver)
    let mut queue = VecDeque::from([(driver, 1.0_f64)]);

    while let Some((current, cumulative)) = queue.pop_front() {
        let parent_rotation = gears[current].rotation;
        for &next in graph.neighbors(current) {
            if visited[next] {
                continue;
            }
            let direct = gears[current].ratio_to(&gears[next]);
            let child_ratio = -cumulative * direct;

            let child = &mut gears[next];
            child.rotation = -(parent_rotation * direct) + child.phase_offset;
            child.rotation_speed = driver_speed * child_ratio;

            visited[next] = true;
            queue.push_back((next, child_ratio));
        }
    }
}
