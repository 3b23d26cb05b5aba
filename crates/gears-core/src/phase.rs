//! Phase resolution: rotational offsets that make meshed teeth interlock.
//!
//! Only the BFS tree from the driver decides phases. A gear reachable along
//! two paths takes its phase from whichever edge reaches it first; the other
//! contact may then look misaligned.

use std::collections::VecDeque;
use std::f64::consts::PI;

use crate::angle::{angular_pitch, contact_angle, normalize_angle};
use crate::gear::Gear;
use crate::mesh::MeshGraph;

/// Phase offset for `child` so that a valley of `child` meets a tooth of
/// `parent` at their contact point. Result lies in (-π, π].
pub fn mesh_phase_offset(parent: &Gear, child: &Gear) -> f64 {
    let contact = contact_angle(parent.position, child.position);
    let contact_from_child = contact + PI;
    let child_pitch = angular_pitch(child.teeth_count());
    let ratio = parent.ratio_to(child);

    normalize_angle(contact_from_child - child_pitch / 2.0 + contact * ratio)
}

/// Assign `phase_offset` to every gear reachable from `driver`.
/// The driver gets 0; unreachable gears keep their previous offset.
pub fn resolve_phases(gears: &mut [Gear], graph: &MeshGraph, driver: usize) {
    if driver >= gears.len() {
        return;
    }
    gears[driver].phase_offset = 0.0;

    let mut visited = vec![false; gears.len()];
    visited[driver] = true;
    let mut queue = VecDeque::from([driver]);

    while let Some(current) = queue.pop_front() {
        for &next in graph.neighbors(current) {
            if visited[next] {
                continue;
            }
            let offset = mesh_phase_offset(&gears[current], &gears[next]);
            gears[next].phase_offset = offset;
            visited[next] = true;
            queue.push_back(next);
        }
    }
}
