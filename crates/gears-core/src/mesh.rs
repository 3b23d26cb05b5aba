//! Mesh detection and the gear-train graph.
//!
//! Meshing is decided purely from geometry: two gears mesh when their center
//! distance is within `MESH_TOLERANCE` of the sum of their pitch radii. The
//! graph is always rebuilt from scratch, never patched.

use std::collections::{HashMap, VecDeque};
use std::f64::consts::PI;

use crate::angle::{contact_angle, normalize_angle};
use crate::constants::{MESH_TOLERANCE, SNAP_TOLERANCE};
use crate::gear::{Gear, GearId};

/// Absolute error between center distance and the ideal mesh distance.
fn mesh_error(a: &Gear, b: &Gear) -> f64 {
    let dist = a.position.distance(b.position);
    (dist - (a.radius() + b.radius())).abs()
}

/// True iff the two gears are in tooth contact.
pub fn detect_meshing(a: &Gear, b: &Gear) -> bool {
    mesh_error(a, b) < MESH_TOLERANCE
}

/// True iff a dragged gear is close enough to `target` to snap into mesh.
pub fn can_approach(a: &Gear, b: &Gear) -> bool {
    mesh_error(a, b) < SNAP_TOLERANCE
}

/// Adjacency list over gear indices, derived from `Gear::meshing_with`.
#[derive(Clone, Debug, Default)]
pub struct MeshGraph {
    index: HashMap<GearId, usize>,
    adjacency: Vec<Vec<usize>>,
}

impl MeshGraph {
    /// Build from the gears' current `meshing_with` lists.
    /// Edges to unknown ids are skipped.
    pub fn from_gears(gears: &[Gear]) -> Self {
        let index: HashMap<GearId, usize> = gears
            .iter()
            .enumerate()
            .map(|(i, g)| (g.id.clone(), i))
            .collect();

        let adjacency = gears
            .iter()
            .map(|g| {
                g.meshing_with
                    .iter()
                    .filter_map(|id| index.get(id).copied())
                    .collect()
            })
            .collect();

        Self { index, adjacency }
    }

    pub fn index_of(&self, id: &GearId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn neighbors(&self, idx: usize) -> &[usize] {
        self.adjacency.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Every gear index reachable from `root`, in BFS order (root first).
    pub fn reachable(&self, root: usize) -> Vec<usize> {
        if root >= self.adjacency.len() {
            return Vec::new();
        }
        let mut visited = vec![false; self.adjacency.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::from([root]);
        visited[root] = true;

        while let Some(current) = queue.pop_front() {
            order.push(current);
            for &next in self.neighbors(current) {
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }
        order
    }
}

/// Clear and recompute every gear's `meshing_with` by testing all unordered
/// pairs, then return the graph over the new edges. O(n²) in the gear count.
pub fn rebuild_adjacency(gears: &mut [Gear]) -> MeshGraph {
    for gear in gears.iter_mut() {
        gear.meshing_with.clear();
    }

    for i in 0..gears.len() {
        for j in (i + 1)..gears.len() {
            if detect_meshing(&gears[i], &gears[j]) {
                let (id_i, id_j) = (gears[i].id.clone(), gears[j].id.clone());
                gears[i].meshing_with.push(id_j);
                gears[j].meshing_with.push(id_i);
            }
        }
    }

    MeshGraph::from_gears(gears)
}

/// Rotate `moving` so the center of one of its valleys faces the contact
/// point with `target`.
pub fn align_teeth_for_meshing(moving: &mut Gear, target: &Gear) {
    let contact_from_moving = contact_angle(target.position, moving.position) + PI;
    let half_pitch = moving.angular_pitch() / 2.0;
    let gap_error = normalize_angle(moving.rotation + half_pitch - contact_from_moving);
    moving.rotation = normalize_angle(moving.rotation - gap_error);
}

/// Place `moving` at exact mesh distance from `target`, keeping its current
/// bearing, and phase its teeth against `target`. The global graph is not
/// touched; a full rebuild must follow.
pub fn snap_to_mesh(moving: &mut Gear, target: &Gear) {
    let bearing = contact_angle(target.position, moving.position);
    let mesh_dist = moving.radius() + target.radius();
    moving.position = target.position.offset(bearing, mesh_dist);
    align_teeth_for_meshing(moving, target);
}

/// First gear (in sequence order, skipping `moving_idx`) that the moving gear
/// can snap against.
pub fn find_snap_target(gears: &[Gear], moving_idx: usize) -> Option<usize> {
    let moving = gears.get(moving_idx)?;
    gears
        .iter()
        .enumerate()
        .find(|(i, other)| *i != moving_idx && can_approach(moving, other))
        .map(|(i, _)| i)
}
