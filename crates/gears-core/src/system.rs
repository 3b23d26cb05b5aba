use std::f64::consts::TAU;

use rand::Rng;

use crate::angle::{Point, normalize_angle, pointer_angle};
use crate::color::Color;
use crate::constants::{MAX_SPIN_SPEED, MIN_SPIN_SPEED, OUTPUT_ATTACH_MARGIN};
use crate::gear::{AttachedImage, Gear, GearId};
use crate::load::{LoadReport, estimate_load};
use crate::mesh::{MeshGraph, find_snap_target, rebuild_adjacency, snap_to_mesh};
use crate::output::{Output, OutputId, OutputKind};
use crate::phase::resolve_phases;
use crate::propagate::{LockState, propagate_speeds, stop_all};
use crate::settings::{Settings, SpinDirection};
use crate::sync::synchronize_rotations;

/// System-level read surface for the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct SystemStatus {
    pub locked: bool,
    pub locked_gear_ids: Vec<GearId>,
    pub load_percentage: f64,
}

/// The single active gear train and everything derived from it.
///
/// All commands run to completion before returning: topology changes rebuild
/// the mesh graph, phases and speeds synchronously, so a caller never observes
/// a half-updated train. Commands that name a missing gear or output are
/// no-ops and report `false`/`None`.
#[derive(Clone, Debug)]
pub struct GearSystem {
    settings: Settings,
    gears: Vec<Gear>,
    outputs: Vec<Output>,
    driver: Option<GearId>,
    selected_gear: Option<GearId>,
    selected_output: Option<OutputId>,

    graph: MeshGraph,
    lock: LockState,
    load: LoadReport,
    playing: bool,
    dirty: bool,
}

impl Default for GearSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl GearSystem {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: settings.sanitized(),
            gears: Vec::new(),
            outputs: Vec::new(),
            driver: None,
            selected_gear: None,
            selected_output: None,
            graph: MeshGraph::default(),
            lock: LockState::unlocked(),
            load: LoadReport::idle(),
            playing: false,
            dirty: false,
        }
    }

    /// Rebuild a system from stored parts. Derived state (meshing, speeds,
    /// lock) is recomputed; references to missing gears are dropped.
    pub fn restore(
        settings: Settings,
        gears: Vec<Gear>,
        outputs: Vec<Output>,
        driver: Option<GearId>,
    ) -> Self {
        let mut sys = Self::with_settings(settings);
        sys.gears = gears;
        sys.outputs = outputs;
        for gear in &mut sys.gears {
            gear.rotation_speed = 0.0;
            gear.meshing_with.clear();
        }
        sys.driver = driver.filter(|id| sys.gears.iter().any(|g| &g.id == id));
        for output in &mut sys.outputs {
            if let Some(id) = &output.attached_to_gear
                && !sys.gears.iter().any(|g| &g.id == id)
            {
                output.attached_to_gear = None;
            }
        }
        sys.rebuild();
        sys.dirty = false;
        sys
    }

    // --- Read surface ---

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn gears(&self) -> &[Gear] {
        &self.gears
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn gear(&self, id: &GearId) -> Option<&Gear> {
        self.gears.iter().find(|g| &g.id == id)
    }

    pub fn output(&self, id: &OutputId) -> Option<&Output> {
        self.outputs.iter().find(|o| &o.id == id)
    }

    pub fn driver_id(&self) -> Option<&GearId> {
        self.driver.as_ref()
    }

    pub fn driver(&self) -> Option<&Gear> {
        self.driver_index().map(|i| &self.gears[i])
    }

    pub fn graph(&self) -> &MeshGraph {
        &self.graph
    }

    pub fn lock(&self) -> &LockState {
        &self.lock
    }

    pub fn is_locked(&self) -> bool {
        self.lock.locked
    }

    pub fn last_load(&self) -> LoadReport {
        self.load
    }

    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            locked: self.lock.locked,
            locked_gear_ids: self.lock.locked_gears.iter().cloned().collect(),
            load_percentage: self.load.percentage,
        }
    }

    pub fn selected_gear(&self) -> Option<&GearId> {
        self.selected_gear.as_ref()
    }

    pub fn selected_output(&self) -> Option<&OutputId> {
        self.selected_output.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    // --- Internals ---

    fn gear_index(&self, id: &GearId) -> Option<usize> {
        self.gears.iter().position(|g| &g.id == id)
    }

    fn output_index(&self, id: &OutputId) -> Option<usize> {
        self.outputs.iter().position(|o| &o.id == id)
    }

    fn driver_index(&self) -> Option<usize> {
        self.driver.as_ref().and_then(|id| self.gear_index(id))
    }

    /// Mesh detection, then phases and speeds from the driver.
    pub fn rebuild(&mut self) {
        self.graph = rebuild_adjacency(&mut self.gears);
        self.refresh_kinematics();
        self.mirror_outputs();
    }

    /// Phases and speeds over the current graph, without re-detecting meshes.
    fn refresh_kinematics(&mut self) {
        match self.driver_index() {
            Some(driver) => {
                resolve_phases(&mut self.gears, &self.graph, driver);
                self.propagate();
            }
            None => {
                stop_all(&mut self.gears);
                self.lock = LockState::unlocked();
                self.load = LoadReport::idle();
            }
        }
    }

    /// Speed propagation and load from the current driver.
    fn propagate(&mut self) {
        let Some(driver) = self.driver_index() else {
            return;
        };
        self.lock = propagate_speeds(
            &mut self.gears,
            &self.graph,
            driver,
            self.settings.driver_velocity(),
        );
        self.load = estimate_load(
            &self.gears,
            &self.outputs,
            &self.graph,
            driver,
            self.lock.locked,
        );
    }

    /// Copy rotation and position from each output's gear, by id lookup.
    fn mirror_outputs(&mut self) {
        for output in &mut self.outputs {
            let Some(id) = &output.attached_to_gear else {
                continue;
            };
            if let Some(gear) = self.gears.iter().find(|g| &g.id == id) {
                output.rotation = gear.rotation;
                output.position = gear.position;
            }
        }
    }

    /// Nearest gear whose center lies within its radius plus the attach margin.
    fn nearest_attachable_gear(&self, p: Point) -> Option<usize> {
        self.gears
            .iter()
            .enumerate()
            .map(|(i, g)| (i, g.position.distance(p), g.radius()))
            .filter(|&(_, dist, radius)| dist < radius + OUTPUT_ATTACH_MARGIN)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _, _)| i)
    }

    // --- Gear commands ---

    /// Place a new gear. Without a color one is drawn from the palette.
    pub fn create_gear(
        &mut self,
        x: f64,
        y: f64,
        teeth: u32,
        color: Option<Color>,
        rng: &mut impl Rng,
    ) -> GearId {
        let color = color.unwrap_or_else(|| Color::random(rng));
        let gear = Gear::new(GearId::generate(), Point::new(x, y), teeth, color);
        let id = gear.id.clone();
        self.gears.push(gear);
        self.dirty = true;
        self.rebuild();
        id
    }

    /// Remove a gear. Outputs referencing it are detached in place; driver
    /// and selection are cleared if they pointed at it.
    pub fn delete_gear(&mut self, id: &GearId) -> bool {
        let Some(idx) = self.gear_index(id) else {
            return false;
        };
        self.gears.remove(idx);

        for output in &mut self.outputs {
            if output.is_attached_to(id) {
                output.attached_to_gear = None;
            }
        }
        if self.driver.as_ref() == Some(id) {
            self.driver = None;
        }
        if self.selected_gear.as_ref() == Some(id) {
            self.selected_gear = None;
        }

        self.dirty = true;
        self.rebuild();
        true
    }

    pub fn update_gear_teeth(&mut self, id: &GearId, teeth: u32) -> bool {
        let Some(idx) = self.gear_index(id) else {
            return false;
        };
        self.gears[idx].set_teeth_count(teeth);
        self.dirty = true;
        self.rebuild();
        true
    }

    pub fn update_gear_color(&mut self, id: &GearId, color: Color) -> bool {
        let Some(idx) = self.gear_index(id) else {
            return false;
        };
        self.gears[idx].color = color;
        self.dirty = true;
        true
    }

    /// Move a gear and rebuild immediately.
    pub fn move_gear(&mut self, id: &GearId, x: f64, y: f64) -> bool {
        let Some(idx) = self.gear_index(id) else {
            return false;
        };
        self.gears[idx].position = Point::new(x, y);
        self.dirty = true;
        self.rebuild();
        true
    }

    /// Intermediate drag position: grid snap, then snap into mesh with the
    /// first gear close enough. The graph is rebuilt by `end_drag`.
    pub fn drag_gear(&mut self, id: &GearId, x: f64, y: f64) -> bool {
        let Some(idx) = self.gear_index(id) else {
            return false;
        };
        self.gears[idx].position = self.settings.snap_to_grid(Point::new(x, y));

        if let Some(target_idx) = find_snap_target(&self.gears, idx) {
            let target = self.gears[target_idx].clone();
            snap_to_mesh(&mut self.gears[idx], &target);
        }
        true
    }

    /// Finish a batched gear drag.
    pub fn end_drag(&mut self) {
        self.dirty = true;
        self.rebuild();
    }

    pub fn set_attached_image(&mut self, id: &GearId, url: &str) -> bool {
        let Some(idx) = self.gear_index(id) else {
            return false;
        };
        if url.trim().is_empty() {
            return false;
        }
        self.gears[idx].attached_image = Some(AttachedImage::new(url.trim()));
        self.dirty = true;
        true
    }

    pub fn update_attached_image(
        &mut self,
        id: &GearId,
        offset_x: f64,
        offset_y: f64,
        scale: f64,
    ) -> bool {
        let Some(image) = self
            .gear_index(id)
            .and_then(|idx| self.gears[idx].attached_image.as_mut())
        else {
            return false;
        };
        image.offset_x = offset_x;
        image.offset_y = offset_y;
        image.scale = scale;
        self.dirty = true;
        true
    }

    pub fn remove_attached_image(&mut self, id: &GearId) -> bool {
        let Some(idx) = self.gear_index(id) else {
            return false;
        };
        let removed = self.gears[idx].attached_image.take().is_some();
        self.dirty |= removed;
        removed
    }

    // --- Driver and spin ---

    /// Make `id` the driver: reset all speeds, then phase and propagate from it.
    pub fn set_driver_gear(&mut self, id: &GearId) -> bool {
        if self.gear_index(id).is_none() {
            return false;
        }
        self.driver = Some(id.clone());
        stop_all(&mut self.gears);
        self.refresh_kinematics();
        self.dirty = true;
        true
    }

    pub fn clear_driver(&mut self) {
        if self.driver.take().is_some() {
            self.dirty = true;
        }
        self.refresh_kinematics();
    }

    /// Set `id` as driver, or clear the driver if `id` already is one.
    pub fn toggle_driver(&mut self, id: &GearId) -> bool {
        if self.driver.as_ref() == Some(id) {
            self.clear_driver();
            true
        } else {
            self.set_driver_gear(id)
        }
    }

    pub fn set_spin_speed(&mut self, speed: f64) {
        if !speed.is_finite() {
            return;
        }
        self.settings.spin_speed = speed.clamp(MIN_SPIN_SPEED, MAX_SPIN_SPEED);
        self.dirty = true;
        self.propagate();
    }

    pub fn set_spin_direction(&mut self, direction: SpinDirection) {
        self.settings.spin_direction = direction;
        self.dirty = true;
        self.propagate();
    }

    pub fn toggle_direction(&mut self) -> SpinDirection {
        let next = self.settings.spin_direction.reversed();
        self.set_spin_direction(next);
        next
    }

    pub fn set_grid(&mut self, snap: bool, size: f64) {
        self.settings.grid_snap = snap;
        if size.is_finite() && size > 0.0 {
            self.settings.grid_size = size;
        }
        self.dirty = true;
    }

    /// Render-only tooth geometry; clamped like loaded settings.
    pub fn set_tooth_geometry(&mut self, thickness: f64, depth: f64) {
        self.settings.tooth_thickness = thickness;
        self.settings.tooth_depth = depth;
        self.settings = self.settings.clone().sanitized();
        self.dirty = true;
    }

    pub fn set_background_color(&mut self, color: Color) {
        self.settings.background_color = color;
        self.dirty = true;
    }

    // --- Outputs ---

    /// Place an output, attaching it to the nearest gear within reach.
    pub fn create_output(&mut self, kind: OutputKind, x: f64, y: f64) -> OutputId {
        let output = Output::new(OutputId::generate(), kind, Point::new(x, y));
        let id = output.id.clone();
        self.outputs.push(output);
        self.attach_output(self.outputs.len() - 1);
        self.dirty = true;
        self.propagate();
        id
    }

    fn attach_output(&mut self, out_idx: usize) -> Option<GearId> {
        let gear_idx = self.nearest_attachable_gear(self.outputs[out_idx].position)?;
        let gear = &self.gears[gear_idx];
        let output = &mut self.outputs[out_idx];
        output.attached_to_gear = Some(gear.id.clone());
        output.position = gear.position;
        output.rotation = gear.rotation;
        Some(gear.id.clone())
    }

    /// Move an output while dragging. It is detached until dropped.
    pub fn drag_output(&mut self, id: &OutputId, x: f64, y: f64) -> bool {
        let Some(idx) = self.output_index(id) else {
            return false;
        };
        let output = &mut self.outputs[idx];
        output.position = self.settings.snap_to_grid(Point::new(x, y));
        output.attached_to_gear = None;
        true
    }

    /// Drop a dragged output; returns the gear it attached to, if any.
    pub fn drop_output(&mut self, id: &OutputId) -> Option<GearId> {
        let idx = self.output_index(id)?;
        let attached = self.attach_output(idx);
        self.dirty = true;
        self.propagate();
        attached
    }

    pub fn delete_output(&mut self, id: &OutputId) -> bool {
        let Some(idx) = self.output_index(id) else {
            return false;
        };
        self.outputs.remove(idx);
        if self.selected_output.as_ref() == Some(id) {
            self.selected_output = None;
        }
        self.dirty = true;
        self.propagate();
        true
    }

    // --- Playback ---

    /// Start playback. With no driver set, the first gear becomes the driver.
    pub fn play(&mut self) {
        if self.driver.is_none()
            && let Some(first) = self.gears.first().map(|g| g.id.clone())
        {
            self.set_driver_gear(&first);
        }
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn toggle_play(&mut self) -> bool {
        if self.playing {
            self.stop();
        } else {
            self.play();
        }
        self.playing
    }

    /// One animation frame if playing; `None` when stopped.
    pub fn tick(&mut self, dt: f64) -> Option<LoadReport> {
        if !self.playing {
            return None;
        }
        Some(self.advance(dt))
    }

    /// One frame regardless of playback state: load, driver rotation,
    /// synchronization, output mirroring. `dt` is in seconds.
    pub fn advance(&mut self, dt: f64) -> LoadReport {
        let Some(driver) = self.driver_index() else {
            self.mirror_outputs();
            return LoadReport::idle();
        };

        let load = estimate_load(
            &self.gears,
            &self.outputs,
            &self.graph,
            driver,
            self.lock.locked,
        );
        self.load = load;

        if !load.locked {
            let speed = self.settings.driver_velocity() * load.multiplier;
            let gear = &mut self.gears[driver];
            gear.rotation_speed = speed;
            gear.rotation += speed * dt * TAU;
            synchronize_rotations(&mut self.gears, &self.graph, driver);
        }

        self.mirror_outputs();
        load
    }

    /// Manual drive: turn the driver by `delta` radians and carry the train
    /// along. Refused while playing or locked.
    pub fn spin_driver(&mut self, delta: f64) -> bool {
        if self.playing || self.lock.locked {
            return false;
        }
        let Some(driver) = self.driver_index() else {
            return false;
        };
        self.gears[driver].rotation += delta;
        synchronize_rotations(&mut self.gears, &self.graph, driver);
        self.mirror_outputs();
        self.dirty = true;
        true
    }

    /// Manual drive from a pointer gesture moving from `from` to `to`.
    pub fn spin_driver_from_pointer(&mut self, from: Point, to: Point) -> bool {
        let Some(center) = self.driver().map(|g| g.position) else {
            return false;
        };
        let start = pointer_angle(center, from.x, from.y);
        let end = pointer_angle(center, to.x, to.y);
        self.spin_driver(normalize_angle(end - start))
    }

    pub fn reset_rotations(&mut self) {
        for gear in &mut self.gears {
            gear.rotation = 0.0;
        }
        for output in &mut self.outputs {
            output.rotation = 0.0;
        }
        self.dirty = true;
    }

    /// Remove every gear and output.
    pub fn clear_all(&mut self) {
        if self.gears.is_empty() && self.outputs.is_empty() {
            return;
        }
        self.gears.clear();
        self.outputs.clear();
        self.driver = None;
        self.selected_gear = None;
        self.selected_output = None;
        self.dirty = true;
        self.rebuild();
    }

    // --- Picking and selection ---

    /// Topmost (last placed) gear under the pointer.
    pub fn hit_test_gear(&self, x: f64, y: f64) -> Option<&GearId> {
        let p = Point::new(x, y);
        self.gears.iter().rev().find(|g| g.contains(p)).map(|g| &g.id)
    }

    /// Topmost output under the pointer.
    pub fn hit_test_output(&self, x: f64, y: f64) -> Option<&OutputId> {
        let p = Point::new(x, y);
        self.outputs.iter().rev().find(|o| o.contains(p)).map(|o| &o.id)
    }

    pub fn select_gear(&mut self, id: &GearId) -> bool {
        if self.gear_index(id).is_none() {
            return false;
        }
        self.selected_gear = Some(id.clone());
        self.selected_output = None;
        true
    }

    pub fn select_output(&mut self, id: &OutputId) -> bool {
        if self.output_index(id).is_none() {
            return false;
        }
        self.selected_output = Some(id.clone());
        self.selected_gear = None;
        true
    }

    pub fn deselect(&mut self) {
        self.selected_gear = None;
        self.selected_output = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BASE_ROTATION_SPEED;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    /// Driver (24 teeth) at origin meshed with a 12-tooth gear.
    fn two_gear_system() -> (GearSystem, GearId, GearId) {
        let mut rng = rng();
        let mut sys = GearSystem::new();
        let d = sys.create_gear(0.0, 0.0, 24, None, &mut rng);
        let c = sys.create_gear(90.0, 0.0, 12, None, &mut rng);
        assert!(sys.set_driver_gear(&d));
        (sys, d, c)
    }

    #[test]
    fn test_create_gear_meshes() {
        let (sys, d, c) = two_gear_system();
        assert!(sys.gear(&d).unwrap().is_meshed_with(&c));
        assert!(sys.gear(&c).unwrap().is_meshed_with(&d));
        assert!(sys.has_unsaved_changes());
    }

    #[test]
    fn test_driver_speed_propagated() {
        let (sys, d, c) = two_gear_system();
        assert!((sys.gear(&d).unwrap().rotation_speed - BASE_ROTATION_SPEED).abs() < 1e-12);
        assert!((sys.gear(&c).unwrap().rotation_speed + 2.0 * BASE_ROTATION_SPEED).abs() < 1e-12);
    }

    #[test]
    fn test_missing_references_are_noops() {
        let (mut sys, _, _) = two_gear_system();
        let ghost = GearId::from("ghost");
        assert!(!sys.delete_gear(&ghost));
        assert!(!sys.move_gear(&ghost, 1.0, 1.0));
        assert!(!sys.update_gear_teeth(&ghost, 20));
        assert!(!sys.set_driver_gear(&ghost));
        assert!(!sys.delete_output(&OutputId::from("nope")));
        assert_eq!(sys.gears().len(), 2);
    }

    #[test]
    fn test_delete_driver_stops_train() {
        let (mut sys, d, c) = two_gear_system();
        let out = sys.create_output(OutputKind::Fan, 0.0, 0.0);
        assert_eq!(sys.output(&out).unwrap().attached_to_gear, Some(d.clone()));

        assert!(sys.delete_gear(&d));
        assert!(sys.driver_id().is_none());
        assert_eq!(sys.gear(&c).unwrap().rotation_speed, 0.0);
        // Output is detached, not deleted
        assert!(sys.output(&out).unwrap().attached_to_gear.is_none());
    }

    #[test]
    fn test_update_teeth_rebuilds_mesh() {
        let (mut sys, d, c) = two_gear_system();
        // 24 -> 8 teeth: radius 20, mesh distance 50 vs center distance 90
        assert!(sys.update_gear_teeth(&d, 8));
        assert!(!sys.gear(&c).unwrap().is_meshed_with(&d));
        assert_eq!(sys.gear(&c).unwrap().rotation_speed, 0.0);
    }

    #[test]
    fn test_drag_snaps_then_end_drag_rebuilds() {
        let mut rng = rng();
        let mut sys = GearSystem::new();
        let a = sys.create_gear(0.0, 0.0, 12, None, &mut rng);
        let b = sys.create_gear(400.0, 0.0, 12, None, &mut rng);

        // 80 is within snap tolerance of the 60 mesh distance
        assert!(sys.drag_gear(&b, 80.0, 0.0));
        let pos = sys.gear(&b).unwrap().position;
        assert!((pos.x - 60.0).abs() < 1e-9 && pos.y.abs() < 1e-9);
        assert!(sys.gear(&b).unwrap().meshing_with.is_empty());

        sys.end_drag();
        assert!(sys.gear(&b).unwrap().is_meshed_with(&a));
    }

    #[test]
    fn test_advance_rotates_driver_and_outputs() {
        let (mut sys, d, c) = two_gear_system();
        let out = sys.create_output(OutputKind::Clock, 95.0, 5.0);
        assert_eq!(sys.output(&out).unwrap().attached_to_gear, Some(c.clone()));

        let load = sys.advance(0.5);
        assert!(load.multiplier < 1.0 && load.multiplier > 0.0);
        let driver = sys.gear(&d).unwrap();
        let expected = BASE_ROTATION_SPEED * load.multiplier * 0.5 * TAU;
        assert!((driver.rotation - expected).abs() < 1e-12);

        let child = sys.gear(&c).unwrap();
        assert_eq!(sys.output(&out).unwrap().rotation, child.rotation);
        assert_eq!(sys.output(&out).unwrap().position, child.position);
    }

    #[test]
    fn test_tick_only_when_playing() {
        let (mut sys, d, _) = two_gear_system();
        assert!(sys.tick(0.1).is_none());
        assert_eq!(sys.gear(&d).unwrap().rotation, 0.0);
        sys.play();
        assert!(sys.tick(0.1).is_some());
        assert!(sys.gear(&d).unwrap().rotation > 0.0);
    }

    #[test]
    fn test_play_picks_first_gear_as_driver() {
        let mut rng = rng();
        let mut sys = GearSystem::new();
        let first = sys.create_gear(0.0, 0.0, 12, None, &mut rng);
        sys.create_gear(60.0, 0.0, 12, None, &mut rng);
        assert!(sys.toggle_play());
        assert_eq!(sys.driver_id(), Some(&first));
        assert!(!sys.toggle_play());
    }

    #[test]
    fn test_toggle_driver_off_zeroes_speeds() {
        let (mut sys, d, c) = two_gear_system();
        assert!(sys.toggle_driver(&d));
        assert!(sys.driver_id().is_none());
        assert_eq!(sys.gear(&d).unwrap().rotation_speed, 0.0);
        assert_eq!(sys.gear(&c).unwrap().rotation_speed, 0.0);
    }

    #[test]
    fn test_toggle_direction_reverses_speeds() {
        let (mut sys, _, c) = two_gear_system();
        let before = sys.gear(&c).unwrap().rotation_speed;
        assert_eq!(sys.toggle_direction(), SpinDirection::CounterClockwise);
        assert!((sys.gear(&c).unwrap().rotation_speed + before).abs() < 1e-12);
    }

    #[test]
    fn test_manual_spin() {
        let (mut sys, d, c) = two_gear_system();
        assert!(sys.spin_driver(0.25));
        assert_eq!(sys.gear(&d).unwrap().rotation, 0.25);
        let child = sys.gear(&c).unwrap();
        assert!((child.rotation - (-(0.25 * 2.0) + child.phase_offset)).abs() < 1e-12);

        sys.play();
        assert!(!sys.spin_driver(0.25));
    }

    #[test]
    fn test_spin_from_pointer() {
        let (mut sys, d, _) = two_gear_system();
        assert!(sys.spin_driver_from_pointer(Point::new(10.0, 0.0), Point::new(0.0, 10.0)));
        assert!((sys.gear(&d).unwrap().rotation - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_locked_system_freezes() {
        let mut rng = rng();
        let mut sys = GearSystem::new();
        let h = (62.5f64 * 62.5 - 30.0 * 30.0).sqrt();
        let a = sys.create_gear(0.0, 0.0, 12, None, &mut rng);
        sys.create_gear(60.0, 0.0, 12, None, &mut rng);
        sys.create_gear(30.0, h, 13, None, &mut rng);
        sys.set_driver_gear(&a);

        assert!(sys.is_locked());
        let status = sys.status();
        assert!(status.locked);
        assert_eq!(status.load_percentage, 100.0);
        assert!(!status.locked_gear_ids.is_empty());

        let load = sys.advance(1.0);
        assert!(load.locked);
        assert!(sys.gears().iter().all(|g| g.rotation == 0.0));
        assert!(!sys.spin_driver(1.0));
    }

    #[test]
    fn test_output_drag_and_drop() {
        let (mut sys, d, c) = two_gear_system();
        let out = sys.create_output(OutputKind::Platform, 500.0, 500.0);
        assert!(sys.output(&out).unwrap().attached_to_gear.is_none());

        assert!(sys.drag_output(&out, 88.0, 3.0));
        assert_eq!(sys.drop_output(&out), Some(c.clone()));
        assert_eq!(sys.output(&out).unwrap().position, sys.gear(&c).unwrap().position);

        assert!(sys.drag_output(&out, 0.0, 0.0));
        assert!(sys.output(&out).unwrap().attached_to_gear.is_none());
        assert_eq!(sys.drop_output(&out), Some(d));
    }

    #[test]
    fn test_hit_tests_topmost() {
        let mut rng = rng();
        let mut sys = GearSystem::new();
        sys.create_gear(0.0, 0.0, 20, None, &mut rng);
        let top = sys.create_gear(10.0, 0.0, 20, None, &mut rng);
        assert_eq!(sys.hit_test_gear(5.0, 0.0), Some(&top));
        assert!(sys.hit_test_gear(900.0, 0.0).is_none());

        let out = sys.create_output(OutputKind::Fan, 0.0, 0.0);
        assert_eq!(sys.hit_test_output(30.0, 0.0), Some(&out));
    }

    #[test]
    fn test_selection_and_delete() {
        let (mut sys, d, _) = two_gear_system();
        assert!(sys.select_gear(&d));
        assert!(sys.delete_gear(&d));
        assert!(sys.selected_gear().is_none());
    }

    #[test]
    fn test_set_grid_ignores_bad_size() {
        let mut sys = GearSystem::new();
        sys.set_grid(false, 25.0);
        assert!(!sys.settings().grid_snap);
        assert_eq!(sys.settings().grid_size, 25.0);
        assert!(sys.has_unsaved_changes());

        sys.set_grid(true, 0.0);
        sys.set_grid(true, -4.0);
        sys.set_grid(true, f64::NAN);
        assert!(sys.settings().grid_snap);
        assert_eq!(sys.settings().grid_size, 25.0);
    }

    #[test]
    fn test_tooth_geometry_clamped() {
        let mut sys = GearSystem::new();
        sys.set_tooth_geometry(0.5, 10.0);
        assert_eq!(sys.settings().tooth_thickness, 0.5);
        assert_eq!(sys.settings().tooth_depth, 10.0);

        sys.set_tooth_geometry(2.0, 1.0);
        assert_eq!(sys.settings().tooth_thickness, 0.7);
        assert_eq!(sys.settings().tooth_depth, 4.0);

        sys.set_tooth_geometry(f64::INFINITY, 99.0);
        assert_eq!(sys.settings().tooth_thickness, 0.6);
        assert_eq!(sys.settings().tooth_depth, 14.0);
    }

    #[test]
    fn test_background_color_leaves_kinematics() {
        let (mut sys, _, c) = two_gear_system();
        let before = sys.gear(&c).unwrap().rotation_speed;
        sys.mark_clean();
        sys.set_background_color(Color::parse("#ffffff").unwrap());
        assert_eq!(sys.settings().background_color.as_str(), "#ffffff");
        assert!(sys.has_unsaved_changes());
        assert_eq!(sys.gear(&c).unwrap().rotation_speed, before);
    }

    #[test]
    fn test_last_load_tracks_tick() {
        let (mut sys, _, _) = two_gear_system();
        sys.play();
        let report = sys.tick(1.0 / 60.0).unwrap();
        assert_eq!(sys.last_load(), report);
        assert!(report.multiplier > 0.0 && report.multiplier <= 1.0);
        assert_eq!(sys.status().load_percentage, report.percentage);
    }

    #[test]
    fn test_output_selection_is_exclusive() {
        let (mut sys, _, c) = two_gear_system();
        let o = sys.create_output(OutputKind::Clock, 90.0, 0.0);
        assert!(sys.select_gear(&c));
        assert!(sys.select_output(&o));
        assert_eq!(sys.selected_output(), Some(&o));
        assert!(sys.selected_gear().is_none());

        assert!(!sys.select_output(&OutputId::from("output_missing")));
        assert!(sys.delete_output(&o));
        assert!(sys.selected_output().is_none());
    }

    #[test]
    fn test_attached_image_lifecycle() {
        let (mut sys, d, _) = two_gear_system();
        assert!(!sys.set_attached_image(&d, "  "));
        assert!(sys.set_attached_image(&d, "https://example.com/cat.png"));
        assert!(sys.update_attached_image(&d, 3.0, -2.0, 0.5));
        let img = sys.gear(&d).unwrap().attached_image.clone().unwrap();
        assert_eq!(img.scale, 0.5);
        assert!(sys.remove_attached_image(&d));
        assert!(!sys.remove_attached_image(&d));
    }

    #[test]
    fn test_clear_all_and_reset() {
        let (mut sys, _, _) = two_gear_system();
        sys.advance(1.0);
        sys.reset_rotations();
        assert!(sys.gears().iter().all(|g| g.rotation == 0.0));
        sys.clear_all();
        assert!(sys.gears().is_empty());
        assert!(sys.driver_id().is_none());
        assert_eq!(sys.graph().len(), 0);
    }

    #[test]
    fn test_spin_speed_clamped() {
        let (mut sys, d, _) = two_gear_system();
        sys.set_spin_speed(100.0);
        assert_eq!(sys.settings().spin_speed, MAX_SPIN_SPEED);
        assert!(
            (sys.gear(&d).unwrap().rotation_speed - MAX_SPIN_SPEED * BASE_ROTATION_SPEED).abs()
                < 1e-12
        );
    }
}
