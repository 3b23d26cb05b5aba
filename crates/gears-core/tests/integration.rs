//! Integration tests exercising the full engine through `GearSystem`:
//! place → mesh → drive → tick → export/import.

use gears_core::{GearId, GearSystem, MODULE_SIZE, OutputKind, export_json, import_json};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::SmallRng;

fn rng() -> SmallRng {
    SmallRng::seed_from_u64(42)
}

/// A driven chain of three gears plus a stray.
fn sample_train() -> (GearSystem, Vec<GearId>) {
    let mut rng = rng();
    let mut sys = GearSystem::new();
    let ids = vec![
        sys.create_gear(0.0, 0.0, 24, None, &mut rng),
        sys.create_gear(90.0, 0.0, 12, None, &mut rng),
        sys.create_gear(160.0, 0.0, 16, None, &mut rng),
        sys.create_gear(600.0, 600.0, 20, None, &mut rng),
    ];
    sys.set_driver_gear(&ids[0]);
    (sys, ids)
}

fn meshing_sets(sys: &GearSystem) -> Vec<Vec<GearId>> {
    sys.gears()
        .iter()
        .map(|g| {
            let mut m = g.meshing_with.clone();
            m.sort();
            m
        })
        .collect()
}

/// Test 1: Radius tracks teeth after every change.
#[test]
fn radius_follows_teeth_changes() {
    let (mut sys, ids) = sample_train();
    for teeth in [8, 13, 30, 48] {
        sys.update_gear_teeth(&ids[1], teeth);
        let g = sys.gear(&ids[1]).unwrap();
        assert_eq!(g.radius(), g.teeth_count() as f64 * MODULE_SIZE / 2.0);
    }
}

/// Test 2: Meshing is symmetric over a mixed layout.
#[test]
fn meshing_is_symmetric() {
    let (sys, _) = sample_train();
    for a in sys.gears() {
        for b in sys.gears() {
            assert_eq!(a.is_meshed_with(&b.id), b.is_meshed_with(&a.id));
        }
    }
}

/// Test 3: A 24 → 12 pair doubles speed and reverses direction.
#[test]
fn two_gear_ratio_exact() {
    let mut rng = rng();
    let mut sys = GearSystem::new();
    let d = sys.create_gear(0.0, 0.0, 24, None, &mut rng);
    let c = sys.create_gear(90.0, 0.0, 12, None, &mut rng);
    sys.set_driver_gear(&d);

    let ds = sys.gear(&d).unwrap().rotation_speed;
    let cs = sys.gear(&c).unwrap().rotation_speed;
    assert_eq!(cs, -2.0 * ds);
}

/// Test 4: An odd 12/12/13 triangle locks and stops every gear.
#[test]
fn odd_triangle_locks() {
    let mut rng = rng();
    let mut sys = GearSystem::new();
    let h = (62.5f64 * 62.5 - 30.0 * 30.0).sqrt();
    let a = sys.create_gear(0.0, 0.0, 12, None, &mut rng);
    sys.create_gear(60.0, 0.0, 12, None, &mut rng);
    sys.create_gear(30.0, h, 13, None, &mut rng);
    sys.set_driver_gear(&a);

    let status = sys.status();
    assert!(status.locked);
    assert!(sys.gears().iter().all(|g| g.rotation_speed == 0.0));

    // Moving the 13-tooth gear out of the loop releases the lock
    let c = sys.gears()[2].id.clone();
    sys.move_gear(&c, 30.0, 400.0);
    assert!(!sys.status().locked);
    assert!(sys.gear(&a).unwrap().rotation_speed != 0.0);
}

/// Test 5: Rebuilding twice with no change is idempotent.
#[test]
fn rebuild_is_idempotent() {
    let (mut sys, _) = sample_train();
    sys.rebuild();
    let meshes = meshing_sets(&sys);
    let phases: Vec<f64> = sys.gears().iter().map(|g| g.phase_offset).collect();
    sys.rebuild();
    assert_eq!(meshing_sets(&sys), meshes);
    let again: Vec<f64> = sys.gears().iter().map(|g| g.phase_offset).collect();
    assert_eq!(again, phases);
}

/// Test 6: Each attached output lowers the multiplier and raises the load.
#[test]
fn outputs_increase_load() {
    let (mut sys, ids) = sample_train();
    let mut last = sys.advance(0.0);
    for _ in 0..4 {
        let pos = sys.gear(&ids[2]).unwrap().position;
        sys.create_output(OutputKind::Fan, pos.x, pos.y);
        let next = sys.advance(0.0);
        assert!(next.multiplier <= last.multiplier);
        assert!(next.percentage >= last.percentage);
        last = next;
    }
    assert!(last.multiplier > 0.0 && last.multiplier < 1.0);
}

/// Test 7: Export then import reproduces authored state and meshing.
#[test]
fn project_roundtrip() {
    let (mut sys, _) = sample_train();
    sys.create_output(OutputKind::Clock, 95.0, 0.0);
    sys.advance(1.5);

    let json = export_json(&sys).unwrap();
    let loaded = import_json(&json).unwrap();

    assert_eq!(loaded.driver_id(), sys.driver_id());
    assert_eq!(meshing_sets(&loaded), meshing_sets(&sys));
    for (a, b) in sys.gears().iter().zip(loaded.gears()) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.position, b.position);
        assert_eq!(a.teeth_count(), b.teeth_count());
    }
}

/// Test 8: Deleting the driver clears it and stops the remaining gears.
#[test]
fn deleting_driver_stops_everything() {
    let (mut sys, ids) = sample_train();
    assert!(sys.gear(&ids[1]).unwrap().rotation_speed != 0.0);
    sys.delete_gear(&ids[0]);
    assert!(sys.driver_id().is_none());
    assert!(sys.gears().iter().all(|g| g.rotation_speed == 0.0));
}

/// Test 9: Driven teeth stay aligned after a long run.
#[test]
fn long_run_does_not_drift() {
    let (mut sys, ids) = sample_train();
    sys.play();
    for _ in 0..10_000 {
        sys.tick(1.0 / 60.0);
    }
    let driver = sys.gear(&ids[0]).unwrap().rotation;
    let child = sys.gear(&ids[1]).unwrap();
    let ratio = 24.0 / 12.0;
    assert!((child.rotation - (-(driver * ratio) + child.phase_offset)).abs() < 1e-9);
}

/// Test 10: Disconnected gears never move.
#[test]
fn stray_gear_stays_still() {
    let (mut sys, ids) = sample_train();
    sys.advance(3.0);
    let stray = sys.gear(&ids[3]).unwrap();
    assert_eq!(stray.rotation, 0.0);
    assert_eq!(stray.rotation_speed, 0.0);
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn meshing_symmetric_for_random_layouts(
        layout in prop::collection::vec((0.0f64..400.0, 0.0f64..400.0, 8u32..=48), 1..12),
    ) {
        let mut rng = rng();
        let mut sys = GearSystem::new();
        for (x, y, teeth) in layout {
            sys.create_gear(x, y, teeth, None, &mut rng);
        }
        for a in sys.gears() {
            for id in &a.meshing_with {
                let b = sys.gear(id).unwrap();
                prop_assert!(b.is_meshed_with(&a.id));
            }
        }
    }

    #[test]
    fn speeds_consistent_when_unlocked(
        layout in prop::collection::vec((0.0f64..300.0, 0.0f64..300.0, 8u32..=48), 2..10),
    ) {
        let mut rng = rng();
        let mut sys = GearSystem::new();
        let ids: Vec<GearId> = layout
            .into_iter()
            .map(|(x, y, teeth)| sys.create_gear(x, y, teeth, None, &mut rng))
            .collect();
        sys.set_driver_gear(&ids[0]);

        if sys.is_locked() {
            prop_assert!(sys.gears().iter().all(|g| g.rotation_speed == 0.0));
        } else {
            // Every meshed pair counter-rotates at the inverse tooth ratio
            for a in sys.gears() {
                for id in &a.meshing_with {
                    let b = sys.gear(id).unwrap();
                    let expected = -a.rotation_speed * a.ratio_to(b);
                    let tol = b.rotation_speed.abs() * 0.01 + 1e-4;
                    prop_assert!((b.rotation_speed - expected).abs() <= tol);
                }
            }
        }
    }

    #[test]
    fn radius_invariant(teeth in 0u32..200) {
        let mut rng = rng();
        let mut sys = GearSystem::new();
        let id = sys.create_gear(0.0, 0.0, teeth, None, &mut rng);
        let g = sys.gear(&id).unwrap();
        prop_assert!((8..=48).contains(&g.teeth_count()));
        prop_assert_eq!(g.radius(), g.teeth_count() as f64 * MODULE_SIZE / 2.0);
    }
}
