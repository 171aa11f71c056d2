use std::task::Poll;

use horde_defense_core::{Command, Event, Vec3};
use horde_defense_system_broker::RayCaster;
use horde_defense_system_placement::{
    ClearanceProbe, GroundPlacementPlanner, GroundTuning, SideClearance,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn terrain_height(x: f32, z: f32) -> f32 {
    0.5 * x + 0.1 * z
}

/// Answers the in-flight cast against a tilted plane until the caster is idle.
fn drain_against_plane(caster: &mut RayCaster, commands: &mut Vec<Command>) -> usize {
    let mut answered = 0;
    while let Some(Command::CastRay { from, to, token }) = commands.pop() {
        commands.clear();
        let height = terrain_height(from.x, from.z);
        let event = if height <= from.y && height >= to.y {
            Event::RayCastHit {
                point: Vec3::new(from.x, height, from.z),
                normal: Vec3::Y,
                token: Some(token),
            }
        } else {
            Event::RayCastMissed { token: Some(token) }
        };
        caster.handle(&[event], commands);
        answered += 1;
    }
    answered
}

#[test]
fn ground_query_samples_center_and_ring() {
    let planner = GroundPlacementPlanner::new(GroundTuning::default());
    let mut caster = RayCaster::new();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut commands = Vec::new();

    let approx = Vec3::new(10.0, 0.0, -4.0);
    let mut query = planner.detect_ground(approx, &mut rng, &mut caster, &mut commands);

    match commands.first() {
        Some(Command::CastRay { from, to, .. }) => {
            assert_eq!(*from, approx + Vec3::Y * 10.0);
            assert_eq!(*to, approx + Vec3::Y * 10.0 - Vec3::Y * 100.0);
        }
        other => panic!("expected a centre cast, got {other:?}"),
    }
    assert_eq!(caster.outstanding_len(), 9);
    assert_eq!(query.poll(&mut caster), Poll::Pending);

    assert_eq!(drain_against_plane(&mut caster, &mut commands), 9);

    match query.poll(&mut caster) {
        Poll::Ready(placement) => {
            let expected = terrain_height(placement.position.x, placement.position.z);
            assert!((placement.position.y - expected).abs() < 1e-4);
            assert!(placement.orientation > 0.0);
            assert!(placement.orientation <= std::f32::consts::PI);
        }
        Poll::Pending => panic!("ground query should be complete"),
    }
}

#[test]
fn ground_query_without_hits_falls_back() {
    let planner = GroundPlacementPlanner::new(GroundTuning::default());
    let mut caster = RayCaster::new();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut commands = Vec::new();
    let approx = Vec3::new(0.0, 500.0, 0.0);
    let mut query = planner.detect_ground(approx, &mut rng, &mut caster, &mut commands);

    let _ = drain_against_plane(&mut caster, &mut commands);

    assert_eq!(
        query.poll(&mut caster).map(|placement| placement.position),
        Poll::Ready(approx)
    );
}

#[test]
fn side_clearance_casts_left_then_right() {
    let planner = GroundPlacementPlanner::new(GroundTuning::default());
    let mut caster = RayCaster::new();
    let mut commands = Vec::new();
    let probe = ClearanceProbe {
        origin: Vec3::new(0.0, 5.0, 50.0),
        right: Vec3::NEG_X,
        min: 8.0,
        max: 100.0,
        margin: 2.0,
    };
    let mut query = planner.detect_side_clearance(probe, &mut caster, &mut commands);

    let Some(Command::CastRay { to, token, .. }) = commands.pop() else {
        panic!("expected the left cast");
    };
    assert_eq!(to, Vec3::new(100.0, 5.0, 50.0));
    caster.handle(
        &[Event::RayCastHit {
            point: Vec3::new(30.0, 5.0, 50.0),
            normal: Vec3::NEG_X,
            token: Some(token),
        }],
        &mut commands,
    );

    let Some(Command::CastRay { to, token, .. }) = commands.pop() else {
        panic!("expected the right cast");
    };
    assert_eq!(to, Vec3::new(-100.0, 5.0, 50.0));
    caster.handle(&[Event::RayCastMissed { token: Some(token) }], &mut commands);

    assert_eq!(
        query.poll(&mut caster),
        Poll::Ready(SideClearance {
            left: 28.0,
            right: 100.0,
        })
    );
}
