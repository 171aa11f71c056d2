use std::time::Duration;

use horde_defense_core::{
    ActorId, ActorSnapshot, ActorView, Command, Event, ObjectIdAllocator, ObjectKind,
    ObjectiveId, SpawnerId, TeamRoster, Vec3, VoiceOverFlag, FRAME,
};
use horde_defense_system_broker::{RayCaster, SpawnBroker, SpawnBrokerConfig};
use horde_defense_system_director::{Config, DirectorTuning, PopulationDirector, Services};
use horde_defense_system_objective::{InteractionTable, ObjectiveState, ObjectiveTuning};
use horde_defense_system_placement::GroundTuning;

const HORDE_BASE: Vec3 = Vec3::new(0.0, 0.0, 200.0);

struct Harness {
    director: PopulationDirector,
    ray_caster: RayCaster,
    spawner: SpawnBroker,
    interactions: InteractionTable<ObjectiveId>,
    object_ids: ObjectIdAllocator,
    log: Vec<Command>,
    pending: Vec<Command>,
}

impl Harness {
    fn new(tuning: DirectorTuning) -> Self {
        let roster = TeamRoster::default();
        let director = PopulationDirector::new(Config {
            tuning,
            objective: ObjectiveTuning::default(),
            ground: GroundTuning::default(),
            roster,
            defender_base: Vec3::ZERO,
            horde_base: HORDE_BASE,
            seed: 11,
        });
        let mut harness = Self {
            director,
            ray_caster: RayCaster::new(),
            spawner: SpawnBroker::new(SpawnBrokerConfig::new(SpawnerId::new(101), roster.horde)),
            interactions: InteractionTable::new(),
            object_ids: ObjectIdAllocator::new(),
            log: Vec::new(),
            pending: Vec::new(),
        };
        let mut out = Vec::new();
        let mut services = Services {
            ray_caster: &mut harness.ray_caster,
            spawner: &mut harness.spawner,
            interactions: &mut harness.interactions,
            object_ids: &mut harness.object_ids,
        };
        harness.director.start(&mut services, &mut out);
        harness.record(out);
        harness
    }

    fn record(&mut self, commands: Vec<Command>) {
        self.pending.extend(commands.iter().cloned());
        self.log.extend(commands);
    }

    /// Answers every outstanding cast against flat ground at height zero.
    fn answer_casts(&mut self) {
        loop {
            let pending = std::mem::take(&mut self.pending);
            let mut answered = false;
            for command in pending {
                let Command::CastRay { from, to, token } = command else {
                    continue;
                };
                answered = true;
                let vertical = from.x == to.x && from.z == to.z;
                let event = if vertical && from.y >= 0.0 && to.y <= 0.0 {
                    Event::RayCastHit {
                        point: Vec3::new(from.x, 0.0, from.z),
                        normal: Vec3::Y,
                        token: Some(token),
                    }
                } else {
                    Event::RayCastMissed { token: Some(token) }
                };
                let mut out = Vec::new();
                self.ray_caster.handle(&[event], &mut out);
                self.record(out);
            }
            if !answered {
                return;
            }
        }
    }

    fn handle(&mut self, events: &[Event], view: &ActorView, live_units: usize) -> Vec<Event> {
        let mut out = Vec::new();
        let mut broadcasts = Vec::new();
        let mut services = Services {
            ray_caster: &mut self.ray_caster,
            spawner: &mut self.spawner,
            interactions: &mut self.interactions,
            object_ids: &mut self.object_ids,
        };
        self.director
            .handle(events, view, live_units, &mut services, &mut out, &mut broadcasts);
        self.record(out);
        broadcasts
    }

    fn run_setup(&mut self, live_units: usize) {
        let view = ActorView::default();
        for _ in 0..10 {
            self.answer_casts();
            let _ = self.handle(&[Event::Tick { dt: FRAME }], &view, live_units);
            if self.director.is_running() {
                return;
            }
        }
        panic!("setup did not complete");
    }
}

#[test]
fn setup_places_core_at_horde_base_and_outposts_along_the_lane() {
    let mut harness = Harness::new(DirectorTuning::default());
    harness.run_setup(1_000);

    let objectives = harness.director.objectives();
    assert_eq!(objectives.len(), 4);

    let core = &objectives[0];
    assert!(core.settings().is_core);
    assert_eq!(core.settings().position, HORDE_BASE);
    assert_eq!(core.settings().voice_over, VoiceOverFlag::Delta);
    assert_eq!(core.settings().countdown, Duration::from_secs(30));
    assert_eq!(harness.director.core(), Some(core.id()));

    let expected_z = [60.0, 100.0, 140.0];
    let expected_flags = [VoiceOverFlag::Alpha, VoiceOverFlag::Bravo, VoiceOverFlag::Charlie];
    for ((outpost, z), flag) in objectives[1..].iter().zip(expected_z).zip(expected_flags) {
        let settings = outpost.settings();
        assert!(!settings.is_core);
        assert!((settings.position.z - z).abs() < 1e-3);
        assert!(settings.position.x.abs() <= 50.0);
        assert_eq!(settings.position.y, 0.0);
        assert_eq!(settings.voice_over, flag);
    }

    let interact_points = harness
        .log
        .iter()
        .filter(|command| {
            matches!(
                command,
                Command::SpawnObject {
                    kind: ObjectKind::InteractPoint,
                    ..
                }
            )
        })
        .count();
    assert_eq!(interact_points, 4);
    assert_eq!(harness.interactions.len(), 4);
}

#[test]
fn deficit_is_split_between_alive_objectives() {
    let tuning = DirectorTuning {
        outpost_count: 1,
        ..DirectorTuning::default()
    };
    let mut harness = Harness::new(tuning);
    harness.run_setup(70);

    assert_eq!(harness.director.target(), 80);
    let quotas: Vec<u32> = harness
        .director
        .objectives()
        .iter()
        .map(|objective| objective.spawn_quota())
        .collect();
    assert_eq!(quotas, vec![5, 5]);
}

#[test]
fn destroying_the_core_ends_the_match_once() {
    let tuning = DirectorTuning {
        outpost_count: 0,
        core_countdown: Duration::from_secs(1),
        ..DirectorTuning::default()
    };
    let mut harness = Harness::new(tuning);
    harness.run_setup(1_000);

    let point = harness
        .log
        .iter()
        .find_map(|command| match command {
            Command::SpawnObject {
                object,
                kind: ObjectKind::InteractPoint,
                ..
            } => Some(*object),
            _ => None,
        })
        .expect("core interact point");

    let defender = ActorId::new(1);
    let view = ActorView::from_snapshots(vec![ActorSnapshot {
        id: defender,
        team: TeamRoster::default().defenders,
        alive: true,
        position: HORDE_BASE,
        eye_position: HORDE_BASE,
        velocity: Vec3::ZERO,
        facing: Vec3::Z,
    }]);

    let broadcasts = harness.handle(
        &[Event::Interact {
            actor: defender,
            point,
        }],
        &view,
        1_000,
    );
    assert_eq!(broadcasts.len(), 1);

    let ticks: Vec<Event> = (0..120).map(|_| Event::Tick { dt: FRAME }).collect();
    let _ = harness.handle(&ticks, &view, 1_000);

    assert_eq!(
        harness.director.objectives()[0].state(),
        ObjectiveState::Destroyed
    );
    assert!(!harness.director.is_active());
    let endings = harness
        .log
        .iter()
        .filter(|command| {
            **command
                == Command::EndMatch {
                    winner: TeamRoster::default().defenders,
                }
        })
        .count();
    assert_eq!(endings, 1);
}
