use horde_defense_core::{
    ActorId, ActorSnapshot, ActorView, Command, Event, TeamId, TeamRoster, Vec3, FRAME,
};
use horde_defense_system_behavior::{Behavior, BehaviorTuning, UnitBehaviorController};

const DEFENDERS: TeamId = TeamId::new(1);
const HORDE: TeamId = TeamId::new(2);
const FALLBACK: Vec3 = Vec3::new(0.0, 0.0, -50.0);

fn actor(id: u32, team: TeamId, position: Vec3) -> ActorSnapshot {
    ActorSnapshot {
        id: ActorId::new(id),
        team,
        alive: true,
        position,
        eye_position: position + Vec3::Y * 1.6,
        velocity: Vec3::ZERO,
        facing: Vec3::Z,
    }
}

fn controller(tuning: BehaviorTuning) -> UnitBehaviorController {
    UnitBehaviorController::new(tuning, TeamRoster::default(), FALLBACK)
}

fn deploy(controller: &mut UnitBehaviorController, id: u32, view: &ActorView) -> Vec<Command> {
    let mut commands = Vec::new();
    controller.handle(
        &[Event::ActorDeployed {
            actor: ActorId::new(id),
            team: HORDE,
        }],
        view,
        &mut commands,
    );
    commands
}

fn tick(controller: &mut UnitBehaviorController, view: &ActorView) -> Vec<Command> {
    let mut commands = Vec::new();
    controller.handle(&[Event::Tick { dt: FRAME }], view, &mut commands);
    commands
}

#[test]
fn registers_only_horde_units() {
    let view = ActorView::default();
    let mut controller = controller(BehaviorTuning::default());

    let commands = deploy(&mut controller, 10, &view);
    assert_eq!(
        commands,
        vec![Command::MoveTo {
            actor: ActorId::new(10),
            position: FALLBACK,
        }]
    );

    let mut commands = Vec::new();
    controller.handle(
        &[Event::ActorDeployed {
            actor: ActorId::new(11),
            team: DEFENDERS,
        }],
        &view,
        &mut commands,
    );
    assert!(commands.is_empty());
    assert_eq!(controller.instance_count(), 1);
}

#[test]
fn first_tick_targets_the_nearest_defender() {
    let view = ActorView::from_snapshots(vec![
        actor(1, DEFENDERS, Vec3::new(10.0, 0.0, 0.0)),
        actor(2, DEFENDERS, Vec3::new(0.0, 30.0, 4.0)),
        actor(3, DEFENDERS, Vec3::new(-4.0, 0.0, 0.0)),
        actor(10, HORDE, Vec3::ZERO),
    ]);
    let mut controller = controller(BehaviorTuning::default());
    let _ = deploy(&mut controller, 10, &view);

    let commands = tick(&mut controller, &view);

    let agent = controller.agent(ActorId::new(10)).expect("registered");
    assert_eq!(
        agent.target_unit(),
        Some(ActorId::new(2)),
        "height is ignored and ties go to the first defender"
    );
    assert_eq!(agent.target_position(), Vec3::new(0.0, 30.0, 4.0));
    assert_eq!(
        commands,
        vec![Command::SetFocusPoint {
            actor: ActorId::new(10),
            point: Vec3::new(0.0, 30.0, 4.0) + Vec3::Y * 1.6,
        }]
    );
}

#[test]
fn move_directive_is_throttled() {
    let view = ActorView::from_snapshots(vec![
        actor(1, DEFENDERS, Vec3::new(0.0, 0.0, 40.0)),
        actor(10, HORDE, Vec3::ZERO),
    ]);
    let mut controller = controller(BehaviorTuning::default());
    let _ = deploy(&mut controller, 10, &view);

    let mut move_frames = Vec::new();
    for frame in 1..=90 {
        let commands = tick(&mut controller, &view);
        if commands
            .iter()
            .any(|command| matches!(command, Command::MoveTo { .. }))
        {
            move_frames.push(frame);
        }
    }

    assert_eq!(move_frames, vec![30, 60, 90]);
}

#[test]
fn toggles_behaviour_after_interval_without_engagement() {
    let view = ActorView::from_snapshots(vec![actor(10, HORDE, Vec3::ZERO)]);
    let mut controller = controller(BehaviorTuning::default());
    let _ = deploy(&mut controller, 10, &view);

    let mut engaged_at = None;
    for frame in 1..=120 {
        let commands = tick(&mut controller, &view);
        if commands.contains(&Command::EngageBattlefield {
            actor: ActorId::new(10),
        }) {
            engaged_at = Some(frame);
        }
    }

    assert_eq!(engaged_at, Some(120));
    let agent = controller.agent(ActorId::new(10)).expect("registered");
    assert_eq!(agent.behavior(), Behavior::Engage);
    assert_eq!(agent.target_position(), FALLBACK);

    for _ in 0..119 {
        let _ = tick(&mut controller, &view);
    }
    let commands = tick(&mut controller, &view);
    assert!(commands.contains(&Command::MoveTo {
        actor: ActorId::new(10),
        position: FALLBACK,
    }));
}

#[test]
fn engages_when_within_battle_distance() {
    let tuning = BehaviorTuning {
        battle_distance: 5.0,
        ..BehaviorTuning::default()
    };
    let view = ActorView::from_snapshots(vec![
        actor(1, DEFENDERS, Vec3::new(0.0, 0.0, 3.0)),
        actor(10, HORDE, Vec3::ZERO),
    ]);
    let mut controller = controller(tuning);
    let _ = deploy(&mut controller, 10, &view);

    let commands = tick(&mut controller, &view);
    assert!(commands.contains(&Command::EngageBattlefield {
        actor: ActorId::new(10),
    }));

    let commands = tick(&mut controller, &view);
    assert!(commands.is_empty(), "engaged units stay engaged while close");
}

#[test]
fn reaps_units_after_the_update_pass() {
    let mut controller = controller(BehaviorTuning::default());
    let populated = ActorView::from_snapshots(vec![
        actor(10, HORDE, Vec3::ZERO),
        actor(11, HORDE, Vec3::X),
    ]);
    let _ = deploy(&mut controller, 10, &populated);
    let _ = deploy(&mut controller, 11, &populated);
    assert_eq!(controller.alive_count(&populated), 2);

    let mut dead = actor(10, HORDE, Vec3::ZERO);
    dead.alive = false;
    let thinned = ActorView::from_snapshots(vec![dead]);
    let commands = tick(&mut controller, &thinned);

    assert!(commands.is_empty(), "dead and missing units are not steered");
    assert_eq!(controller.instance_count(), 1);
    assert_eq!(controller.alive_count(&thinned), 0);

    let mut commands = Vec::new();
    controller.handle(
        &[Event::ActorUndeployed {
            actor: ActorId::new(10),
            team: HORDE,
        }],
        &thinned,
        &mut commands,
    );
    assert_eq!(controller.instance_count(), 0);
}

#[test]
fn falls_back_to_the_horde_base_once_defenders_are_gone() {
    let horde_base = Vec3::new(0.0, 0.0, 200.0);
    let defender = Vec3::new(0.0, 0.0, 40.0);
    let mut controller =
        UnitBehaviorController::new(BehaviorTuning::default(), TeamRoster::default(), horde_base);
    let guarded = ActorView::from_snapshots(vec![
        actor(1, DEFENDERS, defender),
        actor(10, HORDE, Vec3::ZERO),
    ]);
    let _ = deploy(&mut controller, 10, &guarded);
    let _ = tick(&mut controller, &guarded);
    let agent = controller.agent(ActorId::new(10)).expect("registered");
    assert_eq!(agent.target_position(), defender);

    let abandoned = ActorView::from_snapshots(vec![actor(10, HORDE, Vec3::ZERO)]);
    let mut moves = Vec::new();
    for frame in 2..=240 {
        for command in tick(&mut controller, &abandoned) {
            if let Command::MoveTo { position, .. } = command {
                moves.push((frame, position));
            }
        }
        if frame == 120 {
            let agent = controller.agent(ActorId::new(10)).expect("registered");
            assert_eq!(agent.target_unit(), None);
            assert_eq!(agent.target_position(), horde_base);
            assert_eq!(agent.behavior(), Behavior::Engage);
        }
    }

    assert_eq!(
        moves,
        vec![
            (30, defender),
            (60, defender),
            (90, defender),
            (120, defender),
            (240, horde_base),
        ]
    );
}
