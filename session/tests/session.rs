use horde_defense_core::{
    ActorId, ActorSnapshot, ActorView, Command, Event, InventorySlot, Message, ObjectKind,
    TeamRoster, Vec3, FRAME,
};
use horde_defense_session::{ConfigError, Session, SessionConfig};

#[test]
fn start_places_camera_and_safety_area_before_setup() {
    let mut out = Vec::new();
    let session = Session::start(SessionConfig::default(), &mut out).expect("valid config");

    match &out[..3] {
        [Command::SpawnObject {
            kind: ObjectKind::DeployCamera,
            position: camera,
            ..
        }, Command::SpawnObject {
            object: area,
            kind: ObjectKind::SafetyAreaEffect,
            ..
        }, Command::EnableEffect {
            object: enabled,
            enabled: true,
        }] => {
            assert_eq!(*camera, Vec3::ZERO);
            assert_eq!(area, enabled);
        }
        other => panic!("unexpected mode start commands: {other:?}"),
    }
    assert!(out[3..]
        .iter()
        .any(|command| matches!(command, Command::CastRay { .. })));
    assert!(session.is_active());
    assert!(!session.director().is_running());
}

#[test]
fn invalid_config_emits_nothing() {
    let mut config = SessionConfig::default();
    config.director.lane_width_min = 80.0;
    config.director.lane_width_max = 40.0;

    let mut out = Vec::new();
    let error = Session::start(config, &mut out).expect_err("inverted lane widths");
    assert_eq!(
        error,
        ConfigError::LaneWidth {
            min: 80.0,
            max: 40.0
        }
    );
    assert!(out.is_empty());
}

#[test]
fn joining_defender_is_briefed_on_deploy() {
    let roster = TeamRoster::default();
    let player = ActorId::new(7);
    let mut out = Vec::new();
    let mut session = Session::start(SessionConfig::default(), &mut out).expect("valid config");
    out.clear();

    let view = ActorView::from_snapshots(vec![ActorSnapshot {
        id: player,
        team: roster.defenders,
        alive: true,
        position: Vec3::new(0.0, 0.0, 5.0),
        eye_position: Vec3::new(0.0, 1.6, 5.0),
        velocity: Vec3::ZERO,
        facing: Vec3::X,
    }]);
    session.handle(
        &[
            Event::PlayerJoined { player },
            Event::ActorDeployed {
                actor: player,
                team: roster.defenders,
            },
            Event::Tick { dt: FRAME },
        ],
        &view,
        &mut out,
    );

    assert!(out.iter().any(|command| matches!(
        command,
        Command::CreateNotificationWidget { player: p, .. } if *p == player
    )));
    assert!(out.iter().any(|command| matches!(
        command,
        Command::ShowNotification {
            message: Message::Briefing,
            ..
        }
    )));
    assert!(!out
        .iter()
        .any(|command| matches!(command, Command::RemoveEquipment { .. })));
}

#[test]
fn deployed_horde_unit_loses_throwables_and_moves_out() {
    let roster = TeamRoster::default();
    let unit = ActorId::new(40);
    let mut out = Vec::new();
    let mut session = Session::start(SessionConfig::default(), &mut out).expect("valid config");
    out.clear();

    let view = ActorView::from_snapshots(vec![ActorSnapshot {
        id: unit,
        team: roster.horde,
        alive: true,
        position: Vec3::new(0.0, 0.0, 190.0),
        eye_position: Vec3::new(0.0, 1.6, 190.0),
        velocity: Vec3::ZERO,
        facing: Vec3::NEG_Z,
    }]);
    session.handle(
        &[Event::ActorDeployed {
            actor: unit,
            team: roster.horde,
        }],
        &view,
        &mut out,
    );

    assert!(out.contains(&Command::RemoveEquipment {
        actor: unit,
        slot: InventorySlot::Throwable,
    }));
    assert!(out.contains(&Command::MoveTo {
        actor: unit,
        position: Vec3::new(0.0, 0.0, 200.0),
    }));
    assert_eq!(session.stats(&view).instances, 1);
    assert_eq!(session.stats(&view).alive, 1);
}
