use horde_defense_core::{
    ActorId, Command, Event, Message, ObjectId, ObjectIdAllocator, ObjectiveId, ObjectiveName,
    TeamId, FRAME,
};
use horde_defense_system_notifications::{NotificationCenter, NotificationContent};

const PLAYER: ActorId = ActorId::new(1);
const OTHER: ActorId = ActorId::new(2);

fn joined_center(ids: &mut ObjectIdAllocator) -> (NotificationCenter, Vec<Command>) {
    let mut center = NotificationCenter::new();
    let mut commands = Vec::new();
    center.handle(
        &[
            Event::PlayerJoined { player: PLAYER },
            Event::PlayerJoined { player: OTHER },
        ],
        ids,
        &mut commands,
    );
    (center, commands)
}

fn frames(
    center: &mut NotificationCenter,
    ids: &mut ObjectIdAllocator,
    count: usize,
) -> Vec<Command> {
    let events: Vec<Event> = (0..count).map(|_| Event::Tick { dt: FRAME }).collect();
    let mut commands = Vec::new();
    center.handle(&events, ids, &mut commands);
    commands
}

#[test]
fn joining_creates_one_widget_per_player() {
    let mut ids = ObjectIdAllocator::new();
    let (center, commands) = joined_center(&mut ids);

    assert_eq!(
        commands,
        vec![
            Command::CreateNotificationWidget {
                player: PLAYER,
                widget: ObjectId::new(0),
            },
            Command::CreateNotificationWidget {
                player: OTHER,
                widget: ObjectId::new(1),
            },
        ]
    );
    assert_eq!(
        center.channel(PLAYER).map(|channel| channel.widget()),
        Some(ObjectId::new(0))
    );
}

#[test]
fn deploy_briefing_shows_after_one_frame() {
    let mut ids = ObjectIdAllocator::new();
    let (mut center, _) = joined_center(&mut ids);
    let mut commands = Vec::new();
    center.handle(
        &[Event::ActorDeployed {
            actor: PLAYER,
            team: TeamId::new(1),
        }],
        &mut ids,
        &mut commands,
    );
    assert!(commands.is_empty());

    let commands = frames(&mut center, &mut ids, 1);
    assert_eq!(
        commands,
        vec![Command::ShowNotification {
            widget: ObjectId::new(0),
            message: Message::Briefing,
        }]
    );

    let commands = frames(&mut center, &mut ids, 600);
    assert_eq!(
        commands,
        vec![Command::HideNotification {
            widget: ObjectId::new(0),
        }],
        "a lone briefing stays for its maximum duration"
    );
    assert!(center.channel(PLAYER).is_some_and(|channel| channel.is_playing()));

    let _ = frames(&mut center, &mut ids, 1);
    assert!(center.channel(PLAYER).is_some_and(|channel| !channel.is_playing()));
}

#[test]
fn queued_messages_cut_display_to_minimum() {
    let mut ids = ObjectIdAllocator::new();
    let (mut center, _) = joined_center(&mut ids);
    let mut commands = Vec::new();
    center.handle(
        &[
            Event::ObjectiveArmed {
                objective: ObjectiveId::new(0),
                by: OTHER,
            },
            Event::ObjectiveDestroyed {
                objective: ObjectiveId::new(0),
                by: OTHER,
                name: ObjectiveName::MainTarget,
                is_core: true,
            },
        ],
        &mut ids,
        &mut commands,
    );
    assert_eq!(center.channel(PLAYER).map(|channel| channel.queued()), Some(1));

    let commands = frames(&mut center, &mut ids, 1 + 120 + 1 + 1);
    let shown: Vec<Message> = commands
        .iter()
        .filter_map(|command| match command {
            Command::ShowNotification { widget, message } if *widget == ObjectId::new(0) => {
                Some(*message)
            }
            _ => None,
        })
        .collect();

    assert_eq!(
        shown,
        vec![
            Message::BombArmed { by: OTHER },
            Message::TargetDestroyed {
                by: OTHER,
                target: ObjectiveName::MainTarget,
            },
        ]
    );
}

#[test]
fn leaving_mid_playback_deletes_the_widget() {
    let mut ids = ObjectIdAllocator::new();
    let (mut center, _) = joined_center(&mut ids);
    assert!(center.push(PLAYER, NotificationContent::briefing()));
    let _ = frames(&mut center, &mut ids, 10);

    let mut commands = Vec::new();
    center.handle(&[Event::PlayerLeft { player: PLAYER }], &mut ids, &mut commands);

    assert_eq!(
        commands,
        vec![Command::DeleteWidget {
            widget: ObjectId::new(0),
        }]
    );
    assert!(center.channel(PLAYER).is_none());
    assert!(!center.push(PLAYER, NotificationContent::briefing()));
}
