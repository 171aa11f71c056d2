use std::time::Duration;

use horde_defense_core::{
    heading_of, ActorId, ActorView, Command, Event, InventorySlot, TeamRoster, Vec3,
};

const FACING_DELAY: Duration = Duration::from_millis(100);

/// Deploy-time adjustments applied to every actor entering the match.
///
/// Horde units lose their throwable slot. Defenders are turned to face the
/// horde base shortly after deploying, once the host has settled their spawn.
#[derive(Debug)]
pub(crate) struct DeployModifiers {
    roster: TeamRoster,
    horde_base: Vec3,
    pending_facing: Vec<(ActorId, Duration)>,
}

impl DeployModifiers {
    pub(crate) fn new(roster: TeamRoster, horde_base: Vec3) -> Self {
        Self {
            roster,
            horde_base,
            pending_facing: Vec::new(),
        }
    }

    pub(crate) fn handle(&mut self, events: &[Event], view: &ActorView, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::ActorDeployed { actor, team } if *team == self.roster.horde => {
                    out.push(Command::RemoveEquipment {
                        actor: *actor,
                        slot: InventorySlot::Throwable,
                    });
                }
                Event::ActorDeployed { actor, team } if *team == self.roster.defenders => {
                    self.pending_facing.push((*actor, FACING_DELAY));
                }
                Event::Tick { dt } => self.advance(*dt, view, out),
                _ => {}
            }
        }
    }

    fn advance(&mut self, dt: Duration, view: &ActorView, out: &mut Vec<Command>) {
        let horde_base = self.horde_base;
        self.pending_facing.retain_mut(|(actor, remaining)| {
            if *remaining > dt {
                *remaining -= dt;
                return true;
            }

            if let Some(snapshot) = view.get(*actor).filter(|snapshot| snapshot.alive) {
                out.push(Command::Teleport {
                    actor: *actor,
                    position: snapshot.position,
                    orientation: heading_of(horde_base - snapshot.position),
                });
            }
            false
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horde_defense_core::{ActorSnapshot, FRAME};

    #[test]
    fn defenders_turn_toward_the_horde_base_after_a_delay() {
        let roster = TeamRoster::default();
        let mut modifiers = DeployModifiers::new(roster, Vec3::new(0.0, 0.0, 200.0));
        let view = ActorView::from_snapshots(vec![ActorSnapshot {
            id: ActorId::new(1),
            team: roster.defenders,
            alive: true,
            position: Vec3::new(10.0, 0.0, 0.0),
            eye_position: Vec3::new(10.0, 1.6, 0.0),
            velocity: Vec3::ZERO,
            facing: Vec3::X,
        }]);
        let mut out = Vec::new();
        modifiers.handle(
            &[Event::ActorDeployed {
                actor: ActorId::new(1),
                team: roster.defenders,
            }],
            &view,
            &mut out,
        );
        assert!(out.is_empty());

        let ticks: Vec<Event> = (0..5).map(|_| Event::Tick { dt: FRAME }).collect();
        modifiers.handle(&ticks, &view, &mut out);
        assert!(out.is_empty());

        modifiers.handle(&[Event::Tick { dt: FRAME }], &view, &mut out);
        match out.as_slice() {
            [Command::Teleport {
                actor, orientation, ..
            }] => {
                assert_eq!(*actor, ActorId::new(1));
                assert!((*orientation - (-10.0f32).atan2(200.0)).abs() < 1e-6);
            }
            other => panic!("unexpected commands: {other:?}"),
        }
    }

    #[test]
    fn horde_units_lose_throwables() {
        let roster = TeamRoster::default();
        let mut modifiers = DeployModifiers::new(roster, Vec3::ZERO);
        let mut out = Vec::new();
        modifiers.handle(
            &[Event::ActorDeployed {
                actor: ActorId::new(9),
                team: roster.horde,
            }],
            &ActorView::default(),
            &mut out,
        );
        assert_eq!(
            out,
            vec![Command::RemoveEquipment {
                actor: ActorId::new(9),
                slot: InventorySlot::Throwable,
            }]
        );
    }
}
