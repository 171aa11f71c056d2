#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Objective controller owning one placed demolition target.
//!
//! An objective starts dormant, feeding horde spawns from its quota. A
//! defender interaction arms it exactly once; the countdown then advances only
//! while a living defender stands inside the objective's area. When the
//! countdown completes the objective explodes, damages nearby enemies of the
//! arming actor and releases every world object it owns.

mod interaction;

use std::time::Duration;

use horde_defense_core::{
    ActorId, ActorView, Cadence, Command, Event, IconImage, IconText, ObjectId, ObjectIdAllocator,
    ObjectKind, ObjectiveId, ObjectiveName, TeamId, TeamRoster, Vec3, VoiceOverEvent,
    VoiceOverFlag, FRAME,
};
use horde_defense_system_broker::{SpawnBroker, SpawnRequest};

pub use interaction::InteractionTable;

/// Lifecycle of an objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectiveState {
    /// Waiting to be armed; the interaction point is enabled.
    Dormant,
    /// Counting down toward destruction.
    Armed,
    /// Exploded; terminal.
    Destroyed,
}

/// Placement and presentation of a single objective.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjectiveSettings {
    /// Name announced when the objective is destroyed.
    pub name: ObjectiveName,
    /// Ground position of the objective.
    pub position: Vec3,
    /// Yaw in radians.
    pub orientation: f32,
    /// Whether destroying this objective wins the match.
    pub is_core: bool,
    /// Whether the world icon shows its label before arming.
    pub show_target_text: bool,
    /// Time defenders must hold the area once armed.
    pub countdown: Duration,
    /// Phonetic flag used in voice lines.
    pub voice_over: VoiceOverFlag,
}

/// Tuning shared by every objective.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjectiveTuning {
    /// Radius defenders must stay within for the countdown to advance.
    pub area_radius: f32,
    /// Radius of the destruction blast.
    pub blast_radius: f32,
    /// Damage dealt by the blast.
    pub blast_damage: f32,
    /// Volume of the alarm sound.
    pub alarm_volume: f32,
}

impl Default for ObjectiveTuning {
    fn default() -> Self {
        Self {
            area_radius: 20.0,
            blast_radius: 20.0,
            blast_damage: 200.0,
            alarm_volume: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct OwnedObjects {
    icon: ObjectId,
    interact_point: ObjectId,
    ordnance: ObjectId,
    voice_over: ObjectId,
    alarm: ObjectId,
    area: ObjectId,
    explosion: ObjectId,
}

/// Controller of one placed objective.
#[derive(Debug)]
pub struct ObjectiveController {
    id: ObjectiveId,
    settings: ObjectiveSettings,
    tuning: ObjectiveTuning,
    roster: TeamRoster,
    objects: OwnedObjects,
    state: ObjectiveState,
    spawn_quota: u32,
    armed_by: Option<(ActorId, TeamId)>,
    countdown_elapsed: Duration,
    alarm_playing: bool,
    cadence: Cadence,
}

impl ObjectiveController {
    /// Spawns the objective's world objects and registers its interaction point.
    pub fn spawn(
        id: ObjectiveId,
        settings: ObjectiveSettings,
        tuning: ObjectiveTuning,
        roster: TeamRoster,
        ids: &mut ObjectIdAllocator,
        interactions: &mut InteractionTable<ObjectiveId>,
        out: &mut Vec<Command>,
    ) -> Self {
        let objects = OwnedObjects {
            icon: ids.allocate(),
            interact_point: ids.allocate(),
            ordnance: ids.allocate(),
            voice_over: ids.allocate(),
            alarm: ids.allocate(),
            area: ids.allocate(),
            explosion: ids.allocate(),
        };

        let rotation = Vec3::new(0.0, settings.orientation, 0.0);
        let raised = settings.position + Vec3::Y * 0.3;
        for (object, kind, position, rotation) in [
            (objects.icon, ObjectKind::WorldIcon, raised, rotation),
            (objects.interact_point, ObjectKind::InteractPoint, raised, rotation),
            (objects.ordnance, ObjectKind::OrdnanceCrate, settings.position, rotation),
            (objects.voice_over, ObjectKind::VoiceOverModule, Vec3::ZERO, Vec3::ZERO),
            (objects.alarm, ObjectKind::AlarmSound, settings.position, rotation),
            (objects.area, ObjectKind::AreaEffect, settings.position, rotation),
            (objects.explosion, ObjectKind::ExplosionEffect, settings.position, rotation),
        ] {
            out.push(Command::SpawnObject {
                object,
                kind,
                position,
                rotation,
            });
        }

        out.push(Command::SetSoundVolume {
            object: objects.alarm,
            volume: tuning.alarm_volume,
        });
        out.push(Command::ConfigureWorldIcon {
            object: objects.icon,
            image: IconImage::Bomb,
            owner: roster.defenders,
        });
        out.push(Command::SetWorldIconText {
            object: objects.icon,
            text: IconText::Target,
            visible: settings.show_target_text,
        });
        out.push(Command::EnableInteractPoint {
            object: objects.interact_point,
            enabled: true,
        });
        interactions.register(objects.interact_point, id);

        log::info!(
            "placed {} objective {} at ({:.1}, {:.1}, {:.1})",
            if settings.is_core { "core" } else { "outpost" },
            id.get(),
            settings.position.x,
            settings.position.y,
            settings.position.z
        );

        Self {
            id,
            settings,
            tuning,
            roster,
            objects,
            state: ObjectiveState::Dormant,
            spawn_quota: 0,
            armed_by: None,
            countdown_elapsed: Duration::ZERO,
            alarm_playing: false,
            cadence: Cadence::new(FRAME),
        }
    }

    /// Identifier of the objective.
    #[must_use]
    pub fn id(&self) -> ObjectiveId {
        self.id
    }

    /// Placement and presentation settings.
    #[must_use]
    pub fn settings(&self) -> &ObjectiveSettings {
        &self.settings
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ObjectiveState {
        self.state
    }

    /// Reports whether the objective has not been destroyed yet.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state != ObjectiveState::Destroyed
    }

    /// Units still to be spawned from this objective.
    #[must_use]
    pub fn spawn_quota(&self) -> u32 {
        self.spawn_quota
    }

    /// Adds units to the spawn quota.
    pub fn add_quota(&mut self, count: u32) {
        self.spawn_quota = self.spawn_quota.saturating_add(count);
    }

    /// Countdown progress in `0.0..=1.0`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.settings.countdown.is_zero() {
            return if self.state == ObjectiveState::Dormant { 0.0 } else { 1.0 };
        }
        (self.countdown_elapsed.as_secs_f32() / self.settings.countdown.as_secs_f32()).min(1.0)
    }

    /// Arms the objective on behalf of `actor`.
    ///
    /// Only a dormant objective arms; later calls return `false` and emit nothing.
    pub fn arm(
        &mut self,
        actor: ActorId,
        view: &ActorView,
        out: &mut Vec<Command>,
        broadcasts: &mut Vec<Event>,
    ) -> bool {
        if self.state != ObjectiveState::Dormant {
            return false;
        }

        let team = view
            .get(actor)
            .map_or(self.roster.defenders, |snapshot| snapshot.team);
        self.state = ObjectiveState::Armed;
        self.armed_by = Some((actor, team));

        out.push(Command::EnableEffect {
            object: self.objects.area,
            enabled: true,
        });
        out.push(Command::PlayVoiceOver {
            object: self.objects.voice_over,
            event: VoiceOverEvent::ArmFriendly,
            flag: self.settings.voice_over,
        });
        out.push(Command::EnableInteractPoint {
            object: self.objects.interact_point,
            enabled: false,
        });
        out.push(Command::SetWorldIconText {
            object: self.objects.icon,
            text: IconText::Progress {
                percent: 0,
                tenths: 0,
            },
            visible: true,
        });
        broadcasts.push(Event::ObjectiveArmed {
            objective: self.id,
            by: actor,
        });

        log::info!("objective {} armed by actor {}", self.id.get(), actor.get());
        true
    }

    /// Runs the spawn drip and the countdown once per elapsed frame.
    pub fn handle(
        &mut self,
        events: &[Event],
        view: &ActorView,
        spawner: &mut SpawnBroker,
        interactions: &mut InteractionTable<ObjectiveId>,
        out: &mut Vec<Command>,
        broadcasts: &mut Vec<Event>,
    ) {
        for event in events {
            if let Event::Tick { dt } = event {
                for _ in 0..self.cadence.advance(*dt) {
                    self.drip(spawner, out);
                    self.count_down(view, interactions, out, broadcasts);
                }
            }
        }
    }

    fn drip(&mut self, spawner: &mut SpawnBroker, out: &mut Vec<Command>) {
        if self.state == ObjectiveState::Destroyed || self.spawn_quota == 0 {
            return;
        }

        self.spawn_quota -= 1;
        let _ = spawner.request_detached(
            SpawnRequest {
                position: self.settings.position + Vec3::Y,
                orientation: self.settings.orientation,
                class: None,
                team: self.roster.horde,
            },
            out,
        );
    }

    fn count_down(
        &mut self,
        view: &ActorView,
        interactions: &mut InteractionTable<ObjectiveId>,
        out: &mut Vec<Command>,
        broadcasts: &mut Vec<Event>,
    ) {
        if self.state != ObjectiveState::Armed {
            return;
        }

        let occupied = self.defender_in_area(view);
        if occupied {
            self.countdown_elapsed = self.countdown_elapsed.saturating_add(FRAME);
        }
        if occupied != self.alarm_playing {
            self.alarm_playing = occupied;
            out.push(Command::EnableEffect {
                object: self.objects.alarm,
                enabled: occupied,
            });
        }

        out.push(Command::SetWorldIconText {
            object: self.objects.icon,
            text: progress_text(self.progress()),
            visible: true,
        });

        if self.countdown_elapsed >= self.settings.countdown {
            self.destroy(view, interactions, out, broadcasts);
        }
    }

    fn defender_in_area(&self, view: &ActorView) -> bool {
        view.iter().any(|snapshot| {
            snapshot.alive
                && snapshot.team == self.roster.defenders
                && self.settings.position.distance(snapshot.position) < self.tuning.area_radius
        })
    }

    fn destroy(
        &mut self,
        view: &ActorView,
        interactions: &mut InteractionTable<ObjectiveId>,
        out: &mut Vec<Command>,
        broadcasts: &mut Vec<Event>,
    ) {
        let Some((attacker, attacker_team)) = self.armed_by else {
            return;
        };
        self.state = ObjectiveState::Destroyed;

        out.push(Command::PlayVoiceOver {
            object: self.objects.voice_over,
            event: VoiceOverEvent::DestroyedFriendly,
            flag: self.settings.voice_over,
        });
        out.push(Command::EnableEffect {
            object: self.objects.area,
            enabled: false,
        });
        out.push(Command::EnableEffect {
            object: self.objects.alarm,
            enabled: false,
        });
        self.alarm_playing = false;
        out.push(Command::EnableEffect {
            object: self.objects.explosion,
            enabled: true,
        });

        for snapshot in view.iter() {
            if snapshot.alive
                && snapshot.team != attacker_team
                && self.settings.position.distance(snapshot.position) < self.tuning.blast_radius
            {
                out.push(Command::DealDamage {
                    target: snapshot.id,
                    amount: self.tuning.blast_damage,
                    attacker,
                });
            }
        }

        for object in [
            self.objects.icon,
            self.objects.interact_point,
            self.objects.ordnance,
            self.objects.alarm,
            self.objects.area,
        ] {
            out.push(Command::UnspawnObject { object });
        }
        let _ = interactions.unregister(self.objects.interact_point);

        broadcasts.push(Event::ObjectiveDestroyed {
            objective: self.id,
            by: attacker,
            name: self.settings.name,
            is_core: self.settings.is_core,
        });
        log::info!("objective {} destroyed", self.id.get());
    }
}

/// World icon text for countdown progress in `0.0..=1.0`.
#[must_use]
pub fn progress_text(progress: f32) -> IconText {
    let scaled = progress * 100.0;
    let percent = scaled.floor();
    let tenths = ((scaled % 1.0) * 10.0).floor().min(9.0);
    IconText::Progress {
        percent: percent as u32,
        tenths: tenths as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_text_splits_whole_and_tenths() {
        assert_eq!(
            progress_text(0.4567),
            IconText::Progress {
                percent: 45,
                tenths: 6,
            }
        );
        assert_eq!(
            progress_text(1.0),
            IconText::Progress {
                percent: 100,
                tenths: 0,
            }
        );
    }
}
