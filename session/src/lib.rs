#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-match service object that owns every horde defense system.
//!
//! A [`Session`] is created when the host starts the game mode. It routes each
//! batch of host events to the brokers, the unit controllers, the director and
//! the notification center in a fixed order, collecting their commands into a
//! single output buffer for the host to apply.

mod modifiers;

use std::time::Duration;

use horde_defense_core::{
    ActorView, Cadence, Command, Event, ObjectIdAllocator, ObjectKind, ObjectiveId, SpawnerId,
    TeamRoster, Vec3,
};
use horde_defense_system_behavior::{BehaviorTuning, UnitBehaviorController};
use horde_defense_system_broker::{RayCaster, SpawnBroker, SpawnBrokerConfig};
use horde_defense_system_director::{
    Config as DirectorConfig, DirectorTuning, PopulationDirector, Services,
};
use horde_defense_system_notifications::NotificationCenter;
use horde_defense_system_objective::{InteractionTable, ObjectiveTuning};
use horde_defense_system_penalty::{AntiStallPenalty, PenaltyTuning};
use horde_defense_system_placement::GroundTuning;
use thiserror::Error;

use crate::modifiers::DeployModifiers;

const STATS_INTERVAL: Duration = Duration::from_secs(1);

/// Everything required to start a match.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionConfig {
    /// Seed of every random stream used by the match.
    pub seed: u64,
    /// Host spawner that produces horde units.
    pub spawner: SpawnerId,
    /// Teams taking part in the match.
    pub roster: TeamRoster,
    /// Position of the defenders' base.
    pub defender_base: Vec3,
    /// Position of the horde base.
    pub horde_base: Vec3,
    /// Time after which a spawn that never deploys is abandoned.
    pub deploy_timeout: Option<Duration>,
    /// Horde unit behaviour tuning.
    pub behavior: BehaviorTuning,
    /// Anti-stall tuning.
    pub penalty: PenaltyTuning,
    /// Objective tuning.
    pub objective: ObjectiveTuning,
    /// Ground detection tuning.
    pub ground: GroundTuning,
    /// Director tuning.
    pub director: DirectorTuning,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            spawner: SpawnerId::new(101),
            roster: TeamRoster::default(),
            defender_base: Vec3::ZERO,
            horde_base: Vec3::new(0.0, 0.0, 200.0),
            deploy_timeout: None,
            behavior: BehaviorTuning::default(),
            penalty: PenaltyTuning::default(),
            objective: ObjectiveTuning::default(),
            ground: GroundTuning::default(),
            director: DirectorTuning::default(),
        }
    }
}

/// Reasons a [`SessionConfig`] is rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Both roster entries name the same team.
    #[error("defenders and horde must be different teams (both are team {0})")]
    SameTeams(u8),
    /// A periodic task would never run.
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
    /// The outpost band does not lie on the base-to-base line.
    #[error("outpost band {start}..{end} must satisfy 0 <= start <= end <= 1")]
    OutpostBand {
        /// Configured start fraction.
        start: f32,
        /// Configured end fraction.
        end: f32,
    },
    /// The lane width bounds are inverted or negative.
    #[error("lane width bounds {min}..{max} must satisfy 0 <= min <= max")]
    LaneWidth {
        /// Configured minimum width.
        min: f32,
        /// Configured maximum width.
        max: f32,
    },
    /// The dip band of the population schedule is empty.
    #[error("population dip band {min}..{max} must not be empty")]
    DipBand {
        /// Configured inclusive lower bound.
        min: u32,
        /// Configured exclusive upper bound.
        max: u32,
    },
}

impl SessionConfig {
    /// Checks that the configuration describes a playable match.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.roster.defenders == self.roster.horde {
            return Err(ConfigError::SameTeams(self.roster.defenders.get()));
        }

        let intervals = [
            ("penalty period", self.penalty.period),
            ("spawn interval", self.director.spawn_interval),
            ("rule check interval", self.director.rule_check_interval),
            ("dip duration", self.director.schedule.dip_duration),
            ("recovery duration", self.director.schedule.recovery_duration),
        ];
        for (name, interval) in intervals {
            if interval.is_zero() {
                return Err(ConfigError::ZeroInterval(name));
            }
        }
        if self.deploy_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::ZeroInterval("deploy timeout"));
        }

        let director = &self.director;
        if !(0.0..=1.0).contains(&director.outpost_start)
            || !(0.0..=1.0).contains(&director.outpost_end)
            || director.outpost_start > director.outpost_end
        {
            return Err(ConfigError::OutpostBand {
                start: director.outpost_start,
                end: director.outpost_end,
            });
        }
        if director.lane_width_min < 0.0 || director.lane_width_min > director.lane_width_max {
            return Err(ConfigError::LaneWidth {
                min: director.lane_width_min,
                max: director.lane_width_max,
            });
        }
        if director.schedule.dip_min >= director.schedule.dip_max {
            return Err(ConfigError::DipBand {
                min: director.schedule.dip_min,
                max: director.schedule.dip_max,
            });
        }

        Ok(())
    }
}

/// Counters describing the horde at one moment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Registered horde units.
    pub instances: usize,
    /// Registered horde units that are alive.
    pub alive: usize,
    /// Spawn requests not yet deployed.
    pub waiting: usize,
    /// Current population target.
    pub target: u32,
}

/// Owner of every system taking part in one match.
#[derive(Debug)]
pub struct Session {
    ray_caster: RayCaster,
    spawner: SpawnBroker,
    interactions: InteractionTable<ObjectiveId>,
    object_ids: ObjectIdAllocator,
    modifiers: DeployModifiers,
    behavior: UnitBehaviorController,
    penalty: AntiStallPenalty,
    director: PopulationDirector,
    notifications: NotificationCenter,
    stats_cadence: Cadence,
}

impl Session {
    /// Validates `config`, emits the mode-start commands and begins objective setup.
    pub fn start(config: SessionConfig, out: &mut Vec<Command>) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut object_ids = ObjectIdAllocator::new();
        out.push(Command::SpawnObject {
            object: object_ids.allocate(),
            kind: ObjectKind::DeployCamera,
            position: config.defender_base,
            rotation: Vec3::new((-1.0f32).to_radians(), 0.0, 0.0),
        });
        let safety_area = object_ids.allocate();
        out.push(Command::SpawnObject {
            object: safety_area,
            kind: ObjectKind::SafetyAreaEffect,
            position: config.defender_base,
            rotation: Vec3::ZERO,
        });
        out.push(Command::EnableEffect {
            object: safety_area,
            enabled: true,
        });

        let spawner_config = SpawnBrokerConfig::new(config.spawner, config.roster.horde)
            .with_deploy_timeout(config.deploy_timeout);

        let mut session = Self {
            ray_caster: RayCaster::new(),
            spawner: SpawnBroker::new(spawner_config),
            interactions: InteractionTable::new(),
            object_ids,
            modifiers: DeployModifiers::new(config.roster, config.horde_base),
            behavior: UnitBehaviorController::new(
                config.behavior,
                config.roster,
                config.horde_base,
            ),
            penalty: AntiStallPenalty::new(config.penalty, config.defender_base),
            director: PopulationDirector::new(DirectorConfig {
                tuning: config.director,
                objective: config.objective,
                ground: config.ground,
                roster: config.roster,
                defender_base: config.defender_base,
                horde_base: config.horde_base,
                seed: config.seed,
            }),
            notifications: NotificationCenter::new(),
            stats_cadence: Cadence::new(STATS_INTERVAL),
        };

        let mut services = Services {
            ray_caster: &mut session.ray_caster,
            spawner: &mut session.spawner,
            interactions: &mut session.interactions,
            object_ids: &mut session.object_ids,
        };
        session.director.start(&mut services, out);

        log::info!(
            "horde defense session started with seed {} and spawner {}",
            config.seed,
            config.spawner.get()
        );
        Ok(session)
    }

    /// Routes one batch of host events through every system.
    pub fn handle(&mut self, events: &[Event], view: &ActorView, out: &mut Vec<Command>) {
        self.ray_caster.handle(events, out);
        self.spawner.handle(events, out);
        self.modifiers.handle(events, view, out);
        self.behavior.handle(events, view, out);
        self.penalty.handle(events, view, &mut self.behavior, out);

        let mut broadcasts = Vec::new();
        let mut services = Services {
            ray_caster: &mut self.ray_caster,
            spawner: &mut self.spawner,
            interactions: &mut self.interactions,
            object_ids: &mut self.object_ids,
        };
        self.director.handle(
            events,
            view,
            self.behavior.instance_count(),
            &mut services,
            out,
            &mut broadcasts,
        );

        self.notifications.handle(events, &mut self.object_ids, out);
        self.notifications.handle(&broadcasts, &mut self.object_ids, out);

        for event in events {
            if let Event::Tick { dt } = event {
                for _ in 0..self.stats_cadence.advance(*dt) {
                    let stats = self.stats(view);
                    log::debug!(
                        "horde instances {} alive {} waiting {} target {}",
                        stats.instances,
                        stats.alive,
                        stats.waiting,
                        stats.target
                    );
                }
            }
        }
    }

    /// Reports whether the match is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.director.is_active()
    }

    /// Current horde counters.
    #[must_use]
    pub fn stats(&self, view: &ActorView) -> SessionStats {
        SessionStats {
            instances: self.behavior.instance_count(),
            alive: self.behavior.alive_count(view),
            waiting: self.spawner.waiting_len(),
            target: self.director.target(),
        }
    }

    /// Population director of the match.
    #[must_use]
    pub fn director(&self) -> &PopulationDirector {
        &self.director
    }
}
