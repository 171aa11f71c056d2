#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Population director that lays out the objectives and keeps the horde topped up.
//!
//! The director runs in two stages. Setup places the core objective at the
//! horde base and a line of outposts between the bases, one brokered query at
//! a time. Once every objective stands, the director follows the population
//! target schedule, hands spawn quota to the surviving objectives on a fixed
//! period, and ends the match when the core objective falls.

mod schedule;

use std::{task::Poll, time::Duration};

use horde_defense_core::{
    ActorView, Cadence, Command, Event, ObjectIdAllocator, ObjectiveId, ObjectiveName, TeamRoster,
    Vec3, VoiceOverFlag, HALF_RATE,
};
use horde_defense_system_broker::{RayCaster, SpawnBroker};
use horde_defense_system_objective::{
    InteractionTable, ObjectiveController, ObjectiveSettings, ObjectiveTuning,
};
use horde_defense_system_placement::{
    ClearanceProbe, ClearanceQuery, GroundPlacement, GroundPlacementPlanner, GroundQuery,
    GroundTuning,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub use schedule::{ScheduleTuning, TargetSchedule};

/// Tuning parameters of the population director.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectorTuning {
    /// Number of outpost objectives placed between the bases.
    pub outpost_count: u32,
    /// Fraction of the base-to-base line where the first outpost stands.
    pub outpost_start: f32,
    /// Fraction of the base-to-base line where the last outpost stands.
    pub outpost_end: f32,
    /// Narrowest lane width assumed when walls are close.
    pub lane_width_min: f32,
    /// Widest lane width probed.
    pub lane_width_max: f32,
    /// Distance kept between an outpost and a lane wall.
    pub lane_margin: f32,
    /// Height above the lane line at which the side clearance is probed.
    pub lane_probe_height: f32,
    /// Countdown of the core objective.
    pub core_countdown: Duration,
    /// Countdown of every outpost.
    pub outpost_countdown: Duration,
    /// Time between spawn distributions.
    pub spawn_interval: Duration,
    /// Largest quota handed to one objective per distribution.
    pub max_spawn_per_objective: u32,
    /// Time between win condition checks.
    pub rule_check_interval: Duration,
    /// Population target oscillation.
    pub schedule: ScheduleTuning,
}

impl Default for DirectorTuning {
    fn default() -> Self {
        Self {
            outpost_count: 3,
            outpost_start: 0.3,
            outpost_end: 0.7,
            lane_width_min: 8.0,
            lane_width_max: 100.0,
            lane_margin: 2.0,
            lane_probe_height: 5.0,
            core_countdown: Duration::from_secs(30),
            outpost_countdown: Duration::from_secs(10),
            spawn_interval: Duration::from_secs(8),
            max_spawn_per_objective: 15,
            rule_check_interval: HALF_RATE,
            schedule: ScheduleTuning::default(),
        }
    }
}

/// Configuration parameters required to construct the director.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Director tuning.
    pub tuning: DirectorTuning,
    /// Tuning shared by every objective.
    pub objective: ObjectiveTuning,
    /// Ground detection tuning.
    pub ground: GroundTuning,
    /// Teams taking part in the match.
    pub roster: TeamRoster,
    /// Position of the defenders' base.
    pub defender_base: Vec3,
    /// Position of the horde base.
    pub horde_base: Vec3,
    /// Seed of the director's random stream.
    pub seed: u64,
}

/// Shared services the director drives objectives through.
#[derive(Debug)]
pub struct Services<'a> {
    /// Brokered ray caster used by placement.
    pub ray_caster: &'a mut RayCaster,
    /// Brokered spawner fed by objective quotas.
    pub spawner: &'a mut SpawnBroker,
    /// Interaction registrations of objective arm points.
    pub interactions: &'a mut InteractionTable<ObjectiveId>,
    /// Allocator of world object identifiers.
    pub object_ids: &'a mut ObjectIdAllocator,
}

#[derive(Debug)]
enum Phase {
    Idle,
    PlacingCore(GroundQuery),
    ProbingLane { index: u32, query: ClearanceQuery },
    PlacingOutpost { index: u32, query: GroundQuery },
    Running,
    Finished,
}

/// Counts of the horde population considered by a distribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Population {
    /// Units currently registered as live.
    pub live: usize,
    /// Spawn requests queued or in flight.
    pub pending_deploy: usize,
    /// Quota handed to objectives but not yet requested.
    pub undispensed: usize,
}

impl Population {
    /// Total population counted against the target.
    #[must_use]
    pub fn total(&self) -> usize {
        self.live + self.pending_deploy + self.undispensed
    }
}

/// Director of objective placement, horde population and the win condition.
#[derive(Debug)]
pub struct PopulationDirector {
    tuning: DirectorTuning,
    objective_tuning: ObjectiveTuning,
    roster: TeamRoster,
    defender_base: Vec3,
    horde_base: Vec3,
    planner: GroundPlacementPlanner,
    rng: ChaCha8Rng,
    phase: Phase,
    objectives: Vec<ObjectiveController>,
    core: Option<ObjectiveId>,
    schedule: TargetSchedule,
    spawn_cadence: Cadence,
    rule_cadence: Cadence,
}

impl PopulationDirector {
    /// Creates an idle director.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            tuning: config.tuning,
            objective_tuning: config.objective,
            roster: config.roster,
            defender_base: config.defender_base,
            horde_base: config.horde_base,
            planner: GroundPlacementPlanner::new(config.ground),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            phase: Phase::Idle,
            objectives: Vec::new(),
            core: None,
            schedule: TargetSchedule::new(config.tuning.schedule),
            spawn_cadence: Cadence::primed(config.tuning.spawn_interval),
            rule_cadence: Cadence::new(config.tuning.rule_check_interval),
        }
    }

    /// Starts the setup sequence by locating the ground at the horde base.
    pub fn start(&mut self, services: &mut Services<'_>, out: &mut Vec<Command>) {
        if !matches!(self.phase, Phase::Idle) {
            return;
        }
        log::info!("placing core objective near the horde base");
        let query = self
            .planner
            .detect_ground(self.horde_base, &mut self.rng, services.ray_caster, out);
        self.phase = Phase::PlacingCore(query);
    }

    /// Advances setup, objectives, the population schedule and the win check.
    ///
    /// `live_units` is the number of horde units currently registered.
    pub fn handle(
        &mut self,
        events: &[Event],
        view: &ActorView,
        live_units: usize,
        services: &mut Services<'_>,
        out: &mut Vec<Command>,
        broadcasts: &mut Vec<Event>,
    ) {
        for event in events {
            match event {
                Event::Tick { dt } => {
                    self.advance_setup(services, out);
                    for objective in &mut self.objectives {
                        objective.handle(
                            std::slice::from_ref(event),
                            view,
                            services.spawner,
                            services.interactions,
                            out,
                            broadcasts,
                        );
                    }
                    if matches!(self.phase, Phase::Running) {
                        self.run(*dt, live_units, services, out);
                    }
                }
                Event::Interact { actor, point } => {
                    let Some(id) = services.interactions.resolve(*point).copied() else {
                        continue;
                    };
                    if let Some(objective) = self.objective_mut(id) {
                        let _ = objective.arm(*actor, view, out, broadcasts);
                    }
                }
                _ => {}
            }
        }
    }

    /// Current population target.
    #[must_use]
    pub fn target(&self) -> u32 {
        self.schedule.target()
    }

    /// Reports whether the match is still being directed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self.phase, Phase::Finished)
    }

    /// Reports whether every objective has been placed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running)
    }

    /// Objectives placed so far, core first.
    #[must_use]
    pub fn objectives(&self) -> &[ObjectiveController] {
        &self.objectives
    }

    /// Identifier of the core objective once placed.
    #[must_use]
    pub fn core(&self) -> Option<ObjectiveId> {
        self.core
    }

    /// Population counted against the target right now.
    #[must_use]
    pub fn population(&self, live_units: usize, spawner: &SpawnBroker) -> Population {
        Population {
            live: live_units,
            pending_deploy: spawner.waiting_len(),
            undispensed: self
                .objectives
                .iter()
                .filter(|objective| objective.is_alive())
                .map(|objective| objective.spawn_quota() as usize)
                .sum(),
        }
    }

    fn objective_mut(&mut self, id: ObjectiveId) -> Option<&mut ObjectiveController> {
        self.objectives
            .iter_mut()
            .find(|objective| objective.id() == id)
    }

    fn advance_setup(&mut self, services: &mut Services<'_>, out: &mut Vec<Command>) {
        loop {
            let phase = std::mem::replace(&mut self.phase, Phase::Idle);
            self.phase = match phase {
                Phase::PlacingCore(mut query) => match query.poll(services.ray_caster) {
                    Poll::Ready(placement) => {
                        self.place_core(placement, services, out);
                        self.next_outpost(0, services, out)
                    }
                    Poll::Pending => {
                        self.phase = Phase::PlacingCore(query);
                        return;
                    }
                },
                Phase::ProbingLane { index, mut query } => {
                    match query.poll(services.ray_caster) {
                        Poll::Ready(clearance) => {
                            let (origin, right) = self.lane_probe(index);
                            let left_edge = origin - right * clearance.left;
                            let right_edge = origin + right * clearance.right;
                            let blend: f32 = self.rng.gen_range(0.0..1.0);
                            let approx = left_edge.lerp(right_edge, blend);
                            let query = self.planner.detect_ground(
                                approx,
                                &mut self.rng,
                                services.ray_caster,
                                out,
                            );
                            Phase::PlacingOutpost { index, query }
                        }
                        Poll::Pending => {
                            self.phase = Phase::ProbingLane { index, query };
                            return;
                        }
                    }
                }
                Phase::PlacingOutpost { index, mut query } => {
                    match query.poll(services.ray_caster) {
                        Poll::Ready(placement) => {
                            self.place_outpost(index, placement, services, out);
                            self.next_outpost(index + 1, services, out)
                        }
                        Poll::Pending => {
                            self.phase = Phase::PlacingOutpost { index, query };
                            return;
                        }
                    }
                }
                other => {
                    self.phase = other;
                    return;
                }
            };
        }
    }

    fn next_outpost(
        &mut self,
        index: u32,
        services: &mut Services<'_>,
        out: &mut Vec<Command>,
    ) -> Phase {
        if index >= self.tuning.outpost_count {
            log::info!(
                "setup complete with {} objectives, directing the horde",
                self.objectives.len()
            );
            return Phase::Running;
        }

        let (origin, right) = self.lane_probe(index);
        let probe = ClearanceProbe {
            origin,
            right,
            min: self.tuning.lane_width_min / 2.0,
            max: self.tuning.lane_width_max / 2.0,
            margin: self.tuning.lane_margin,
        };
        let query = self
            .planner
            .detect_side_clearance(probe, services.ray_caster, out);
        Phase::ProbingLane { index, query }
    }

    fn lane_probe(&self, index: u32) -> (Vec3, Vec3) {
        let t = outpost_fraction(
            index,
            self.tuning.outpost_count,
            self.tuning.outpost_start,
            self.tuning.outpost_end,
        );
        let direction = (self.horde_base - self.defender_base).normalize_or_zero();
        let right = if direction == Vec3::ZERO {
            Vec3::X
        } else {
            Vec3::new(direction.z, 0.0, -direction.x)
                .try_normalize()
                .unwrap_or(Vec3::X)
        };
        let midpoint = self.defender_base.lerp(self.horde_base, t);
        (midpoint + Vec3::Y * self.tuning.lane_probe_height, right)
    }

    fn place_core(
        &mut self,
        placement: GroundPlacement,
        services: &mut Services<'_>,
        out: &mut Vec<Command>,
    ) {
        let id = ObjectiveId::new(0);
        let settings = ObjectiveSettings {
            name: ObjectiveName::MainTarget,
            position: placement.position,
            orientation: placement.orientation,
            is_core: true,
            show_target_text: true,
            countdown: self.tuning.core_countdown,
            voice_over: VoiceOverFlag::from_index(self.tuning.outpost_count as usize),
        };
        self.spawn_objective(id, settings, services, out);
        self.core = Some(id);
    }

    fn place_outpost(
        &mut self,
        index: u32,
        placement: GroundPlacement,
        services: &mut Services<'_>,
        out: &mut Vec<Command>,
    ) {
        let settings = ObjectiveSettings {
            name: ObjectiveName::SubTarget,
            position: placement.position,
            orientation: placement.orientation,
            is_core: false,
            show_target_text: false,
            countdown: self.tuning.outpost_countdown,
            voice_over: VoiceOverFlag::from_index(index as usize),
        };
        self.spawn_objective(ObjectiveId::new(index + 1), settings, services, out);
    }

    fn spawn_objective(
        &mut self,
        id: ObjectiveId,
        settings: ObjectiveSettings,
        services: &mut Services<'_>,
        out: &mut Vec<Command>,
    ) {
        let objective = ObjectiveController::spawn(
            id,
            settings,
            self.objective_tuning,
            self.roster,
            services.object_ids,
            services.interactions,
            out,
        );
        self.objectives.push(objective);
    }

    fn run(
        &mut self,
        dt: Duration,
        live_units: usize,
        services: &mut Services<'_>,
        out: &mut Vec<Command>,
    ) {
        let _ = self.schedule.advance(dt, &mut self.rng);

        for _ in 0..self.spawn_cadence.advance(dt) {
            self.distribute(live_units, services.spawner);
        }

        for _ in 0..self.rule_cadence.advance(dt) {
            if self.core_destroyed() {
                log::info!("core objective destroyed, defenders win");
                out.push(Command::EndMatch {
                    winner: self.roster.defenders,
                });
                self.phase = Phase::Finished;
                return;
            }
        }
    }

    fn distribute(&mut self, live_units: usize, spawner: &SpawnBroker) {
        let population = self.population(live_units, spawner);
        let alive = self
            .objectives
            .iter()
            .filter(|objective| objective.is_alive())
            .count();
        let allotment = spawn_allotment(
            self.schedule.target() as usize,
            population.total(),
            alive,
            self.tuning.max_spawn_per_objective,
        );

        log::debug!(
            "target {} population {} alive objectives {} allotment {}",
            self.schedule.target(),
            population.total(),
            alive,
            allotment
        );

        if allotment == 0 {
            return;
        }
        for objective in self
            .objectives
            .iter_mut()
            .filter(|objective| objective.is_alive())
        {
            objective.add_quota(allotment);
        }
    }

    fn core_destroyed(&self) -> bool {
        self.core.map_or(false, |core| {
            self.objectives
                .iter()
                .any(|objective| objective.id() == core && !objective.is_alive())
        })
    }
}

/// Quota handed to every alive objective in one distribution.
///
/// The deficit between target and population is split evenly (rounding down)
/// and capped per objective. No deficit or no alive objective yields zero.
#[must_use]
pub fn spawn_allotment(target: usize, population: usize, alive: usize, cap: u32) -> u32 {
    if alive == 0 || population >= target {
        return 0;
    }
    let share = (target - population) / alive;
    u32::try_from(share).map_or(cap, |share| share.min(cap))
}

/// Fraction of the base-to-base line where outpost `index` stands.
#[must_use]
pub fn outpost_fraction(index: u32, count: u32, start: f32, end: f32) -> f32 {
    if count <= 1 {
        return start;
    }
    start + (end - start) * index as f32 / (count - 1) as f32
}
