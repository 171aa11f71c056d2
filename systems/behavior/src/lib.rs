#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-unit behaviour controller for the AI horde.
//!
//! Every deployed horde unit owns a small state machine that alternates
//! between pathing toward a target and the host's free battlefield
//! behaviour. The controller ticks once per host frame and reaps units whose
//! actor no longer resolves only after every unit has been updated.

use std::collections::BTreeMap;

use horde_defense_core::{
    planar_distance_squared, ActorId, ActorSnapshot, ActorView, Command, Event, TeamRoster, Vec3,
};

/// Behaviour a unit is currently running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Behavior {
    /// Pathing toward the target position.
    Move,
    /// Free battlefield behaviour driven by the host AI.
    Engage,
}

/// Frame-based intervals that drive every unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BehaviorTuning {
    /// Frames between behaviour toggles when no engagement happens.
    pub behavior_interval: u32,
    /// Frames between move directives while moving.
    pub move_update_interval: u32,
    /// Frames between nearest-defender searches.
    pub target_search_interval: u32,
    /// Distance below which a unit engages its target.
    pub battle_distance: f32,
}

impl Default for BehaviorTuning {
    fn default() -> Self {
        Self {
            behavior_interval: 120,
            move_update_interval: 30,
            target_search_interval: 120,
            battle_distance: 0.0,
        }
    }
}

/// State tracked for one live horde unit.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitAgent {
    target_unit: Option<ActorId>,
    target_position: Vec3,
    target_eye_position: Vec3,
    behavior: Behavior,
    behavior_elapsed: u32,
    move_update_elapsed: u32,
    target_search_elapsed: u32,
    penalty_stack: f32,
    kill_issued: bool,
}

impl UnitAgent {
    fn new(fallback: Vec3, tuning: &BehaviorTuning) -> Self {
        Self {
            target_unit: None,
            target_position: fallback,
            target_eye_position: fallback,
            behavior: Behavior::Move,
            behavior_elapsed: 0,
            move_update_elapsed: 0,
            target_search_elapsed: tuning.target_search_interval.saturating_sub(1),
            penalty_stack: 0.0,
            kill_issued: false,
        }
    }

    /// Defender the unit is currently chasing.
    #[must_use]
    pub fn target_unit(&self) -> Option<ActorId> {
        self.target_unit
    }

    /// Last known position of the target.
    #[must_use]
    pub fn target_position(&self) -> Vec3 {
        self.target_position
    }

    /// Behaviour the unit is currently running.
    #[must_use]
    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// Accumulated anti-stall penalty.
    #[must_use]
    pub fn penalty_stack(&self) -> f32 {
        self.penalty_stack
    }

    /// Replaces the anti-stall penalty, clamping it to be non-negative.
    pub fn set_penalty_stack(&mut self, value: f32) {
        self.penalty_stack = value.max(0.0);
    }

    /// Reports whether a kill has already been requested for the unit.
    #[must_use]
    pub fn kill_issued(&self) -> bool {
        self.kill_issued
    }

    /// Records that a kill was requested so it is not issued again.
    pub fn mark_kill_issued(&mut self) {
        self.kill_issued = true;
    }

    fn step(
        &mut self,
        me: &ActorSnapshot,
        view: &ActorView,
        context: &StepContext<'_>,
        out: &mut Vec<Command>,
    ) {
        let tuning = context.tuning;

        if let Some(target) = self.target_unit {
            if !view.is_alive(target) {
                self.target_unit = None;
            }
        }

        self.target_search_elapsed += 1;
        if self.target_search_elapsed >= tuning.target_search_interval {
            self.target_search_elapsed = 0;
            self.target_unit = context.nearest_defender(me.position, view);
        }

        if let Some(target) = self.target_unit.and_then(|id| view.get(id)) {
            self.target_position = target.position;
            self.target_eye_position = target.eye_position;
        }

        if self.behavior == Behavior::Move {
            out.push(Command::SetFocusPoint {
                actor: me.id,
                point: self.target_eye_position,
            });

            self.move_update_elapsed += 1;
            if self.move_update_elapsed >= tuning.move_update_interval {
                self.move_update_elapsed = 0;
                out.push(Command::MoveTo {
                    actor: me.id,
                    position: self.target_position,
                });
            }
        }

        let distance = me.position.distance(self.target_position);
        if self.target_unit.is_some() && distance < tuning.battle_distance {
            if self.behavior != Behavior::Engage {
                self.change_behavior(me.id, Behavior::Engage, out);
            }
            return;
        }

        self.behavior_elapsed += 1;
        if self.behavior_elapsed >= tuning.behavior_interval {
            self.behavior_elapsed = 0;
            self.target_unit = context.nearest_defender(me.position, view);
            if self.target_unit.is_none() {
                self.target_position = context.fallback_position;
                self.target_eye_position = context.fallback_position;
            }

            let next = match self.behavior {
                Behavior::Move => Behavior::Engage,
                Behavior::Engage => Behavior::Move,
            };
            self.change_behavior(me.id, next, out);
        }
    }

    fn change_behavior(&mut self, actor: ActorId, behavior: Behavior, out: &mut Vec<Command>) {
        self.behavior = behavior;
        match behavior {
            Behavior::Move => out.push(Command::MoveTo {
                actor,
                position: self.target_position,
            }),
            Behavior::Engage => out.push(Command::EngageBattlefield { actor }),
        }
    }
}

struct StepContext<'a> {
    tuning: &'a BehaviorTuning,
    roster: TeamRoster,
    fallback_position: Vec3,
}

impl StepContext<'_> {
    fn nearest_defender(&self, origin: Vec3, view: &ActorView) -> Option<ActorId> {
        let mut nearest: Option<(ActorId, f32)> = None;
        for snapshot in view.iter() {
            if snapshot.team != self.roster.defenders || !snapshot.alive {
                continue;
            }

            let distance = planar_distance_squared(origin, snapshot.position);
            if nearest.map_or(true, |(_, best)| distance < best) {
                nearest = Some((snapshot.id, distance));
            }
        }
        nearest.map(|(id, _)| id)
    }
}

/// Registry and driver of every live horde unit.
#[derive(Debug)]
pub struct UnitBehaviorController {
    tuning: BehaviorTuning,
    roster: TeamRoster,
    fallback_position: Vec3,
    units: BTreeMap<ActorId, UnitAgent>,
}

impl UnitBehaviorController {
    /// Creates an empty controller.
    ///
    /// `fallback_position` is where units head when no defender is alive.
    #[must_use]
    pub fn new(tuning: BehaviorTuning, roster: TeamRoster, fallback_position: Vec3) -> Self {
        Self {
            tuning,
            roster,
            fallback_position,
            units: BTreeMap::new(),
        }
    }

    /// Consumes deploy, undeploy and frame events and steers the horde.
    pub fn handle(&mut self, events: &[Event], view: &ActorView, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::ActorDeployed { actor, team } if *team == self.roster.horde => {
                    self.register(*actor, out);
                }
                Event::ActorUndeployed { actor, team } if *team == self.roster.horde => {
                    let _ = self.units.remove(actor);
                }
                Event::Tick { .. } => self.update(view, out),
                _ => {}
            }
        }
    }

    /// Number of registered units whose actor still exists.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.units.len()
    }

    /// Number of registered units that are alive in `view`.
    #[must_use]
    pub fn alive_count(&self, view: &ActorView) -> usize {
        self.units.keys().filter(|id| view.is_alive(**id)).count()
    }

    /// Looks up the agent of a registered unit.
    #[must_use]
    pub fn agent(&self, id: ActorId) -> Option<&UnitAgent> {
        self.units.get(&id)
    }

    /// Mutable access to every registered unit in identifier order.
    pub fn units_mut(&mut self) -> impl Iterator<Item = (ActorId, &mut UnitAgent)> {
        self.units.iter_mut().map(|(id, agent)| (*id, agent))
    }

    fn register(&mut self, actor: ActorId, out: &mut Vec<Command>) {
        let agent = UnitAgent::new(self.fallback_position, &self.tuning);
        out.push(Command::MoveTo {
            actor,
            position: agent.target_position,
        });
        let _ = self.units.insert(actor, agent);
    }

    fn update(&mut self, view: &ActorView, out: &mut Vec<Command>) {
        let context = StepContext {
            tuning: &self.tuning,
            roster: self.roster,
            fallback_position: self.fallback_position,
        };

        for (id, agent) in &mut self.units {
            let Some(me) = view.get(*id) else {
                continue;
            };
            if !me.alive {
                continue;
            }
            agent.step(me, view, &context, out);
        }

        let before = self.units.len();
        self.units.retain(|id, _| view.get(*id).is_some());
        let reaped = before - self.units.len();
        if reaped > 0 {
            log::debug!("reaped {reaped} horde units without an actor");
        }
    }
}
