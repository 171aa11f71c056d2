#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Anti-stall penalty system that removes horde units which stop making progress.
//!
//! On a fixed period every live unit is inspected. Units inside the
//! defenders' protected area are pushed back out and penalised heavily,
//! units that barely move are penalised lightly, and units that did neither
//! see their penalty decay. A unit whose penalty exceeds the kill threshold is
//! killed through the host's demise path.

use std::time::Duration;

use horde_defense_core::{heading_of, ActorView, Cadence, Command, Event, Vec3, HALF_RATE};
use horde_defense_system_behavior::UnitBehaviorController;

/// Tuning parameters of the anti-stall check.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PenaltyTuning {
    /// Time between checks.
    pub period: Duration,
    /// Radius around the defenders' base that horde units may not enter.
    pub base_safety_radius: f32,
    /// Speed below which a unit counts as stalled.
    pub speed_threshold: f32,
    /// Penalty removed per second when a check adds nothing.
    pub decay_rate: f32,
    /// Penalty above which the unit is killed.
    pub kill_threshold: f32,
    /// Penalty per second spent inside the protected area.
    pub intrusion_weight: f32,
    /// Penalty per second spent stalled.
    pub stall_weight: f32,
}

impl Default for PenaltyTuning {
    fn default() -> Self {
        Self {
            period: HALF_RATE,
            base_safety_radius: 8.0,
            speed_threshold: 0.01,
            decay_rate: 0.5,
            kill_threshold: 10.0,
            intrusion_weight: 10.0,
            stall_weight: 1.0,
        }
    }
}

/// Periodic anti-stall check over every registered horde unit.
#[derive(Debug)]
pub struct AntiStallPenalty {
    tuning: PenaltyTuning,
    base: Vec3,
    cadence: Cadence,
}

impl AntiStallPenalty {
    /// Creates the check guarding the defenders' base at `base`.
    #[must_use]
    pub fn new(tuning: PenaltyTuning, base: Vec3) -> Self {
        Self {
            tuning,
            base,
            cadence: Cadence::new(tuning.period),
        }
    }

    /// Advances the check on frame events and penalises registered units.
    pub fn handle(
        &mut self,
        events: &[Event],
        view: &ActorView,
        units: &mut UnitBehaviorController,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            if let Event::Tick { dt } = event {
                for _ in 0..self.cadence.advance(*dt) {
                    self.check(view, units, out);
                }
            }
        }
    }

    fn check(&self, view: &ActorView, units: &mut UnitBehaviorController, out: &mut Vec<Command>) {
        let period = self.tuning.period.as_secs_f32();
        let radius = self.tuning.base_safety_radius;

        for (id, agent) in units.units_mut() {
            let Some(snapshot) = view.get(id) else {
                continue;
            };
            if !snapshot.alive {
                continue;
            }

            let mut added = 0.0;

            if self.base.distance(snapshot.position) < radius {
                let direction = (snapshot.position - self.base).try_normalize().unwrap_or(Vec3::Z);
                let mut destination = self.base + direction * (radius + 0.1);
                destination.y = snapshot.position.y;
                out.push(Command::Teleport {
                    actor: id,
                    position: destination,
                    orientation: heading_of(snapshot.facing),
                });
                added += period * self.tuning.intrusion_weight;
            }

            if snapshot.velocity.length() < self.tuning.speed_threshold {
                added += period * self.tuning.stall_weight;
            }

            agent.set_penalty_stack(next_penalty(
                agent.penalty_stack(),
                added,
                period,
                &self.tuning,
            ));

            if agent.penalty_stack() > self.tuning.kill_threshold && !agent.kill_issued() {
                agent.mark_kill_issued();
                log::debug!("killing stalled horde unit {}", id.get());
                out.push(Command::Kill { actor: id });
            }
        }
    }
}

/// Penalty after one check that added `added` to `stack`.
///
/// When nothing was added the stack decays instead. The result is never negative.
#[must_use]
pub fn next_penalty(stack: f32, added: f32, period: f32, tuning: &PenaltyTuning) -> f32 {
    let next = if added == 0.0 {
        stack - period * tuning.decay_rate
    } else {
        stack + added
    };
    next.max(0.0)
}
