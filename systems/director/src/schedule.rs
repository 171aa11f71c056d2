use std::time::Duration;

use rand::Rng;

/// Bounds and timings of the population target oscillation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduleTuning {
    /// Target held during the opening and every recovery phase.
    pub baseline: u32,
    /// Length of the opening phase.
    pub opening: Duration,
    /// Inclusive lower bound of the dip target.
    pub dip_min: u32,
    /// Exclusive upper bound of the dip target.
    pub dip_max: u32,
    /// Length of every dip phase.
    pub dip_duration: Duration,
    /// Length of every recovery phase.
    pub recovery_duration: Duration,
}

impl Default for ScheduleTuning {
    fn default() -> Self {
        Self {
            baseline: 80,
            opening: Duration::from_secs(30),
            dip_min: 30,
            dip_max: 50,
            dip_duration: Duration::from_secs(15),
            recovery_duration: Duration::from_secs(15),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SchedulePhase {
    Opening,
    Dip,
    Recovery,
}

/// Two-phase oscillation of the horde population target.
///
/// The baseline holds for the opening, then a random dip and a return to the
/// baseline alternate for as long as the schedule is advanced.
#[derive(Clone, Debug)]
pub struct TargetSchedule {
    tuning: ScheduleTuning,
    phase: SchedulePhase,
    remaining: Duration,
    target: u32,
}

impl TargetSchedule {
    /// Creates a schedule at the start of its opening phase.
    #[must_use]
    pub fn new(tuning: ScheduleTuning) -> Self {
        Self {
            tuning,
            phase: SchedulePhase::Opening,
            remaining: tuning.opening,
            target: tuning.baseline,
        }
    }

    /// Current population target.
    #[must_use]
    pub fn target(&self) -> u32 {
        self.target
    }

    /// Advances the schedule by `dt` and returns the resulting target.
    pub fn advance<R>(&mut self, dt: Duration, rng: &mut R) -> u32
    where
        R: Rng + ?Sized,
    {
        let mut dt = dt;
        while dt >= self.remaining {
            dt -= self.remaining;
            self.enter_next(rng);
            if self.remaining.is_zero() {
                break;
            }
        }
        self.remaining = self.remaining.saturating_sub(dt);
        self.target
    }

    fn enter_next<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        match self.phase {
            SchedulePhase::Opening | SchedulePhase::Recovery => {
                self.phase = SchedulePhase::Dip;
                self.remaining = self.tuning.dip_duration;
                self.target = if self.tuning.dip_max > self.tuning.dip_min {
                    rng.gen_range(self.tuning.dip_min..self.tuning.dip_max)
                } else {
                    self.tuning.dip_min
                };
            }
            SchedulePhase::Dip => {
                self.phase = SchedulePhase::Recovery;
                self.remaining = self.tuning.recovery_duration;
                self.target = self.tuning.baseline;
            }
        }
    }
}
