#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Ground placement planner that snaps objectives onto terrain.
//!
//! Placement is driven entirely by brokered ray casts. The planner submits
//! every cast up front and returns a query object the caller polls on later
//! frames; the ray caster guarantees the casts execute one at a time in
//! submission order.

use std::task::Poll;

use horde_defense_core::{yaw_direction, Command, Vec3};
use horde_defense_system_broker::{RayCastResult, RayCaster, Ticket};
use rand::Rng;

/// Tuning parameters for ground detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundTuning {
    /// Height above the approximate position that casts start from.
    pub start_height: f32,
    /// Length of every downward cast.
    pub cast_distance: f32,
    /// Number of ring samples around the approximate position.
    pub check_count: u32,
    /// Radius of the sample ring.
    pub sample_radius: f32,
}

impl Default for GroundTuning {
    fn default() -> Self {
        Self {
            start_height: 10.0,
            cast_distance: 100.0,
            check_count: 8,
            sample_radius: 1.0,
        }
    }
}

/// Ground position and yaw chosen for an object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundPlacement {
    /// Point on the ground.
    pub position: Vec3,
    /// Yaw in radians aligning the object with the local slope.
    pub orientation: f32,
}

/// Distances available on either side of a lane probe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SideClearance {
    /// Clearance toward the probe's left.
    pub left: f32,
    /// Clearance toward the probe's right.
    pub right: f32,
}

/// Horizontal probe measuring how much room a lane has on either side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearanceProbe {
    /// Point the probe starts from.
    pub origin: Vec3,
    /// Unit vector pointing to the lane's right.
    pub right: Vec3,
    /// Smallest clearance reported for a hit.
    pub min: f32,
    /// Cast length and the clearance reported for a miss.
    pub max: f32,
    /// Distance kept away from any hit obstacle.
    pub margin: f32,
}

/// Pending ground detection.
#[derive(Debug)]
pub struct GroundQuery {
    approx: Vec3,
    samples: Vec<Sample>,
}

#[derive(Debug)]
struct Sample {
    ticket: Ticket<RayCastResult>,
    result: Option<RayCastResult>,
}

impl GroundQuery {
    /// Collects finished casts; ready once every sample has resolved.
    pub fn poll(&mut self, caster: &mut RayCaster) -> Poll<GroundPlacement> {
        let mut complete = true;
        for sample in &mut self.samples {
            if sample.result.is_none() {
                if let Poll::Ready(result) = caster.poll(&sample.ticket) {
                    sample.result = Some(result);
                }
            }
            complete &= sample.result.is_some();
        }

        if !complete {
            return Poll::Pending;
        }

        let hits: Vec<Vec3> = self
            .samples
            .iter()
            .filter_map(|sample| sample.result.and_then(|result| result.hit_point()))
            .collect();
        Poll::Ready(select_ground(self.approx, &hits))
    }
}

/// Pending side clearance measurement.
#[derive(Debug)]
pub struct ClearanceQuery {
    probe: ClearanceProbe,
    left: Ticket<RayCastResult>,
    right: Ticket<RayCastResult>,
    left_result: Option<RayCastResult>,
    right_result: Option<RayCastResult>,
}

impl ClearanceQuery {
    /// Collects both casts; ready once left and right have resolved.
    pub fn poll(&mut self, caster: &mut RayCaster) -> Poll<SideClearance> {
        if self.left_result.is_none() {
            if let Poll::Ready(result) = caster.poll(&self.left) {
                self.left_result = Some(result);
            }
        }
        if self.right_result.is_none() {
            if let Poll::Ready(result) = caster.poll(&self.right) {
                self.right_result = Some(result);
            }
        }

        match (self.left_result, self.right_result) {
            (Some(left), Some(right)) => Poll::Ready(SideClearance {
                left: clearance(&self.probe, left),
                right: clearance(&self.probe, right),
            }),
            _ => Poll::Pending,
        }
    }
}

/// Planner that converts approximate positions into grounded placements.
#[derive(Clone, Copy, Debug, Default)]
pub struct GroundPlacementPlanner {
    tuning: GroundTuning,
}

impl GroundPlacementPlanner {
    /// Creates a planner with the provided tuning.
    #[must_use]
    pub const fn new(tuning: GroundTuning) -> Self {
        Self { tuning }
    }

    /// Submits the casts that locate the ground around `approx`.
    ///
    /// One cast goes straight down from above `approx`, followed by a ring of
    /// casts whose starting angle is randomised so repeated placements do not
    /// always sample the same bearings.
    pub fn detect_ground<R>(
        &self,
        approx: Vec3,
        rng: &mut R,
        caster: &mut RayCaster,
        out: &mut Vec<Command>,
    ) -> GroundQuery
    where
        R: Rng + ?Sized,
    {
        let lift = Vec3::Y * self.tuning.start_height;
        let mut samples = Vec::with_capacity(self.tuning.check_count as usize + 1);
        samples.push(Sample {
            ticket: caster.cast(approx + lift, Vec3::NEG_Y, self.tuning.cast_distance, out),
            result: None,
        });

        if self.tuning.check_count > 0 {
            let angle_offset: f32 = rng.gen_range(0.0..360.0);
            let step = 360.0 / self.tuning.check_count as f32;
            for index in 0..self.tuning.check_count {
                let direction = yaw_direction(angle_offset + index as f32 * step);
                let origin = approx + direction * self.tuning.sample_radius + lift;
                samples.push(Sample {
                    ticket: caster.cast(origin, Vec3::NEG_Y, self.tuning.cast_distance, out),
                    result: None,
                });
            }
        }

        GroundQuery { approx, samples }
    }

    /// Submits a left cast then a right cast measuring the room beside `probe.origin`.
    pub fn detect_side_clearance(
        &self,
        probe: ClearanceProbe,
        caster: &mut RayCaster,
        out: &mut Vec<Command>,
    ) -> ClearanceQuery {
        let left = caster.cast(probe.origin, -probe.right, probe.max, out);
        let right = caster.cast(probe.origin, probe.right, probe.max, out);
        ClearanceQuery {
            probe,
            left,
            right,
            left_result: None,
            right_result: None,
        }
    }
}

/// Chooses a grounded placement from the hit points of a ground detection.
///
/// The position is the hit closest in height to the mean of all hits. The
/// yaw is the unsigned angle between forward and the planar direction from
/// the highest hit to the lowest. Without hits the approximate position is
/// kept with zero yaw.
#[must_use]
pub fn select_ground(approx: Vec3, hits: &[Vec3]) -> GroundPlacement {
    let Some(first) = hits.first().copied() else {
        return GroundPlacement {
            position: approx,
            orientation: 0.0,
        };
    };

    let mean = hits.iter().map(|hit| hit.y).sum::<f32>() / hits.len() as f32;

    let mut closest = first;
    let mut highest = first;
    let mut lowest = first;
    for hit in hits.iter().skip(1).copied() {
        if (hit.y - mean).abs() < (closest.y - mean).abs() {
            closest = hit;
        }
        if hit.y > highest.y {
            highest = hit;
        }
        if hit.y < lowest.y {
            lowest = hit;
        }
    }

    let slope = Vec3::new(lowest.x - highest.x, 0.0, lowest.z - highest.z);
    let orientation = if slope.length_squared() <= f32::EPSILON {
        0.0
    } else {
        Vec3::Z.angle_between(slope)
    };

    GroundPlacement {
        position: closest,
        orientation,
    }
}

fn clearance(probe: &ClearanceProbe, result: RayCastResult) -> f32 {
    match result.hit_point() {
        Some(point) => (probe.origin.distance(point) - probe.margin).max(probe.min),
        None => probe.max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_hits_keeps_approximate_position() {
        let approx = Vec3::new(3.0, 4.0, 5.0);
        assert_eq!(
            select_ground(approx, &[]),
            GroundPlacement {
                position: approx,
                orientation: 0.0,
            }
        );
    }

    #[test]
    fn flat_ground_has_zero_yaw() {
        let hits = [
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(0.0, 2.0, 1.0),
        ];
        let placement = select_ground(Vec3::ZERO, &hits);
        assert_eq!(placement.position, hits[0]);
        assert_eq!(placement.orientation, 0.0);
    }

    #[test]
    fn picks_hit_closest_to_mean_height() {
        let hits = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 4.0, 0.0),
            Vec3::new(0.0, 1.5, 1.0),
            Vec3::new(-1.0, 2.0, 0.0),
        ];
        let placement = select_ground(Vec3::ZERO, &hits);
        assert_eq!(placement.position, Vec3::new(0.0, 1.5, 1.0));
    }

    #[test]
    fn yaw_follows_slope_from_highest_to_lowest() {
        let hits = [
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(-1.0, 3.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
        ];
        let placement = select_ground(Vec3::ZERO, &hits);
        assert!((placement.orientation - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn clearance_is_clamped_by_margin_and_minimum() {
        let probe = ClearanceProbe {
            origin: Vec3::ZERO,
            right: Vec3::X,
            min: 8.0,
            max: 100.0,
            margin: 2.0,
        };
        let near = RayCastResult::Hit {
            point: Vec3::new(5.0, 0.0, 0.0),
            normal: Vec3::NEG_X,
        };
        let far = RayCastResult::Hit {
            point: Vec3::new(40.0, 0.0, 0.0),
            normal: Vec3::NEG_X,
        };
        assert_eq!(clearance(&probe, near), 8.0);
        assert_eq!(clearance(&probe, far), 38.0);
        assert_eq!(clearance(&probe, RayCastResult::Missed), 100.0);
    }
}
