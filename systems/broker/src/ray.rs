use std::task::Poll;

use horde_defense_core::{Command, Event, RequestId, Vec3};

use crate::{AsyncOpBroker, Ticket};

/// Line segment submitted to the host ray caster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaySegment {
    /// Start of the segment in world space.
    pub from: Vec3,
    /// End of the segment in world space.
    pub to: Vec3,
}

/// Outcome of a single ray cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RayCastResult {
    /// The segment hit geometry.
    Hit {
        /// World position of the hit.
        point: Vec3,
        /// Surface normal at the hit.
        normal: Vec3,
    },
    /// The segment hit nothing.
    Missed,
}

impl RayCastResult {
    /// Hit position, when the cast hit anything.
    #[must_use]
    pub fn hit_point(&self) -> Option<Vec3> {
        match self {
            Self::Hit { point, .. } => Some(*point),
            Self::Missed => None,
        }
    }
}

/// Ray caster that serialises casts through the host's single-cast primitive.
#[derive(Debug, Default)]
pub struct RayCaster {
    broker: AsyncOpBroker<RaySegment, RayCastResult>,
}

impl RayCaster {
    /// Creates an idle ray caster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a cast between two points.
    pub fn cast_between(
        &mut self,
        from: Vec3,
        to: Vec3,
        out: &mut Vec<Command>,
    ) -> Ticket<RayCastResult> {
        self.broker.submit(RaySegment { from, to }, issue(out))
    }

    /// Queues a cast of `distance` metres from `origin` along `direction`.
    pub fn cast(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        distance: f32,
        out: &mut Vec<Command>,
    ) -> Ticket<RayCastResult> {
        self.cast_between(origin, origin + direction * distance, out)
    }

    /// Consumes host ray cast completions.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::RayCastHit {
                    point,
                    normal,
                    token,
                } => {
                    let result = RayCastResult::Hit {
                        point: *point,
                        normal: *normal,
                    };
                    let _ = self.broker.complete_for(*token, result, issue(out));
                }
                Event::RayCastMissed { token } => {
                    let _ = self
                        .broker
                        .complete_for(*token, RayCastResult::Missed, issue(out));
                }
                _ => {}
            }
        }
    }

    /// Takes the result of a finished cast.
    pub fn poll(&mut self, ticket: &Ticket<RayCastResult>) -> Poll<RayCastResult> {
        self.broker.poll(ticket)
    }

    /// Casts not yet completed, including the one in flight.
    #[must_use]
    pub fn outstanding_len(&self) -> usize {
        self.broker.outstanding_len()
    }

    /// Reports whether no cast is in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.broker.is_idle()
    }
}

fn issue(out: &mut Vec<Command>) -> impl FnOnce(RequestId, &RaySegment) + '_ {
    move |token, segment| {
        out.push(Command::CastRay {
            from: segment.from,
            to: segment.to,
            token,
        })
    }
}
