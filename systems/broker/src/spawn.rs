use std::{task::Poll, time::Duration};

use horde_defense_core::{
    ActorId, Command, Event, RequestId, SpawnerId, TeamId, UnitClass, Vec3,
};

use crate::{AsyncOpBroker, Ticket};

/// Placement and loadout of a unit to spawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRequest {
    /// Position the unit is teleported to once it deploys.
    pub position: Vec3,
    /// Yaw in radians applied on deploy.
    pub orientation: f32,
    /// Optional soldier class; the host picks one when absent.
    pub class: Option<UnitClass>,
    /// Team the unit joins.
    pub team: TeamId,
}

/// Outcome of a spawn request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// The unit deployed and was moved to the requested placement.
    Deployed(ActorId),
    /// The unit did not deploy within the configured timeout.
    TimedOut,
}

/// Configuration parameters required to construct the spawn broker.
#[derive(Clone, Copy, Debug)]
pub struct SpawnBrokerConfig {
    spawner: SpawnerId,
    team: TeamId,
    deploy_timeout: Option<Duration>,
}

impl SpawnBrokerConfig {
    /// Creates a configuration for the given host spawner and deploying team.
    #[must_use]
    pub const fn new(spawner: SpawnerId, team: TeamId) -> Self {
        Self {
            spawner,
            team,
            deploy_timeout: None,
        }
    }

    /// Gives up on an in-flight request that has not deployed within `timeout`.
    #[must_use]
    pub const fn with_deploy_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.deploy_timeout = timeout;
        self
    }
}

/// Broker that serialises unit spawns through a single host spawner.
///
/// A request stays in flight from the native spawn call until the matching
/// unit deploys. The unit is matched through the spawner's spawned event and
/// its echoed correlation token; when the host never reports the spawned unit
/// the first deploy on the broker's team is accepted.
///
/// A deploy timeout only settles the caller's ticket with
/// [`SpawnOutcome::TimedOut`]. The native spawn keeps the spawner busy until
/// its unit deploys, and that late unit is left where the host put it.
#[derive(Debug)]
pub struct SpawnBroker {
    spawner: SpawnerId,
    team: TeamId,
    deploy_timeout: Option<Duration>,
    broker: AsyncOpBroker<SpawnRequest, SpawnOutcome>,
    pending_unit: Option<ActorId>,
    in_flight_elapsed: Duration,
    timed_out: bool,
}

impl SpawnBroker {
    /// Creates an idle spawn broker.
    #[must_use]
    pub fn new(config: SpawnBrokerConfig) -> Self {
        Self {
            spawner: config.spawner,
            team: config.team,
            deploy_timeout: config.deploy_timeout,
            broker: AsyncOpBroker::new(),
            pending_unit: None,
            in_flight_elapsed: Duration::ZERO,
            timed_out: false,
        }
    }

    /// Queues a spawn whose outcome the caller will poll.
    pub fn request(
        &mut self,
        request: SpawnRequest,
        out: &mut Vec<Command>,
    ) -> Ticket<SpawnOutcome> {
        self.broker.submit(request, issue(self.spawner, out))
    }

    /// Queues a spawn whose outcome nobody awaits.
    pub fn request_detached(&mut self, request: SpawnRequest, out: &mut Vec<Command>) -> RequestId {
        self.broker.submit_detached(request, issue(self.spawner, out))
    }

    /// Consumes spawner, deploy and frame events.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::UnitSpawned {
                    unit,
                    spawner,
                    token,
                } => self.on_unit_spawned(*unit, *spawner, *token),
                Event::ActorDeployed { actor, team } => self.on_actor_deployed(*actor, *team, out),
                Event::Tick { dt } => self.on_tick(*dt),
                _ => {}
            }
        }
    }

    /// Takes the outcome of a finished request.
    pub fn poll(&mut self, ticket: &Ticket<SpawnOutcome>) -> Poll<SpawnOutcome> {
        self.broker.poll(ticket)
    }

    /// Requests not yet deployed, including the one in flight.
    #[must_use]
    pub fn waiting_len(&self) -> usize {
        self.broker.outstanding_len()
    }

    /// Unit recorded as spawned for the in-flight request, if any.
    #[must_use]
    pub fn pending_unit(&self) -> Option<ActorId> {
        self.pending_unit
    }

    fn on_unit_spawned(&mut self, unit: ActorId, spawner: SpawnerId, token: Option<RequestId>) {
        if spawner != self.spawner {
            return;
        }

        let Some(in_flight) = self.broker.in_flight() else {
            return;
        };

        if token.map_or(true, |token| token == in_flight) {
            self.pending_unit = Some(unit);
        }
    }

    fn on_actor_deployed(&mut self, actor: ActorId, team: TeamId, out: &mut Vec<Command>) {
        if team != self.team {
            return;
        }

        let Some(request) = self.broker.in_flight_params().copied() else {
            return;
        };

        if self.pending_unit.map_or(false, |unit| unit != actor) {
            return;
        }

        if self.timed_out {
            log::debug!(
                "unit {} deployed after its spawn request timed out",
                actor.get()
            );
        } else {
            out.push(Command::Teleport {
                actor,
                position: request.position,
                orientation: request.orientation,
            });
        }
        self.finish(SpawnOutcome::Deployed(actor), out);
    }

    fn on_tick(&mut self, dt: Duration) {
        let Some(timeout) = self.deploy_timeout else {
            return;
        };

        if self.broker.is_idle() || self.timed_out {
            return;
        }

        self.in_flight_elapsed = self.in_flight_elapsed.saturating_add(dt);
        if self.in_flight_elapsed >= timeout {
            log::warn!(
                "spawner {} did not deploy a unit within {:?}",
                self.spawner.get(),
                timeout
            );
            self.timed_out = true;
            let _ = self.broker.settle_in_flight(SpawnOutcome::TimedOut);
        }
    }

    fn finish(&mut self, outcome: SpawnOutcome, out: &mut Vec<Command>) {
        self.pending_unit = None;
        self.in_flight_elapsed = Duration::ZERO;
        self.timed_out = false;
        let _ = self.broker.complete(outcome, issue(self.spawner, out));
    }
}

fn issue(spawner: SpawnerId, out: &mut Vec<Command>) -> impl FnOnce(RequestId, &SpawnRequest) + '_ {
    move |token, request| {
        out.push(Command::SpawnUnit {
            spawner,
            team: request.team,
            class: request.class,
            token,
        })
    }
}
