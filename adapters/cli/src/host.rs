use std::{
    collections::{BTreeMap, VecDeque},
    time::Duration,
};

use horde_defense_core::{
    ActorId, ActorSnapshot, ActorView, Command, Event, ObjectId, ObjectKind, RequestId,
    SpawnerId, TeamId, TeamRoster, Vec3, FRAME,
};
use horde_defense_session::{ConfigError, Session, SessionConfig};

const FIRST_DEFENDER: u32 = 1;
const FIRST_HORDE_UNIT: u32 = 1_000;
const UNIT_HEALTH: f32 = 100.0;
const EYE_HEIGHT: f32 = 1.6;
const CORPSE_LIFETIME: Duration = Duration::from_secs(1);
const INTERACT_RANGE: f32 = 1.5;
const DEFENDER_SPACING: f32 = 2.0;
const RAY_STEPS: u32 = 128;
const RAY_REFINEMENT: u32 = 16;

/// Shape of the simulated battlefield and the scripted defenders.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct HostConfig {
    /// Number of scripted defenders that join the match.
    pub(crate) defenders: u32,
    /// Distance from the lane centre line to each wall.
    pub(crate) lane_half_width: f32,
    /// Peak height of the rolling terrain.
    pub(crate) hill_height: f32,
    /// Horizontal scale of the rolling terrain.
    pub(crate) hill_wavelength: f32,
    /// Walking speed of defenders in metres per second.
    pub(crate) defender_speed: f32,
    /// Walking speed of horde units in metres per second.
    pub(crate) horde_speed: f32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            defenders: 2,
            lane_half_width: 30.0,
            hill_height: 1.5,
            hill_wavelength: 40.0,
            defender_speed: 8.0,
            horde_speed: 5.0,
        }
    }
}

/// Summary of one simulated match.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MatchReport {
    pub(crate) winner: Option<TeamId>,
    pub(crate) elapsed: Duration,
    pub(crate) objectives_destroyed: usize,
    pub(crate) horde_spawned: u32,
    pub(crate) horde_killed: u32,
    pub(crate) commands: usize,
}

/// Analytic heightfield between two vertical lane walls.
#[derive(Clone, Copy, Debug)]
struct Terrain {
    lane_half_width: f32,
    hill_height: f32,
    hill_wavelength: f32,
}

impl Terrain {
    fn height(&self, x: f32, z: f32) -> f32 {
        let scale = self.hill_wavelength.max(f32::EPSILON);
        self.hill_height * (x / scale).sin() * (z / scale).cos()
    }

    fn ground(&self, position: Vec3) -> Vec3 {
        Vec3::new(position.x, self.height(position.x, position.z), position.z)
    }

    fn normal(&self, x: f32, z: f32) -> Vec3 {
        let e = 0.01;
        let dx = (self.height(x + e, z) - self.height(x - e, z)) / (2.0 * e);
        let dz = (self.height(x, z + e) - self.height(x, z - e)) / (2.0 * e);
        Vec3::new(-dx, 1.0, -dz).normalize()
    }

    /// First surface crossed by the segment, as hit point and normal.
    fn cast(&self, from: Vec3, to: Vec3) -> Option<(Vec3, Vec3)> {
        let wall = self.wall_hit(from, to);
        let ground = self.ground_hit(from, to);
        let nearest = match (wall, ground) {
            (Some(wall), Some(ground)) => Some(if wall.0 <= ground.0 { wall } else { ground }),
            (hit, None) | (None, hit) => hit,
        };
        nearest.map(|(_, point, normal)| (point, normal))
    }

    fn wall_hit(&self, from: Vec3, to: Vec3) -> Option<(f32, Vec3, Vec3)> {
        let dx = to.x - from.x;
        if dx.abs() < f32::EPSILON {
            return None;
        }
        [-1.0f32, 1.0]
            .into_iter()
            .filter_map(|side| {
                let t = (side * self.lane_half_width - from.x) / dx;
                (0.0..=1.0)
                    .contains(&t)
                    .then(|| (t, from.lerp(to, t), Vec3::new(-side, 0.0, 0.0)))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    fn ground_hit(&self, from: Vec3, to: Vec3) -> Option<(f32, Vec3, Vec3)> {
        let clearance = |t: f32| {
            let point = from.lerp(to, t);
            point.y - self.height(point.x, point.z)
        };
        if clearance(0.0) < 0.0 {
            return None;
        }

        let mut previous = 0.0;
        for step in 1..=RAY_STEPS {
            let t = step as f32 / RAY_STEPS as f32;
            if clearance(t) <= 0.0 {
                let (mut above, mut below) = (previous, t);
                for _ in 0..RAY_REFINEMENT {
                    let mid = (above + below) / 2.0;
                    if clearance(mid) > 0.0 {
                        above = mid;
                    } else {
                        below = mid;
                    }
                }
                let point = from.lerp(to, below);
                return Some((below, point, self.normal(point.x, point.z)));
            }
            previous = t;
        }
        None
    }
}

#[derive(Clone, Debug)]
struct HostActor {
    team: TeamId,
    alive: bool,
    health: f32,
    position: Vec3,
    velocity: Vec3,
    facing: Vec3,
    destination: Option<Vec3>,
    speed: f32,
    dead_for: Duration,
}

impl HostActor {
    fn new(team: TeamId, position: Vec3, speed: f32) -> Self {
        Self {
            team,
            alive: true,
            health: UNIT_HEALTH,
            position,
            velocity: Vec3::ZERO,
            facing: Vec3::Z,
            destination: None,
            speed,
            dead_for: Duration::ZERO,
        }
    }

    fn snapshot(&self, id: ActorId) -> ActorSnapshot {
        ActorSnapshot {
            id,
            team: self.team,
            alive: self.alive,
            position: self.position,
            eye_position: self.position + Vec3::Y * EYE_HEIGHT,
            velocity: self.velocity,
            facing: self.facing,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct WorldObject {
    kind: ObjectKind,
    position: Vec3,
    enabled: bool,
}

#[derive(Clone, Copy, Debug, Default)]
struct DefenderScript {
    target: Option<ObjectId>,
    interacted: bool,
}

/// Deterministic headless host that drives a [`Session`] frame by frame.
///
/// Ray casts, spawns and deploys are answered on the frame after the command
/// that requested them, one spawn at a time.
#[derive(Debug)]
pub(crate) struct SimulatedHost {
    session: Session,
    roster: TeamRoster,
    config: HostConfig,
    terrain: Terrain,
    horde_spawn: Vec3,
    actors: BTreeMap<ActorId, HostActor>,
    objects: BTreeMap<ObjectId, WorldObject>,
    scripts: BTreeMap<ActorId, DefenderScript>,
    inbox: Vec<Event>,
    spawn_queue: VecDeque<(SpawnerId, TeamId, RequestId)>,
    deploying: Option<(ActorId, TeamId)>,
    next_unit: u32,
    winner: Option<TeamId>,
    elapsed: Duration,
    horde_spawned: u32,
    horde_killed: u32,
    commands: usize,
}

impl SimulatedHost {
    /// Starts the session and joins the scripted defenders.
    pub(crate) fn new(session: SessionConfig, config: HostConfig) -> Result<Self, ConfigError> {
        let mut out = Vec::new();
        let started = Session::start(session, &mut out)?;
        let terrain = Terrain {
            lane_half_width: config.lane_half_width,
            hill_height: config.hill_height,
            hill_wavelength: config.hill_wavelength,
        };

        let mut host = Self {
            session: started,
            roster: session.roster,
            config,
            terrain,
            horde_spawn: terrain.ground(session.horde_base),
            actors: BTreeMap::new(),
            objects: BTreeMap::new(),
            scripts: BTreeMap::new(),
            inbox: Vec::new(),
            spawn_queue: VecDeque::new(),
            deploying: None,
            next_unit: FIRST_HORDE_UNIT,
            winner: None,
            elapsed: Duration::ZERO,
            horde_spawned: 0,
            horde_killed: 0,
            commands: 0,
        };
        host.apply(out);

        for index in 0..config.defenders {
            let player = ActorId::new(FIRST_DEFENDER + index);
            host.inbox.push(Event::PlayerJoined { player });
        }
        for index in 0..config.defenders {
            let player = ActorId::new(FIRST_DEFENDER + index);
            let offset = Vec3::X * (index as f32 - (config.defenders as f32 - 1.0) / 2.0);
            let position = terrain.ground(session.defender_base + offset * DEFENDER_SPACING);
            let _ = host.actors.insert(
                player,
                HostActor::new(session.roster.defenders, position, config.defender_speed),
            );
            let _ = host.scripts.insert(player, DefenderScript::default());
            host.inbox.push(Event::ActorDeployed {
                actor: player,
                team: session.roster.defenders,
            });
        }

        log::info!(
            "simulated host ready with {} defenders and lanes {} m wide",
            config.defenders,
            config.lane_half_width * 2.0
        );
        Ok(host)
    }

    /// Runs frames until a winner is declared or `limit` of simulated time passes.
    pub(crate) fn run(mut self, limit: Duration) -> MatchReport {
        while self.winner.is_none() && self.elapsed < limit {
            self.step();
        }
        self.report()
    }

    fn report(&self) -> MatchReport {
        MatchReport {
            winner: self.winner,
            elapsed: self.elapsed,
            objectives_destroyed: self
                .session
                .director()
                .objectives()
                .iter()
                .filter(|objective| !objective.is_alive())
                .count(),
            horde_spawned: self.horde_spawned,
            horde_killed: self.horde_killed,
            commands: self.commands,
        }
    }

    fn step(&mut self) {
        let mut events = std::mem::take(&mut self.inbox);
        self.advance_spawner(&mut events);
        self.script_defenders(&mut events);
        self.move_actors(FRAME);
        self.remove_corpses(FRAME, &mut events);
        events.push(Event::Tick { dt: FRAME });

        let view = self.view();
        let mut out = Vec::new();
        self.session.handle(&events, &view, &mut out);
        self.apply(out);
        self.elapsed += FRAME;
    }

    fn view(&self) -> ActorView {
        ActorView::from_snapshots(
            self.actors
                .iter()
                .map(|(id, actor)| actor.snapshot(*id))
                .collect(),
        )
    }

    fn advance_spawner(&mut self, events: &mut Vec<Event>) {
        if let Some((unit, team)) = self.deploying.take() {
            let speed = if team == self.roster.defenders {
                self.config.defender_speed
            } else {
                self.config.horde_speed
            };
            let _ = self
                .actors
                .insert(unit, HostActor::new(team, self.horde_spawn, speed));
            self.horde_spawned += 1;
            events.push(Event::ActorDeployed { actor: unit, team });
            return;
        }

        if let Some((spawner, team, token)) = self.spawn_queue.pop_front() {
            let unit = ActorId::new(self.next_unit);
            self.next_unit += 1;
            self.deploying = Some((unit, team));
            events.push(Event::UnitSpawned {
                unit,
                spawner,
                token: Some(token),
            });
        }
    }

    fn script_defenders(&mut self, events: &mut Vec<Event>) {
        for (id, script) in &mut self.scripts {
            let Some(actor) = self.actors.get_mut(id).filter(|actor| actor.alive) else {
                continue;
            };

            if script
                .target
                .map_or(true, |target| !self.objects.contains_key(&target))
            {
                script.target = nearest_enabled_point(&self.objects, actor.position);
                script.interacted = false;
            }
            let Some(target) = script.target else {
                actor.destination = None;
                continue;
            };
            let Some(point) = self.objects.get(&target) else {
                continue;
            };

            actor.destination = Some(point.position);
            let reached = planar(point.position - actor.position).length() <= INTERACT_RANGE;
            if reached && point.enabled && !script.interacted {
                script.interacted = true;
                events.push(Event::Interact {
                    actor: *id,
                    point: target,
                });
            }
        }
    }

    fn move_actors(&mut self, dt: Duration) {
        let seconds = dt.as_secs_f32();
        for actor in self.actors.values_mut() {
            actor.velocity = Vec3::ZERO;
            if !actor.alive {
                continue;
            }
            let Some(destination) = actor.destination else {
                continue;
            };

            let delta = planar(destination - actor.position);
            let distance = delta.length();
            if distance <= f32::EPSILON {
                continue;
            }
            let stride = actor.speed * seconds;
            let travelled = if distance <= stride {
                delta
            } else {
                delta / distance * stride
            };
            actor.position = self.terrain.ground(actor.position + travelled);
            actor.velocity = travelled / seconds;
            actor.facing = delta / distance;
        }
    }

    fn remove_corpses(&mut self, dt: Duration, events: &mut Vec<Event>) {
        let mut removed = Vec::new();
        for (id, actor) in &mut self.actors {
            if actor.alive {
                continue;
            }
            actor.dead_for += dt;
            if actor.dead_for >= CORPSE_LIFETIME {
                removed.push((*id, actor.team));
            }
        }
        for (actor, team) in removed {
            let _ = self.actors.remove(&actor);
            events.push(Event::ActorUndeployed { actor, team });
        }
    }

    fn apply(&mut self, commands: Vec<Command>) {
        self.commands += commands.len();
        for command in commands {
            match command {
                Command::SpawnUnit {
                    spawner,
                    team,
                    token,
                    ..
                } => self.spawn_queue.push_back((spawner, team, token)),
                Command::CastRay { from, to, token } => {
                    let event = match self.terrain.cast(from, to) {
                        Some((point, normal)) => Event::RayCastHit {
                            point,
                            normal,
                            token: Some(token),
                        },
                        None => Event::RayCastMissed { token: Some(token) },
                    };
                    self.inbox.push(event);
                }
                Command::Teleport {
                    actor,
                    position,
                    orientation,
                } => {
                    if let Some(actor) = self.actors.get_mut(&actor) {
                        actor.position = position;
                        actor.facing = Vec3::new(orientation.sin(), 0.0, orientation.cos());
                    }
                }
                Command::Kill { actor } => self.kill(actor),
                Command::DealDamage { target, amount, .. } => {
                    let lethal = self.actors.get_mut(&target).map_or(false, |actor| {
                        actor.health -= amount;
                        actor.health <= 0.0
                    });
                    if lethal {
                        self.kill(target);
                    }
                }
                Command::MoveTo { actor, position } => {
                    if let Some(actor) = self.actors.get_mut(&actor) {
                        actor.destination = Some(position);
                    }
                }
                Command::SpawnObject {
                    object,
                    kind,
                    position,
                    ..
                } => {
                    let _ = self.objects.insert(
                        object,
                        WorldObject {
                            kind,
                            position,
                            enabled: false,
                        },
                    );
                }
                Command::UnspawnObject { object } => {
                    let _ = self.objects.remove(&object);
                }
                Command::EnableInteractPoint { object, enabled }
                | Command::EnableEffect { object, enabled } => {
                    if let Some(object) = self.objects.get_mut(&object) {
                        object.enabled = enabled;
                    }
                }
                Command::EndMatch { winner } => {
                    log::info!(
                        "team {} wins after {:.1} s",
                        winner.get(),
                        self.elapsed.as_secs_f32()
                    );
                    self.winner = Some(winner);
                }
                other => log::trace!("host ignores {other:?}"),
            }
        }
    }

    fn kill(&mut self, id: ActorId) {
        let Some(actor) = self.actors.get_mut(&id).filter(|actor| actor.alive) else {
            return;
        };
        actor.alive = false;
        actor.destination = None;
        if actor.team == self.roster.horde {
            self.horde_killed += 1;
        }
    }
}

fn planar(vector: Vec3) -> Vec3 {
    Vec3::new(vector.x, 0.0, vector.z)
}

fn nearest_enabled_point(
    objects: &BTreeMap<ObjectId, WorldObject>,
    from: Vec3,
) -> Option<ObjectId> {
    objects
        .iter()
        .filter(|(_, object)| object.kind == ObjectKind::InteractPoint && object.enabled)
        .min_by(|(_, a), (_, b)| {
            planar(a.position - from)
                .length_squared()
                .total_cmp(&planar(b.position - from).length_squared())
        })
        .map(|(id, _)| *id)
}
