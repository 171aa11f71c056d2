#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the horde defense control core.
//!
//! This crate defines the message surface that connects the host environment,
//! the per-match session, and the pure systems. The host feeds [`Event`]
//! values (frame ticks, spawn and ray-cast completions, interactions) together
//! with an immutable [`ActorView`] snapshot; systems react deterministically
//! and respond exclusively with [`Command`] batches describing the opaque host
//! primitives to invoke. Systems never call into the host directly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use glam::Vec3;

/// Duration of a single host frame (1/60 s).
pub const FRAME: Duration = Duration::from_nanos(16_666_667);

/// Duration of the half-rate scheduling period (1/30 s).
pub const HALF_RATE: Duration = Duration::from_nanos(33_333_333);

/// Commands that express every directive the core may issue to the host.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Spawns one AI unit through the host's single-concurrency spawner.
    SpawnUnit {
        /// Spawner that produces the unit.
        spawner: SpawnerId,
        /// Team the unit joins.
        team: TeamId,
        /// Optional soldier class; the host picks one when absent.
        class: Option<UnitClass>,
        /// Correlation token the host may echo in [`Event::UnitSpawned`].
        token: RequestId,
    },
    /// Casts a single line segment through the host's single-concurrency ray caster.
    CastRay {
        /// Start of the segment in world space.
        from: Vec3,
        /// End of the segment in world space.
        to: Vec3,
        /// Correlation token the host may echo in the hit or missed event.
        token: RequestId,
    },
    /// Moves an actor to a position and sets its yaw.
    Teleport {
        /// Actor being moved.
        actor: ActorId,
        /// Destination in world space.
        position: Vec3,
        /// Yaw in radians measured from the forward (+Z) axis.
        orientation: f32,
    },
    /// Kills an actor through the host's demise path.
    Kill {
        /// Actor to kill.
        actor: ActorId,
    },
    /// Applies damage to an actor.
    DealDamage {
        /// Actor receiving the damage.
        target: ActorId,
        /// Amount of damage applied.
        amount: f32,
        /// Actor credited with the damage.
        attacker: ActorId,
    },
    /// Removes an equipment slot from an actor's loadout.
    RemoveEquipment {
        /// Actor whose loadout is modified.
        actor: ActorId,
        /// Slot that is cleared.
        slot: InventorySlot,
    },
    /// Points an AI actor's aim at a world position.
    SetFocusPoint {
        /// AI actor being steered.
        actor: ActorId,
        /// Point the actor should look at.
        point: Vec3,
    },
    /// Orders an AI actor to path toward a position.
    MoveTo {
        /// AI actor being ordered.
        actor: ActorId,
        /// Destination of the move directive.
        position: Vec3,
    },
    /// Switches an AI actor to the host's free battlefield behaviour.
    EngageBattlefield {
        /// AI actor being switched.
        actor: ActorId,
    },
    /// Creates a world object (visual, audio or interaction element).
    SpawnObject {
        /// Identifier allocated by the core for the object.
        object: ObjectId,
        /// Kind of object to create.
        kind: ObjectKind,
        /// Position of the object in world space.
        position: Vec3,
        /// Euler rotation of the object in radians.
        rotation: Vec3,
    },
    /// Removes a previously spawned world object.
    UnspawnObject {
        /// Object to remove.
        object: ObjectId,
    },
    /// Enables or disables a visual or sound effect object.
    EnableEffect {
        /// Effect object being toggled.
        object: ObjectId,
        /// Whether the effect plays.
        enabled: bool,
    },
    /// Adjusts the volume of a sound effect object.
    SetSoundVolume {
        /// Sound object being adjusted.
        object: ObjectId,
        /// Linear volume in `0.0..=1.0`.
        volume: f32,
    },
    /// Configures a world icon's image and owning team.
    ConfigureWorldIcon {
        /// Icon object being configured.
        object: ObjectId,
        /// Image shown by the icon.
        image: IconImage,
        /// Team that sees the icon.
        owner: TeamId,
    },
    /// Updates the text attached to a world icon.
    SetWorldIconText {
        /// Icon object being updated.
        object: ObjectId,
        /// Symbolic text the host localises.
        text: IconText,
        /// Whether the text is shown.
        visible: bool,
    },
    /// Enables or disables an interaction point.
    EnableInteractPoint {
        /// Interaction point being toggled.
        object: ObjectId,
        /// Whether actors may interact with the point.
        enabled: bool,
    },
    /// Plays a voice line through a voice-over module object.
    PlayVoiceOver {
        /// Voice-over module that plays the line.
        object: ObjectId,
        /// Voice line to play.
        event: VoiceOverEvent,
        /// Phonetic flag identifying the objective in the line.
        flag: VoiceOverFlag,
    },
    /// Creates the notification text widget owned by a player.
    CreateNotificationWidget {
        /// Player who sees the widget.
        player: ActorId,
        /// Identifier allocated by the core for the widget.
        widget: ObjectId,
    },
    /// Shows a message in a notification widget.
    ShowNotification {
        /// Widget displaying the message.
        widget: ObjectId,
        /// Symbolic message the host localises.
        message: Message,
    },
    /// Hides a notification widget.
    HideNotification {
        /// Widget being hidden.
        widget: ObjectId,
    },
    /// Deletes a notification widget.
    DeleteWidget {
        /// Widget being deleted.
        widget: ObjectId,
    },
    /// Ends the match in favour of a team.
    EndMatch {
        /// Team declared the winner.
        winner: TeamId,
    },
}

/// Events delivered by the host or broadcast by the core after processing.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that one host frame elapsed.
    Tick {
        /// Duration of simulated time that elapsed in the frame.
        dt: Duration,
    },
    /// A human player joined the match.
    PlayerJoined {
        /// Actor that represents the player.
        player: ActorId,
    },
    /// A human player left the match.
    PlayerLeft {
        /// Actor that represented the player.
        player: ActorId,
    },
    /// The host spawner produced a unit that has not deployed yet.
    UnitSpawned {
        /// Newly spawned unit.
        unit: ActorId,
        /// Spawner that produced the unit.
        spawner: SpawnerId,
        /// Echo of the [`Command::SpawnUnit`] token, when the host provides one.
        token: Option<RequestId>,
    },
    /// An actor deployed into the world.
    ActorDeployed {
        /// Actor that deployed.
        actor: ActorId,
        /// Team the actor belongs to.
        team: TeamId,
    },
    /// An actor left the world (death or removal).
    ActorUndeployed {
        /// Actor that undeployed.
        actor: ActorId,
        /// Team the actor belonged to.
        team: TeamId,
    },
    /// The outstanding ray cast hit geometry.
    RayCastHit {
        /// World position of the hit.
        point: Vec3,
        /// Surface normal at the hit.
        normal: Vec3,
        /// Echo of the [`Command::CastRay`] token, when the host provides one.
        token: Option<RequestId>,
    },
    /// The outstanding ray cast hit nothing.
    RayCastMissed {
        /// Echo of the [`Command::CastRay`] token, when the host provides one.
        token: Option<RequestId>,
    },
    /// An actor used an interaction point.
    Interact {
        /// Actor that interacted.
        actor: ActorId,
        /// Interaction point that was used.
        point: ObjectId,
    },
    /// An objective was armed by an actor.
    ObjectiveArmed {
        /// Objective that was armed.
        objective: ObjectiveId,
        /// Actor that armed it.
        by: ActorId,
    },
    /// An objective's countdown completed and it was destroyed.
    ObjectiveDestroyed {
        /// Objective that was destroyed.
        objective: ObjectiveId,
        /// Actor that armed it.
        by: ActorId,
        /// Display name of the objective.
        name: ObjectiveName,
        /// Whether the objective was the core objective.
        is_core: bool,
    },
}

/// Identifier of a team as understood by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(u8);

impl TeamId {
    /// Creates a team identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

/// Pair of teams that take part in a horde defense match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TeamRoster {
    /// Human team that arms and destroys objectives.
    pub defenders: TeamId,
    /// AI-controlled horde team.
    pub horde: TeamId,
}

impl Default for TeamRoster {
    fn default() -> Self {
        Self {
            defenders: TeamId::new(1),
            horde: TeamId::new(2),
        }
    }
}

/// Unique identifier of an actor (human player or AI unit).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(u32);

impl ActorId {
    /// Creates a new actor identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a world object allocated by the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Creates a new object identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a placed objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectiveId(u32);

impl ObjectiveId {
    /// Creates a new objective identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a host AI spawner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpawnerId(u32);

impl SpawnerId {
    /// Creates a new spawner identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Correlation token attached to every brokered native call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    /// Creates a new request identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Monotonic allocator for [`ObjectId`] values owned by a session.
#[derive(Clone, Debug, Default)]
pub struct ObjectIdAllocator {
    next: u32,
}

impl ObjectIdAllocator {
    /// Creates an allocator that starts at identifier zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the next unused identifier.
    pub fn allocate(&mut self) -> ObjectId {
        let id = ObjectId::new(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

/// Soldier classes the host spawner understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitClass {
    /// Front-line assault class.
    Assault,
    /// Engineer class.
    Engineer,
    /// Support class.
    Support,
    /// Recon class.
    Recon,
}

/// Equipment slots that may be stripped from an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InventorySlot {
    /// Throwable gadget slot (grenades, smoke).
    Throwable,
}

/// Kinds of world objects the core asks the host to create.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Deploy camera overlooking the defenders' base.
    DeployCamera,
    /// Range indicator marking the defenders' protected area.
    SafetyAreaEffect,
    /// World icon marking an objective.
    WorldIcon,
    /// Interaction point used to arm an objective.
    InteractPoint,
    /// Ordnance crate prop representing an objective.
    OrdnanceCrate,
    /// 2D voice-over module.
    VoiceOverModule,
    /// Alarm sound played while an armed objective is contested.
    AlarmSound,
    /// Range indicator showing an armed objective's area.
    AreaEffect,
    /// Explosion effect played on destruction.
    ExplosionEffect,
}

/// Images a world icon can show.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IconImage {
    /// Bomb pictogram.
    Bomb,
}

/// Symbolic world icon text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IconText {
    /// Generic "target" label.
    Target,
    /// Countdown progress rendered as `percent.tenths%`.
    Progress {
        /// Whole percent in `0..=100`.
        percent: u32,
        /// Tenths digit in `0..=9`.
        tenths: u32,
    },
}

/// Voice lines played for objective milestones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoiceOverEvent {
    /// A friendly objective charge was armed.
    ArmFriendly,
    /// A friendly-armed objective was destroyed.
    DestroyedFriendly,
}

/// Phonetic flags that identify objectives in voice lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoiceOverFlag {
    /// Alpha.
    Alpha,
    /// Bravo.
    Bravo,
    /// Charlie.
    Charlie,
    /// Delta.
    Delta,
    /// Echo.
    Echo,
    /// Foxtrot.
    Foxtrot,
    /// Golf.
    Golf,
}

impl VoiceOverFlag {
    const ORDERED: [VoiceOverFlag; 7] = [
        VoiceOverFlag::Alpha,
        VoiceOverFlag::Bravo,
        VoiceOverFlag::Charlie,
        VoiceOverFlag::Delta,
        VoiceOverFlag::Echo,
        VoiceOverFlag::Foxtrot,
        VoiceOverFlag::Golf,
    ];

    /// Returns the flag for the objective at `index`, wrapping to [`VoiceOverFlag::Alpha`]
    /// once the phonetic list is exhausted.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self::ORDERED
            .get(index)
            .copied()
            .unwrap_or(VoiceOverFlag::Alpha)
    }
}

/// Display names of objectives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectiveName {
    /// The core objective that ends the match.
    MainTarget,
    /// An outpost objective.
    SubTarget,
}

/// Symbolic messages shown in player notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Message {
    /// Mission briefing shown on deploy.
    Briefing,
    /// An objective was armed by a player.
    BombArmed {
        /// Player who armed the objective.
        by: ActorId,
    },
    /// An objective was destroyed.
    TargetDestroyed {
        /// Player who armed the objective.
        by: ActorId,
        /// Name of the destroyed objective.
        target: ObjectiveName,
    },
}

/// Immutable representation of a single actor's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActorSnapshot {
    /// Unique identifier assigned to the actor.
    pub id: ActorId,
    /// Team the actor belongs to.
    pub team: TeamId,
    /// Whether the actor is alive.
    pub alive: bool,
    /// Position of the actor's feet in world space.
    pub position: Vec3,
    /// Position of the actor's eyes in world space.
    pub eye_position: Vec3,
    /// Linear velocity of the actor.
    pub velocity: Vec3,
    /// Unit vector the actor is facing.
    pub facing: Vec3,
}

/// Read-only snapshot describing every actor the host currently knows about.
///
/// Actors absent from the view no longer resolve; systems treat them as gone.
#[derive(Clone, Debug, Default)]
pub struct ActorView {
    snapshots: Vec<ActorSnapshot>,
}

impl ActorView {
    /// Creates a new actor view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<ActorSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        snapshots.dedup_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &ActorSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a single actor.
    #[must_use]
    pub fn get(&self, id: ActorId) -> Option<&ActorSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Reports whether the actor resolves and is alive.
    #[must_use]
    pub fn is_alive(&self, id: ActorId) -> bool {
        self.get(id).map_or(false, |snapshot| snapshot.alive)
    }

    /// Number of actors captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no actors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Fixed-period scheduler standing in for a cooperative loop that waits
/// `interval` between iterations.
///
/// Each call to [`Cadence::advance`] reports how many loop iterations became
/// due, so a single long frame never drops iterations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cadence {
    interval: Duration,
    accumulator: Duration,
}

impl Cadence {
    /// Creates a cadence whose first iteration becomes due after one full interval.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            accumulator: Duration::ZERO,
        }
    }

    /// Creates a cadence whose first iteration is due immediately.
    #[must_use]
    pub const fn primed(interval: Duration) -> Self {
        Self {
            interval,
            accumulator: interval,
        }
    }

    /// Interval between iterations.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Accumulates elapsed time and returns the number of iterations that became due.
    ///
    /// A zero interval never fires.
    pub fn advance(&mut self, dt: Duration) -> u32 {
        if self.interval.is_zero() {
            return 0;
        }

        self.accumulator = self.accumulator.saturating_add(dt);
        let mut iterations = 0;
        while self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            iterations += 1;
        }
        iterations
    }
}

/// Unit direction in the horizontal plane for a yaw expressed in degrees.
///
/// Zero degrees faces +Z, ninety degrees faces +X.
#[must_use]
pub fn yaw_direction(degrees: f32) -> Vec3 {
    let radians = degrees.to_radians();
    Vec3::new(radians.sin(), 0.0, radians.cos())
}

/// Yaw in radians of a direction vector, measured from +Z toward +X.
#[must_use]
pub fn heading_of(direction: Vec3) -> f32 {
    direction.x.atan2(direction.z)
}

/// Squared distance between two points ignoring height.
#[must_use]
pub fn planar_distance_squared(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz
}

/// Sums the frame durations carried by [`Event::Tick`] values.
#[must_use]
pub fn elapsed_in(events: &[Event]) -> Duration {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Tick { dt } => Some(*dt),
            _ => None,
        })
        .fold(Duration::ZERO, Duration::saturating_add)
}

/// Counts the [`Event::Tick`] values in a batch.
#[must_use]
pub fn frames_in(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, Event::Tick { .. }))
        .count()
}
