#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Spiritfield engine.
//!
//! This crate defines the vocabulary that connects adapters, the
//! authoritative world, and the systems. Adapters submit [`Command`] values
//! describing desired world mutations, the world executes them via its
//! `apply` entry point and broadcasts [`Event`] values. The movement,
//! targeting and combat systems work directly against an area using the
//! geometry, tile behavior and property types declared here, and report
//! their side effects as further events.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod geometry;
pub mod hit;
pub mod movement;
pub mod registry;
pub mod tiles;

pub use geometry::{Circle, PixelRect, Point, Ray, Rect, ShortRect, TILE_SIZE};
pub use hit::{Element, HitProperties, HitResult, HitShape, HitTarget, Knock, TouchHit};
pub use movement::MovementProperties;
pub use registry::{Registry, RegistryError};
pub use tiles::{DiagonalLedge, Ledges, MergePolicy, TileBehaviors, TileCoord, TileIndex};

/// Logical duration of one simulation tick.
pub const FRAME_LENGTH: Duration = Duration::from_millis(20);

/// Unique identifier assigned to an object by the area that owns it.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
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

/// Unique identifier assigned to a persistent effect by its area.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EffectId(u32);

impl EffectId {
    /// Creates a new effect identifier with the provided numeric value.
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

/// One of the two paired layers of the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Realm {
    /// The material world.
    Material,
    /// The spirit world.
    Spirit,
}

impl Realm {
    /// The paired counterpart of this realm.
    #[must_use]
    pub const fn alternate(self) -> Self {
        match self {
            Self::Material => Self::Spirit,
            Self::Spirit => Self::Material,
        }
    }
}

/// Cardinal directions on the collision plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Toward decreasing y.
    Up,
    /// Toward increasing y.
    Down,
    /// Toward decreasing x.
    Left,
    /// Toward increasing x.
    Right,
}

impl Direction {
    /// All four directions in a fixed order.
    pub const ALL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Unit pixel offset of a step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// The reverse direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Reports whether the direction moves along the y axis.
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }

    /// Direction of a one-axis step, if the offset is a pure step.
    #[must_use]
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        match (dx.signum(), dy.signum()) {
            (0, -1) => Some(Self::Up),
            (0, 1) => Some(Self::Down),
            (-1, 0) => Some(Self::Left),
            (1, 0) => Some(Self::Right),
            _ => None,
        }
    }
}

/// Description of a persistent attack effect to place into an area.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSpec {
    /// Attack applied every tick the effect lives.
    pub hit: HitProperties,
    /// Displacement of the hit shape per tick.
    pub velocity: Point,
    /// Number of ticks before the effect expires.
    pub ttl: u32,
    /// Keeps travelling after striking something.
    pub piercing: bool,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Command {
    /// Advances the simulation by one tick of [`FRAME_LENGTH`].
    Tick,
    /// Makes the provided realm the active one.
    SwitchRealm {
        /// Realm to activate.
        realm: Realm,
    },
    /// Spawns a registered actor definition.
    SpawnActor {
        /// Realm whose area receives the actor.
        realm: Realm,
        /// Registry key of the actor definition.
        key: String,
        /// Top-left corner of the actor's body.
        at: Point,
    },
    /// Removes an object from its area.
    RemoveObject {
        /// Realm owning the object.
        realm: Realm,
        /// Object to remove.
        object: ObjectId,
    },
    /// Writes a tile, mirroring the write into the alternate realm when the
    /// tile content was shared.
    SetTile {
        /// Realm to write.
        realm: Realm,
        /// Layer index inside the area.
        layer: usize,
        /// Tile to overwrite.
        coord: TileCoord,
        /// New tile index.
        tile: TileIndex,
    },
    /// Empties a tile in a single realm without mirroring.
    ClearTileInOneWorld {
        /// Realm to write.
        realm: Realm,
        /// Layer index inside the area.
        layer: usize,
        /// Tile to clear.
        coord: TileCoord,
    },
    /// Mirrors a tile change made in one realm into the alternate realm if
    /// the alternate still shows the previous tile.
    MirrorTileChange {
        /// Realm where the change originated.
        from: Realm,
        /// Layer index inside the area.
        layer: usize,
        /// Tile that changed.
        coord: TileCoord,
        /// Tile index before the change.
        previous: TileIndex,
        /// Tile index after the change.
        tile: TileIndex,
    },
    /// Rolls a loot table and spawns the result.
    DropLoot {
        /// Realm receiving the loot.
        realm: Realm,
        /// Registry key of the loot table.
        table: String,
        /// Point the loot appears at.
        at: Point,
    },
    /// Places a persistent attack effect into an area.
    SpawnEffect {
        /// Realm receiving the effect.
        realm: Realm,
        /// Effect description.
        effect: EffectSpec,
    },
}

/// Events broadcast after commands are applied or systems act on an area.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Event {
    /// The simulation clock advanced.
    TimeAdvanced {
        /// Index of the tick that completed.
        tick: u64,
        /// Logical duration of the tick.
        dt: Duration,
    },
    /// The active realm changed.
    RealmChanged {
        /// Newly active realm.
        realm: Realm,
    },
    /// An object joined an area.
    ObjectSpawned {
        /// Realm owning the object.
        realm: Realm,
        /// Identifier assigned by the area.
        object: ObjectId,
    },
    /// An object left its area.
    ObjectRemoved {
        /// Realm that owned the object.
        realm: Realm,
        /// Identifier of the removed object.
        object: ObjectId,
    },
    /// An attack struck a target.
    TargetHit {
        /// Realm of the attack.
        realm: Realm,
        /// Struck target.
        target: HitTarget,
        /// Damage after element modifiers.
        damage: f32,
        /// Element of the attack.
        element: Option<Element>,
    },
    /// A target blocked an attack.
    HitBlocked {
        /// Realm of the attack.
        realm: Realm,
        /// Blocking object.
        object: ObjectId,
    },
    /// An actor's life ran out.
    ActorDefeated {
        /// Realm of the actor.
        realm: Realm,
        /// Defeated actor.
        object: ObjectId,
    },
    /// A pushable object moved because something pushed it.
    ObjectPushed {
        /// Realm of the object.
        realm: Realm,
        /// Pushed object.
        object: ObjectId,
        /// Direction of the push.
        direction: Direction,
    },
    /// A tile index was overwritten.
    TileChanged {
        /// Realm of the tile.
        realm: Realm,
        /// Layer index inside the area.
        layer: usize,
        /// Changed tile.
        coord: TileCoord,
        /// Index before the write.
        previous: TileIndex,
        /// Index after the write.
        tile: TileIndex,
    },
    /// A tile was destroyed by an attack and swapped for its under tile.
    TileDestroyed {
        /// Realm of the tile.
        realm: Realm,
        /// Layer index inside the area.
        layer: usize,
        /// Destroyed tile.
        coord: TileCoord,
        /// Index before destruction.
        previous: TileIndex,
        /// Index that replaced it.
        replaced_with: TileIndex,
    },
    /// A sound should be played.
    SoundRequested {
        /// Sound key.
        sound: String,
    },
    /// A particle effect should be spawned.
    ParticlesRequested {
        /// Particle key.
        particles: String,
        /// World point of the effect.
        at: Point,
    },
    /// A loot table should be rolled.
    LootDropped {
        /// Realm of the drop.
        realm: Realm,
        /// Loot table key.
        table: String,
        /// World point of the drop.
        at: Point,
    },
    /// Loot appeared in the world.
    LootSpawned {
        /// Realm of the loot.
        realm: Realm,
        /// Pickup object holding the loot.
        object: ObjectId,
        /// Rolled item key.
        item: String,
    },
    /// A persistent effect joined an area.
    EffectSpawned {
        /// Realm of the effect.
        realm: Realm,
        /// Identifier assigned by the area.
        effect: EffectId,
    },
    /// A persistent effect ended.
    EffectExpired {
        /// Realm of the effect.
        realm: Realm,
        /// Identifier of the expired effect.
        effect: EffectId,
    },
}
