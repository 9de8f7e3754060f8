//! Attack configuration and the aggregated outcome of one hit resolution.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    geometry::{Circle, Point, Ray, Rect, ShortRect},
    tiles::TileCoord,
    ObjectId,
};

/// Elemental flavour of an attack. `None` on a hit means neutral.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    /// Fire damage.
    Fire,
    /// Ice damage.
    Ice,
    /// Lightning damage.
    Lightning,
}

/// Passive damage applied to actors standing on a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchHit {
    /// Damage applied per contact.
    pub damage: f32,
    /// Element of the contact damage.
    pub element: Option<Element>,
}

/// Area an attack covers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitShape {
    /// Axis-aligned box.
    Box(Rect),
    /// Circle.
    Circle(Circle),
    /// Thick line segment.
    Line(Ray),
    /// Box that only reaches targets overlapping its vertical extent.
    Volume(ShortRect),
    /// Footprint of a single tile, used for contact damage.
    Tile(TileCoord),
}

impl HitShape {
    /// Smallest rectangle containing the shape.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Box(rect) => *rect,
            Self::Circle(circle) => circle.bounds(),
            Self::Line(ray) => ray.bounds(),
            Self::Volume(volume) => volume.rect,
            Self::Tile(coord) => coord.rect(),
        }
    }

    /// Point knockback radiates from.
    #[must_use]
    pub fn center(&self) -> Point {
        match self {
            Self::Circle(circle) => circle.center(),
            Self::Line(ray) => Point::new((ray.x1 + ray.x2) / 2.0, (ray.y1 + ray.y2) / 2.0),
            _ => self.bounds().center(),
        }
    }

    /// Returns a copy moved by the provided offset.
    #[must_use]
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        match *self {
            Self::Box(rect) => Self::Box(rect.translated(dx, dy)),
            Self::Circle(circle) => Self::Circle(Circle::new(circle.x + dx, circle.y + dy, circle.r)),
            Self::Line(ray) => Self::Line(Ray {
                x1: ray.x1 + dx,
                y1: ray.y1 + dy,
                x2: ray.x2 + dx,
                y2: ray.y2 + dy,
                r: ray.r,
            }),
            Self::Volume(volume) => Self::Volume(ShortRect {
                rect: volume.rect.translated(dx, dy),
                ..volume
            }),
            Self::Tile(coord) => Self::Tile(coord),
        }
    }
}

/// Direction rule for knockback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Knock {
    /// No knockback.
    #[default]
    None,
    /// Radially away from the centre of the hit shape.
    AwayFromHit,
    /// Radially away from an explicit point.
    AwayFrom(Point),
}

/// Something an attack can strike.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitTarget {
    /// A live object in the area.
    Object(ObjectId),
    /// A tile of the area.
    Tile(TileCoord),
}

/// One-shot configuration of an attack.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitProperties {
    /// Area covered by the attack; a hit without a shape strikes nothing.
    pub shape: Option<HitShape>,
    /// Damage before the target's element modifier.
    pub damage: f32,
    /// Element of the attack.
    pub element: Option<Element>,
    /// Strikes enemies.
    pub hit_enemies: bool,
    /// Strikes the hero and its clones.
    pub hit_allies: bool,
    /// Strikes generic objects.
    pub hit_objects: bool,
    /// Strikes tiles.
    pub hit_tiles: bool,
    /// Destroys cuttable ground tiles.
    pub cuts_ground: bool,
    /// Destroys destructible object tiles.
    pub destroys_objects: bool,
    /// Knockback direction rule.
    pub knock: Knock,
    /// Magnitude handed to targets alongside the knockback direction.
    pub knockback_strength: f32,
    /// Knockback is only applied when the attack can push.
    pub can_push: bool,
    /// Targets already struck during this activation.
    pub ignore_targets: BTreeSet<HitTarget>,
    /// Object that produced the attack; it never strikes itself.
    pub source: Option<ObjectId>,
}

/// Aggregated outcome of one resolution pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HitResult {
    /// Targets newly struck by this pass.
    pub hit_targets: BTreeSet<HitTarget>,
    /// Something was struck.
    pub hit: bool,
    /// A struck target asked the attack to stop propagating.
    pub stopped: bool,
}

impl HitResult {
    /// Folds another pass into this one.
    pub fn absorb(&mut self, other: HitResult) {
        self.hit |= other.hit;
        self.stopped |= other.stopped;
        self.hit_targets.extend(other.hit_targets);
    }
}
