//! Live objects owned by an area and the capability traits they expose.
//!
//! Every object implements [`AreaObject`]. Optional behaviour (taking hits,
//! being pushed, grabbed or moved) is reached through the `as_*` accessors,
//! which return `None` for objects lacking the capability.

use std::{collections::BTreeMap, fmt, time::Duration};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use spiritfield_core::{Direction, Element, MovementProperties, ObjectId, Point, Rect};
use spiritfield_system_stats::{ModifiableStat, Modifier, ModifierHandle};

use crate::registries::ActorDefinition;

/// How long an actor flashes after taking damage.
pub const HURT_DURATION: Duration = Duration::from_millis(200);

/// Side length of a spawned pickup.
pub const PICKUP_SIZE: f32 = 8.0;

/// Targeting class an attack filters on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClass {
    /// Hostile actors.
    Enemy,
    /// The hero and its clones.
    Ally,
    /// Everything else.
    Object,
}

/// Inputs handed to a target when an attack strikes it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitContext {
    /// Damage after the target's element modifier.
    pub damage: f32,
    /// Element of the attack.
    pub element: Option<Element>,
    /// Point the attack radiates from.
    pub origin: Point,
    /// Knockback direction scaled by strength, if the attack pushes.
    pub knockback: Option<Vec2>,
    /// Object that produced the attack.
    pub source: Option<ObjectId>,
}

/// Target-side outcome of a hit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HitResponse {
    /// The target registered the hit.
    pub hit: bool,
    /// The attack should not propagate further.
    pub stopped: bool,
    /// The target blocked the hit.
    pub blocked: bool,
    /// The target ran out of life and should leave the area.
    pub defeated: bool,
}

/// Objects that react to attacks.
pub trait Hittable {
    /// Applies an attack to the object.
    fn on_hit(&mut self, context: &HitContext) -> HitResponse;
}

/// Objects the movement resolver can displace.
pub trait Movable {
    /// Moves the object by the provided offset.
    fn translate(&mut self, dx: f32, dy: f32);

    /// Capabilities used when the object moves.
    fn movement_properties(&self) -> &MovementProperties;

    /// Pending knockback displacement, cleared once taken.
    fn take_knockback(&mut self) -> Option<Vec2> {
        None
    }
}

/// Objects that slide when something pushes into them.
pub trait Pushable {
    /// Registers a push attempt; returns whether the object should move now.
    fn on_push(&mut self, direction: Direction) -> bool;

    /// Moves the object one pixel in the provided direction.
    fn nudge(&mut self, direction: Direction);
}

/// Objects an actor can pick up.
pub trait Grabbable {
    /// Attempts to grab the object; returns whether it is now held by `by`.
    fn on_grab(&mut self, by: ObjectId) -> bool;

    /// Releases the object.
    fn on_release(&mut self);

    /// Current holder of the object.
    fn held_by(&self) -> Option<ObjectId>;
}

/// Capability set shared by everything living in an area.
pub trait AreaObject: fmt::Debug {
    /// Definition key the object was spawned from.
    fn key(&self) -> &str;

    /// Targeting class.
    fn class(&self) -> ObjectClass;

    /// Collision footprint; objects without one are skipped by collision and hits.
    fn hitbox(&self) -> Option<Rect>;

    /// Blocks movement.
    fn is_solid(&self) -> bool {
        false
    }

    /// Hidden objects neither block nor get targeted.
    fn is_hidden(&self) -> bool {
        false
    }

    /// Damage multiplier applied to attacks of the provided element.
    fn element_modifier(&self, _element: Option<Element>) -> f32 {
        1.0
    }

    /// Loot table rolled when the object is destroyed.
    fn loot_table(&self) -> Option<&str> {
        None
    }

    /// Advances the object by one tick.
    fn update(&mut self, _dt: Duration) {}

    /// Hit capability.
    fn as_hittable_mut(&mut self) -> Option<&mut dyn Hittable> {
        None
    }

    /// Push capability.
    fn as_pushable_mut(&mut self) -> Option<&mut dyn Pushable> {
        None
    }

    /// Grab capability.
    fn as_grabbable_mut(&mut self) -> Option<&mut dyn Grabbable> {
        None
    }

    /// Movement capability.
    fn as_movable_mut(&mut self) -> Option<&mut dyn Movable> {
        None
    }

    /// Concrete actor view, for inspection.
    fn as_actor(&self) -> Option<&Actor> {
        None
    }
}

/// Hero, clone or enemy.
#[derive(Debug)]
pub struct Actor {
    key: String,
    class: ObjectClass,
    body: Rect,
    z: f32,
    life: f32,
    max_life: ModifiableStat,
    speed: ModifiableStat,
    resistances: BTreeMap<Element, f32>,
    shield: Option<Direction>,
    solid: bool,
    movement: MovementProperties,
    knockback: Option<Vec2>,
    damage_log: Vec<f32>,
    hurt_time: Duration,
}

impl Actor {
    /// Instantiates an actor template with its body's top-left corner at `at`.
    #[must_use]
    pub fn from_definition(key: &str, definition: &ActorDefinition, at: Point) -> Self {
        Self {
            key: key.to_owned(),
            class: definition.class,
            body: Rect::new(at.x, at.y, definition.width, definition.height),
            z: 0.0,
            life: 1.0,
            max_life: ModifiableStat::new(definition.max_life, Some(f32::EPSILON), None),
            speed: ModifiableStat::new(definition.speed, Some(0.0), None),
            resistances: definition.resistances.clone(),
            shield: definition.shield,
            solid: definition.solid,
            movement: definition.movement.clone(),
            knockback: None,
            damage_log: Vec::new(),
            hurt_time: Duration::ZERO,
        }
    }

    /// Top-left corner of the body.
    #[must_use]
    pub const fn position(&self) -> Point {
        Point::new(self.body.x, self.body.y)
    }

    /// Height above the ground.
    #[must_use]
    pub const fn z(&self) -> f32 {
        self.z
    }

    /// Remaining life in absolute units.
    #[must_use]
    pub fn life(&self) -> f32 {
        self.life * self.max_life.value()
    }

    /// Remaining life as a fraction of the maximum.
    #[must_use]
    pub const fn life_fraction(&self) -> f32 {
        self.life
    }

    /// Maximum life after modifiers.
    #[must_use]
    pub fn max_life(&self) -> f32 {
        self.max_life.value()
    }

    /// Movement speed after modifiers.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed.value()
    }

    /// Attaches a modifier to the maximum life.
    pub fn add_max_life_modifier(&mut self, modifier: Modifier) -> ModifierHandle {
        self.max_life.add_modifier(modifier)
    }

    /// Detaches a maximum life modifier.
    pub fn remove_max_life_modifier(&mut self, handle: ModifierHandle) -> bool {
        self.max_life.remove_modifier(handle)
    }

    /// Attaches a modifier to the speed.
    pub fn add_speed_modifier(&mut self, modifier: Modifier) -> ModifierHandle {
        self.speed.add_modifier(modifier)
    }

    /// Detaches a speed modifier.
    pub fn remove_speed_modifier(&mut self, handle: ModifierHandle) -> bool {
        self.speed.remove_modifier(handle)
    }

    /// Reports whether life has run out.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.life <= 0.0
    }

    /// Total damage taken so far.
    #[must_use]
    pub fn damage_taken(&self) -> f32 {
        self.damage_log.iter().sum()
    }

    /// Every damage amount taken, oldest first.
    #[must_use]
    pub fn damage_log(&self) -> &[f32] {
        &self.damage_log
    }

    /// Knockback waiting to be settled by the movement system.
    #[must_use]
    pub const fn pending_knockback(&self) -> Option<Vec2> {
        self.knockback
    }

    /// Direction the shield faces.
    #[must_use]
    pub const fn shield(&self) -> Option<Direction> {
        self.shield
    }

    /// Raises or lowers the shield.
    pub fn set_shield(&mut self, shield: Option<Direction>) {
        self.shield = shield;
    }

    /// Still flashing from a recent hit.
    #[must_use]
    pub fn is_hurt(&self) -> bool {
        !self.hurt_time.is_zero()
    }

    fn blocks_from(&self, origin: Point) -> bool {
        let Some(facing) = self.shield else {
            return false;
        };
        let center = self.body.center();
        let dx = origin.x - center.x;
        let dy = origin.y - center.y;
        let incoming = if dx.abs() >= dy.abs() {
            if dx < 0.0 {
                Direction::Left
            } else {
                Direction::Right
            }
        } else if dy < 0.0 {
            Direction::Up
        } else {
            Direction::Down
        };
        incoming == facing
    }
}

impl AreaObject for Actor {
    fn key(&self) -> &str {
        &self.key
    }

    fn class(&self) -> ObjectClass {
        self.class
    }

    fn hitbox(&self) -> Option<Rect> {
        Some(self.body)
    }

    fn is_solid(&self) -> bool {
        self.solid
    }

    fn element_modifier(&self, element: Option<Element>) -> f32 {
        element
            .and_then(|element| self.resistances.get(&element).copied())
            .unwrap_or(1.0)
    }

    fn update(&mut self, dt: Duration) {
        self.hurt_time = self.hurt_time.saturating_sub(dt);
    }

    fn as_hittable_mut(&mut self) -> Option<&mut dyn Hittable> {
        Some(self)
    }

    fn as_movable_mut(&mut self) -> Option<&mut dyn Movable> {
        Some(self)
    }

    fn as_actor(&self) -> Option<&Actor> {
        Some(self)
    }
}

impl Hittable for Actor {
    fn on_hit(&mut self, context: &HitContext) -> HitResponse {
        if self.is_defeated() {
            return HitResponse::default();
        }
        if self.blocks_from(context.origin) {
            return HitResponse {
                hit: true,
                stopped: true,
                blocked: true,
                defeated: false,
            };
        }

        if context.damage > 0.0 {
            self.life -= context.damage / self.max_life.value();
            self.damage_log.push(context.damage);
            self.hurt_time = HURT_DURATION;
        }
        if let Some(knockback) = context.knockback {
            self.knockback = Some(knockback);
        }
        HitResponse {
            hit: true,
            stopped: false,
            blocked: false,
            defeated: self.is_defeated(),
        }
    }
}

impl Movable for Actor {
    fn translate(&mut self, dx: f32, dy: f32) {
        self.body = self.body.translated(dx, dy);
    }

    fn movement_properties(&self) -> &MovementProperties {
        &self.movement
    }

    fn take_knockback(&mut self) -> Option<Vec2> {
        self.knockback.take()
    }
}

/// Static description of a block, pot, sign or similar object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleDefinition {
    /// Name of the object.
    pub key: String,
    /// Footprint of the object.
    pub body: Rect,
    /// Blocks movement.
    pub solid: bool,
    /// Invisible to collision and targeting.
    pub hidden: bool,
    /// Slides when pushed.
    pub pushable: bool,
    /// Consecutive pushes needed before each one pixel slide.
    pub push_delay: u32,
    /// Can be picked up.
    pub grabbable: bool,
    /// Shatters when hit.
    pub breakable: bool,
    /// Loot table rolled when shattered.
    pub loot_table: Option<String>,
}

/// Solid or decorative object.
#[derive(Clone, Debug, PartialEq)]
pub struct Obstacle {
    definition: ObstacleDefinition,
    push_progress: u32,
    held_by: Option<ObjectId>,
    broken: bool,
}

impl Obstacle {
    /// Instantiates an obstacle.
    #[must_use]
    pub fn new(definition: ObstacleDefinition) -> Self {
        Self {
            definition,
            push_progress: 0,
            held_by: None,
            broken: false,
        }
    }

    /// Reports whether the obstacle has shattered.
    #[must_use]
    pub const fn is_broken(&self) -> bool {
        self.broken
    }
}

impl AreaObject for Obstacle {
    fn key(&self) -> &str {
        &self.definition.key
    }

    fn class(&self) -> ObjectClass {
        ObjectClass::Object
    }

    fn hitbox(&self) -> Option<Rect> {
        Some(self.definition.body)
    }

    fn is_solid(&self) -> bool {
        self.definition.solid && self.held_by.is_none()
    }

    fn is_hidden(&self) -> bool {
        self.definition.hidden
    }

    fn loot_table(&self) -> Option<&str> {
        self.definition.loot_table.as_deref()
    }

    fn as_hittable_mut(&mut self) -> Option<&mut dyn Hittable> {
        if self.definition.breakable {
            Some(self)
        } else {
            None
        }
    }

    fn as_pushable_mut(&mut self) -> Option<&mut dyn Pushable> {
        if self.definition.pushable && self.held_by.is_none() {
            Some(self)
        } else {
            None
        }
    }

    fn as_grabbable_mut(&mut self) -> Option<&mut dyn Grabbable> {
        if self.definition.grabbable {
            Some(self)
        } else {
            None
        }
    }
}

impl Hittable for Obstacle {
    fn on_hit(&mut self, context: &HitContext) -> HitResponse {
        if self.broken || context.damage <= 0.0 {
            return HitResponse::default();
        }
        self.broken = true;
        HitResponse {
            hit: true,
            stopped: false,
            blocked: false,
            defeated: true,
        }
    }
}

impl Pushable for Obstacle {
    fn on_push(&mut self, _direction: Direction) -> bool {
        self.push_progress += 1;
        if self.push_progress > self.definition.push_delay {
            self.push_progress = 0;
            return true;
        }
        false
    }

    fn nudge(&mut self, direction: Direction) {
        let (dx, dy) = direction.delta();
        self.definition.body = self.definition.body.translated(dx as f32, dy as f32);
    }
}

impl Grabbable for Obstacle {
    fn on_grab(&mut self, by: ObjectId) -> bool {
        match self.held_by {
            Some(holder) => holder == by,
            None => {
                self.held_by = Some(by);
                true
            }
        }
    }

    fn on_release(&mut self) {
        self.held_by = None;
    }

    fn held_by(&self) -> Option<ObjectId> {
        self.held_by
    }
}

/// Loot lying on the ground.
#[derive(Clone, Debug, PartialEq)]
pub struct Pickup {
    item: String,
    body: Rect,
}

impl Pickup {
    /// Places an item centred on the provided point.
    #[must_use]
    pub fn centered_on(item: impl Into<String>, at: Point) -> Self {
        let half = PICKUP_SIZE / 2.0;
        Self {
            item: item.into(),
            body: Rect::new(at.x - half, at.y - half, PICKUP_SIZE, PICKUP_SIZE),
        }
    }

    /// Item key of the loot.
    #[must_use]
    pub fn item(&self) -> &str {
        &self.item
    }
}

impl AreaObject for Pickup {
    fn key(&self) -> &str {
        &self.item
    }

    fn class(&self) -> ObjectClass {
        ObjectClass::Object
    }

    fn hitbox(&self) -> Option<Rect> {
        Some(self.body)
    }
}
