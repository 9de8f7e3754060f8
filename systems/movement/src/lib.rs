#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pixel-stepped movement and collision against an area's terrain and objects.
//!
//! Every query snaps the hitbox onto the pixel grid and inspects the row or
//! column of pixels the hitbox would enter with a one pixel step. A step is
//! refused when one of those pixels climbs a ledge, is solid or hazardous
//! terrain the mover cannot handle, or is covered by a solid object.

use glam::Vec2;
use spiritfield_core::{
    geometry::pixel, Direction, Event, MovementProperties, ObjectId, PixelRect, Point, Rect,
    TileCoord,
};
use spiritfield_world::AreaInstance;

pub mod terrain;

use terrain::{ledge_crossing, level_change, Crossing};

/// Why a step was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockReason {
    /// Solid terrain.
    Solid,
    /// A pit or pit wall and the mover cannot fall.
    Pit,
    /// Water and the mover cannot swim.
    Water,
    /// The step climbs a ledge.
    Ledge,
    /// A solid object.
    Object,
    /// The step leaves the mover's bounding box.
    Bounds,
    /// The step enters one of the mover's blocked boxes.
    BlockedBox,
}

/// Description of what refused a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Blocker {
    /// Rule that refused the step.
    pub reason: BlockReason,
    /// Blocking object, when an object was responsible.
    pub object: Option<ObjectId>,
}

impl Blocker {
    const fn terrain(reason: BlockReason) -> Self {
        Self {
            reason,
            object: None,
        }
    }
}

/// Permitted one pixel step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    /// Direction of the step.
    pub direction: Direction,
    /// The step drops down a ledge.
    pub descends: bool,
}

/// How a leading pixel relates to the ledges around the mover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EdgeClass {
    Level,
    /// The step itself climbs a ledge.
    Low,
    /// The step itself drops down a ledge.
    High,
    /// The pixel sits higher than the body's anchor.
    Under,
    /// The pixel sits lower than the body's anchor.
    Above,
}

fn footprint(hitbox: &Rect) -> PixelRect {
    let pixels = hitbox.to_pixels();
    PixelRect {
        w: pixels.w.max(1),
        h: pixels.h.max(1),
        ..pixels
    }
}

/// Pixels a one pixel step in `direction` would enter.
fn leading_edge(pixels: PixelRect, direction: Direction) -> impl Iterator<Item = (i32, i32)> {
    let (fixed, start, end) = match direction {
        Direction::Up => (pixels.y - 1, pixels.x, pixels.right()),
        Direction::Down => (pixels.bottom() + 1, pixels.x, pixels.right()),
        Direction::Left => (pixels.x - 1, pixels.y, pixels.bottom()),
        Direction::Right => (pixels.right() + 1, pixels.y, pixels.bottom()),
    };
    let vertical = direction.is_vertical();
    (start..=end).map(move |along| {
        if vertical {
            (along, fixed)
        } else {
            (fixed, along)
        }
    })
}

/// The two rows (vertical moves) or columns (horizontal moves) straddling
/// the middle of the hitbox along the axis of the step.
const fn anchors(pixels: PixelRect, direction: Direction) -> (i32, i32) {
    if direction.is_vertical() {
        (pixels.y + (pixels.h - 1) / 2, pixels.y + pixels.h / 2)
    } else {
        (pixels.x + (pixels.w - 1) / 2, pixels.x + pixels.w / 2)
    }
}

/// Classifies a leading pixel against the pixel it vacates and against the
/// body's anchor in the same column (vertical steps) or row (horizontal
/// steps).
///
/// A pixel higher than the anchor means the body is pushing up a ledge it
/// has not climbed. A body overlapping a ledge it walks alongside has no
/// ledge between its anchor and the leading pixel and stays level.
fn classify(
    area: &AreaInstance,
    (px, py): (i32, i32),
    direction: Direction,
    (first_anchor, last_anchor): (i32, i32),
) -> EdgeClass {
    let (dx, dy) = direction.delta();
    match ledge_crossing(area, px - dx, py - dy, direction) {
        Some(Crossing::Ascent) => return EdgeClass::Low,
        Some(Crossing::Descent) => return EdgeClass::High,
        None => {}
    }

    let anchor = if direction.is_vertical() {
        (px, py.clamp(first_anchor, last_anchor))
    } else {
        (px.clamp(first_anchor, last_anchor), py)
    };
    match level_change(area, anchor, (px, py)) {
        0 => EdgeClass::Level,
        level if level > 0 => EdgeClass::Under,
        _ => EdgeClass::Above,
    }
}

/// Reports what, if anything, prevents a mover from occupying a pixel.
///
/// Pixels outside the grid are open terrain; only the mover's own boxes and
/// objects can block them.
#[must_use]
pub fn is_movement_blocked(
    area: &AreaInstance,
    point: Point,
    properties: &MovementProperties,
) -> Option<Blocker> {
    let (px, py) = (pixel(point.x), pixel(point.y));

    if let Some(bounds) = &properties.bounding_box {
        if !bounds.to_pixels().contains(px, py) {
            return Some(Blocker::terrain(BlockReason::Bounds));
        }
    }
    if properties
        .blocked_boxes
        .iter()
        .any(|blocked| blocked.to_pixels().contains(px, py))
    {
        return Some(Blocker::terrain(BlockReason::BlockedBox));
    }

    if let Some(behaviors) = area.behavior_at(TileCoord::of_pixel(px, py)) {
        if terrain::is_solid_pixel(behaviors, px, py, properties.needs_full_tile) {
            let passes_wall = properties.can_pass_medium_walls && behaviors.is_medium_wall();
            let climbs = properties.can_climb && behaviors.climbable;
            if !passes_wall && !climbs {
                return Some(Blocker::terrain(BlockReason::Solid));
            }
        }
        if (behaviors.pit || behaviors.pit_wall) && !properties.can_fall && !properties.can_fly {
            return Some(Blocker::terrain(BlockReason::Pit));
        }
        if behaviors.water && !properties.can_swim && !properties.can_fly {
            return Some(Blocker::terrain(BlockReason::Water));
        }
    }

    area.objects()
        .filter(|(id, object)| {
            object.is_solid()
                && !object.is_hidden()
                && !properties.excluded_objects.contains(id)
        })
        .find(|(_, object)| {
            object
                .hitbox()
                .map_or(false, |hitbox| hitbox.to_pixels().contains(px, py))
        })
        .map(|(id, _)| Blocker {
            reason: BlockReason::Object,
            object: Some(id),
        })
}

/// Decides whether the hitbox may advance one pixel in `direction`.
pub fn check_move(
    area: &AreaInstance,
    hitbox: &Rect,
    direction: Direction,
    properties: &MovementProperties,
) -> Result<Step, Blocker> {
    let pixels = footprint(hitbox);
    let anchors = anchors(pixels, direction);

    let mut descends = false;
    for leading in leading_edge(pixels, direction) {
        match classify(area, leading, direction, anchors) {
            EdgeClass::Low | EdgeClass::Under if !properties.can_fly => {
                return Err(Blocker::terrain(BlockReason::Ledge));
            }
            EdgeClass::High => descends = true,
            _ => {}
        }
    }

    for (px, py) in leading_edge(pixels, direction) {
        if let Some(blocker) =
            is_movement_blocked(area, Point::new(px as f32, py as f32), properties)
        {
            return Err(blocker);
        }
    }

    Ok(Step {
        direction,
        descends,
    })
}

/// Reports whether the hitbox may move one pixel up.
#[must_use]
pub fn can_move_up(area: &AreaInstance, hitbox: &Rect, properties: &MovementProperties) -> bool {
    check_move(area, hitbox, Direction::Up, properties).is_ok()
}

/// Reports whether the hitbox may move one pixel down.
#[must_use]
pub fn can_move_down(area: &AreaInstance, hitbox: &Rect, properties: &MovementProperties) -> bool {
    check_move(area, hitbox, Direction::Down, properties).is_ok()
}

/// Reports whether the hitbox may move one pixel left.
#[must_use]
pub fn can_move_left(area: &AreaInstance, hitbox: &Rect, properties: &MovementProperties) -> bool {
    check_move(area, hitbox, Direction::Left, properties).is_ok()
}

/// Reports whether the hitbox may move one pixel right.
#[must_use]
pub fn can_move_right(area: &AreaInstance, hitbox: &Rect, properties: &MovementProperties) -> bool {
    check_move(area, hitbox, Direction::Right, properties).is_ok()
}

/// Unit vector pointing off the ledge the hitbox hangs over, or zero.
///
/// Four anchors sit diagonally around the hitbox centre; every anchor lying
/// lower than the centre pulls the vector toward itself.
#[must_use]
pub fn get_jump_vector(area: &AreaInstance, hitbox: &Rect) -> Vec2 {
    let pixels = footprint(hitbox);
    let center = (pixels.x + pixels.w / 2, pixels.y + pixels.h / 2);
    let (reach_x, reach_y) = ((pixels.w / 4).max(1), (pixels.h / 4).max(1));

    let mut pull = Vec2::ZERO;
    for (sx, sy) in [(-1, -1), (1, -1), (-1, 1), (1, 1)] {
        let anchor = (center.0 + sx * reach_x, center.1 + sy * reach_y);
        if level_change(area, center, anchor) < 0 {
            pull += Vec2::new((sx * reach_x) as f32, (sy * reach_y) as f32);
        }
    }
    pull.normalize_or_zero()
}

/// Outcome of [`move_actor`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MoveResult {
    /// Horizontal displacement applied.
    pub moved_x: f32,
    /// Vertical displacement applied.
    pub moved_y: f32,
    /// The horizontal request was cut short.
    pub blocked_x: bool,
    /// The vertical request was cut short.
    pub blocked_y: bool,
    /// Last thing that refused a step.
    pub blocker: Option<Blocker>,
    /// A ledge was dropped down.
    pub descended: bool,
    /// Launch direction for jumping movers that dropped down a ledge.
    pub jump: Option<Vec2>,
    /// Objects pushed along the way.
    pub pushed: Vec<ObjectId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Advance {
    Moved,
    /// Slid sideways instead; the step may be retried.
    Wiggled,
    Blocked,
}

struct Mover<'a> {
    area: &'a mut AreaInstance,
    id: ObjectId,
    properties: MovementProperties,
    result: MoveResult,
    wiggled_x: bool,
    wiggled_y: bool,
}

impl Mover<'_> {
    fn hitbox(&self) -> Option<Rect> {
        self.area.object(self.id)?.hitbox()
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        if let Some(movable) = self
            .area
            .object_mut(self.id)
            .and_then(|object| object.as_movable_mut())
        {
            movable.translate(dx, dy);
        }
    }

    /// Advances up to one pixel along an axis.
    fn advance(&mut self, amount: f32, vertical: bool, out_events: &mut Vec<Event>) -> Advance {
        let Some(hitbox) = self.hitbox() else {
            return Advance::Blocked;
        };
        let direction = match (vertical, amount < 0.0) {
            (false, true) => Direction::Left,
            (false, false) => Direction::Right,
            (true, true) => Direction::Up,
            (true, false) => Direction::Down,
        };
        let (dx, dy) = if vertical { (0.0, amount) } else { (amount, 0.0) };

        let before = hitbox.to_pixels();
        let after = hitbox.translated(dx, dy).to_pixels();
        if before == after {
            self.translate(dx, dy);
            return Advance::Moved;
        }

        let blocker = match check_move(self.area, &hitbox, direction, &self.properties) {
            Ok(step) => {
                self.result.descended |= step.descends;
                self.translate(dx, dy);
                return Advance::Moved;
            }
            Err(blocker) => blocker,
        };

        if let Some(object) = blocker.object.filter(|_| self.properties.can_push) {
            if self.push(object, direction, out_events) {
                if let Ok(step) = check_move(self.area, &hitbox, direction, &self.properties) {
                    self.result.descended |= step.descends;
                    self.translate(dx, dy);
                    return Advance::Moved;
                }
            }
        }

        self.result.blocker = Some(blocker);
        let wiggled = if vertical {
            &mut self.wiggled_y
        } else {
            &mut self.wiggled_x
        };
        if self.properties.can_wiggle && !*wiggled {
            *wiggled = true;
            if self.wiggle(&hitbox, direction) {
                return Advance::Wiggled;
            }
        }
        Advance::Blocked
    }

    fn push(&mut self, object: ObjectId, direction: Direction, out_events: &mut Vec<Event>) -> bool {
        let Some(hitbox) = self.area.object(object).and_then(|pushed| pushed.hitbox()) else {
            return false;
        };
        let accepted = self
            .area
            .object_mut(object)
            .and_then(|pushed| pushed.as_pushable_mut())
            .map_or(false, |pushable| pushable.on_push(direction));
        if !accepted {
            return false;
        }

        let properties = MovementProperties::default()
            .excluding(object)
            .excluding(self.id);
        if let Err(blocker) = check_move(self.area, &hitbox, direction, &properties) {
            log::trace!("push of {} refused: {blocker:?}", object.get());
            return false;
        }
        if let Some(pushable) = self
            .area
            .object_mut(object)
            .and_then(|pushed| pushed.as_pushable_mut())
        {
            pushable.nudge(direction);
        }
        self.result.pushed.push(object);
        out_events.push(Event::ObjectPushed {
            realm: self.area.realm(),
            object,
            direction,
        });
        true
    }

    /// Slides one pixel sideways when that lets the blocked step through.
    /// The negative side is tried first.
    fn wiggle(&mut self, hitbox: &Rect, blocked: Direction) -> bool {
        let sides = if blocked.is_vertical() {
            [Direction::Left, Direction::Right]
        } else {
            [Direction::Up, Direction::Down]
        };
        for side in sides {
            if check_move(self.area, hitbox, side, &self.properties).is_err() {
                continue;
            }
            let (sx, sy) = side.delta();
            let shifted = hitbox.translated(sx as f32, sy as f32);
            if check_move(self.area, &shifted, blocked, &self.properties).is_ok() {
                self.translate(sx as f32, sy as f32);
                if blocked.is_vertical() {
                    self.result.moved_x += sx as f32;
                } else {
                    self.result.moved_y += sy as f32;
                }
                return true;
            }
        }
        false
    }
}

/// Moves an object by up to `(dx, dy)`, one pixel per axis at a time.
///
/// Axes alternate so the mover never cuts a corner diagonally. The object's
/// own movement properties apply and the object never blocks itself.
pub fn move_actor(
    area: &mut AreaInstance,
    object: ObjectId,
    dx: f32,
    dy: f32,
    out_events: &mut Vec<Event>,
) -> MoveResult {
    let Some(properties) = area
        .object_mut(object)
        .and_then(|found| found.as_movable_mut())
        .map(|movable| movable.movement_properties().excluding(object))
    else {
        return MoveResult {
            blocked_x: dx != 0.0,
            blocked_y: dy != 0.0,
            ..MoveResult::default()
        };
    };

    let mut mover = Mover {
        area,
        id: object,
        properties,
        result: MoveResult::default(),
        wiggled_x: false,
        wiggled_y: false,
    };
    let (mut remaining_x, mut remaining_y) = (dx, dy);
    while remaining_x != 0.0 || remaining_y != 0.0 {
        if remaining_x != 0.0 {
            let amount = remaining_x.clamp(-1.0, 1.0);
            match mover.advance(amount, false, out_events) {
                Advance::Moved => {
                    mover.result.moved_x += amount;
                    remaining_x -= amount;
                }
                Advance::Wiggled => {}
                Advance::Blocked => {
                    mover.result.blocked_x = true;
                    remaining_x = 0.0;
                }
            }
        }
        if remaining_y != 0.0 {
            let amount = remaining_y.clamp(-1.0, 1.0);
            match mover.advance(amount, true, out_events) {
                Advance::Moved => {
                    mover.result.moved_y += amount;
                    remaining_y -= amount;
                }
                Advance::Wiggled => {}
                Advance::Blocked => {
                    mover.result.blocked_y = true;
                    remaining_y = 0.0;
                }
            }
        }
    }

    let Mover {
        area,
        properties,
        mut result,
        ..
    } = mover;
    if result.descended && properties.can_jump {
        if let Some(hitbox) = area.object(object).and_then(|moved| moved.hitbox()) {
            result.jump = Some(get_jump_vector(area, &hitbox));
        }
    }
    result
}

/// Moves every object along its pending knockback.
pub fn settle_knockback(area: &mut AreaInstance, out_events: &mut Vec<Event>) {
    for id in area.object_ids() {
        let Some(knockback) = area
            .object_mut(id)
            .and_then(|object| object.as_movable_mut())
            .and_then(|movable| movable.take_knockback())
        else {
            continue;
        };
        let result = move_actor(area, id, knockback.x, knockback.y, out_events);
        log::trace!(
            "settled knockback of {} by ({}, {})",
            id.get(),
            result.moved_x,
            result.moved_y
        );
    }
}

/// Movement system that settles knockback once per tick.
#[derive(Debug, Default)]
pub struct Movement;

impl Movement {
    /// Consumes world events and moves knocked-back objects of the area.
    pub fn handle(&mut self, events: &[Event], area: &mut AreaInstance, out_events: &mut Vec<Event>) {
        if events
            .iter()
            .any(|event| matches!(event, Event::TimeAdvanced { .. }))
        {
            settle_knockback(area, out_events);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_straddle_the_midpoint() {
        let even = PixelRect {
            x: 0,
            y: 0,
            w: 16,
            h: 8,
        };
        assert_eq!(anchors(even, Direction::Up), (3, 4));
        assert_eq!(anchors(even, Direction::Left), (7, 8));

        let odd = PixelRect { w: 5, ..even };
        assert_eq!(anchors(odd, Direction::Right), (2, 2));
        assert_eq!(anchors(odd, Direction::Down), (3, 4));
    }

    #[test]
    fn leading_edge_sits_one_pixel_outside() {
        let pixels = PixelRect {
            x: 4,
            y: 4,
            w: 2,
            h: 3,
        };
        let up: Vec<_> = leading_edge(pixels, Direction::Up).collect();
        let right: Vec<_> = leading_edge(pixels, Direction::Right).collect();
        assert_eq!(up, vec![(4, 3), (5, 3)]);
        assert_eq!(right, vec![(6, 4), (6, 5), (6, 6)]);
    }

    #[test]
    fn zero_sized_hitboxes_cover_one_pixel() {
        let pixels = footprint(&Rect::new(3.7, 2.0, 0.5, 0.0));
        assert_eq!((pixels.x, pixels.y, pixels.w, pixels.h), (3, 2, 1, 1));
    }
}
