#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Target acquisition queries used by enemies, turrets and the hero.
//!
//! Nothing here mutates combat state. The queries read the behavior grid and
//! the live object list of one area; only [`try_grab`] touches an object, and
//! only through its grab capability.

use spiritfield_core::{
    geometry::{get_distance, rectangles_overlap},
    Circle, Direction, ObjectId, Point, Rect, TileCoord, TILE_SIZE,
};
use spiritfield_world::{AreaInstance, ObjectClass};

/// Direction and distance from a source to the target it picked.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetVector {
    /// Horizontal component of the unit direction.
    pub x: f32,
    /// Vertical component of the unit direction.
    pub y: f32,
    /// Distance between the hitbox centres.
    pub mag: f32,
    /// Chosen target.
    pub target: ObjectId,
}

fn bounding_circle(hitbox: &Rect) -> Circle {
    let center = hitbox.center();
    Circle::new(center.x, center.y, (hitbox.w + hitbox.h) / 4.0)
}

fn vector_between(from: &Rect, to: &Rect, target: ObjectId) -> TargetVector {
    let delta = to.center().to_vec2() - from.center().to_vec2();
    let direction = delta.normalize_or_zero();
    TargetVector {
        x: direction.x,
        y: direction.y,
        mag: delta.length(),
        target,
    }
}

fn nearest_matching<F>(
    area: &AreaInstance,
    source: &Rect,
    radius: f32,
    candidates: &[ObjectId],
    mut accept: F,
) -> Option<TargetVector>
where
    F: FnMut(&Rect) -> bool,
{
    let origin = bounding_circle(source);
    let mut best: Option<(f32, ObjectId, Rect)> = None;

    for &candidate in candidates {
        let Some(hitbox) = area
            .object(candidate)
            .filter(|object| !object.is_hidden())
            .and_then(|object| object.hitbox())
        else {
            continue;
        };
        let gap = get_distance(&origin, &bounding_circle(&hitbox));
        if gap > radius {
            continue;
        }
        if best.map_or(false, |(closest, _, _)| gap >= closest) {
            continue;
        }
        if accept(&hitbox) {
            best = Some((gap, candidate, hitbox));
        }
    }

    best.map(|(_, target, hitbox)| vector_between(source, &hitbox, target))
}

/// Finds the closest candidate whose surface lies within `radius` of the
/// source's surface.
///
/// Hitboxes are treated as circles whose radius averages the half extents.
/// On an exact tie the candidate listed first wins. Removed or hidden
/// candidates are ignored.
#[must_use]
pub fn get_vector_to_nearby_target(
    area: &AreaInstance,
    source: &Rect,
    radius: f32,
    candidates: &[ObjectId],
) -> Option<TargetVector> {
    nearest_matching(area, source, radius, candidates, |_| true)
}

/// Like [`get_vector_to_nearby_target`], but only candidates in line of
/// sight of the source centre qualify.
#[must_use]
pub fn get_vector_to_visible_target(
    area: &AreaInstance,
    source: &Rect,
    radius: f32,
    candidates: &[ObjectId],
) -> Option<TargetVector> {
    let eye = source.center();
    nearest_matching(area, source, radius, candidates, |hitbox| {
        has_line_of_sight(area, eye, hitbox.center())
    })
}

fn blocks_sight(area: &AreaInstance, coord: TileCoord) -> bool {
    area.behavior_at(coord).map_or(false, |behaviors| {
        behaviors.is_very_tall || (behaviors.has_any_solid() && !behaviors.is_medium_wall())
    })
}

/// Walks the tiles crossed by the segment between two points and reports
/// whether none of them blocks sight.
///
/// Full-height solid walls and very tall tiles block; low and medium walls do
/// not. The tiles holding the endpoints never block.
#[must_use]
pub fn has_line_of_sight(area: &AreaInstance, from: Point, to: Point) -> bool {
    let size = TILE_SIZE as f32;
    let (x0, y0) = (from.x / size, from.y / size);
    let (dx, dy) = ((to.x - from.x) / size, (to.y - from.y) / size);

    let start = TileCoord::new(x0.floor() as i32, y0.floor() as i32);
    let end = TileCoord::new((to.x / size).floor() as i32, (to.y / size).floor() as i32);

    let step_x = if dx > 0.0 {
        1
    } else if dx < 0.0 {
        -1
    } else {
        0
    };
    let step_y = if dy > 0.0 {
        1
    } else if dy < 0.0 {
        -1
    } else {
        0
    };
    let t_delta_x = if step_x == 0 { f32::INFINITY } else { 1.0 / dx.abs() };
    let t_delta_y = if step_y == 0 { f32::INFINITY } else { 1.0 / dy.abs() };

    let boundary_x = if step_x > 0 {
        (start.x + 1) as f32
    } else {
        start.x as f32
    };
    let boundary_y = if step_y > 0 {
        (start.y + 1) as f32
    } else {
        start.y as f32
    };
    let mut t_max_x = if step_x == 0 {
        f32::INFINITY
    } else {
        (boundary_x - x0).abs() * t_delta_x
    };
    let mut t_max_y = if step_y == 0 {
        f32::INFINITY
    } else {
        (boundary_y - y0).abs() * t_delta_y
    };

    let steps = (end.x - start.x).abs() + (end.y - start.y).abs();
    let mut current = start;
    for _ in 0..steps {
        if t_max_x < t_max_y {
            current.x += step_x;
            t_max_x += t_delta_x;
        } else {
            current.y += step_y;
            t_max_y += t_delta_y;
        }
        if current == end {
            return true;
        }
        if blocks_sight(area, current) {
            log::trace!("sight from {from:?} to {to:?} blocked at {current:?}");
            return false;
        }
    }
    true
}

/// Tiles and objects just beyond an actor's facing edge.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActorTargets {
    /// Grid tiles touched by the probe, in row-major order.
    pub tiles: Vec<TileCoord>,
    /// Visible objects touched by the probe, in area order.
    pub objects: Vec<ObjectId>,
}

/// Depth of the interaction probe beyond the facing edge.
pub const PROBE_DEPTH: f32 = 2.0;

fn probe(hitbox: &Rect, facing: Direction) -> Rect {
    match facing {
        Direction::Up => Rect::new(hitbox.x, hitbox.y - PROBE_DEPTH, hitbox.w, PROBE_DEPTH),
        Direction::Down => Rect::new(hitbox.x, hitbox.y + hitbox.h, hitbox.w, PROBE_DEPTH),
        Direction::Left => Rect::new(hitbox.x - PROBE_DEPTH, hitbox.y, PROBE_DEPTH, hitbox.h),
        Direction::Right => Rect::new(hitbox.x + hitbox.w, hitbox.y, PROBE_DEPTH, hitbox.h),
    }
}

/// Scans what an actor faces, for grab and push prompts.
///
/// Independent of the hit system: nothing is damaged and no ignore set is
/// consulted.
#[must_use]
pub fn get_actor_targets(area: &AreaInstance, actor: ObjectId, facing: Direction) -> ActorTargets {
    let Some(hitbox) = area.object(actor).and_then(|object| object.hitbox()) else {
        return ActorTargets::default();
    };
    let ahead = probe(&hitbox, facing);
    let pixels = ahead.to_pixels();

    let first = TileCoord::of_pixel(pixels.x, pixels.y);
    let last = TileCoord::of_pixel(pixels.right(), pixels.bottom());
    let tiles = (first.y..=last.y)
        .flat_map(|y| (first.x..=last.x).map(move |x| TileCoord::new(x, y)))
        .filter(|coord| area.contains_tile(*coord))
        .collect();

    let objects = area
        .objects()
        .filter(|(id, object)| *id != actor && !object.is_hidden())
        .filter(|(_, object)| {
            object
                .hitbox()
                .map_or(false, |other| rectangles_overlap(&ahead, &other))
        })
        .map(|(id, _)| id)
        .collect();

    ActorTargets { tiles, objects }
}

/// Grabs the first grabbable object the actor faces.
pub fn try_grab(area: &mut AreaInstance, actor: ObjectId, facing: Direction) -> Option<ObjectId> {
    let targets = get_actor_targets(area, actor, facing);
    for candidate in targets.objects {
        let grabbed = area
            .object_mut(candidate)
            .and_then(|object| object.as_grabbable_mut())
            .map_or(false, |grabbable| grabbable.on_grab(actor));
        if grabbed {
            log::debug!("object {} grabbed object {}", actor.get(), candidate.get());
            return Some(candidate);
        }
    }
    None
}

/// Targeting helper that reuses its candidate buffer between queries.
#[derive(Debug, Default)]
pub struct Targeting {
    candidates: Vec<ObjectId>,
}

impl Targeting {
    /// Creates a targeting helper with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Nearest object of a class around `source`, excluding the source itself.
    ///
    /// With `require_sight` only targets in line of sight qualify.
    pub fn nearest_of_class(
        &mut self,
        area: &AreaInstance,
        source: ObjectId,
        class: ObjectClass,
        radius: f32,
        require_sight: bool,
    ) -> Option<TargetVector> {
        let hitbox = area.object(source)?.hitbox()?;
        self.candidates.clear();
        self.candidates.extend(
            area.objects()
                .filter(|(id, object)| *id != source && object.class() == class)
                .map(|(id, _)| id),
        );
        if require_sight {
            get_vector_to_visible_target(area, &hitbox, radius, &self.candidates)
        } else {
            get_vector_to_nearby_target(area, &hitbox, radius, &self.candidates)
        }
    }
}
