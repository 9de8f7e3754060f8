#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Hit resolution: applies one attack activation to the objects and tiles of
//! an area and reports what it struck.
//!
//! Candidates are enumerated from a snapshot taken before any callback runs,
//! and defeated objects leave the area only after the sweep, so callbacks can
//! never shift the enumeration under the resolver.

use glam::Vec2;
use spiritfield_core::{
    geometry::{circle_overlaps_rect, ray_intersects_rect, rectangles_overlap, short_rects_overlap},
    Command, Event, HitProperties, HitResult, HitShape, HitTarget, Knock, ObjectId, Point, Rect,
    ShortRect, TileCoord, TouchHit,
};
use spiritfield_world::{Actor, AreaInstance, HitContext, ObjectClass};

mod tiles;

fn shape_touches(shape: &HitShape, hitbox: &Rect, z: f32) -> bool {
    match shape {
        HitShape::Box(rect) => rectangles_overlap(rect, hitbox),
        HitShape::Circle(circle) => circle_overlaps_rect(circle, hitbox),
        HitShape::Line(ray) => ray_intersects_rect(ray, hitbox),
        HitShape::Volume(volume) => short_rects_overlap(
            volume,
            &ShortRect {
                rect: *hitbox,
                z,
                zd: hitbox.h,
            },
        ),
        HitShape::Tile(coord) => rectangles_overlap(&coord.rect(), hitbox),
    }
}

/// Point an attack radiates from, for shields and knockback.
fn hit_origin(hit: &HitProperties, shape: &HitShape) -> Point {
    match hit.knock {
        Knock::AwayFrom(point) => point,
        Knock::None | Knock::AwayFromHit => shape.center(),
    }
}

fn knockback(hit: &HitProperties, origin: Point, hitbox: &Rect) -> Option<Vec2> {
    if !hit.can_push || hit.knock == Knock::None {
        return None;
    }
    let away = (hitbox.center().to_vec2() - origin.to_vec2()).normalize_or_zero();
    Some(away * hit.knockback_strength)
}

/// Resolves one attack activation against an area.
///
/// Enemies, allies and generic objects are swept in that order, then tiles.
/// Anything in `hit.ignore_targets` or the attack's own source is skipped.
/// The caller merges the returned targets into its ignore set to keep a
/// persistent attack from striking the same target twice.
pub fn hit_targets(
    area: &mut AreaInstance,
    hit: &HitProperties,
    out_events: &mut Vec<Event>,
) -> HitResult {
    let Some(shape) = hit.shape else {
        debug_assert!(false, "hit resolved without a shape");
        log::warn!("ignoring hit without a shape");
        return HitResult::default();
    };

    let mut result = HitResult::default();
    let candidates = area.object_ids();
    let sweeps = [
        (hit.hit_enemies, ObjectClass::Enemy),
        (hit.hit_allies, ObjectClass::Ally),
        (hit.hit_objects, ObjectClass::Object),
    ];
    for (enabled, class) in sweeps {
        if !enabled {
            continue;
        }
        for &candidate in &candidates {
            strike_object(area, hit, &shape, class, candidate, &mut result, out_events);
        }
    }

    if hit.hit_tiles {
        tiles::strike_tiles(area, hit, &shape, &mut result, out_events);
    }

    remove_defeated(area, out_events);
    result
}

fn strike_object(
    area: &mut AreaInstance,
    hit: &HitProperties,
    shape: &HitShape,
    class: ObjectClass,
    candidate: ObjectId,
    result: &mut HitResult,
    out_events: &mut Vec<Event>,
) {
    let target = HitTarget::Object(candidate);
    if hit.source == Some(candidate)
        || hit.ignore_targets.contains(&target)
        || result.hit_targets.contains(&target)
    {
        return;
    }

    let Some(object) = area.object(candidate) else {
        return;
    };
    if object.class() != class || object.is_hidden() {
        return;
    }
    let Some(hitbox) = object.hitbox() else {
        return;
    };
    let z = object.as_actor().map_or(0.0, Actor::z);
    if !shape_touches(shape, &hitbox, z) {
        return;
    }

    let origin = hit_origin(hit, shape);
    let context = HitContext {
        damage: hit.damage * object.element_modifier(hit.element),
        element: hit.element,
        origin,
        knockback: knockback(hit, origin, &hitbox),
        source: hit.source,
    };
    let loot = object.loot_table().map(str::to_owned);

    let Some(response) = area
        .object_mut(candidate)
        .and_then(|object| object.as_hittable_mut())
        .map(|hittable| hittable.on_hit(&context))
    else {
        return;
    };
    if !response.hit {
        return;
    }

    let realm = area.realm();
    result.hit = true;
    result.stopped |= response.stopped;
    let _ = result.hit_targets.insert(target);

    if response.blocked {
        out_events.push(Event::HitBlocked {
            realm,
            object: candidate,
        });
    } else {
        out_events.push(Event::TargetHit {
            realm,
            target,
            damage: context.damage,
            element: context.element,
        });
    }

    if response.defeated {
        log::debug!("{realm:?} object {} defeated", candidate.get());
        out_events.push(Event::ActorDefeated {
            realm,
            object: candidate,
        });
        if let Some(table) = loot {
            out_events.push(Event::LootDropped {
                realm,
                table,
                at: hitbox.center(),
            });
        }
        area.queue_removal(candidate);
    }
}

fn remove_defeated(area: &mut AreaInstance, out_events: &mut Vec<Event>) {
    let realm = area.realm();
    for object in area.flush_removals() {
        out_events.push(Event::ObjectRemoved { realm, object });
    }
}

/// Runs every persistent effect of the area for one tick.
///
/// Each effect resolves at its current position, folds the result into its
/// own ignore set, then moves and ages. Spent effects leave the area.
pub fn advance_effects(area: &mut AreaInstance, out_events: &mut Vec<Event>) {
    let realm = area.realm();
    let mut effects = area.take_effects();
    for (_, effect) in &mut effects {
        let result = hit_targets(area, effect.hit(), out_events);
        effect.record(&result);
        effect.advance();
    }
    effects.retain(|(id, effect)| {
        if effect.is_expired() {
            out_events.push(Event::EffectExpired {
                realm,
                effect: *id,
            });
            false
        } else {
            true
        }
    });
    area.restore_effects(effects);
}

fn strongest_touch(area: &AreaInstance, hitbox: &Rect) -> Option<(TileCoord, TouchHit)> {
    let pixels = hitbox.to_pixels();
    let first = TileCoord::of_pixel(pixels.x, pixels.y);
    let last = TileCoord::of_pixel(pixels.right(), pixels.bottom());

    let mut strongest: Option<(TileCoord, TouchHit)> = None;
    for y in first.y..=last.y {
        for x in first.x..=last.x {
            let coord = TileCoord::new(x, y);
            let Some(touch) = area.behavior_at(coord).and_then(|behaviors| behaviors.touch_hit)
            else {
                continue;
            };
            if strongest.map_or(true, |(_, best)| touch.damage > best.damage) {
                strongest = Some((coord, touch));
            }
        }
    }
    strongest
}

/// Damages an object standing on tiles that hurt on contact, such as spikes
/// or lava.
///
/// Only the strongest touch hit under the object applies, and an actor still
/// recovering from a previous hit is spared.
pub fn apply_touch_hits(
    area: &mut AreaInstance,
    object: ObjectId,
    out_events: &mut Vec<Event>,
) -> HitResult {
    let Some(found) = area.object(object) else {
        return HitResult::default();
    };
    if found.as_actor().map_or(false, Actor::is_hurt) {
        return HitResult::default();
    }
    let Some(hitbox) = found.hitbox() else {
        return HitResult::default();
    };
    let Some((coord, touch)) = strongest_touch(area, &hitbox) else {
        return HitResult::default();
    };

    let hit = HitProperties {
        shape: Some(HitShape::Tile(coord)),
        damage: touch.damage,
        element: touch.element,
        hit_enemies: true,
        hit_allies: true,
        hit_objects: true,
        ..HitProperties::default()
    };
    let mut result = HitResult::default();
    let class = found.class();
    strike_object(area, &hit, &HitShape::Tile(coord), class, object, &mut result, out_events);
    remove_defeated(area, out_events);
    result
}

/// Combat system that turns hit side effects into world commands.
#[derive(Debug, Default)]
pub struct Combat {
    scratch: Vec<Command>,
}

impl Combat {
    /// Creates a combat system with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits follow-up commands for the provided events.
    ///
    /// Destroyed tiles are mirrored into the alternate realm and loot drops
    /// are rolled by the world.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        self.scratch.clear();
        for event in events {
            match event {
                Event::TileDestroyed {
                    realm,
                    layer,
                    coord,
                    previous,
                    replaced_with,
                } => self.scratch.push(Command::MirrorTileChange {
                    from: *realm,
                    layer: *layer,
                    coord: *coord,
                    previous: *previous,
                    tile: *replaced_with,
                }),
                Event::LootDropped { realm, table, at } => self.scratch.push(Command::DropLoot {
                    realm: *realm,
                    table: table.clone(),
                    at: *at,
                }),
                _ => {}
            }
        }

        if self.scratch.is_empty() {
            return;
        }
        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spiritfield_core::{Circle, Realm, TileIndex};

    #[test]
    fn knockback_needs_push_and_a_knock_rule() {
        let hitbox = Rect::new(10.0, -2.0, 4.0, 4.0);
        let mut hit = HitProperties {
            knock: Knock::AwayFromHit,
            knockback_strength: 3.0,
            ..HitProperties::default()
        };
        assert_eq!(knockback(&hit, Point::new(0.0, 0.0), &hitbox), None);

        hit.can_push = true;
        assert_eq!(
            knockback(&hit, Point::new(0.0, 0.0), &hitbox),
            Some(Vec2::new(3.0, 0.0))
        );

        hit.knock = Knock::None;
        assert_eq!(knockback(&hit, Point::new(0.0, 0.0), &hitbox), None);
    }

    #[test]
    fn explicit_knock_points_override_the_shape_centre() {
        let shape = HitShape::Circle(Circle::new(5.0, 5.0, 2.0));
        let hit = HitProperties {
            knock: Knock::AwayFrom(Point::new(-4.0, 1.0)),
            ..HitProperties::default()
        };
        assert_eq!(hit_origin(&hit, &shape), Point::new(-4.0, 1.0));
        assert_eq!(hit_origin(&HitProperties::default(), &shape), Point::new(5.0, 5.0));
    }

    #[test]
    fn volumes_respect_height() {
        let volume = HitShape::Volume(ShortRect {
            rect: Rect::new(0.0, 0.0, 8.0, 8.0),
            z: 10.0,
            zd: 4.0,
        });
        let hitbox = Rect::new(4.0, 4.0, 8.0, 8.0);
        assert!(!shape_touches(&volume, &hitbox, 0.0));
        assert!(shape_touches(&volume, &hitbox, 8.0));
        assert!(!shape_touches(&volume, &hitbox, 20.0));
    }

    #[test]
    fn combat_turns_side_effects_into_commands() {
        let events = [
            Event::TileDestroyed {
                realm: Realm::Spirit,
                layer: 1,
                coord: TileCoord::new(2, 3),
                previous: TileIndex::new(7),
                replaced_with: TileIndex::new(4),
            },
            Event::SoundRequested {
                sound: "crunch".to_owned(),
            },
            Event::LootDropped {
                realm: Realm::Spirit,
                table: "grass".to_owned(),
                at: Point::new(40.0, 56.0),
            },
        ];
        let mut combat = Combat::new();
        let mut out = Vec::new();
        combat.handle(&events, &mut out);
        assert_eq!(
            out,
            vec![
                Command::MirrorTileChange {
                    from: Realm::Spirit,
                    layer: 1,
                    coord: TileCoord::new(2, 3),
                    previous: TileIndex::new(7),
                    tile: TileIndex::new(4),
                },
                Command::DropLoot {
                    realm: Realm::Spirit,
                    table: "grass".to_owned(),
                    at: Point::new(40.0, 56.0),
                },
            ]
        );
    }
}
