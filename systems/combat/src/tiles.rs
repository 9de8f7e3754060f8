//! Tile side of the hit resolver: cutting grass, smashing pots in the ground.

use spiritfield_core::{
    geometry::{circle_overlaps_rect, ray_intersects_rect, rectangles_overlap},
    Event, HitProperties, HitResult, HitShape, HitTarget, TileBehaviors, TileCoord,
};
use spiritfield_world::AreaInstance;

/// Grid tiles whose square the shape touches, row by row.
pub(crate) fn covered_tiles(shape: &HitShape) -> Vec<TileCoord> {
    if let HitShape::Tile(coord) = shape {
        return vec![*coord];
    }
    let pixels = shape.bounds().to_pixels();
    if pixels.is_empty() {
        return Vec::new();
    }
    let first = TileCoord::of_pixel(pixels.x, pixels.y);
    let last = TileCoord::of_pixel(pixels.right(), pixels.bottom());
    (first.y..=last.y)
        .flat_map(|y| (first.x..=last.x).map(move |x| TileCoord::new(x, y)))
        .filter(|coord| touches_tile(shape, *coord))
        .collect()
}

fn touches_tile(shape: &HitShape, coord: TileCoord) -> bool {
    let square = coord.rect();
    match shape {
        HitShape::Box(rect) => rectangles_overlap(rect, &square),
        HitShape::Circle(circle) => circle_overlaps_rect(circle, &square),
        HitShape::Line(ray) => ray_intersects_rect(ray, &square),
        HitShape::Volume(volume) => rectangles_overlap(&volume.rect, &square),
        HitShape::Tile(target) => *target == coord,
    }
}

fn is_breakable_by(hit: &HitProperties, behaviors: &TileBehaviors) -> bool {
    (hit.cuts_ground && behaviors.cuttable) || (hit.destroys_objects && behaviors.destructible)
}

/// Destroys every breakable tile under the shape that this activation has
/// not struck yet.
///
/// A destroyed tile is replaced by its under tile and the behavior cache is
/// refreshed at once, so striking the same spot again matches the new tile
/// rather than the one that already broke.
pub(crate) fn strike_tiles(
    area: &mut AreaInstance,
    hit: &HitProperties,
    shape: &HitShape,
    result: &mut HitResult,
    out_events: &mut Vec<Event>,
) {
    if !hit.cuts_ground && !hit.destroys_objects {
        return;
    }
    let realm = area.realm();

    for coord in covered_tiles(shape) {
        let target = HitTarget::Tile(coord);
        if hit.ignore_targets.contains(&target) || result.hit_targets.contains(&target) {
            continue;
        }
        let Some((layer, _)) = area.find_topmost_tile(coord, |behaviors| is_breakable_by(hit, behaviors))
        else {
            continue;
        };
        let Some(destruction) = area.destroy_tile(layer, coord) else {
            continue;
        };

        result.hit = true;
        let _ = result.hit_targets.insert(target);
        out_events.push(Event::TargetHit {
            realm,
            target,
            damage: hit.damage,
            element: hit.element,
        });
        out_events.push(Event::TileDestroyed {
            realm,
            layer,
            coord,
            previous: destruction.previous,
            replaced_with: destruction.replaced_with,
        });

        let center = coord.rect().center();
        if let Some(sound) = destruction.behaviors.break_sound {
            out_events.push(Event::SoundRequested { sound });
        }
        if let Some(table) = destruction.behaviors.loot_table {
            out_events.push(Event::LootDropped {
                realm,
                table,
                at: center,
            });
        }
        if let Some(particles) = destruction.behaviors.particles {
            out_events.push(Event::ParticlesRequested {
                particles,
                at: center,
            });
        }
    }
}
