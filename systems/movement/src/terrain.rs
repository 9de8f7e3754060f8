//! Sub-tile terrain rules layered under the resolver: ledges, diagonal
//! ledges and solid bitmaps.

use spiritfield_core::{Direction, TileBehaviors, TileCoord, TILE_SIZE};
use spiritfield_world::AreaInstance;

/// Height change of a one pixel step across a ledge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Crossing {
    /// Low side to high side.
    Ascent,
    /// High side to low side.
    Descent,
}

impl Crossing {
    const fn level_change(self) -> i32 {
        match self {
            Self::Ascent => 1,
            Self::Descent => -1,
        }
    }
}

/// Offset of a pixel inside its tile.
#[must_use]
pub const fn sub_pixel(px: i32, py: i32) -> (i32, i32) {
    (px.rem_euclid(TILE_SIZE), py.rem_euclid(TILE_SIZE))
}

/// Ledge crossed by stepping one pixel from `(px, py)` in `direction`.
///
/// Between tiles the tile being left decides when it declares the shared
/// edge, otherwise the neighbour's opposite side does. Inside a tile only a
/// diagonal ledge can be crossed. Tiles outside the grid declare nothing.
#[must_use]
pub fn ledge_crossing(
    area: &AreaInstance,
    px: i32,
    py: i32,
    direction: Direction,
) -> Option<Crossing> {
    let (dx, dy) = direction.delta();
    let (nx, ny) = (px + dx, py + dy);
    let from = TileCoord::of_pixel(px, py);
    let to = TileCoord::of_pixel(nx, ny);

    if from == to {
        let diagonal = area.behavior_at(from)?.diagonal_ledge?;
        let (fx, fy) = sub_pixel(px, py);
        let (tx, ty) = sub_pixel(nx, ny);
        return match (diagonal.is_low(fx, fy), diagonal.is_low(tx, ty)) {
            (true, false) => Some(Crossing::Ascent),
            (false, true) => Some(Crossing::Descent),
            _ => None,
        };
    }

    let from_is_low = area
        .behavior_at(from)
        .and_then(|behaviors| behaviors.ledges.side(direction))
        .or_else(|| {
            area.behavior_at(to)
                .and_then(|behaviors| behaviors.ledges.side(direction.opposite()))
                .map(|to_is_low| !to_is_low)
        })?;
    Some(if from_is_low {
        Crossing::Ascent
    } else {
        Crossing::Descent
    })
}

/// Net height change walking pixel by pixel from one pixel to another,
/// horizontally first. Positive means the destination is higher.
#[must_use]
pub fn level_change(area: &AreaInstance, from: (i32, i32), to: (i32, i32)) -> i32 {
    let (mut x, mut y) = from;
    let mut level = 0;
    while x != to.0 {
        let direction = if to.0 > x {
            Direction::Right
        } else {
            Direction::Left
        };
        level += ledge_crossing(area, x, y, direction).map_or(0, Crossing::level_change);
        x += direction.delta().0;
    }
    while y != to.1 {
        let direction = if to.1 > y {
            Direction::Down
        } else {
            Direction::Up
        };
        level += ledge_crossing(area, x, y, direction).map_or(0, Crossing::level_change);
        y += direction.delta().1;
    }
    level
}

/// Reports whether terrain makes the pixel solid.
///
/// With `needs_full_tile` any solid pixel in the tile makes the whole tile solid.
#[must_use]
pub fn is_solid_pixel(behaviors: &TileBehaviors, px: i32, py: i32, needs_full_tile: bool) -> bool {
    if needs_full_tile {
        return behaviors.has_any_solid();
    }
    let (sx, sy) = sub_pixel(px, py);
    behaviors.is_pixel_solid(sx, sy)
}
