//! Tile coordinates and the static per-tile behavior metadata.

use serde::{Deserialize, Serialize};

use crate::{
    geometry::{Point, Rect, TILE_SIZE},
    hit::TouchHit,
    Direction,
};

/// Index of a tile within the registered palettes. Zero is the empty tile.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TileIndex(u16);

impl TileIndex {
    /// Index reserved for "no tile on this layer".
    pub const EMPTY: TileIndex = TileIndex(0);

    /// Creates a new tile index.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Retrieves the numeric index.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }

    /// Reports whether this is the empty tile.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Location of a tile measured in whole tiles.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileCoord {
    /// Column index.
    pub x: i32,
    /// Row index.
    pub y: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile containing the provided world point (`floor(x / 16)`).
    #[must_use]
    pub fn containing(point: Point) -> Self {
        let size = TILE_SIZE as f32;
        Self {
            x: (point.x / size).floor() as i32,
            y: (point.y / size).floor() as i32,
        }
    }

    /// Tile containing the provided integer pixel.
    #[must_use]
    pub const fn of_pixel(px: i32, py: i32) -> Self {
        Self {
            x: px.div_euclid(TILE_SIZE),
            y: py.div_euclid(TILE_SIZE),
        }
    }

    /// World rectangle covered by the tile.
    #[must_use]
    pub fn rect(&self) -> Rect {
        let size = TILE_SIZE as f32;
        Rect::new(self.x as f32 * size, self.y as f32 * size, size, size)
    }

    /// Neighbouring tile one step in the provided direction.
    #[must_use]
    pub const fn step(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// One-way edges of a tile. `Some(true)` marks the tile as the low side of
/// that edge, `Some(false)` as the high side, `None` defers to the neighbour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ledges {
    /// Top edge.
    pub up: Option<bool>,
    /// Bottom edge.
    pub down: Option<bool>,
    /// Left edge.
    pub left: Option<bool>,
    /// Right edge.
    pub right: Option<bool>,
}

impl Ledges {
    /// Declaration for the edge on the provided side.
    #[must_use]
    pub const fn side(&self, direction: Direction) -> Option<bool> {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    /// Overrides every side the upper declaration defines.
    fn overlay(&mut self, upper: &Ledges) {
        self.up = upper.up.or(self.up);
        self.down = upper.down.or(self.down);
        self.left = upper.left.or(self.left);
        self.right = upper.right.or(self.right);
    }
}

/// Orientation of a diagonal ledge; names the corner of the low triangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagonalLedge {
    /// Low triangle in the upper-left corner.
    UpLeft,
    /// Low triangle in the upper-right corner.
    UpRight,
    /// Low triangle in the lower-left corner.
    DownLeft,
    /// Low triangle in the lower-right corner.
    DownRight,
}

impl DiagonalLedge {
    /// Reports whether the sub-tile pixel offset lies in the low triangle.
    ///
    /// Pixels on the midline belong to the high side.
    #[must_use]
    pub const fn is_low(self, px: i32, py: i32) -> bool {
        let last = TILE_SIZE - 1;
        match self {
            Self::DownRight => px + py > last,
            Self::UpLeft => px + py < last,
            Self::UpRight => px > py,
            Self::DownLeft => py > px,
        }
    }
}

/// Rule used when folding the layers of a tile into one behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Flags OR-combine across layers, defined optional keys of upper layers win.
    #[default]
    Additive,
    /// The topmost non-empty layer replaces every flag, optional keys still fall through.
    TopmostWins,
}

/// Static gameplay metadata of a tile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileBehaviors {
    /// Blocks movement across the whole tile.
    pub solid: bool,
    /// Per-row solidity bitmask; the most significant bit is the leftmost pixel.
    pub solid_map: Option<[u16; 16]>,
    /// Actors without `can_fall` cannot enter.
    pub pit: bool,
    /// Visible wall of a pit, walkable only by falling actors.
    pub pit_wall: bool,
    /// Actors without `can_swim` cannot enter.
    pub water: bool,
    /// Solid tiles marked climbable admit actors with `can_climb`.
    pub climbable: bool,
    /// One-way edges.
    pub ledges: Ledges,
    /// Diagonal one-way edge splitting the tile.
    pub diagonal_ledge: Option<DiagonalLedge>,
    /// Southern face of a wall.
    pub is_southern_wall: bool,
    /// Wall tall enough to stop any projectile.
    pub is_very_tall: bool,
    /// Medium-height wall.
    pub mid_height: bool,
    /// Low wall.
    pub low: bool,
    /// Damage dealt to actors touching the tile.
    pub touch_hit: Option<TouchHit>,
    /// Tile that replaces this one when it is destroyed.
    pub under_tile: Option<TileIndex>,
    /// Sound requested when the tile breaks.
    pub break_sound: Option<String>,
    /// Particle effect requested when the tile breaks.
    pub particles: Option<String>,
    /// Loot table rolled when the tile breaks.
    pub loot_table: Option<String>,
    /// Destroyed by hits that cut the ground.
    pub cuttable: bool,
    /// Destroyed by hits that destroy objects.
    pub destructible: bool,
}

impl TileBehaviors {
    /// Folds an upper layer's behavior on top of this one.
    pub fn overlay(&mut self, upper: &TileBehaviors, policy: MergePolicy) {
        match policy {
            MergePolicy::Additive => {
                self.solid |= upper.solid;
                self.pit |= upper.pit;
                self.pit_wall |= upper.pit_wall;
                self.water |= upper.water;
                self.climbable |= upper.climbable;
                self.is_southern_wall |= upper.is_southern_wall;
                self.is_very_tall |= upper.is_very_tall;
                self.mid_height |= upper.mid_height;
                self.low |= upper.low;
                self.cuttable |= upper.cuttable;
                self.destructible |= upper.destructible;
                self.solid_map = match (self.solid_map, upper.solid_map) {
                    (Some(lower), Some(upper)) => {
                        let mut rows = lower;
                        for (row, mask) in rows.iter_mut().zip(upper) {
                            *row |= mask;
                        }
                        Some(rows)
                    }
                    (lower, upper) => upper.or(lower),
                };
            }
            MergePolicy::TopmostWins => {
                self.solid = upper.solid;
                self.pit = upper.pit;
                self.pit_wall = upper.pit_wall;
                self.water = upper.water;
                self.climbable = upper.climbable;
                self.is_southern_wall = upper.is_southern_wall;
                self.is_very_tall = upper.is_very_tall;
                self.mid_height = upper.mid_height;
                self.low = upper.low;
                self.cuttable = upper.cuttable;
                self.destructible = upper.destructible;
                self.solid_map = upper.solid_map;
            }
        }

        self.ledges.overlay(&upper.ledges);
        if upper.diagonal_ledge.is_some() {
            self.diagonal_ledge = upper.diagonal_ledge;
        }
        if upper.touch_hit.is_some() {
            self.touch_hit = upper.touch_hit;
        }
        if upper.under_tile.is_some() {
            self.under_tile = upper.under_tile;
        }
        if upper.break_sound.is_some() {
            self.break_sound.clone_from(&upper.break_sound);
        }
        if upper.particles.is_some() {
            self.particles.clone_from(&upper.particles);
        }
        if upper.loot_table.is_some() {
            self.loot_table.clone_from(&upper.loot_table);
        }
    }

    /// Reports whether the pixel at the sub-tile offset is solid.
    #[must_use]
    pub fn is_pixel_solid(&self, px: i32, py: i32) -> bool {
        if self.solid {
            return true;
        }
        let Some(rows) = &self.solid_map else {
            return false;
        };
        let (Ok(column), Ok(row)) = (u32::try_from(px), usize::try_from(py)) else {
            return false;
        };
        if column >= 16 {
            return false;
        }
        rows.get(row)
            .map_or(false, |mask| mask & (0x8000 >> column) != 0)
    }

    /// Reports whether any pixel of the tile is solid.
    #[must_use]
    pub fn has_any_solid(&self) -> bool {
        self.solid
            || self
                .solid_map
                .map_or(false, |rows| rows.iter().any(|row| *row != 0))
    }

    /// Reports whether a wall of this tile is a low or medium one.
    #[must_use]
    pub const fn is_medium_wall(&self) -> bool {
        self.low || self.mid_height
    }

    /// Height in pixels a wall on this tile reaches.
    #[must_use]
    pub fn wall_height(&self) -> f32 {
        if self.is_very_tall {
            f32::INFINITY
        } else if self.low {
            8.0
        } else if self.mid_height {
            16.0
        } else {
            24.0
        }
    }
}
