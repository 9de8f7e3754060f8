//! Content definitions and the registries the world looks them up in.

use std::collections::BTreeMap;

use rand::{distributions::WeightedIndex, prelude::Distribution, Rng};
use serde::{Deserialize, Serialize};
use spiritfield_core::{
    Direction, Element, MergePolicy, MovementProperties, Registry, RegistryError, TileBehaviors,
    TileIndex,
};

use crate::objects::ObjectClass;

/// Behaviors registered for one tile index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TileDefinition {
    /// Palette the tile came from.
    pub palette: String,
    /// Fully merged behaviors of the tile.
    pub behaviors: TileBehaviors,
}

/// A sheet of tiles sharing default behaviors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteDefinition {
    /// Name used in logs and tile definitions.
    pub key: String,
    /// Behaviors every tile of the palette starts from.
    pub default_behaviors: TileBehaviors,
    /// Per-tile additions folded on top of the defaults, in index order.
    pub tiles: Vec<TileBehaviors>,
}

/// Template for spawning an actor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorDefinition {
    /// Targeting class of the actor.
    pub class: ObjectClass,
    /// Width of the hitbox in pixels.
    pub width: f32,
    /// Height of the hitbox in pixels.
    pub height: f32,
    /// Life before modifiers.
    pub max_life: f32,
    /// Pixels per tick before modifiers.
    pub speed: f32,
    /// Damage multipliers per element; zero means immune.
    pub resistances: BTreeMap<Element, f32>,
    /// Direction a shield faces, blocking hits from that side.
    pub shield: Option<Direction>,
    /// Blocks other movers.
    pub solid: bool,
    /// Capabilities used when the actor moves.
    pub movement: MovementProperties,
}

impl Default for ActorDefinition {
    fn default() -> Self {
        Self {
            class: ObjectClass::Enemy,
            width: 16.0,
            height: 16.0,
            max_life: 1.0,
            speed: 1.0,
            resistances: BTreeMap::new(),
            shield: None,
            solid: false,
            movement: MovementProperties::default(),
        }
    }
}

/// One weighted outcome of a loot table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootEntry {
    /// Item key of the outcome.
    pub item: String,
    /// Relative weight of the outcome.
    pub weight: u32,
}

/// Weighted list of items dropped when something breaks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootTable {
    /// Possible items.
    pub entries: Vec<LootEntry>,
    /// Relative weight of dropping nothing.
    pub nothing_weight: u32,
}

impl LootTable {
    /// Rolls the table, returning the item key if something dropped.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        let weights = self
            .entries
            .iter()
            .map(|entry| entry.weight)
            .chain(std::iter::once(self.nothing_weight));
        let distribution = WeightedIndex::new(weights).ok()?;
        self.entries
            .get(distribution.sample(rng))
            .map(|entry| entry.item.as_str())
    }
}

/// All content definitions, built once before the world starts.
#[derive(Clone, Debug)]
pub struct Registries {
    tiles: Registry<TileIndex, TileDefinition>,
    actors: Registry<String, ActorDefinition>,
    loot_tables: Registry<String, LootTable>,
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}

impl Registries {
    /// Creates empty registries.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tiles: Registry::new("tile"),
            actors: Registry::new("actor"),
            loot_tables: Registry::new("loot table"),
        }
    }

    /// Registers every tile of a palette starting at `base`.
    ///
    /// Index zero is reserved for the empty tile.
    pub fn register_palette(
        &mut self,
        base: TileIndex,
        palette: &PaletteDefinition,
    ) -> Result<(), RegistryError> {
        for (offset, overrides) in palette.tiles.iter().enumerate() {
            let index = u16::try_from(offset)
                .ok()
                .and_then(|offset| base.get().checked_add(offset))
                .ok_or_else(|| RegistryError::InvalidKey {
                    registry: self.tiles.name(),
                    key: format!("{}+{offset}", base.get()),
                    reason: "index exceeds the tile range",
                })?;
            let index = TileIndex::new(index);
            if index.is_empty() {
                return Err(RegistryError::InvalidKey {
                    registry: self.tiles.name(),
                    key: format!("{index:?}"),
                    reason: "index zero is the empty tile",
                });
            }

            let mut behaviors = palette.default_behaviors.clone();
            behaviors.overlay(overrides, MergePolicy::Additive);
            self.tiles.register(
                index,
                TileDefinition {
                    palette: palette.key.clone(),
                    behaviors,
                },
            )?;
        }
        log::debug!(
            "registered palette `{}` with {} tiles at {}",
            palette.key,
            palette.tiles.len(),
            base.get()
        );
        Ok(())
    }

    /// Registers an actor template.
    pub fn register_actor(
        &mut self,
        key: impl Into<String>,
        definition: ActorDefinition,
    ) -> Result<(), RegistryError> {
        self.actors.register(key.into(), definition)
    }

    /// Registers a loot table.
    pub fn register_loot_table(
        &mut self,
        key: impl Into<String>,
        table: LootTable,
    ) -> Result<(), RegistryError> {
        self.loot_tables.register(key.into(), table)
    }

    /// Looks up a tile definition.
    #[must_use]
    pub fn tile(&self, index: TileIndex) -> Option<&TileDefinition> {
        self.tiles.get(&index)
    }

    /// Looks up an actor template.
    #[must_use]
    pub fn actor(&self, key: &str) -> Option<&ActorDefinition> {
        self.actors.get(key)
    }

    /// Looks up a loot table.
    #[must_use]
    pub fn loot_table(&self, key: &str) -> Option<&LootTable> {
        self.loot_tables.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn palette_tiles_start_from_defaults() {
        let palette = PaletteDefinition {
            key: "bushes".to_owned(),
            default_behaviors: TileBehaviors {
                solid: true,
                cuttable: true,
                ..TileBehaviors::default()
            },
            tiles: vec![
                TileBehaviors::default(),
                TileBehaviors {
                    under_tile: Some(TileIndex::new(4)),
                    ..TileBehaviors::default()
                },
            ],
        };
        let mut registries = Registries::new();
        registries
            .register_palette(TileIndex::new(10), &palette)
            .expect("register");

        let second = registries.tile(TileIndex::new(11)).expect("tile 11");
        assert!(second.behaviors.solid);
        assert!(second.behaviors.cuttable);
        assert_eq!(second.behaviors.under_tile, Some(TileIndex::new(4)));
        assert!(registries.tile(TileIndex::new(12)).is_none());
    }

    #[test]
    fn palettes_cannot_claim_the_empty_index() {
        let palette = PaletteDefinition {
            tiles: vec![TileBehaviors::default()],
            ..PaletteDefinition::default()
        };
        let mut registries = Registries::new();
        assert!(matches!(
            registries.register_palette(TileIndex::EMPTY, &palette),
            Err(RegistryError::InvalidKey { .. })
        ));
    }

    #[test]
    fn overlapping_palettes_are_rejected() {
        let palette = PaletteDefinition {
            tiles: vec![TileBehaviors::default(); 3],
            ..PaletteDefinition::default()
        };
        let mut registries = Registries::new();
        registries
            .register_palette(TileIndex::new(1), &palette)
            .expect("first palette");
        assert!(matches!(
            registries.register_palette(TileIndex::new(3), &palette),
            Err(RegistryError::Duplicate { .. })
        ));
    }

    #[test]
    fn loot_rolls_are_seeded() {
        let table = LootTable {
            entries: vec![
                LootEntry {
                    item: "heart".to_owned(),
                    weight: 1,
                },
                LootEntry {
                    item: "money".to_owned(),
                    weight: 3,
                },
            ],
            nothing_weight: 0,
        };
        let rolls = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..16)
                .map(|_| table.roll(&mut rng).map(str::to_owned))
                .collect::<Vec<_>>()
        };
        assert_eq!(rolls(7), rolls(7));
        assert!(rolls(7).iter().all(Option::is_some));
    }

    #[test]
    fn empty_loot_table_drops_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(LootTable::default().roll(&mut rng), None);
    }
}
