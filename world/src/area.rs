//! Live areas: layered tile grids, the cached behavior grid and owned objects.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use spiritfield_core::{
    geometry::is_point_in_rect, EffectId, MergePolicy, ObjectId, Point, Realm, TileBehaviors,
    TileCoord, TileIndex,
};
use thiserror::Error;

use crate::{
    effects::HitEffect,
    objects::{Actor, AreaObject, Obstacle, ObstacleDefinition, Pickup},
    registries::{Registries, TileDefinition},
};

/// Failure raised while instantiating an area or spawning into it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AreaError {
    /// The area has no tiles.
    #[error("area must be at least one tile wide and tall, got {width}x{height}")]
    Empty {
        /// Declared width in tiles.
        width: u32,
        /// Declared height in tiles.
        height: u32,
    },
    /// A layer does not cover the whole area.
    #[error("layer `{layer}` holds {actual} tiles, expected {expected}")]
    LayerSize {
        /// Key of the offending layer.
        layer: String,
        /// Tiles the area needs.
        expected: usize,
        /// Tiles the layer holds.
        actual: usize,
    },
    /// A layer references a tile nobody registered.
    #[error("layer `{layer}` references unregistered tile {index}")]
    UnknownTile {
        /// Key of the offending layer.
        layer: String,
        /// Unregistered index.
        index: u16,
    },
    /// No actor template is registered under the key.
    #[error("unknown actor `{0}`")]
    UnknownActor(String),
}

/// One tile layer of an area definition, stored row-major.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerDefinition {
    /// Draw and collision layer key.
    pub key: String,
    /// Tile indices, `width * height` of them.
    pub tiles: Vec<TileIndex>,
}

/// Object placed in an area when it is instantiated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectDefinition {
    /// Registered actor template.
    Actor {
        /// Registry key.
        key: String,
        /// Top-left corner of the body.
        at: Point,
    },
    /// Block, pot or similar.
    Obstacle(ObstacleDefinition),
    /// Loot already lying on the ground.
    Pickup {
        /// Item key.
        item: String,
        /// Centre of the pickup.
        at: Point,
    },
}

/// Static description of an area.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaDefinition {
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Tile layers, bottom first.
    pub layers: Vec<LayerDefinition>,
    /// Objects spawned on instantiation.
    pub objects: Vec<ObjectDefinition>,
}

/// Live tile layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    key: String,
    tiles: Vec<TileIndex>,
}

impl Layer {
    /// Draw and collision layer key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Tile indices, row-major.
    #[must_use]
    pub fn tiles(&self) -> &[TileIndex] {
        &self.tiles
    }
}

/// Merged behavior under a point plus the solid objects covering it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileLookup {
    /// Behavior merged across every layer; empty outside the grid.
    pub behaviors: TileBehaviors,
    /// Tile column.
    pub tx: i32,
    /// Tile row.
    pub ty: i32,
    /// Visible solid objects covering the point.
    pub objects: Vec<ObjectId>,
}

/// What a tile destruction replaced.
#[derive(Clone, Debug, PartialEq)]
pub struct TileDestruction {
    /// Index that was destroyed.
    pub previous: TileIndex,
    /// Index that replaced it.
    pub replaced_with: TileIndex,
    /// Behaviors of the destroyed tile's own definition.
    pub behaviors: TileBehaviors,
}

#[derive(Debug)]
struct ObjectEntry {
    id: ObjectId,
    object: Box<dyn AreaObject>,
}

/// Mutable instantiation of an [`AreaDefinition`].
#[derive(Debug)]
pub struct AreaInstance {
    realm: Realm,
    width: u32,
    height: u32,
    layers: Vec<Layer>,
    behavior_grid: Vec<TileBehaviors>,
    objects: Vec<ObjectEntry>,
    effects: Vec<(EffectId, HitEffect)>,
    pending_removals: BTreeSet<ObjectId>,
    registries: Arc<Registries>,
    merge_policy: MergePolicy,
    next_object: u32,
    next_effect: u32,
}

impl AreaInstance {
    /// Instantiates a definition, building the behavior grid and spawning its objects.
    pub fn new(
        realm: Realm,
        definition: &AreaDefinition,
        registries: Arc<Registries>,
        merge_policy: MergePolicy,
    ) -> Result<Self, AreaError> {
        if definition.width == 0 || definition.height == 0 {
            return Err(AreaError::Empty {
                width: definition.width,
                height: definition.height,
            });
        }
        let expected = definition.width as usize * definition.height as usize;
        for layer in &definition.layers {
            if layer.tiles.len() != expected {
                return Err(AreaError::LayerSize {
                    layer: layer.key.clone(),
                    expected,
                    actual: layer.tiles.len(),
                });
            }
            if let Some(unknown) = layer
                .tiles
                .iter()
                .find(|tile| !tile.is_empty() && registries.tile(**tile).is_none())
            {
                return Err(AreaError::UnknownTile {
                    layer: layer.key.clone(),
                    index: unknown.get(),
                });
            }
        }

        let mut area = Self {
            realm,
            width: definition.width,
            height: definition.height,
            layers: definition
                .layers
                .iter()
                .map(|layer| Layer {
                    key: layer.key.clone(),
                    tiles: layer.tiles.clone(),
                })
                .collect(),
            behavior_grid: vec![TileBehaviors::default(); expected],
            objects: Vec::new(),
            effects: Vec::new(),
            pending_removals: BTreeSet::new(),
            registries,
            merge_policy,
            next_object: 1,
            next_effect: 1,
        };
        for index in 0..expected {
            area.behavior_grid[index] = area.merged_behaviors(index);
        }
        for object in &definition.objects {
            let _ = area.spawn(object)?;
        }
        Ok(area)
    }

    /// Realm the area belongs to.
    #[must_use]
    pub const fn realm(&self) -> Realm {
        self.realm
    }

    /// Width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Tile layers, bottom first.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Rule used to fold layers into the behavior grid.
    #[must_use]
    pub const fn merge_policy(&self) -> MergePolicy {
        self.merge_policy
    }

    /// Content definitions shared with the paired area.
    #[must_use]
    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub fn contains_tile(&self, coord: TileCoord) -> bool {
        self.grid_index(coord).is_some()
    }

    fn grid_index(&self, coord: TileCoord) -> Option<usize> {
        let x = u32::try_from(coord.x).ok().filter(|x| *x < self.width)?;
        let y = u32::try_from(coord.y).ok().filter(|y| *y < self.height)?;
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Tile index of one layer.
    #[must_use]
    pub fn tile_at(&self, layer: usize, coord: TileCoord) -> Option<TileIndex> {
        let index = self.grid_index(coord)?;
        self.layers.get(layer)?.tiles.get(index).copied()
    }

    /// Cached merged behavior of a tile, `None` outside the grid.
    #[must_use]
    pub fn behavior_at(&self, coord: TileCoord) -> Option<&TileBehaviors> {
        self.behavior_grid.get(self.grid_index(coord)?)
    }

    /// Merged behavior under a world point together with the solid objects covering it.
    ///
    /// Points outside the grid resolve to empty behavior.
    #[must_use]
    pub fn get_tile_behaviors_and_obstacles(&self, point: Point) -> TileLookup {
        let coord = TileCoord::containing(point);
        TileLookup {
            behaviors: self.behavior_at(coord).cloned().unwrap_or_default(),
            tx: coord.x,
            ty: coord.y,
            objects: self.solid_objects_at(point),
        }
    }

    /// Recomputes the cached behavior of one tile from its layers.
    pub fn reset_tile_behavior(&mut self, coord: TileCoord) {
        if let Some(index) = self.grid_index(coord) {
            self.behavior_grid[index] = self.merged_behaviors(index);
        }
    }

    fn merged_behaviors(&self, index: usize) -> TileBehaviors {
        let mut merged = TileBehaviors::default();
        for layer in &self.layers {
            let Some(tile) = layer.tiles.get(index).filter(|tile| !tile.is_empty()) else {
                continue;
            };
            if let Some(definition) = self.registries.tile(*tile) {
                merged.overlay(&definition.behaviors, self.merge_policy);
            }
        }
        merged
    }

    /// Registered definition of a tile index.
    #[must_use]
    pub fn tile_definition(&self, tile: TileIndex) -> Option<&TileDefinition> {
        self.registries.tile(tile)
    }

    /// Topmost layer whose tile's own definition satisfies the predicate.
    #[must_use]
    pub fn find_topmost_tile<F>(&self, coord: TileCoord, predicate: F) -> Option<(usize, TileIndex)>
    where
        F: Fn(&TileBehaviors) -> bool,
    {
        let index = self.grid_index(coord)?;
        self.layers
            .iter()
            .enumerate()
            .rev()
            .filter_map(|(layer, tiles)| Some((layer, *tiles.tiles.get(index)?)))
            .filter(|(_, tile)| !tile.is_empty())
            .find(|(_, tile)| {
                self.registries
                    .tile(*tile)
                    .map_or(false, |definition| predicate(&definition.behaviors))
            })
    }

    /// Overwrites one tile and refreshes its behavior.
    ///
    /// Returns the previous index, or `None` when the write was rejected
    /// because the coordinate, layer or tile index is unknown.
    pub fn set_tile(&mut self, layer: usize, coord: TileCoord, tile: TileIndex) -> Option<TileIndex> {
        if !tile.is_empty() && self.registries.tile(tile).is_none() {
            log::warn!("refusing to write unregistered tile {} at {coord:?}", tile.get());
            return None;
        }
        let index = self.grid_index(coord)?;
        let slot = self.layers.get_mut(layer)?.tiles.get_mut(index)?;
        let previous = std::mem::replace(slot, tile);
        self.reset_tile_behavior(coord);
        Some(previous)
    }

    /// Swaps a tile for its under tile, or empties it.
    pub fn destroy_tile(&mut self, layer: usize, coord: TileCoord) -> Option<TileDestruction> {
        let previous = self.tile_at(layer, coord)?;
        let behaviors = self
            .registries
            .tile(previous)
            .map(|definition| definition.behaviors.clone())
            .unwrap_or_default();
        let replaced_with = behaviors.under_tile.unwrap_or(TileIndex::EMPTY);
        let _ = self.set_tile(layer, coord, replaced_with)?;
        log::debug!(
            "{:?} tile {} at {coord:?} destroyed, replaced with {}",
            self.realm,
            previous.get(),
            replaced_with.get()
        );
        Some(TileDestruction {
            previous,
            replaced_with,
            behaviors,
        })
    }

    /// Spawns an object from its definition.
    pub fn spawn(&mut self, definition: &ObjectDefinition) -> Result<ObjectId, AreaError> {
        match definition {
            ObjectDefinition::Actor { key, at } => self.spawn_actor(key, *at),
            ObjectDefinition::Obstacle(obstacle) => {
                Ok(self.add_object(Box::new(Obstacle::new(obstacle.clone()))))
            }
            ObjectDefinition::Pickup { item, at } => {
                Ok(self.add_object(Box::new(Pickup::centered_on(item.clone(), *at))))
            }
        }
    }

    /// Spawns a registered actor template with its body's top-left corner at `at`.
    pub fn spawn_actor(&mut self, key: &str, at: Point) -> Result<ObjectId, AreaError> {
        let actor = {
            let definition = self
                .registries
                .actor(key)
                .ok_or_else(|| AreaError::UnknownActor(key.to_owned()))?;
            Actor::from_definition(key, definition, at)
        };
        Ok(self.add_object(Box::new(actor)))
    }

    /// Takes ownership of an object and assigns it an identifier.
    pub fn add_object(&mut self, object: Box<dyn AreaObject>) -> ObjectId {
        let id = ObjectId::new(self.next_object);
        self.next_object += 1;
        log::debug!("{:?} area spawned `{}` as {}", self.realm, object.key(), id.get());
        self.objects.push(ObjectEntry { id, object });
        id
    }

    /// Detaches an object, handing ownership back. Removing twice is a no-op.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<Box<dyn AreaObject>> {
        let position = self.objects.iter().position(|entry| entry.id == id)?;
        let _ = self.pending_removals.remove(&id);
        let entry = self.objects.remove(position);
        log::debug!("{:?} area removed `{}` ({})", self.realm, entry.object.key(), id.get());
        Some(entry.object)
    }

    /// Marks an object for removal once the current sweep finishes.
    pub fn queue_removal(&mut self, id: ObjectId) {
        let _ = self.pending_removals.insert(id);
    }

    /// Removes every queued object, returning the ones that were still present.
    pub fn flush_removals(&mut self) -> Vec<ObjectId> {
        let queued = std::mem::take(&mut self.pending_removals);
        queued
            .into_iter()
            .filter(|id| self.remove_object(*id).is_some())
            .collect()
    }

    /// Looks up an object.
    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&dyn AreaObject> {
        self.objects
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.object.as_ref())
    }

    /// Looks up an object for mutation.
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut dyn AreaObject> {
        for entry in &mut self.objects {
            if entry.id == id {
                return Some(entry.object.as_mut());
            }
        }
        None
    }

    /// Identifiers of every object in spawn order, detached from the area.
    #[must_use]
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|entry| entry.id).collect()
    }

    /// Iterates objects in spawn order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &dyn AreaObject)> {
        self.objects
            .iter()
            .map(|entry| (entry.id, entry.object.as_ref()))
    }

    /// Number of live objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Visible solid objects whose hitbox covers the point.
    #[must_use]
    pub fn solid_objects_at(&self, point: Point) -> Vec<ObjectId> {
        self.objects()
            .filter(|(_, object)| object.is_solid() && !object.is_hidden())
            .filter(|(_, object)| {
                object
                    .hitbox()
                    .map_or(false, |hitbox| is_point_in_rect(point, &hitbox))
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Takes ownership of a persistent effect.
    pub fn add_effect(&mut self, effect: HitEffect) -> EffectId {
        let id = EffectId::new(self.next_effect);
        self.next_effect += 1;
        self.effects.push((id, effect));
        id
    }

    /// Live effects in spawn order.
    #[must_use]
    pub fn effects(&self) -> &[(EffectId, HitEffect)] {
        &self.effects
    }

    /// Detaches every effect so they can be resolved against the area.
    pub fn take_effects(&mut self) -> Vec<(EffectId, HitEffect)> {
        std::mem::take(&mut self.effects)
    }

    /// Re-attaches effects ahead of any spawned while they were detached.
    pub fn restore_effects(&mut self, mut effects: Vec<(EffectId, HitEffect)>) {
        effects.append(&mut self.effects);
        self.effects = effects;
    }

    /// Advances every object by one tick in spawn order.
    pub fn update_objects(&mut self, dt: Duration) {
        for entry in &mut self.objects {
            entry.object.update(dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registries::{ActorDefinition, PaletteDefinition};

    const FLOOR: TileIndex = TileIndex::new(1);
    const PIT: TileIndex = TileIndex::new(2);
    const BRIDGE: TileIndex = TileIndex::new(3);
    const BUSH: TileIndex = TileIndex::new(4);
    const STUMP: TileIndex = TileIndex::new(5);

    fn registries() -> Arc<Registries> {
        let palette = PaletteDefinition {
            key: "field".to_owned(),
            default_behaviors: TileBehaviors::default(),
            tiles: vec![
                TileBehaviors::default(),
                TileBehaviors {
                    pit: true,
                    ..TileBehaviors::default()
                },
                TileBehaviors::default(),
                TileBehaviors {
                    solid: true,
                    cuttable: true,
                    under_tile: Some(STUMP),
                    ..TileBehaviors::default()
                },
                TileBehaviors::default(),
            ],
        };
        let mut registries = Registries::new();
        registries.register_palette(FLOOR, &palette).expect("palette");
        registries
            .register_actor("slime", ActorDefinition::default())
            .expect("actor");
        Arc::new(registries)
    }

    fn two_layer_area(policy: MergePolicy) -> AreaInstance {
        let definition = AreaDefinition {
            width: 2,
            height: 1,
            layers: vec![
                LayerDefinition {
                    key: "floor".to_owned(),
                    tiles: vec![PIT, FLOOR],
                },
                LayerDefinition {
                    key: "field".to_owned(),
                    tiles: vec![BRIDGE, BUSH],
                },
            ],
            objects: Vec::new(),
        };
        AreaInstance::new(Realm::Material, &definition, registries(), policy).expect("area")
    }

    #[test]
    fn merge_policy_decides_whether_bridges_cover_pits() {
        let additive = two_layer_area(MergePolicy::Additive);
        assert!(additive.behavior_at(TileCoord::new(0, 0)).expect("tile").pit);

        let topmost = two_layer_area(MergePolicy::TopmostWins);
        assert!(!topmost.behavior_at(TileCoord::new(0, 0)).expect("tile").pit);
    }

    #[test]
    fn lookups_outside_the_grid_are_open() {
        let area = two_layer_area(MergePolicy::Additive);
        let lookup = area.get_tile_behaviors_and_obstacles(Point::new(-3.0, 40.0));
        assert_eq!((lookup.tx, lookup.ty), (-1, 2));
        assert_eq!(lookup.behaviors, TileBehaviors::default());
        assert!(area.behavior_at(TileCoord::new(2, 0)).is_none());
    }

    #[test]
    fn tile_writes_refresh_the_behavior_grid() {
        let mut area = two_layer_area(MergePolicy::Additive);
        let coord = TileCoord::new(1, 0);
        assert!(area.behavior_at(coord).expect("tile").solid);

        let destruction = area.destroy_tile(1, coord).expect("destroyed");
        assert_eq!(destruction.previous, BUSH);
        assert_eq!(destruction.replaced_with, STUMP);
        assert!(!area.behavior_at(coord).expect("tile").solid);
        assert_eq!(area.find_topmost_tile(coord, |b| b.cuttable), None);
    }

    #[test]
    fn unregistered_tiles_are_rejected() {
        let mut area = two_layer_area(MergePolicy::Additive);
        assert_eq!(area.set_tile(0, TileCoord::new(0, 0), TileIndex::new(99)), None);
        assert_eq!(area.tile_at(0, TileCoord::new(0, 0)), Some(PIT));

        let definition = AreaDefinition {
            width: 1,
            height: 1,
            layers: vec![LayerDefinition {
                key: "floor".to_owned(),
                tiles: vec![TileIndex::new(42)],
            }],
            objects: Vec::new(),
        };
        let error = AreaInstance::new(
            Realm::Spirit,
            &definition,
            registries(),
            MergePolicy::Additive,
        )
        .unwrap_err();
        assert_eq!(
            error,
            AreaError::UnknownTile {
                layer: "floor".to_owned(),
                index: 42
            }
        );
    }

    #[test]
    fn layers_must_cover_the_area() {
        let definition = AreaDefinition {
            width: 2,
            height: 2,
            layers: vec![LayerDefinition {
                key: "floor".to_owned(),
                tiles: vec![FLOOR; 3],
            }],
            objects: Vec::new(),
        };
        let error =
            AreaInstance::new(Realm::Material, &definition, registries(), MergePolicy::Additive)
                .unwrap_err();
        assert!(matches!(error, AreaError::LayerSize { expected: 4, actual: 3, .. }));
    }

    #[test]
    fn double_removal_is_a_no_op() {
        let mut area = two_layer_area(MergePolicy::Additive);
        let slime = area.spawn_actor("slime", Point::new(0.0, 0.0)).expect("slime");
        assert!(area.remove_object(slime).is_some());
        assert!(area.remove_object(slime).is_none());
        assert_eq!(area.object_count(), 0);
        assert!(matches!(
            area.spawn_actor("dragon", Point::default()),
            Err(AreaError::UnknownActor(_))
        ));
    }

    #[test]
    fn queued_removals_flush_once() {
        let mut area = two_layer_area(MergePolicy::Additive);
        let first = area.spawn_actor("slime", Point::new(0.0, 0.0)).expect("slime");
        let second = area.spawn_actor("slime", Point::new(4.0, 0.0)).expect("slime");
        area.queue_removal(first);
        area.queue_removal(first);
        assert_eq!(area.flush_removals(), vec![first]);
        assert!(area.flush_removals().is_empty());
        assert_eq!(area.object_ids(), vec![second]);
    }
}
