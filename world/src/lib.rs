#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Spiritfield.
//!
//! The world owns a material area and its paired spirit area. Adapters mutate
//! it exclusively through [`apply`]; the movement and combat systems borrow an
//! area directly through [`World::area_mut`] and report what they did as
//! events of their own.

use std::{sync::Arc, time::Duration};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use spiritfield_core::{Command, Event, MergePolicy, Realm, TileCoord, TileIndex, FRAME_LENGTH};

pub mod area;
pub mod effects;
pub mod objects;
pub mod registries;

pub use area::{
    AreaDefinition, AreaError, AreaInstance, Layer, LayerDefinition, ObjectDefinition,
    TileDestruction, TileLookup,
};
pub use effects::HitEffect;
pub use objects::{
    Actor, AreaObject, Grabbable, HitContext, HitResponse, Hittable, Movable, ObjectClass,
    Obstacle, ObstacleDefinition, Pickup, Pushable,
};
pub use registries::{
    ActorDefinition, LootEntry, LootTable, PaletteDefinition, Registries, TileDefinition,
};

/// Engine-wide knobs chosen when the world is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldSettings {
    /// Rule used to fold tile layers into behaviors.
    pub merge_policy: MergePolicy,
    /// Seed of the world's loot generator.
    pub rng_seed: u64,
    /// Logical duration of one tick.
    pub frame_length: Duration,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            merge_policy: MergePolicy::default(),
            rng_seed: 0,
            frame_length: FRAME_LENGTH,
        }
    }
}

/// Material area and its spirit counterpart.
#[derive(Debug)]
pub struct AreaPair {
    material: AreaInstance,
    spirit: AreaInstance,
}

impl AreaPair {
    /// Area of the provided realm.
    #[must_use]
    pub const fn get(&self, realm: Realm) -> &AreaInstance {
        match realm {
            Realm::Material => &self.material,
            Realm::Spirit => &self.spirit,
        }
    }

    /// Mutable area of the provided realm.
    pub fn get_mut(&mut self, realm: Realm) -> &mut AreaInstance {
        match realm {
            Realm::Material => &mut self.material,
            Realm::Spirit => &mut self.spirit,
        }
    }
}

/// Represents the authoritative Spiritfield world state.
#[derive(Debug)]
pub struct World {
    registries: Arc<Registries>,
    areas: AreaPair,
    active: Realm,
    rng: ChaCha8Rng,
    frame_length: Duration,
    tick_index: u64,
}

impl World {
    /// Instantiates both areas of a zone, starting in the material realm.
    pub fn new(
        registries: Arc<Registries>,
        material: &AreaDefinition,
        spirit: &AreaDefinition,
        settings: WorldSettings,
    ) -> Result<Self, AreaError> {
        let areas = AreaPair {
            material: AreaInstance::new(
                Realm::Material,
                material,
                Arc::clone(&registries),
                settings.merge_policy,
            )?,
            spirit: AreaInstance::new(
                Realm::Spirit,
                spirit,
                Arc::clone(&registries),
                settings.merge_policy,
            )?,
        };
        Ok(Self {
            registries,
            areas,
            active: Realm::Material,
            rng: ChaCha8Rng::seed_from_u64(settings.rng_seed),
            frame_length: settings.frame_length,
            tick_index: 0,
        })
    }

    /// Mutable access to one area for the movement and combat systems.
    pub fn area_mut(&mut self, realm: Realm) -> &mut AreaInstance {
        self.areas.get_mut(realm)
    }

    /// Mutable access to the area of the active realm.
    pub fn active_area_mut(&mut self) -> &mut AreaInstance {
        self.areas.get_mut(self.active)
    }

    fn write_tile(
        &mut self,
        realm: Realm,
        layer: usize,
        coord: TileCoord,
        tile: TileIndex,
        out_events: &mut Vec<Event>,
    ) -> Option<TileIndex> {
        let previous = self.areas.get_mut(realm).set_tile(layer, coord, tile)?;
        if previous != tile {
            out_events.push(Event::TileChanged {
                realm,
                layer,
                coord,
                previous,
                tile,
            });
        }
        Some(previous)
    }

    fn mirror_tile(
        &mut self,
        from: Realm,
        layer: usize,
        coord: TileCoord,
        previous: TileIndex,
        tile: TileIndex,
        out_events: &mut Vec<Event>,
    ) {
        let target = from.alternate();
        if previous == tile || self.areas.get(target).tile_at(layer, coord) != Some(previous) {
            return;
        }
        let _ = self.write_tile(target, layer, coord, tile, out_events);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick => {
            world.tick_index = world.tick_index.saturating_add(1);
            let dt = world.frame_length;
            world.areas.get_mut(world.active).update_objects(dt);
            out_events.push(Event::TimeAdvanced {
                tick: world.tick_index,
                dt,
            });
        }
        Command::SwitchRealm { realm } => {
            if world.active != realm {
                log::debug!("switching from {:?} to {realm:?}", world.active);
                world.active = realm;
                out_events.push(Event::RealmChanged { realm });
            }
        }
        Command::SpawnActor { realm, key, at } => {
            match world.areas.get_mut(realm).spawn_actor(&key, at) {
                Ok(object) => out_events.push(Event::ObjectSpawned { realm, object }),
                Err(error) => log::warn!("cannot spawn actor: {error}"),
            }
        }
        Command::RemoveObject { realm, object } => {
            if world.areas.get_mut(realm).remove_object(object).is_some() {
                out_events.push(Event::ObjectRemoved { realm, object });
            }
        }
        Command::SetTile {
            realm,
            layer,
            coord,
            tile,
        } => {
            if let Some(previous) = world.write_tile(realm, layer, coord, tile, out_events) {
                world.mirror_tile(realm, layer, coord, previous, tile, out_events);
            }
        }
        Command::ClearTileInOneWorld {
            realm,
            layer,
            coord,
        } => {
            let _ = world.write_tile(realm, layer, coord, TileIndex::EMPTY, out_events);
        }
        Command::MirrorTileChange {
            from,
            layer,
            coord,
            previous,
            tile,
        } => {
            world.mirror_tile(from, layer, coord, previous, tile, out_events);
        }
        Command::DropLoot { realm, table, at } => {
            let Some(loot) = world.registries.loot_table(&table) else {
                log::warn!("unknown loot table `{table}`");
                return;
            };
            let Some(item) = loot.roll(&mut world.rng).map(str::to_owned) else {
                log::trace!("loot table `{table}` dropped nothing");
                return;
            };
            let object = world
                .areas
                .get_mut(realm)
                .add_object(Box::new(Pickup::centered_on(item.clone(), at)));
            out_events.push(Event::ObjectSpawned { realm, object });
            out_events.push(Event::LootSpawned {
                realm,
                object,
                item,
            });
        }
        Command::SpawnEffect { realm, effect } => {
            let effect = world.areas.get_mut(realm).add_effect(HitEffect::new(effect));
            out_events.push(Event::EffectSpawned { realm, effect });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use spiritfield_core::{ObjectId, Realm, Rect, TileCoord, TileIndex};

    use super::{AreaInstance, ObjectClass, World};

    /// Realm the player currently inhabits.
    #[must_use]
    pub fn active_realm(world: &World) -> Realm {
        world.active
    }

    /// Number of ticks applied so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Read-only access to one area.
    #[must_use]
    pub fn area(world: &World, realm: Realm) -> &AreaInstance {
        world.areas.get(realm)
    }

    /// Tile index stored on one layer of an area.
    #[must_use]
    pub fn tile(world: &World, realm: Realm, layer: usize, coord: TileCoord) -> Option<TileIndex> {
        world.areas.get(realm).tile_at(layer, coord)
    }

    /// Captures a read-only view of the objects of an area.
    #[must_use]
    pub fn object_view(world: &World, realm: Realm) -> Vec<ObjectSnapshot> {
        world
            .areas
            .get(realm)
            .objects()
            .map(|(id, object)| ObjectSnapshot {
                id,
                key: object.key().to_owned(),
                class: object.class(),
                hitbox: object.hitbox(),
                life: object.as_actor().map(|actor| actor.life()),
            })
            .collect()
    }

    /// Read-only description of one object.
    #[derive(Clone, Debug, PartialEq)]
    pub struct ObjectSnapshot {
        /// Identifier assigned by the area.
        pub id: ObjectId,
        /// Definition key.
        pub key: String,
        /// Targeting class.
        pub class: ObjectClass,
        /// Collision footprint.
        pub hitbox: Option<Rect>,
        /// Remaining life of actors.
        pub life: Option<f32>,
    }
}
