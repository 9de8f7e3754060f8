//! TOML scenario files: content, areas and a timed script.

use std::{collections::BTreeMap, fs, path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use spiritfield_core::{
    Direction, EffectSpec, HitProperties, MergePolicy, Point, Realm, TileIndex, FRAME_LENGTH,
};
use spiritfield_world::{
    ActorDefinition, AreaDefinition, LootTable, ObjectClass, PaletteDefinition, Registries, World,
    WorldSettings,
};

/// Engine knobs of a scenario.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct EngineSettings {
    /// Logical duration of one tick in milliseconds.
    pub(crate) frame_length_ms: u64,
    /// Seed of the world's loot generator.
    pub(crate) rng_seed: u64,
    /// Rule used to fold tile layers into behaviors.
    pub(crate) merge_policy: MergePolicy,
    /// Ticks simulated when the command line does not say otherwise.
    pub(crate) ticks: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            frame_length_ms: FRAME_LENGTH.as_millis() as u64,
            rng_seed: 0,
            merge_policy: MergePolicy::default(),
            ticks: 50,
        }
    }
}

/// Palette registered from a base tile index.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct PaletteEntry {
    /// Index of the palette's first tile.
    pub(crate) base: TileIndex,
    #[serde(flatten)]
    pub(crate) palette: PaletteDefinition,
}

/// Actor spawned under a name the script refers to.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SpawnEntry {
    pub(crate) name: String,
    /// Actor registry key.
    pub(crate) key: String,
    #[serde(default = "material")]
    pub(crate) realm: Realm,
    pub(crate) at: Point,
}

/// Action taken before the tick with index `tick` runs.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct ScriptEntry {
    pub(crate) tick: u64,
    #[serde(flatten)]
    pub(crate) action: Action,
}

/// Scripted inputs standing in for a player and enemy behaviors.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum Action {
    /// Moves a named actor by a pixel delta.
    Move { actor: String, dx: f32, dy: f32 },
    /// Steps a named actor toward the nearest object of a class.
    Chase {
        actor: String,
        class: ObjectClass,
        radius: f32,
        #[serde(default)]
        sight: bool,
    },
    /// Grabs whatever the named actor faces.
    Grab { actor: String, facing: Direction },
    /// Places a persistent attack, optionally sourced from a named actor.
    /// Only the active realm advances, so attacks elsewhere are dropped.
    Attack {
        #[serde(default = "material")]
        realm: Realm,
        by: Option<String>,
        effect: EffectSpec,
    },
    /// Resolves one hit immediately.
    Strike {
        #[serde(default = "material")]
        realm: Realm,
        by: Option<String>,
        hit: HitProperties,
    },
    /// Changes the active realm.
    SwitchRealm { realm: Realm },
    /// Overwrites a tile, mirroring shared tiles into the other realm.
    SetTile {
        #[serde(default = "material")]
        realm: Realm,
        #[serde(default)]
        layer: usize,
        x: i32,
        y: i32,
        tile: TileIndex,
    },
}

const fn material() -> Realm {
    Realm::Material
}

/// Complete scenario file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default)]
    pub(crate) engine: EngineSettings,
    #[serde(default)]
    pub(crate) palettes: Vec<PaletteEntry>,
    #[serde(default)]
    pub(crate) actors: BTreeMap<String, ActorDefinition>,
    #[serde(default)]
    pub(crate) loot_tables: BTreeMap<String, LootTable>,
    pub(crate) material: AreaDefinition,
    /// Defaults to a copy of the material area.
    pub(crate) spirit: Option<AreaDefinition>,
    #[serde(default)]
    pub(crate) spawn: Vec<SpawnEntry>,
    #[serde(default)]
    pub(crate) script: Vec<ScriptEntry>,
}

impl Scenario {
    /// Reads and parses a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid scenario {}", path.display()))
    }

    /// Parses a scenario from TOML text.
    pub(crate) fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Registers the scenario's content.
    pub(crate) fn registries(&self) -> Result<Registries> {
        let mut registries = Registries::new();
        for entry in &self.palettes {
            registries
                .register_palette(entry.base, &entry.palette)
                .with_context(|| format!("palette `{}`", entry.palette.key))?;
        }
        for (key, actor) in &self.actors {
            registries.register_actor(key.as_str(), actor.clone())?;
        }
        for (key, table) in &self.loot_tables {
            registries.register_loot_table(key.as_str(), table.clone())?;
        }
        Ok(registries)
    }

    /// Builds the world, with `seed` overriding the engine seed.
    pub(crate) fn build_world(&self, seed: Option<u64>) -> Result<World> {
        let settings = WorldSettings {
            merge_policy: self.engine.merge_policy,
            rng_seed: seed.unwrap_or(self.engine.rng_seed),
            frame_length: Duration::from_millis(self.engine.frame_length_ms),
        };
        let spirit = self.spirit.as_ref().unwrap_or(&self.material);
        let world = World::new(
            Arc::new(self.registries()?),
            &self.material,
            spirit,
            settings,
        )
        .context("failed to instantiate areas")?;
        Ok(world)
    }
}
