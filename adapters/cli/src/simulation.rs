//! Scripted simulation loop driving the world and its systems.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use spiritfield_core::{Command, Event, ObjectId, Realm, TileCoord};
use spiritfield_system_combat::{advance_effects, apply_touch_hits, hit_targets, Combat};
use spiritfield_system_movement::{move_actor, Movement};
use spiritfield_system_targeting::{try_grab, Targeting};
use spiritfield_world::{self as world, query, AreaInstance, World};

use crate::scenario::{Action, Scenario, ScriptEntry};

/// World, systems and the remaining script of one scenario run.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    movement: Movement,
    combat: Combat,
    targeting: Targeting,
    actors: BTreeMap<String, (Realm, ObjectId)>,
    script: Vec<ScriptEntry>,
    cursor: usize,
}

impl Simulation {
    /// Builds the world and spawns the scenario's named actors.
    pub(crate) fn new(
        scenario: &Scenario,
        seed: Option<u64>,
        out_events: &mut Vec<Event>,
    ) -> Result<Self> {
        let mut script = scenario.script.clone();
        script.sort_by_key(|entry| entry.tick);

        let mut simulation = Self {
            world: scenario.build_world(seed)?,
            movement: Movement::default(),
            combat: Combat::new(),
            targeting: Targeting::new(),
            actors: BTreeMap::new(),
            script,
            cursor: 0,
        };

        for spawn in &scenario.spawn {
            if simulation.actors.contains_key(&spawn.name) {
                bail!("actor name `{}` is used twice", spawn.name);
            }
            let mut events = Vec::new();
            world::apply(
                &mut simulation.world,
                Command::SpawnActor {
                    realm: spawn.realm,
                    key: spawn.key.clone(),
                    at: spawn.at,
                },
                &mut events,
            );
            let Some(object) = events.iter().find_map(|event| match event {
                Event::ObjectSpawned { object, .. } => Some(*object),
                _ => None,
            }) else {
                bail!("actor `{}` uses unknown definition `{}`", spawn.name, spawn.key);
            };
            let _ = simulation
                .actors
                .insert(spawn.name.clone(), (spawn.realm, object));
            simulation.settle(events, out_events);
        }

        Ok(simulation)
    }

    /// Index of the last completed tick.
    pub(crate) fn tick_index(&self) -> u64 {
        query::tick_index(&self.world)
    }

    /// Read access for inspecting the outcome.
    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    /// Identifier and realm of a named actor.
    pub(crate) fn actor(&self, name: &str) -> Option<(Realm, ObjectId)> {
        self.actors.get(name).copied()
    }

    /// Runs the script entries due before the next tick, then the tick.
    pub(crate) fn step(&mut self, out_events: &mut Vec<Event>) {
        let due = self.tick_index();
        while let Some(entry) = self.script.get(self.cursor) {
            if entry.tick > due {
                break;
            }
            let action = entry.action.clone();
            self.cursor += 1;
            let mut events = Vec::new();
            self.perform(action, &mut events);
            self.settle(events, out_events);
        }

        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Tick, &mut events);
        self.settle(events, out_events);
    }

    fn perform(&mut self, action: Action, out_events: &mut Vec<Event>) {
        match action {
            Action::Move { actor, dx, dy } => {
                let Some((realm, object)) = self.named(&actor) else {
                    return;
                };
                let result = move_actor(self.world.area_mut(realm), object, dx, dy, out_events);
                if result.blocked_x || result.blocked_y {
                    log::debug!("`{actor}` stopped by {:?}", result.blocker);
                }
            }
            Action::Chase {
                actor,
                class,
                radius,
                sight,
            } => {
                let Some((realm, object)) = self.named(&actor) else {
                    return;
                };
                let area = self.world.area_mut(realm);
                let Some(target) = self
                    .targeting
                    .nearest_of_class(area, object, class, radius, sight)
                else {
                    log::trace!("`{actor}` found nothing to chase");
                    return;
                };
                let speed = area
                    .object(object)
                    .and_then(|found| found.as_actor())
                    .map_or(1.0, |found| found.speed());
                let _ = move_actor(area, object, target.x * speed, target.y * speed, out_events);
            }
            Action::Grab { actor, facing } => {
                let Some((realm, object)) = self.named(&actor) else {
                    return;
                };
                match try_grab(self.world.area_mut(realm), object, facing) {
                    Some(grabbed) => log::debug!("`{actor}` grabbed {}", grabbed.get()),
                    None => log::debug!("`{actor}` found nothing to grab"),
                }
            }
            Action::Attack {
                realm,
                by,
                mut effect,
            } => {
                let active = query::active_realm(&self.world);
                if realm != active {
                    log::warn!("attack into the {realm:?} realm dropped while {active:?} is active");
                    return;
                }
                effect.hit.source = by.and_then(|name| self.named(&name)).map(|(_, id)| id);
                world::apply(
                    &mut self.world,
                    Command::SpawnEffect { realm, effect },
                    out_events,
                );
            }
            Action::Strike { realm, by, mut hit } => {
                hit.source = by.and_then(|name| self.named(&name)).map(|(_, id)| id);
                let result = hit_targets(self.world.area_mut(realm), &hit, out_events);
                log::debug!("strike hit {} targets", result.hit_targets.len());
            }
            Action::SwitchRealm { realm } => {
                world::apply(&mut self.world, Command::SwitchRealm { realm }, out_events);
            }
            Action::SetTile {
                realm,
                layer,
                x,
                y,
                tile,
            } => {
                world::apply(
                    &mut self.world,
                    Command::SetTile {
                        realm,
                        layer,
                        coord: TileCoord::new(x, y),
                        tile,
                    },
                    out_events,
                );
            }
        }
    }

    fn named(&self, name: &str) -> Option<(Realm, ObjectId)> {
        let found = self.actor(name);
        if found.is_none() {
            log::warn!("script refers to unknown actor `{name}`");
        }
        found
    }

    /// Runs the systems over `events` until no follow-up commands remain,
    /// forwarding everything that happened to `out_events`.
    fn settle(&mut self, events: Vec<Event>, out_events: &mut Vec<Event>) {
        let mut pending = events;

        while !pending.is_empty() {
            if pending
                .iter()
                .any(|event| matches!(event, Event::TimeAdvanced { .. }))
            {
                let mut generated = Vec::new();
                let area = self.world.active_area_mut();
                advance_effects(area, &mut generated);
                self.movement.handle(&pending, area, &mut generated);
                hurt_by_terrain(area, &mut generated);
                pending.extend(generated);
            }

            let mut commands = Vec::new();
            self.combat.handle(&pending, &mut commands);
            out_events.append(&mut pending);
            for command in commands {
                world::apply(&mut self.world, command, &mut pending);
            }
        }
    }
}

fn hurt_by_terrain(area: &mut AreaInstance, out_events: &mut Vec<Event>) {
    for id in area.object_ids() {
        let is_actor = area
            .object(id)
            .map_or(false, |object| object.as_actor().is_some());
        if is_actor {
            let _ = apply_touch_hits(area, id, out_events);
        }
    }
}
