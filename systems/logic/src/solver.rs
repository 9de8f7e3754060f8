//! Reachability and item placement over a logic graph.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::{Inventory, LogicError, LogicGraph};

/// Item placed at each check, keyed by check.
pub type Placement = BTreeMap<String, String>;

/// Everything an inventory can reach from a start node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Reachability {
    /// Reached node keys.
    pub nodes: BTreeSet<String>,
    /// Zones of the reached nodes.
    pub zones: BTreeSet<String>,
    /// Checks whose node is reached and whose requirement is met.
    pub checks: BTreeSet<String>,
}

/// Breadth-first walk over the paths the inventory can open.
pub fn reachable(
    graph: &LogicGraph,
    start: &str,
    inventory: &Inventory,
) -> Result<Reachability, LogicError> {
    if graph.node(start).is_none() {
        return Err(LogicError::UnknownStart(start.to_owned()));
    }

    let mut reach = Reachability::default();
    let mut queue = VecDeque::new();
    let _ = reach.nodes.insert(start.to_owned());
    queue.push_back(start);

    while let Some(key) = queue.pop_front() {
        let Some(node) = graph.node(key) else {
            continue;
        };
        if !node.zone.is_empty() {
            let _ = reach.zones.insert(node.zone.clone());
        }
        reach.checks.extend(
            node.checks
                .iter()
                .filter(|check| check.requires.is_met(inventory))
                .map(|check| check.key.clone()),
        );
        for path in &node.paths {
            if reach.nodes.contains(&path.to) || !path.requires.is_met(inventory) {
                continue;
            }
            let _ = reach.nodes.insert(path.to.clone());
            queue.push_back(&path.to);
        }
    }

    Ok(reach)
}

/// Repeatedly collects every reachable check until nothing new opens up.
///
/// Collecting a check adds its placed item, if any, and raises the flag of
/// the same key. Returns the final inventory and reach.
pub fn collect_until_stable(
    graph: &LogicGraph,
    start: &str,
    inventory: &Inventory,
    placement: &Placement,
) -> Result<(Inventory, Reachability), LogicError> {
    let mut inventory = inventory.clone();
    let mut collected = BTreeSet::new();
    let mut iteration = 0_u32;

    loop {
        iteration += 1;
        let reach = reachable(graph, start, &inventory)?;
        let fresh: Vec<&String> = reach
            .checks
            .iter()
            .filter(|check| !collected.contains(*check))
            .collect();
        log::trace!(
            "logic pass {iteration}: {} nodes, {} new checks",
            reach.nodes.len(),
            fresh.len()
        );
        if fresh.is_empty() {
            return Ok((inventory, reach));
        }
        for check in fresh {
            let _ = collected.insert(check.clone());
            let _ = inventory.raise_flag(check.clone());
            if let Some(item) = placement.get(check) {
                inventory.add_item(item.clone());
            }
        }
    }
}

/// Fresh shuffles tried before a fill gives up.
pub const FILL_ATTEMPTS: u32 = 64;

/// Places items with an assumed fill seeded by `seed`.
///
/// Items are shuffled, then placed one by one into a random free check that
/// is reachable while assuming the player already holds every item not yet
/// placed. Any placement this returns can be collected in full from an empty
/// inventory. An early item may take the last check open to a later one, so a
/// stuck attempt is retried with a new shuffle from the same random stream.
pub fn assumed_fill(
    graph: &LogicGraph,
    start: &str,
    items: &[String],
    seed: u64,
) -> Result<Placement, LogicError> {
    let checks = graph.check_count();
    if items.len() > checks {
        return Err(LogicError::NotEnoughChecks {
            items: items.len(),
            checks,
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut stuck = None;
    for attempt in 1..=FILL_ATTEMPTS {
        match fill_attempt(graph, start, items, &mut rng)? {
            Ok(placement) => return Ok(placement),
            Err(item) => {
                log::debug!("fill attempt {attempt} stuck on `{item}`");
                stuck = Some(item);
            }
        }
    }

    Err(LogicError::Unplaceable(stuck.unwrap_or_default()))
}

/// One shuffled pass. The inner error names the item left without a check.
fn fill_attempt(
    graph: &LogicGraph,
    start: &str,
    items: &[String],
    rng: &mut ChaCha8Rng,
) -> Result<Result<Placement, String>, LogicError> {
    let mut pool = items.to_vec();
    pool.shuffle(rng);

    let mut placement = Placement::new();
    while let Some(item) = pool.pop() {
        let assumed: Inventory = pool.iter().cloned().collect();
        let (_, reach) = collect_until_stable(graph, start, &assumed, &placement)?;
        let free: Vec<&String> = reach
            .checks
            .iter()
            .filter(|check| !placement.contains_key(*check))
            .collect();
        if free.is_empty() {
            return Ok(Err(item));
        }
        let check = free[rng.gen_range(0..free.len())].clone();
        log::trace!("placing `{item}` at `{check}`");
        let _ = placement.insert(check, item);
    }

    Ok(Ok(placement))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LogicCheck, LogicNode, LogicPath, Requirement};

    fn gated(to: &str, requires: Requirement) -> LogicPath {
        LogicPath {
            to: to.to_owned(),
            requires,
        }
    }

    fn check(key: &str) -> LogicCheck {
        LogicCheck {
            key: key.to_owned(),
            requires: Requirement::Always,
        }
    }

    /// Village -> forest (needs sword) -> temple (needs lamp and the forest
    /// boss flag).
    fn chain() -> LogicGraph {
        LogicGraph::from_nodes(vec![
            LogicNode {
                key: "village".to_owned(),
                zone: "lowlands".to_owned(),
                paths: vec![gated("forest", Requirement::item("sword"))],
                checks: vec![check("village_chest")],
            },
            LogicNode {
                key: "forest".to_owned(),
                zone: "woods".to_owned(),
                paths: vec![gated(
                    "temple",
                    Requirement::All(vec![
                        Requirement::item("lamp"),
                        Requirement::Flag("forest_boss".to_owned()),
                    ]),
                )],
                checks: vec![check("forest_boss"), check("forest_chest")],
            },
            LogicNode {
                key: "temple".to_owned(),
                zone: "woods".to_owned(),
                paths: Vec::new(),
                checks: vec![check("temple_altar")],
            },
        ])
        .expect("graph is valid")
    }

    #[test]
    fn reach_stops_at_unmet_paths() {
        let graph = chain();
        let reach = reachable(&graph, "village", &Inventory::new()).expect("start exists");
        assert_eq!(reach.nodes, BTreeSet::from(["village".to_owned()]));
        assert_eq!(reach.checks, BTreeSet::from(["village_chest".to_owned()]));
        assert_eq!(reach.zones, BTreeSet::from(["lowlands".to_owned()]));

        assert!(matches!(
            reachable(&graph, "nowhere", &Inventory::new()),
            Err(LogicError::UnknownStart(_))
        ));
    }

    #[test]
    fn collecting_opens_further_nodes() {
        let graph = chain();
        let placement = Placement::from([
            ("village_chest".to_owned(), "sword".to_owned()),
            ("forest_chest".to_owned(), "lamp".to_owned()),
        ]);
        let (inventory, reach) =
            collect_until_stable(&graph, "village", &Inventory::new(), &placement)
                .expect("start exists");

        assert_eq!(inventory.count("sword"), 1);
        assert_eq!(inventory.count("lamp"), 1);
        assert!(inventory.has_flag("forest_boss"));
        assert!(reach.nodes.contains("temple"));
        assert!(reach.checks.contains("temple_altar"));
    }

    #[test]
    fn more_items_than_checks_is_rejected() {
        let graph = chain();
        let items = vec!["sword".to_owned(); 5];
        assert!(matches!(
            assumed_fill(&graph, "village", &items, 1),
            Err(LogicError::NotEnoughChecks { items: 5, checks: 4 })
        ));
    }
}
