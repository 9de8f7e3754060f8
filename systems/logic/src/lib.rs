#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Randomizer logic: a graph of locations joined by item-gated paths, with
//! item checks at each location.
//!
//! The graph is declared as data and validated once. The solver answers
//! which locations and checks an inventory can reach, and places items with
//! a seeded assumed fill so that every item stays obtainable.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod solver;

pub use solver::{
    assumed_fill, collect_until_stable, reachable, Placement, Reachability, FILL_ATTEMPTS,
};

/// Failures while building a graph or placing items.
#[derive(Debug, Error)]
pub enum LogicError {
    /// Two nodes share a key.
    #[error("node `{0}` is declared twice")]
    DuplicateNode(String),
    /// Two checks share a key.
    #[error("check `{0}` is declared twice")]
    DuplicateCheck(String),
    /// A path leads to a node that does not exist.
    #[error("path from `{from}` leads to unknown node `{to}`")]
    UnknownPathTarget {
        /// Node the path starts at.
        from: String,
        /// Missing destination.
        to: String,
    },
    /// A query starts at a node that does not exist.
    #[error("unknown start node `{0}`")]
    UnknownStart(String),
    /// More items than checks.
    #[error("{items} items cannot fit into {checks} checks")]
    NotEnoughChecks {
        /// Items to place.
        items: usize,
        /// Checks available.
        checks: usize,
    },
    /// No reachable check was free when the item came up.
    #[error("no reachable check left for `{0}`")]
    Unplaceable(String),
    /// The graph description is not valid JSON.
    #[error("malformed logic graph")]
    Parse(#[from] serde_json::Error),
}

/// Condition guarding a path or a check.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// Always met.
    #[default]
    Always,
    /// Never met.
    Never,
    /// At least `count` copies of an item.
    Item {
        /// Item key.
        key: String,
        /// Copies needed.
        #[serde(default = "one")]
        count: u32,
    },
    /// A flag raised by collecting the check of the same key.
    Flag(String),
    /// Every nested requirement.
    All(Vec<Requirement>),
    /// At least one nested requirement.
    Any(Vec<Requirement>),
}

const fn one() -> u32 {
    1
}

impl Requirement {
    /// Requirement met by holding one copy of an item.
    #[must_use]
    pub fn item(key: impl Into<String>) -> Self {
        Self::Item {
            key: key.into(),
            count: 1,
        }
    }

    /// Evaluates the requirement against an inventory.
    #[must_use]
    pub fn is_met(&self, inventory: &Inventory) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Item { key, count } => inventory.count(key) >= *count,
            Self::Flag(flag) => inventory.has_flag(flag),
            Self::All(all) => all.iter().all(|nested| nested.is_met(inventory)),
            Self::Any(any) => any.iter().any(|nested| nested.is_met(inventory)),
        }
    }
}

/// Items and flags held by the player.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    items: BTreeMap<String, u32>,
    flags: BTreeSet<String>,
}

impl Inventory {
    /// Creates an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one copy of an item.
    pub fn add_item(&mut self, key: impl Into<String>) {
        *self.items.entry(key.into()).or_insert(0) += 1;
    }

    /// Copies held of an item.
    #[must_use]
    pub fn count(&self, key: &str) -> u32 {
        self.items.get(key).copied().unwrap_or(0)
    }

    /// Raises a flag. Returns whether it was newly raised.
    pub fn raise_flag(&mut self, flag: impl Into<String>) -> bool {
        self.flags.insert(flag.into())
    }

    /// Reports whether a flag is raised.
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}

impl<S: Into<String>> FromIterator<S> for Inventory {
    fn from_iter<I: IntoIterator<Item = S>>(items: I) -> Self {
        let mut inventory = Self::new();
        for item in items {
            inventory.add_item(item);
        }
        inventory
    }
}

/// Directed, gated connection between two nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicPath {
    /// Destination node key.
    pub to: String,
    /// Condition for walking the path.
    #[serde(default)]
    pub requires: Requirement,
}

/// Location holding one item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicCheck {
    /// Unique check key.
    pub key: String,
    /// Condition for collecting the check once its node is reached.
    #[serde(default)]
    pub requires: Requirement,
}

/// Location in the logic graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogicNode {
    /// Unique node key.
    pub key: String,
    /// Zone the node belongs to, for grouping.
    pub zone: String,
    /// Outgoing paths.
    pub paths: Vec<LogicPath>,
    /// Checks located at the node.
    pub checks: Vec<LogicCheck>,
}

#[derive(Deserialize)]
struct GraphDocument {
    nodes: Vec<LogicNode>,
    #[serde(default)]
    items: Vec<String>,
}

/// Validated set of nodes, with the item pool meant to be shuffled into them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogicGraph {
    nodes: Vec<LogicNode>,
    index: BTreeMap<String, usize>,
    items: Vec<String>,
}

impl LogicGraph {
    /// Builds a graph, rejecting duplicate keys and dangling paths.
    pub fn from_nodes(nodes: Vec<LogicNode>) -> Result<Self, LogicError> {
        let mut index = BTreeMap::new();
        let mut checks = BTreeSet::new();
        for (position, node) in nodes.iter().enumerate() {
            if index.insert(node.key.clone(), position).is_some() {
                return Err(LogicError::DuplicateNode(node.key.clone()));
            }
            for check in &node.checks {
                if !checks.insert(check.key.as_str()) {
                    return Err(LogicError::DuplicateCheck(check.key.clone()));
                }
            }
        }
        for node in &nodes {
            if let Some(path) = node.paths.iter().find(|path| !index.contains_key(&path.to)) {
                return Err(LogicError::UnknownPathTarget {
                    from: node.key.clone(),
                    to: path.to.clone(),
                });
            }
        }
        Ok(Self {
            nodes,
            index,
            items: Vec::new(),
        })
    }

    /// Parses a graph from a JSON document of the form
    /// `{"nodes": [...], "items": [...]}`. The item pool is optional.
    pub fn from_json(json: &str) -> Result<Self, LogicError> {
        let document: GraphDocument = serde_json::from_str(json)?;
        let mut graph = Self::from_nodes(document.nodes)?;
        graph.items = document.items;
        Ok(graph)
    }

    /// Item pool declared alongside the nodes.
    #[must_use]
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Looks up a node by key.
    #[must_use]
    pub fn node(&self, key: &str) -> Option<&LogicNode> {
        self.index.get(key).and_then(|position| self.nodes.get(*position))
    }

    /// Every node in declaration order.
    #[must_use]
    pub fn nodes(&self) -> &[LogicNode] {
        &self.nodes
    }

    /// Number of checks across all nodes.
    #[must_use]
    pub fn check_count(&self) -> usize {
        self.nodes.iter().map(|node| node.checks.len()).sum()
    }
}
