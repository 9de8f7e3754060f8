//! Movement capability flags handed to the movement resolver.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{geometry::Rect, ObjectId};

/// Capabilities and constraints of an actor attempting to move.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementProperties {
    /// Pushes pushable objects that block it.
    pub can_push: bool,
    /// May enter pits.
    pub can_fall: bool,
    /// May enter water.
    pub can_swim: bool,
    /// May enter solid climbable tiles.
    pub can_climb: bool,
    /// Launches off ledges it descends.
    pub can_jump: bool,
    /// Ignores pits, water and ledges.
    pub can_fly: bool,
    /// Nudges one pixel sideways to slide around corners.
    pub can_wiggle: bool,
    /// Walks through low and medium walls.
    pub can_pass_medium_walls: bool,
    /// Treats any partially solid tile as fully solid.
    pub needs_full_tile: bool,
    /// Objects that never block, typically the mover itself.
    pub excluded_objects: BTreeSet<ObjectId>,
    /// The mover must stay inside this box.
    pub bounding_box: Option<Rect>,
    /// Boxes the mover may not enter.
    pub blocked_boxes: Vec<Rect>,
}

impl MovementProperties {
    /// Copy of the properties that also excludes the provided object.
    #[must_use]
    pub fn excluding(&self, object: ObjectId) -> Self {
        let mut properties = self.clone();
        let _ = properties.excluded_objects.insert(object);
        properties
    }
}
