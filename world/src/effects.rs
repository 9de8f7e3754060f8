//! Persistent attacks that re-resolve every tick.

use std::collections::BTreeSet;

use spiritfield_core::{EffectSpec, HitProperties, HitResult, HitTarget, Point};

/// Attack living in an area across several ticks.
///
/// The effect owns the ignore set of its activation, so a target struck on
/// one tick is skipped on every later tick of the same effect.
#[derive(Clone, Debug, PartialEq)]
pub struct HitEffect {
    hit: HitProperties,
    velocity: Point,
    ttl: u32,
    piercing: bool,
    spent: bool,
}

impl HitEffect {
    /// Creates an effect from its description.
    #[must_use]
    pub fn new(description: EffectSpec) -> Self {
        Self {
            hit: description.hit,
            velocity: description.velocity,
            ttl: description.ttl,
            piercing: description.piercing,
            spent: false,
        }
    }

    /// Attack resolved on the current tick, including the accumulated ignore set.
    #[must_use]
    pub const fn hit(&self) -> &HitProperties {
        &self.hit
    }

    /// Targets already struck during this activation.
    #[must_use]
    pub const fn ignore_targets(&self) -> &BTreeSet<HitTarget> {
        &self.hit.ignore_targets
    }

    /// Ticks left before the effect expires.
    #[must_use]
    pub const fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Folds one resolution pass into the effect.
    ///
    /// Non-piercing effects end on their first hit; any effect ends when a
    /// target stops it.
    pub fn record(&mut self, result: &HitResult) {
        self.hit
            .ignore_targets
            .extend(result.hit_targets.iter().copied());
        if result.stopped || (result.hit && !self.piercing) {
            self.spent = true;
        }
    }

    /// Moves the hit shape along the velocity and consumes one tick.
    pub fn advance(&mut self) {
        self.ttl = self.ttl.saturating_sub(1);
        if let Some(shape) = self.hit.shape.as_mut() {
            *shape = shape.translated(self.velocity.x, self.velocity.y);
        }
    }

    /// Reports whether the effect should leave its area.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.spent || self.ttl == 0
    }
}
