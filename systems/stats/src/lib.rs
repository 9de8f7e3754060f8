#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Lazily recomputed numeric stats with stacking modifiers.
//!
//! A [`ModifiableStat`] folds its modifiers in a fixed order:
//! `(base + flat) * (1 + percent / 100) * product(multipliers)`, then clamps
//! the result into the optional `[min, max]` range. The value is memoised and
//! only recomputed after a modifier change or an explicit [`ModifiableStat::mark_dirty`].

use std::{cell::Cell, collections::BTreeMap, fmt};

/// Source of the unmodified value of a stat.
pub enum StatBase {
    /// Fixed base value.
    Constant(f32),
    /// Base value computed on demand, e.g. from equipment or level.
    Derived(Box<dyn Fn() -> f32>),
}

impl StatBase {
    fn evaluate(&self) -> f32 {
        match self {
            Self::Constant(value) => *value,
            Self::Derived(compute) => compute(),
        }
    }
}

impl fmt::Debug for StatBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// Bonus applied to a stat while it is attached.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Modifier {
    /// Added to the base value.
    pub flat_bonus: f32,
    /// Percentage added on top of the flat total.
    pub percent_bonus: f32,
    /// Factor applied after percentages.
    pub multiplier: Option<f32>,
}

/// Opaque token identifying one attached modifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModifierHandle(u32);

/// Derived numeric value with memoised recomputation.
#[derive(Debug)]
pub struct ModifiableStat {
    base: StatBase,
    min_value: Option<f32>,
    max_value: Option<f32>,
    flat_bonus: f32,
    percent_bonus: f32,
    multipliers: BTreeMap<ModifierHandle, f32>,
    modifiers: BTreeMap<ModifierHandle, Modifier>,
    next_handle: u32,
    cached: Cell<f32>,
    is_dirty: Cell<bool>,
}

impl ModifiableStat {
    /// Creates a stat with a constant base and optional clamps.
    #[must_use]
    pub fn new(base: f32, min_value: Option<f32>, max_value: Option<f32>) -> Self {
        Self::with_base(StatBase::Constant(base), min_value, max_value)
    }

    /// Creates a stat whose base is computed on demand.
    #[must_use]
    pub fn derived<F>(compute: F, min_value: Option<f32>, max_value: Option<f32>) -> Self
    where
        F: Fn() -> f32 + 'static,
    {
        Self::with_base(StatBase::Derived(Box::new(compute)), min_value, max_value)
    }

    /// Creates a stat from an explicit base source.
    #[must_use]
    pub fn with_base(base: StatBase, min_value: Option<f32>, max_value: Option<f32>) -> Self {
        Self {
            base,
            min_value,
            max_value,
            flat_bonus: 0.0,
            percent_bonus: 0.0,
            multipliers: BTreeMap::new(),
            modifiers: BTreeMap::new(),
            next_handle: 0,
            cached: Cell::new(0.0),
            is_dirty: Cell::new(true),
        }
    }

    /// Current value, recomputed only when dirty.
    #[must_use]
    pub fn value(&self) -> f32 {
        if self.is_dirty.get() {
            self.cached.set(self.compute());
            self.is_dirty.set(false);
        }
        self.cached.get()
    }

    /// Attaches a modifier and returns the handle that detaches it.
    pub fn add_modifier(&mut self, modifier: Modifier) -> ModifierHandle {
        let handle = ModifierHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);

        self.flat_bonus += modifier.flat_bonus;
        self.percent_bonus += modifier.percent_bonus;
        if let Some(multiplier) = modifier.multiplier {
            let _ = self.multipliers.insert(handle, multiplier);
        }
        let _ = self.modifiers.insert(handle, modifier);
        self.mark_dirty();
        handle
    }

    /// Detaches a modifier. Unknown or already removed handles are ignored.
    pub fn remove_modifier(&mut self, handle: ModifierHandle) -> bool {
        let Some(removed) = self.modifiers.remove(&handle) else {
            return false;
        };
        let _ = self.multipliers.remove(&handle);
        if self.modifiers.is_empty() {
            // Drops any rounding left over from the add and subtract pairs.
            self.flat_bonus = 0.0;
            self.percent_bonus = 0.0;
        } else {
            self.flat_bonus -= removed.flat_bonus;
            self.percent_bonus -= removed.percent_bonus;
        }
        self.mark_dirty();
        true
    }

    /// Replaces the base source.
    pub fn set_base(&mut self, base: StatBase) {
        self.base = base;
        self.mark_dirty();
    }

    /// Forces the next read to recompute, e.g. after a derived base changed.
    pub fn mark_dirty(&self) {
        self.is_dirty.set(true);
    }

    /// Number of attached modifiers.
    #[must_use]
    pub fn modifier_count(&self) -> usize {
        self.modifiers.len()
    }

    fn compute(&self) -> f32 {
        let product: f32 = self.multipliers.values().product();
        let mut value =
            (self.base.evaluate() + self.flat_bonus) * (1.0 + self.percent_bonus / 100.0) * product;
        if let Some(min) = self.min_value {
            value = value.max(min);
        }
        if let Some(max) = self.max_value {
            value = value.min(max);
        }
        log::trace!("stat recomputed to {value}");
        value
    }
}
