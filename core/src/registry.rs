//! Explicitly populated lookup tables for content definitions.

use std::{borrow::Borrow, collections::BTreeMap, fmt};

use thiserror::Error;

/// Failure raised while populating a registry.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A definition was already registered under the key.
    #[error("duplicate {registry} definition for `{key}`")]
    Duplicate {
        /// Name of the registry that rejected the key.
        registry: &'static str,
        /// Debug rendering of the rejected key.
        key: String,
    },
    /// The key falls outside the range the registry accepts.
    #[error("invalid {registry} key `{key}`: {reason}")]
    InvalidKey {
        /// Name of the registry that rejected the key.
        registry: &'static str,
        /// Debug rendering of the rejected key.
        key: String,
        /// Why the key was rejected.
        reason: &'static str,
    },
}

/// Keyed definitions registered once during initialisation.
#[derive(Clone, Debug)]
pub struct Registry<K, D> {
    name: &'static str,
    entries: BTreeMap<K, D>,
}

impl<K, D> Registry<K, D>
where
    K: Ord + fmt::Debug,
{
    /// Creates an empty registry labelled for error messages.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: BTreeMap::new(),
        }
    }

    /// Registers a definition, rejecting duplicate keys.
    pub fn register(&mut self, key: K, definition: D) -> Result<(), RegistryError> {
        if self.entries.contains_key(&key) {
            return Err(RegistryError::Duplicate {
                registry: self.name,
                key: format!("{key:?}"),
            });
        }
        let _ = self.entries.insert(key, definition);
        Ok(())
    }

    /// Name the registry reports in errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Looks up a definition.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&D>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.get(key)
    }

    /// Reports whether the key has been registered.
    #[must_use]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates definitions in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &D)> {
        self.entries.iter()
    }
}
