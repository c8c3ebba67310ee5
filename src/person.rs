use indexmap::{IndexMap, IndexSet};

use crate::types::{IdentifierRecord, StableId};

/// Everything the resolver believes about one real-world individual.
///
/// Identifier values are unique per type and keep the order in which they
/// were first seen, so saved output is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Person {
    stable_id: Option<StableId>,
    identifiers: IndexMap<String, IndexSet<String>>,
}

impl Person {
    /// Creates an unpublished person with no identifiers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a person that already carries a stable ID, e.g. when loading.
    pub fn with_stable_id(stable_id: StableId) -> Self {
        Self {
            stable_id: Some(stable_id),
            identifiers: IndexMap::new(),
        }
    }

    pub fn stable_id(&self) -> Option<&StableId> {
        self.stable_id.as_ref()
    }

    /// Whether the person has been published under a stable ID.
    pub fn is_published(&self) -> bool {
        self.stable_id.is_some()
    }

    /// Assigns the stable ID. Returns `false` and leaves the person untouched
    /// if one is already set: stable IDs never change once assigned.
    pub(crate) fn assign_stable_id(&mut self, stable_id: StableId) -> bool {
        if self.stable_id.is_some() {
            return false;
        }
        self.stable_id = Some(stable_id);
        true
    }

    /// Adds `value` under `kind`. Returns `true` if it was not already present.
    pub fn add_identifier(&mut self, kind: &str, value: &str) -> bool {
        match self.identifiers.get_mut(kind) {
            Some(values) => values.insert(value.to_string()),
            None => {
                let mut values = IndexSet::new();
                values.insert(value.to_string());
                self.identifiers.insert(kind.to_string(), values);
                true
            }
        }
    }

    pub fn has_identifier(&self, kind: &str, value: &str) -> bool {
        self.identifiers
            .get(kind)
            .is_some_and(|values| values.contains(value))
    }

    /// Total number of `(type, value)` pairs held by this person.
    pub fn identifier_count(&self) -> usize {
        self.identifiers.values().map(IndexSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.identifier_count() == 0
    }

    /// Values recorded under `kind`, in insertion order.
    pub fn values(&self, kind: &str) -> impl Iterator<Item = &str> {
        self.identifiers
            .get(kind)
            .into_iter()
            .flat_map(|values| values.iter().map(String::as_str))
    }

    /// Every `(type, value)` pair, types and values in insertion order.
    pub fn identifiers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.identifiers.iter().flat_map(|(kind, values)| {
            values.iter().map(move |value| (kind.as_str(), value.as_str()))
        })
    }

    /// Moves every identifier of `self` into `other` and leaves `self` empty.
    ///
    /// Returns the pairs that were new to `other`. The caller owns bookkeeping
    /// for the emptied shell (index entries, active set, tombstone).
    pub fn merge_into(&mut self, other: &mut Person) -> Vec<(String, String)> {
        let mut added = Vec::new();
        for (kind, values) in std::mem::take(&mut self.identifiers) {
            for value in values {
                if other.add_identifier(&kind, &value) {
                    added.push((kind.clone(), value));
                }
            }
        }
        added
    }

    /// Snapshot of the identifiers in the on-disk shape.
    pub fn to_record(&self) -> IdentifierRecord {
        self.identifiers
            .iter()
            .map(|(kind, values)| (kind.clone(), values.iter().cloned().collect()))
            .collect()
    }
}
