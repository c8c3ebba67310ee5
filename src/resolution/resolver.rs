use std::collections::HashMap;

use crate::config::ParticipantsConfig;
use crate::errors::{ParticipantsError, Result};
use crate::person::Person;
use crate::types::*;

use super::events::{EventSink, ResolverEvent, TracingSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Active,
    /// Merged away after publication; kept only for its redirect.
    Retired,
    /// Merged away before publication; never saved.
    Absorbed,
}

#[derive(Debug)]
struct Slot {
    person: Person,
    status: Status,
}

/// Incrementally partitions identifiers into persons.
///
/// Persons live in an arena and are addressed by `PersonId`. Every identifier
/// in the index points at exactly one active person, and every active person
/// owns the index entries for all of its identifiers.
#[derive(Debug)]
pub struct IdentityResolver<S = TracingSink> {
    config: ParticipantsConfig,
    slots: Vec<Slot>,
    /// identifier type -> identifier value -> owner.
    index: HashMap<String, HashMap<String, PersonId>>,
    /// stable ID -> person, for active and retired persons alike.
    published: HashMap<StableId, PersonId>,
    next_sequence: u64,
    sink: S,
}

impl IdentityResolver<TracingSink> {
    /// Creates an empty resolver that logs its events through `tracing`.
    pub fn new(config: ParticipantsConfig) -> Self {
        Self::with_sink(config, TracingSink)
    }

    /// Rebuilds a resolver from a previously saved identity record.
    pub fn from_record(record: IdentityRecord, config: ParticipantsConfig) -> Result<Self> {
        Self::from_record_with_sink(record, config, TracingSink)
    }
}

impl Default for IdentityResolver<TracingSink> {
    fn default() -> Self {
        Self::new(ParticipantsConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl<S: EventSink> IdentityResolver<S> {
    /// Creates an empty resolver reporting to `sink`.
    pub fn with_sink(config: ParticipantsConfig, sink: S) -> Self {
        Self {
            config,
            slots: Vec::new(),
            index: HashMap::new(),
            published: HashMap::new(),
            next_sequence: 1,
            sink,
        }
    }

    /// Rebuilds a resolver from `record`, reporting later events to `sink`.
    ///
    /// Records whose only identifier type is the tombstone type come back as
    /// retired persons and stay out of the index. A live person carrying only
    /// tombstone-type identifiers would be read back the same way, which is
    /// why observation feeds may not use that type. The next stable ID
    /// continues after the highest sequence number found.
    ///
    /// # Errors
    ///
    /// `InvalidStableId` for keys that are not `<prefix><digits>`;
    /// `DuplicateIdentifier` when one identifier is listed under two IDs;
    /// `SequenceExhausted` when the highest sequence leaves no successor.
    pub fn from_record_with_sink(
        record: IdentityRecord,
        config: ParticipantsConfig,
        sink: S,
    ) -> Result<Self> {
        let prefix = config.id_prefix.clone();
        let tombstone_type = config.tombstone_type.clone();
        let mut resolver = Self::with_sink(config, sink);
        let mut max_sequence = 0;

        for (raw_id, identifiers) in record {
            let invalid = || ParticipantsError::InvalidStableId {
                stable_id: raw_id.clone(),
                prefix: prefix.clone(),
            };
            let stable_id = StableId::parse(&raw_id, &prefix).ok_or_else(invalid)?;
            let sequence = stable_id.sequence(&prefix).ok_or_else(invalid)?;
            max_sequence = max_sequence.max(sequence);

            let retired =
                !identifiers.is_empty() && identifiers.keys().all(|kind| *kind == tombstone_type);
            let id = PersonId(resolver.slots.len());
            let mut person = Person::with_stable_id(stable_id.clone());

            for (kind, values) in &identifiers {
                for value in values {
                    person.add_identifier(kind, value);
                    if retired {
                        continue;
                    }
                    let owners = resolver.index.entry(kind.clone()).or_default();
                    if let Some(&other) = owners.get(value) {
                        if other != id {
                            return Err(ParticipantsError::DuplicateIdentifier {
                                kind: kind.clone(),
                                value: value.clone(),
                                first: resolver.slots[other.0]
                                    .person
                                    .stable_id()
                                    .map(StableId::to_string)
                                    .unwrap_or_default(),
                                second: raw_id.clone(),
                            });
                        }
                    }
                    owners.insert(value.clone(), id);
                }
            }

            resolver.slots.push(Slot {
                person,
                status: if retired {
                    Status::Retired
                } else {
                    Status::Active
                },
            });
            resolver.published.insert(stable_id, id);
        }

        resolver.next_sequence = max_sequence
            .checked_add(1)
            .ok_or(ParticipantsError::SequenceExhausted { prefix })?;
        Ok(resolver)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

impl<S: EventSink> IdentityResolver<S> {
    /// Returns the person owning `kind -> value`, creating one if the
    /// identifier has never been seen.
    pub fn resolve(&mut self, kind: &str, value: &str) -> PersonId {
        if let Some(person) = self.owner(kind, value) {
            self.sink.record(ResolverEvent::IdentifierKnown {
                person,
                kind: kind.to_string(),
                value: value.to_string(),
            });
            return person;
        }

        let person = self.create_person();
        self.attach(person, kind, value);
        person
    }

    /// Declares that `kind1 -> value1` and `kind2 -> value2` identify the
    /// same individual.
    ///
    /// Unknown identifiers are attached to the known one's person. When both
    /// are known but owned by different persons, the two are merged:
    /// 1. a published person always absorbs an unpublished one;
    /// 2. between two unpublished persons, the first argument's survives;
    /// 3. between two published persons, the one with more identifiers
    ///    survives (ties go to the second argument) and the other keeps a
    ///    tombstone redirecting to the survivor's stable ID.
    ///
    /// # Errors
    ///
    /// `Invariant` if the index points at a person that is no longer active,
    /// or a merged person's identifiers are not indexed to it.
    pub fn assert_same_person(
        &mut self,
        kind1: &str,
        value1: &str,
        kind2: &str,
        value2: &str,
    ) -> Result<()> {
        let first = self.owner(kind1, value1);
        let second = self.owner(kind2, value2);

        match (first, second) {
            (None, None) => {
                let person = self.resolve(kind1, value1);
                self.attach(person, kind2, value2);
            }
            (Some(person), None) => {
                self.ensure_active(person, kind1, value1)?;
                self.attach(person, kind2, value2);
            }
            (None, Some(person)) => {
                self.ensure_active(person, kind2, value2)?;
                self.attach(person, kind1, value1);
            }
            (Some(a), Some(b)) if a == b => {
                self.ensure_active(a, kind1, value1)?;
            }
            (Some(a), Some(b)) => {
                self.ensure_active(a, kind1, value1)?;
                self.ensure_active(b, kind2, value2)?;
                self.merge(a, b)?;
            }
        }
        Ok(())
    }

    fn create_person(&mut self) -> PersonId {
        let person = PersonId(self.slots.len());
        self.slots.push(Slot {
            person: Person::new(),
            status: Status::Active,
        });
        self.sink.record(ResolverEvent::PersonCreated { person });
        person
    }

    fn attach(&mut self, person: PersonId, kind: &str, value: &str) {
        if self.slots[person.0].person.add_identifier(kind, value) {
            self.sink.record(ResolverEvent::IdentifierAdded {
                person,
                kind: kind.to_string(),
                value: value.to_string(),
            });
        }
        self.index
            .entry(kind.to_string())
            .or_default()
            .insert(value.to_string(), person);
    }

    fn ensure_active(&self, person: PersonId, kind: &str, value: &str) -> Result<()> {
        match self.slots.get(person.0) {
            Some(slot) if slot.status == Status::Active => Ok(()),
            Some(_) => Err(ParticipantsError::invariant(format!(
                "{kind} -> {value} is indexed to {person}, which is no longer active"
            ))),
            None => Err(ParticipantsError::invariant(format!(
                "{kind} -> {value} is indexed to unknown {person}"
            ))),
        }
    }

    /// Picks `(merged_away, survivor)` for two distinct active persons.
    fn merge_order(&self, first: PersonId, second: PersonId) -> (PersonId, PersonId) {
        let a = &self.slots[first.0].person;
        let b = &self.slots[second.0].person;
        match (a.is_published(), b.is_published()) {
            (true, false) => (second, first),
            (false, true) => (first, second),
            (false, false) => (second, first),
            (true, true) => {
                if a.identifier_count() > b.identifier_count() {
                    (second, first)
                } else {
                    (first, second)
                }
            }
        }
    }

    fn merge(&mut self, first: PersonId, second: PersonId) -> Result<()> {
        let (from, into) = self.merge_order(first, second);

        let moved: Vec<(String, String)> = self.slots[from.0]
            .person
            .identifiers()
            .map(|(kind, value)| (kind.to_string(), value.to_string()))
            .collect();

        // Every moved identifier must be indexed to `from`; check all of them
        // before mutating anything.
        for (kind, value) in &moved {
            if self.owner(kind, value) != Some(from) {
                return Err(ParticipantsError::invariant(format!(
                    "{kind} -> {value} is held by {from} but not indexed to it"
                )));
            }
        }
        for (kind, value) in &moved {
            if let Some(owner) = self
                .index
                .get_mut(kind.as_str())
                .and_then(|owners| owners.get_mut(value.as_str()))
            {
                *owner = into;
            }
        }

        let mut shell = std::mem::take(&mut self.slots[from.0].person);
        for (kind, value) in shell.merge_into(&mut self.slots[into.0].person) {
            self.sink.record(ResolverEvent::IdentifierAdded {
                person: into,
                kind,
                value,
            });
        }
        self.sink.record(ResolverEvent::PersonsMerged {
            from,
            into,
            repointed: moved.len(),
        });

        let redirect = match (shell.stable_id(), self.slots[into.0].person.stable_id()) {
            (Some(old), Some(new)) => Some((old.clone(), new.clone())),
            _ => None,
        };
        let status = match redirect {
            Some((old, new)) => {
                shell.add_identifier(&self.config.tombstone_type, new.as_str());
                self.sink
                    .record(ResolverEvent::RedirectRecorded { from: old, to: new });
                Status::Retired
            }
            None => Status::Absorbed,
        };
        self.slots[from.0] = Slot {
            person: shell,
            status,
        };
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Publication
// ---------------------------------------------------------------------------

impl<S: EventSink> IdentityResolver<S> {
    /// Gives every active, unpublished person the next stable ID, in creation
    /// order. Returns how many IDs were assigned.
    ///
    /// Either every pending person is published or none is: if the sequence
    /// cannot cover them all, `SequenceExhausted` is returned untouched.
    pub fn assign_stable_ids(&mut self) -> Result<usize> {
        let pending = self
            .slots
            .iter()
            .filter(|slot| slot.status == Status::Active && !slot.person.is_published())
            .count();
        if self.next_sequence.checked_add(pending as u64).is_none() {
            return Err(ParticipantsError::SequenceExhausted {
                prefix: self.config.id_prefix.clone(),
            });
        }

        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.status != Status::Active || slot.person.is_published() {
                continue;
            }
            let stable_id = StableId::format(
                &self.config.id_prefix,
                self.config.id_width,
                self.next_sequence,
            );
            self.next_sequence += 1;
            slot.person.assign_stable_id(stable_id.clone());
            self.published.insert(stable_id.clone(), PersonId(i));
            self.sink.record(ResolverEvent::StableIdAssigned {
                person: PersonId(i),
                stable_id,
            });
        }
        Ok(pending)
    }

    /// Publishes any unpublished persons and returns the saveable record:
    /// every active person plus every tombstone, keyed by stable ID.
    pub fn to_record(&mut self) -> Result<IdentityRecord> {
        self.assign_stable_ids()?;
        Ok(self
            .slots
            .iter()
            .filter(|slot| slot.status != Status::Absorbed)
            .filter_map(|slot| {
                slot.person
                    .stable_id()
                    .map(|id| (id.to_string(), slot.person.to_record()))
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl<S> IdentityResolver<S> {
    pub fn config(&self) -> &ParticipantsConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// The person currently owning `kind -> value`, if any.
    pub fn owner(&self, kind: &str, value: &str) -> Option<PersonId> {
        self.index.get(kind)?.get(value).copied()
    }

    /// Whether both identifiers are known and owned by the same person.
    pub fn same_person(&self, kind1: &str, value1: &str, kind2: &str, value2: &str) -> bool {
        match (self.owner(kind1, value1), self.owner(kind2, value2)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn person(&self, id: PersonId) -> Option<&Person> {
        self.slots.get(id.0).map(|slot| &slot.person)
    }

    pub fn is_active(&self, id: PersonId) -> bool {
        self.slots
            .get(id.0)
            .is_some_and(|slot| slot.status == Status::Active)
    }

    /// Active persons in creation order.
    pub fn active_persons(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.ids_with(Status::Active)
    }

    /// Merged-away published persons, in creation order.
    pub fn tombstones(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.ids_with(Status::Retired)
    }

    fn ids_with(&self, status: Status) -> impl Iterator<Item = PersonId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(move |(_, slot)| slot.status == status)
            .map(|(i, _)| PersonId(i))
    }

    /// The person published under `stable_id`, active or retired.
    pub fn find_stable_id(&self, stable_id: &str) -> Option<PersonId> {
        self.published.get(stable_id).copied()
    }

    /// Follows `replaced_by` redirects from `stable_id` to the stable ID of
    /// the active person that now holds its identifiers.
    ///
    /// Returns `None` for unknown IDs and for broken or cyclic chains.
    pub fn redirect(&self, stable_id: &str) -> Option<&StableId> {
        let mut current = self.find_stable_id(stable_id)?;
        for _ in 0..=self.slots.len() {
            let slot = &self.slots[current.0];
            match slot.status {
                Status::Active => return slot.person.stable_id(),
                Status::Retired => {
                    let next = slot.person.values(&self.config.tombstone_type).last()?;
                    current = self.find_stable_id(next)?;
                }
                Status::Absorbed => return None,
            }
        }
        None
    }

    /// Sequence number the next assigned stable ID will use.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn summary(&self) -> ResolverSummary {
        ResolverSummary {
            active_persons: self.active_persons().count(),
            tombstones: self.tombstones().count(),
            identifiers: self.index.values().map(HashMap::len).sum(),
            next_sequence: self.next_sequence,
        }
    }
}
