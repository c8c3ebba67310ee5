use crate::types::{PersonId, StableId};

/// Something the resolver did to its partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverEvent {
    /// A new person was materialized for a previously unknown identifier.
    PersonCreated { person: PersonId },
    /// `kind -> value` now belongs to `person`.
    IdentifierAdded {
        person: PersonId,
        kind: String,
        value: String,
    },
    /// A lookup hit an identifier that `person` already owned.
    IdentifierKnown {
        person: PersonId,
        kind: String,
        value: String,
    },
    /// `from` was folded into `into`; `repointed` index entries moved with it.
    PersonsMerged {
        from: PersonId,
        into: PersonId,
        repointed: usize,
    },
    /// A published person was merged away and now redirects to `to`.
    RedirectRecorded { from: StableId, to: StableId },
    /// `person` was published under `stable_id`.
    StableIdAssigned {
        person: PersonId,
        stable_id: StableId,
    },
}

/// Receiver for resolver events.
pub trait EventSink {
    fn record(&mut self, event: ResolverEvent);
}

/// Collects events in memory.
impl EventSink for Vec<ResolverEvent> {
    fn record(&mut self, event: ResolverEvent) {
        self.push(event);
    }
}

/// Forwards events to `tracing`. Structural changes (merges, redirects,
/// publications) are logged at `info`, per-identifier churn at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&mut self, event: ResolverEvent) {
        match event {
            ResolverEvent::PersonCreated { person } => {
                tracing::debug!(%person, "person created");
            }
            ResolverEvent::IdentifierAdded {
                person,
                kind,
                value,
            } => {
                tracing::debug!(%person, %kind, %value, "identifier added");
            }
            ResolverEvent::IdentifierKnown {
                person,
                kind,
                value,
            } => {
                tracing::debug!(%person, %kind, %value, "identifier already known");
            }
            ResolverEvent::PersonsMerged {
                from,
                into,
                repointed,
            } => {
                tracing::info!(%from, %into, repointed, "persons merged");
            }
            ResolverEvent::RedirectRecorded { from, to } => {
                tracing::info!(%from, %to, "redirect recorded");
            }
            ResolverEvent::StableIdAssigned { person, stable_id } => {
                tracing::debug!(%person, %stable_id, "stable id assigned");
            }
        }
    }
}
