//! JSON Lines feed of identifier observations.
//!
//! Each non-blank line is either a single identifier, which is resolved,
//! or a `same` pair, which is asserted to belong to one person:
//!
//! ```text
//! {"type": "email", "value": "j.doe@example.org"}
//! {"same": [{"type": "email", "value": "j.doe@example.org"}, {"type": "name", "value": "Jane Doe"}]}
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ParticipantsError, Result};
use crate::resolution::{EventSink, IdentityResolver};
use crate::types::Identifier;

/// One line of an observation feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Observation {
    /// Two identifiers of the same individual.
    Same { same: [Identifier; 2] },
    /// An identifier seen on its own.
    Seen(Identifier),
}

impl Observation {
    /// Identifiers named by this observation.
    pub fn identifiers(&self) -> &[Identifier] {
        match self {
            Observation::Same { same } => &same[..],
            Observation::Seen(id) => std::slice::from_ref(id),
        }
    }

    /// Fails with `ReservedType` if any identifier uses `tombstone_type`.
    pub fn check_kinds(&self, tombstone_type: &str) -> Result<()> {
        match self.identifiers().iter().find(|id| id.kind == tombstone_type) {
            Some(id) => Err(ParticipantsError::ReservedType {
                kind: id.kind.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Feeds this observation into `resolver`.
    ///
    /// Observations using the resolver's tombstone type are rejected.
    pub fn apply<S: EventSink>(&self, resolver: &mut IdentityResolver<S>) -> Result<()> {
        self.check_kinds(&resolver.config().tombstone_type)?;
        match self {
            Observation::Seen(id) => {
                resolver.resolve(&id.kind, &id.value);
                Ok(())
            }
            Observation::Same { same: [a, b] } => {
                resolver.assert_same_person(&a.kind, &a.value, &b.kind, &b.value)
            }
        }
    }
}

/// Counts of observations applied from one feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub seen: usize,
    pub same: usize,
}

/// Parses every observation from `reader`. `source` names the feed in errors.
pub fn parse_observations(reader: impl BufRead, source: &str) -> Result<Vec<Observation>> {
    let mut observations = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let observation = serde_json::from_str(trimmed).map_err(|e| ParticipantsError::Parse {
            message: e.to_string(),
            path: source.to_string(),
            line: Some(i + 1),
        })?;
        observations.push(observation);
    }
    Ok(observations)
}

/// Reads the feed at `path`.
pub fn read_observations(path: &Path) -> Result<Vec<Observation>> {
    let file = File::open(path).map_err(|e| ParticipantsError::File {
        message: format!("failed to open observation feed: {}", e),
        path: path.display().to_string(),
    })?;
    parse_observations(BufReader::new(file), &path.display().to_string())
}

/// Applies the feed at `path` to `resolver`.
///
/// The whole feed is parsed and checked before the first observation is
/// applied, so a malformed line or a reserved identifier type leaves the
/// resolver untouched.
pub fn apply_observations<S: EventSink>(
    resolver: &mut IdentityResolver<S>,
    path: &Path,
) -> Result<FeedStats> {
    let observations = read_observations(path)?;
    for observation in &observations {
        observation.check_kinds(&resolver.config().tombstone_type)?;
    }
    let mut stats = FeedStats::default();
    for observation in &observations {
        observation.apply(resolver)?;
        match observation {
            Observation::Seen(_) => stats.seen += 1,
            Observation::Same { .. } => stats.same += 1,
        }
    }
    tracing::info!(
        path = %path.display(),
        seen = stats.seen,
        same = stats.same,
        "observation feed applied"
    );
    Ok(stats)
}
