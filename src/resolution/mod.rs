/// Identity resolution module.
///
/// Maintains the partition of `(type, value)` identifiers into persons,
/// merging persons when two identifiers are asserted to be co-referent.
mod events;
mod resolver;

pub use events::{EventSink, ResolverEvent, TracingSink};
pub use resolver::IdentityResolver;
