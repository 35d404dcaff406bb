//! Service context bundling all port trait objects.

use chrono::{DateTime, Utc};

use crate::adapters::live::{LiveClock, LiveDocumentStore, LiveIdGenerator};
use crate::adapters::memory::{FixedClock, MemoryDocumentStore, SequentialIdGenerator};
use crate::ports::clock::Clock;
use crate::ports::id_gen::IdGenerator;
use crate::ports::store::DocumentStore;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations.
pub struct ServiceContext {
    /// Clock for record timestamps and noise derivation.
    pub clock: Box<dyn Clock>,
    /// ID generator for run and result identifiers.
    pub id_gen: Box<dyn IdGenerator>,
    /// Persistence gateway for mock and test-case documents.
    pub store: Box<dyn DocumentStore>,
}

impl ServiceContext {
    /// Creates a context backed by the system clock, random UUIDs and the
    /// local filesystem.
    #[must_use]
    pub fn live() -> Self {
        Self {
            clock: Box::new(LiveClock),
            id_gen: Box::new(LiveIdGenerator),
            store: Box::new(LiveDocumentStore),
        }
    }

    /// Creates a fully deterministic context: a clock pinned at `now`,
    /// sequential ids and an empty in-memory store.
    #[must_use]
    pub fn in_memory(now: DateTime<Utc>) -> Self {
        Self {
            clock: Box::new(FixedClock::new(now)),
            id_gen: Box::new(SequentialIdGenerator::default()),
            store: Box::new(MemoryDocumentStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::TimeZone;

    use super::*;

    #[test]
    fn in_memory_context_is_deterministic() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ctx = ServiceContext::in_memory(now);
        assert_eq!(ctx.clock.now(), now);
        assert_eq!(ctx.id_gen.generate_id(), "id-0");
        assert!(ctx.store.read(Path::new("x"), "mocks").unwrap_err().is_not_found());
    }
}
