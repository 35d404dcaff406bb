//! Adapters backed by the real system: wall clock, random UUIDs and the
//! local filesystem.

pub mod store;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ports::{Clock, IdGenerator};

pub use store::LiveDocumentStore;

/// Reads the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveClock;

impl Clock for LiveClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Produces random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveIdGenerator;

impl IdGenerator for LiveIdGenerator {
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_tracks_system_time() {
        let before = Utc::now();
        let now = LiveClock.now();
        assert!(before <= now && now <= Utc::now());
        assert_eq!(LiveClock.unix_seconds() / 10, Utc::now().timestamp() / 10);
    }

    #[test]
    fn ids_are_distinct_uuids() {
        let first = LiveIdGenerator.generate_id();
        assert_ne!(first, LiveIdGenerator.generate_id());
        assert!(Uuid::parse_str(&first).is_ok());
        assert!(LiveIdGenerator.generate_tagged("run").starts_with("run-"));
    }
}
