//! Clock port for obtaining the current time.

use chrono::{DateTime, Utc};

/// Source of wall-clock time for record timestamps, noise derivation and
/// run results.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Current time as Unix seconds, the resolution persisted in
    /// `created` fields.
    fn unix_seconds(&self) -> i64 {
        self.now().timestamp()
    }
}
