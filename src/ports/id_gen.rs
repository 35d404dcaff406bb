//! ID generator port.

/// Source of unique identifiers for runs and results.
pub trait IdGenerator: Send + Sync {
    /// Returns a fresh identifier.
    fn generate_id(&self) -> String;

    /// Returns a fresh identifier tagged with `prefix`, e.g. `run-<id>`.
    fn generate_tagged(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.generate_id())
    }
}
