//! Predictable identifiers.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::ports::IdGenerator;

/// Yields `<prefix>-0`, `<prefix>-1`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    /// Starts a sequence at zero.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), next: AtomicU64::new(0) }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_up() {
        let ids = SequentialIdGenerator::new("run");
        assert_eq!(ids.generate_id(), "run-0");
        assert_eq!(ids.generate_id(), "run-1");
        assert_eq!(ids.generate_tagged("result"), "result-run-2");
    }
}
