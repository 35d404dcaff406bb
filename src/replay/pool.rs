//! The per-test pool of candidate mocks.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::request::{score, Outgoing};
use crate::error::Result;
use crate::models::Mock;
use crate::selector::Selection;

/// Candidate mocks for one test, in selector order.
///
/// A matched mock is consumed; config mocks (connection setup) stay in the
/// pool and can answer any number of requests.
#[derive(Debug, Default)]
pub struct MockPool {
    mocks: Mutex<Vec<Mock>>,
}

impl MockPool {
    /// Creates a pool over `mocks`, earlier mocks winning ties.
    #[must_use]
    pub fn new(mocks: Vec<Mock>) -> Self {
        Self { mocks: Mutex::new(mocks) }
    }

    fn mocks(&self) -> MutexGuard<'_, Vec<Mock>> {
        self.mocks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the best-scoring mock for `request`, removing it from the
    /// pool unless it is a config mock.
    ///
    /// # Errors
    ///
    /// Returns an error if a candidate's recorded request cannot be
    /// decoded.
    pub fn take(&self, request: &Outgoing<'_>) -> Result<Option<Mock>> {
        let mut mocks = self.mocks();
        let mut best: Option<(usize, u32)> = None;
        for (index, mock) in mocks.iter().enumerate() {
            if let Some(points) = score(mock, request)? {
                if !best.is_some_and(|(_, top)| top >= points) {
                    best = Some((index, points));
                }
            }
        }
        let Some((index, points)) = best else {
            debug!(kind = %request.kind(), candidates = mocks.len(), "no mock matched");
            return Ok(None);
        };
        let mock = if mocks[index].is_config() { mocks[index].clone() } else { mocks.remove(index) };
        debug!(mock = %mock.name, score = points, "matched mock");
        Ok(Some(mock))
    }

    /// Number of mocks still available.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mocks().len()
    }

    /// `true` when nothing is left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mocks().is_empty()
    }

    /// Names of non-config mocks that were never consumed.
    #[must_use]
    pub fn unused(&self) -> Vec<String> {
        self.mocks().iter().filter(|m| !m.is_config()).map(|m| m.name.clone()).collect()
    }
}

impl From<Selection> for MockPool {
    fn from(selection: Selection) -> Self {
        Self::new(selection.into_candidates())
    }
}
