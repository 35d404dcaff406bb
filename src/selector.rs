//! Temporal selection of replay candidates.
//!
//! Mocks whose interaction happened strictly inside the live call's
//! window are tried first; the rest form a bounded fallback tail.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::models::Mock;

/// Default bound on the fallback partition.
pub const DEFAULT_UNFILTERED_CAP: usize = 10;

/// Result of partitioning a mock pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Mocks inside the window, plus legacy mocks, by request time.
    pub filtered: Vec<Mock>,
    /// Fallback mocks by request time, after the cap.
    pub unfiltered: Vec<Mock>,
    /// Size of the fallback partition before the cap.
    pub unfiltered_total: usize,
}

impl Selection {
    /// Replay order: filtered first, then the capped fallback.
    #[must_use]
    pub fn candidates(&self) -> Vec<&Mock> {
        self.filtered.iter().chain(&self.unfiltered).collect()
    }

    /// Consumes the selection into replay order.
    #[must_use]
    pub fn into_candidates(self) -> Vec<Mock> {
        let mut out = self.filtered;
        out.extend(self.unfiltered);
        out
    }
}

/// Partitioning settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector {
    /// Maximum number of fallback mocks kept.
    pub unfiltered_cap: usize,
}

impl Default for Selector {
    fn default() -> Self {
        Self { unfiltered_cap: DEFAULT_UNFILTERED_CAP }
    }
}

impl Selector {
    /// Partitions `pool` against the window `(after, before)`.
    ///
    /// An unset boundary disables filtering: the whole pool is returned,
    /// uncapped, as the fallback partition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fired before the scan.
    pub fn select(
        &self,
        pool: Vec<Mock>,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
        cancel: &CancelToken,
    ) -> Result<Selection> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let (Some(after), Some(before)) = (after, before) else {
            warn!(mocks = pool.len(), "test window has an unset boundary; skipping temporal filtering");
            let unfiltered_total = pool.len();
            let mut unfiltered = pool;
            mark(&mut unfiltered, false, 0);
            return Ok(Selection { filtered: Vec::new(), unfiltered, unfiltered_total });
        };

        let mut filtered = Vec::new();
        let mut unfiltered = Vec::new();
        for mock in pool {
            if !mock.version.is_known() {
                debug!(mock = %mock.name, version = %mock.version, "mock has a foreign schema version");
            }
            match mock.spec.timestamps().pair() {
                None => {
                    warn!(mock = %mock.name, "mock has no request/response timestamps; treating as legacy");
                    filtered.push(mock);
                }
                Some((req, res)) if req > after && res < before => filtered.push(mock),
                Some(_) => unfiltered.push(mock),
            }
        }

        filtered.sort_by_key(request_time);
        unfiltered.sort_by_key(request_time);
        let unfiltered_total = unfiltered.len();
        unfiltered.truncate(self.unfiltered_cap);

        mark(&mut filtered, true, 0);
        mark(&mut unfiltered, false, filtered.len());
        Ok(Selection { filtered, unfiltered, unfiltered_total })
    }
}

fn request_time(mock: &Mock) -> Option<DateTime<Utc>> {
    mock.req_timestamp()
}

fn mark(mocks: &mut [Mock], is_filtered: bool, offset: usize) {
    for (i, mock) in mocks.iter_mut().enumerate() {
        mock.test_mode_info.is_filtered = is_filtered;
        mock.test_mode_info.sort_order = i64::try_from(offset + i).unwrap_or(i64::MAX);
    }
}

/// Partitions `pool` with the default fallback cap.
///
/// # Errors
///
/// See [`Selector::select`].
pub fn select(
    pool: Vec<Mock>,
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
    cancel: &CancelToken,
) -> Result<Selection> {
    Selector::default().select(pool, after, before, cancel)
}
