//! Adapter implementations for port traits.
//!
//! `live` talks to the real system; `memory` keeps everything in process
//! for tests and dry runs.

pub mod live;
pub mod memory;
