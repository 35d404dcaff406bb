//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the engine and an external
//! system (time, IDs, document storage). Implementations live in
//! `src/adapters/`.

pub mod clock;
pub mod id_gen;
pub mod store;

pub use clock::Clock;
pub use id_gen::IdGenerator;
pub use store::{DirEntry, DocumentStore, StoreError};
