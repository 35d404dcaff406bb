//! In-process adapters with deterministic behaviour.

pub mod clock;
pub mod id_gen;
pub mod store;

pub use clock::FixedClock;
pub use id_gen::SequentialIdGenerator;
pub use store::MemoryDocumentStore;
