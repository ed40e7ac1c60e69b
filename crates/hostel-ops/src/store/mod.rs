//! Storage abstractions shared by every engine component. The durable store
//! itself is an external collaborator; the engine only requires per-record
//! read/update plus the single conditional bed-claim write.

pub mod memory;

pub use memory::MemoryStore;

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stale version, record was updated concurrently")]
    StaleVersion,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
