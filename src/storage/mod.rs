pub mod collections;
pub mod error;
pub mod persistence;

pub use collections::Collections;
pub use error::{StoreError, StoreResult};
pub use persistence::{
    DurabilityMode, JournalEntry, PersistenceManager, SnapshotMetadata, StoreSnapshot,
};
