//! Durable per-device identity material.
//!
//! [`store`] provides the small key-value surface the agent persists secrets
//! through, and [`local`] owns the device signing key kept in that store.

pub mod local;
pub mod store;

pub use local::{setup_or_load, DeviceKey, KeyError, LOCAL_KEY_NAME};
pub use store::{JsonFileStore, KvStore, MemoryStore, StoreError};
