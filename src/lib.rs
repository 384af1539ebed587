//! Durable storage for TLS certificate material in an object store.
//!
//! [`ObjectStorage`] maps the store/load/delete/exists/list/stat/lock/unlock
//! contract of a certificate manager onto S3 or GCS, keeping every key under a
//! configured prefix.

pub mod adapters;
pub mod config;
pub mod model;
pub mod storage;
pub mod util;

pub use config::{provision, StorageConfig};
pub use model::storage::{KeyInfo, StorageError};
pub use storage::{ObjectStorage, Storage};
