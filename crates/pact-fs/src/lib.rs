//! Filesystem layer for the pact extension manager
//!
//! Provides the storage-root layout, atomic manifest writes, the advisory
//! lock guarding mutating commands, and alias entry management.

pub mod alias;
pub mod constants;
pub mod error;
pub mod io;
pub mod layout;
pub mod lock;

pub use constants::{HOME_ENV_VAR, StoragePath};
pub use error::{Error, Result};
pub use layout::StorageLayout;
pub use lock::StorageLock;
