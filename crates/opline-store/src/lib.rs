//! Durable, human-readable mirror of the Opline journal.
//!
//! Each session writes to an autosave file named with a creation epoch
//! prefix; old autosaves are rotated out beyond a configured limit. Manual
//! exports use a different suffix and are exempt from rotation.

pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{LogStore, StoreConfig, AUTOSAVE_SUFFIX, EXPORT_SUFFIX};
