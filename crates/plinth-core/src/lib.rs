//! # plinth-core
//!
//! Core types, traits, and abstractions for the plinth collection
//! manager.
//!
//! This crate provides the domain models, repository trait definitions,
//! the change-feed bus, and the field-level diff engine that the other
//! plinth crates depend on.

pub mod defaults;
pub mod diff;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use diff::{detect_changes, ChangeSet, FieldDelta, TRACKED_FIELDS};
pub use error::{Error, Result};
pub use events::{ChangeBus, ChangeEvent, ChangeNotice, ChangeOp, WatchedTable};
pub use models::*;
pub use traits::*;
pub use uuid_utils::{is_v7, new_v7};
