//! Foundation types for Opline.
//!
//! This crate provides the record and identifier types used throughout the
//! Opline system. Every other Opline crate depends on `opline-types`.
//!
//! # Key Types
//!
//! - [`EventRecord`] — Informational record; appended and never mutated
//! - [`ErrorRecord`] — Fault record; stays in the journal until cleared
//! - [`Record`] — Either kind, as yielded by merge traversal
//! - [`MessageKind`] — Closed set of single-digit wire message identifiers

pub mod kind;
pub mod record;

pub use kind::MessageKind;
pub use record::{ErrorRecord, EventRecord, Record};
