//! The Opline journal: two append-ordered ledgers (events and errors) with
//! derived counters, error-clear semantics, and merge-by-id traversal.
//!
//! The journal is a single-writer structure. Exactly one execution context
//! mutates a given instance; readers must not iterate while a writer is
//! active. Callers serialize access externally — the session loop owns its
//! journal outright.

pub mod journal;
pub mod merge;

pub use journal::{Journal, JournalTotals};
pub use merge::{MergeIter, MergedEntry};
