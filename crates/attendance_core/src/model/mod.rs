//! Domain model for absence records and the ledger layout.
//!
//! # Responsibility
//! - Define canonical data structures used by the normalizer and reconciler.
//! - Keep the ledger column layout in one place.
//!
//! # Invariants
//! - Records are keyed by `StudentId`; one record per id per run.
//! - The ledger never loses rows; existing rows are only mutated by union.

pub mod absence;
pub mod ledger_row;
