//! Sheet access contracts and persistence implementations.
//!
//! # Responsibility
//! - Define the narrow `Ledger` contract the services depend on.
//! - Isolate SQLite and file details from reconciliation logic.
//!
//! # Invariants
//! - Services only see `Ledger`; transports are swappable.

pub mod ledger;
pub mod sheet_repo;
pub mod student_directory;
