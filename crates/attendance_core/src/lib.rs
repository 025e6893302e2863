//! Absence roster normalization and ledger reconciliation.
//! This crate is the single source of truth for ledger invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod roster;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::absence::{
    AbsenceRecord, Grade, GradeScope, ModelError, PeriodSet, StudentId, TimeSlot,
};
pub use model::ledger_row::{LedgerRow, Track, TrackEntry, LEDGER_HEADER};
pub use repo::ledger::{Ledger, LedgerError, LedgerResult, Snapshot};
pub use repo::sheet_repo::SqliteSheet;
pub use repo::student_directory::{DirectoryError, StudentDirectory};
pub use roster::normalizer::{normalize_roster, NormalizeOutcome, Normalizer, RosterEntry};
pub use service::cancellation::CancellationFilter;
pub use service::notification::{CellAddress, NotificationComposer};
pub use service::reconcile_service::{
    plan_reconcile, ReconcileError, ReconcilePhase, ReconcilePlan, ReconcileReport, Reconciler,
};
pub use service::run_service::{RunError, RunReport, RunRequest, RunService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
