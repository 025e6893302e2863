//! One absence-collection run, end to end.
//!
//! # Responsibility
//! - Chain normalization, cancellation filtering, reconciliation and the
//!   summary notification for one (date, time slot).
//! - Honor the allowed-date gate and dry-run mode.
//!
//! # Invariants
//! - Every run reads the cancellation list and the ledger fresh.
//! - A skipped or dry run writes nothing.
//! - Notification failures never fail the run.

use crate::model::absence::{Grade, TimeSlot};
use crate::repo::ledger::Ledger;
use crate::repo::student_directory::StudentDirectory;
use crate::roster::normalizer::{normalize_roster, RosterEntry};
use crate::service::cancellation::CancellationFilter;
use crate::service::notification::NotificationComposer;
use crate::service::reconcile_service::{
    ReconcileError, ReconcileReport, Reconciler, LEDGER_DATE_FORMAT,
};
use chrono::NaiveDate;
use log::info;
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Target of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRequest {
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub dry_run: bool,
}

/// Outcome summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub date: String,
    pub time_slot: String,
    pub time_label: String,
    pub dry_run: bool,
    /// Set when the run was skipped before touching any sheet.
    pub skipped: Option<String>,
    pub collected: usize,
    pub cancelled: usize,
    pub cancellation_source_available: bool,
    pub grade1_count: usize,
    pub grade2_count: usize,
    pub dropped_entries: usize,
    pub reconcile: ReconcileReport,
    pub notified: bool,
}

/// Run failure; the ledger error carries the partial progress.
#[derive(Debug)]
pub enum RunError {
    Reconcile(ReconcileError),
}

impl RunError {
    pub fn partial(&self) -> &ReconcileReport {
        match self {
            Self::Reconcile(err) => &err.partial,
        }
    }
}

impl Display for RunError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reconcile(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Reconcile(err) => Some(err),
        }
    }
}

impl From<ReconcileError> for RunError {
    fn from(value: ReconcileError) -> Self {
        Self::Reconcile(value)
    }
}

/// Run orchestration over three sheets and the student directory.
pub struct RunService<L: Ledger, C: Ledger, N: Ledger> {
    ledger: L,
    cancellations: C,
    notifier: NotificationComposer<N>,
    directory: StudentDirectory,
    allowed_dates: Option<BTreeSet<String>>,
}

impl<L: Ledger, C: Ledger, N: Ledger> RunService<L, C, N> {
    pub fn new(
        ledger: L,
        cancellations: C,
        notifier: NotificationComposer<N>,
        directory: StudentDirectory,
    ) -> Self {
        Self {
            ledger,
            cancellations,
            notifier,
            directory,
            allowed_dates: None,
        }
    }

    /// Restricts runs to the given `MMDD` days.
    pub fn with_allowed_dates(mut self, allowed_dates: Option<BTreeSet<String>>) -> Self {
        self.allowed_dates = allowed_dates;
        self
    }

    pub fn run(&self, entries: &[RosterEntry], request: RunRequest) -> Result<RunReport, RunError> {
        let mut report = RunReport {
            date: request.date.format(LEDGER_DATE_FORMAT).to_string(),
            time_slot: request.slot.as_str().to_string(),
            time_label: request.slot.label().to_string(),
            dry_run: request.dry_run,
            ..RunReport::default()
        };

        if let Some(reason) = self.skip_reason(request.date) {
            info!(
                "event=run_skipped module=service status=skip date={} slot={} reason=date_not_allowed",
                report.date, request.slot
            );
            report.skipped = Some(reason);
            return Ok(report);
        }

        info!(
            "event=run_start module=service status=start date={} slot={} entries={} dry_run={}",
            report.date,
            request.slot,
            entries.len(),
            request.dry_run
        );

        let normalized = normalize_roster(entries, request.slot);
        report.collected = normalized.records.len();
        report.dropped_entries = normalized.dropped_entries;

        let cancellations = CancellationFilter::load(&self.cancellations);
        report.cancellation_source_available = cancellations.source_available();
        let (records, cancelled) = cancellations.apply(normalized.records);
        report.cancelled = cancelled;
        report.grade1_count = records.iter().filter(|r| r.grade == Grade::First).count();
        report.grade2_count = records.iter().filter(|r| r.grade == Grade::Second).count();

        if records.is_empty() {
            info!(
                "event=run_finish module=service status=ok date={} slot={} processed=0 reason=no_records",
                report.date, request.slot
            );
            return Ok(report);
        }

        let reconciler = Reconciler::new(&self.ledger, &self.directory);
        let plan = reconciler.plan(&records, request.date)?;
        if request.dry_run {
            report.reconcile = plan.projected_report();
            info!(
                "event=run_finish module=service status=ok date={} slot={} dry_run=true planned={}",
                report.date,
                request.slot,
                report.reconcile.total_processed()
            );
            return Ok(report);
        }

        report.reconcile = reconciler.apply(&plan)?;

        let processed = report.reconcile.total_processed();
        if processed > 0 {
            report.notified = self.notifier.publish(processed, request.slot, request.date);
        }

        info!(
            "event=run_finish module=service status=ok date={} slot={} processed={} rows_appended={} notified={}",
            report.date,
            request.slot,
            processed,
            report.reconcile.rows_appended,
            report.notified
        );
        Ok(report)
    }

    fn skip_reason(&self, date: NaiveDate) -> Option<String> {
        let allowed = self.allowed_dates.as_ref()?;
        let month_day = date.format("%m%d").to_string();
        if allowed.contains(&month_day) {
            None
        } else {
            Some(format!("{month_day} is not an allowed run date"))
        }
    }
}
