//! Cancellation list filtering.
//!
//! # Responsibility
//! - Read the administratively cancelled student ids once per run.
//! - Drop records of cancelled students before reconciliation.
//!
//! # Invariants
//! - The list is read fresh every run and never cached.
//! - An unreachable list is treated as empty (fail open).

use crate::model::absence::AbsenceRecord;
use crate::repo::ledger::{Ledger, Snapshot};
use log::{info, warn};
use std::collections::HashSet;

/// Cancelled student ids read for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancellationFilter {
    ids: HashSet<String>,
    /// False when the source could not be read and the filter failed open.
    source_available: bool,
}

impl CancellationFilter {
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ids: ids
                .into_iter()
                .map(|id| id.as_ref().trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
            source_available: true,
        }
    }

    /// Reads the first column of `source`, skipping the header row.
    pub fn load(source: &impl Ledger) -> Self {
        match source.read_snapshot() {
            Ok(snapshot) => {
                let filter = Self::from_snapshot(&snapshot);
                info!(
                    "event=cancellations_loaded module=service status=ok count={}",
                    filter.len()
                );
                filter
            }
            Err(err) => {
                warn!(
                    "event=cancellations_loaded module=service status=error fallback=empty error={err}"
                );
                Self {
                    ids: HashSet::new(),
                    source_available: false,
                }
            }
        }
    }

    fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self::from_ids(
            snapshot
                .iter()
                .skip(1)
                .filter_map(|row| row.first()),
        )
    }

    pub fn contains(&self, student_id: &str) -> bool {
        self.ids.contains(student_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn source_available(&self) -> bool {
        self.source_available
    }

    /// Removes cancelled students. Returns the kept records and the number removed.
    pub fn apply(&self, records: Vec<AbsenceRecord>) -> (Vec<AbsenceRecord>, usize) {
        let before = records.len();
        let kept: Vec<_> = records
            .into_iter()
            .filter(|record| !self.contains(record.student_id.as_str()))
            .collect();
        let removed = before - kept.len();
        (kept, removed)
    }
}
