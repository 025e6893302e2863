//! Ledger reconciliation.
//!
//! # Responsibility
//! - Index a fresh ledger snapshot for the target date.
//! - Route each record to "merge into its existing row" or "append as new".
//! - Apply merges cell by cell and append new rows as one contiguous block.
//!
//! # Invariants
//! - A (date, track, student) pair occupies at most one row; known students
//!   are merged by period-set union, never duplicated.
//! - New rows continue the date's sequence numbers and start right after the
//!   last occupied row, never on the header row.
//! - Track one and track two new lists are packed by position: row `i` holds
//!   the `i`-th new student of each track, whether or not both exist.
//! - There is no lock between snapshot read and writes; concurrent runs on
//!   one ledger can overwrite each other's new rows.
//!
//! # Failure semantics
//! - A ledger failure stops the current phase; writes already made stay and
//!   are reported as partial progress. Later phases are not attempted.

use crate::model::absence::{AbsenceRecord, PeriodSet};
use crate::model::ledger_row::{
    LedgerRow, Track, TrackEntry, COL_DATE, HEADER_ROW, LEDGER_COLUMNS,
};
use crate::repo::ledger::{Ledger, LedgerError, Snapshot};
use crate::repo::student_directory::StudentDirectory;
use chrono::NaiveDate;
use log::{error, info};
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Date format of ledger column A.
pub const LEDGER_DATE_FORMAT: &str = "%Y-%m-%d";

/// Existing ledger row of a student on the target date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEntry {
    /// 1-based sheet row.
    pub row: u32,
    pub periods_text: String,
}

/// Per-date view of a ledger snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerIndex {
    track_one: HashMap<String, IndexedEntry>,
    track_two: HashMap<String, IndexedEntry>,
    max_sequence: Option<u64>,
    last_occupied_row: u32,
}

impl LedgerIndex {
    /// Indexes the data rows (header excluded) of `snapshot` for `date`.
    ///
    /// If a student appears twice on one track for the date, the upper row wins.
    pub fn build(snapshot: &Snapshot, date: &str) -> Self {
        let mut index = Self::default();

        for (position, cells) in snapshot.iter().enumerate() {
            let row = position as u32 + 1;
            if cells.iter().any(|cell| !cell.trim().is_empty()) {
                index.last_occupied_row = row;
            }
            if row == HEADER_ROW {
                continue;
            }

            let ledger_row = LedgerRow::from_cells(cells);
            if ledger_row.date != date {
                continue;
            }

            if let Some(sequence) = ledger_row.sequence_number() {
                index.max_sequence = Some(index.max_sequence.map_or(sequence, |max| max.max(sequence)));
            }
            for track in Track::ALL {
                if let Some(entry) = ledger_row.track(track) {
                    index
                        .track_mut(track)
                        .entry(entry.student_id.clone())
                        .or_insert_with(|| IndexedEntry {
                            row,
                            periods_text: entry.periods_text.clone(),
                        });
                }
            }
        }

        index
    }

    fn track_mut(&mut self, track: Track) -> &mut HashMap<String, IndexedEntry> {
        match track {
            Track::One => &mut self.track_one,
            Track::Two => &mut self.track_two,
        }
    }

    pub fn entry(&self, track: Track, student_id: &str) -> Option<&IndexedEntry> {
        match track {
            Track::One => self.track_one.get(student_id),
            Track::Two => self.track_two.get(student_id),
        }
    }

    pub fn max_sequence(&self) -> Option<u64> {
        self.max_sequence
    }

    /// Saturates at `u64::MAX` for hand-edited sequence cells.
    pub fn next_sequence(&self) -> u64 {
        self.max_sequence.unwrap_or(0).saturating_add(1)
    }

    pub fn last_occupied_row(&self) -> u32 {
        self.last_occupied_row
    }

    /// First free sheet row below every occupied row and the header.
    pub fn next_row(&self) -> u32 {
        self.last_occupied_row.max(HEADER_ROW) + 1
    }
}

/// One period-cell overwrite for a student already in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeWrite {
    pub track: Track,
    pub student_id: String,
    pub row: u32,
    pub col: u32,
    pub periods_text: String,
}

/// Writes computed from one snapshot, before anything is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub date: String,
    pub merges: Vec<MergeWrite>,
    pub new_rows: Vec<LedgerRow>,
    /// Sheet row of the first new row.
    pub first_new_row: u32,
    /// Sequence number of the first new row.
    pub first_sequence: u64,
    pub track_one_new: usize,
    pub track_two_new: usize,
}

impl ReconcilePlan {
    pub fn track_one_merges(&self) -> usize {
        self.merges_on(Track::One)
    }

    pub fn track_two_merges(&self) -> usize {
        self.merges_on(Track::Two)
    }

    fn merges_on(&self, track: Track) -> usize {
        self.merges
            .iter()
            .filter(|merge| merge.track == track)
            .count()
    }

    /// Counts the plan would produce if applied without failure.
    pub fn projected_report(&self) -> ReconcileReport {
        ReconcileReport {
            track_one_updated: self.track_one_merges(),
            track_two_updated: self.track_two_merges(),
            track_one_new: self.track_one_new,
            track_two_new: self.track_two_new,
            rows_appended: self.new_rows.len(),
            first_sequence: (!self.new_rows.is_empty()).then_some(self.first_sequence),
        }
    }
}

/// Builds the reconciliation plan for `records` against `snapshot`.
pub fn plan_reconcile(
    records: &[AbsenceRecord],
    date: NaiveDate,
    snapshot: &Snapshot,
    directory: &StudentDirectory,
) -> ReconcilePlan {
    let date_text = date.format(LEDGER_DATE_FORMAT).to_string();
    let index = LedgerIndex::build(snapshot, &date_text);

    let mut merges = Vec::new();
    let mut fresh_one: Vec<TrackEntry> = Vec::new();
    let mut fresh_two: Vec<TrackEntry> = Vec::new();

    for record in records {
        let track = Track::for_grade(record.grade);
        match index.entry(track, record.student_id.as_str()) {
            Some(existing) => {
                let merged =
                    PeriodSet::parse_ledger_text(&existing.periods_text).union(&record.periods);
                merges.push(MergeWrite {
                    track,
                    student_id: record.student_id.to_string(),
                    row: existing.row,
                    col: track.periods_col(),
                    periods_text: merged.to_ledger_text(),
                });
            }
            None => {
                let entry = TrackEntry {
                    student_id: record.student_id.to_string(),
                    name: record.name.clone(),
                    kind: directory.residence_type(record.grade, &record.student_id),
                    periods_text: record.periods.to_ledger_text(),
                };
                match track {
                    Track::One => fresh_one.push(entry),
                    Track::Two => fresh_two.push(entry),
                }
            }
        }
    }

    let first_sequence = index.next_sequence();
    let track_one_new = fresh_one.len();
    let track_two_new = fresh_two.len();
    let row_count = track_one_new.max(track_two_new);

    let mut fresh_one = fresh_one.into_iter();
    let mut fresh_two = fresh_two.into_iter();
    let new_rows = (0..row_count)
        .map(|offset| LedgerRow {
            date: date_text.clone(),
            sequence: first_sequence.saturating_add(offset as u64).to_string(),
            track_one: fresh_one.next(),
            track_two: fresh_two.next(),
        })
        .collect();

    ReconcilePlan {
        date: date_text,
        merges,
        new_rows,
        first_new_row: index.next_row(),
        first_sequence,
        track_one_new,
        track_two_new,
    }
}

/// Counts of a reconciliation, complete or partial.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub track_one_updated: usize,
    pub track_two_updated: usize,
    pub track_one_new: usize,
    pub track_two_new: usize,
    pub rows_appended: usize,
    pub first_sequence: Option<u64>,
}

impl ReconcileReport {
    /// Students touched by the run (merged plus newly written).
    pub fn total_processed(&self) -> usize {
        self.track_one_updated + self.track_two_updated + self.track_one_new + self.track_two_new
    }
}

/// Stage of a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePhase {
    Snapshot,
    Merge,
    Append,
}

impl Display for ReconcilePhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Snapshot => "snapshot",
            Self::Merge => "merge",
            Self::Append => "append",
        };
        f.write_str(name)
    }
}

/// Ledger failure during a phase, with the progress committed before it.
#[derive(Debug)]
pub struct ReconcileError {
    pub phase: ReconcilePhase,
    pub partial: ReconcileReport,
    pub source: LedgerError,
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ledger {} phase failed after {} committed students: {}",
            self.phase,
            self.partial.total_processed(),
            self.source
        )
    }
}

impl Error for ReconcileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Reconciles absence records into one ledger sheet.
pub struct Reconciler<'a, L: Ledger> {
    ledger: L,
    directory: &'a StudentDirectory,
}

impl<'a, L: Ledger> Reconciler<'a, L> {
    pub fn new(ledger: L, directory: &'a StudentDirectory) -> Self {
        Self { ledger, directory }
    }

    /// Reads a fresh snapshot and computes the writes, without applying them.
    pub fn plan(
        &self,
        records: &[AbsenceRecord],
        date: NaiveDate,
    ) -> Result<ReconcilePlan, ReconcileError> {
        let snapshot = self.ledger.read_snapshot().map_err(|source| {
            error!("event=ledger_snapshot module=service status=error error={source}");
            ReconcileError {
                phase: ReconcilePhase::Snapshot,
                partial: ReconcileReport::default(),
                source,
            }
        })?;
        Ok(plan_reconcile(records, date, &snapshot, self.directory))
    }

    /// Applies a plan: merges first, then the new-row block.
    pub fn apply(&self, plan: &ReconcilePlan) -> Result<ReconcileReport, ReconcileError> {
        let mut report = ReconcileReport::default();

        for merge in &plan.merges {
            if let Err(source) = self
                .ledger
                .write_cell(merge.row, merge.col, &merge.periods_text)
            {
                error!(
                    "event=ledger_merge module=service status=error date={} row={} track={} committed={} error={source}",
                    plan.date,
                    merge.row,
                    merge.track.number(),
                    report.track_one_updated + report.track_two_updated
                );
                return Err(ReconcileError {
                    phase: ReconcilePhase::Merge,
                    partial: report,
                    source,
                });
            }
            match merge.track {
                Track::One => report.track_one_updated += 1,
                Track::Two => report.track_two_updated += 1,
            }
        }

        if !plan.new_rows.is_empty() {
            let last_row = plan.first_new_row + plan.new_rows.len() as u32 - 1;
            let values: Vec<Vec<String>> = plan.new_rows.iter().map(LedgerRow::to_cells).collect();
            if let Err(source) = self.ledger.write_block(
                plan.first_new_row..=last_row,
                COL_DATE..=LEDGER_COLUMNS,
                &values,
            ) {
                error!(
                    "event=ledger_append module=service status=error date={} first_row={} rows={} error={source}",
                    plan.date,
                    plan.first_new_row,
                    values.len()
                );
                return Err(ReconcileError {
                    phase: ReconcilePhase::Append,
                    partial: report,
                    source,
                });
            }
            report.track_one_new = plan.track_one_new;
            report.track_two_new = plan.track_two_new;
            report.rows_appended = values.len();
            report.first_sequence = Some(plan.first_sequence);
        }

        info!(
            "event=ledger_reconcile module=service status=ok date={} updated={} new={} rows_appended={}",
            plan.date,
            report.track_one_updated + report.track_two_updated,
            report.track_one_new + report.track_two_new,
            report.rows_appended
        );
        Ok(report)
    }

    /// Snapshot, plan and apply in one call.
    pub fn reconcile(
        &self,
        records: &[AbsenceRecord],
        date: NaiveDate,
    ) -> Result<ReconcileReport, ReconcileError> {
        let plan = self.plan(records, date)?;
        self.apply(&plan)
    }
}
