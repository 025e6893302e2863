//! Roster normalization and in-run aggregation.
//!
//! # Responsibility
//! - Turn raw roster rows into per-student absence records for one time slot.
//! - Union duplicate sightings of the same student within a run.
//!
//! # Invariants
//! - Output holds one record per distinct student id, in first-seen order.
//! - Name and grade are fixed by the first sighting.
//! - Specific-grade courses never contribute students of another grade.

use crate::model::absence::{AbsenceRecord, GradeScope, PeriodSet, StudentId, TimeSlot};
use crate::roster::parse::{parse_periods, parse_scope, parse_students};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One raw row as handed over by the portal extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub course_descriptor: String,
    pub student_list_text: String,
}

impl RosterEntry {
    pub fn new(course_descriptor: impl Into<String>, student_list_text: impl Into<String>) -> Self {
        Self {
            course_descriptor: course_descriptor.into(),
            student_list_text: student_list_text.into(),
        }
    }
}

/// Reason a roster row contributed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterParseError {
    /// Descriptor or student list is blank.
    EmptyField,
    /// Descriptor has no period clause and cannot be time-classified.
    MissingPeriods,
    /// None of the course periods fall into the active time slot.
    OutsideTimeSlot,
}

impl RosterParseError {
    fn code(self) -> &'static str {
        match self {
            Self::EmptyField => "empty_field",
            Self::MissingPeriods => "missing_periods",
            Self::OutsideTimeSlot => "outside_time_slot",
        }
    }
}

impl Display for RosterParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField => write!(f, "roster row has an empty descriptor or student list"),
            Self::MissingPeriods => write!(f, "course descriptor has no period clause"),
            Self::OutsideTimeSlot => write!(f, "course periods are outside the time slot"),
        }
    }
}

impl Error for RosterParseError {}

/// Descriptor facts of one course row, restricted to the active time slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseFacts {
    pub scope: GradeScope,
    pub periods: PeriodSet,
}

/// Parses a course descriptor and keeps only the periods inside `slot`.
pub fn parse_course(descriptor: &str, slot: TimeSlot) -> Result<CourseFacts, RosterParseError> {
    let periods = parse_periods(descriptor);
    if periods.is_empty() {
        return Err(RosterParseError::MissingPeriods);
    }

    let periods: PeriodSet = periods
        .into_iter()
        .filter(|period| slot.contains(*period))
        .collect();
    if periods.is_empty() {
        return Err(RosterParseError::OutsideTimeSlot);
    }

    Ok(CourseFacts {
        scope: parse_scope(descriptor),
        periods,
    })
}

/// Result of normalizing a whole roster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeOutcome {
    pub records: Vec<AbsenceRecord>,
    /// Rows that contributed nothing (blank, unparseable, or outside the slot).
    pub dropped_entries: usize,
    /// Student sightings rejected because the course targets another grade.
    pub grade_mismatches: usize,
}

/// Incremental aggregator for one run and one time slot.
pub struct Normalizer {
    slot: TimeSlot,
    records: Vec<AbsenceRecord>,
    positions: HashMap<StudentId, usize>,
    dropped_entries: usize,
    grade_mismatches: usize,
}

impl Normalizer {
    pub fn new(slot: TimeSlot) -> Self {
        Self {
            slot,
            records: Vec::new(),
            positions: HashMap::new(),
            dropped_entries: 0,
            grade_mismatches: 0,
        }
    }

    /// Folds one roster row into the aggregate.
    ///
    /// Returns the number of student sightings accepted from this row. Rows
    /// that cannot be parsed are counted as dropped and never abort the run.
    pub fn ingest(&mut self, entry: &RosterEntry) -> Result<usize, RosterParseError> {
        let outcome = self.ingest_inner(entry);
        if let Err(err) = outcome {
            self.dropped_entries += 1;
            debug!(
                "event=roster_entry_dropped module=roster status=skip slot={} reason={}",
                self.slot,
                err.code()
            );
        }
        outcome
    }

    fn ingest_inner(&mut self, entry: &RosterEntry) -> Result<usize, RosterParseError> {
        let descriptor = entry.course_descriptor.trim();
        let list_text = entry.student_list_text.trim();
        if descriptor.is_empty() || list_text.is_empty() {
            return Err(RosterParseError::EmptyField);
        }

        let course = parse_course(descriptor, self.slot)?;
        let mut accepted = 0;
        for (student_id, name) in parse_students(list_text) {
            if !course.scope.admits(student_id.actual_grade()) {
                self.grade_mismatches += 1;
                continue;
            }
            self.absorb(student_id, name, &course.periods);
            accepted += 1;
        }
        Ok(accepted)
    }

    fn absorb(&mut self, student_id: StudentId, name: String, periods: &PeriodSet) {
        match self.positions.get(&student_id) {
            Some(&position) => self.records[position].periods.union_with(periods),
            None => {
                self.positions.insert(student_id.clone(), self.records.len());
                self.records
                    .push(AbsenceRecord::new(student_id, name, periods.clone()));
            }
        }
    }

    pub fn finish(self) -> NormalizeOutcome {
        NormalizeOutcome {
            records: self.records,
            dropped_entries: self.dropped_entries,
            grade_mismatches: self.grade_mismatches,
        }
    }
}

/// Normalizes every roster row of a run into aggregated absence records.
pub fn normalize_roster(entries: &[RosterEntry], slot: TimeSlot) -> NormalizeOutcome {
    let mut normalizer = Normalizer::new(slot);
    for entry in entries {
        let _ = normalizer.ingest(entry);
    }
    normalizer.finish()
}
