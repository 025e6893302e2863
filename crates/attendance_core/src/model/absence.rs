//! Absence domain model.
//!
//! # Responsibility
//! - Define the per-student absence record produced by one run.
//! - Own the period-set text format shared with the ledger.
//!
//! # Invariants
//! - `StudentId` is exactly five ASCII digits.
//! - `PeriodSet` is always sorted ascending and unique.
//! - A normalized `AbsenceRecord` never carries an empty period set.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Unit literal appended to formatted period lists (`1,2교시`).
pub const PERIOD_UNIT: &str = "교시";

static PERIOD_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+").expect("valid period number regex"));

/// Validation errors for absence model values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    InvalidStudentId(String),
    UnknownTimeSlot(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidStudentId(value) => {
                write!(f, "student id must be five digits, got `{value}`")
            }
            Self::UnknownTimeSlot(value) => {
                write!(f, "unknown time slot `{value}`; expected morning|afternoon")
            }
        }
    }
}

impl Error for ModelError {}

/// Five-digit school-issued student number.
///
/// The leading digit is the authoritative grade signal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StudentId(String);

impl StudentId {
    pub fn parse(value: &str) -> Result<Self, ModelError> {
        let trimmed = value.trim();
        if trimmed.len() == 5 && trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ModelError::InvalidStudentId(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the grade from the id prefix: `1xxxx` is first grade, anything
    /// else is second grade.
    pub fn actual_grade(&self) -> Grade {
        if self.0.starts_with('1') {
            Grade::First
        } else {
            Grade::Second
        }
    }
}

impl Display for StudentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StudentId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StudentId> for String {
    fn from(value: StudentId) -> Self {
        value.0
    }
}

/// Resolved student grade. Also selects the ledger track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    First,
    Second,
}

impl Grade {
    pub fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

/// Grade applicability of a course roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeScope {
    /// Course for exactly one grade (`[2학년 ...]`).
    Specific(u8),
    /// Course shared by several grades (`[1+2학년 ...]`) or without a marker.
    Common,
}

impl GradeScope {
    /// Whether a student of `grade` may be taken from this course's roster.
    pub fn admits(self, grade: Grade) -> bool {
        match self {
            Self::Common => true,
            Self::Specific(number) => number == grade.number(),
        }
    }
}

/// Half-day window a run collects absences for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    /// Periods 1-4.
    Morning,
    /// Periods 5-8.
    Afternoon,
}

impl TimeSlot {
    pub fn periods(self) -> RangeInclusive<u8> {
        match self {
            Self::Morning => 1..=4,
            Self::Afternoon => 5..=8,
        }
    }

    pub fn contains(self, period: u8) -> bool {
        self.periods().contains(&period)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
        }
    }

    /// Localized label used in notifications and reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Morning => "오전 (1-4교시)",
            Self::Afternoon => "오후 (5-8교시)",
        }
    }
}

impl FromStr for TimeSlot {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            other => Err(ModelError::UnknownTimeSlot(other.to_string())),
        }
    }
}

impl Display for TimeSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sorted, de-duplicated set of class periods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodSet(BTreeSet<u8>);

impl PeriodSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set union in place. Commutative, associative and idempotent.
    pub fn union_with(&mut self, other: &PeriodSet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn union(&self, other: &PeriodSet) -> PeriodSet {
        let mut merged = self.clone();
        merged.union_with(other);
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.iter().collect()
    }

    /// Formats the set as ledger text, e.g. `1,2,3교시`.
    ///
    /// An empty set formats as an empty string.
    pub fn to_ledger_text(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let joined = self
            .0
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("{joined}{PERIOD_UNIT}")
    }

    /// Parses ledger period text back into a set.
    ///
    /// Only digits before the first unit literal are considered; numbers that
    /// do not fit a period are ignored.
    pub fn parse_ledger_text(text: &str) -> PeriodSet {
        let head = text.split(PERIOD_UNIT).next().unwrap_or_default();
        PERIOD_NUMBER_RE
            .find_iter(head)
            .filter_map(|found| found.as_str().parse::<u8>().ok())
            .collect()
    }
}

impl FromIterator<u8> for PeriodSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One student's absence facts for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsenceRecord {
    pub student_id: StudentId,
    pub name: String,
    /// Resolved from the id prefix, never the common scope.
    pub grade: Grade,
    pub periods: PeriodSet,
}

impl AbsenceRecord {
    pub fn new(student_id: StudentId, name: impl Into<String>, periods: PeriodSet) -> Self {
        let grade = student_id.actual_grade();
        Self {
            student_id,
            name: name.into(),
            grade,
            periods,
        }
    }
}
