//! Roster text parsers.
//!
//! # Responsibility
//! - Extract grade scope and periods from a course descriptor.
//! - Extract `(id, name)` pairs from absent-student list text.
//!
//! # Invariants
//! - Parsers never fail the run; unrecognized text yields empty/common values.
//! - Student entries that do not match `이름(12345)` are skipped, not repaired.

use crate::model::absence::{GradeScope, StudentId};
use once_cell::sync::Lazy;
use regex::Regex;

static GRADE_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d)\+?(\d)?학년").expect("valid grade marker regex"));
static PERIOD_CLAUSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:,\d+)*)교시\]").expect("valid period clause regex"));
static STUDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([가-힣]+)\((\d{5})\)").expect("valid student regex"));

/// Reads the grade scope from a descriptor such as `[2학년 국제교육부 수목 1,2교시]`.
///
/// `[1+2학년 ...]` and descriptors without a marker are common scope.
pub fn parse_scope(descriptor: &str) -> GradeScope {
    let Some(captures) = GRADE_MARKER_RE.captures(descriptor) else {
        return GradeScope::Common;
    };
    if captures.get(2).is_some() {
        return GradeScope::Common;
    }
    captures
        .get(1)
        .and_then(|grade| grade.as_str().parse::<u8>().ok())
        .map_or(GradeScope::Common, GradeScope::Specific)
}

/// Reads the period list from the bracketed `..., 1,2교시]` clause.
///
/// Returns an empty list when the clause is missing.
pub fn parse_periods(descriptor: &str) -> Vec<u8> {
    PERIOD_CLAUSE_RE
        .captures(descriptor)
        .and_then(|captures| captures.get(1))
        .map(|list| {
            list.as_str()
                .split(',')
                .filter_map(|value| value.parse::<u8>().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Reads `(id, name)` pairs from text like `김민서(21202), 최진성(21220)`.
pub fn parse_students(list_text: &str) -> Vec<(StudentId, String)> {
    STUDENT_RE
        .captures_iter(list_text)
        .filter_map(|captures| {
            let name = captures.get(1)?.as_str();
            let id = StudentId::parse(captures.get(2)?.as_str()).ok()?;
            Some((id, name.to_string()))
        })
        .collect()
}
