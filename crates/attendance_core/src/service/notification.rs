//! Run summary notification.
//!
//! # Responsibility
//! - Render the fixed-template summary message for one run.
//! - Overwrite the notification cell of the run's time slot.
//!
//! # Invariants
//! - The cell is overwritten, never appended to.
//! - A write failure is logged and swallowed.

use crate::model::absence::TimeSlot;
use crate::repo::ledger::Ledger;
use chrono::{Datelike, NaiveDate, Weekday};
use log::{info, warn};
use serde::Deserialize;

/// Sheet coordinates of a notification cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

/// Builds and writes the per-slot summary message.
pub struct NotificationComposer<N: Ledger> {
    sink: N,
    morning_cell: CellAddress,
    afternoon_cell: CellAddress,
    reference_link: String,
}

impl<N: Ledger> NotificationComposer<N> {
    pub fn new(
        sink: N,
        morning_cell: CellAddress,
        afternoon_cell: CellAddress,
        reference_link: impl Into<String>,
    ) -> Self {
        Self {
            sink,
            morning_cell,
            afternoon_cell,
            reference_link: reference_link.into(),
        }
    }

    pub fn cell_for(&self, slot: TimeSlot) -> CellAddress {
        match slot {
            TimeSlot::Morning => self.morning_cell,
            TimeSlot::Afternoon => self.afternoon_cell,
        }
    }

    pub fn compose(&self, student_count: usize, slot: TimeSlot, date: NaiveDate) -> String {
        compose_message(student_count, slot.label(), date, &self.reference_link)
    }

    /// Overwrites the slot's cell. Returns whether the write succeeded.
    pub fn publish(&self, student_count: usize, slot: TimeSlot, date: NaiveDate) -> bool {
        let cell = self.cell_for(slot);
        let message = self.compose(student_count, slot, date);
        match self.sink.write_cell(cell.row, cell.col, &message) {
            Ok(()) => {
                info!(
                    "event=notification_write module=service status=ok slot={slot} count={student_count} row={} col={}",
                    cell.row, cell.col
                );
                true
            }
            Err(err) => {
                warn!(
                    "event=notification_write module=service status=error slot={slot} row={} col={} error={err}",
                    cell.row, cell.col
                );
                false
            }
        }
    }
}

/// Renders the summary, e.g. `[결석 알림] 1월 9일(금) 오전 (1-4교시) 결석 학생 3명`.
pub fn compose_message(
    student_count: usize,
    time_label: &str,
    date: NaiveDate,
    reference_link: &str,
) -> String {
    let mut message = format!(
        "[결석 알림] {}월 {}일({}) {} 결석 학생 {}명이 기록되었습니다.",
        date.month(),
        date.day(),
        korean_weekday(date.weekday()),
        time_label,
        student_count
    );
    if !reference_link.trim().is_empty() {
        message.push_str("\n확인: ");
        message.push_str(reference_link.trim());
    }
    message
}

/// Single-character Korean weekday name.
pub fn korean_weekday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "월",
        Weekday::Tue => "화",
        Weekday::Wed => "수",
        Weekday::Thu => "목",
        Weekday::Fri => "금",
        Weekday::Sat => "토",
        Weekday::Sun => "일",
    }
}
