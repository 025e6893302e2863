use attendance_core::db::open_db_in_memory;
use attendance_core::{
    CellAddress, Ledger, LedgerError, LedgerResult, NotificationComposer, RosterEntry, RunRequest,
    RunService, Snapshot, SqliteSheet, StudentDirectory, TimeSlot, LEDGER_HEADER,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

const MORNING_CELL: CellAddress = CellAddress { row: 2, col: 1 };
const AFTERNOON_CELL: CellAddress = CellAddress { row: 3, col: 1 };

struct Sheets<'conn> {
    ledger: SqliteSheet<'conn>,
    cancellations: SqliteSheet<'conn>,
    notifications: SqliteSheet<'conn>,
}

fn sheets(conn: &Connection) -> Sheets<'_> {
    let ledger = SqliteSheet::try_new(conn, "출결기록").unwrap();
    ledger.ensure_header(&LEDGER_HEADER).unwrap();
    let cancellations = SqliteSheet::try_new(conn, "취소명단").unwrap();
    cancellations.write_cell(1, 1, "학번").unwrap();
    Sheets {
        ledger,
        cancellations,
        notifications: SqliteSheet::try_new(conn, "알림").unwrap(),
    }
}

fn service<'s>(
    sheets: &'s Sheets<'_>,
) -> RunService<&'s SqliteSheet<'s>, &'s SqliteSheet<'s>, &'s SqliteSheet<'s>> {
    let notifier = NotificationComposer::new(
        &sheets.notifications,
        MORNING_CELL,
        AFTERNOON_CELL,
        "https://example.org/ledger",
    );
    RunService::new(
        &sheets.ledger,
        &sheets.cancellations,
        notifier,
        StudentDirectory::empty(),
    )
}

fn request(slot: TimeSlot) -> RunRequest {
    RunRequest {
        date: NaiveDate::from_ymd_opt(2026, 1, 9).unwrap(),
        slot,
        dry_run: false,
    }
}

fn morning_roster() -> Vec<RosterEntry> {
    vec![
        RosterEntry::new("[2학년 국제교육부 수목 1,2교시]", "김민서(21202), 최진성(21220)"),
        RosterEntry::new("[1학년 국어과 매일 3,4교시]", "김지몽(10911)"),
        RosterEntry::new("[1학년 국어과 매일 5,6교시]", "이도윤(10305)"),
    ]
}

fn notification_text(sheet: &SqliteSheet<'_>, cell: CellAddress) -> String {
    sheet
        .read_snapshot()
        .unwrap()
        .get((cell.row - 1) as usize)
        .and_then(|row| row.get((cell.col - 1) as usize))
        .cloned()
        .unwrap_or_default()
}

#[test]
fn morning_run_writes_rows_and_notification() {
    let conn = open_db_in_memory().unwrap();
    let sheets = sheets(&conn);

    let report = service(&sheets)
        .run(&morning_roster(), request(TimeSlot::Morning))
        .unwrap();

    assert_eq!(report.date, "2026-01-09");
    assert_eq!(report.time_slot, "morning");
    assert_eq!(report.collected, 3);
    assert_eq!(report.dropped_entries, 1);
    assert_eq!(report.grade1_count, 1);
    assert_eq!(report.grade2_count, 2);
    assert_eq!(report.reconcile.rows_appended, 2);
    assert!(report.notified);

    let message = notification_text(&sheets.notifications, MORNING_CELL);
    assert!(message.contains("1월 9일(금)"));
    assert!(message.contains("결석 학생 3명"));
    assert!(notification_text(&sheets.notifications, AFTERNOON_CELL).is_empty());
}

#[test]
fn cancelled_students_are_neither_merged_nor_appended() {
    let conn = open_db_in_memory().unwrap();
    let sheets = sheets(&conn);
    let service = service(&sheets);

    service
        .run(&morning_roster(), request(TimeSlot::Morning))
        .unwrap();
    let rows_before = sheets.ledger.read_snapshot().unwrap();

    sheets.cancellations.write_cell(2, 1, "21202").unwrap();
    sheets.cancellations.write_cell(3, 1, "10305").unwrap();
    let afternoon = vec![
        RosterEntry::new("[2학년 국제교육부 수목 5,6교시]", "김민서(21202)"),
        RosterEntry::new("[1학년 국어과 매일 5,6교시]", "이도윤(10305)"),
    ];
    let report = service.run(&afternoon, request(TimeSlot::Afternoon)).unwrap();

    assert_eq!(report.collected, 2);
    assert_eq!(report.cancelled, 2);
    assert_eq!(report.reconcile.total_processed(), 0);
    assert!(!report.notified);
    assert_eq!(sheets.ledger.read_snapshot().unwrap(), rows_before);
}

#[test]
fn afternoon_run_merges_and_overwrites_its_own_cell() {
    let conn = open_db_in_memory().unwrap();
    let sheets = sheets(&conn);
    let service = service(&sheets);

    service
        .run(&morning_roster(), request(TimeSlot::Morning))
        .unwrap();
    let afternoon = vec![RosterEntry::new(
        "[1+2학년 전체 5,6교시]",
        "김지몽(10911), 이도윤(10305)",
    )];
    let report = service.run(&afternoon, request(TimeSlot::Afternoon)).unwrap();

    assert_eq!(report.reconcile.track_one_updated, 1);
    assert_eq!(report.reconcile.track_one_new, 1);
    assert_eq!(report.reconcile.first_sequence, Some(3));
    assert!(notification_text(&sheets.notifications, AFTERNOON_CELL).contains("2명"));
    assert!(notification_text(&sheets.notifications, MORNING_CELL).contains("3명"));

    let snapshot = sheets.ledger.read_snapshot().unwrap();
    assert_eq!(snapshot[1][5], "3,4,5,6교시");
}

#[test]
fn dry_run_plans_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let sheets = sheets(&conn);
    let before = sheets.ledger.read_snapshot().unwrap();

    let report = service(&sheets)
        .run(
            &morning_roster(),
            RunRequest {
                dry_run: true,
                ..request(TimeSlot::Morning)
            },
        )
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.reconcile.rows_appended, 2);
    assert!(!report.notified);
    assert_eq!(sheets.ledger.read_snapshot().unwrap(), before);
    assert!(sheets.notifications.read_snapshot().unwrap().is_empty());
}

#[test]
fn disallowed_date_is_skipped_before_any_access() {
    let conn = open_db_in_memory().unwrap();
    let sheets = sheets(&conn);
    let allowed: BTreeSet<String> = ["0112".to_string()].into_iter().collect();

    let report = service(&sheets)
        .with_allowed_dates(Some(allowed))
        .run(&morning_roster(), request(TimeSlot::Morning))
        .unwrap();

    assert!(report.skipped.as_deref().unwrap_or("").contains("0109"));
    assert_eq!(report.collected, 0);
    assert_eq!(sheets.ledger.read_snapshot().unwrap().len(), 1);
}

#[test]
fn empty_roster_is_a_successful_no_op() {
    let conn = open_db_in_memory().unwrap();
    let sheets = sheets(&conn);

    let report = service(&sheets).run(&[], request(TimeSlot::Afternoon)).unwrap();

    assert!(report.skipped.is_none());
    assert_eq!(report.reconcile.total_processed(), 0);
    assert!(!report.notified);
}

struct BrokenSheet;

impl Ledger for BrokenSheet {
    fn read_snapshot(&self) -> LedgerResult<Snapshot> {
        Err(LedgerError::Unavailable("permission denied".to_string()))
    }

    fn write_cell(&self, _row: u32, _col: u32, _value: &str) -> LedgerResult<()> {
        Err(LedgerError::Unavailable("permission denied".to_string()))
    }

    fn write_block(
        &self,
        _rows: RangeInclusive<u32>,
        _cols: RangeInclusive<u32>,
        _values: &[Vec<String>],
    ) -> LedgerResult<()> {
        Err(LedgerError::Unavailable("permission denied".to_string()))
    }
}

#[test]
fn unreachable_cancellations_and_notifications_do_not_fail_the_run() {
    let conn = open_db_in_memory().unwrap();
    let sheets = sheets(&conn);
    let notifier = NotificationComposer::new(BrokenSheet, MORNING_CELL, AFTERNOON_CELL, "");
    let service = RunService::new(
        &sheets.ledger,
        BrokenSheet,
        notifier,
        StudentDirectory::empty(),
    );

    let report = service
        .run(&morning_roster(), request(TimeSlot::Morning))
        .unwrap();

    assert!(!report.cancellation_source_available);
    assert_eq!(report.cancelled, 0);
    assert_eq!(report.reconcile.rows_appended, 2);
    assert!(!report.notified);
}

#[test]
fn ledger_failure_surfaces_as_run_error() {
    let conn = open_db_in_memory().unwrap();
    let sheets = sheets(&conn);
    let notifier =
        NotificationComposer::new(&sheets.notifications, MORNING_CELL, AFTERNOON_CELL, "");
    let service = RunService::new(
        BrokenSheet,
        &sheets.cancellations,
        notifier,
        StudentDirectory::empty(),
    );

    let err = service
        .run(&morning_roster(), request(TimeSlot::Morning))
        .unwrap_err();

    assert_eq!(err.partial().total_processed(), 0);
    assert!(err.to_string().contains("snapshot"));
    assert!(sheets.notifications.read_snapshot().unwrap().is_empty());
}
