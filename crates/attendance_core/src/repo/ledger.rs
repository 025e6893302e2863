//! Narrow sheet access contract used by the reconciliation engine.
//!
//! # Responsibility
//! - Define the three operations the engine needs from any grid store.
//! - Keep transport details (SQLite, remote spreadsheet) out of services.
//!
//! # Invariants
//! - Row and column numbers are 1-based sheet coordinates.
//! - `read_snapshot` returns rows in sheet order; index `i` is sheet row `i + 1`.
//! - `write_block` values must match the addressed range exactly.
//!
//! # See also
//! - `crate::service::reconcile_service`

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Full grid of one sheet, header row included.
pub type Snapshot = Vec<Vec<String>>;

/// Sheet access failure.
#[derive(Debug)]
pub enum LedgerError {
    Db(DbError),
    /// Block shape does not match the addressed range.
    InvalidRange(String),
    /// Store could not be reached.
    Unavailable(String),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidRange(message) => write!(f, "invalid sheet range: {message}"),
            Self::Unavailable(message) => write!(f, "sheet unavailable: {message}"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidRange(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for LedgerError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Grid access for one named sheet (ledger, cancellation list, notifications).
pub trait Ledger {
    /// Reads every row up to the last occupied one.
    fn read_snapshot(&self) -> LedgerResult<Snapshot>;
    /// Overwrites one cell. An empty value clears it.
    fn write_cell(&self, row: u32, col: u32, value: &str) -> LedgerResult<()>;
    /// Overwrites a rectangular range in one operation.
    fn write_block(
        &self,
        rows: RangeInclusive<u32>,
        cols: RangeInclusive<u32>,
        values: &[Vec<String>],
    ) -> LedgerResult<()>;
}

impl<L: Ledger + ?Sized> Ledger for &L {
    fn read_snapshot(&self) -> LedgerResult<Snapshot> {
        (**self).read_snapshot()
    }

    fn write_cell(&self, row: u32, col: u32, value: &str) -> LedgerResult<()> {
        (**self).write_cell(row, col, value)
    }

    fn write_block(
        &self,
        rows: RangeInclusive<u32>,
        cols: RangeInclusive<u32>,
        values: &[Vec<String>],
    ) -> LedgerResult<()> {
        (**self).write_block(rows, cols, values)
    }
}

/// Checks that `values` exactly fills `rows x cols`.
pub fn validate_block(
    rows: &RangeInclusive<u32>,
    cols: &RangeInclusive<u32>,
    values: &[Vec<String>],
) -> LedgerResult<()> {
    if *rows.start() == 0 || *cols.start() == 0 || rows.is_empty() || cols.is_empty() {
        return Err(LedgerError::InvalidRange(format!(
            "rows {rows:?} cols {cols:?} must be non-empty and 1-based"
        )));
    }

    let height = (rows.end() - rows.start() + 1) as usize;
    let width = (cols.end() - cols.start() + 1) as usize;
    if values.len() != height {
        return Err(LedgerError::InvalidRange(format!(
            "expected {height} rows, got {}",
            values.len()
        )));
    }
    if let Some((offset, row)) = values
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != width)
    {
        return Err(LedgerError::InvalidRange(format!(
            "row {} has {} cells, expected {width}",
            rows.start() + offset as u32,
            row.len()
        )));
    }
    Ok(())
}
