//! SQLite-backed sheet grid.
//!
//! # Responsibility
//! - Store named sheets as sparse `(row, col) -> value` cells.
//! - Implement the `Ledger` contract for one sheet per handle.
//!
//! # Invariants
//! - Blank values are never stored; writing one deletes the cell.
//! - A block write is applied in a single SQLite transaction.
//! - Snapshots end at the last row holding a non-blank cell.

use crate::repo::ledger::{validate_block, Ledger, LedgerError, LedgerResult, Snapshot};
use log::debug;
use rusqlite::{params, Connection};
use std::ops::RangeInclusive;

/// One named sheet inside the ledger database.
pub struct SqliteSheet<'conn> {
    conn: &'conn Connection,
    sheet: String,
}

impl<'conn> SqliteSheet<'conn> {
    /// Creates a handle for `sheet`. The sheet needs no prior creation.
    pub fn try_new(conn: &'conn Connection, sheet: impl Into<String>) -> LedgerResult<Self> {
        let sheet = sheet.into().trim().to_string();
        if sheet.is_empty() {
            return Err(LedgerError::InvalidRange(
                "sheet name cannot be empty".to_string(),
            ));
        }
        Ok(Self { conn, sheet })
    }

    pub fn name(&self) -> &str {
        &self.sheet
    }

    /// Writes `header` into row 1 when the sheet holds no cells yet.
    ///
    /// Returns whether the header was written.
    pub fn ensure_header(&self, header: &[&str]) -> LedgerResult<bool> {
        let occupied: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sheet_cells WHERE sheet = ?1;",
            [self.sheet.as_str()],
            |row| row.get(0),
        )?;
        if occupied > 0 || header.is_empty() {
            return Ok(false);
        }

        let values = vec![header.iter().map(|label| label.to_string()).collect()];
        self.write_block(1..=1, 1..=header.len() as u32, &values)?;
        Ok(true)
    }
}

impl Ledger for SqliteSheet<'_> {
    fn read_snapshot(&self) -> LedgerResult<Snapshot> {
        let mut stmt = self.conn.prepare(
            "SELECT row_index, col_index, value
             FROM sheet_cells
             WHERE sheet = ?1
             ORDER BY row_index ASC, col_index ASC;",
        )?;
        let cells = stmt
            .query_map([self.sheet.as_str()], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut grid: Snapshot = Vec::new();
        for (row, col, value) in cells {
            let row_pos = (row - 1) as usize;
            let col_pos = (col - 1) as usize;
            if grid.len() <= row_pos {
                grid.resize_with(row_pos + 1, Vec::new);
            }
            let cells = &mut grid[row_pos];
            if cells.len() <= col_pos {
                cells.resize(col_pos + 1, String::new());
            }
            cells[col_pos] = value;
        }

        debug!(
            "event=sheet_read module=repo status=ok sheet={} rows={}",
            self.sheet,
            grid.len()
        );
        Ok(grid)
    }

    fn write_cell(&self, row: u32, col: u32, value: &str) -> LedgerResult<()> {
        if row == 0 || col == 0 {
            return Err(LedgerError::InvalidRange(format!(
                "cell ({row}, {col}) must be 1-based"
            )));
        }
        put_cell(self.conn, &self.sheet, row, col, value)
    }

    fn write_block(
        &self,
        rows: RangeInclusive<u32>,
        cols: RangeInclusive<u32>,
        values: &[Vec<String>],
    ) -> LedgerResult<()> {
        validate_block(&rows, &cols, values)?;

        let tx = self.conn.unchecked_transaction()?;
        for (row, cells) in rows.clone().zip(values) {
            for (col, value) in cols.clone().zip(cells) {
                put_cell(&tx, &self.sheet, row, col, value)?;
            }
        }
        tx.commit()?;

        debug!(
            "event=sheet_block_write module=repo status=ok sheet={} first_row={} last_row={}",
            self.sheet,
            rows.start(),
            rows.end()
        );
        Ok(())
    }
}

fn put_cell(conn: &Connection, sheet: &str, row: u32, col: u32, value: &str) -> LedgerResult<()> {
    if value.is_empty() {
        conn.execute(
            "DELETE FROM sheet_cells WHERE sheet = ?1 AND row_index = ?2 AND col_index = ?3;",
            params![sheet, row, col],
        )?;
        return Ok(());
    }

    conn.execute(
        "INSERT INTO sheet_cells (sheet, row_index, col_index, value)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (sheet, row_index, col_index) DO UPDATE SET
            value = excluded.value,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![sheet, row, col, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::SqliteSheet;
    use crate::db::open_db_in_memory;
    use crate::repo::ledger::Ledger;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn empty_sheet_reads_as_empty_snapshot() {
        let conn = open_db_in_memory().unwrap();
        let sheet = SqliteSheet::try_new(&conn, "출결").unwrap();
        assert!(sheet.read_snapshot().unwrap().is_empty());
    }

    #[test]
    fn sparse_cells_are_padded_in_snapshot() {
        let conn = open_db_in_memory().unwrap();
        let sheet = SqliteSheet::try_new(&conn, "출결").unwrap();
        sheet.write_cell(1, 2, "B1").unwrap();
        sheet.write_cell(3, 1, "A3").unwrap();

        let snapshot = sheet.read_snapshot().unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0], cells(&["", "B1"]));
        assert!(snapshot[1].is_empty());
        assert_eq!(snapshot[2], cells(&["A3"]));
    }

    #[test]
    fn blank_write_clears_cell_and_trailing_rows_disappear() {
        let conn = open_db_in_memory().unwrap();
        let sheet = SqliteSheet::try_new(&conn, "알림").unwrap();
        sheet.write_cell(2, 1, "first").unwrap();
        sheet.write_cell(2, 1, "second").unwrap();
        assert_eq!(sheet.read_snapshot().unwrap()[1], cells(&["second"]));

        sheet.write_cell(2, 1, "").unwrap();
        assert!(sheet.read_snapshot().unwrap().is_empty());
    }

    #[test]
    fn sheets_are_isolated_by_name() {
        let conn = open_db_in_memory().unwrap();
        let ledger = SqliteSheet::try_new(&conn, "출결").unwrap();
        let other = SqliteSheet::try_new(&conn, "취소명단").unwrap();
        ledger.write_cell(1, 1, "날짜").unwrap();

        assert!(other.read_snapshot().unwrap().is_empty());
        assert_eq!(ledger.name(), "출결");
    }

    #[test]
    fn rejected_block_leaves_sheet_untouched() {
        let conn = open_db_in_memory().unwrap();
        let sheet = SqliteSheet::try_new(&conn, "출결").unwrap();

        assert!(sheet
            .write_block(2..=3, 1..=2, &[cells(&["a", "b"])])
            .is_err());
        assert!(sheet.read_snapshot().unwrap().is_empty());
    }

    #[test]
    fn ensure_header_only_writes_into_empty_sheet() {
        let conn = open_db_in_memory().unwrap();
        let sheet = SqliteSheet::try_new(&conn, "출결").unwrap();

        assert!(sheet.ensure_header(&["날짜", "순번"]).unwrap());
        assert!(!sheet.ensure_header(&["x", "y"]).unwrap());
        assert_eq!(sheet.read_snapshot().unwrap(), vec![cells(&["날짜", "순번"])]);
    }

    #[test]
    fn blank_sheet_name_is_rejected() {
        let conn = open_db_in_memory().unwrap();
        assert!(SqliteSheet::try_new(&conn, "  ").is_err());
    }
}
