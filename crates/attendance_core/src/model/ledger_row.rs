//! Ledger row layout.
//!
//! # Responsibility
//! - Describe the fixed ten-column, two-track ledger schema.
//! - Convert between typed rows and raw cell values.
//!
//! # Invariants
//! - Column numbers are 1-based (`A = 1`).
//! - Row 1 of the ledger sheet is the header; data starts at row 2.

use crate::model::absence::Grade;

/// Total number of ledger columns (A..J).
pub const LEDGER_COLUMNS: u32 = 10;
/// Sheet row holding the header.
pub const HEADER_ROW: u32 = 1;
/// Column A.
pub const COL_DATE: u32 = 1;
/// Column B.
pub const COL_SEQUENCE: u32 = 2;

/// Header labels written by `init` into an empty ledger.
pub const LEDGER_HEADER: [&str; LEDGER_COLUMNS as usize] = [
    "날짜", "순번", "1학년 학번", "1학년 이름", "1학년 구분", "1학년 교시", "2학년 학번",
    "2학년 이름", "2학년 구분", "2학년 교시",
];

/// One of the two parallel column groups of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Track {
    /// Columns C..F, first-grade students.
    One,
    /// Columns G..J, second-grade students.
    Two,
}

impl Track {
    pub const ALL: [Track; 2] = [Track::One, Track::Two];

    pub fn for_grade(grade: Grade) -> Self {
        match grade {
            Grade::First => Self::One,
            Grade::Second => Self::Two,
        }
    }

    pub fn id_col(self) -> u32 {
        match self {
            Self::One => 3,
            Self::Two => 7,
        }
    }

    pub fn name_col(self) -> u32 {
        self.id_col() + 1
    }

    pub fn type_col(self) -> u32 {
        self.id_col() + 2
    }

    pub fn periods_col(self) -> u32 {
        self.id_col() + 3
    }

    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

/// Student cells of one track within a row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackEntry {
    pub student_id: String,
    pub name: String,
    /// Residence type from the student directory (기숙/통학), may be blank.
    pub kind: String,
    pub periods_text: String,
}

/// Typed view over one ledger data row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerRow {
    pub date: String,
    pub sequence: String,
    pub track_one: Option<TrackEntry>,
    pub track_two: Option<TrackEntry>,
}

impl LedgerRow {
    /// Reads a row from raw cells; missing trailing cells count as blank.
    pub fn from_cells(cells: &[String]) -> Self {
        let cell = |col: u32| -> String {
            cells
                .get((col - 1) as usize)
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };
        let entry = |track: Track| -> Option<TrackEntry> {
            let student_id = cell(track.id_col());
            if student_id.is_empty() {
                return None;
            }
            Some(TrackEntry {
                student_id,
                name: cell(track.name_col()),
                kind: cell(track.type_col()),
                periods_text: cell(track.periods_col()),
            })
        };

        Self {
            date: cell(COL_DATE),
            sequence: cell(COL_SEQUENCE),
            track_one: entry(Track::One),
            track_two: entry(Track::Two),
        }
    }

    /// Writes the row as exactly `LEDGER_COLUMNS` cells.
    pub fn to_cells(&self) -> Vec<String> {
        let mut cells = vec![String::new(); LEDGER_COLUMNS as usize];
        cells[(COL_DATE - 1) as usize] = self.date.clone();
        cells[(COL_SEQUENCE - 1) as usize] = self.sequence.clone();
        for track in Track::ALL {
            if let Some(entry) = self.track(track) {
                cells[(track.id_col() - 1) as usize] = entry.student_id.clone();
                cells[(track.name_col() - 1) as usize] = entry.name.clone();
                cells[(track.type_col() - 1) as usize] = entry.kind.clone();
                cells[(track.periods_col() - 1) as usize] = entry.periods_text.clone();
            }
        }
        cells
    }

    pub fn track(&self, track: Track) -> Option<&TrackEntry> {
        match track {
            Track::One => self.track_one.as_ref(),
            Track::Two => self.track_two.as_ref(),
        }
    }

    /// Sequence number, or `None` when the cell is not an integer.
    pub fn sequence_number(&self) -> Option<u64> {
        self.sequence.parse().ok()
    }
}
