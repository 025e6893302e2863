//! Student directory lookups.
//!
//! # Responsibility
//! - Load per-grade student files (`{"10911": {"name": .., "type": ..}}`).
//! - Resolve the residence type written into the ledger type column.
//!
//! # Invariants
//! - Unknown students resolve to a blank type; lookups never fail.

use crate::model::absence::{Grade, StudentId};
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum DirectoryError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read student file `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid student file `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for DirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

/// Directory entry of one student. Other keys (e.g. `name`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StudentInfo {
    /// Residence type such as `기숙` or `통학`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Per-grade student lookup tables.
#[derive(Debug, Clone, Default)]
pub struct StudentDirectory {
    first: HashMap<String, StudentInfo>,
    second: HashMap<String, StudentInfo>,
}

impl StudentDirectory {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the optional per-grade files. A missing path means an empty table.
    pub fn load(
        first_grade: Option<&Path>,
        second_grade: Option<&Path>,
    ) -> Result<Self, DirectoryError> {
        Ok(Self {
            first: first_grade.map(load_table).transpose()?.unwrap_or_default(),
            second: second_grade.map(load_table).transpose()?.unwrap_or_default(),
        })
    }

    pub fn from_json(first_grade: &str, second_grade: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            first: serde_json::from_str(first_grade)?,
            second: serde_json::from_str(second_grade)?,
        })
    }

    pub fn lookup(&self, grade: Grade, student_id: &StudentId) -> Option<&StudentInfo> {
        let table = match grade {
            Grade::First => &self.first,
            Grade::Second => &self.second,
        };
        table.get(student_id.as_str())
    }

    /// Residence type for the ledger, blank when unknown.
    pub fn residence_type(&self, grade: Grade, student_id: &StudentId) -> String {
        self.lookup(grade, student_id)
            .and_then(|info| info.kind.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn load_table(path: &Path) -> Result<HashMap<String, StudentInfo>, DirectoryError> {
    let raw = std::fs::read_to_string(path).map_err(|source| DirectoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| DirectoryError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{DirectoryError, StudentDirectory};
    use crate::model::absence::{Grade, StudentId};
    use std::path::Path;

    #[test]
    fn residence_type_is_looked_up_per_grade() {
        let directory = StudentDirectory::from_json(
            r#"{"10911": {"name": "김지몽", "type": "기숙"}}"#,
            r#"{"21202": {"name": "김민서", "type": "통학"}, "21220": {}}"#,
        )
        .unwrap();

        let first = StudentId::parse("10911").unwrap();
        let second = StudentId::parse("21202").unwrap();
        let without_type = StudentId::parse("21220").unwrap();

        assert_eq!(directory.residence_type(Grade::First, &first), "기숙");
        assert_eq!(directory.residence_type(Grade::Second, &second), "통학");
        assert_eq!(directory.residence_type(Grade::Second, &without_type), "");
        assert_eq!(directory.residence_type(Grade::Second, &first), "");
        assert_eq!(directory.len(), 3);
    }

    #[test]
    fn missing_files_are_reported_with_path() {
        let err = StudentDirectory::load(Some(Path::new("/nonexistent/grade1.json")), None)
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Io { .. }));
        assert!(err.to_string().contains("grade1.json"));
    }

    #[test]
    fn no_files_means_empty_directory() {
        assert!(StudentDirectory::load(None, None).unwrap().is_empty());
    }
}
