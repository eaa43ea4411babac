// src/models/import.rs

use serde::{Deserialize, Serialize};

/// Reference data that can be bulk-loaded from CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Staff,
    Subjects,
    Classes,
    Students,
}

impl ImportKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "staff" => Some(Self::Staff),
            "subjects" => Some(Self::Subjects),
            "classes" => Some(Self::Classes),
            "students" => Some(Self::Students),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Subjects => "subjects",
            Self::Classes => "classes",
            Self::Students => "students",
        }
    }

    /// Header row of the downloadable template, in order.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Staff => &["username", "full_name", "email", "role", "password"],
            Self::Subjects => &["code", "name"],
            Self::Classes => &["name", "grade_level"],
            Self::Students => &["student_number", "full_name", "class_name", "email"],
        }
    }

    /// Columns the upload header must contain; the rest may be left out.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Self::Staff => &["username", "full_name", "password"],
            Self::Subjects => &["code", "name"],
            Self::Classes => &["name"],
            Self::Students => &["student_number", "full_name"],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportParams {
    #[serde(default)]
    pub dry_run: bool,
}

/// A rejected data row.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub kind: &'static str,
    pub total_rows: usize,
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_roundtrip_through_their_path_segment() {
        for kind in [
            ImportKind::Staff,
            ImportKind::Subjects,
            ImportKind::Classes,
            ImportKind::Students,
        ] {
            assert_eq!(ImportKind::parse(kind.as_str()), Some(kind));
            for required in kind.required_columns() {
                assert!(kind.columns().contains(required));
            }
        }
        assert_eq!(ImportKind::parse("teachers"), None);
    }
}
