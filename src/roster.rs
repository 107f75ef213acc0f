use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::grade::Grade;
use crate::models::{GradeDefinition, Student};

/// Students and grade definitions as handed over by the data layer, either
/// read from a JSON snapshot or loaded from Postgres for a single grade.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    #[serde(default)]
    pub grade_definitions: Vec<GradeDefinition>,
    #[serde(default)]
    pub students: Vec<Student>,
}

/// How a student is named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentKey {
    Id(Uuid),
    RollNumber(String),
}

impl FromStr for StudentKey {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Ok(match Uuid::parse_str(value) {
            Ok(id) => StudentKey::Id(id),
            Err(_) => StudentKey::RollNumber(value.to_string()),
        })
    }
}

impl fmt::Display for StudentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudentKey::Id(id) => write!(f, "{id}"),
            StudentKey::RollNumber(roll) => write!(f, "with roll number {roll}"),
        }
    }
}

impl Roster {
    pub fn from_json_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        let roster: Roster = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse snapshot {}", path.display()))?;
        debug!(
            path = %path.display(),
            students = roster.students.len(),
            grades = roster.grade_definitions.len(),
            "loaded roster snapshot"
        );
        Ok(roster)
    }

    /// Subject definition for `grade`. A grade nobody has configured comes
    /// back with no subjects, which the engine reports as "no result".
    pub fn grade_definition(&self, grade: Grade) -> GradeDefinition {
        match self.grade_definitions.iter().find(|def| def.grade == grade) {
            Some(definition) => definition.clone(),
            None => {
                warn!(%grade, "no subject definition recorded for grade");
                GradeDefinition {
                    grade,
                    subjects: Vec::new(),
                }
            }
        }
    }

    pub fn active_classmates(&self, grade: Grade) -> Vec<Student> {
        self.students
            .iter()
            .filter(|student| student.grade == grade && student.is_active())
            .cloned()
            .collect()
    }

    pub fn find_student(&self, key: &StudentKey, grade: Grade) -> Option<&Student> {
        self.students.iter().find(|student| match key {
            StudentKey::Id(id) => student.id == *id,
            StudentKey::RollNumber(roll) => {
                student.grade == grade && student.roll_number.as_deref() == Some(roll.as_str())
            }
        })
    }
}
