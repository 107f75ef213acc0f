use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::grade::Grade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GradingScheme {
    #[default]
    Numeric,
    #[serde(alias = "oabc", alias = "categorical")]
    CategoricalOabc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDefinition {
    pub name: String,
    #[serde(default)]
    pub exam_full_marks: f64,
    #[serde(default)]
    pub activity_full_marks: f64,
    #[serde(default)]
    pub scheme: GradingScheme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeDefinition {
    pub grade: Grade,
    #[serde(default)]
    pub subjects: Vec<SubjectDefinition>,
}

/// One subject line as recorded by a teacher. Which fields are filled depends
/// on the grade: a combined `marks` value, split `exam_marks` and
/// `activity_marks`, or a categorical `letter`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMark {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_marks: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_marks: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("unknown exam slot: {0:?} (expected terminal1, terminal2 or terminal3)")]
pub struct ParseExamSlotError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamSlot {
    Terminal1,
    Terminal2,
    Terminal3,
}

impl ExamSlot {
    pub const ALL: [ExamSlot; 3] = [ExamSlot::Terminal1, ExamSlot::Terminal2, ExamSlot::Terminal3];

    pub fn label(self) -> &'static str {
        match self {
            ExamSlot::Terminal1 => "First Terminal",
            ExamSlot::Terminal2 => "Second Terminal",
            ExamSlot::Terminal3 => "Final Terminal",
        }
    }
}

impl fmt::Display for ExamSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            ExamSlot::Terminal1 => "terminal1",
            ExamSlot::Terminal2 => "terminal2",
            ExamSlot::Terminal3 => "terminal3",
        };
        f.write_str(key)
    }
}

impl FromStr for ExamSlot {
    type Err = ParseExamSlotError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key: String = value
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "terminal1" | "1" => Ok(ExamSlot::Terminal1),
            "terminal2" | "2" => Ok(ExamSlot::Terminal2),
            "terminal3" | "3" => Ok(ExamSlot::Terminal3),
            _ => Err(ParseExamSlotError(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub working_days: u32,
    pub present_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub slot: ExamSlot,
    #[serde(default)]
    pub marks: Vec<SubjectMark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance: Option<Attendance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_remark: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("unknown student status: {0:?}")]
pub struct ParseStatusError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
    Graduated,
    Transferred,
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for StudentStatus {
    type Err = ParseStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "active" => Ok(StudentStatus::Active),
            "inactive" => Ok(StudentStatus::Inactive),
            "graduated" => Ok(StudentStatus::Graduated),
            "transferred" => Ok(StudentStatus::Transferred),
            _ => Err(ParseStatusError(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    pub grade: Grade,
    #[serde(default)]
    pub status: StudentStatus,
    #[serde(default)]
    pub academic_performance: Vec<Exam>,
}

impl Student {
    pub fn exam(&self, slot: ExamSlot) -> Option<&Exam> {
        self.academic_performance.iter().find(|exam| exam.slot == slot)
    }

    pub fn is_active(&self) -> bool {
        self.status == StudentStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "SIMPLE PASS")]
    SimplePass,
    #[serde(rename = "FAIL")]
    Fail,
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResultStatus::Pass => "PASS",
            ResultStatus::SimplePass => "SIMPLE PASS",
            ResultStatus::Fail => "FAIL",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Division {
    Distinction,
    #[serde(rename = "I Div")]
    First,
    #[serde(rename = "II Div")]
    Second,
    #[serde(rename = "III Div")]
    Third,
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Division::Distinction => "Distinction",
            Division::First => "I Div",
            Division::Second => "II Div",
            Division::Third => "III Div",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LetterGrade {
    O,
    A,
    B,
    C,
    D,
    E,
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Position among passing classmates. Anything short of a clean pass is
/// `Unranked` and renders as `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Ranked(u32),
    Unranked,
}

impl Rank {
    pub fn position(self) -> Option<u32> {
        match self {
            Rank::Ranked(n) => Some(n),
            Rank::Unranked => None,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Ranked(n) => write!(f, "{n}"),
            Rank::Unranked => f.write_str("-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermSummary {
    pub student_id: Uuid,
    pub student_name: String,
    pub slot: ExamSlot,
    pub exam_total: f64,
    pub activity_total: f64,
    pub grand_total: f64,
    pub full_marks: f64,
    pub percentage: f64,
    pub result: ResultStatus,
    pub division: Option<Division>,
    pub academic_grade: Option<LetterGrade>,
    pub remark: String,
    pub rank: Rank,
    pub failed_subjects: Vec<String>,
    pub categorical_passed: usize,
    pub categorical_total: usize,
}

/// One subject row of a progress report, resolved against the grade's
/// definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectLine {
    pub subject: String,
    pub scheme: GradingScheme,
    pub exam_marks: Option<f64>,
    pub activity_marks: Option<f64>,
    pub total: Option<f64>,
    pub full_marks: f64,
    pub letter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermReport {
    pub slot: ExamSlot,
    pub lines: Vec<SubjectLine>,
    pub summary: Option<TermSummary>,
    pub attendance: Option<Attendance>,
    pub teacher_remark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceTotals {
    pub working_days: u64,
    pub present_days: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub student_id: Uuid,
    pub student_name: String,
    pub roll_number: Option<String>,
    pub grade: Grade,
    pub terms: Vec<TermReport>,
    pub attendance: Option<AttendanceTotals>,
    pub final_status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_slot_parses_loose_keys() {
        assert_eq!("terminal1".parse::<ExamSlot>().unwrap(), ExamSlot::Terminal1);
        assert_eq!("Terminal-2".parse::<ExamSlot>().unwrap(), ExamSlot::Terminal2);
        assert_eq!("3".parse::<ExamSlot>().unwrap(), ExamSlot::Terminal3);
        assert!("midterm".parse::<ExamSlot>().is_err());
        assert_eq!(ExamSlot::Terminal3.to_string(), "terminal3");
    }

    #[test]
    fn student_document_deserializes_with_defaults() {
        let doc = r#"{
            "id": "3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2",
            "fullName": "Avery Lee",
            "grade": "Class VI",
            "academicPerformance": [
                {"slot": "terminal1", "marks": [{"subject": "Maths", "examMarks": 62, "activityMarks": 18}]}
            ]
        }"#;
        let student: Student = serde_json::from_str(doc).unwrap();
        assert_eq!(student.grade, Grade::VI);
        assert!(student.is_active());
        let exam = student.exam(ExamSlot::Terminal1).unwrap();
        assert_eq!(exam.marks[0].exam_marks, Some(62.0));
        assert!(student.exam(ExamSlot::Terminal2).is_none());
    }

    #[test]
    fn rank_and_status_render_for_reports() {
        assert_eq!(Rank::Ranked(2).to_string(), "2");
        assert_eq!(Rank::Unranked.to_string(), "-");
        assert_eq!(ResultStatus::SimplePass.to_string(), "SIMPLE PASS");
        assert_eq!(Division::Second.to_string(), "II Div");
        assert_eq!(
            serde_json::to_string(&ResultStatus::SimplePass).unwrap(),
            "\"SIMPLE PASS\""
        );
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("ACTIVE".parse::<StudentStatus>().unwrap(), StudentStatus::Active);
        assert!("expelled".parse::<StudentStatus>().is_err());
    }

    #[test]
    fn scheme_accepts_short_aliases() {
        let def: SubjectDefinition =
            serde_json::from_str(r#"{"name": "Art", "scheme": "oabc"}"#).unwrap();
        assert_eq!(def.scheme, GradingScheme::CategoricalOabc);
        assert_eq!(def.exam_full_marks, 0.0);
    }
}
