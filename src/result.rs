use std::iter;

use tracing::debug;

use crate::grade::BandPolicy;
use crate::models::{
    Division, Exam, ExamSlot, GradeDefinition, GradingScheme, LetterGrade, Rank, ResultStatus,
    Student, SubjectDefinition, SubjectMark, TermSummary,
};
use crate::subjects::find_mark;

const PASSING_LETTERS: [&str; 4] = ["O", "A", "B", "C"];

/// Computes `student`'s result for `slot`, ranked against `classmates`.
///
/// Only classmates in the student's grade with active status and an exam
/// record for the slot take part in ranking. Returns `None` when there is
/// nothing to report: the grade defines no subjects or the student sat no
/// exam in that slot.
pub fn compute_term_summary(
    student: &Student,
    slot: ExamSlot,
    definition: &GradeDefinition,
    classmates: &[Student],
) -> Option<TermSummary> {
    if definition.subjects.is_empty() {
        return None;
    }
    let exam = student.exam(slot)?;
    let mut summary = evaluate(student, exam, definition);

    if student.is_active() {
        let cohort: Vec<TermSummary> = classmates
            .iter()
            .filter(|classmate| classmate.id != student.id && classmate.grade == student.grade)
            .filter_map(|classmate| evaluate_slot(classmate, slot, definition))
            .chain(iter::once(summary.clone()))
            .collect();
        let totals = passing_totals(&cohort);
        summary.rank = rank_for(&summary, &totals);
    }

    Some(summary)
}

/// Result sheet for a whole class: every eligible classmate's summary,
/// ordered by rank, then grand total, then name.
pub fn compute_class_results(
    definition: &GradeDefinition,
    slot: ExamSlot,
    classmates: &[Student],
) -> Vec<TermSummary> {
    if definition.subjects.is_empty() {
        return Vec::new();
    }

    let mut summaries: Vec<TermSummary> = classmates
        .iter()
        .filter(|classmate| classmate.grade == definition.grade)
        .filter_map(|classmate| evaluate_slot(classmate, slot, definition))
        .collect();

    let totals = passing_totals(&summaries);
    for summary in summaries.iter_mut() {
        summary.rank = rank_for(summary, &totals);
    }
    debug!(
        grade = %definition.grade,
        %slot,
        students = summaries.len(),
        distinct_passing_totals = totals.len(),
        "ranked class results"
    );

    summaries.sort_by(|a, b| {
        let rank_a = a.rank.position().unwrap_or(u32::MAX);
        let rank_b = b.rank.position().unwrap_or(u32::MAX);
        rank_a
            .cmp(&rank_b)
            .then_with(|| b.grand_total.total_cmp(&a.grand_total))
            .then_with(|| a.student_name.cmp(&b.student_name))
    });
    summaries
}

fn evaluate_slot(
    student: &Student,
    slot: ExamSlot,
    definition: &GradeDefinition,
) -> Option<TermSummary> {
    if !student.is_active() {
        return None;
    }
    student
        .exam(slot)
        .map(|exam| evaluate(student, exam, definition))
}

/// Scores one exam record. The returned summary is always `Unranked`.
pub fn evaluate(student: &Student, exam: &Exam, definition: &GradeDefinition) -> TermSummary {
    let policy = student.grade.policy();
    let (numeric, categorical): (Vec<&SubjectDefinition>, Vec<&SubjectDefinition>) = definition
        .subjects
        .iter()
        .partition(|subject| subject.scheme == GradingScheme::Numeric);

    let mut exam_total = 0.0;
    let mut activity_total = 0.0;
    let mut full_marks = 0.0;
    let mut failed_subjects = Vec::new();

    for subject in &numeric {
        let (exam_part, activity_part) = split_marks(policy, find_mark(subject, &exam.marks));
        exam_total += exam_part;
        activity_total += activity_part;
        full_marks += subject_full_marks(policy, subject);
        if exam_part < policy.pass_mark {
            failed_subjects.push(subject.name.clone());
        }
    }

    let categorical_total = categorical.len();
    let categorical_passed = categorical
        .iter()
        .filter(|subject| {
            find_mark(subject, &exam.marks)
                .and_then(|mark| mark.letter.as_deref())
                .is_some_and(is_passing_letter)
        })
        .count();

    let grand_total = exam_total + activity_total;
    let percentage = percentage(grand_total, full_marks);
    let result = result_status(policy, failed_subjects.len(), categorical_passed, categorical_total);

    let division = match result {
        ResultStatus::Pass if policy.awards_division => division_for(percentage),
        _ => None,
    };
    let academic_grade = match result {
        ResultStatus::Fail => Some(LetterGrade::E),
        ResultStatus::Pass if !policy.awards_division => Some(letter_for(percentage)),
        _ => None,
    };

    TermSummary {
        student_id: student.id,
        student_name: student.full_name.clone(),
        slot: exam.slot,
        exam_total,
        activity_total,
        grand_total,
        full_marks,
        percentage,
        result,
        division,
        academic_grade,
        remark: remark_for(result, percentage, &failed_subjects),
        rank: Rank::Unranked,
        failed_subjects,
        categorical_passed,
        categorical_total,
    }
}

/// Exam and activity portions of a numeric subject, missing values as zero.
/// Grades without an activity component record a single combined value.
pub fn split_marks(policy: &BandPolicy, mark: Option<&SubjectMark>) -> (f64, f64) {
    let Some(mark) = mark else {
        return (0.0, 0.0);
    };
    if policy.has_activity {
        (
            mark.exam_marks.unwrap_or(0.0),
            mark.activity_marks.unwrap_or(0.0),
        )
    } else {
        (mark.marks.or(mark.exam_marks).unwrap_or(0.0), 0.0)
    }
}

pub fn subject_full_marks(policy: &BandPolicy, subject: &SubjectDefinition) -> f64 {
    if policy.has_activity {
        subject.exam_full_marks + subject.activity_full_marks
    } else {
        subject.exam_full_marks
    }
}

fn is_passing_letter(letter: &str) -> bool {
    let letter = letter.trim();
    PASSING_LETTERS
        .iter()
        .any(|passing| passing.eq_ignore_ascii_case(letter))
}

pub fn percentage(grand_total: f64, full_marks: f64) -> f64 {
    if full_marks == 0.0 {
        0.0
    } else {
        grand_total / full_marks * 100.0
    }
}

fn result_status(
    policy: &BandPolicy,
    failures: usize,
    categorical_passed: usize,
    categorical_total: usize,
) -> ResultStatus {
    if categorical_passed < categorical_total
        || failures > 1
        || (policy.strict_fail && failures > 0)
    {
        ResultStatus::Fail
    } else if failures == 1 {
        ResultStatus::SimplePass
    } else {
        ResultStatus::Pass
    }
}

pub fn division_for(percentage: f64) -> Option<Division> {
    match percentage {
        p if p >= 75.0 => Some(Division::Distinction),
        p if p >= 60.0 => Some(Division::First),
        p if p >= 45.0 => Some(Division::Second),
        p if p >= 35.0 => Some(Division::Third),
        _ => None,
    }
}

pub fn letter_for(percentage: f64) -> LetterGrade {
    match percentage {
        p if p > 89.0 => LetterGrade::O,
        p if p > 79.0 => LetterGrade::A,
        p if p > 69.0 => LetterGrade::B,
        p if p > 59.0 => LetterGrade::C,
        _ => LetterGrade::D,
    }
}

fn remark_for(result: ResultStatus, percentage: f64, failed_subjects: &[String]) -> String {
    match result {
        ResultStatus::Fail if failed_subjects.is_empty() => {
            "Needs significant improvement.".to_string()
        }
        ResultStatus::Fail => format!(
            "Needs significant improvement. Failed in {}.",
            failed_subjects.join(", ")
        ),
        ResultStatus::SimplePass => format!(
            "Simple Pass. Focus on improving in {}.",
            failed_subjects.join(", ")
        ),
        ResultStatus::Pass => match percentage {
            p if p >= 90.0 => "Outstanding performance. Keep it up!",
            p if p >= 75.0 => "Excellent work.",
            p if p >= 60.0 => "Good performance.",
            p if p >= 45.0 => "Satisfactory performance.",
            _ => "Needs to work harder.",
        }
        .to_string(),
    }
}

/// Distinct grand totals of clean passes, highest first.
fn passing_totals(summaries: &[TermSummary]) -> Vec<f64> {
    let mut totals: Vec<f64> = summaries
        .iter()
        .filter(|summary| summary.result == ResultStatus::Pass)
        .map(|summary| summary.grand_total)
        .collect();
    totals.sort_by(|a, b| b.total_cmp(a));
    totals.dedup();
    totals
}

fn rank_for(summary: &TermSummary, passing_totals: &[f64]) -> Rank {
    if summary.result != ResultStatus::Pass {
        return Rank::Unranked;
    }
    passing_totals
        .iter()
        .position(|total| *total == summary.grand_total)
        .map(|index| Rank::Ranked(index as u32 + 1))
        .unwrap_or(Rank::Unranked)
}
