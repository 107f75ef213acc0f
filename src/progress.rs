use crate::models::{
    AttendanceTotals, Exam, ExamSlot, GradeDefinition, GradingScheme, ProgressReport,
    ResultStatus, Student, SubjectLine, TermReport,
};
use crate::result::{compute_term_summary, split_marks, subject_full_marks};
use crate::subjects::find_mark;

/// Combines the three terminal results of one student into a report card.
pub fn build_progress_report(
    student: &Student,
    definition: &GradeDefinition,
    classmates: &[Student],
) -> ProgressReport {
    let terms: Vec<TermReport> = ExamSlot::ALL
        .iter()
        .map(|slot| {
            let exam = student.exam(*slot);
            TermReport {
                slot: *slot,
                lines: exam
                    .map(|exam| subject_lines(student, exam, definition))
                    .unwrap_or_default(),
                summary: compute_term_summary(student, *slot, definition, classmates),
                attendance: exam.and_then(|exam| exam.attendance),
                teacher_remark: exam.and_then(|exam| exam.teacher_remark.clone()),
            }
        })
        .collect();

    ProgressReport {
        student_id: student.id,
        student_name: student.full_name.clone(),
        roll_number: student.roll_number.clone(),
        grade: student.grade,
        attendance: attendance_totals(&terms),
        final_status: final_status(student, &terms),
        terms,
    }
}

fn subject_lines(student: &Student, exam: &Exam, definition: &GradeDefinition) -> Vec<SubjectLine> {
    let policy = student.grade.policy();
    definition
        .subjects
        .iter()
        .map(|subject| {
            let mark = find_mark(subject, &exam.marks);
            match subject.scheme {
                GradingScheme::Numeric => {
                    let (exam_part, activity_part) = split_marks(policy, mark);
                    SubjectLine {
                        subject: subject.name.clone(),
                        scheme: subject.scheme,
                        exam_marks: mark.map(|_| exam_part),
                        activity_marks: mark
                            .filter(|_| policy.has_activity)
                            .map(|_| activity_part),
                        total: mark.map(|_| exam_part + activity_part),
                        full_marks: subject_full_marks(policy, subject),
                        letter: None,
                    }
                }
                GradingScheme::CategoricalOabc => SubjectLine {
                    subject: subject.name.clone(),
                    scheme: subject.scheme,
                    exam_marks: None,
                    activity_marks: None,
                    total: None,
                    full_marks: 0.0,
                    letter: mark
                        .and_then(|mark| mark.letter.as_deref())
                        .map(|letter| letter.trim().to_uppercase()),
                },
            }
        })
        .collect()
}

fn attendance_totals(terms: &[TermReport]) -> Option<AttendanceTotals> {
    let recorded: Vec<_> = terms.iter().filter_map(|term| term.attendance).collect();
    if recorded.is_empty() {
        return None;
    }
    let working_days: u64 = recorded.iter().map(|a| u64::from(a.working_days)).sum();
    let present_days: u64 = recorded.iter().map(|a| u64::from(a.present_days)).sum();
    let percentage = if working_days == 0 {
        0.0
    } else {
        present_days as f64 / working_days as f64 * 100.0
    };
    Some(AttendanceTotals {
        working_days,
        present_days,
        percentage,
    })
}

/// Promotion decision from the final term, or the latest remark when the
/// final term has not been graded yet.
fn final_status(student: &Student, terms: &[TermReport]) -> String {
    let final_summary = terms
        .iter()
        .find(|term| term.slot == ExamSlot::Terminal3)
        .and_then(|term| term.summary.as_ref());

    if let Some(summary) = final_summary {
        return match (summary.result, student.grade.next()) {
            (ResultStatus::Fail, _) => "Detained".to_string(),
            (_, Some(next)) => format!("Promoted to {next}"),
            (_, None) => "Passed".to_string(),
        };
    }

    terms
        .iter()
        .rev()
        .find_map(|term| {
            term.teacher_remark
                .as_deref()
                .map(str::trim)
                .filter(|remark| !remark.is_empty())
                .map(str::to_string)
                .or_else(|| term.summary.as_ref().map(|summary| summary.remark.clone()))
        })
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::Grade;
    use crate::models::{Attendance, StudentStatus, SubjectDefinition, SubjectMark};
    use uuid::Uuid;

    fn definition(grade: Grade) -> GradeDefinition {
        GradeDefinition {
            grade,
            subjects: vec![
                SubjectDefinition {
                    name: "Math".to_string(),
                    exam_full_marks: 80.0,
                    activity_full_marks: 20.0,
                    scheme: GradingScheme::Numeric,
                },
                SubjectDefinition {
                    name: "Drawing".to_string(),
                    exam_full_marks: 0.0,
                    activity_full_marks: 0.0,
                    scheme: GradingScheme::CategoricalOabc,
                },
            ],
        }
    }

    fn exam(slot: ExamSlot, math: f64, remark: Option<&str>) -> Exam {
        Exam {
            slot,
            marks: vec![
                SubjectMark {
                    subject: "Maths".to_string(),
                    exam_marks: Some(math),
                    activity_marks: Some(15.0),
                    ..SubjectMark::default()
                },
                SubjectMark {
                    subject: "Drawing".to_string(),
                    letter: Some("a".to_string()),
                    ..SubjectMark::default()
                },
            ],
            attendance: Some(Attendance {
                working_days: 50,
                present_days: 45,
            }),
            teacher_remark: remark.map(str::to_string),
        }
    }

    fn student(grade: Grade, exams: Vec<Exam>) -> Student {
        Student {
            id: Uuid::new_v4(),
            full_name: "Kiara Patel".to_string(),
            roll_number: Some("12".to_string()),
            grade,
            status: StudentStatus::Active,
            academic_performance: exams,
        }
    }

    #[test]
    fn passing_final_term_promotes_to_next_grade() {
        let pupil = student(
            Grade::VI,
            vec![
                exam(ExamSlot::Terminal1, 60.0, None),
                exam(ExamSlot::Terminal2, 65.0, None),
                exam(ExamSlot::Terminal3, 70.0, None),
            ],
        );
        let report = build_progress_report(&pupil, &definition(Grade::VI), &[]);

        assert_eq!(report.terms.len(), 3);
        assert_eq!(report.final_status, "Promoted to Class VII");
        let line = &report.terms[0].lines[0];
        assert_eq!(line.total, Some(75.0));
        assert_eq!(line.full_marks, 100.0);
        assert_eq!(report.terms[0].lines[1].letter.as_deref(), Some("A"));

        let attendance = report.attendance.unwrap();
        assert_eq!(attendance.working_days, 150);
        assert_eq!(attendance.present_days, 135);
        assert!((attendance.percentage - 90.0).abs() < 1e-9);
    }

    #[test]
    fn failing_final_term_detains() {
        let mut final_exam = exam(ExamSlot::Terminal3, 5.0, None);
        final_exam.marks[1].letter = Some("E".to_string());
        let pupil = student(Grade::VI, vec![final_exam]);
        let report = build_progress_report(&pupil, &definition(Grade::VI), &[]);
        assert_eq!(report.final_status, "Detained");
    }

    #[test]
    fn simple_pass_still_promotes() {
        let pupil = student(Grade::VI, vec![exam(ExamSlot::Terminal3, 19.0, None)]);
        let report = build_progress_report(&pupil, &definition(Grade::VI), &[]);
        let summary = report.terms[2].summary.as_ref().unwrap();
        assert_eq!(summary.result, ResultStatus::SimplePass);
        assert_eq!(report.final_status, "Promoted to Class VII");
    }

    #[test]
    fn final_grade_reports_passed() {
        let mut def = definition(Grade::X);
        def.subjects[0].activity_full_marks = 0.0;
        let mut final_exam = exam(ExamSlot::Terminal3, 0.0, None);
        final_exam.marks[0] = SubjectMark {
            subject: "Math".to_string(),
            marks: Some(88.0),
            ..SubjectMark::default()
        };
        let pupil = student(Grade::X, vec![final_exam]);
        let report = build_progress_report(&pupil, &def, &[]);
        assert_eq!(report.final_status, "Passed");
    }

    #[test]
    fn falls_back_to_teacher_then_computed_remark() {
        let with_note = student(
            Grade::VI,
            vec![
                exam(ExamSlot::Terminal1, 60.0, Some("Keeps a tidy notebook")),
                exam(ExamSlot::Terminal2, 65.0, Some("  ")),
            ],
        );
        let report = build_progress_report(&with_note, &definition(Grade::VI), &[]);
        assert_eq!(report.final_status, "Excellent work.");

        let first_only = student(
            Grade::VI,
            vec![exam(ExamSlot::Terminal1, 60.0, Some("Keeps a tidy notebook"))],
        );
        let report = build_progress_report(&first_only, &definition(Grade::VI), &[]);
        assert_eq!(report.final_status, "Keeps a tidy notebook");

        let nothing = student(Grade::VI, Vec::new());
        let report = build_progress_report(&nothing, &definition(Grade::VI), &[]);
        assert_eq!(report.final_status, "-");
        assert!(report.attendance.is_none());
        assert!(report.terms.iter().all(|term| term.summary.is_none()));
    }

    #[test]
    fn attendance_totals_do_not_overflow_per_term_counters() {
        let mut first = exam(ExamSlot::Terminal1, 60.0, None);
        let mut second = exam(ExamSlot::Terminal2, 65.0, None);
        let huge = Attendance {
            working_days: 3_000_000_000,
            present_days: 3_000_000_000,
        };
        first.attendance = Some(huge);
        second.attendance = Some(huge);
        let pupil = student(Grade::X, vec![first, second]);

        let report = build_progress_report(&pupil, &definition(Grade::X), &[]);
        let attendance = report.attendance.unwrap();
        assert_eq!(attendance.working_days, 6_000_000_000);
        assert_eq!(attendance.present_days, 6_000_000_000);
        assert!((attendance.percentage - 100.0).abs() < 1e-9);
    }
}
