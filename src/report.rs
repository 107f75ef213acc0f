use std::fmt::Write;

use chrono::NaiveDate;

use crate::grade::Grade;
use crate::models::{ExamSlot, GradingScheme, ProgressReport, SubjectLine, TermSummary};

fn marks(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.1}"),
        None => "-".to_string(),
    }
}

fn or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn subject_row(line: &SubjectLine) -> String {
    match line.scheme {
        GradingScheme::Numeric => format!(
            "| {} | {} | {} | {} | {:.0} |",
            line.subject,
            marks(line.exam_marks),
            marks(line.activity_marks),
            marks(line.total),
            line.full_marks
        ),
        GradingScheme::CategoricalOabc => format!(
            "| {} | - | - | {} | OABC |",
            line.subject,
            line.letter.as_deref().unwrap_or("-")
        ),
    }
}

pub fn summary_line(summary: &TermSummary) -> String {
    let standing = match (summary.division, summary.academic_grade) {
        (Some(division), _) => format!("division {division}"),
        (None, Some(grade)) => format!("grade {grade}"),
        (None, None) => "grade -".to_string(),
    };
    format!(
        "{} {:.1}/{:.0} ({:.2}%), {}, rank {}",
        summary.result,
        summary.grand_total,
        summary.full_marks,
        summary.percentage,
        standing,
        summary.rank
    )
}

pub fn build_progress_report(report: &ProgressReport, generated_on: NaiveDate) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Progress Report");
    let _ = writeln!(
        output,
        "{} ({}, roll {}), generated {}",
        report.student_name,
        report.grade,
        report.roll_number.as_deref().unwrap_or("-"),
        generated_on
    );

    for term in report.terms.iter() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", term.slot.label());

        if term.lines.is_empty() {
            let _ = writeln!(output, "No marks recorded for this term.");
            continue;
        }

        let _ = writeln!(output, "| Subject | Exam | Activity | Total | Full Marks |");
        let _ = writeln!(output, "|---|---|---|---|---|");
        for line in term.lines.iter() {
            let _ = writeln!(output, "{}", subject_row(line));
        }

        let _ = writeln!(output);
        match &term.summary {
            Some(summary) => {
                let _ = writeln!(output, "Result: {}", summary_line(summary));
                let _ = writeln!(output, "Remark: {}", summary.remark);
            }
            None => {
                let _ = writeln!(output, "Result: not available");
            }
        }
        if let Some(attendance) = term.attendance {
            let _ = writeln!(
                output,
                "Attendance: {} of {} days",
                attendance.present_days, attendance.working_days
            );
        }
        if let Some(remark) = term.teacher_remark.as_deref().filter(|r| !r.trim().is_empty()) {
            let _ = writeln!(output, "Teacher's remark: {}", remark.trim());
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Session Summary");
    match &report.attendance {
        Some(attendance) => {
            let _ = writeln!(
                output,
                "- Attendance: {} of {} days ({:.1}%)",
                attendance.present_days, attendance.working_days, attendance.percentage
            );
        }
        None => {
            let _ = writeln!(output, "- Attendance: not recorded");
        }
    }
    let _ = writeln!(output, "- Final status: {}", report.final_status);

    output
}

pub fn build_result_sheet(grade: Grade, slot: ExamSlot, summaries: &[TermSummary]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Result Sheet");
    let _ = writeln!(output, "{} {} ({})", grade, slot.label(), slot);
    let _ = writeln!(output);

    if summaries.is_empty() {
        let _ = writeln!(output, "No results recorded for this exam.");
        return output;
    }

    let _ = writeln!(
        output,
        "| Rank | Student | Total | Percentage | Result | Division/Grade | Remark |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|");
    for summary in summaries.iter() {
        let standing = or_dash(
            summary
                .division
                .map(|d| d.to_string())
                .or_else(|| summary.academic_grade.map(|g| g.to_string())),
        );
        let _ = writeln!(
            output,
            "| {} | {} | {:.1}/{:.0} | {:.2}% | {} | {} | {} |",
            summary.rank,
            summary.student_name,
            summary.grand_total,
            summary.full_marks,
            summary.percentage,
            summary.result,
            standing,
            summary.remark
        );
    }

    let passed = summaries
        .iter()
        .filter(|s| s.rank.position().is_some())
        .count();
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "{} of {} students ranked.",
        passed,
        summaries.len()
    );

    output
}
