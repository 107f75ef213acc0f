use anyhow::Context;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::grade::Grade;
use crate::models::{
    Exam, ExamSlot, GradeDefinition, GradingScheme, Student, StudentStatus, SubjectDefinition,
    SubjectMark,
};
use crate::roster::Roster;
use crate::subjects::same_subject;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn upsert_grade_definition(
    pool: &PgPool,
    definition: &GradeDefinition,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO school_results.grade_definitions (grade, subjects)
        VALUES ($1, $2)
        ON CONFLICT (grade) DO UPDATE
        SET subjects = EXCLUDED.subjects, updated_at = now()
        "#,
    )
    .bind(definition.grade.to_string())
    .bind(Json(&definition.subjects))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let subject = |name: &str| SubjectDefinition {
        name: name.to_string(),
        exam_full_marks: 80.0,
        activity_full_marks: 20.0,
        scheme: GradingScheme::Numeric,
    };
    let definition = GradeDefinition {
        grade: Grade::VI,
        subjects: vec![
            subject("English"),
            subject("Math"),
            subject("Science"),
            subject("Social Studies"),
            SubjectDefinition {
                name: "Art".to_string(),
                exam_full_marks: 0.0,
                activity_full_marks: 0.0,
                scheme: GradingScheme::CategoricalOabc,
            },
        ],
    };
    upsert_grade_definition(pool, &definition).await?;

    let students = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Avery Lee",
            "1",
            [(72.0, 18.0), (65.0, 17.0), (70.0, 19.0), (61.0, 16.0)],
            "A",
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Jules Moreno",
            "2",
            [(55.0, 15.0), (18.0, 14.0), (49.0, 16.0), (52.0, 15.0)],
            "B",
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Kiara Patel",
            "3",
            [(75.0, 19.0), (58.0, 18.0), (68.0, 18.0), (66.0, 16.0)],
            "O",
        ),
    ];

    for (id, name, roll, marks, art) in students {
        let mut recorded: Vec<SubjectMark> = definition
            .subjects
            .iter()
            .zip(marks)
            .map(|(subject, (exam, activity))| SubjectMark {
                subject: subject.name.clone(),
                exam_marks: Some(exam),
                activity_marks: Some(activity),
                ..SubjectMark::default()
            })
            .collect();
        recorded.push(SubjectMark {
            subject: "Art".to_string(),
            letter: Some(art.to_string()),
            ..SubjectMark::default()
        });
        let exams = vec![Exam {
            slot: ExamSlot::Terminal1,
            marks: recorded,
            attendance: None,
            teacher_remark: None,
        }];

        sqlx::query(
            r#"
            INSERT INTO school_results.students
            (id, full_name, roll_number, grade, status, academic_performance)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (grade, roll_number) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                academic_performance = EXCLUDED.academic_performance
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(roll)
        .bind(Grade::VI.to_string())
        .bind(StudentStatus::Active.to_string())
        .bind(Json(&exams))
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn fetch_grade_definition(
    pool: &PgPool,
    grade: Grade,
) -> anyhow::Result<Option<GradeDefinition>> {
    let row = sqlx::query(
        "SELECT subjects FROM school_results.grade_definitions WHERE grade = $1",
    )
    .bind(grade.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let Json(subjects): Json<Vec<SubjectDefinition>> = row.try_get("subjects")?;
            Ok(Some(GradeDefinition { grade, subjects }))
        }
        None => Ok(None),
    }
}

pub async fn fetch_students(
    pool: &PgPool,
    grade: Grade,
    active_only: bool,
) -> anyhow::Result<Vec<Student>> {
    let mut query = String::from(
        "SELECT id, full_name, roll_number, grade, status, academic_performance \
         FROM school_results.students \
         WHERE grade = $1",
    );
    if active_only {
        query.push_str(" AND status = 'Active'");
    }
    query.push_str(" ORDER BY roll_number, full_name");

    let records = sqlx::query(&query)
        .bind(grade.to_string())
        .fetch_all(pool)
        .await?;

    records.iter().map(student_from_row).collect()
}

/// Everything the result engine needs for one grade.
pub async fn load_grade(
    pool: &PgPool,
    grade: Grade,
    active_only: bool,
) -> anyhow::Result<Roster> {
    let definition = fetch_grade_definition(pool, grade).await?;
    let students = fetch_students(pool, grade, active_only).await?;
    debug!(%grade, students = students.len(), defined = definition.is_some(), "loaded grade");
    Ok(Roster {
        grade_definitions: definition.into_iter().collect(),
        students,
    })
}

fn student_from_row(row: &PgRow) -> anyhow::Result<Student> {
    let grade: String = row.try_get("grade")?;
    let status: String = row.try_get("status")?;
    let Json(academic_performance): Json<Vec<Exam>> = row.try_get("academic_performance")?;
    let id: Uuid = row.try_get("id")?;

    Ok(Student {
        id,
        full_name: row.try_get("full_name")?,
        roll_number: row.try_get("roll_number")?,
        grade: grade
            .parse()
            .with_context(|| format!("student {id} has an unreadable grade"))?,
        status: status
            .parse()
            .with_context(|| format!("student {id} has an unreadable status"))?,
        academic_performance,
    })
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    full_name: String,
    roll_number: Option<String>,
    grade: String,
    exam: String,
    subject: String,
    marks: Option<f64>,
    exam_marks: Option<f64>,
    activity_marks: Option<f64>,
    letter: Option<String>,
}

impl CsvRow {
    /// Roll number keying the upsert. A blank one would never conflict, so
    /// each such row would create a new student.
    fn roll_number(&self, line: usize) -> anyhow::Result<&str> {
        match self.roll_number.as_deref().map(str::trim) {
            Some(roll) if !roll.is_empty() => Ok(roll),
            _ => anyhow::bail!("line {line}: missing roll number for {}", self.full_name.trim()),
        }
    }
}

/// Imports one subject mark per CSV row, creating students on first sight
/// and replacing an earlier mark for the same subject and exam.
pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut imported = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("invalid CSV row at line {line}"))?;
        let grade: Grade = row
            .grade
            .parse()
            .with_context(|| format!("line {line}: bad grade"))?;
        let slot: ExamSlot = row
            .exam
            .parse()
            .with_context(|| format!("line {line}: bad exam slot"))?;
        let roll_number = row.roll_number(line)?;

        let mut tx = pool.begin().await?;
        let record = sqlx::query(
            r#"
            INSERT INTO school_results.students (id, full_name, roll_number, grade)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (grade, roll_number) DO UPDATE
            SET full_name = EXCLUDED.full_name
            RETURNING id, academic_performance
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.full_name)
        .bind(roll_number)
        .bind(grade.to_string())
        .fetch_one(&mut *tx)
        .await?;

        let student_id: Uuid = record.try_get("id")?;
        let Json(mut exams): Json<Vec<Exam>> = record.try_get("academic_performance")?;
        let mark = SubjectMark {
            subject: row.subject.trim().to_string(),
            marks: row.marks,
            exam_marks: row.exam_marks,
            activity_marks: row.activity_marks,
            letter: row.letter.filter(|letter| !letter.trim().is_empty()),
        };
        record_mark(&mut exams, slot, mark);

        sqlx::query(
            "UPDATE school_results.students SET academic_performance = $2 WHERE id = $1",
        )
        .bind(student_id)
        .bind(Json(&exams))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        imported += 1;
    }

    info!(imported, path = %csv_path.display(), "imported marks");
    Ok(imported)
}

/// Places `mark` in the exam for `slot`, replacing a mark recorded under any
/// alias of the same subject.
fn record_mark(exams: &mut Vec<Exam>, slot: ExamSlot, mark: SubjectMark) {
    let position = match exams.iter().position(|exam| exam.slot == slot) {
        Some(position) => position,
        None => {
            exams.push(Exam {
                slot,
                marks: Vec::new(),
                attendance: None,
                teacher_remark: None,
            });
            exams.len() - 1
        }
    };
    let exam = &mut exams[position];
    match exam
        .marks
        .iter_mut()
        .find(|existing| same_subject(&existing.subject, &mark.subject))
    {
        Some(existing) => *existing = mark,
        None => exam.marks.push(mark),
    }
}
