use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod db;
mod grade;
mod models;
mod progress;
mod report;
mod result;
mod roster;
mod subjects;

use grade::Grade;
use models::{ExamSlot, GradeDefinition};
use roster::{Roster, StudentKey};

#[derive(Parser)]
#[command(name = "report-card")]
#[command(about = "Terminal results, ranks and progress reports for a school", long_about = None)]
struct Cli {
    /// Read students and grade definitions from a JSON snapshot instead of Postgres
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a sample Class VI roster
    Seed,
    /// Import subject marks from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Store grade definitions from a JSON file
    Define {
        #[arg(long)]
        json: PathBuf,
    },
    /// Write one grade's roster to a JSON snapshot
    Export {
        #[arg(long)]
        grade: Grade,
        #[arg(long, default_value = "roster.json")]
        out: PathBuf,
    },
    /// Show one student's result for an exam
    Summary {
        /// Student id or roll number
        #[arg(long)]
        student: StudentKey,
        #[arg(long)]
        grade: Grade,
        #[arg(long, default_value = "terminal1")]
        exam: ExamSlot,
        #[arg(long)]
        json: bool,
    },
    /// Rank a whole grade for an exam
    Results {
        #[arg(long)]
        grade: Grade,
        #[arg(long, default_value = "terminal1")]
        exam: ExamSlot,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown progress report covering all three terms
    Report {
        /// Student id or roll number
        #[arg(long)]
        student: StudentKey,
        #[arg(long)]
        grade: Grade,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance (or pass --snapshot)")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_roster(
    snapshot: Option<&Path>,
    grade: Grade,
    active_only: bool,
) -> anyhow::Result<Roster> {
    match snapshot {
        Some(path) => Roster::from_json_path(path),
        None => {
            let pool = connect().await?;
            db::load_grade(&pool, grade, active_only).await
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let snapshot = cli.snapshot.as_deref();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&connect().await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&connect().await?).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let imported = db::import_csv(&connect().await?, &csv).await?;
            println!("Imported {imported} marks from {}.", csv.display());
        }
        Commands::Define { json } => {
            let text = std::fs::read_to_string(&json)
                .with_context(|| format!("failed to read {}", json.display()))?;
            let definitions: Vec<GradeDefinition> = serde_json::from_str(&text)
                .with_context(|| format!("failed to parse {}", json.display()))?;
            let pool = connect().await?;
            for definition in definitions.iter() {
                db::upsert_grade_definition(&pool, definition).await?;
                info!(grade = %definition.grade, subjects = definition.subjects.len(), "stored grade definition");
            }
            println!("Stored {} grade definitions.", definitions.len());
        }
        Commands::Export { grade, out } => {
            let roster = db::load_grade(&connect().await?, grade, false).await?;
            std::fs::write(&out, serde_json::to_string_pretty(&roster)?)?;
            println!(
                "Exported {} students of {grade} to {}.",
                roster.students.len(),
                out.display()
            );
        }
        Commands::Summary {
            student,
            grade,
            exam,
            json,
        } => {
            let roster = load_roster(snapshot, grade, false).await?;
            let target = roster
                .find_student(&student, grade)
                .with_context(|| format!("no student {student} in {grade}"))?;
            let definition = roster.grade_definition(target.grade);
            let classmates = roster.active_classmates(target.grade);

            let Some(summary) =
                result::compute_term_summary(target, exam, &definition, &classmates)
            else {
                println!("No result for {} in {exam}.", target.full_name);
                return Ok(());
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{} ({}, {})", summary.student_name, target.grade, exam.label());
                println!("- {}", report::summary_line(&summary));
                if !summary.failed_subjects.is_empty() {
                    println!("- Failed: {}", summary.failed_subjects.join(", "));
                }
                println!("- Remark: {}", summary.remark);
            }
        }
        Commands::Results {
            grade,
            exam,
            json,
            out,
        } => {
            let roster = load_roster(snapshot, grade, true).await?;
            let definition = roster.grade_definition(grade);
            let summaries =
                result::compute_class_results(&definition, exam, &roster.active_classmates(grade));

            let rendered = if json {
                serde_json::to_string_pretty(&summaries)?
            } else {
                report::build_result_sheet(grade, exam, &summaries)
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    println!("Result sheet written to {}.", path.display());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::Report {
            student,
            grade,
            out,
        } => {
            let roster = load_roster(snapshot, grade, false).await?;
            let target = roster
                .find_student(&student, grade)
                .with_context(|| format!("no student {student} in {grade}"))?;
            let definition = roster.grade_definition(target.grade);
            let classmates = roster.active_classmates(target.grade);

            let progress = progress::build_progress_report(target, &definition, &classmates);
            let markdown =
                report::build_progress_report(&progress, chrono::Utc::now().date_naive());
            std::fs::write(&out, markdown)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
