use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod aggregate;
mod category;
mod config;
mod db;
mod engine;
mod grading;
mod models;
mod report;
mod stats;

use crate::config::WeightArgs;
use crate::db::GradeFilter;
use crate::engine::Gradebook;
use crate::models::{finite_score, GradeDocument, ScoreEntry};
use crate::stats::DEFAULT_PASS_THRESHOLD;

#[derive(Parser)]
#[command(name = "weighted-grades")]
#[command(about = "Weighted grade averages and pass rates for Group Scholar classes", long_about = None)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(flatten)]
    weights: WeightArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo grade data
    Seed,
    /// Import score rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Record a grade document for one learner and class
    Add {
        #[arg(long)]
        learner: i64,
        #[arg(long)]
        class: i64,
        /// Score as category:value, e.g. exam:88
        #[arg(long = "score", required = true)]
        scores: Vec<ScoreArg>,
    },
    /// Show a single grade document
    Show {
        #[arg(long)]
        id: String,
    },
    /// List grade documents for a learner or a class
    #[command(group(
        ArgGroup::new("scope")
            .args(["learner", "class"])
            .required(true)
            .multiple(false)
    ))]
    List {
        #[arg(long)]
        learner: Option<i64>,
        #[arg(long)]
        class: Option<i64>,
    },
    /// Weighted average for every class a learner has grades in
    Averages {
        #[arg(long)]
        learner: i64,
    },
    /// Count learners whose weighted average is above the threshold
    PassRate {
        #[arg(long, default_value_t = DEFAULT_PASS_THRESHOLD)]
        threshold: f64,
        #[arg(long)]
        class: Option<i64>,
    },
    /// Weighted average for one learner in one class
    Average {
        #[arg(long)]
        learner: i64,
        #[arg(long)]
        class: i64,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        class: Option<i64>,
        #[arg(long, default_value_t = DEFAULT_PASS_THRESHOLD)]
        threshold: f64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Debug, Clone)]
struct ScoreArg(ScoreEntry);

impl FromStr for ScoreArg {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> anyhow::Result<Self> {
        let (category, value) = raw
            .split_once(':')
            .with_context(|| format!("expected category:value, got {raw:?}"))?;
        let value: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("invalid score value in {raw:?}"))?;
        let value = finite_score(value)?;

        Ok(ScoreArg(ScoreEntry::new(category.trim(), value)))
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn load_gradebook(pool: &sqlx::PgPool, filter: GradeFilter) -> anyhow::Result<Gradebook> {
    let grades = db::fetch_grades(pool, filter).await?;
    Ok(Gradebook::ingest(
        grades.into_iter().map(|grade| grade.document),
    ))
}

/// `RUST_LOG` replaces the default filter outright, so it can lower the
/// crate's own level as well as raise it.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new("weighted_grades=info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let weights = cli.weights.weights();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            tracing::info!(inserted, path = %csv.display(), "csv import finished");
            println!("Inserted {inserted} grades from {}.", csv.display());
        }
        Commands::Add {
            learner,
            class,
            scores,
        } => {
            let document = GradeDocument {
                learner_id: Some(learner),
                class_id: Some(class),
                scores: scores.into_iter().map(|ScoreArg(entry)| entry).collect(),
                ..GradeDocument::default()
            };
            let id = db::insert_grade(&pool, &document, None)
                .await?
                .context("grade insert returned no id")?;

            if cli.json {
                print_json(&serde_json::json!({ "id": id }))?;
            } else {
                println!("Recorded grade {id}.");
            }
        }
        Commands::Show { id } => {
            let id = Uuid::parse_str(&id).context("invalid grade id format")?;
            let grade = db::fetch_grade(&pool, id).await?;

            match grade {
                Some(grade) if cli.json => print_json(&grade)?,
                Some(grade) => {
                    println!(
                        "Grade {} for learner {} in class {} ({} scores, recorded {})",
                        grade.id,
                        display_id(grade.document.learner_id),
                        display_id(grade.document.class_id),
                        grade.document.scores.len(),
                        grade.recorded_at.format("%Y-%m-%d")
                    );
                    for entry in grade.document.scores.iter() {
                        println!("- {}: {}", entry.category, entry.value);
                    }
                }
                None => println!("No grade found with id {id}."),
            }
        }
        Commands::List { learner, class } => {
            let filter = GradeFilter {
                learner_id: learner,
                class_id: class,
            };
            let grades = db::fetch_grades(&pool, filter).await?;

            if cli.json {
                print_json(&grades)?;
            } else if grades.is_empty() {
                println!("No grades found.");
            } else {
                for grade in grades.iter() {
                    println!(
                        "- {} learner {} class {}: {} scores",
                        grade.id,
                        display_id(grade.document.learner_id),
                        display_id(grade.document.class_id),
                        grade.document.scores.len()
                    );
                }
            }
        }
        Commands::Averages { learner } => {
            let book = load_gradebook(&pool, GradeFilter::learner(learner)).await?;
            let rows = book.student_class_averages(learner, &weights);

            if cli.json {
                print_json(&rows)?;
            } else if rows.is_empty() {
                println!("No grades found for learner {learner}.");
            } else {
                println!("Weighted averages for learner {learner}:");
                for row in rows.iter() {
                    println!("- class {}: {:.2}", row.class_id, row.weighted_average);
                }
            }
        }
        Commands::PassRate { threshold, class } => {
            let filter = class.map(GradeFilter::class).unwrap_or_default();
            let book = load_gradebook(&pool, filter).await?;
            let stats = book.class_pass_rate(threshold, &weights);

            if cli.json {
                print_json(&stats)?;
            } else {
                println!(
                    "{} of {} learners above {:.2} ({:.1}%)",
                    stats.passing_learners,
                    stats.total_learners,
                    threshold,
                    stats.passing_percentage * 100.0
                );
            }
        }
        Commands::Average { learner, class } => {
            let book = load_gradebook(&pool, GradeFilter::pair(learner, class)).await?;
            let average = book.weighted_average(learner, class, &weights);

            if cli.json {
                print_json(&serde_json::json!({
                    "learner_id": learner,
                    "class_id": class,
                    "weighted_average": average,
                }))?;
            } else {
                println!("Learner {learner} in class {class}: {average:.2}");
            }
        }
        Commands::Report {
            class,
            threshold,
            out,
        } => {
            let filter = class.map(GradeFilter::class).unwrap_or_default();
            let book = load_gradebook(&pool, filter).await?;
            let report =
                report::build_report(class, threshold, chrono::Utc::now(), &book, &weights);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn display_id(id: Option<i64>) -> String {
    id.map(|value| value.to_string())
        .unwrap_or_else(|| "(missing)".to_string())
}
