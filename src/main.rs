use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod analytics;
mod config;
mod db;
mod distribution;
mod grades;
mod logging;
mod models;
mod remote;
mod report;
mod risk;
mod stats;

use config::{AnalyticsConfig, SourceArgs, SourceKind, ThresholdArgs};
use models::{AtRiskEntry, EnrollmentSnapshot};

#[derive(Parser)]
#[command(name = "section-grade-analytics")]
#[command(about = "Grade analytics and early outreach for course sections", long_about = None)]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo section with realistic grades
    Seed,
    /// Import a section roster from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print summary statistics, distribution and at-risk students
    Analyze {
        #[arg(long)]
        section: String,
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        thresholds: ThresholdArgs,
        /// Print the full analytics snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        section: String,
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        thresholds: ThresholdArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Queue outreach messages for at-risk students
    Notify {
        #[arg(long)]
        section: String,
        /// Message template handed to the delivery service
        #[arg(long)]
        template: String,
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        thresholds: ThresholdArgs,
        /// List recipients without queuing anything
        #[arg(long)]
        dry_run: bool,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = config::database_url()?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_snapshot(
    section: &str,
    source: &SourceArgs,
) -> anyhow::Result<Option<EnrollmentSnapshot>> {
    match source.source {
        SourceKind::Db => {
            let pool = connect().await?;
            let records = db::fetch_enrollments(&pool, section)
                .await
                .with_context(|| format!("failed to fetch enrollments for {section}"))?;
            Ok(records.map(EnrollmentSnapshot::from))
        }
        SourceKind::Api => {
            let base_url = source
                .api_url
                .as_deref()
                .context("--api-url or GRADES_API_URL is required with --source api")?;
            let api = remote::EnrollmentApi::new(base_url, source.api_token.clone())?;
            api.fetch_enrollments(section)
                .await
                .with_context(|| format!("failed to fetch enrollments for {section}"))
        }
    }
}

async fn run_analytics(
    section: &str,
    source: &SourceArgs,
    thresholds: &ThresholdArgs,
) -> anyhow::Result<models::SectionAnalytics> {
    let config = AnalyticsConfig::try_from(thresholds)?;
    let snapshot = load_snapshot(section, source).await?;
    Ok(analytics::analyze(section, snapshot.as_ref(), &config))
}

// Connects only when there is someone to contact.
async fn queue_outreach(
    section: &str,
    template: &str,
    at_risk: &[AtRiskEntry],
) -> anyhow::Result<usize> {
    if at_risk.is_empty() {
        tracing::info!(section, "no at-risk students, skipping outreach");
        return Ok(0);
    }

    let pool = connect().await?;
    let queue = db::OutreachQueue::new(&pool);
    risk::notify_at_risk(&queue, section, at_risk, template).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logger(cli.verbose, cli.log_json);

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            let inserted = db::seed(&pool).await?;
            println!("Seeded {inserted} enrollments.");
        }
        Commands::Import { csv } => {
            let pool = connect().await?;
            let imported = db::import_csv(&pool, &csv).await?;
            println!("Imported {imported} enrollments from {}.", csv.display());
        }
        Commands::Analyze {
            section,
            source,
            thresholds,
            json,
        } => {
            let analytics = run_analytics(&section, &source, &thresholds).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&analytics)?);
                return Ok(());
            }

            if !analytics.data_available {
                println!("No enrollment data available for {section}.");
                return Ok(());
            }

            println!("Section {section}:");
            for line in report::summary_lines(&analytics) {
                println!("- {line}");
            }
            println!("Distribution:");
            for bucket in &analytics.distribution {
                println!(
                    "  {:<3} {:>3} ({}%)",
                    bucket.label, bucket.count, bucket.percentage
                );
            }
            if analytics.at_risk.is_empty() {
                println!("No students below {}.", analytics.risk_threshold);
            } else {
                println!("At risk (below {}):", analytics.risk_threshold);
                for entry in &analytics.at_risk {
                    println!(
                        "- {} ({}) grade {:.1}",
                        entry.display_name, entry.student_id, entry.grade
                    );
                }
            }
        }
        Commands::Report {
            section,
            source,
            thresholds,
            out,
        } => {
            let analytics = run_analytics(&section, &source, &thresholds).await?;
            let report = report::build_report(&analytics);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Notify {
            section,
            template,
            source,
            thresholds,
            dry_run,
        } => {
            let analytics = run_analytics(&section, &source, &thresholds).await?;

            if dry_run {
                println!(
                    "{} students below {} would be contacted:",
                    analytics.at_risk.len(),
                    analytics.risk_threshold
                );
                for entry in &analytics.at_risk {
                    println!("- {} ({})", entry.display_name, entry.student_id);
                }
                return Ok(());
            }

            let queued = queue_outreach(&section, &template, &analytics.at_risk).await?;
            println!("Queued {queued} outreach messages for {section}.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_outreach_does_not_need_a_database() {
        let queued = queue_outreach("SEC-101", "Please book office hours", &[])
            .await
            .unwrap();
        assert_eq!(queued, 0);
    }

    #[test]
    fn notify_accepts_api_source_without_database_flags() {
        let cli = Cli::try_parse_from([
            "section-grade-analytics",
            "notify",
            "--section",
            "SEC-101",
            "--template",
            "hello",
            "--source",
            "api",
            "--api-url",
            "http://localhost:9000",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Notify { .. }));
    }
}
