//! Aggregate Command

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::{debug, info};

use annalist_common::{AnnalistConfig, SystemEnvironmentVariables, TestStatus};
use annalist_core::{ArtifactWarning, OutcomeAggregator, ResultCounts, StorySummary, TestOutcomes};

use crate::output::{print_success, print_warning, status_label, table, OutputFormat};

#[derive(Args, Debug, Clone)]
pub struct AggregateArgs {
    /// Directory holding the outcome artifacts
    #[arg(long, env = "ANNALIST_SOURCE_DIR")]
    pub source: Option<PathBuf>,

    /// Directory the reports are written to
    #[arg(long, env = "ANNALIST_OUTPUT_DIR")]
    pub output: Option<PathBuf>,

    /// Configuration file
    #[arg(long, default_value = "annalist.toml")]
    pub config: PathBuf,

    /// Flat TOML file of properties (e.g. `"webdriver.driver" = "chrome"`)
    #[arg(long)]
    pub properties: Option<PathBuf>,

    /// Exit with status 1 unless every test passed
    #[arg(long)]
    pub strict: bool,
}

/// Source and output directories after config, properties and flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directories {
    pub source: PathBuf,
    pub output: PathBuf,
}

pub fn resolve_directories(args: &AggregateArgs, env: &SystemEnvironmentVariables) -> Result<Directories> {
    if let Some(path) = &args.properties {
        env.load_properties(path)
            .with_context(|| format!("Failed to load properties from {}", path.display()))?;
    }

    let config = AnnalistConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?
        .apply_environment(env)?;
    debug!("Effective config: {:?}", config);

    Ok(Directories {
        source: args.source.clone().unwrap_or(config.source_dir),
        output: args.output.clone().unwrap_or(config.output_dir),
    })
}

const STORY_HEADERS: [&str; 9] = [
    "Story", "Tests", "Passed", "Failed", "Pending", "Skipped", "Ignored", "Status", "Duration",
];

/// One story line of the summary
pub struct StoryDisplay {
    pub story: String,
    pub counts: ResultCounts,
    pub status: TestStatus,
    pub duration: String,
}

impl From<&StorySummary> for StoryDisplay {
    fn from(summary: &StorySummary) -> Self {
        Self {
            story: summary.story.name.clone(),
            counts: summary.counts,
            status: summary.status,
            duration: format_duration(summary.duration_ms),
        }
    }
}

impl StoryDisplay {
    fn row(&self) -> Vec<String> {
        vec![
            self.story.clone(),
            self.counts.total.to_string(),
            self.counts.passed.to_string(),
            self.counts.failed.to_string(),
            self.counts.pending.to_string(),
            self.counts.skipped.to_string(),
            self.counts.ignored.to_string(),
            status_label(self.status),
            self.duration.clone(),
        ]
    }
}

fn print_stories(rows: &[StoryDisplay], format: OutputFormat) {
    if rows.is_empty() {
        println!("No test outcomes found.");
        return;
    }

    match format {
        OutputFormat::Table | OutputFormat::Json => {
            let mut table = table(&STORY_HEADERS);
            for row in rows {
                table.add_row(row.row());
            }
            println!("{table}");
        }
        OutputFormat::Plain => {
            for (i, row) in rows.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                for (header, value) in STORY_HEADERS.iter().zip(row.row()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

#[derive(Serialize)]
struct AggregateDisplay<'a> {
    source: &'a std::path::Path,
    output: &'a std::path::Path,
    successful: bool,
    status: TestStatus,
    #[serde(flatten)]
    counts: ResultCounts,
    percentage_passing: f64,
    stories: Vec<StorySummary>,
    warnings: &'a [ArtifactWarning],
}

/// Aggregate the source directory into reports. Returns whether every test
/// passed.
pub fn execute(args: AggregateArgs, format: OutputFormat) -> Result<bool> {
    let env = SystemEnvironmentVariables::new();
    let dirs = resolve_directories(&args, &env)?;
    info!("Aggregating outcomes from {}", dirs.source.display());

    let mut aggregator = OutcomeAggregator::new();
    aggregator.set_output_directory(&dirs.output);
    let outcomes = aggregator
        .generate_reports_for_test_results_from(&dirs.source)
        .with_context(|| format!("Failed to aggregate outcomes in {}", dirs.source.display()))?;

    print_outcomes(&outcomes, &dirs, format)?;
    Ok(outcomes.is_successful())
}

fn print_outcomes(outcomes: &TestOutcomes, dirs: &Directories, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        let display = AggregateDisplay {
            source: &dirs.source,
            output: &dirs.output,
            successful: outcomes.is_successful(),
            status: outcomes.status(),
            counts: outcomes.counts(),
            percentage_passing: outcomes.percentage_passing(),
            stories: outcomes.stories(),
            warnings: outcomes.warnings(),
        };
        println!("{}", serde_json::to_string_pretty(&display)?);
        return Ok(());
    }

    let rows: Vec<StoryDisplay> = outcomes.stories().iter().map(StoryDisplay::from).collect();
    print_stories(&rows, format);

    for warning in outcomes.warnings() {
        print_warning(&format!("Skipped {}: {}", warning.path.display(), warning.reason));
    }

    let counts = outcomes.counts();
    println!(
        "{} tests, {} passed, {} failed, {} pending, {} skipped, {} ignored ({:.1}% passing)",
        counts.total,
        counts.passed,
        counts.failed,
        counts.pending,
        counts.skipped,
        counts.ignored,
        outcomes.percentage_passing()
    );
    println!("Overall: {}", status_label(outcomes.status()));
    print_success(&format!("Reports written to {}", dirs.output.display()));
    Ok(())
}

fn format_duration(ms: u64) -> String {
    if ms < 1_000 {
        format!("{}ms", ms)
    } else {
        format!("{:.1}s", ms as f64 / 1_000.0)
    }
}
