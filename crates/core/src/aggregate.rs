//! Aggregation of stored outcomes into one report model

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use annalist_common::{Error, Result, Story, TestOutcome, TestStatus};

use crate::report::{JsonSummaryReporter, ReportGenerator};
use crate::store::OutcomeStore;

/// An artifact that was skipped during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactWarning {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome totals by result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResultCounts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    pub skipped: usize,
    pub ignored: usize,
}

impl ResultCounts {
    fn record(&mut self, status: TestStatus) {
        self.total += 1;
        match status {
            TestStatus::Success => self.passed += 1,
            TestStatus::Failure => self.failed += 1,
            TestStatus::Skipped => self.skipped += 1,
            TestStatus::Ignored => self.ignored += 1,
            // Runs that never got going have nothing implemented yet.
            TestStatus::Pending | TestStatus::NotStarted | TestStatus::Running => {
                self.pending += 1
            }
        }
    }

    pub fn get(&self, status: TestStatus) -> usize {
        match status {
            TestStatus::Success => self.passed,
            TestStatus::Failure => self.failed,
            TestStatus::Skipped => self.skipped,
            TestStatus::Ignored => self.ignored,
            TestStatus::Pending | TestStatus::NotStarted | TestStatus::Running => self.pending,
        }
    }
}

/// Per-story slice of the aggregate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorySummary {
    pub story: Story,
    #[serde(flatten)]
    pub counts: ResultCounts,
    pub duration_ms: u64,
    pub status: TestStatus,
}

/// Read-only view over a resolved set of outcomes.
///
/// Reruns of the same `(story, title)` are collapsed to one outcome before
/// anything is counted, so the counts always add up to [`total`](Self::total).
#[derive(Debug, Clone, Default)]
pub struct TestOutcomes {
    outcomes: Vec<TestOutcome>,
    counts: ResultCounts,
    warnings: Vec<ArtifactWarning>,
}

impl TestOutcomes {
    /// Resolve reruns, keeping the latest start time. On equal start times the
    /// outcome appearing later in `outcomes` wins.
    pub fn from_outcomes<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = TestOutcome>,
    {
        Self::build(outcomes, Vec::new())
    }

    fn build<I>(outcomes: I, warnings: Vec<ArtifactWarning>) -> Self
    where
        I: IntoIterator<Item = TestOutcome>,
    {
        let mut resolved: Vec<TestOutcome> = Vec::new();
        let mut index: HashMap<(String, String), usize> = HashMap::new();

        for outcome in outcomes {
            let key = (outcome.story.id.clone(), outcome.title.clone());
            match index.get(&key) {
                Some(&i) => {
                    if outcome.start_time >= resolved[i].start_time {
                        debug!("Rerun of '{}' supersedes earlier outcome", outcome.title);
                        resolved[i] = outcome;
                    }
                }
                None => {
                    index.insert(key, resolved.len());
                    resolved.push(outcome);
                }
            }
        }

        resolved.sort_by(|a, b| a.key().cmp(&b.key()));

        let mut counts = ResultCounts::default();
        for outcome in &resolved {
            counts.record(outcome.status());
        }

        Self {
            outcomes: resolved,
            counts,
            warnings,
        }
    }

    /// Outcomes ordered by story id, then title
    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.outcomes
    }

    pub fn counts(&self) -> ResultCounts {
        self.counts
    }

    pub fn total(&self) -> usize {
        self.counts.total
    }

    /// Number of outcomes in the bucket for `status`
    pub fn count(&self, status: TestStatus) -> usize {
        self.counts.get(status)
    }

    pub fn passed(&self) -> usize {
        self.counts.passed
    }

    pub fn failed(&self) -> usize {
        self.counts.failed
    }

    pub fn pending(&self) -> usize {
        self.counts.pending
    }

    pub fn skipped(&self) -> usize {
        self.counts.skipped
    }

    pub fn ignored(&self) -> usize {
        self.counts.ignored
    }

    pub fn step_count(&self) -> usize {
        self.outcomes.iter().map(TestOutcome::step_count).sum()
    }

    pub fn duration_ms(&self) -> u64 {
        self.outcomes.iter().map(|o| o.duration_ms).sum()
    }

    /// Passing means nothing failed and nothing is pending
    pub fn is_successful(&self) -> bool {
        self.counts.failed == 0 && self.counts.pending == 0
    }

    /// Dominant status over every outcome. Runs that never reached a terminal
    /// status count as pending, as in the totals.
    pub fn status(&self) -> TestStatus {
        TestStatus::aggregate(self.outcomes.iter().map(|o| match o.status() {
            TestStatus::NotStarted | TestStatus::Running => TestStatus::Pending,
            status => status,
        }))
    }

    pub fn percentage_passing(&self) -> f64 {
        if self.counts.total == 0 {
            0.0
        } else {
            self.counts.passed as f64 * 100.0 / self.counts.total as f64
        }
    }

    pub fn stories(&self) -> Vec<StorySummary> {
        let mut stories: BTreeMap<&str, StorySummary> = BTreeMap::new();
        for outcome in &self.outcomes {
            let status = outcome.status();
            let summary = stories
                .entry(outcome.story.id.as_str())
                .or_insert_with(|| StorySummary {
                    story: outcome.story.clone(),
                    counts: ResultCounts::default(),
                    duration_ms: 0,
                    status: TestStatus::NotStarted,
                });
            summary.counts.record(status);
            summary.duration_ms += outcome.duration_ms;
            summary.status = summary.status.max(status);
        }
        stories.into_values().collect()
    }

    pub fn for_story(&self, story_id: &str) -> TestOutcomes {
        self.filtered(|o| o.story.id == story_id)
    }

    pub fn with_tag(&self, tag: &str) -> TestOutcomes {
        self.filtered(|o| o.has_tag(tag))
    }

    fn filtered<F>(&self, keep: F) -> TestOutcomes
    where
        F: Fn(&TestOutcome) -> bool,
    {
        Self::build(
            self.outcomes.iter().filter(|o| keep(o)).cloned(),
            Vec::new(),
        )
    }

    pub fn warnings(&self) -> &[ArtifactWarning] {
        &self.warnings
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

/// Builds a [`TestOutcomes`] from a directory of outcome artifacts and hands
/// it to the registered report generators.
pub struct OutcomeAggregator {
    output_dir: Option<PathBuf>,
    reporters: Vec<Box<dyn ReportGenerator>>,
}

impl OutcomeAggregator {
    /// Aggregator with the JSON summary report registered
    pub fn new() -> Self {
        Self {
            output_dir: None,
            reporters: vec![Box::new(JsonSummaryReporter::default())],
        }
    }

    /// Aggregator with no report generators
    pub fn without_reporters() -> Self {
        Self {
            output_dir: None,
            reporters: Vec::new(),
        }
    }

    pub fn set_output_directory(&mut self, dir: impl Into<PathBuf>) {
        self.output_dir = Some(dir.into());
    }

    pub fn output_directory(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn add_reporter(&mut self, reporter: Box<dyn ReportGenerator>) {
        self.reporters.push(reporter);
    }

    /// Scan `source_dir`, aggregate, then run the reporters if an output
    /// directory is set.
    pub fn generate_reports_for_test_results_from(&self, source_dir: &Path) -> Result<TestOutcomes> {
        let outcomes = self.load_outcomes(source_dir)?;

        if let Some(output_dir) = &self.output_dir {
            prepare_output_dir(output_dir)?;
            for reporter in &self.reporters {
                let path = reporter.generate(&outcomes, output_dir)?;
                info!("{} report written to {}", reporter.name(), path.display());
            }
        }

        Ok(outcomes)
    }

    /// Read every artifact directly inside `source_dir`.
    ///
    /// Only a missing or unreadable directory is an error; artifacts that
    /// cannot be read are reported as warnings.
    pub fn load_outcomes(&self, source_dir: &Path) -> Result<TestOutcomes> {
        let unreadable = |source: std::io::Error| Error::AggregationIo {
            path: source_dir.to_path_buf(),
            source,
        };

        let metadata = std::fs::metadata(source_dir).map_err(unreadable)?;
        if !metadata.is_dir() {
            return Err(unreadable(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a directory",
            )));
        }
        std::fs::read_dir(source_dir).map_err(unreadable)?;

        let mut outcomes = Vec::new();
        let mut warnings = Vec::new();

        // Sorted by file name so the rerun tie-break is deterministic.
        for entry in WalkDir::new(source_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    warn!("Skipping unreadable entry {}: {}", path.display(), e);
                    warnings.push(ArtifactWarning {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() || !OutcomeStore::is_artifact(entry.path()) {
                continue;
            }

            match OutcomeStore::read(entry.path()) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!("{}", e);
                    warnings.push(ArtifactWarning {
                        path: entry.path().to_path_buf(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let read = outcomes.len();
        let aggregated = TestOutcomes::build(outcomes, warnings);
        info!(
            "Aggregated {} outcome(s) from {} artifact(s) in {} ({} warning(s))",
            aggregated.total(),
            read,
            source_dir.display(),
            aggregated.warning_count()
        );
        Ok(aggregated)
    }
}

impl Default for OutcomeAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn prepare_output_dir(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(Error::Configuration(format!(
            "Output directory {} is not a directory",
            dir.display()
        )));
    }
    std::fs::create_dir_all(dir).map_err(|e| {
        Error::Configuration(format!(
            "Cannot create output directory {}: {}",
            dir.display(),
            e
        ))
    })
}
