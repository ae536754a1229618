//! Report generation boundary
//!
//! Renderers receive the aggregated [`TestOutcomes`] and write whatever they
//! produce into the output directory. Only a machine-readable JSON summary
//! ships here.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use annalist_common::{Result, TestStatus};

use crate::aggregate::{ArtifactWarning, ResultCounts, StorySummary, TestOutcomes};

pub trait ReportGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Render `outcomes` into `output_dir`, returning the main file written
    fn generate(&self, outcomes: &TestOutcomes, output_dir: &Path) -> Result<PathBuf>;
}

/// Writes totals, story summaries and per-test results as one JSON file
#[derive(Debug, Clone)]
pub struct JsonSummaryReporter {
    file_name: String,
}

impl JsonSummaryReporter {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

impl Default for JsonSummaryReporter {
    fn default() -> Self {
        Self::new("summary.json")
    }
}

#[derive(Debug, Serialize)]
struct Summary<'a> {
    generated_at: DateTime<Utc>,
    successful: bool,
    #[serde(flatten)]
    counts: ResultCounts,
    percentage_passing: f64,
    step_count: usize,
    duration_ms: u64,
    stories: Vec<StorySummary>,
    tests: Vec<TestLine<'a>>,
    warnings: &'a [ArtifactWarning],
}

#[derive(Debug, Serialize)]
struct TestLine<'a> {
    story: &'a str,
    title: &'a str,
    status: TestStatus,
    start_time: DateTime<Utc>,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<&'a str>,
}

impl ReportGenerator for JsonSummaryReporter {
    fn name(&self) -> &str {
        "JSON summary"
    }

    fn generate(&self, outcomes: &TestOutcomes, output_dir: &Path) -> Result<PathBuf> {
        let summary = Summary {
            generated_at: Utc::now(),
            successful: outcomes.is_successful(),
            counts: outcomes.counts(),
            percentage_passing: outcomes.percentage_passing(),
            step_count: outcomes.step_count(),
            duration_ms: outcomes.duration_ms(),
            stories: outcomes.stories(),
            tests: outcomes
                .outcomes()
                .iter()
                .map(|o| TestLine {
                    story: &o.story.id,
                    title: &o.title,
                    status: o.status(),
                    start_time: o.start_time,
                    duration_ms: o.duration_ms,
                    failure: o.failure().map(|f| f.message.as_str()),
                })
                .collect(),
            warnings: outcomes.warnings(),
        };

        let path = output_dir.join(&self.file_name);
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annalist_common::{FailureDetail, StepResult, Story, TestOutcome};

    #[test]
    fn test_summary_contents() {
        let mut failed = TestOutcome::new(Story::from_id("login"), "bad password");
        let mut step = StepResult::new("submit").with_status(TestStatus::Failure);
        step.failure = Some(FailureDetail::assertion("error banner missing"));
        failed.steps.push(step);

        let mut passed = TestOutcome::new(Story::from_id("login"), "good password");
        passed
            .steps
            .push(StepResult::new("submit").with_status(TestStatus::Success));

        let outcomes = TestOutcomes::from_outcomes(vec![failed, passed]);
        let dir = tempfile::tempdir().unwrap();
        let path = JsonSummaryReporter::default()
            .generate(&outcomes, dir.path())
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(path.file_name().unwrap(), "summary.json");
        assert_eq!(json["total"], 2);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["successful"], false);
        assert_eq!(json["stories"][0]["story"]["name"], "Login");
        assert_eq!(json["tests"][0]["title"], "bad password");
        assert_eq!(json["tests"][0]["failure"], "error banner missing");
        assert!(json["tests"][1].get("failure").is_none());
    }
}
