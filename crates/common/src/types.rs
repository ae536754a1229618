//! Core types for Annalist

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Browser driver capability type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    Firefox,
    Chrome,
    Webkit,
}

impl DriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Firefox => "firefox",
            DriverKind::Chrome => "chrome",
            DriverKind::Webkit => "webkit",
        }
    }
}

impl Default for DriverKind {
    fn default() -> Self {
        Self::Firefox
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DriverKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firefox" => Ok(DriverKind::Firefox),
            "chrome" | "chromium" => Ok(DriverKind::Chrome),
            "webkit" | "safari" => Ok(DriverKind::Webkit),
            other => Err(Error::Configuration(format!("Unsupported driver: {}", other))),
        }
    }
}

/// Result of a step or a whole test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    NotStarted,
    Running,
    Success,
    Failure,
    Skipped,
    Pending,
    Ignored,
}

impl TestStatus {
    /// Priority used when folding child statuses into a parent.
    fn rank(self) -> u8 {
        match self {
            TestStatus::NotStarted => 0,
            TestStatus::Running => 1,
            TestStatus::Success => 2,
            TestStatus::Ignored => 3,
            TestStatus::Skipped => 4,
            TestStatus::Pending => 5,
            TestStatus::Failure => 6,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, TestStatus::NotStarted | TestStatus::Running)
    }

    /// The dominant status of the two.
    pub fn max(self, other: TestStatus) -> TestStatus {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    /// Folds statuses by priority; `NotStarted` when there is nothing to fold.
    pub fn aggregate<I>(statuses: I) -> TestStatus
    where
        I: IntoIterator<Item = TestStatus>,
    {
        statuses
            .into_iter()
            .fold(TestStatus::NotStarted, TestStatus::max)
    }
}

impl Default for TestStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::NotStarted => write!(f, "not started"),
            TestStatus::Running => write!(f, "running"),
            TestStatus::Success => write!(f, "success"),
            TestStatus::Failure => write!(f, "failure"),
            TestStatus::Skipped => write!(f, "skipped"),
            TestStatus::Pending => write!(f, "pending"),
            TestStatus::Ignored => write!(f, "ignored"),
        }
    }
}

/// Why a step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Assertion,
    DriverProvisioning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub message: String,
    pub kind: FailureKind,
}

impl FailureDetail {
    pub fn assertion(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::Assertion,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::Error,
        }
    }
}

impl From<&Error> for FailureDetail {
    fn from(e: &Error) -> Self {
        let kind = match e {
            Error::DriverProvisioning { .. } => FailureKind::DriverProvisioning,
            _ => FailureKind::Error,
        };
        Self {
            message: e.to_string(),
            kind,
        }
    }
}

/// One step of a test run, possibly holding nested steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub status: TestStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub children: Vec<StepResult>,
    #[serde(default)]
    pub failure: Option<FailureDetail>,
}

impl StepResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::NotStarted,
            start_time: Utc::now(),
            duration_ms: 0,
            children: Vec::new(),
            failure: None,
        }
    }

    pub fn with_status(mut self, status: TestStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_child(mut self, child: StepResult) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }

    /// Status derived from the children only.
    pub fn children_status(&self) -> TestStatus {
        TestStatus::aggregate(self.children.iter().map(|c| c.status))
    }

    /// Number of steps in this subtree, including this one.
    pub fn step_count(&self) -> usize {
        1 + self.children.iter().map(StepResult::step_count).sum::<usize>()
    }

    fn first_failure(&self) -> Option<&FailureDetail> {
        if self.status != TestStatus::Failure {
            return None;
        }
        self.children
            .iter()
            .find_map(StepResult::first_failure)
            .or(self.failure.as_ref())
    }
}

/// The grouping unit a test outcome belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub name: String,
}

impl Story {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Builds a story whose display name is derived from its identifier,
    /// e.g. `search_by_keyword` becomes `Search by keyword`.
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        let words: Vec<&str> = id
            .split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
            .filter(|w| !w.is_empty())
            .collect();
        let joined = words.join(" ").to_lowercase();

        let mut chars = joined.chars();
        let name = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        Self { id, name }
    }
}

/// Record of one test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub title: String,
    pub story: Story,
    #[serde(default)]
    pub steps: Vec<StepResult>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TestOutcome {
    pub fn new(story: Story, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            story,
            steps: Vec::new(),
            start_time: Utc::now(),
            duration_ms: 0,
            driver: None,
            tags: Vec::new(),
        }
    }

    /// Overall result, folded from the top-level steps.
    pub fn status(&self) -> TestStatus {
        TestStatus::aggregate(self.steps.iter().map(|s| s.status))
    }

    pub fn step_count(&self) -> usize {
        self.steps.iter().map(StepResult::step_count).sum()
    }

    /// Detail of the first failing step, depth first.
    pub fn failure(&self) -> Option<&FailureDetail> {
        self.steps.iter().find_map(StepResult::first_failure)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Identity used to collapse reruns of the same test.
    pub fn key(&self) -> (&str, &str) {
        (&self.story.id, &self.title)
    }
}
