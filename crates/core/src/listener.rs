//! Step listener: records one test run as a [`TestOutcome`]
//!
//! ```text
//!  Created ──test_started──▶ Running ──run_finished──▶ Finished
//!                             │  ▲
//!                step_started │  │ step_finished / step_failed
//!                             ▼  │
//!                        (open step path)
//! ```
//!
//! The step tree is owned by the listener and addressed through a stack of
//! indices, one per open step. Events must arrive in order from a single
//! thread; each run gets its own listener.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use annalist_common::{
    DriverKind, Error, FailureDetail, Result, StepResult, Story, TestOutcome, TestStatus,
};

use crate::driver::{DriverDescriptor, ProxyFactory, WebDriver};
use crate::pages::Pages;
use crate::store::OutcomeStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Created,
    Running,
    Finished,
}

impl std::fmt::Display for ListenerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerState::Created => write!(f, "created"),
            ListenerState::Running => write!(f, "running"),
            ListenerState::Finished => write!(f, "finished"),
        }
    }
}

#[derive(Debug)]
struct OpenStep {
    index: usize,
    started: Instant,
}

pub struct StepListener {
    driver: Arc<dyn WebDriver>,
    store: OutcomeStore,
    state: ListenerState,
    outcome: Option<TestOutcome>,
    open_steps: Vec<OpenStep>,
    run_started: Option<Instant>,
    default_tags: Vec<String>,
}

impl StepListener {
    /// Listener whose driver is a lazy proxy of `kind`
    pub fn new(kind: DriverKind, output_dir: impl Into<PathBuf>, factory: &ProxyFactory) -> Self {
        Self::from_descriptor(DriverDescriptor::Declared(kind), output_dir, factory)
    }

    /// Listener that reuses the driver already held by `pages`
    pub fn with_pages(output_dir: impl Into<PathBuf>, pages: &Pages) -> Self {
        Self::bind(pages.driver(), output_dir.into())
    }

    pub fn from_descriptor(
        descriptor: DriverDescriptor,
        output_dir: impl Into<PathBuf>,
        factory: &ProxyFactory,
    ) -> Self {
        let driver: Arc<dyn WebDriver> = match descriptor {
            DriverDescriptor::Declared(kind) => factory.proxy_for(kind),
            DriverDescriptor::Instance(driver) => driver,
        };
        Self::bind(driver, output_dir.into())
    }

    fn bind(driver: Arc<dyn WebDriver>, output_dir: PathBuf) -> Self {
        Self {
            driver,
            store: OutcomeStore::new(output_dir),
            state: ListenerState::Created,
            outcome: None,
            open_steps: Vec::new(),
            run_started: None,
            default_tags: Vec::new(),
        }
    }

    /// Tags stamped on the outcome when the test starts
    pub fn with_default_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// The driver bound at construction; always the same instance
    pub fn driver(&self) -> Arc<dyn WebDriver> {
        Arc::clone(&self.driver)
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn output_dir(&self) -> &std::path::Path {
        self.store.dir()
    }

    pub fn outcome(&self) -> Option<&TestOutcome> {
        self.outcome.as_ref()
    }

    pub fn into_outcome(self) -> Option<TestOutcome> {
        self.outcome
    }

    pub fn test_started(&mut self, story: Story, title: impl Into<String>) -> Result<()> {
        if self.state != ListenerState::Created {
            return Err(Error::invalid_state(self.state, "test started"));
        }

        let mut outcome = TestOutcome::new(story, title);
        outcome.driver = Some(self.driver.name().to_string());
        for tag in &self.default_tags {
            if !outcome.has_tag(tag) {
                outcome.tags.push(tag.clone());
            }
        }
        info!("Test started: {} ({})", outcome.title, outcome.story.name);

        self.outcome = Some(outcome);
        self.run_started = Some(Instant::now());
        self.state = ListenerState::Running;
        Ok(())
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) -> Result<()> {
        let (outcome, _) = self.running("add tag")?;
        let tag = tag.into();
        if !outcome.has_tag(&tag) {
            outcome.tags.push(tag);
        }
        Ok(())
    }

    pub fn step_started(&mut self, name: impl Into<String>) -> Result<()> {
        let (outcome, open) = self.running("step started")?;

        let siblings = children_at(&mut outcome.steps, open);
        let step = StepResult::new(name).with_status(TestStatus::Running);
        debug!("Step started: {} (depth {})", step.name, open.len());
        siblings.push(step);

        open.push(OpenStep {
            index: siblings.len() - 1,
            started: Instant::now(),
        });
        Ok(())
    }

    /// Close the innermost open step with a terminal `status`.
    ///
    /// A step that holds sub-steps ends up with the dominant status of
    /// `status` and its children.
    pub fn step_finished(&mut self, status: TestStatus, detail: Option<FailureDetail>) -> Result<()> {
        if !status.is_terminal() {
            return Err(Error::invalid_state(
                self.state,
                format!("step finished with non-terminal status '{}'", status),
            ));
        }

        let (outcome, open) = self.running("step finished")?;
        let current = open
            .pop()
            .ok_or_else(|| Error::invalid_state(ListenerState::Running, "step finished with no open step"))?;

        let step = &mut children_at(&mut outcome.steps, open)[current.index];
        step.status = status.max(step.children_status());
        step.duration_ms = current.started.elapsed().as_millis() as u64;
        match detail {
            Some(detail) if step.status == TestStatus::Failure => step.failure = Some(detail),
            Some(_) => debug!("Ignoring failure detail on {} step '{}'", step.status, step.name),
            None => {}
        }

        debug!("Step finished: {} -> {} ({} ms)", step.name, step.status, step.duration_ms);
        Ok(())
    }

    pub fn step_failed(&mut self, detail: FailureDetail) -> Result<()> {
        self.step_finished(TestStatus::Failure, Some(detail))
    }

    pub fn step_ignored(&mut self) -> Result<()> {
        self.step_finished(TestStatus::Ignored, None)
    }

    pub fn step_pending(&mut self) -> Result<()> {
        self.step_finished(TestStatus::Pending, None)
    }

    pub fn step_skipped(&mut self) -> Result<()> {
        self.step_finished(TestStatus::Skipped, None)
    }

    /// Freeze the outcome and write it to the output directory.
    ///
    /// Steps still open are closed first. If writing fails the error is
    /// returned, but the listener is finished and the outcome stays readable
    /// through [`outcome`](Self::outcome).
    pub fn run_finished(&mut self) -> Result<PathBuf> {
        let elapsed_ms = self
            .run_started
            .map(|started| started.elapsed().as_millis() as u64)
            .unwrap_or_default();

        let (outcome, open) = self.running("run finished")?;
        while let Some(current) = open.pop() {
            let step = &mut children_at(&mut outcome.steps, open)[current.index];
            let derived = step.children_status();
            step.status = if derived.is_terminal() {
                derived
            } else {
                TestStatus::Skipped
            };
            step.duration_ms = current.started.elapsed().as_millis() as u64;
            warn!("Step '{}' was never finished; closing as {}", step.name, step.status);
        }
        outcome.duration_ms = elapsed_ms;
        self.state = ListenerState::Finished;

        let outcome = match self.outcome.as_ref() {
            Some(outcome) => outcome,
            None => return Err(Error::invalid_state(self.state, "run finished")),
        };
        info!(
            "Test finished: {} -> {} ({} ms)",
            outcome.title,
            outcome.status(),
            outcome.duration_ms
        );

        self.store.write(outcome).map_err(|e| {
            warn!("Could not store outcome '{}': {}", outcome.title, e);
            e
        })
    }

    fn running(&mut self, event: &str) -> Result<(&mut TestOutcome, &mut Vec<OpenStep>)> {
        if self.state != ListenerState::Running {
            return Err(Error::invalid_state(self.state, event));
        }
        match self.outcome.as_mut() {
            Some(outcome) => Ok((outcome, &mut self.open_steps)),
            None => Err(Error::invalid_state(self.state, event)),
        }
    }
}

/// Sibling list the next step at the end of `path` belongs to.
fn children_at<'a>(steps: &'a mut Vec<StepResult>, path: &[OpenStep]) -> &'a mut Vec<StepResult> {
    path.iter()
        .fold(steps, |steps, open| &mut steps[open.index].children)
}
