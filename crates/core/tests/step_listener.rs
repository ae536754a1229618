//! Step listener tests
//!
//! Drives listeners through whole runs with a fake driver provider that
//! counts how many browsers it was asked to launch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use annalist_common::{
    DriverKind, Error, FailureDetail, FailureKind, Result, Story, TestStatus,
};
use annalist_core::{
    DriverDescriptor, DriverProvider, ListenerState, OutcomeAggregator, OutcomeStore, Pages,
    ProxyFactory, StepListener, WebDriver, WebElement,
};

struct FakeDriver {
    name: String,
}

#[async_trait]
impl WebDriver for FakeDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn navigate(&self, _url: &str) -> Result<()> {
        Ok(())
    }

    async fn find_element(&self, selector: &str) -> Result<WebElement> {
        Ok(WebElement {
            selector: selector.to_string(),
            text: Some("found".to_string()),
        })
    }

    async fn current_url(&self) -> Result<Option<String>> {
        Ok(None)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct CountingProvider {
    created: AtomicUsize,
    broken: bool,
}

#[async_trait]
impl DriverProvider for CountingProvider {
    async fn create(&self, kind: DriverKind) -> Result<Box<dyn WebDriver>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            return Err(Error::DriverProvisioning {
                driver: kind.to_string(),
                reason: "browser binary missing".to_string(),
            });
        }
        Ok(Box::new(FakeDriver {
            name: kind.to_string(),
        }))
    }
}

fn fake_driver(name: &str) -> Arc<dyn WebDriver> {
    Arc::new(FakeDriver {
        name: name.to_string(),
    })
}

fn run(listener: &mut StepListener, steps: &[(&str, TestStatus)]) {
    for (name, status) in steps {
        listener.step_started(*name).unwrap();
        listener.step_finished(*status, None).unwrap();
    }
}

#[test]
fn test_creates_proxy_for_declared_driver() {
    let provider = Arc::new(CountingProvider::default());
    let factory = ProxyFactory::new(provider.clone());

    let listener = StepListener::new(DriverKind::Firefox, "target/unused", &factory);

    assert_eq!(factory.last_requested(), Some(DriverKind::Firefox));
    assert_eq!(listener.driver().name(), "firefox");
    assert_eq!(provider.created.load(Ordering::SeqCst), 0);
}

#[test]
fn test_uses_the_driver_from_the_pages_object() {
    let pages = Pages::new(fake_driver("supplied"));
    let listener = StepListener::with_pages("target/unused", &pages);

    assert!(Arc::ptr_eq(&listener.driver(), &pages.driver()));
    assert_eq!(listener.driver().name(), "supplied");
}

#[test]
fn test_supplied_instance_bypasses_the_factory() {
    let factory = ProxyFactory::new(Arc::new(CountingProvider::default()));
    let driver = fake_driver("configured");

    let listener = StepListener::from_descriptor(
        DriverDescriptor::Instance(driver.clone()),
        "target/unused",
        &factory,
    );

    assert!(Arc::ptr_eq(&listener.driver(), &driver));
    assert_eq!(factory.requested_count(), 0);
}

#[tokio::test]
async fn test_driver_is_created_once_on_first_command() {
    let provider = Arc::new(CountingProvider::default());
    let factory = ProxyFactory::new(provider.clone());
    let listener = StepListener::new(DriverKind::Chrome, "target/unused", &factory);

    let driver = listener.driver();
    driver.navigate("http://localhost:8080").await.unwrap();
    let element = listener.driver().find_element("#results").await.unwrap();

    assert_eq!(element.text.as_deref(), Some("found"));
    assert_eq!(provider.created.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pages_start_opens_the_base_url() {
    let provider = Arc::new(CountingProvider::default());
    let factory = ProxyFactory::new(provider.clone());
    let pages = Pages::new(factory.proxy_for(DriverKind::Webkit))
        .with_default_base_url("http://localhost:8080");
    assert_eq!(provider.created.load(Ordering::SeqCst), 0);

    pages.start().await.unwrap();
    assert_eq!(provider.created.load(Ordering::SeqCst), 1);
    assert_eq!(pages.default_base_url(), Some("http://localhost:8080"));
}

#[tokio::test]
async fn test_failed_browser_launch_is_reported_as_provisioning_failure() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(CountingProvider {
        broken: true,
        ..Default::default()
    });
    let factory = ProxyFactory::new(provider);
    let mut listener = StepListener::new(DriverKind::Firefox, dir.path(), &factory);

    listener
        .test_started(Story::from_id("search"), "opens home page")
        .unwrap();
    listener.step_started("open home page").unwrap();
    let err = listener
        .driver()
        .navigate("http://localhost")
        .await
        .unwrap_err();
    listener.step_failed(FailureDetail::from(&err)).unwrap();
    listener.run_finished().unwrap();

    let outcome = listener.outcome().unwrap();
    assert_eq!(outcome.status(), TestStatus::Failure);
    assert_eq!(outcome.failure().unwrap().kind, FailureKind::DriverProvisioning);
}

#[test]
fn test_failure_dominates_the_run() {
    let dir = TempDir::new().unwrap();
    let factory = ProxyFactory::new(Arc::new(CountingProvider::default()));

    let mut failing = StepListener::new(DriverKind::Firefox, dir.path(), &factory);
    failing.test_started(Story::from_id("login"), "rejects").unwrap();
    run(&mut failing, &[("A", TestStatus::Success), ("B", TestStatus::Failure)]);
    failing.run_finished().unwrap();

    let mut passing = StepListener::new(DriverKind::Firefox, dir.path(), &factory);
    passing.test_started(Story::from_id("login"), "accepts").unwrap();
    run(&mut passing, &[("A", TestStatus::Success), ("B", TestStatus::Success)]);
    passing.run_finished().unwrap();

    assert_eq!(failing.outcome().unwrap().status(), TestStatus::Failure);
    assert_eq!(passing.outcome().unwrap().status(), TestStatus::Success);
}

#[test]
fn test_events_after_run_finished_are_rejected() {
    let dir = TempDir::new().unwrap();
    let factory = ProxyFactory::new(Arc::new(CountingProvider::default()));
    let mut listener = StepListener::new(DriverKind::Firefox, dir.path(), &factory);
    listener.test_started(Story::from_id("login"), "works").unwrap();
    run(&mut listener, &[("A", TestStatus::Success)]);
    listener.run_finished().unwrap();
    assert_eq!(listener.state(), ListenerState::Finished);

    let results = [
        listener.step_started("late"),
        listener.step_finished(TestStatus::Success, None),
        listener.step_failed(FailureDetail::error("late")),
        listener.step_ignored(),
        listener.add_tag("late"),
        listener.run_finished().map(|_| ()),
    ];
    for result in results {
        assert!(matches!(result, Err(Error::InvalidState { .. })));
    }

    // The frozen outcome is untouched.
    assert_eq!(listener.outcome().unwrap().steps.len(), 1);
}

#[test]
fn test_storage_failure_keeps_the_outcome() {
    let dir = TempDir::new().unwrap();
    let blocked = dir.path().join("not-a-dir");
    std::fs::write(&blocked, "file in the way").unwrap();

    let factory = ProxyFactory::new(Arc::new(CountingProvider::default()));
    let mut listener = StepListener::new(DriverKind::Firefox, &blocked, &factory);
    listener.test_started(Story::from_id("login"), "works").unwrap();
    run(&mut listener, &[("A", TestStatus::Success)]);

    assert!(listener.run_finished().is_err());
    assert_eq!(listener.state(), ListenerState::Finished);
    let outcome = listener.outcome().unwrap();
    assert_eq!(outcome.status(), TestStatus::Success);
    assert_eq!(outcome.steps[0].name, "A");
}

#[test]
fn test_finished_runs_are_aggregated() {
    let dir = TempDir::new().unwrap();
    let factory = ProxyFactory::new(Arc::new(CountingProvider::default()));

    for (title, status) in [("one", TestStatus::Success), ("two", TestStatus::Pending)] {
        let mut listener = StepListener::new(DriverKind::Firefox, dir.path(), &factory);
        listener.test_started(Story::from_id("checkout"), title).unwrap();
        listener.add_tag("smoke").unwrap();
        run(&mut listener, &[("pay", status)]);
        let path = listener.run_finished().unwrap();
        assert!(OutcomeStore::is_artifact(&path));
    }

    let outcomes = OutcomeAggregator::without_reporters()
        .generate_reports_for_test_results_from(dir.path())
        .unwrap();
    assert_eq!(outcomes.total(), 2);
    assert_eq!(outcomes.passed(), 1);
    assert_eq!(outcomes.pending(), 1);
    assert!(!outcomes.is_successful());
    assert_eq!(outcomes.with_tag("smoke").total(), 2);
    assert_eq!(outcomes.outcomes()[0].driver.as_deref(), Some("firefox"));
}
