//! Annalist core
//!
//! Records browser-driven acceptance test runs and aggregates their outcomes:
//! - Hands each test a browser driver, proxied so nothing launches until the
//!   first command
//! - Listens to step events and builds a [`TestOutcome`] tree per run
//! - Stores one JSON artifact per outcome
//! - Merges a directory of artifacts into a [`TestOutcomes`] report model
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  StepListener (one per test run)                            │
//! │    ├── driver: Pages driver, or ProxyFactory::proxy_for()   │
//! │    ├── test_started / step_started / step_finished / ...    │
//! │    └── run_finished() -> OutcomeStore::write()              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  OutcomeAggregator                                          │
//! │    ├── load_outcomes(dir) -> TestOutcomes                   │
//! │    │     ├── corrupt artifacts -> warnings                  │
//! │    │     └── reruns -> latest start time wins               │
//! │    └── ReportGenerator::generate(outcomes, output_dir)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`TestOutcome`]: annalist_common::TestOutcome

pub mod aggregate;
pub mod driver;
pub mod listener;
pub mod pages;
pub mod report;
pub mod store;

pub use aggregate::{ArtifactWarning, OutcomeAggregator, ResultCounts, StorySummary, TestOutcomes};
pub use driver::{DriverDescriptor, DriverProvider, DriverProxy, ProxyFactory, WebDriver, WebElement};
pub use listener::{ListenerState, StepListener};
pub use pages::Pages;
pub use report::{JsonSummaryReporter, ReportGenerator};
pub use store::OutcomeStore;
