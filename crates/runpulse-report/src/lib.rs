//! Aggregation and reporting core for a hybrid UI/API/mobile/performance
//! test harness.
//!
//! Outcomes flow one way: a [`ResultCollector`] accumulates [`TestOutcome`]s
//! while the external runner executes, is finalized into a [`RunSummary`],
//! and the [`RunOrchestrator`] renders reports, escalates failures to the
//! issue tracker and dispatches a digest email.

pub mod collector;
pub mod config;
pub mod error;
pub mod escalation;
pub mod hooks;
pub mod notification;
pub mod orchestrator;
pub mod outcome;
pub mod reporting;

pub use collector::ResultCollector;
pub use config::HarnessConfig;
pub use error::{Result, TestError};
pub use escalation::{IssueEscalator, IssueReference};
pub use hooks::LifecycleHooks;
pub use notification::NotificationDispatcher;
pub use orchestrator::{RunOrchestrator, RunReport, RunStage};
pub use outcome::{RunSummary, TestOutcome, TestStatus, TestType};
