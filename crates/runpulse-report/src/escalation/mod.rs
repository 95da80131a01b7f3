//! Escalation of failed outcomes to an external issue tracker.

pub mod jira;
pub mod links;

pub use jira::JiraTracker;
pub use links::IssueLinkStore;

use crate::config::{HarnessConfig, TrackerConfig};
use crate::outcome::{TestOutcome, TestType};
use crate::{Result, TestError};
use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Link to an issue created for one failed test. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueReference {
    pub key: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueRequest {
    pub summary: String,
    pub description: String,
    pub issue_type: String,
    pub priority: String,
    pub labels: Vec<String>,
    pub components: Vec<String>,
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn create_issue(&self, request: &IssueRequest) -> Result<IssueReference>;

    async fn attach_file(&self, issue_key: &str, path: &Path) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct EscalationSettings {
    pub environment: String,
    pub issue_type: String,
    pub priority: String,
    pub labels: Vec<String>,
    pub concurrency: usize,
    pub call_timeout: Duration,
}

impl EscalationSettings {
    pub fn from_config(config: &HarnessConfig, tracker: &TrackerConfig) -> Self {
        Self {
            environment: config.environment.clone(),
            issue_type: tracker.issue_type.clone(),
            priority: tracker.priority.clone(),
            labels: tracker.labels.clone(),
            concurrency: config.escalation_concurrency,
            call_timeout: config.call_timeout(),
        }
    }
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            environment: "test".to_string(),
            issue_type: "Bug".to_string(),
            priority: "Medium".to_string(),
            labels: Vec::new(),
            concurrency: 4,
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// What one escalation pass produced. `issues` keeps the order of the
/// failed outcomes regardless of which tracker call finished first.
#[derive(Debug, Default)]
pub struct EscalationReport {
    pub attempted: usize,
    pub issues: Vec<IssueReference>,
    pub failures: Vec<TestError>,
}

pub struct IssueEscalator {
    tracker: Arc<dyn IssueTracker>,
    settings: EscalationSettings,
}

impl IssueEscalator {
    pub fn new(tracker: Arc<dyn IssueTracker>, settings: EscalationSettings) -> Self {
        Self { tracker, settings }
    }

    /// Builds a Jira-backed escalator when the tracker is configured.
    pub fn from_config(config: &HarnessConfig) -> Result<Option<Self>> {
        let Some(tracker_config) = &config.tracker else {
            return Ok(None);
        };
        let tracker = JiraTracker::new(tracker_config, config.call_timeout())?;
        Ok(Some(Self::new(
            Arc::new(tracker),
            EscalationSettings::from_config(config, tracker_config),
        )))
    }

    /// Creates one issue per failed outcome. A failure for one outcome is
    /// recorded in the report and never stops the others.
    pub async fn escalate(&self, outcomes: &[TestOutcome]) -> EscalationReport {
        let failed: Vec<&TestOutcome> = outcomes.iter().filter(|o| o.is_failed()).collect();
        if failed.is_empty() {
            info!("no failed tests; nothing to escalate");
            return EscalationReport::default();
        }
        info!(count = failed.len(), "escalating failed tests");

        let mut results: Vec<(usize, Result<IssueReference>)> = stream::iter(failed.iter().enumerate())
            .map(|(index, outcome)| async move { (index, self.escalate_one(outcome).await) })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;
        results.sort_by_key(|(index, _)| *index);

        let mut report = EscalationReport {
            attempted: failed.len(),
            ..Default::default()
        };
        for (_, result) in results {
            match result {
                Ok(issue) => report.issues.push(issue),
                Err(e) => {
                    error!(error = %e, "issue escalation failed");
                    report.failures.push(e);
                }
            }
        }

        info!(
            created = report.issues.len(),
            failed = report.failures.len(),
            "escalation finished"
        );
        report
    }

    async fn escalate_one(&self, outcome: &TestOutcome) -> Result<IssueReference> {
        let request = self.issue_request(outcome);
        let issue = self
            .with_timeout("issue creation", self.tracker.create_issue(&request))
            .await
            .map_err(|e| for_test(&outcome.name, e))?;
        info!(test = %outcome.name, key = %issue.key, url = %issue.url, "created issue");

        if let Some(screenshot) = &outcome.screenshot_path {
            let attached = self
                .with_timeout("attachment upload", self.tracker.attach_file(&issue.key, screenshot))
                .await;
            if let Err(e) = attached {
                warn!(
                    test = %outcome.name,
                    key = %issue.key,
                    file = %screenshot.display(),
                    error = %e,
                    "failed to attach screenshot; keeping issue"
                );
            }
        }

        Ok(issue)
    }

    async fn with_timeout<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let limit = self.settings.call_timeout;
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| TestError::Timeout {
                operation: operation.to_string(),
                seconds: limit.as_secs(),
            })?
    }

    pub fn issue_request(&self, outcome: &TestOutcome) -> IssueRequest {
        let mut labels = vec![
            "automation-failure".to_string(),
            outcome.test_type.as_str().to_lowercase(),
        ];
        labels.extend(self.settings.labels.iter().cloned());

        IssueRequest {
            summary: format!("[AUTOMATED] Test Failure: {}", outcome.name),
            description: describe_failure(outcome, &self.settings.environment),
            issue_type: self.settings.issue_type.clone(),
            priority: self.settings.priority.clone(),
            labels,
            components: outcome.feature.iter().cloned().collect(),
        }
    }
}

fn for_test(name: &str, error: TestError) -> TestError {
    match error {
        TestError::Escalation { message, .. } => TestError::escalation(name, message),
        other => TestError::escalation(name, other),
    }
}

/// Tracker description in Jira wiki markup.
pub fn describe_failure(outcome: &TestOutcome, environment: &str) -> String {
    let or_unknown = |v: Option<&str>| v.unwrap_or("Unknown").to_string();

    format!(
        "*Test Automation Failure Report*\n\
         \n\
         *Test Details:*\n\
         • Test Name: {name}\n\
         • Feature: {feature}\n\
         • Test Type: {test_type}\n\
         • Browser: {browser}\n\
         • Environment: {environment}\n\
         • Timestamp: {timestamp}\n\
         \n\
         *Failure Information:*\n\
         • Status: {status}\n\
         • Duration: {duration}ms\n\
         • Error Message: {error}\n\
         \n\
         *Steps to Reproduce:*\n\
         {steps}\n\
         \n\
         *Expected Result:*\n\
         Test should pass without errors\n\
         \n\
         *Actual Result:*\n\
         Test failed with the error mentioned above\n\
         \n\
         *Additional Information:*\n\
         • Auto-generated: Yes\n\
         • Screenshot: {screenshot}\n\
         • OS: {os}",
        name = outcome.name,
        feature = or_unknown(outcome.feature.as_deref()),
        test_type = outcome.test_type,
        browser = outcome.meta("browser").unwrap_or("Chromium"),
        environment = environment,
        timestamp = Utc::now().to_rfc3339(),
        status = outcome.status,
        duration = outcome.duration_ms,
        error = outcome
            .error_message
            .as_deref()
            .unwrap_or("No error message available"),
        steps = reproduction_steps(outcome),
        screenshot = if outcome.screenshot_path.is_some() {
            "Attached"
        } else {
            "Not available"
        },
        os = std::env::consts::OS,
    )
}

pub fn reproduction_steps(outcome: &TestOutcome) -> String {
    let steps: Vec<String> = match outcome.test_type {
        TestType::Api => vec![
            format!(
                "Send {} request to {}",
                outcome.meta("method").unwrap_or("GET"),
                outcome.meta("endpoint").unwrap_or("API endpoint")
            ),
            "Verify response status and data".to_string(),
            "Check for expected response format".to_string(),
        ],
        TestType::Mobile => vec![
            format!(
                "Open application on mobile device ({})",
                outcome.meta("device").unwrap_or("Mobile Device")
            ),
            "Navigate to the test page".to_string(),
            "Perform the test actions".to_string(),
            "Verify expected behavior".to_string(),
        ],
        TestType::Performance => vec![
            "Navigate to the target page".to_string(),
            "Run performance analysis".to_string(),
            "Check Lighthouse scores".to_string(),
            "Verify Core Web Vitals".to_string(),
        ],
        TestType::Ui => vec![
            "Navigate to the application".to_string(),
            format!(
                "Perform the test steps as defined in: {}",
                outcome.feature.as_deref().unwrap_or("Test Suite")
            ),
            "Verify expected behavior".to_string(),
            "Check for any console errors".to_string(),
        ],
    };

    steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}", i + 1, step))
        .collect::<Vec<_>>()
        .join("\n")
}
