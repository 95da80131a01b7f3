use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
        }
    }

    /// Uppercase marker used by the HTML and XML reports.
    pub fn label(&self) -> &'static str {
        match self {
            TestStatus::Passed => "PASSED",
            TestStatus::Failed => "FAILED",
            TestStatus::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TestType {
    #[default]
    #[serde(rename = "UI", alias = "ui")]
    Ui,
    #[serde(rename = "API", alias = "api")]
    Api,
    #[serde(rename = "Mobile", alias = "mobile")]
    Mobile,
    #[serde(rename = "Performance", alias = "performance")]
    Performance,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Ui => "UI",
            TestType::Api => "API",
            TestType::Mobile => "Mobile",
            TestType::Performance => "Performance",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one executed test case, as reported by the runner at test end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    pub name: String,
    pub status: TestStatus,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    /// Set iff `status` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    /// The collector records the path only; the file belongs to the runner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<PathBuf>,
    #[serde(default)]
    pub test_type: TestType,
    /// Free-form details such as `method`, `endpoint`, `device` or `browser`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl TestOutcome {
    fn new(name: impl Into<String>, status: TestStatus, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            status,
            duration_ms,
            feature: None,
            error_message: None,
            stack_trace: None,
            screenshot_path: None,
            test_type: TestType::default(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn passed(name: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(name, TestStatus::Passed, duration_ms)
    }

    pub fn failed(name: impl Into<String>, duration_ms: u64, error: impl Into<String>) -> Self {
        let mut outcome = Self::new(name, TestStatus::Failed, duration_ms);
        outcome.error_message = Some(error.into());
        outcome
    }

    pub fn skipped(name: impl Into<String>) -> Self {
        Self::new(name, TestStatus::Skipped, 0)
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    pub fn with_type(mut self, test_type: TestType) -> Self {
        self.test_type = test_type;
        self
    }

    pub fn with_screenshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.screenshot_path = Some(path.into());
        self
    }

    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == TestStatus::Failed
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// Aggregate over one run. Built once by [`crate::ResultCollector::finalize`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Completion order.
    pub outcomes: Vec<TestOutcome>,
}

impl RunSummary {
    /// Derives counts from `outcomes`. `finished_at` is pushed forward when
    /// needed so the run is never shorter than its longest test.
    pub fn from_outcomes(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        outcomes: Vec<TestOutcome>,
    ) -> Self {
        let count = |status: TestStatus| outcomes.iter().filter(|o| o.status == status).count();
        let passed = count(TestStatus::Passed);
        let failed = count(TestStatus::Failed);
        let skipped = count(TestStatus::Skipped);

        let longest = outcomes.iter().map(|o| o.duration_ms).max().unwrap_or(0);
        let elapsed = (finished_at - started_at).num_milliseconds().max(0) as u64;
        let duration_ms = elapsed.max(longest);
        // Durations past chrono's range pin the end to the latest instant.
        let finished_at = i64::try_from(duration_ms)
            .ok()
            .and_then(chrono::Duration::try_milliseconds)
            .and_then(|elapsed| started_at.checked_add_signed(elapsed))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            run_id,
            started_at,
            finished_at,
            duration_ms,
            total: outcomes.len(),
            passed,
            failed,
            skipped,
            outcomes,
        }
    }

    /// Share of passed tests, 0-100 rounded to the nearest integer.
    pub fn pass_rate(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.passed as f64 / self.total as f64) * 100.0).round() as u8
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    /// `total/passed/failed/skipped`, as shown in every human-facing report.
    pub fn counts_line(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.total, self.passed, self.failed, self.skipped
        )
    }
}

/// Formats milliseconds as `Hh Mm Ss`.
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    format!("{}h {}m {}s", hours, minutes % 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_outcome_json_uses_camel_case() {
        let outcome = TestOutcome::failed("Checkout", 1500, "timeout")
            .with_type(TestType::Api)
            .with_screenshot("reports/screenshots/Checkout.png");
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["durationMs"], 1500);
        assert_eq!(value["errorMessage"], "timeout");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["testType"], "API");
        assert!(value.get("feature").is_none());
    }

    #[test]
    fn test_outcome_defaults_when_deserializing() {
        let outcome: TestOutcome =
            serde_json::from_str(r#"{"name":"Login","status":"passed","durationMs":2300}"#).unwrap();
        assert_eq!(outcome.test_type, TestType::Ui);
        assert!(outcome.metadata.is_empty());
        assert_eq!(outcome.feature, None);
    }

    #[test]
    fn test_summary_duration_covers_longest_test() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let end = start + chrono::Duration::milliseconds(500);
        let summary = RunSummary::from_outcomes(
            Uuid::new_v4(),
            start,
            end,
            vec![TestOutcome::passed("slow", 4000)],
        );

        assert_eq!(summary.duration_ms, 4000);
        assert_eq!(summary.finished_at - summary.started_at, chrono::Duration::milliseconds(4000));
    }

    #[test]
    fn test_summary_saturates_on_unrepresentable_duration() {
        let start = Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap();
        for ms in [9_007_199_254_740_991, u64::MAX] {
            let summary =
                RunSummary::from_outcomes(Uuid::nil(), start, start, vec![TestOutcome::passed("Soak", ms)]);

            assert_eq!(summary.duration_ms, ms);
            assert_eq!(summary.finished_at, DateTime::<Utc>::MAX_UTC);
        }
    }

    #[test]
    fn test_pass_rate_rounds() {
        let start = Utc::now();
        let summary = RunSummary::from_outcomes(
            Uuid::new_v4(),
            start,
            start,
            vec![
                TestOutcome::passed("a", 1),
                TestOutcome::passed("b", 1),
                TestOutcome::failed("c", 1, "boom"),
            ],
        );
        assert_eq!(summary.pass_rate(), 67);
        assert_eq!(summary.counts_line(), "3/2/1/0");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0h 0m 0s");
        assert_eq!(format_duration(323_000), "0h 5m 23s");
        assert_eq!(format_duration(3_723_999), "1h 2m 3s");
    }
}
