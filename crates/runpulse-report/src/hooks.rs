use crate::collector::ResultCollector;
use crate::outcome::TestOutcome;
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Handle given to the external test runner. Cloning is cheap; every clone
/// records into the same collector, so parallel workers can each hold one.
#[derive(Debug, Clone)]
pub struct LifecycleHooks {
    collector: Arc<ResultCollector>,
    screenshots_dir: PathBuf,
}

impl LifecycleHooks {
    pub fn new(collector: Arc<ResultCollector>, screenshots_dir: impl Into<PathBuf>) -> Self {
        Self {
            collector,
            screenshots_dir: screenshots_dir.into(),
        }
    }

    /// Called by the runner once per finished test.
    pub fn on_test_end(&self, outcome: TestOutcome) -> Result<()> {
        let name = outcome.name.clone();
        self.collector.record(outcome).inspect_err(|e| {
            warn!(test = %name, error = %e, "rejected test outcome");
        })
    }

    /// Where the runner should save the failure screenshot for `test_name`.
    pub fn screenshot_path(&self, test_name: &str) -> PathBuf {
        let stem: String = test_name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        self.screenshots_dir.join(format!("{}.png", stem))
    }

    pub fn collector(&self) -> &Arc<ResultCollector> {
        &self.collector
    }
}
