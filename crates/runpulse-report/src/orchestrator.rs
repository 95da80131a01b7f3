//! End-of-run pipeline: finalize, render, escalate, persist links, notify.

use crate::collector::ResultCollector;
use crate::config::HarnessConfig;
use crate::escalation::{EscalationReport, IssueEscalator, IssueLinkStore, IssueReference};
use crate::hooks::LifecycleHooks;
use crate::notification::{ArtifactPath, NotificationDispatcher};
use crate::outcome::RunSummary;
use crate::reporting::{self, ReportRenderer};
use crate::{Result, TestError};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Forward-only progress of one orchestrated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunStage {
    Collecting,
    Finalized,
    Rendered,
    Escalated,
    Notified,
    Done,
}

#[derive(Debug)]
pub struct RunReport {
    pub stage: RunStage,
    /// Every stage reached, in order.
    pub transitions: Vec<RunStage>,
    pub summary: Option<RunSummary>,
    pub finalize_error: Option<TestError>,
    pub artifacts: Vec<ArtifactPath>,
    pub render_failures: Vec<TestError>,
    /// `None` when no tracker is configured.
    pub escalation: Option<EscalationReport>,
    /// `None` when no mail transport is configured.
    pub notified: Option<bool>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            stage: RunStage::Collecting,
            transitions: vec![RunStage::Collecting],
            summary: None,
            finalize_error: None,
            artifacts: Vec::new(),
            render_failures: Vec::new(),
            escalation: None,
            notified: None,
        }
    }

    /// Reports are the primary deliverable: the run succeeded iff the
    /// summary was produced and every renderer wrote its artifact.
    pub fn succeeded(&self) -> bool {
        self.summary.is_some() && self.finalize_error.is_none() && self.render_failures.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        if self.succeeded() { 0 } else { 1 }
    }

    pub fn issues(&self) -> &[IssueReference] {
        self.escalation
            .as_ref()
            .map(|e| e.issues.as_slice())
            .unwrap_or_default()
    }
}

pub struct RunOrchestrator {
    collector: Arc<ResultCollector>,
    renderers: Vec<Box<dyn ReportRenderer>>,
    escalator: Option<IssueEscalator>,
    dispatcher: Option<NotificationDispatcher>,
    links: IssueLinkStore,
    output_dir: PathBuf,
}

impl RunOrchestrator {
    pub fn new(
        collector: Arc<ResultCollector>,
        renderers: Vec<Box<dyn ReportRenderer>>,
        output_dir: impl Into<PathBuf>,
        links: IssueLinkStore,
    ) -> Self {
        Self {
            collector,
            renderers,
            escalator: None,
            dispatcher: None,
            links,
            output_dir: output_dir.into(),
        }
    }

    pub fn with_escalator(mut self, escalator: IssueEscalator) -> Self {
        self.escalator = Some(escalator);
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: NotificationDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Wires every stage from `config`; tracker and mail stay disabled when
    /// they are not configured.
    pub fn from_config(config: &HarnessConfig, collector: Arc<ResultCollector>) -> Result<Self> {
        let renderers = reporting::standard_renderers(config)?;
        let mut orchestrator = Self::new(
            collector,
            renderers,
            &config.reports.output_dir,
            IssueLinkStore::new(&config.reports.issue_links_file),
        );
        if let Some(escalator) = IssueEscalator::from_config(config)? {
            orchestrator = orchestrator.with_escalator(escalator);
        }
        if let Some(dispatcher) = NotificationDispatcher::from_config(config)? {
            orchestrator = orchestrator.with_dispatcher(dispatcher);
        }
        Ok(orchestrator)
    }

    pub fn hooks(&self) -> LifecycleHooks {
        LifecycleHooks::new(self.collector.clone(), self.output_dir.join("screenshots"))
    }

    /// Runs every stage once, in order. Rendering, escalation and
    /// notification failures are logged and recorded in the report; they
    /// never stop later stages.
    pub async fn run(self) -> RunReport {
        let mut report = RunReport::new();

        let summary = match self.collector.finalize() {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, "failed to finalize test run");
                report.finalize_error = Some(e);
                advance(&mut report, RunStage::Done);
                return report;
            }
        };
        advance(&mut report, RunStage::Finalized);

        self.render_all(&summary, &mut report);
        advance(&mut report, RunStage::Rendered);

        if let Some(escalator) = &self.escalator {
            report.escalation = Some(escalator.escalate(&summary.outcomes).await);
        } else {
            info!("issue tracker not configured; skipping escalation");
        }
        if let Err(e) = self.links.save(report.issues()) {
            error!(path = %self.links.path().display(), error = %e, "failed to persist issue links");
        }
        advance(&mut report, RunStage::Escalated);

        if let Some(dispatcher) = &self.dispatcher {
            let sent = dispatcher
                .dispatch(&summary, report.issues(), &report.artifacts)
                .await;
            report.notified = Some(sent);
        } else {
            info!("mail transport not configured; skipping notification");
        }
        advance(&mut report, RunStage::Notified);

        report.summary = Some(summary);
        advance(&mut report, RunStage::Done);

        info!(
            artifacts = report.artifacts.len(),
            render_failures = report.render_failures.len(),
            issues = report.issues().len(),
            exit_code = report.exit_code(),
            "test run reporting complete"
        );
        report
    }

    fn render_all(&self, summary: &RunSummary, report: &mut RunReport) {
        for renderer in &self.renderers {
            let rendered = renderer.render(summary).and_then(|artifact| {
                let path = reporting::artifact_path(&self.output_dir, renderer.as_ref(), &artifact);
                reporting::persist(&artifact, &path)
                    .map_err(|e| TestError::render(renderer.name(), e))?;
                Ok(path)
            });

            match rendered {
                Ok(path) => {
                    info!(artifact = renderer.name(), path = %path.display(), "wrote report");
                    report.artifacts.push(ArtifactPath::new(path, renderer.label()));
                }
                Err(e) => {
                    error!(artifact = renderer.name(), error = %e, "report rendering failed");
                    report.render_failures.push(e);
                }
            }
        }
    }
}

fn advance(report: &mut RunReport, next: RunStage) {
    if next <= report.stage {
        warn!(from = ?report.stage, to = ?next, "ignoring backward stage transition");
        return;
    }
    report.stage = next;
    report.transitions.push(next);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::TestOutcome;
    use crate::reporting::{Artifact, CsvRenderer};
    use tempfile::TempDir;

    struct BrokenRenderer;

    impl ReportRenderer for BrokenRenderer {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn label(&self) -> &'static str {
            "Broken"
        }

        fn render(&self, _summary: &RunSummary) -> Result<Artifact> {
            Err(TestError::render("broken", "template exploded"))
        }
    }

    fn orchestrator(dir: &TempDir, renderers: Vec<Box<dyn ReportRenderer>>) -> RunOrchestrator {
        let collector = Arc::new(ResultCollector::new());
        RunOrchestrator::new(
            collector,
            renderers,
            dir.path().join("reports"),
            IssueLinkStore::new(dir.path().join("reports/jira-links.json")),
        )
    }

    #[tokio::test]
    async fn test_stages_run_in_order_without_integrations() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir, vec![Box::new(CsvRenderer)]);
        orchestrator
            .hooks()
            .on_test_end(TestOutcome::passed("Login", 2300))
            .unwrap();

        let report = orchestrator.run().await;

        assert_eq!(
            report.transitions,
            vec![
                RunStage::Collecting,
                RunStage::Finalized,
                RunStage::Rendered,
                RunStage::Escalated,
                RunStage::Notified,
                RunStage::Done,
            ]
        );
        assert_eq!(report.exit_code(), 0);
        assert!(report.notified.is_none());
        assert!(dir.path().join("reports/extent-report/test-results.csv").exists());
        assert!(dir.path().join("reports/jira-links.json").exists());
    }

    #[tokio::test]
    async fn test_render_failure_is_isolated_but_fails_run() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir, vec![Box::new(BrokenRenderer), Box::new(CsvRenderer)]);

        let report = orchestrator.run().await;

        assert_eq!(report.stage, RunStage::Done);
        assert_eq!(report.render_failures.len(), 1);
        assert_eq!(report.artifacts.len(), 1);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_backward_transition_ignored() {
        let mut report = RunReport::new();
        advance(&mut report, RunStage::Rendered);
        advance(&mut report, RunStage::Finalized);
        assert_eq!(report.stage, RunStage::Rendered);
        assert_eq!(report.transitions, vec![RunStage::Collecting, RunStage::Rendered]);
    }
}
