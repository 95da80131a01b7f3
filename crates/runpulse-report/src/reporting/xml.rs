use super::{format_timestamp, Artifact, ReportRenderer};
use crate::outcome::RunSummary;
use crate::{Result, TestError};
use handlebars::Handlebars;
use serde::Serialize;

const TEMPLATE: &str = "testng";

#[derive(Serialize)]
struct ResultsView {
    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
    counts: String,
    suite: String,
    started_at: String,
    finished_at: String,
    duration_ms: u64,
    outcomes: Vec<MethodView>,
}

#[derive(Serialize)]
struct MethodView {
    name: String,
    status: &'static str,
    duration_ms: u64,
    feature: Option<String>,
    test_type: &'static str,
    failure: Option<FailureView>,
}

#[derive(Serialize)]
struct FailureView {
    message: String,
    trace: String,
}

/// TestNG-style results document for tools that only read that format.
pub struct TestNgRenderer {
    template_engine: Handlebars<'static>,
}

impl TestNgRenderer {
    pub fn new() -> Result<Self> {
        let mut template_engine = Handlebars::new();
        template_engine
            .register_template_string(TEMPLATE, include_str!("../../templates/testng.hbs"))
            .map_err(|e| TestError::render("testng", format!("Failed to register template: {}", e)))?;
        Ok(Self { template_engine })
    }
}

/// Drops characters that XML 1.0 cannot carry, even as references.
fn xml_text(s: &str) -> String {
    s.chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || c >= ' ')
        .collect()
}

impl ReportRenderer for TestNgRenderer {
    fn name(&self) -> &'static str {
        "testng"
    }

    fn output_dir(&self) -> &'static str {
        "testng"
    }

    fn label(&self) -> &'static str {
        "TestNG results"
    }

    fn render(&self, summary: &RunSummary) -> Result<Artifact> {
        let outcomes = summary
            .outcomes
            .iter()
            .map(|o| MethodView {
                name: xml_text(&o.name),
                status: o.status.label(),
                duration_ms: o.duration_ms,
                feature: o.feature.as_deref().map(xml_text),
                test_type: o.test_type.as_str(),
                failure: o.error_message.as_deref().filter(|_| o.is_failed()).map(|message| {
                    FailureView {
                        message: xml_text(message),
                        trace: xml_text(o.stack_trace.as_deref().unwrap_or(message)),
                    }
                }),
            })
            .collect();

        let view = ResultsView {
            total: summary.total,
            passed: summary.passed,
            failed: summary.failed,
            skipped: summary.skipped,
            counts: summary.counts_line(),
            suite: format!("Test Suite {}", summary.run_id),
            started_at: format_timestamp(&summary.started_at),
            finished_at: format_timestamp(&summary.finished_at),
            duration_ms: summary.duration_ms,
            outcomes,
        };

        let content = self
            .template_engine
            .render(TEMPLATE, &view)
            .map_err(|e| TestError::render(self.name(), e))?;
        Ok(Artifact::new(content, "testng-results.xml", "application/xml"))
    }
}
