use super::{Artifact, ReportRenderer};
use crate::outcome::RunSummary;
use crate::{Result, TestError};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    counts: String,
    pass_rate: u8,
    #[serde(flatten)]
    summary: &'a RunSummary,
}

/// Machine-readable export of the whole summary. The output deserializes
/// back into a [`RunSummary`], which the standalone notify step relies on.
pub struct JsonRenderer;

impl ReportRenderer for JsonRenderer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn label(&self) -> &'static str {
        "JSON results"
    }

    fn render(&self, summary: &RunSummary) -> Result<Artifact> {
        let report = JsonReport {
            counts: summary.counts_line(),
            pass_rate: summary.pass_rate(),
            summary,
        };
        let content = serde_json::to_string_pretty(&report)
            .map_err(|e| TestError::render(self.name(), format!("Failed to render JSON: {}", e)))?;
        Ok(Artifact::new(content, "results.json", "application/json"))
    }
}
