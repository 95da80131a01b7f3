use super::{Artifact, ReportRenderer};
use crate::outcome::RunSummary;
use crate::Result;

pub const HEADER: &str = "Test Name,Status,Duration,Feature,Error";

/// One quoted row per outcome; duration is in milliseconds.
pub struct CsvRenderer;

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

impl ReportRenderer for CsvRenderer {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn output_dir(&self) -> &'static str {
        "extent-report"
    }

    fn label(&self) -> &'static str {
        "CSV export"
    }

    fn render(&self, summary: &RunSummary) -> Result<Artifact> {
        let mut content = String::with_capacity(64 * (summary.outcomes.len() + 1));
        content.push_str(HEADER);
        content.push('\n');

        for outcome in &summary.outcomes {
            let row = [
                quote(&outcome.name),
                quote(outcome.status.as_str()),
                quote(&outcome.duration_ms.to_string()),
                quote(outcome.feature.as_deref().unwrap_or("")),
                quote(outcome.error_message.as_deref().unwrap_or("")),
            ];
            content.push_str(&row.join(","));
            content.push('\n');
        }

        Ok(Artifact::new(content, "test-results.csv", "text/csv"))
    }
}
