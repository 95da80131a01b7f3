//! Report renderers. Each turns a [`RunSummary`] into one [`Artifact`]
//! without touching the filesystem; [`persist`] writes it out.

pub mod csv;
pub mod html;
pub mod json;
pub mod performance;
pub mod xml;

pub use csv::CsvRenderer;
pub use html::DashboardRenderer;
pub use json::JsonRenderer;
pub use performance::{LighthouseReport, PerformanceRenderer};
pub use xml::TestNgRenderer;

use crate::config::HarnessConfig;
use crate::outcome::RunSummary;
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub content: String,
    pub suggested_filename: String,
    pub mime_type: String,
}

impl Artifact {
    pub fn new(content: String, suggested_filename: &str, mime_type: &str) -> Self {
        Self {
            content,
            suggested_filename: suggested_filename.to_string(),
            mime_type: mime_type.to_string(),
        }
    }
}

pub trait ReportRenderer: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Directory below the report root that the artifact belongs in.
    fn output_dir(&self) -> &'static str {
        ""
    }

    /// Human-readable label used when the artifact is attached to a digest.
    fn label(&self) -> &'static str;

    fn render(&self, summary: &RunSummary) -> Result<Artifact>;
}

/// Every renderer the harness ships, configured from `config`.
pub fn standard_renderers(config: &HarnessConfig) -> Result<Vec<Box<dyn ReportRenderer>>> {
    let lighthouse = performance::load_lighthouse_dir(&config.reports.lighthouse_dir)?;

    Ok(vec![
        Box::new(DashboardRenderer::new(config.thresholds)?),
        Box::new(CsvRenderer),
        Box::new(TestNgRenderer::new()?),
        Box::new(PerformanceRenderer::new(lighthouse, config.thresholds)?),
        Box::new(JsonRenderer),
    ])
}

/// Where each standard renderer writes, relative to the report root, and the
/// label it is attached under. Used to find artifacts of an earlier run
/// without re-rendering.
pub const STANDARD_OUTPUTS: &[(&str, &str)] = &[
    ("extent-report/extent-report.html", "HTML dashboard"),
    ("extent-report/test-results.csv", "CSV export"),
    ("testng/testng-results.xml", "TestNG results"),
    ("performance/performance-report.html", "Performance report"),
    ("results.json", "JSON results"),
];

/// Relative location of a renderer's artifact under the report root.
pub fn artifact_path(root: &Path, renderer: &dyn ReportRenderer, artifact: &Artifact) -> PathBuf {
    root.join(renderer.output_dir()).join(&artifact.suggested_filename)
}

/// Writes `artifact` to `path`, creating parent directories as needed and
/// overwriting any previous run's file.
pub fn persist(artifact: &Artifact, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, artifact.content.as_bytes())?;
    Ok(())
}

pub(crate) fn format_timestamp(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub(crate) fn format_seconds(ms: u64) -> String {
    format!("{:.1}s", ms as f64 / 1000.0)
}
