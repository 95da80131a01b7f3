use super::{format_seconds, format_timestamp, Artifact, ReportRenderer};
use crate::config::ScoreThresholds;
use crate::outcome::RunSummary;
use crate::{Result, TestError};
use handlebars::Handlebars;
use serde::Serialize;
use std::path::Path;

const TEMPLATE: &str = "dashboard";

#[derive(Serialize)]
struct DashboardView<'a> {
    title: &'static str,
    run_id: String,
    started_at: String,
    finished_at: String,
    duration: String,
    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
    counts: String,
    pass_rate: u8,
    pass_rate_bucket: &'static str,
    outcomes: Vec<OutcomeRow<'a>>,
}

#[derive(Serialize)]
struct OutcomeRow<'a> {
    number: usize,
    name: &'a str,
    status_label: &'static str,
    status_class: &'static str,
    duration: String,
    feature: &'a str,
    test_type: &'static str,
    error: Option<&'a str>,
    screenshot: Option<String>,
}

/// Standalone HTML dashboard. All user-controlled text goes through the
/// template engine's HTML escaping.
pub struct DashboardRenderer {
    template_engine: Handlebars<'static>,
    thresholds: ScoreThresholds,
}

impl DashboardRenderer {
    pub fn new(thresholds: ScoreThresholds) -> Result<Self> {
        let mut template_engine = Handlebars::new();
        template_engine
            .register_template_string(TEMPLATE, include_str!("../../templates/dashboard.hbs"))
            .map_err(|e| TestError::render("dashboard", format!("Failed to register template: {}", e)))?;

        Ok(Self {
            template_engine,
            thresholds,
        })
    }

    fn build_view<'a>(&self, summary: &'a RunSummary) -> DashboardView<'a> {
        let pass_rate = summary.pass_rate();
        let outcomes = summary
            .outcomes
            .iter()
            .enumerate()
            .map(|(i, o)| OutcomeRow {
                number: i + 1,
                name: &o.name,
                status_label: o.status.label(),
                status_class: o.status.as_str(),
                duration: format_seconds(o.duration_ms),
                feature: o.feature.as_deref().unwrap_or("Unknown"),
                test_type: o.test_type.as_str(),
                error: o.error_message.as_deref(),
                screenshot: o.screenshot_path.as_deref().and_then(screenshot_href),
            })
            .collect();

        DashboardView {
            title: "Test Automation Report",
            run_id: summary.run_id.to_string(),
            started_at: format_timestamp(&summary.started_at),
            finished_at: format_timestamp(&summary.finished_at),
            duration: crate::outcome::format_duration(summary.duration_ms),
            total: summary.total,
            passed: summary.passed,
            failed: summary.failed,
            skipped: summary.skipped,
            counts: summary.counts_line(),
            pass_rate,
            pass_rate_bucket: self.thresholds.bucket(pass_rate).as_str(),
            outcomes,
        }
    }
}

/// Screenshot paths become links only when they are local: relative paths,
/// absolute paths, Windows drive paths or `file:` URLs. Anything else with a
/// scheme (`javascript:`, `data:`, ...) is dropped.
fn screenshot_href(path: &Path) -> Option<String> {
    let text = path.to_string_lossy();
    let Some((prefix, _)) = text.split_once(':') else {
        return Some(text.to_string());
    };
    let local = prefix.contains(['/', '\\'])
        || prefix.eq_ignore_ascii_case("file")
        || (prefix.len() == 1 && prefix.chars().all(|c| c.is_ascii_alphabetic()));
    local.then(|| text.to_string())
}

impl ReportRenderer for DashboardRenderer {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    fn output_dir(&self) -> &'static str {
        "extent-report"
    }

    fn label(&self) -> &'static str {
        "HTML dashboard"
    }

    fn render(&self, summary: &RunSummary) -> Result<Artifact> {
        let view = self.build_view(summary);
        let content = self
            .template_engine
            .render(TEMPLATE, &view)
            .map_err(|e| TestError::render(self.name(), e))?;
        Ok(Artifact::new(content, "extent-report.html", "text/html"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::TestOutcome;
    use crate::reporting::fixtures;

    fn render(summary: &RunSummary) -> String {
        DashboardRenderer::new(ScoreThresholds::default())
            .unwrap()
            .render(summary)
            .unwrap()
            .content
    }

    #[test]
    fn test_failed_row_is_marked() {
        let html = render(&fixtures::mixed());

        assert!(html.contains("Login"));
        assert!(html.contains("Checkout"));
        assert!(html.contains(r#"<span class="status status-failed">FAILED</span>"#));
        assert!(html.contains(r#"<span class="status status-passed">PASSED</span>"#));
        assert!(html.contains("timeout"));
        assert!(html.contains("3/1/1/1"));
    }

    #[test]
    fn test_untrusted_text_is_escaped() {
        let summary = fixtures::summary(vec![TestOutcome::failed(
            "<script>alert(1)</script>",
            10,
            "expected <b> & got \"x\"",
        )]);
        let html = render(&summary);

        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("expected &lt;b&gt; &amp; got &quot;x&quot;"));
    }

    #[test]
    fn test_screenshot_links_are_local_only() {
        let summary = fixtures::summary(vec![
            TestOutcome::failed("Checkout", 10, "timeout").with_screenshot("screenshots/Checkout.png"),
            TestOutcome::failed("Search", 10, "boom").with_screenshot("file:///tmp/Search.png"),
            TestOutcome::failed("Injected", 10, "boom").with_screenshot("javascript:alert(1)"),
            TestOutcome::failed("Inline", 10, "boom").with_screenshot("DATA:text/html,<b>x</b>"),
        ]);
        let html = render(&summary);

        assert!(html.contains(r#"href="screenshots/Checkout.png""#));
        assert!(html.contains(r#"href="file:///tmp/Search.png""#));
        assert!(!html.contains("javascript:"));
        assert!(!html.to_lowercase().contains("data:text/html"));
        assert_eq!(html.matches(">Screenshot</a>").count(), 2);
    }

    #[test]
    fn test_screenshot_href_accepts_drive_paths() {
        assert_eq!(
            screenshot_href(Path::new(r"C:\shots\Checkout.png")).as_deref(),
            Some(r"C:\shots\Checkout.png")
        );
        assert_eq!(screenshot_href(Path::new("vbscript:msgbox")), None);
    }

    #[test]
    fn test_empty_run_renders_placeholder() {
        let html = render(&fixtures::summary(Vec::new()));
        assert!(html.contains("No test results available"));
        assert!(html.contains("0/0/0/0"));
        assert!(html.contains("pass-rate poor"));
    }

    #[test]
    fn test_pass_rate_bucket_uses_thresholds() {
        let summary = fixtures::summary(vec![
            TestOutcome::passed("a", 1),
            TestOutcome::passed("b", 1),
            TestOutcome::failed("c", 1, "x"),
        ]);
        let lenient = DashboardRenderer::new(ScoreThresholds { good: 60, average: 30 })
            .unwrap()
            .render(&summary)
            .unwrap()
            .content;

        assert!(render(&summary).contains("pass-rate average"));
        assert!(lenient.contains("pass-rate good"));
    }
}
