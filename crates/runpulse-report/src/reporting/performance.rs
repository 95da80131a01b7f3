use super::{format_seconds, format_timestamp, Artifact, ReportRenderer};
use crate::config::ScoreThresholds;
use crate::outcome::{RunSummary, TestType};
use crate::{Result, TestError};
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const TEMPLATE: &str = "performance";

const CATEGORIES: &[(&str, &str)] = &[
    ("performance", "Performance"),
    ("accessibility", "Accessibility"),
    ("best-practices", "Best Practices"),
    ("seo", "SEO"),
    ("pwa", "PWA"),
];

const VITALS: &[(&str, &str)] = &[
    ("first-contentful-paint", "First Contentful Paint"),
    ("largest-contentful-paint", "Largest Contentful Paint"),
    ("cumulative-layout-shift", "Cumulative Layout Shift"),
    ("total-blocking-time", "Total Blocking Time"),
    ("speed-index", "Speed Index"),
    ("interactive", "Time to Interactive"),
];

/// Category scores and audit display values from one Lighthouse result.
#[derive(Debug, Clone, PartialEq)]
pub struct LighthouseReport {
    pub source: String,
    /// `(category id, 0-1 score)`; `None` when Lighthouse reported no score.
    pub scores: Vec<(String, Option<f64>)>,
    pub vitals: Vec<(String, String)>,
}

impl LighthouseReport {
    /// Accepts both the raw `lhr` document and the wrapped `{ "lhr": ... }` form.
    pub fn from_value(source: impl Into<String>, value: &Value) -> Option<Self> {
        let lhr = value.get("lhr").unwrap_or(value);
        let categories = lhr.get("categories")?.as_object()?;

        let scores = CATEGORIES
            .iter()
            .map(|(id, _)| {
                let score = categories
                    .get(*id)
                    .and_then(|c| c.get("score"))
                    .and_then(Value::as_f64);
                (id.to_string(), score)
            })
            .collect();

        let vitals = lhr
            .get("audits")
            .map(|audits| {
                VITALS
                    .iter()
                    .filter_map(|(id, _)| {
                        let display = audits.get(*id)?.get("displayValue")?.as_str()?;
                        Some((id.to_string(), display.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            source: source.into(),
            scores,
            vitals,
        })
    }
}

/// Reads every `*.json` Lighthouse result under `dir`. A missing directory
/// yields no reports; unreadable files are skipped with a warning.
pub fn load_lighthouse_dir(dir: &Path) -> Result<Vec<LighthouseReport>> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "no lighthouse results directory");
        return Ok(Vec::new());
    }

    let pattern = dir.join("*.json");
    let entries = glob::glob(&pattern.to_string_lossy())
        .map_err(|e| TestError::Config(format!("Invalid lighthouse path {}: {}", dir.display(), e)))?;

    let mut reports = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "skipping unreadable lighthouse entry");
                continue;
            }
        };
        let parsed = fs::read_to_string(&path)
            .map_err(TestError::from)
            .and_then(|data| serde_json::from_str::<Value>(&data).map_err(TestError::from));
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match parsed {
            Ok(value) => match LighthouseReport::from_value(source, &value) {
                Some(report) => reports.push(report),
                None => warn!(file = %path.display(), "no lighthouse categories in file"),
            },
            Err(e) => warn!(file = %path.display(), error = %e, "failed to read lighthouse report"),
        }
    }

    Ok(reports)
}

#[derive(Serialize)]
struct PerformanceView {
    generated_at: String,
    counts: String,
    reports: Vec<ReportView>,
    outcomes: Vec<PerfOutcomeView>,
}

#[derive(Serialize)]
struct ReportView {
    source: String,
    scores: Vec<ScoreCard>,
    vitals: Vec<VitalView>,
}

#[derive(Serialize)]
struct ScoreCard {
    title: &'static str,
    display: String,
    bucket: &'static str,
}

#[derive(Serialize)]
struct VitalView {
    title: &'static str,
    value: String,
}

#[derive(Serialize)]
struct PerfOutcomeView {
    name: String,
    status_label: &'static str,
    status_class: &'static str,
    duration: String,
    error: Option<String>,
}

/// Lighthouse score cards plus the run's performance-type tests.
pub struct PerformanceRenderer {
    template_engine: Handlebars<'static>,
    reports: Vec<LighthouseReport>,
    thresholds: ScoreThresholds,
}

impl PerformanceRenderer {
    pub fn new(reports: Vec<LighthouseReport>, thresholds: ScoreThresholds) -> Result<Self> {
        let mut template_engine = Handlebars::new();
        template_engine
            .register_template_string(TEMPLATE, include_str!("../../templates/performance.hbs"))
            .map_err(|e| {
                TestError::render("performance", format!("Failed to register template: {}", e))
            })?;

        Ok(Self {
            template_engine,
            reports,
            thresholds,
        })
    }

    fn score_card(&self, id: &str, score: Option<f64>) -> ScoreCard {
        let title = CATEGORIES
            .iter()
            .find(|(cid, _)| *cid == id)
            .map(|(_, title)| *title)
            .unwrap_or("Unknown");
        match score.map(ScoreThresholds::to_percent) {
            Some(score) => ScoreCard {
                title,
                display: score.to_string(),
                bucket: self.thresholds.bucket(score).as_str(),
            },
            None => ScoreCard {
                title,
                display: "n/a".to_string(),
                bucket: "missing",
            },
        }
    }
}

impl ReportRenderer for PerformanceRenderer {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn output_dir(&self) -> &'static str {
        "performance"
    }

    fn label(&self) -> &'static str {
        "Performance report"
    }

    fn render(&self, summary: &RunSummary) -> Result<Artifact> {
        let reports = self
            .reports
            .iter()
            .map(|r| ReportView {
                source: r.source.clone(),
                scores: r
                    .scores
                    .iter()
                    .map(|(id, score)| self.score_card(id, *score))
                    .collect(),
                vitals: r
                    .vitals
                    .iter()
                    .filter_map(|(id, value)| {
                        let (_, title) = VITALS.iter().find(|(vid, _)| *vid == id.as_str())?;
                        Some(VitalView {
                            title: *title,
                            value: value.clone(),
                        })
                    })
                    .collect(),
            })
            .collect();

        let outcomes = summary
            .outcomes
            .iter()
            .filter(|o| o.test_type == TestType::Performance)
            .map(|o| PerfOutcomeView {
                name: o.name.clone(),
                status_label: o.status.label(),
                status_class: o.status.as_str(),
                duration: format_seconds(o.duration_ms),
                error: o.error_message.clone(),
            })
            .collect();

        let view = PerformanceView {
            generated_at: format_timestamp(&summary.finished_at),
            counts: summary.counts_line(),
            reports,
            outcomes,
        };

        let content = self
            .template_engine
            .render(TEMPLATE, &view)
            .map_err(|e| TestError::render(self.name(), e))?;
        Ok(Artifact::new(content, "performance-report.html", "text/html"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::TestOutcome;
    use crate::reporting::fixtures;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> Value {
        json!({
            "lhr": {
                "categories": {
                    "performance": { "score": 0.85 },
                    "accessibility": { "score": 0.92 },
                    "best-practices": { "score": 0.4 },
                    "seo": { "score": null }
                },
                "audits": {
                    "first-contentful-paint": { "displayValue": "1.2 s" },
                    "cumulative-layout-shift": { "displayValue": "0.05" }
                }
            }
        })
    }

    #[test]
    fn test_parses_wrapped_and_bare_documents() {
        let wrapped = LighthouseReport::from_value("a.json", &sample()).unwrap();
        let bare = LighthouseReport::from_value("b.json", &sample()["lhr"]).unwrap();

        assert_eq!(wrapped.scores, bare.scores);
        assert_eq!(wrapped.scores[0], ("performance".to_string(), Some(0.85)));
        assert_eq!(wrapped.scores[3], ("seo".to_string(), None));
        assert_eq!(wrapped.vitals.len(), 2);
        assert!(LighthouseReport::from_value("c.json", &json!({"foo": 1})).is_none());
    }

    #[test]
    fn test_score_cards_are_bucketed() {
        let report = LighthouseReport::from_value("home.json", &sample()).unwrap();
        let renderer = PerformanceRenderer::new(vec![report], ScoreThresholds::default()).unwrap();
        let html = renderer.render(&fixtures::summary(Vec::new())).unwrap().content;

        assert!(html.contains(r#"<div class="score average">85</div>"#));
        assert!(html.contains(r#"<div class="score good">92</div>"#));
        assert!(html.contains(r#"<div class="score poor">40</div>"#));
        assert!(html.contains(r#"<div class="score missing">n/a</div>"#));
        assert!(html.contains("1.2 s"));
        assert!(html.contains("home.json"));
    }

    #[test]
    fn test_lists_performance_outcomes_only() {
        let summary = fixtures::summary(vec![
            TestOutcome::passed("Home page budget", 5700).with_type(TestType::Performance),
            TestOutcome::passed("Login", 2300),
        ]);
        let renderer = PerformanceRenderer::new(Vec::new(), ScoreThresholds::default()).unwrap();
        let html = renderer.render(&summary).unwrap().content;

        assert!(html.contains("Home page budget"));
        assert!(!html.contains("Login"));
        assert!(html.contains("No performance data available"));
    }

    #[test]
    fn test_load_dir_skips_bad_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("home.json"), sample().to_string()).unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let reports = load_lighthouse_dir(dir.path()).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].source, "home.json");

        assert!(load_lighthouse_dir(&dir.path().join("missing")).unwrap().is_empty());
    }
}
