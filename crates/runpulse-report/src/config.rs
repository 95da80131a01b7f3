//! Harness configuration: defaults, optional TOML file, environment overlay.

use crate::{Result, TestError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Environment name shown in issue descriptions and digests
    pub environment: String,

    /// Upper bound for any single tracker or mail call
    pub call_timeout_secs: u64,

    /// Maximum number of issue-creation calls in flight
    pub escalation_concurrency: usize,

    pub reports: ReportConfig,

    pub thresholds: ScoreThresholds,

    pub tracker: Option<TrackerConfig>,

    pub mail: Option<MailConfig>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            environment: "test".to_string(),
            call_timeout_secs: 30,
            escalation_concurrency: 4,
            reports: ReportConfig::default(),
            thresholds: ScoreThresholds::default(),
            tracker: None,
            mail: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Root directory for every rendered artifact
    pub output_dir: PathBuf,

    /// Side file carrying issue references between processes
    pub issue_links_file: PathBuf,

    /// Directory scanned for Lighthouse `*.json` results
    pub lighthouse_dir: PathBuf,

    pub max_screenshot_attachments: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
            issue_links_file: PathBuf::from("reports/jira-links.json"),
            lighthouse_dir: PathBuf::from("reports/lighthouse"),
            max_screenshot_attachments: 5,
        }
    }
}

/// Cut-offs for qualitative buckets of 0-100 scores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScoreThresholds {
    pub good: u8,
    pub average: u8,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            good: 90,
            average: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QualityBucket {
    Good,
    Average,
    Poor,
}

impl QualityBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityBucket::Good => "good",
            QualityBucket::Average => "average",
            QualityBucket::Poor => "poor",
        }
    }
}

impl ScoreThresholds {
    pub fn bucket(&self, score: u8) -> QualityBucket {
        if score >= self.good {
            QualityBucket::Good
        } else if score >= self.average {
            QualityBucket::Average
        } else {
            QualityBucket::Poor
        }
    }

    /// Converts a 0-1 fraction into a rounded 0-100 score.
    pub fn to_percent(fraction: f64) -> u8 {
        (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub base_url: String,
    pub project_key: String,
    pub username: String,
    pub api_token: String,
    #[serde(default = "default_issue_type")]
    pub issue_type: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

fn default_issue_type() -> String {
    "Bug".to_string()
}

fn default_priority() -> String {
    "Medium".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub host: String,
    #[serde(default = "default_mail_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub from: String,
    pub to: Vec<String>,
    #[serde(default = "default_starttls")]
    pub starttls: bool,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

fn default_mail_port() -> u16 {
    587
}

fn default_starttls() -> bool {
    true
}

fn default_subject_prefix() -> String {
    "Test Automation Report".to_string()
}

impl HarnessConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.with_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        toml::from_str(&data).map_err(|e| {
            TestError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Overlays environment variables read through `var`.
    pub fn with_env<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(env) = var("TEST_ENV") {
            self.environment = env;
        }
        if let Some(dir) = var("REPORTS_DIR") {
            let dir = PathBuf::from(dir);
            self.reports.issue_links_file = dir.join("jira-links.json");
            self.reports.lighthouse_dir = dir.join("lighthouse");
            self.reports.output_dir = dir;
        }

        match (
            var("JIRA_BASE_URL"),
            var("JIRA_PROJECT"),
            var("JIRA_USERNAME"),
            var("JIRA_API_TOKEN"),
        ) {
            (Some(base_url), Some(project_key), Some(username), Some(api_token)) => {
                let existing = self.tracker.take();
                self.tracker = Some(TrackerConfig {
                    base_url,
                    project_key,
                    username,
                    api_token,
                    issue_type: existing
                        .as_ref()
                        .map(|t| t.issue_type.clone())
                        .unwrap_or_else(default_issue_type),
                    priority: existing
                        .as_ref()
                        .map(|t| t.priority.clone())
                        .unwrap_or_else(default_priority),
                    labels: existing.map(|t| t.labels).unwrap_or_default(),
                });
            }
            _ => {
                if let Some(tracker) = self.tracker.as_mut() {
                    if let Some(url) = var("JIRA_BASE_URL") {
                        tracker.base_url = url;
                    }
                    if let Some(token) = var("JIRA_API_TOKEN") {
                        tracker.api_token = token;
                    }
                }
            }
        }

        if let (Some(host), Some(from), Some(to)) =
            (var("EMAIL_HOST"), var("EMAIL_FROM"), var("EMAIL_TO"))
        {
            let existing = self.mail.take();
            self.mail = Some(MailConfig {
                host,
                port: var("EMAIL_PORT")
                    .and_then(|p| p.parse().ok())
                    .or(existing.as_ref().map(|m| m.port))
                    .unwrap_or_else(default_mail_port),
                username: var("EMAIL_USER"),
                password: var("EMAIL_PASS"),
                from,
                to: split_recipients(&to),
                starttls: existing.as_ref().is_none_or(|m| m.starttls),
                subject_prefix: existing
                    .map(|m| m.subject_prefix)
                    .unwrap_or_else(default_subject_prefix),
            });
        } else if let Some(mail) = self.mail.as_mut() {
            if let Some(pass) = var("EMAIL_PASS") {
                mail.password = Some(pass);
            }
        }

        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.call_timeout_secs == 0 {
            return Err(TestError::Config(
                "call_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if !(1..=16).contains(&self.escalation_concurrency) {
            return Err(TestError::Config(format!(
                "escalation_concurrency must be between 1 and 16, got {}",
                self.escalation_concurrency
            )));
        }

        let t = self.thresholds;
        if t.good > 100 || t.average >= t.good {
            return Err(TestError::Config(format!(
                "thresholds must satisfy 0 <= average < good <= 100 (average={}, good={})",
                t.average, t.good
            )));
        }

        if let Some(tracker) = &self.tracker {
            if !tracker.base_url.starts_with("http://") && !tracker.base_url.starts_with("https://")
            {
                return Err(TestError::Config(format!(
                    "tracker base_url must be an http(s) URL: {}",
                    tracker.base_url
                )));
            }
            if tracker.project_key.trim().is_empty() {
                return Err(TestError::Config(
                    "tracker project_key must not be empty".to_string(),
                ));
            }
        }

        if let Some(mail) = &self.mail {
            if mail.to.is_empty() {
                return Err(TestError::Config(
                    "mail.to must list at least one recipient".to_string(),
                ));
            }
            if mail.host.trim().is_empty() || mail.from.trim().is_empty() {
                return Err(TestError::Config(
                    "mail.host and mail.from are required".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

fn split_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
