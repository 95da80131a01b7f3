//! Digest email assembly and dispatch.

pub mod smtp;

pub use smtp::SmtpMailer;

use crate::config::HarnessConfig;
use crate::escalation::IssueReference;
use crate::outcome::{format_duration, RunSummary};
use crate::reporting::STANDARD_OUTPUTS;
use crate::{Result, TestError};
use async_trait::async_trait;
use handlebars::Handlebars;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const TEMPLATE: &str = "digest";

#[derive(Debug, Clone, PartialEq)]
pub struct MailAttachment {
    pub filename: String,
    pub path: PathBuf,
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub struct MailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<MailAttachment>,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<()>;
}

/// A report file offered for attachment, with the label shown in the digest.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPath {
    pub path: PathBuf,
    pub label: String,
}

impl ArtifactPath {
    pub fn new(path: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
        }
    }
}

/// The standard report locations under `output_dir`, whether or not they
/// exist yet. Missing files are skipped when the digest is built.
pub fn standard_artifacts(output_dir: &Path) -> Vec<ArtifactPath> {
    STANDARD_OUTPUTS
        .iter()
        .map(|(relative, label)| ArtifactPath::new(output_dir.join(relative), *label))
        .collect()
}

#[derive(Debug, Clone)]
pub struct DigestSettings {
    pub from: String,
    pub to: Vec<String>,
    pub subject_prefix: String,
    pub environment: String,
    pub call_timeout: Duration,
    pub max_screenshots: usize,
}

#[derive(Serialize)]
struct DigestView<'a> {
    run_id: String,
    environment: &'a str,
    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
    pass_rate: u8,
    duration: String,
    issues: &'a [IssueReference],
    attachments: Vec<&'a str>,
}

pub struct NotificationDispatcher {
    transport: Arc<dyn MailTransport>,
    settings: DigestSettings,
    template_engine: Handlebars<'static>,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn MailTransport>, settings: DigestSettings) -> Result<Self> {
        let mut template_engine = Handlebars::new();
        template_engine
            .register_template_string(TEMPLATE, include_str!("../../templates/digest.hbs"))
            .map_err(|e| TestError::Notification(format!("Failed to register digest template: {}", e)))?;

        Ok(Self {
            transport,
            settings,
            template_engine,
        })
    }

    /// Builds an SMTP-backed dispatcher when mail is configured.
    pub fn from_config(config: &HarnessConfig) -> Result<Option<Self>> {
        let Some(mail) = &config.mail else {
            return Ok(None);
        };
        let mailer = SmtpMailer::new(mail, config.call_timeout())?;
        let settings = DigestSettings {
            from: mail.from.clone(),
            to: mail.to.clone(),
            subject_prefix: mail.subject_prefix.clone(),
            environment: config.environment.clone(),
            call_timeout: config.call_timeout(),
            max_screenshots: config.reports.max_screenshot_attachments,
        };
        Self::new(Arc::new(mailer), settings).map(Some)
    }

    /// Sends the digest. Never fails the run: any error is logged and
    /// reported as `false`.
    pub async fn dispatch(
        &self,
        summary: &RunSummary,
        issues: &[IssueReference],
        artifacts: &[ArtifactPath],
    ) -> bool {
        match self.try_dispatch(summary, issues, artifacts).await {
            Ok(()) => {
                info!(run_id = %summary.run_id, recipients = self.settings.to.len(), "sent report digest");
                true
            }
            Err(e) => {
                error!(run_id = %summary.run_id, error = %e, "failed to send report digest");
                false
            }
        }
    }

    async fn try_dispatch(
        &self,
        summary: &RunSummary,
        issues: &[IssueReference],
        artifacts: &[ArtifactPath],
    ) -> Result<()> {
        let message = self.build_message(summary, issues, artifacts).await?;
        let limit = self.settings.call_timeout;
        tokio::time::timeout(limit, self.transport.send(&message))
            .await
            .map_err(|_| TestError::Timeout {
                operation: "mail delivery".to_string(),
                seconds: limit.as_secs(),
            })?
    }

    pub async fn build_message(
        &self,
        summary: &RunSummary,
        issues: &[IssueReference],
        artifacts: &[ArtifactPath],
    ) -> Result<MailMessage> {
        let mut attachments = Vec::new();
        let mut labels = Vec::new();
        for artifact in artifacts {
            if let Some(attachment) = existing_attachment(&artifact.path).await {
                labels.push(artifact.label.as_str());
                attachments.push(attachment);
            }
        }

        let screenshots = summary
            .failures()
            .filter_map(|o| o.screenshot_path.as_deref());
        let mut attached_screenshots = 0;
        for path in screenshots {
            if attached_screenshots >= self.settings.max_screenshots {
                break;
            }
            if let Some(attachment) = existing_attachment(path).await {
                attachments.push(attachment);
                attached_screenshots += 1;
            }
        }

        Ok(MailMessage {
            from: self.settings.from.clone(),
            to: self.settings.to.clone(),
            subject: self.subject(summary),
            html: self.render_body(summary, issues, &labels)?,
            attachments,
        })
    }

    pub fn subject(&self, summary: &RunSummary) -> String {
        format!(
            "{} - {} ({}/{} passed)",
            self.settings.subject_prefix,
            summary.finished_at.format("%Y-%m-%d"),
            summary.passed,
            summary.total
        )
    }

    pub fn render_body(
        &self,
        summary: &RunSummary,
        issues: &[IssueReference],
        attachment_labels: &[&str],
    ) -> Result<String> {
        let view = DigestView {
            run_id: summary.run_id.to_string(),
            environment: &self.settings.environment,
            total: summary.total,
            passed: summary.passed,
            failed: summary.failed,
            skipped: summary.skipped,
            pass_rate: summary.pass_rate(),
            duration: format_duration(summary.duration_ms),
            issues,
            attachments: attachment_labels.to_vec(),
        };
        self.template_engine
            .render(TEMPLATE, &view)
            .map_err(|e| TestError::Notification(format!("Failed to render digest: {}", e)))
    }
}

/// Only regular files that exist right now are attached.
async fn existing_attachment(path: &Path) -> Option<MailAttachment> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Some(MailAttachment {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string()),
            path: path.to_path_buf(),
            content_type: content_type_for(path).to_string(),
        }),
        Ok(_) => {
            warn!(path = %path.display(), "not a regular file; skipping attachment");
            None
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "attachment missing; skipping");
            None
        }
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html",
        Some("csv") => "text/csv",
        Some("xml") => "application/xml",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}
