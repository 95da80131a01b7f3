use super::{IssueReference, IssueRequest, IssueTracker};
use crate::config::TrackerConfig;
use crate::{Result, TestError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Jira REST v2 client for issue creation and attachments.
#[derive(Clone)]
pub struct JiraTracker {
    client: Client,
    base_url: String,
    project_key: String,
    username: String,
    api_token: String,
}

#[derive(Serialize)]
struct CreateIssueBody {
    fields: serde_json::Value,
}

#[derive(Deserialize)]
struct CreatedIssue {
    key: String,
}

impl JiraTracker {
    pub fn new(config: &TrackerConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TestError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_key: config.project_key.clone(),
            username: config.username.clone(),
            api_token: config.api_token.clone(),
        })
    }

    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.base_url, key)
    }

    fn create_body(&self, request: &IssueRequest) -> CreateIssueBody {
        let components: Vec<_> = request
            .components
            .iter()
            .map(|name| json!({ "name": name }))
            .collect();

        CreateIssueBody {
            fields: json!({
                "project": { "key": self.project_key },
                "summary": request.summary,
                "description": request.description,
                "issuetype": { "name": request.issue_type },
                "priority": { "name": request.priority },
                "labels": request.labels,
                "components": components,
            }),
        }
    }
}

fn tracker_error(context: &str, message: impl std::fmt::Display) -> TestError {
    TestError::escalation(context, message)
}

#[async_trait]
impl IssueTracker for JiraTracker {
    async fn create_issue(&self, request: &IssueRequest) -> Result<IssueReference> {
        let url = format!("{}/rest/api/2/issue", self.base_url);
        debug!(url = %url, summary = %request.summary, "creating jira issue");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.api_token))
            .header("Accept", "application/json")
            .json(&self.create_body(request))
            .send()
            .await
            .map_err(|e| tracker_error(&request.summary, format!("Failed to send request to Jira: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(tracker_error(
                &request.summary,
                format!("Jira API error: {} - {}", status, error_text),
            ));
        }

        let created: CreatedIssue = response
            .json()
            .await
            .map_err(|e| tracker_error(&request.summary, format!("Failed to parse Jira response: {}", e)))?;

        Ok(IssueReference {
            url: self.browse_url(&created.key),
            key: created.key,
        })
    }

    async fn attach_file(&self, issue_key: &str, path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));

        let url = format!("{}/rest/api/2/issue/{}/attachments", self.base_url, issue_key);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.api_token))
            .header("X-Atlassian-Token", "no-check")
            .multipart(form)
            .send()
            .await
            .map_err(|e| tracker_error(issue_key, format!("Failed to upload attachment: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(tracker_error(
                issue_key,
                format!("Jira attachment error: {} - {}", status, error_text),
            ));
        }

        debug!(key = %issue_key, file = %path.display(), "attached file to jira issue");
        Ok(())
    }
}
