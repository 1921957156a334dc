use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::notify::{Notice, Notifier, NotifyError};

const TITLE: &str = "Logs Export";
const COLOR_DANGER: &str = "#F35A00";
const COLOR_GOOD: &str = "#7CD197";

/// Incoming-webhook notifier rendering attachments.
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: String,
    username: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: &str, provider: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            webhook_url: webhook_url.to_string(),
            username: format!("logs-export-to-{provider}"),
        }
    }

    pub fn render(&self, notice: &Notice) -> Value {
        let (color, text, fields) = match notice {
            Notice::RunFailed { status, checkpoint } => (
                COLOR_DANGER,
                "Export run failed",
                vec![
                    field("Error", status.error.as_deref().unwrap_or("unknown"), false),
                    field("Logs processed", &status.logs_processed.to_string(), true),
                    field("Checkpoint", checkpoint.as_deref().unwrap_or("none"), true),
                ],
            ),
            Notice::RunSucceeded { status, checkpoint } => (
                COLOR_GOOD,
                "Export run finished",
                vec![
                    field("Logs processed", &status.logs_processed.to_string(), true),
                    field("Checkpoint", checkpoint.as_deref().unwrap_or("none"), true),
                    field(
                        "Duration",
                        &format!("{}ms", (status.end - status.start).num_milliseconds()),
                        true,
                    ),
                ],
            ),
            Notice::DailyReport(report) => {
                let mut fields = vec![
                    field("Runs", &report.runs.to_string(), true),
                    field("Failed runs", &report.failed_runs.to_string(), true),
                    field("Logs processed", &report.logs_processed.to_string(), true),
                    field(
                        "Checkpoint",
                        report.checkpoint.as_deref().unwrap_or("none"),
                        true,
                    ),
                ];
                if !report.errors.is_empty() {
                    fields.push(field("Errors", &report.errors.join("\n"), false));
                }
                let color = if report.failed_runs > 0 {
                    COLOR_DANGER
                } else {
                    COLOR_GOOD
                };
                (color, "Daily report", fields)
            }
        };

        json!({
            "username": self.username,
            "attachments": [{
                "color": color,
                "title": TITLE,
                "text": text,
                "fields": fields,
                "mrkdwn_in": ["text"],
            }],
        })
    }
}

fn field(title: &str, value: &str, short: bool) -> Value {
    json!({ "title": title, "value": value, "short": short })
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&self.render(notice))
            .send()
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(NotifyError::SendFailed(format!(
                "webhook returned {}",
                resp.status()
            )));
        }
        tracing::debug!(kind = notice.kind(), "Slack notification sent");
        Ok(())
    }
}
