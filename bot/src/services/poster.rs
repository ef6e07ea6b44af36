use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::Client;

/// Publishes the composed message, optionally with the chart image.
#[async_trait]
pub trait Poster: Send + Sync {
    fn name(&self) -> &'static str;

    async fn post(&self, text: &str, image: Option<&Path>) -> Result<()>;
}

/// Only writes the message to the log. Used outside production.
pub struct LogPoster;

#[async_trait]
impl Poster for LogPoster {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn post(&self, text: &str, image: Option<&Path>) -> Result<()> {
        info!("Post preview:\n{text}");
        if let Some(image) = image {
            info!("Post image: {}", image.display());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

/// Sends the post as a multipart form (`text`, optional `image`) to a webhook
/// that forwards it to the social network.
pub struct WebhookPoster {
    config: WebhookConfig,
    client: Client,
}

impl WebhookPoster {
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build webhook HTTP client")?;

        Ok(WebhookPoster { config, client })
    }

    async fn build_form(&self, text: &str, image: Option<&Path>) -> Result<Form> {
        let mut form = Form::new().text("text", text.to_string());

        if let Some(image) = image {
            let bytes = tokio::fs::read(image)
                .await
                .with_context(|| format!("Failed to read image {}", image.display()))?;
            let file_name = image
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "chart.png".to_string());
            let part = Part::bytes(bytes)
                .file_name(file_name)
                .mime_str("image/png")?;
            form = form.part("image", part);
        }

        Ok(form)
    }
}

#[async_trait]
impl Poster for WebhookPoster {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn post(&self, text: &str, image: Option<&Path>) -> Result<()> {
        let form = self.build_form(text, image).await?;

        let mut request = self.client.post(&self.config.url).multipart(form);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("Webhook request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Webhook failed: {status} - {body}"));
        }

        debug!("Webhook post accepted with status {status}");
        Ok(())
    }
}
