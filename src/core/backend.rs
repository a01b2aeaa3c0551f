use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::errors::CoreError;
use super::models::{RawRecord, RecordId, RuntimeSettings, SelectedFile};

const PDF_MIME: &str = "application/pdf";

/// The document-processing service behind the upload and history views.
#[async_trait]
pub trait ResumeBackend: Send + Sync {
    async fn upload(&self, file: &SelectedFile) -> anyhow::Result<RawRecord>;
    async fn list_resumes(&self) -> anyhow::Result<Vec<RawRecord>>;
    async fn get_resume(&self, id: &RecordId) -> anyhow::Result<RawRecord>;
}

pub struct HttpResumeBackend {
    client: Client,
    base: Url,
}

impl HttpResumeBackend {
    pub fn new(client: Client, api_base: &str) -> anyhow::Result<Self> {
        let base = parse_api_base(api_base)?;
        Ok(Self { client, base })
    }

    pub fn from_settings(settings: &RuntimeSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent("ResumeStudio/1.0")
            .timeout(Duration::from_secs(settings.request_timeout_seconds.max(1)))
            .build()
            .context("failed to build HTTP client")?;

        Self::new(client, &settings.api_base)
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| CoreError::InvalidRequest(format!("cannot build path on {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl ResumeBackend for HttpResumeBackend {
    async fn upload(&self, file: &SelectedFile) -> anyhow::Result<RawRecord> {
        let url = self.endpoint(&["upload"])?;
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(PDF_MIME)?;
        let form = Form::new().part("file", part);

        debug!(file = %file.name, bytes = file.bytes.len(), "uploading resume");
        let response = self.client.post(url).multipart(form).send().await?;
        let body = success_body(response).await?;

        serde_json::from_str::<RawRecord>(&body).context("failed to parse upload response")
    }

    async fn list_resumes(&self) -> anyhow::Result<Vec<RawRecord>> {
        let url = self.endpoint(&["resumes"])?;
        let response = self.client.get(url).send().await?;
        let body = success_body(response).await?;

        let rows = serde_json::from_str::<Vec<Value>>(&body)
            .context("failed to parse resume list response")?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match row {
                Value::Object(record) => records.push(record),
                other => warn!("skipping non-object history row: {other}"),
            }
        }

        Ok(records)
    }

    async fn get_resume(&self, id: &RecordId) -> anyhow::Result<RawRecord> {
        let url = self.endpoint(&["resumes", id.as_str()])?;
        let response = self.client.get(url).send().await?;
        let body = success_body(response).await?;

        serde_json::from_str::<RawRecord>(&body).context("failed to parse resume detail response")
    }
}

pub fn parse_api_base(api_base: &str) -> anyhow::Result<Url> {
    let trimmed = api_base.trim();
    let url = Url::parse(trimmed).with_context(|| format!("invalid API base address '{trimmed}'"))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(CoreError::InvalidRequest(format!(
            "API base must be http or https, got '{trimmed}'"
        ))
        .into());
    }

    Ok(url)
}

async fn success_body(response: Response) -> anyhow::Result<String> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(CoreError::BackendApi {
            status: status.as_u16(),
            body,
        }
        .into());
    }

    Ok(body)
}
