use async_trait::async_trait;
use reqwest::{Client, header};

use crate::{
    error::{NetworkError, truncate_body},
    model::HelloPayload,
    provider::is_json_content_type,
};

use super::DataSource;

pub const HELLO_PATH: &str = "/api/hello";

/// `GET <base>/api/hello` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDataSource {
    endpoint: String,
    http: Client,
}

impl HttpDataSource {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: &str, http: Client) -> Self {
        let endpoint = format!("{}{}", base_url.trim_end_matches('/'), HELLO_PATH);
        Self { endpoint, http }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch_payload(&self) -> Result<HelloPayload, NetworkError> {
        tracing::debug!(endpoint = %self.endpoint, "Fetching primary resource");

        let res = self
            .http
            .get(&self.endpoint)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = res.status();
        let content_type = res
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = res.text().await?;

        if !status.is_success() {
            let body = truncate_body(&body);
            tracing::debug!(status = status.as_u16(), %body, "Primary resource returned an error");
            return Err(NetworkError::Status { status: status.as_u16(), body });
        }

        if !is_json_content_type(&content_type) {
            return Err(NetworkError::ContentType(content_type));
        }

        Ok(serde_json::from_str(&body)?)
    }
}
