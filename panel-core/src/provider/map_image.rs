use async_trait::async_trait;
use reqwest::{Client, header};

use crate::error::ImageLoadError;

use super::ImageLoadObserver;

/// Downloads the image once; loaded means a 2xx `image/*` body arrived in full.
#[derive(Debug, Clone, Default)]
pub struct HttpImageProbe {
    http: Client,
}

impl HttpImageProbe {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageLoadObserver for HttpImageProbe {
    async fn wait_loaded(&self, url: &str) -> Result<(), ImageLoadError> {
        let res = self.http.get(url).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(ImageLoadError::Status(status.as_u16()));
        }

        let content_type = res
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.to_ascii_lowercase().starts_with("image/") {
            return Err(ImageLoadError::NotAnImage(content_type));
        }

        let bytes = res.bytes().await?;
        tracing::debug!(len = bytes.len(), "Map image loaded");
        Ok(())
    }
}
