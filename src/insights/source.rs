//! Report download as a byte stream.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::Client;
use tokio::io::AsyncBufRead;
use tokio_util::io::StreamReader;
use tracing::debug;
use url::Url;

use crate::error::IngestError;

/// Reader handed to the ingestor.
pub type ReportReader = Pin<Box<dyn AsyncBufRead + Send>>;

/// Opens a downloadable report as a buffered stream.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn open(&self, url: &Url) -> Result<ReportReader, IngestError>;
}

/// Streams reports over HTTP without buffering the whole body.
pub struct HttpReportSource {
    client: Client,
}

impl HttpReportSource {
    pub fn new(timeout: Duration) -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| IngestError::Fetch(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReportSource for HttpReportSource {
    async fn open(&self, url: &Url) -> Result<ReportReader, IngestError> {
        debug!(host = url.host_str().unwrap_or("unknown"), "Opening report stream");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| IngestError::Fetch(err.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Fetch(format!(
                "report download returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::pin(StreamReader::new(body)))
    }
}
