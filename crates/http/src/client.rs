//! HTTP transport implementation
//!
//! Wraps reqwest and implements the Transport trait from ut-core. Statuses are
//! returned as-is; only failures to get a response at all become errors.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};

use ut_core::traits::{
    DownloadResponse, JsonRequest, RawResponse, Transport, UploadForm, API_KEY_HEADER,
    API_TIMEOUT, SUBMIT_TIMEOUT,
};
use ut_core::{Error, Result};

const USER_AGENT: &str = concat!("ut/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    inner: Client,
}

impl HttpTransport {
    /// Create a transport with default client settings
    pub fn new() -> Result<Self> {
        let inner = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(network)?;
        Ok(Self { inner })
    }

    /// Wrap an already configured client
    pub fn with_client(inner: Client) -> Self {
        Self { inner }
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.inner
    }
}

fn network(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Network(format!("request timed out: {e}"))
    } else if e.is_connect() {
        Error::Network(format!("connection failed: {e}"))
    } else {
        Error::Network(e.to_string())
    }
}

async fn buffered(response: reqwest::Response) -> Result<RawResponse> {
    let status = response.status().as_u16();
    let body = response.bytes().await.map_err(network)?;
    Ok(RawResponse { status, body })
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, request: JsonRequest) -> Result<RawResponse> {
        let mut builder = self
            .inner
            .post(&request.url)
            .timeout(API_TIMEOUT)
            .json(&request.body);

        if let Some(key) = &request.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        let response = builder.send().await.map_err(network)?;
        tracing::debug!(url = %request.url, status = response.status().as_u16(), "API response");
        buffered(response).await
    }

    async fn post_form(&self, url: &str, form: UploadForm) -> Result<RawResponse> {
        let file = form.file;
        let part = Part::stream_with_length(Body::wrap_stream(file.body), file.length)
            .file_name(file.file_name)
            .mime_str(&file.content_type)
            .map_err(|e| Error::InvalidInput(format!("content type {}: {e}", file.content_type)))?;

        let multipart = form
            .fields
            .into_iter()
            .fold(Form::new(), |acc, (name, value)| acc.text(name, value))
            .part(file.field_name, part);

        let response = self
            .inner
            .post(url)
            .timeout(SUBMIT_TIMEOUT)
            .multipart(multipart)
            .send()
            .await
            .map_err(network)?;
        tracing::debug!(status = response.status().as_u16(), "submission response");
        buffered(response).await
    }

    async fn get(&self, url: &str) -> Result<DownloadResponse> {
        let response = self.inner.get(url).send().await.map_err(network)?;
        let status = response.status().as_u16();
        let content_length = response.content_length();
        tracing::debug!(status, ?content_length, "download response");

        Ok(DownloadResponse {
            status,
            content_length,
            body: Box::pin(response.bytes_stream().map_err(network)),
        })
    }
}
