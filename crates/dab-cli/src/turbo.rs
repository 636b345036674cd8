//! Turbo-DA raw data submission.
//!
//! ```text
//! POST {url}/v1/submit_raw_data
//! content-type: application/octet-stream
//! x-api-key: {key}
//! ```

use std::time::Duration;

use dab_store::SecretString;
use thiserror::Error;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum TurboDaError {
    #[error("invalid Turbo-DA configuration: {0}")]
    Config(String),

    #[error("Turbo-DA request failed: {0}")]
    Transport(String),

    #[error("Turbo-DA returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct TurboDaClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: SecretString,
}

impl TurboDaClient {
    pub fn new(url: &str, api_key: SecretString) -> Result<Self, TurboDaError> {
        let base = Url::parse(url)
            .map_err(|e| TurboDaError::Config(format!("invalid URL {url:?}: {e}")))?;
        let endpoint = Url::parse(&format!(
            "{}/v1/submit_raw_data",
            base.as_str().trim_end_matches('/')
        ))
        .map_err(|e| TurboDaError::Config(e.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TurboDaError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Submit `data` and return the response body.
    pub async fn submit_raw_data(&self, data: &[u8]) -> Result<Vec<u8>, TurboDaError> {
        let resp = self
            .http
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .header("x-api-key", self.api_key.expose())
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| TurboDaError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| TurboDaError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(TurboDaError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        tracing::debug!(size = data.len(), "submitted raw data to Turbo-DA");
        Ok(body.to_vec())
    }
}
