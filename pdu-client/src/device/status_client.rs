use std::time::Duration;

use reqwest::Url;

use crate::device::error::{ClientError, FetchError};

/// Path and query of the status document holding the outlet power sensors.
pub const STATUS_PATH: &str = "/statusjsn.js?components=16384";

/// Upper bound for one status request, connection through body.
///
/// The device serves status slowly (around 1.7s on average, 3.6s worst seen);
/// 8s keeps requests from piling up without dropping normal responses.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(8);

/// One attempt at retrieving the raw status body.
#[async_trait::async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch(&self) -> Result<String, FetchError>;
}

/// Build the status URL for a device base URL such as `http://pdu.local`.
pub fn status_url(base_url: &str) -> Result<Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason,
    };

    let base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    // The client is built without TLS; the device only speaks plain HTTP.
    if base.scheme() != "http" {
        return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
    }

    let joined = format!("{}{STATUS_PATH}", base_url.trim_end_matches('/'));
    Url::parse(&joined).map_err(|e| invalid(e.to_string()))
}

/// HTTP client for a single PDU.
#[derive(Clone)]
pub struct PduStatusClient {
    http: reqwest::Client,
    url: Url,
}

impl PduStatusClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, FETCH_TIMEOUT)
    }

    pub(crate) fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let url = status_url(base_url)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self { http, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait::async_trait]
impl StatusFetcher for PduStatusClient {
    async fn fetch(&self) -> Result<String, FetchError> {
        let response = self.http.get(self.url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, url = %self.url, "PDU returned error status");
            return Err(FetchError::from_status(status));
        }

        let body = response.text().await?;
        Ok(body.lines().next().unwrap_or("").to_string())
    }
}
