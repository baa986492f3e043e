use std::time::Duration;

use crate::{FailureKind, FetchFailure};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// A fetched page body plus the header metadata the decoder needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Transport seam. Tests substitute scripted implementations; production
/// uses [`ReqwestFetcher`].
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchFailure>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self, url: &str) -> Result<reqwest::Client, FetchFailure> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| FetchFailure::new(url, FailureKind::Network, err.to_string()))
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchFailure> {
        let parsed = url::Url::parse(url)
            .map_err(|err| FetchFailure::new(url, FailureKind::Network, err.to_string()))?;
        let client = self.build_client(url)?;

        let response = client
            .get(parsed)
            .send()
            .await
            .map_err(|err| FetchFailure::new(url, FailureKind::Network, err.to_string()))?;

        // is_success covers exactly the inclusive 200..=299 range. A bad
        // status is terminal for this URL; the body is dropped unread,
        // which releases the connection.
        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::new(
                url,
                FailureKind::BadStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|err| FetchFailure::new(url, FailureKind::Network, err.to_string()))?;

        Ok(FetchedPage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
