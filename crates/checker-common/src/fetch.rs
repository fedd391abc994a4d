/// Article page fetcher with a small linear-backoff retry loop.
///
/// Every transport failure, including a non-2xx status, counts as a failed attempt.
/// After attempt `n` fails the fetcher sleeps `backoff_step * n` before trying again.
use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use tracing::{info, warn};

use crate::error::CommonError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";
const ACCEPT_LANGUAGE_VALUE: &str = "tr-TR,tr;q=0.9,en-US;q=0.8,en;q=0.7";

#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff_step: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_attempts: 3,
            backoff_step: Duration::from_millis(1_200),
        }
    }
}

/// Source of raw article HTML.
pub trait PageSource {
    fn fetch_page(&self, url: &str) -> impl Future<Output = Result<String, CommonError>> + Send;
}

#[derive(Clone)]
pub struct PageFetcher {
    config: FetchConfig,
    http: reqwest::Client,
}

impl PageFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, CommonError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn try_fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        let resp = self
            .http
            .get(url)
            .timeout(self.config.timeout)
            .send()
            .await?
            .error_for_status()?;
        // Pages are always read as UTF-8 so Turkish characters survive mislabelled charsets.
        let body = resp.bytes().await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

impl PageSource for PageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, CommonError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.try_fetch(url).await {
                Ok(body) => {
                    info!(url, attempt, bytes = body.len(), "page fetched");
                    return Ok(body);
                }
                Err(e) => {
                    if attempt >= max_attempts {
                        return Err(CommonError::Fetch {
                            attempts: attempt,
                            source: e,
                        });
                    }
                    let delay = backoff_delay(self.config.backoff_step, attempt);
                    warn!(
                        url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "page fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn backoff_delay(step: Duration, attempt: u32) -> Duration {
    step.saturating_mul(attempt)
}
