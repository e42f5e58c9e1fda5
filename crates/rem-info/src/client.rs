//! HTTP client wrapper with rate limiting

use crate::error::{Error, Result};
use governor::{Quota, RateLimiter};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Rate limiter shared by all requests of one client
pub type ApiRateLimiter = Arc<
    RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>,
>;

/// HTTP client wrapper for JSON APIs with optional rate limiting
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    rate_limiter: Option<ApiRateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration (no rate limiting)
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: Self::build_client()?,
            rate_limiter: None,
        })
    }

    /// Create a new HTTP client with rate limiting
    ///
    /// # Arguments
    ///
    /// * `requests_per_second` - Maximum requests per second, at least 1
    pub fn with_rate_limit(requests_per_second: u32) -> Result<Self> {
        let per_second = NonZeroU32::new(requests_per_second)
            .ok_or_else(|| Error::other("requests per second must be at least 1"))?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self {
            client: Self::build_client()?,
            rate_limiter: Some(rate_limiter),
        })
    }

    fn build_client() -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .user_agent(format!("rem-info/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?)
    }

    /// Wait for rate limiter if enabled
    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }
    }

    /// Make a POST request with a JSON body and deserialize the JSON response
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.wait_for_rate_limit().await;
        let response = self.client.post(url).json(body).send().await?;
        Self::json_body(response, url).await
    }

    async fn json_body<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> Result<T> {
        // Handle rate limiting (HTTP 429)
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimitExceeded(url.to_string()));
        }

        if !response.status().is_success() {
            return Err(Error::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
