// gsq-core/src/infrastructure/adapters/http.rs

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::domain::config::EndpointParams;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};

/// Exponential backoff for requests that opt in with `HttpRequest::with_retry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Seconds. Delay before retry k (k >= 1) is `backoff_factor * 2^(k-1)`.
    pub backoff_factor: u32,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_factor: 0,
        }
    }

    pub fn from_params(params: &EndpointParams) -> Self {
        Self {
            max_retries: params.api_call_retry_max_count,
            backoff_factor: params.api_call_retry_backoff_factor,
        }
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let secs = u64::from(self.backoff_factor).saturating_mul(2u64.saturating_pow(retry - 1));
        Duration::from_secs(secs)
    }

    /// Throttling and server-side failures are retried, client errors are not.
    pub fn is_retryable_status(status: u16) -> bool {
        status == 429 || (500..600).contains(&status)
    }
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl ReqwestTransport {
    pub fn new(policy: RetryPolicy) -> Result<Self, InfrastructureError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| InfrastructureError::Http {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client, policy })
    }

    async fn send_once(&self, request: &HttpRequest) -> Result<HttpResponse, InfrastructureError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        builder = builder.timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| InfrastructureError::Http {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| InfrastructureError::Http {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;

        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = ?request.method, url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, InfrastructureError> {
        let policy = if request.retry {
            self.policy
        } else {
            RetryPolicy::none()
        };

        let mut retry = 0;
        loop {
            let delay = policy.delay_for(retry);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let outcome = self.send_once(&request).await;
            let retryable = match &outcome {
                Ok(resp) => RetryPolicy::is_retryable_status(resp.status),
                Err(_) => true,
            };

            if !retryable || retry >= policy.max_retries {
                if let Ok(resp) = &outcome {
                    debug!(status = resp.status, attempts = retry + 1, "HTTP call finished");
                }
                return outcome;
            }

            retry += 1;
            match &outcome {
                Ok(resp) => warn!(status = resp.status, retry, "Retrying HTTP call"),
                Err(e) => warn!(error = %e, retry, "Retrying HTTP call"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 10,
            backoff_factor: 4,
        };
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for(2), Duration::from_secs(8));
        assert_eq!(policy.delay_for(4), Duration::from_secs(32));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy {
            max_retries: u32::MAX,
            backoff_factor: u32::MAX,
        };
        assert_eq!(policy.delay_for(200), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(RetryPolicy::is_retryable_status(429));
        assert!(RetryPolicy::is_retryable_status(503));
        assert!(!RetryPolicy::is_retryable_status(400));
        assert!(!RetryPolicy::is_retryable_status(401));
        assert!(!RetryPolicy::is_retryable_status(200));
    }

    #[test]
    fn test_from_params_defaults() {
        let policy = RetryPolicy::from_params(&EndpointParams::default());
        assert_eq!(policy.max_retries, 10);
        assert_eq!(policy.backoff_factor, 4);
    }
}
