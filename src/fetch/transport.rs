use crate::config::FetchConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time;

/// Outbound GET boundary shared by collectors and the relay racer
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Fetch `url` and return the body of a 2xx response
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

/// `reqwest`-backed transport used in production
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,application/json,*/*;q=0.8",
            ),
        );

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

/// GET bounded by `timeout`; the in-flight request is dropped when it elapses
pub async fn get_text_within(
    transport: &dyn HttpTransport,
    url: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    match time::timeout(timeout, transport.get_text(url)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
            after: timeout,
        }),
    }
}

/// Bounded GET decoded as JSON
pub async fn get_json_within<T: DeserializeOwned>(
    transport: &dyn HttpTransport,
    url: &str,
    timeout: Duration,
) -> Result<T, FetchError> {
    let body = get_text_within(transport, url, timeout).await?;
    serde_json::from_str(&body).map_err(|e| FetchError::InvalidJson(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowTransport;

    #[async_trait]
    impl HttpTransport for SlowTransport {
        async fn get_text(&self, _url: &str) -> Result<String, FetchError> {
            time::sleep(Duration::from_secs(30)).await;
            Ok("late".to_string())
        }
    }

    struct JsonTransport(&'static str);

    #[async_trait]
    impl HttpTransport for JsonTransport {
        async fn get_text(&self, _url: &str) -> Result<String, FetchError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_timeout_elapses_into_fetch_error() {
        let result = get_text_within(&SlowTransport, "https://slow", Duration::from_millis(20)).await;
        assert!(matches!(result, Err(FetchError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_json_decode_failure() {
        let result: Result<serde_json::Value, _> =
            get_json_within(&JsonTransport("<html>"), "https://x", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(FetchError::InvalidJson(_))));
    }
}
