use log::debug;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::error::{DomainError, Result};
use crate::store::envelope::unwrap_reply;
use crate::store::traits::BiobankApi;

/// `BiobankApi` over HTTP using reqwest
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    /// Create a client for the API rooted at `base_url` (e.g. `http://localhost:9000/api`)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, None)
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::with_timeout(config.base_url.clone(), Some(Duration::from_secs(config.timeout_secs)))
    }

    fn with_timeout(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, method: &str, path: &str) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        debug!("{} {} -> {}", method, path, status);

        let body: Value = response.json().await.map_err(|e| {
            DomainError::Transport(format!("{} {} failed with {}: {}", method, path, status, e))
        })?;
        unwrap_reply(Some(status.as_u16()), body)
    }
}

#[async_trait::async_trait]
impl BiobankApi for HttpApi {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        let request = self.client.get(self.url(path)).query(query);
        self.send(request, "GET", path).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let request = self.client.post(self.url(path)).json(&body);
        self.send(request, "POST", path).await
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value> {
        let request = self.client.put(self.url(path)).json(&body);
        self.send(request, "PUT", path).await
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        let request = self.client.delete(self.url(path));
        self.send(request, "DELETE", path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let api = HttpApi::new("http://localhost:9000/api/").unwrap();
        assert_eq!(api.base_url(), "http://localhost:9000/api");
        assert_eq!(api.url("/centres"), "http://localhost:9000/api/centres");
    }

    #[test]
    fn test_from_config() {
        let config = ApiConfig {
            base_url: "http://example.test".to_string(),
            timeout_secs: 5,
        };
        let api = HttpApi::from_config(&config).unwrap();
        assert_eq!(api.base_url(), "http://example.test");
    }
}
