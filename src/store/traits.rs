use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;

/// REST transport used by every entity operation.
///
/// Implementations unwrap the `{status, data|message}` reply envelope: a successful call
/// yields `data`, a rejected one a classified `DomainError`. No implementation retries.
#[async_trait::async_trait]
pub trait BiobankApi: Send + Sync {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value>;
    async fn post(&self, path: &str, body: Value) -> Result<Value>;
    async fn put(&self, path: &str, body: Value) -> Result<Value>;
    async fn delete(&self, path: &str) -> Result<Value>;
}

#[async_trait::async_trait]
impl<T: BiobankApi + ?Sized> BiobankApi for Arc<T> {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        (**self).get(path, query).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        (**self).post(path, body).await
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value> {
        (**self).put(path, body).await
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        (**self).delete(path).await
    }
}
