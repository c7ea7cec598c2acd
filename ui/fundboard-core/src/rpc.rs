//! JSON-RPC 2.0 transport.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ChainError;

/// Async transport abstraction for JSON-RPC endpoints.
///
/// Implementations MUST NOT retry internally; every failure is returned
/// to the caller as-is.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError>;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Interprets a raw JSON-RPC response envelope.
fn parse_response(body: Value) -> Result<Value, ChainError> {
    let resp: RpcResponse =
        serde_json::from_value(body).map_err(|e| ChainError::Decode(e.to_string()))?;
    if let Some(err) = resp.error {
        return Err(ChainError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    Ok(resp.result.unwrap_or(Value::Null))
}

/// HTTP transport over `reqwest`.
pub struct HttpTransport {
    url: String,
    client: Client,
    api_key: Option<String>,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        api_key: Option<String>,
    ) -> Result<Self, ChainError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
            api_key,
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, url = %self.url, "rpc request");

        let body = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let mut req = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ChainError::Transport(format!("HTTP {status}: {text}")));
        }
        let json: Value = resp
            .json()
            .await
            .map_err(|e| ChainError::Decode(e.to_string()))?;
        parse_response(json)
    }
}
