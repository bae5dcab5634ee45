//! JSON-RPC transport: one POST per request against the Kodi web server.

use std::future::Future;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;

use kodi_common::config::KodiConfig;
use kodi_common::error::RpcError;
use kodi_common::types::JsonRpcRequest;

use crate::methods;

/// Sends a single JSON-RPC request and hands back the raw response body.
pub trait RpcTransport: Send + Sync {
    /// Perform the call. Only a `200 OK` counts as success.
    fn call(
        &self,
        request: &JsonRpcRequest,
    ) -> impl Future<Output = Result<Vec<u8>, RpcError>> + Send;

    /// Lightweight liveness probe (`JSONRPC.Ping`).
    fn ping(&self) -> impl Future<Output = Result<(), RpcError>> + Send {
        async move {
            let request = methods::ping();
            self.call(&request).await.map(|_| ())
        }
    }
}

/// Production transport backed by a pooled `reqwest` client.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    username: String,
    password: String,
}

impl HttpTransport {
    /// Build a client with the configured per-request timeout.
    pub fn new(config: &KodiConfig) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.json_rpc.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl RpcTransport for HttpTransport {
    async fn call(&self, request: &JsonRpcRequest) -> Result<Vec<u8>, RpcError> {
        tracing::info!(method = %request.method, "request kodi");

        let body = serde_json::to_vec(&request.envelope())?;

        // The response is owned here; every return path drops it and frees the connection.
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(RpcError::Status(status.to_string()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
