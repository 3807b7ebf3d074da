/// Terminal subprovider: forwards every request to a JSON-RPC node over HTTP
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{Outcome, RpcRequest, Subprovider};
use crate::error::{BridgeError, Result};

#[derive(Debug, Serialize)]
struct JsonRpcCall<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a [Value],
}

#[derive(Debug, Deserialize)]
struct JsonRpcReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Clone)]
pub struct RpcSubprovider {
    client: Client,
    rpc_url: String,
}

impl RpcSubprovider {
    pub fn new(rpc_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn forward(&self, request: &RpcRequest) -> Result<Value> {
        let call = JsonRpcCall {
            jsonrpc: "2.0",
            id: request.id,
            method: &request.method,
            params: &request.params,
        };

        log::debug!("Forwarding {} to {}", request.method, self.rpc_url);

        let response = self.client.post(&self.rpc_url).json(&call).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("RPC node returned {}: {}", status, message);
            return Err(BridgeError::Rpc {
                code: i64::from(status),
                message,
            });
        }

        let reply: JsonRpcReply = response.json().await?;

        if let Some(error) = reply.error {
            return Err(BridgeError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(reply.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl Subprovider for RpcSubprovider {
    async fn try_handle(&self, request: &RpcRequest) -> Outcome {
        Outcome::Handled(self.forward(request).await)
    }
}
