//! Chained JSON-RPC provider.
//!
//! A request walks an ordered list of [`Subprovider`]s. Each one either
//! handles it (producing a result or an error) or passes it on. The last link
//! is normally an [`RpcSubprovider`] that forwards everything to a node.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{BridgeError, Result};

mod rpc;

pub use rpc::RpcSubprovider;

/// A JSON-RPC call as it travels down the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

/// What a subprovider did with a request
#[derive(Debug)]
pub enum Outcome {
    /// Request terminated here, successfully or not
    Handled(Result<Value>),
    /// Defer to the next subprovider
    Pass,
}

#[async_trait]
pub trait Subprovider: Send + Sync {
    async fn try_handle(&self, request: &RpcRequest) -> Outcome;
}

/// Ordered pipeline of subproviders
pub struct ProviderEngine {
    providers: Vec<Arc<dyn Subprovider>>,
    next_id: AtomicU64,
}

impl ProviderEngine {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_providers(providers: Vec<Arc<dyn Subprovider>>) -> Self {
        Self {
            providers,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn add_provider(&mut self, provider: Arc<dyn Subprovider>) {
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Build a request with a fresh id and send it down the chain.
    pub async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let request = RpcRequest {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: method.to_string(),
            params,
        };
        self.handle(&request).await
    }

    pub async fn handle(&self, request: &RpcRequest) -> Result<Value> {
        for provider in &self.providers {
            match provider.try_handle(request).await {
                Outcome::Handled(result) => return result,
                Outcome::Pass => continue,
            }
        }

        log::warn!("No subprovider handled {}", request.method);
        Err(BridgeError::Unhandled(request.method.clone()))
    }
}

impl Default for ProviderEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Subprovider for ProviderEngine {
    async fn try_handle(&self, request: &RpcRequest) -> Outcome {
        Outcome::Handled(self.handle(request).await)
    }
}
