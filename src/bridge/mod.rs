//! Signing bridge subprovider.
//!
//! Intercepts account and transaction methods and hands them to the mobile
//! signing app as `ethereum:` URIs. Results come back through the relay.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::display::UriHandler;
use crate::error::{BridgeError, Result};
use crate::provider::{Outcome, RpcRequest, Subprovider};
use crate::relay::{RelayClient, TopicCategory};

pub mod uri;

pub use uri::{MessageParams, TxParams};

/// Methods the bridge knows how to answer
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeMethod {
    Coinbase,
    Accounts,
    SendTransaction(TxParams),
    Passthrough,
}

impl BridgeMethod {
    pub fn classify(request: &RpcRequest) -> Result<Self> {
        match request.method.as_str() {
            "eth_coinbase" => Ok(BridgeMethod::Coinbase),
            "eth_accounts" => Ok(BridgeMethod::Accounts),
            "eth_sendTransaction" => {
                let raw = request.params.first().cloned().ok_or_else(|| {
                    BridgeError::InvalidParams("eth_sendTransaction expects a transaction object".into())
                })?;
                let params: TxParams = serde_json::from_value(raw)
                    .map_err(|e| BridgeError::InvalidParams(e.to_string()))?;
                Ok(BridgeMethod::SendTransaction(params))
            }
            _ => Ok(BridgeMethod::Passthrough),
        }
    }
}

pub struct SigningBridge {
    relay: RelayClient,
    connect_handler: Arc<dyn UriHandler>,
    eth_uri_handler: Arc<dyn UriHandler>,
    /// Bound address; written once, concurrent resolutions wait on the first
    address: OnceCell<String>,
}

impl SigningBridge {
    pub fn new(
        relay: RelayClient,
        connect_handler: Arc<dyn UriHandler>,
        eth_uri_handler: Arc<dyn UriHandler>,
    ) -> Self {
        Self {
            relay,
            connect_handler,
            eth_uri_handler,
            address: OnceCell::new(),
        }
    }

    /// Bind a known address up front; no connect request will be issued.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = OnceCell::new_with(Some(address.into()));
        self
    }

    pub fn relay(&self) -> &RelayClient {
        &self.relay
    }

    /// Cached bound address, if already resolved.
    pub fn bound_address(&self) -> Option<&str> {
        self.address.get().map(String::as_str)
    }

    /// Resolve the bound address, asking the mobile app the first time.
    pub async fn address(&self) -> Result<String> {
        self.address
            .get_or_try_init(|| self.request_address())
            .await
            .cloned()
    }

    async fn request_address(&self) -> Result<String> {
        let topic = self.relay.create_topic(TopicCategory::Address);
        let uri = uri::address_request_uri(&topic.url);

        log::info!("Requesting address via topic {}", topic.id);
        self.connect_handler.handle_uri(&uri)?;

        let address = self.relay.wait_for_result(&topic).await?;
        log::info!("Bound address {}", address);
        Ok(address)
    }

    pub async fn validate_transaction(&self, params: &TxParams) -> Result<()> {
        self.validate_sender(params.from.as_deref(), "transaction").await
    }

    pub async fn validate_message(&self, params: &MessageParams) -> Result<()> {
        self.validate_sender(params.from.as_deref(), "message").await
    }

    async fn validate_sender(&self, sender: Option<&str>, subject: &'static str) -> Result<()> {
        let bound = self.address().await?;
        match sender {
            Some(sender) if sender.eq_ignore_ascii_case(&bound) => Ok(()),
            _ => {
                log::warn!("Rejecting {} from {:?}, bound address is {}", subject, sender, bound);
                Err(BridgeError::UnknownAddress {
                    address: sender.map(String::from),
                    subject,
                })
            }
        }
    }

    /// Encode, validate, dispatch, and wait for the transaction hash.
    ///
    /// Malformed transactions fail before the address is resolved or any
    /// topic is created.
    pub async fn send_transaction(&self, params: &TxParams) -> Result<String> {
        let uri = uri::tx_params_to_uri(params)?;
        self.validate_transaction(params).await?;
        self.sign_and_return_tx_hash(uri).await
    }

    async fn sign_and_return_tx_hash(&self, mut eth_uri: String) -> Result<String> {
        let topic = self.relay.create_topic(TopicCategory::Tx);
        uri::append_param(&mut eth_uri, "callback_url", &topic.url);

        log::info!("Requesting transaction signature via topic {}", topic.id);
        self.eth_uri_handler.handle_uri(&eth_uri)?;

        let tx_hash = self.relay.wait_for_result(&topic).await?;
        log::info!("Transaction submitted: {}", tx_hash);
        Ok(tx_hash)
    }

    async fn dispatch(&self, method: BridgeMethod) -> Option<Result<Value>> {
        match method {
            BridgeMethod::Coinbase => Some(self.address().await.map(Value::String)),
            BridgeMethod::Accounts => Some(
                self.address()
                    .await
                    .map(|address| Value::Array(vec![Value::String(address)])),
            ),
            BridgeMethod::SendTransaction(params) => {
                Some(self.send_transaction(&params).await.map(Value::String))
            }
            BridgeMethod::Passthrough => None,
        }
    }
}

#[async_trait]
impl Subprovider for SigningBridge {
    async fn try_handle(&self, request: &RpcRequest) -> Outcome {
        let method = match BridgeMethod::classify(request) {
            Ok(method) => method,
            Err(e) => return Outcome::Handled(Err(e)),
        };

        match self.dispatch(method).await {
            Some(result) => Outcome::Handled(result),
            None => Outcome::Pass,
        }
    }
}
