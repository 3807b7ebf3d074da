//! Entry point for applications: wires the signing bridge, the display
//! handler and the RPC forwarder together.

use std::sync::Arc;

use crate::bridge::SigningBridge;
use crate::config::Config;
use crate::display::{DisplayMode, UriDisplay, UriHandler, UriPresenter};
use crate::error::{BridgeError, Result};
use crate::identity::{self, ContentStore, IdentityDocument};
use crate::provider::{ProviderEngine, RpcSubprovider, Subprovider};
use crate::relay::RelayClient;

pub struct Connect {
    app_name: String,
    config: Config,
    display: Arc<UriDisplay>,
    bridge: Arc<SigningBridge>,
    web3_provider: Option<Arc<ProviderEngine>>,
    content_store: Option<Arc<dyn ContentStore>>,
}

impl Connect {
    pub fn new(
        app_name: impl Into<String>,
        config: Config,
        presenter: Arc<dyn UriPresenter>,
    ) -> Result<Self> {
        let app_name = app_name.into();
        let mode = config
            .display
            .mode
            .unwrap_or_else(|| DisplayMode::from_user_agent(config.display.user_agent.as_deref()));

        log::info!("Connecting {} using {:?} presentation", app_name, mode);

        let display = Arc::new(UriDisplay::new(&app_name, mode, presenter));
        let relay = RelayClient::new(&config.relay)?;
        let bridge = Arc::new(SigningBridge::new(
            relay,
            display.clone(),
            display.clone(),
        ));

        Ok(Self {
            app_name,
            config,
            display,
            bridge,
            web3_provider: None,
            content_store: None,
        })
    }

    /// Content store supplied at construction time.
    pub fn with_content_store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.content_store = Some(store);
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display.mode()
    }

    /// Provider chain of the signing bridge followed by an RPC forwarder.
    ///
    /// The returned engine also becomes this facade's web3 provider.
    pub fn provider(&mut self, rpc_url: Option<&str>) -> Result<Arc<ProviderEngine>> {
        let rpc_url = rpc_url.unwrap_or(&self.config.network.rpc_url);
        let rpc: Arc<dyn Subprovider> = Arc::new(RpcSubprovider::new(rpc_url)?);
        let bridge: Arc<dyn Subprovider> = self.bridge.clone();

        let engine = Arc::new(ProviderEngine::with_providers(vec![bridge, rpc]));
        self.web3_provider = Some(engine.clone());
        Ok(engine)
    }

    /// The bare signing bridge, for callers assembling their own chain.
    pub fn subprovider(&self) -> Arc<SigningBridge> {
        self.bridge.clone()
    }

    /// Attach externally built providers. Each may only be set once.
    pub fn set_providers(
        &mut self,
        web3_provider: Option<Arc<ProviderEngine>>,
        content_store: Option<Arc<dyn ContentStore>>,
    ) -> Result<()> {
        if content_store.is_some() && self.content_store.is_some() {
            return Err(BridgeError::AlreadySet("content store"));
        }
        if web3_provider.is_some() && self.web3_provider.is_some() {
            return Err(BridgeError::AlreadySet("web3 provider"));
        }

        if let Some(store) = content_store {
            self.content_store = Some(store);
        }
        if let Some(provider) = web3_provider {
            self.web3_provider = Some(provider);
        }
        Ok(())
    }

    /// Show a URI the same way the bridge does.
    pub fn handle_uri(&self, uri: &str) -> Result<()> {
        self.display.handle_uri(uri)
    }

    /// Profile document of the connected user.
    pub async fn user_identity(&self) -> Result<IdentityDocument> {
        let store = self
            .content_store
            .as_ref()
            .ok_or(BridgeError::NotSet("content store"))?;
        let provider = self
            .web3_provider
            .as_ref()
            .ok_or(BridgeError::NotSet("web3 provider"))?;

        let address = self.bridge.address().await?;
        identity::load_identity(
            &address,
            &self.config.network.registry_address,
            provider,
            store.as_ref(),
        )
        .await
    }
}
