// Library exports for qrsign_bridge

pub mod bridge;
pub mod config;
pub mod connect;
pub mod display;
pub mod error;
pub mod identity;
pub mod provider;
pub mod relay;

// Re-export main types for convenience
pub use bridge::{SigningBridge, TxParams};
pub use config::Config;
pub use connect::Connect;
pub use display::{DisplayMode, Presentation, TerminalPresenter, UriHandler, UriPresenter};
pub use error::{BridgeError, ErrorKind, Result};
pub use identity::{ContentStore, IdentityDocument, IpfsGateway};
pub use provider::{Outcome, ProviderEngine, RpcRequest, RpcSubprovider, Subprovider};
pub use relay::{RelayClient, Topic, TopicCategory};
