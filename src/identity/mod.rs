//! Identity document lookup.
//!
//! The registry contract maps an address to the digest of a JSON profile kept
//! in a content-addressed store (IPFS). Fetching the document takes one
//! `eth_call` through the provider chain and one read from the store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tiny_keccak::{Hasher, Keccak};

use crate::error::{BridgeError, Result};
use crate::provider::ProviderEngine;

mod ipfs;

pub use ipfs::IpfsGateway;

/// Registration slot under which profiles are published
pub const PROFILE_REGISTRATION_ID: &str = "uPortProfileIPFS1220";

const REGISTRY_GET_SIGNATURE: &str = "get(bytes32,address,address)";

/// Multihash prefix for a 32-byte sha2-256 digest
const SHA256_MULTIHASH_PREFIX: [u8; 2] = [0x12, 0x20];

/// Content-addressed storage for profile documents
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn cat(&self, hash: &str) -> Result<Vec<u8>>;
}

/// Profile document of a bound address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityDocument {
    pub address: String,
    pub content_hash: String,
    pub profile: Value,
}

impl IdentityDocument {
    /// Convenience accessor for a top-level profile attribute.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.profile.get(name)
    }
}

pub fn function_selector(signature: &str) -> [u8; 4] {
    let mut hasher = Keccak::v256();
    hasher.update(signature.as_bytes());
    let mut digest = [0u8; 32];
    hasher.finalize(&mut digest);

    let mut selector = [0u8; 4];
    selector.copy_from_slice(&digest[..4]);
    selector
}

fn encode_bytes32_str(value: &str) -> Result<[u8; 32]> {
    let bytes = value.as_bytes();
    if bytes.len() > 32 {
        return Err(BridgeError::InvalidParams(format!("{} does not fit in bytes32", value)));
    }
    let mut word = [0u8; 32];
    word[..bytes.len()].copy_from_slice(bytes);
    Ok(word)
}

fn encode_address(address: &str) -> Result<[u8; 32]> {
    let digits = address.strip_prefix("0x").unwrap_or(address);
    let raw = hex::decode(digits)
        .map_err(|e| BridgeError::InvalidParams(format!("bad address {}: {}", address, e)))?;
    if raw.len() != 20 {
        return Err(BridgeError::InvalidParams(format!("bad address length: {}", address)));
    }
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&raw);
    Ok(word)
}

/// Calldata for `get(PROFILE_REGISTRATION_ID, subject, subject)`.
pub fn encode_profile_lookup(subject: &str) -> Result<String> {
    let mut calldata = Vec::with_capacity(4 + 32 * 3);
    calldata.extend_from_slice(&function_selector(REGISTRY_GET_SIGNATURE));
    calldata.extend_from_slice(&encode_bytes32_str(PROFILE_REGISTRATION_ID)?);
    let subject_word = encode_address(subject)?;
    calldata.extend_from_slice(&subject_word);
    calldata.extend_from_slice(&subject_word);
    Ok(format!("0x{}", hex::encode(calldata)))
}

/// Turn the registry's bytes32 answer into a base58 content hash.
///
/// Returns `None` for the all-zero word, meaning nothing is registered.
pub fn content_hash_from_word(word: &str) -> Result<Option<String>> {
    let digits = word.strip_prefix("0x").unwrap_or(word);
    let digest = hex::decode(digits)
        .map_err(|e| BridgeError::Parse(format!("registry returned non-hex data: {}", e)))?;
    if digest.len() != 32 {
        return Err(BridgeError::Parse(format!(
            "registry returned {} bytes, expected 32",
            digest.len()
        )));
    }
    if digest.iter().all(|b| *b == 0) {
        return Ok(None);
    }

    let mut multihash = SHA256_MULTIHASH_PREFIX.to_vec();
    multihash.extend_from_slice(&digest);
    Ok(Some(bs58::encode(multihash).into_string()))
}

/// Registry contract reachable through a provider chain
pub struct Registry<'a> {
    address: &'a str,
    provider: &'a ProviderEngine,
}

impl<'a> Registry<'a> {
    pub fn new(address: &'a str, provider: &'a ProviderEngine) -> Self {
        Self { address, provider }
    }

    pub async fn profile_hash(&self, subject: &str) -> Result<Option<String>> {
        let call = json!({
            "to": self.address,
            "data": encode_profile_lookup(subject)?,
        });
        let result = self
            .provider
            .send("eth_call", vec![call, json!("latest")])
            .await?;

        let word = result
            .as_str()
            .ok_or_else(|| BridgeError::Parse(format!("eth_call returned {}", result)))?;
        content_hash_from_word(word)
    }
}

/// Look up and load the profile document for `address`.
pub async fn load_identity(
    address: &str,
    registry_address: &str,
    provider: &ProviderEngine,
    store: &dyn ContentStore,
) -> Result<IdentityDocument> {
    let content_hash = Registry::new(registry_address, provider)
        .profile_hash(address)
        .await?
        .ok_or_else(|| BridgeError::IdentityNotFound(address.to_string()))?;

    log::debug!("Loading profile {} for {}", content_hash, address);

    let raw = store.cat(&content_hash).await?;
    let profile: Value = serde_json::from_slice(&raw)?;

    Ok(IdentityDocument {
        address: address.to_string(),
        content_hash,
        profile,
    })
}
