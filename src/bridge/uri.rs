/// `ethereum:` URI assembly for the mobile signing app
use alloy_primitives::U256;
use serde::Deserialize;

use crate::error::{BridgeError, Result};

/// Transaction fields as they arrive in `eth_sendTransaction`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TxParams {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub gas: Option<String>,
}

/// Message fields for signing requests, only the sender matters here
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageParams {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

pub const ADDRESS_REQUEST_URI: &str = "ethereum:me";

/// Append `key=value`, picking `?` or `&` depending on what is already there.
pub fn append_param(uri: &mut String, key: &str, value: &str) {
    uri.push(if uri.contains('?') { '&' } else { '?' });
    uri.push_str(key);
    uri.push('=');
    uri.push_str(value);
}

/// Decode a `0x`-prefixed hex quantity into its decimal representation.
pub fn hex_to_decimal(field: &str, hex: &str) -> Result<String> {
    let digits = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    if digits.is_empty() {
        return Err(BridgeError::InvalidParams(format!("{} is empty", field)));
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(BridgeError::InvalidParams(format!("{} is not a hex quantity: {}", field, hex)));
    }

    U256::from_str_radix(digits, 16)
        .map(|n| n.to_string())
        .map_err(|_| BridgeError::InvalidParams(format!("{} is not a hex quantity: {}", field, hex)))
}

/// Build `ethereum:<to>[?value=..][&bytecode=..][&gas=..]`.
pub fn tx_params_to_uri(params: &TxParams) -> Result<String> {
    let to = params.to.as_deref().ok_or(BridgeError::ContractCreation)?;

    let mut uri = format!("ethereum:{}", to);
    if let Some(value) = &params.value {
        append_param(&mut uri, "value", &hex_to_decimal("value", value)?);
    }
    if let Some(data) = &params.data {
        append_param(&mut uri, "bytecode", data);
    }
    if let Some(gas) = &params.gas {
        append_param(&mut uri, "gas", &hex_to_decimal("gas", gas)?);
    }

    Ok(uri)
}

pub fn address_request_uri(callback_url: &str) -> String {
    let mut uri = ADDRESS_REQUEST_URI.to_string();
    append_param(&mut uri, "callback_url", callback_url);
    uri
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(to: Option<&str>, value: Option<&str>, data: Option<&str>, gas: Option<&str>) -> TxParams {
        TxParams {
            from: None,
            to: to.map(String::from),
            value: value.map(String::from),
            data: data.map(String::from),
            gas: gas.map(String::from),
        }
    }

    #[test]
    fn test_value_only() {
        let uri = tx_params_to_uri(&tx(Some("0xabc"), Some("0x1"), None, None)).unwrap();
        assert_eq!(uri, "ethereum:0xabc?value=1");
    }

    #[test]
    fn test_data_and_gas() {
        let uri = tx_params_to_uri(&tx(Some("0xabc"), None, Some("0xdead"), Some("0x5208"))).unwrap();
        assert_eq!(uri, "ethereum:0xabc?bytecode=0xdead&gas=21000");
    }

    #[test]
    fn test_field_order_with_everything() {
        let uri = tx_params_to_uri(&tx(
            Some("0xabc"),
            Some("0xde0b6b3a7640000"),
            Some("0x01"),
            Some("0x5208"),
        ))
        .unwrap();
        assert_eq!(
            uri,
            "ethereum:0xabc?value=1000000000000000000&bytecode=0x01&gas=21000"
        );
    }

    #[test]
    fn test_gas_only() {
        let uri = tx_params_to_uri(&tx(Some("0xabc"), None, None, Some("0x10"))).unwrap();
        assert_eq!(uri, "ethereum:0xabc?gas=16");
    }

    #[test]
    fn test_bare_recipient() {
        let uri = tx_params_to_uri(&tx(Some("0xabc"), None, None, None)).unwrap();
        assert_eq!(uri, "ethereum:0xabc");
    }

    #[test]
    fn test_zero_value_is_kept() {
        let uri = tx_params_to_uri(&tx(Some("0xabc"), Some("0x0"), None, None)).unwrap();
        assert_eq!(uri, "ethereum:0xabc?value=0");
    }

    #[test]
    fn test_missing_recipient() {
        let err = tx_params_to_uri(&tx(None, Some("0x1"), None, None)).unwrap_err();
        assert!(matches!(err, BridgeError::ContractCreation));
    }

    #[test]
    fn test_values_beyond_u64() {
        let dec = hex_to_decimal("value", "0x10000000000000000").unwrap();
        assert_eq!(dec, "18446744073709551616");
    }

    #[test]
    fn test_bad_hex() {
        assert!(matches!(
            hex_to_decimal("gas", "0xzz"),
            Err(BridgeError::InvalidParams(_))
        ));
        assert!(matches!(
            hex_to_decimal("gas", "0x"),
            Err(BridgeError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_separators_are_not_hex() {
        for input in ["0x_", "0x1_000", "0x 1", "0x+1"] {
            assert!(
                matches!(hex_to_decimal("value", input), Err(BridgeError::InvalidParams(_))),
                "{}",
                input
            );
        }
    }

    #[test]
    fn test_address_request_uri() {
        assert_eq!(
            address_request_uri("https://relay.example/abc"),
            "ethereum:me?callback_url=https://relay.example/abc"
        );
    }

    #[test]
    fn test_append_param_separator() {
        let mut uri = "ethereum:0xabc".to_string();
        append_param(&mut uri, "callback_url", "https://relay.example/1");
        append_param(&mut uri, "label", "Demo");
        assert_eq!(uri, "ethereum:0xabc?callback_url=https://relay.example/1&label=Demo");
    }
}
