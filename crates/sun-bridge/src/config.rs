//! Gateway configuration

use serde::{Deserialize, Serialize};
use sun_core::{is_hex, strip_0x, Address, Result, SunError};

/// Gateway contracts and side chain identifier, as supplied by the caller
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeGatewayConfig {
    pub main_gateway_address: String,
    pub side_gateway_address: String,
    /// Hex identifier mixed into every side-chain signing digest
    pub side_chain_id: String,
}

impl BridgeGatewayConfig {
    pub fn new(
        main_gateway_address: impl Into<String>,
        side_gateway_address: impl Into<String>,
        side_chain_id: impl Into<String>,
    ) -> Self {
        Self {
            main_gateway_address: main_gateway_address.into(),
            side_gateway_address: side_gateway_address.into(),
            side_chain_id: side_chain_id.into(),
        }
    }

    /// Check all three fields
    pub fn validate(&self) -> Result<Gateways> {
        Ok(Gateways {
            main: parse_gateway("main", &self.main_gateway_address)?,
            side: parse_gateway("side", &self.side_gateway_address)?,
            chain_id: parse_chain_id(&self.side_chain_id)?,
        })
    }
}

/// Validated gateway configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gateways {
    pub main: Address,
    pub side: Address,
    pub chain_id: Vec<u8>,
}

pub(crate) fn parse_gateway(which: &str, value: &str) -> Result<Address> {
    Address::parse(value)
        .map_err(|_| SunError::Configuration(format!("Invalid {} gateway address provided", which)))
}

pub(crate) fn parse_chain_id(value: &str) -> Result<Vec<u8>> {
    if !is_hex(value) {
        return Err(SunError::Configuration("Invalid side chain ID provided".into()));
    }
    // odd-length ids are left-padded, as the gateway contracts store them
    let body = strip_0x(value);
    let padded = if body.len() % 2 == 1 {
        format!("0{}", body)
    } else {
        body.to_string()
    };
    hex::decode(padded).map_err(|_| SunError::Configuration("Invalid side chain ID provided".into()))
}
