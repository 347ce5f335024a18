//! Contract and token registry.
//!
//! Loaded from a JSON document at startup (see `config/contracts.json`);
//! read-only after initialization and safe for unsynchronized concurrent
//! reads.

use std::collections::HashMap;
use std::path::Path;

use chainflow_core::{ChainflowError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Registry name of the swap contract.
pub const SWAP_CONTRACT: &str = "SimpleSwap";

/// Registry name of the staking contract.
pub const STAKING_CONTRACT: &str = "MTKStaking";

/// Network metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: String,
    #[serde(default)]
    pub rpc_url: String,
}

/// A token known to the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    #[serde(default)]
    pub is_native: bool,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// How a swap pair is executed on the swap contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapMethod {
    /// Send native value, receive tokens.
    #[serde(rename = "buyToken")]
    BuyToken,
    /// Send tokens as a call parameter, receive native value.
    #[serde(rename = "sellToken")]
    SellToken,
}

/// A supported trading pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapPair {
    pub from: String,
    pub to: String,
    pub method: SwapMethod,
    /// Units of `to` received per unit of `from`.
    pub rate: f64,
    #[serde(default)]
    pub description: String,
}

/// A deployed contract known to the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInfo {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub supported_pairs: Vec<SwapPair>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    version: String,
    network: NetworkConfig,
    tokens: HashMap<String, TokenConfig>,
    contracts: HashMap<String, ContractInfo>,
}

/// The contract/token registry.
#[derive(Debug, Clone)]
pub struct ContractRegistry {
    doc: RegistryDocument,
}

impl ContractRegistry {
    /// Load a registry from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| ChainflowError::Internal(format!("read {}: {e}", path.display())))?;
        let registry = Self::from_json(&data)?;
        info!(
            network = %registry.doc.network.name,
            tokens = registry.doc.tokens.len(),
            contracts = registry.doc.contracts.len(),
            "contract registry loaded"
        );
        Ok(registry)
    }

    /// Parse a registry from a JSON string.
    pub fn from_json(data: &str) -> Result<Self> {
        let doc: RegistryDocument = serde_json::from_str(data)?;
        Ok(Self { doc })
    }

    /// The built-in demo registry (MEER/MTK on the qng testnet), used when no
    /// registry file is configured.
    pub fn builtin() -> Self {
        Self::from_json(BUILTIN_REGISTRY).expect("builtin registry is valid")
    }

    /// Network metadata.
    pub fn network(&self) -> &NetworkConfig {
        &self.doc.network
    }

    /// Look up a token by symbol.
    pub fn token(&self, symbol: &str) -> Result<&TokenConfig> {
        self.doc
            .tokens
            .get(symbol)
            .ok_or_else(|| ChainflowError::UnknownToken(symbol.to_string()))
    }

    /// Look up a contract by registry name.
    pub fn contract(&self, name: &str) -> Result<&ContractInfo> {
        self.doc
            .contracts
            .get(name)
            .ok_or_else(|| ChainflowError::UnknownContract(name.to_string()))
    }

    /// Find the swap pair for `from -> to` on the swap contract.
    pub fn swap_pair(&self, from: &str, to: &str) -> Result<&SwapPair> {
        let contract = self.contract(SWAP_CONTRACT)?;
        contract
            .supported_pairs
            .iter()
            .find(|p| p.from == from && p.to == to)
            .ok_or_else(|| ChainflowError::UnsupportedPair {
                from: from.to_string(),
                to: to.to_string(),
            })
    }

    /// Whether `from -> to` is a supported trading pair.
    pub fn supports_pair(&self, from: &str, to: &str) -> bool {
        self.swap_pair(from, to).is_ok()
    }

    /// Symbols of all known tokens.
    pub fn supported_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.doc.tokens.keys().cloned().collect();
        tokens.sort();
        tokens
    }

    /// All supported trading pairs as `FROM-TO` strings.
    pub fn supported_pairs(&self) -> Vec<String> {
        let mut pairs: Vec<String> = self
            .doc
            .contracts
            .values()
            .flat_map(|c| c.supported_pairs.iter())
            .map(|p| format!("{}-{}", p.from, p.to))
            .collect();
        pairs.sort();
        pairs
    }
}

const BUILTIN_REGISTRY: &str = r#"{
  "version": "1.0",
  "network": {
    "chainId": 8131,
    "name": "qng-testnet",
    "rpcUrl": "http://127.0.0.1:18545"
  },
  "tokens": {
    "MEER": {
      "name": "Meer",
      "symbol": "MEER",
      "decimals": 18,
      "isNative": true,
      "description": "Native token"
    },
    "MTK": {
      "name": "Meer Token",
      "symbol": "MTK",
      "decimals": 18,
      "isNative": false,
      "contractAddress": "0x7b78d4f2ec1b4a9d5cc1c62e0e6dd6f6ce2f5a0b",
      "description": "ERC20 token"
    }
  },
  "contracts": {
    "SimpleSwap": {
      "name": "SimpleSwap",
      "address": "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc",
      "description": "Fixed-rate MEER/MTK swap",
      "supportedPairs": [
        {
          "from": "MEER",
          "to": "MTK",
          "method": "buyToken",
          "rate": 1000,
          "description": "Buy MTK with MEER"
        },
        {
          "from": "MTK",
          "to": "MEER",
          "method": "sellToken",
          "rate": 0.001,
          "description": "Sell MTK for MEER"
        }
      ]
    },
    "MTKStaking": {
      "name": "MTKStaking",
      "address": "0x90f79bf6eb2c4f870365e785982e1f101e93b906",
      "description": "MTK staking pool"
    }
  }
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_parses() {
        let registry = ContractRegistry::builtin();
        assert_eq!(registry.network().chain_id, 8131);
        assert_eq!(registry.token("MEER").unwrap().decimals, 18);
        assert!(registry.token("MEER").unwrap().is_native);
        assert!(!registry.token("MTK").unwrap().is_native);
    }

    #[test]
    fn test_pair_lookup() {
        let registry = ContractRegistry::builtin();
        let pair = registry.swap_pair("MEER", "MTK").unwrap();
        assert_eq!(pair.method, SwapMethod::BuyToken);
        assert_eq!(pair.rate, 1000.0);
        assert!(registry.supports_pair("MTK", "MEER"));
        assert!(!registry.supports_pair("MEER", "USDT"));
    }

    #[test]
    fn test_unknown_lookups_are_typed_errors() {
        let registry = ContractRegistry::builtin();
        assert!(matches!(
            registry.token("USDT"),
            Err(ChainflowError::UnknownToken(_))
        ));
        assert!(matches!(
            registry.contract("UniswapV3"),
            Err(ChainflowError::UnknownContract(_))
        ));
        assert!(matches!(
            registry.swap_pair("MEER", "USDT"),
            Err(ChainflowError::UnsupportedPair { .. })
        ));
    }

    #[test]
    fn test_supported_listings() {
        let registry = ContractRegistry::builtin();
        assert_eq!(registry.supported_tokens(), vec!["MEER", "MTK"]);
        assert_eq!(registry.supported_pairs(), vec!["MEER-MTK", "MTK-MEER"]);
    }
}
