//! Configuration for omnichain token operations
//!
//! Loads the network registry, token deployment descriptors, endpoint
//! directory and fee handler descriptors from a TOML file with environment
//! variable substitution. Everything is validated once at load time so that
//! descriptor bugs surface before any transaction is sent.

use crate::error::{BridgeError, BridgeResult};

use anyhow::{Context, Result};
use ethers::types::Address;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::env;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub deploy: DeployConfig,
    pub networks: HashMap<String, NetworkConfig>,
    /// Endpoint directory: network id -> well-known service name -> address
    #[serde(default)]
    pub endpoints: HashMap<String, HashMap<String, Address>>,
    pub tokens: HashMap<String, TokenConfig>,
    #[serde(default)]
    pub fee_handlers: HashMap<String, FeeHandlerConfig>,
}

/// Network registry entry
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Messaging-layer endpoint identifier for this network
    pub eid: u32,
    pub rpc_url: String,
    /// Governance / ownership address used as proxy owner and init signer
    pub owner: Address,
    pub etherscan_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    /// Deterministic deployment factory (CREATE2 proxy)
    #[serde(default = "default_create2_factory")]
    pub create2_factory: Address,
    /// Confirmations to wait for each submitted transaction
    #[serde(default = "default_confirmations")]
    pub confirmations: usize,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            create2_factory: default_create2_factory(),
            confirmations: default_confirmations(),
        }
    }
}

fn default_create2_factory() -> Address {
    // Canonical deterministic-deployment proxy, same address on every chain
    "0x4e59b44847b379578588920cA78FbF26c0B4956C"
        .parse()
        .expect("valid factory address literal")
}

fn default_confirmations() -> usize {
    1
}

/// Token deployment descriptor for one logical token
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub decimals: u8,
    /// Name under which deployment records are filed
    pub deployment_name: String,
    /// Stable salt for deterministic address derivation, shared across
    /// networks and redeployments
    pub salt: String,
    pub networks: HashMap<String, TokenDeployment>,
}

/// Per-network deployment entry for a token
#[derive(Debug, Clone, Deserialize)]
pub struct TokenDeployment {
    #[serde(flatten)]
    pub variant: DeploymentVariant,
    /// Fee handler to wire in after deployment; absent or zero means none
    pub fee_handler: Option<Address>,
}

impl TokenDeployment {
    /// The fee handler binding, with the zero address treated as unset.
    pub fn fee_handler_binding(&self) -> Option<Address> {
        self.fee_handler.filter(|a| !a.is_zero())
    }
}

/// Deployment variant: either a locking adapter wrapping a pre-existing
/// token on its home network, or a native omnichain token elsewhere.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeploymentVariant {
    Adapter { underlying: Address },
    Native { name: String, symbol: String },
}

impl DeploymentVariant {
    pub fn is_adapter(&self) -> bool {
        matches!(self, DeploymentVariant::Adapter { .. })
    }
}

/// Fee handler constructor data for one network. Pure deployment-time
/// descriptor; nothing here is computed at runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct FeeHandlerConfig {
    #[serde(default)]
    pub fixed_native_fee: u64,
    /// Native/USD oracle feed
    pub oracle: Address,
    /// Treasury yields reference
    pub yields: Address,
    /// Quote type selector (0 = oracle)
    #[serde(default)]
    pub quote_type: u8,
    /// Operations fee recipient
    pub ops: Address,
}

impl Settings {
    /// Load settings from the configuration file
    pub fn load() -> Result<Self> {
        let config_path = env::var("OMNIBRIDGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Parse settings from a TOML string (no env substitution)
    pub fn from_toml(input: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(input).with_context(|| "Failed to parse configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate descriptors before anything touches a chain
    fn validate(&self) -> BridgeResult<()> {
        if self.networks.is_empty() {
            return Err(BridgeError::InvalidDescriptor(
                "no networks configured".to_string(),
            ));
        }

        // Endpoint identifiers must be unique across the registry
        let mut eids = HashSet::new();
        for (name, network) in &self.networks {
            if !eids.insert(network.eid) {
                return Err(BridgeError::InvalidDescriptor(format!(
                    "duplicate endpoint id {} (network {})",
                    network.eid, name
                )));
            }
        }

        for (symbol, token) in &self.tokens {
            let mut adapter_networks: Vec<&str> = Vec::new();
            for (network_id, deployment) in &token.networks {
                let network = self.networks.get(network_id).ok_or_else(|| {
                    BridgeError::InvalidDescriptor(format!(
                        "token {} references unknown network {}",
                        symbol, network_id
                    ))
                })?;

                // Deployment targets need a real governance address
                if network.owner.is_zero() {
                    return Err(BridgeError::InvalidDescriptor(format!(
                        "network {} is a deployment target for {} but has a zero owner",
                        network_id, symbol
                    )));
                }

                if deployment.variant.is_adapter() {
                    adapter_networks.push(network_id);
                }
            }

            // A token has one home network; more than one adapter is a
            // descriptor bug, not something to pick from silently.
            if adapter_networks.len() > 1 {
                adapter_networks.sort();
                return Err(BridgeError::InvalidDescriptor(format!(
                    "token {} has adapter variants on multiple networks: {}",
                    symbol,
                    adapter_networks.join(", ")
                )));
            }
        }

        Ok(())
    }

    /// Network registry lookup
    pub fn network(&self, id: &str) -> BridgeResult<&NetworkConfig> {
        self.networks
            .get(id)
            .ok_or_else(|| BridgeError::UnknownNetwork {
                network: id.to_string(),
            })
    }

    /// Token descriptor lookup
    pub fn token(&self, symbol: &str) -> BridgeResult<&TokenConfig> {
        self.tokens
            .get(symbol)
            .ok_or_else(|| BridgeError::UnknownToken {
                token: symbol.to_string(),
            })
    }

    /// Resolve the deployment variant for a (token, network) pair
    pub fn variant(&self, symbol: &str, network_id: &str) -> BridgeResult<&TokenDeployment> {
        self.token(symbol)?
            .networks
            .get(network_id)
            .ok_or_else(|| BridgeError::UnconfiguredDeployment {
                token: symbol.to_string(),
                network: network_id.to_string(),
            })
    }

    /// Endpoint directory lookup by (network, well-known service name)
    pub fn endpoint(&self, network_id: &str, service: &str) -> BridgeResult<Address> {
        self.endpoints
            .get(network_id)
            .and_then(|services| services.get(service))
            .copied()
            .ok_or_else(|| BridgeError::EndpointNotFound {
                network: network_id.to_string(),
                service: service.to_string(),
            })
    }

    /// Fee handler descriptor lookup
    pub fn fee_handler(&self, network_id: &str) -> BridgeResult<&FeeHandlerConfig> {
        self.fee_handlers
            .get(network_id)
            .ok_or_else(|| BridgeError::UnconfiguredDeployment {
                token: "FeeHandler".to_string(),
                network: network_id.to_string(),
            })
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
