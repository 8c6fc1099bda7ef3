//! Deployment records
//!
//! One JSON file per (network, deployment name), written after a successful
//! deployment and read back when bridging needs the local contract handle.

use crate::error::{BridgeError, BridgeResult};

use ethers::types::{Address, H256};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[cfg(test)]
use mockall::automock;

/// Externally observable result of a deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub address: Address,
    pub contract: String,
    pub transaction_hash: Option<H256>,
}

/// Access to deployment records
#[cfg_attr(test, automock)]
pub trait DeploymentStore: Send + Sync {
    fn address_of(&self, network: &str, deployment: &str) -> BridgeResult<Address>;
    fn find(&self, network: &str, deployment: &str) -> BridgeResult<Option<DeploymentRecord>>;
    fn record(
        &self,
        network: &str,
        deployment: &str,
        record: &DeploymentRecord,
    ) -> BridgeResult<()>;
}

/// File-backed store under `deployments/<network>/<name>.json`
pub struct FileDeploymentStore {
    root: PathBuf,
}

impl FileDeploymentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, network: &str, deployment: &str) -> PathBuf {
        self.root.join(network).join(format!("{}.json", deployment))
    }

    fn read(&self, path: &Path) -> BridgeResult<DeploymentRecord> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Store(format!("read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| BridgeError::Store(format!("parse {}: {}", path.display(), e)))
    }
}

impl DeploymentStore for FileDeploymentStore {
    fn address_of(&self, network: &str, deployment: &str) -> BridgeResult<Address> {
        self.find(network, deployment)?
            .map(|record| record.address)
            .ok_or_else(|| BridgeError::DeploymentNotFound {
                deployment: deployment.to_string(),
                network: network.to_string(),
            })
    }

    fn find(&self, network: &str, deployment: &str) -> BridgeResult<Option<DeploymentRecord>> {
        let path = self.path(network, deployment);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(self.read(&path)?))
    }

    fn record(
        &self,
        network: &str,
        deployment: &str,
        record: &DeploymentRecord,
    ) -> BridgeResult<()> {
        let path = self.path(network, deployment);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BridgeError::Store(format!("mkdir {}: {}", parent.display(), e)))?;
        }
        let raw = serde_json::to_string_pretty(record)
            .map_err(|e| BridgeError::Store(format!("serialize record: {}", e)))?;
        std::fs::write(&path, raw)
            .map_err(|e| BridgeError::Store(format!("write {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDeploymentStore::new(dir.path());

        let record = DeploymentRecord {
            address: Address::repeat_byte(0x42),
            contract: "OFTUpgradeable".to_string(),
            transaction_hash: Some(H256::repeat_byte(0x01)),
        };
        store.record("arbitrum-mainnet", "SpellOFT", &record).unwrap();

        let address = store.address_of("arbitrum-mainnet", "SpellOFT").unwrap();
        assert_eq!(address, Address::repeat_byte(0x42));
    }

    #[test]
    fn test_find_returns_full_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDeploymentStore::new(dir.path());

        assert!(store.find("arbitrum-mainnet", "SpellOFT").unwrap().is_none());

        let record = DeploymentRecord {
            address: Address::repeat_byte(0x42),
            contract: "OFTUpgradeable".to_string(),
            transaction_hash: Some(H256::repeat_byte(0x01)),
        };
        store.record("arbitrum-mainnet", "SpellOFT", &record).unwrap();

        let found = store.find("arbitrum-mainnet", "SpellOFT").unwrap().unwrap();
        assert_eq!(found.transaction_hash, Some(H256::repeat_byte(0x01)));
    }

    #[test]
    fn test_missing_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDeploymentStore::new(dir.path());
        let err = store.address_of("ethereum-mainnet", "SpellOFT").unwrap_err();
        assert!(matches!(err, BridgeError::DeploymentNotFound { .. }));
    }
}
