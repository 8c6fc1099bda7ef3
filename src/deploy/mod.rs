//! Deployment driver
//!
//! Consumes one token deployment descriptor entry for the targeted network,
//! resolves the messaging endpoint from the endpoint directory, deploys the
//! configured variant deterministically through the CREATE2 factory, and
//! wires the fee handler when the descriptor binds one.

pub mod artifacts;
pub mod create2;
pub mod store;

use crate::abi;
use crate::chain::ChainClient;
use crate::config::{DeploymentVariant, Settings};
use crate::error::{BridgeError, BridgeResult};

use self::artifacts::ArtifactStore;
use self::store::{DeploymentRecord, DeploymentStore};
use ethers::types::{Address, H256, U256};
use tracing::{error, info};

/// Well-known service name in the endpoint directory
pub const ENDPOINT_SERVICE: &str = "EndpointV2";

/// Contract role for the locking adapter variant
pub const ADAPTER_CONTRACT: &str = "OFTAdapterUpgradeable";
/// Contract role for the native omnichain token variant
pub const NATIVE_CONTRACT: &str = "OFTUpgradeable";
/// Fee handler contract
pub const FEE_HANDLER_CONTRACT: &str = "FeeHandler";

/// Outcome of the fee-handler wiring step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeeHandlerStatus {
    /// Descriptor binds no handler (absent or zero address)
    NotConfigured,
    Wired,
    /// Wiring failed; the contract is live but the handler must be set out
    /// of band. The deployment itself is not rolled back.
    Failed(String),
}

/// Handle to a deployed contract
#[derive(Debug, Clone)]
pub struct Deployment {
    pub address: Address,
    pub transaction_hash: Option<H256>,
    /// True when code already existed at the derived address and the
    /// creation transaction was skipped
    pub reused: bool,
    pub fee_handler: FeeHandlerStatus,
}

pub struct DeploymentDriver<'a> {
    settings: &'a Settings,
    client: &'a dyn ChainClient,
    artifacts: &'a dyn ArtifactStore,
    store: &'a dyn DeploymentStore,
}

impl<'a> DeploymentDriver<'a> {
    pub fn new(
        settings: &'a Settings,
        client: &'a dyn ChainClient,
        artifacts: &'a dyn ArtifactStore,
        store: &'a dyn DeploymentStore,
    ) -> Self {
        Self {
            settings,
            client,
            artifacts,
            store,
        }
    }

    /// Deploy the variant configured for (token, network)
    pub async fn deploy_token(&self, symbol: &str, network_id: &str) -> BridgeResult<Deployment> {
        let endpoint = self.settings.endpoint(network_id, ENDPOINT_SERVICE)?;
        let token = self.settings.token(symbol)?;
        let entry = self.settings.variant(symbol, network_id)?;
        let owner = self.settings.network(network_id)?.owner;

        let (contract, constructor_args, init_call) = match &entry.variant {
            DeploymentVariant::Adapter { underlying } => (
                ADAPTER_CONTRACT,
                abi::adapter_constructor(*underlying, endpoint),
                abi::initialize_adapter(owner),
            ),
            DeploymentVariant::Native { name, symbol: ticker } => (
                NATIVE_CONTRACT,
                abi::native_constructor(endpoint),
                abi::initialize_native(name, ticker, owner),
            ),
        };

        let init_code =
            self.artifacts
                .proxy_init_code(contract, &constructor_args, &init_call, owner)?;
        let salt = create2::salt_bytes(&token.salt)?;
        let factory = self.settings.deploy.create2_factory;
        let address = create2::derive_address(factory, salt, &init_code);

        info!(
            token = symbol,
            network = network_id,
            contract = contract,
            ?address,
            "deploying {}",
            token.deployment_name
        );

        // The salt-derived address makes redeployment a no-op; reuse the
        // live contract instead of resubmitting identical creation code.
        let existing = self.client.code_at(address).await?;
        let (reused, transaction_hash) = if existing.is_empty() {
            let receipt = self
                .client
                .send(factory, create2::deploy_data(salt, &init_code), U256::zero())
                .await?;
            info!(tx_hash = ?receipt.transaction_hash, "deployment confirmed");
            (false, Some(receipt.transaction_hash))
        } else {
            info!(?address, "contract already deployed, reusing");
            // An earlier run may have recorded the creation hash; keep it.
            let prior = self.store.find(network_id, &token.deployment_name)?;
            (true, prior.and_then(|r| r.transaction_hash))
        };

        if !reused || transaction_hash.is_none() {
            self.store.record(
                network_id,
                &token.deployment_name,
                &DeploymentRecord {
                    address,
                    contract: contract.to_string(),
                    transaction_hash,
                },
            )?;
        }

        let fee_handler = self.wire_fee_handler(address, entry.fee_handler_binding()).await;

        Ok(Deployment {
            address,
            transaction_hash,
            reused,
            fee_handler,
        })
    }

    /// Deploy the fee handler configured for a network. Not deterministic;
    /// fee handlers are per-network singletons referenced by address.
    pub async fn deploy_fee_handler(&self, network_id: &str) -> BridgeResult<Deployment> {
        self.settings.network(network_id)?;
        let config = self.settings.fee_handler(network_id)?;

        let constructor_args = abi::fee_handler_constructor(config);
        let init_code = self
            .artifacts
            .init_code(FEE_HANDLER_CONTRACT, &constructor_args)?;

        info!(network = network_id, "deploying {}", FEE_HANDLER_CONTRACT);

        let receipt = self.client.deploy(init_code.into()).await?;
        let address = receipt.contract_address.ok_or_else(|| BridgeError::Rpc {
            network: network_id.to_string(),
            message: "creation receipt carries no contract address".to_string(),
        })?;

        self.store.record(
            network_id,
            FEE_HANDLER_CONTRACT,
            &DeploymentRecord {
                address,
                contract: FEE_HANDLER_CONTRACT.to_string(),
                transaction_hash: Some(receipt.transaction_hash),
            },
        )?;

        Ok(Deployment {
            address,
            transaction_hash: Some(receipt.transaction_hash),
            reused: false,
            fee_handler: FeeHandlerStatus::NotConfigured,
        })
    }

    /// Wire the fee handler when the binding is present and non-zero.
    /// Failure here does not roll back the deployment.
    async fn wire_fee_handler(
        &self,
        contract: Address,
        binding: Option<Address>,
    ) -> FeeHandlerStatus {
        let Some(handler) = binding else {
            return FeeHandlerStatus::NotConfigured;
        };

        match self
            .client
            .send(contract, abi::set_fee_handler(handler), U256::zero())
            .await
        {
            Ok(receipt) => {
                info!(?handler, tx_hash = ?receipt.transaction_hash, "fee handler wired");
                FeeHandlerStatus::Wired
            }
            Err(e) => {
                error!(
                    ?handler,
                    ?contract,
                    "fee handler wiring failed, set it manually: {}", e
                );
                FeeHandlerStatus::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainClient;
    use ethers::types::{Bytes, TransactionReceipt};
    use super::artifacts::MockArtifactStore;
    use super::store::MockDeploymentStore;

    const SAMPLE: &str = r#"
        [networks.ethereum-mainnet]
        eid = 30101
        rpc_url = "http://localhost:8545"
        owner = "0xDF2C270f610Dc35d8fFDA5B453E74db5471E126B"

        [networks.arbitrum-mainnet]
        eid = 30110
        rpc_url = "http://localhost:8546"
        owner = "0xA71A021EF66B03E45E0d85590432DFCfa1b7174C"

        [endpoints.ethereum-mainnet]
        EndpointV2 = "0x1a44076050125825900e736c501f859c50fE728c"

        [endpoints.arbitrum-mainnet]
        EndpointV2 = "0x1a44076050125825900e736c501f859c50fE728c"

        [tokens.SPELL]
        decimals = 18
        deployment_name = "SpellOFT"
        salt = "spell-oft-1734060795"

        [tokens.SPELL.networks.ethereum-mainnet]
        type = "adapter"
        underlying = "0x090185f2135308BaD17527004364eBcC2D37e5F6"
        fee_handler = "0xe4aec83Cba57E2B0b9ED8bc9801123F44f393037"

        [tokens.SPELL.networks.arbitrum-mainnet]
        type = "native"
        name = "SPELL"
        symbol = "SPELL"
        fee_handler = "0x0000000000000000000000000000000000000000"

        [fee_handlers.ethereum-mainnet]
        fixed_native_fee = 0
        oracle = "0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419"
        yields = "0x60C801e2dfd6298E6080214b3d680C8f8d698F48"
        quote_type = 0
        ops = "0xDF2C270f610Dc35d8fFDA5B453E74db5471E126B"
    "#;

    fn settings() -> Settings {
        Settings::from_toml(SAMPLE).unwrap()
    }

    fn stub_artifacts() -> MockArtifactStore {
        let mut artifacts = MockArtifactStore::new();
        artifacts
            .expect_proxy_init_code()
            .returning(|_, _, _, _| Ok(vec![0x60, 0x80]));
        artifacts
            .expect_init_code()
            .returning(|_, _| Ok(vec![0x60, 0x80]));
        artifacts
    }

    fn stub_store() -> MockDeploymentStore {
        let mut store = MockDeploymentStore::new();
        store.expect_record().returning(|_, _, _| Ok(()));
        store
    }

    fn predicted(settings: &Settings) -> Address {
        let salt = create2::salt_bytes("spell-oft-1734060795").unwrap();
        create2::derive_address(settings.deploy.create2_factory, salt, &[0x60, 0x80])
    }

    #[tokio::test]
    async fn test_deploy_wires_fee_handler_when_bound() {
        let settings = settings();
        let factory = settings.deploy.create2_factory;
        let target = predicted(&settings);

        let mut client = MockChainClient::new();
        client
            .expect_code_at()
            .returning(|_| Ok(Bytes::default()));
        client
            .expect_send()
            .withf(move |to, _, _| *to == factory)
            .times(1)
            .returning(|_, _, _| Ok(TransactionReceipt::default()));
        client
            .expect_send()
            .withf(move |to, _, _| *to == target)
            .times(1)
            .returning(|_, _, _| Ok(TransactionReceipt::default()));

        let artifacts = stub_artifacts();
        let store = stub_store();
        let driver = DeploymentDriver::new(&settings, &client, &artifacts, &store);

        let deployment = driver
            .deploy_token("SPELL", "ethereum-mainnet")
            .await
            .unwrap();
        assert_eq!(deployment.address, target);
        assert!(!deployment.reused);
        assert_eq!(deployment.fee_handler, FeeHandlerStatus::Wired);
    }

    #[tokio::test]
    async fn test_zero_binding_means_zero_wiring_transactions() {
        let settings = settings();
        let factory = settings.deploy.create2_factory;

        let mut client = MockChainClient::new();
        client
            .expect_code_at()
            .returning(|_| Ok(Bytes::default()));
        // Only the creation transaction; wiring must not be attempted for a
        // zero-address binding.
        client
            .expect_send()
            .withf(move |to, _, _| *to == factory)
            .times(1)
            .returning(|_, _, _| Ok(TransactionReceipt::default()));

        let artifacts = stub_artifacts();
        let store = stub_store();
        let driver = DeploymentDriver::new(&settings, &client, &artifacts, &store);

        let deployment = driver
            .deploy_token("SPELL", "arbitrum-mainnet")
            .await
            .unwrap();
        assert_eq!(deployment.fee_handler, FeeHandlerStatus::NotConfigured);
    }

    #[tokio::test]
    async fn test_wiring_failure_keeps_deployment() {
        let settings = settings();
        let factory = settings.deploy.create2_factory;
        let target = predicted(&settings);

        let mut client = MockChainClient::new();
        client
            .expect_code_at()
            .returning(|_| Ok(Bytes::default()));
        client
            .expect_send()
            .withf(move |to, _, _| *to == factory)
            .returning(|_, _, _| Ok(TransactionReceipt::default()));
        client
            .expect_send()
            .withf(move |to, _, _| *to == target)
            .returning(|_, _, _| {
                Err(BridgeError::Reverted {
                    network: "ethereum-mainnet".to_string(),
                    tx_hash: "0xdead".to_string(),
                })
            });

        let artifacts = stub_artifacts();
        let store = stub_store();
        let driver = DeploymentDriver::new(&settings, &client, &artifacts, &store);

        let deployment = driver
            .deploy_token("SPELL", "ethereum-mainnet")
            .await
            .unwrap();
        assert!(matches!(deployment.fee_handler, FeeHandlerStatus::Failed(_)));
        assert_eq!(deployment.address, target);
    }

    #[tokio::test]
    async fn test_rerun_reuses_live_contract() {
        let settings = settings();

        let mut client = MockChainClient::new();
        client
            .expect_code_at()
            .returning(|_| Ok(Bytes::from(vec![0xFE])));
        // No creation transaction at all on the reuse path

        let artifacts = stub_artifacts();
        let mut store = MockDeploymentStore::new();
        store.expect_find().times(1).returning(|_, _| Ok(None));
        // With no prior record the reuse still gets one, without a hash
        store
            .expect_record()
            .withf(|_, _, record| record.transaction_hash.is_none())
            .times(1)
            .returning(|_, _, _| Ok(()));
        let driver = DeploymentDriver::new(&settings, &client, &artifacts, &store);

        let deployment = driver
            .deploy_token("SPELL", "arbitrum-mainnet")
            .await
            .unwrap();
        assert!(deployment.reused);
        assert!(deployment.transaction_hash.is_none());
    }

    #[tokio::test]
    async fn test_rerun_keeps_recorded_creation_hash() {
        let settings = settings();
        let target = predicted(&settings);
        let creation_hash = H256::repeat_byte(0x0C);

        let mut client = MockChainClient::new();
        client
            .expect_code_at()
            .returning(|_| Ok(Bytes::from(vec![0xFE])));

        let artifacts = stub_artifacts();
        let mut store = MockDeploymentStore::new();
        store.expect_find().times(1).returning(move |_, _| {
            Ok(Some(DeploymentRecord {
                address: target,
                contract: NATIVE_CONTRACT.to_string(),
                transaction_hash: Some(creation_hash),
            }))
        });
        // The record from the original run must not be rewritten

        let driver = DeploymentDriver::new(&settings, &client, &artifacts, &store);
        let deployment = driver
            .deploy_token("SPELL", "arbitrum-mainnet")
            .await
            .unwrap();
        assert!(deployment.reused);
        assert_eq!(deployment.transaction_hash, Some(creation_hash));
    }

    #[tokio::test]
    async fn test_unconfigured_pair_fails_before_any_chain_call() {
        let settings = settings();
        let client = MockChainClient::new();
        let artifacts = MockArtifactStore::new();
        let store = MockDeploymentStore::new();
        let driver = DeploymentDriver::new(&settings, &client, &artifacts, &store);

        let err = driver.deploy_token("MIM", "ethereum-mainnet").await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_fee_handler_deployment_records_created_address() {
        let settings = settings();

        let mut client = MockChainClient::new();
        client.expect_deploy().times(1).returning(|_| {
            let receipt = TransactionReceipt {
                contract_address: Some(Address::repeat_byte(0x77)),
                ..Default::default()
            };
            Ok(receipt)
        });

        let artifacts = stub_artifacts();
        let mut store = MockDeploymentStore::new();
        store
            .expect_record()
            .withf(|network, name, record| {
                network == "ethereum-mainnet"
                    && name == FEE_HANDLER_CONTRACT
                    && record.address == Address::repeat_byte(0x77)
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let driver = DeploymentDriver::new(&settings, &client, &artifacts, &store);
        let deployment = driver.deploy_fee_handler("ethereum-mainnet").await.unwrap();
        assert_eq!(deployment.address, Address::repeat_byte(0x77));
    }
}
