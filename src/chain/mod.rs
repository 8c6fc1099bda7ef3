//! Chain client seam over the RPC/signing stack
//!
//! All on-chain interaction goes through the [`ChainClient`] trait so the
//! deployment driver and transfer orchestrator can be exercised against a
//! mock. The production implementation wraps an ethers signer middleware and
//! blocks on the configured confirmation depth for every submitted
//! transaction. No timeout is enforced on confirmation waits; a hung RPC
//! stalls the run.

use crate::error::{BridgeError, BridgeResult};

use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionReceipt, TransactionRequest, U256};
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

/// On-chain operations needed by the driver and orchestrator
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address of the operator wallet
    fn sender(&self) -> Address;

    /// Read-only contract call
    async fn call(&self, to: Address, data: Bytes) -> BridgeResult<Bytes>;

    /// Submit a transaction and wait for the configured confirmation depth.
    /// Errors if the transaction reverts or is dropped.
    async fn send(
        &self,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> BridgeResult<TransactionReceipt>;

    /// Submit a contract-creation transaction and wait for confirmation
    async fn deploy(&self, init_code: Bytes) -> BridgeResult<TransactionReceipt>;

    /// Code currently deployed at an address (empty if none)
    async fn code_at(&self, address: Address) -> BridgeResult<Bytes>;
}

/// Production client over an HTTP provider and a local wallet
pub struct EthersChainClient {
    inner: SignerMiddleware<Provider<Http>, LocalWallet>,
    network: String,
    confirmations: usize,
}

impl EthersChainClient {
    /// Connect to a network RPC and bind the operator wallet to its chain id
    pub async fn connect(
        network: &str,
        rpc_url: &str,
        confirmations: usize,
    ) -> BridgeResult<Self> {
        let provider = Provider::<Http>::try_from(rpc_url).map_err(|e| BridgeError::Rpc {
            network: network.to_string(),
            message: format!("invalid RPC url: {}", e),
        })?;

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| BridgeError::Rpc {
                network: network.to_string(),
                message: e.to_string(),
            })?;

        let wallet = load_wallet()?.with_chain_id(chain_id.as_u64());
        info!(
            network = network,
            wallet = ?wallet.address(),
            "chain client connected"
        );

        Ok(Self {
            inner: SignerMiddleware::new(provider, wallet),
            network: network.to_string(),
            confirmations,
        })
    }

    fn rpc_error(&self, message: impl ToString) -> BridgeError {
        BridgeError::Rpc {
            network: self.network.clone(),
            message: message.to_string(),
        }
    }

    async fn submit(&self, tx: TransactionRequest) -> BridgeResult<TransactionReceipt> {
        let pending = self
            .inner
            .send_transaction(tx, None)
            .await
            .map_err(|e| self.rpc_error(e))?;

        let tx_hash = pending.tx_hash();
        debug!(network = %self.network, ?tx_hash, "transaction submitted");

        let receipt = pending
            .confirmations(self.confirmations)
            .await
            .map_err(|e| self.rpc_error(e))?
            .ok_or(BridgeError::Dropped {
                network: self.network.clone(),
            })?;

        if receipt.status != Some(1.into()) {
            return Err(BridgeError::Reverted {
                network: self.network.clone(),
                tx_hash: format!("{:?}", receipt.transaction_hash),
            });
        }

        Ok(receipt)
    }
}

#[async_trait]
impl ChainClient for EthersChainClient {
    fn sender(&self) -> Address {
        self.inner.signer().address()
    }

    async fn call(&self, to: Address, data: Bytes) -> BridgeResult<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        self.inner
            .call(&tx, None)
            .await
            .map_err(|e| self.rpc_error(e))
    }

    async fn send(
        &self,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> BridgeResult<TransactionReceipt> {
        let tx = TransactionRequest::new()
            .from(self.sender())
            .to(to)
            .data(data)
            .value(value);
        self.submit(tx).await
    }

    async fn deploy(&self, init_code: Bytes) -> BridgeResult<TransactionReceipt> {
        let tx = TransactionRequest::new()
            .from(self.sender())
            .data(init_code);
        self.submit(tx).await
    }

    async fn code_at(&self, address: Address) -> BridgeResult<Bytes> {
        self.inner
            .get_code(address, None)
            .await
            .map_err(|e| self.rpc_error(e))
    }
}

/// Load the operator wallet from the environment
fn load_wallet() -> BridgeResult<LocalWallet> {
    if let Ok(key) = std::env::var("PRIVATE_KEY") {
        return key
            .parse::<LocalWallet>()
            .map_err(|e| BridgeError::Wallet(format!("Invalid private key: {}", e)));
    }

    Err(BridgeError::Wallet(
        "No wallet configured. Set the PRIVATE_KEY environment variable".to_string(),
    ))
}
