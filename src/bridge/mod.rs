//! Bridge transfer orchestrator
//!
//! Drives a single cross-chain transfer through an explicit state machine:
//! Resolving -> Quoting -> ApprovalCheck -> Confirming -> Sending, ending in
//! Settled, Aborted or Failed. Each run is independent and stateless; the
//! messaging layer takes over asynchronous delivery after Sending, which
//! this tool does not observe.
//!
//! The fee quote obtained in Quoting is reused as-is in Sending. Fees can
//! move in between; that risk is accepted rather than mitigated.

pub mod options;

use crate::abi::{self, MessagingFee, SendParam};
use crate::chain::ChainClient;
use crate::config::{DeploymentVariant, Settings};
use crate::deploy::store::DeploymentStore;
use crate::error::{BridgeError, BridgeResult};

use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::parse_units;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

/// A single transfer request
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub token: String,
    /// Network the operator is currently connected to
    pub source_network: String,
    pub destination_network: String,
    pub recipient: Address,
    /// Human-readable decimal amount
    pub amount: String,
}

/// Workflow states of one transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Resolving,
    Quoting,
    ApprovalCheck,
    Confirming,
    Sending,
    Settled,
    Aborted,
    Failed,
}

/// Details presented to the operator before sending
#[derive(Debug, Clone)]
pub struct TransferSummary {
    pub token: String,
    pub source_network: String,
    pub source_eid: u32,
    pub destination_network: String,
    pub destination_eid: u32,
    pub recipient: Address,
    pub amount: String,
    pub native_fee: U256,
    pub contract: Address,
}

/// Pre-send approval seam; the orchestrator never reaches Sending without an
/// explicit affirmative answer
#[cfg_attr(test, automock)]
pub trait Confirmation: Send + Sync {
    fn confirm(&self, summary: &TransferSummary) -> BridgeResult<bool>;
}

/// Terminal result of a transfer run
#[derive(Debug, Clone)]
pub enum TransferOutcome {
    Settled { tx_hash: H256, native_fee: U256 },
    /// Operator declined the confirmation prompt; no on-chain effect
    Aborted,
}

pub struct TransferOrchestrator<'a> {
    settings: &'a Settings,
    client: &'a dyn ChainClient,
    store: &'a dyn DeploymentStore,
    confirmation: &'a dyn Confirmation,
}

impl<'a> TransferOrchestrator<'a> {
    pub fn new(
        settings: &'a Settings,
        client: &'a dyn ChainClient,
        store: &'a dyn DeploymentStore,
        confirmation: &'a dyn Confirmation,
    ) -> Self {
        Self {
            settings,
            client,
            store,
            confirmation,
        }
    }

    /// Run the transfer workflow end to end
    pub async fn run(&self, request: &TransferRequest) -> BridgeResult<TransferOutcome> {
        self.transition(TransferState::Resolving);
        if request.source_network == request.destination_network {
            return Err(BridgeError::InvalidDescriptor(
                "source and destination network must differ".to_string(),
            ));
        }
        let source = self.settings.network(&request.source_network)?;
        let destination = self.settings.network(&request.destination_network)?;
        let token = self.settings.token(&request.token)?;
        let entry = self.settings.variant(&request.token, &request.source_network)?;
        let oft = self
            .store
            .address_of(&request.source_network, &token.deployment_name)?;

        self.transition(TransferState::Quoting);
        let amount = parse_amount(&request.amount, token.decimals)?;
        let param = SendParam {
            dst_eid: destination.eid,
            to: abi::address_to_bytes32(request.recipient),
            amount_ld: amount,
            // Zero slippage tolerance: the floor equals the requested amount
            min_amount_ld: amount,
            extra_options: options::lz_receive_option(options::DEFAULT_LZ_RECEIVE_GAS, 0),
            compose_msg: Bytes::default(),
            oft_cmd: Bytes::default(),
        };
        let output = self.client.call(oft, abi::quote_send(&param)).await?;
        let fee = abi::decode_messaging_fee(&output)?;
        debug!(native_fee = %fee.native_fee, "fee quoted");

        // Only the locking adapter moves the underlying token and needs an
        // allowance; native variants mint and burn directly.
        if let DeploymentVariant::Adapter { underlying } = &entry.variant {
            self.transition(TransferState::ApprovalCheck);
            self.ensure_allowance(*underlying, oft, amount).await?;
        }

        self.transition(TransferState::Confirming);
        let summary = TransferSummary {
            token: request.token.clone(),
            source_network: request.source_network.clone(),
            source_eid: source.eid,
            destination_network: request.destination_network.clone(),
            destination_eid: destination.eid,
            recipient: request.recipient,
            amount: request.amount.clone(),
            native_fee: fee.native_fee,
            contract: oft,
        };
        if !self.confirmation.confirm(&summary)? {
            self.transition(TransferState::Aborted);
            return Ok(TransferOutcome::Aborted);
        }

        self.transition(TransferState::Sending);
        match self.send(oft, &param, &fee).await {
            Ok(tx_hash) => {
                self.transition(TransferState::Settled);
                Ok(TransferOutcome::Settled {
                    tx_hash,
                    native_fee: fee.native_fee,
                })
            }
            Err(e) => {
                self.transition(TransferState::Failed);
                Err(e)
            }
        }
    }

    /// Approve exactly the requested amount when the current allowance falls
    /// short; otherwise leave the allowance untouched
    async fn ensure_allowance(
        &self,
        underlying: Address,
        spender: Address,
        amount: U256,
    ) -> BridgeResult<()> {
        let output = self
            .client
            .call(underlying, abi::allowance(self.client.sender(), spender))
            .await?;
        let allowance = abi::decode_uint(&output)?;
        debug!(%allowance, %amount, "allowance checked");

        if allowance < amount {
            info!(?spender, "approving tokens to the adapter");
            self.client
                .send(underlying, abi::approve(spender, amount), U256::zero())
                .await?;
            info!("approval confirmed");
        }
        Ok(())
    }

    async fn send(
        &self,
        oft: Address,
        param: &SendParam,
        fee: &MessagingFee,
    ) -> BridgeResult<H256> {
        let data = abi::send(param, fee, self.client.sender());
        let receipt = self.client.send(oft, data, fee.native_fee).await?;
        Ok(receipt.transaction_hash)
    }

    fn transition(&self, state: TransferState) {
        debug!(state = ?state, "transfer state");
    }
}

/// Convert a human-readable decimal amount into the token's native integer
/// precision
pub fn parse_amount(value: &str, decimals: u8) -> BridgeResult<U256> {
    parse_units(value, u32::from(decimals))
        .map(Into::into)
        .map_err(|e| BridgeError::InvalidAmount {
            value: value.to_string(),
            message: e.to_string(),
        })
}
