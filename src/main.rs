//! omnibridge - deployment and bridging for omnichain fungible tokens
//!
//! Deploys per-network token variants (locking adapter on the home network,
//! native omnichain token elsewhere) deterministically through a CREATE2
//! factory, and drives cross-chain transfers through the messaging layer
//! with fee quoting, allowance management and an explicit operator
//! confirmation before anything is sent.

use anyhow::Result;
use clap::{Parser, Subcommand};
use ethers::types::Address;
use ethers::utils::format_ether;
use std::io::{self, Write};
use tracing::info;

mod abi;
mod bridge;
mod chain;
mod config;
mod deploy;
mod error;

use bridge::{Confirmation, TransferOrchestrator, TransferOutcome, TransferRequest, TransferSummary};
use chain::EthersChainClient;
use config::Settings;
use deploy::artifacts::FileArtifactStore;
use deploy::store::FileDeploymentStore;
use deploy::{DeploymentDriver, FeeHandlerStatus};
use error::{BridgeError, BridgeResult};

#[derive(Parser)]
#[command(
    name = "omnibridge",
    version,
    about = "Deploy and bridge omnichain fungible tokens"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deploy the configured variant of a token on a network
    Deploy {
        /// Token symbol (e.g. SPELL)
        #[arg(long)]
        token: String,
        /// Target network id
        #[arg(long)]
        network: String,
    },
    /// Deploy the fee handler configured for a network
    DeployFeeHandler {
        #[arg(long)]
        network: String,
    },
    /// Bridge tokens from the connected network to a destination chain
    Bridge {
        /// Token symbol to bridge (e.g. SPELL, bSPELL)
        #[arg(long)]
        token: String,
        /// Network the operator is connected to
        #[arg(long)]
        network: String,
        /// Destination chain name (e.g. arbitrum-mainnet)
        #[arg(long)]
        dst_chain: String,
        /// Recipient address
        #[arg(long)]
        to: String,
        /// Amount of tokens to send, human readable
        #[arg(long)]
        amount: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let settings = Settings::load()?;
    info!(
        "Loaded configuration for {} networks, {} tokens",
        settings.networks.len(),
        settings.tokens.len()
    );

    match cli.command {
        Command::Deploy { token, network } => {
            let client = connect(&settings, &network).await?;
            let artifacts = FileArtifactStore::new("artifacts");
            let store = FileDeploymentStore::new("deployments");
            let driver = DeploymentDriver::new(&settings, &client, &artifacts, &store);

            let deployment = driver.deploy_token(&token, &network).await?;
            if deployment.reused {
                println!("{} already deployed at {:?}", token, deployment.address);
            } else {
                println!("{} deployed at {:?}", token, deployment.address);
            }
            if let FeeHandlerStatus::Failed(reason) = &deployment.fee_handler {
                println!(
                    "Warning: fee handler not wired ({}); set it manually",
                    reason
                );
            }
        }
        Command::DeployFeeHandler { network } => {
            let client = connect(&settings, &network).await?;
            let artifacts = FileArtifactStore::new("artifacts");
            let store = FileDeploymentStore::new("deployments");
            let driver = DeploymentDriver::new(&settings, &client, &artifacts, &store);

            let deployment = driver.deploy_fee_handler(&network).await?;
            println!("FeeHandler deployed at {:?}", deployment.address);
        }
        Command::Bridge {
            token,
            network,
            dst_chain,
            to,
            amount,
        } => {
            let recipient: Address = to.parse().map_err(|e| BridgeError::InvalidAddress {
                value: to.clone(),
                message: format!("{}", e),
            })?;

            let client = connect(&settings, &network).await?;
            let store = FileDeploymentStore::new("deployments");
            let confirmation = StdinConfirmation;
            let orchestrator =
                TransferOrchestrator::new(&settings, &client, &store, &confirmation);

            let request = TransferRequest {
                token,
                source_network: network,
                destination_network: dst_chain,
                recipient,
                amount,
            };

            match orchestrator.run(&request).await? {
                TransferOutcome::Settled {
                    tx_hash,
                    native_fee,
                } => {
                    println!("Bridge transaction successful!");
                    println!("Transaction: https://layerzeroscan.com/tx/{:?}", tx_hash);
                    println!("Native fee paid: {}", format_ether(native_fee));
                }
                TransferOutcome::Aborted => {
                    println!("Bridge operation cancelled");
                }
            }
        }
    }

    Ok(())
}

async fn connect(settings: &Settings, network: &str) -> BridgeResult<EthersChainClient> {
    let config = settings.network(network)?;
    EthersChainClient::connect(network, &config.rpc_url, settings.deploy.confirmations).await
}

/// Interactive y/N confirmation on stdin
struct StdinConfirmation;

impl Confirmation for StdinConfirmation {
    fn confirm(&self, summary: &TransferSummary) -> BridgeResult<bool> {
        println!();
        println!("Bridge Details:");
        println!(
            "- From: {} (EID: {})",
            summary.source_network, summary.source_eid
        );
        println!(
            "- To: {} (EID: {})",
            summary.destination_network, summary.destination_eid
        );
        println!("- Token: {}", summary.token);
        println!("- Amount: {} {}", summary.amount, summary.token);
        println!("- Recipient: {:?}", summary.recipient);
        println!("- Bridge Fee: {} native", format_ether(summary.native_fee));
        println!("- Contract: {:?}", summary.contract);
        println!();
        print!("Do you want to proceed? [y/N]: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let answer = input.trim();
        Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,omnibridge=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
