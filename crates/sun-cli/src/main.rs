//! Sun CLI
//!
//! Command-line interface for the ledger client and the side-chain bridge.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sun_bridge::{BridgeCallOptions, CancellationToken, SendOutcome, SidechainBridge, SignOptions, SigningDomain};
use sun_client::{HttpTransport, LedgerClient, TxOptions};
use sun_core::Address;
use sun_crypto::PrivateKey;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{NodeEndpoints, SunConfig};

#[derive(Parser)]
#[command(name = "sun")]
#[command(version)]
#[command(about = "Sun ledger client and main chain / side chain bridge", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "~/.sun/sun.toml")]
    config: PathBuf,

    /// Hex private key; overrides the configured identity
    #[arg(long, global = true, env = "SUN_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new private key
    Keygen,

    /// Show an address in base58 and hex
    Address {
        /// Base58 or hex address
        address: String,
    },

    /// Transfer TRX
    SendTrx {
        /// Recipient address
        to: String,
        /// Amount in sun
        amount: i64,
        /// Send on the side chain
        #[arg(long)]
        side: bool,
        /// Co-sign under this permission id
        #[arg(long)]
        permission_id: Option<u32>,
    },

    /// Move value from the main chain to the side chain
    Deposit {
        #[command(subcommand)]
        asset: DepositCommands,
    },

    /// Move value from the side chain back to the main chain
    Withdraw {
        #[command(subcommand)]
        asset: WithdrawCommands,
    },

    /// Map a main-chain token deployment to the side chain
    Mapping {
        /// Deployment transaction hash
        trx_hash: String,
        /// Map a TRC721 instead of a TRC20
        #[arg(long)]
        trc721: bool,
        #[arg(long, default_value_t = 0)]
        fee: i64,
        #[command(flatten)]
        call: CallArgs,
    },

    /// Replay a stuck gateway operation by nonce
    Retry {
        #[command(subcommand)]
        target: RetryCommands,
    },

    /// Inject funds into the side chain fund
    InjectFund {
        amount: i64,
        #[arg(long)]
        fee_limit: Option<i64>,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
enum DepositCommands {
    Trx {
        amount: i64,
        #[arg(long, default_value_t = 0)]
        fee: i64,
        #[command(flatten)]
        call: CallArgs,
    },
    Trc10 {
        token_id: i64,
        amount: i64,
        #[arg(long, default_value_t = 0)]
        fee: i64,
        #[command(flatten)]
        call: CallArgs,
    },
    /// Approve the main gateway, then deposit
    Trc20 {
        contract: String,
        amount: i64,
        #[arg(long, default_value_t = 0)]
        fee: i64,
        #[command(flatten)]
        call: CallArgs,
    },
    /// Approve the main gateway, then deposit token `id`
    Trc721 {
        contract: String,
        id: i64,
        #[arg(long, default_value_t = 0)]
        fee: i64,
        #[command(flatten)]
        call: CallArgs,
    },
}

#[derive(Subcommand)]
enum WithdrawCommands {
    Trx {
        amount: i64,
        #[arg(long, default_value_t = 0)]
        fee: i64,
        #[command(flatten)]
        call: CallArgs,
    },
    Trc10 {
        token_id: i64,
        amount: i64,
        #[arg(long, default_value_t = 0)]
        fee: i64,
        #[command(flatten)]
        call: CallArgs,
    },
    /// Side-chain token contract
    Trc20 {
        contract: String,
        amount: i64,
        #[arg(long, default_value_t = 0)]
        fee: i64,
        #[command(flatten)]
        call: CallArgs,
    },
    Trc721 {
        contract: String,
        id: i64,
        #[arg(long, default_value_t = 0)]
        fee: i64,
        #[command(flatten)]
        call: CallArgs,
    },
}

#[derive(Subcommand)]
enum RetryCommands {
    Deposit {
        nonce: i64,
        #[arg(long, default_value_t = 0)]
        fee: i64,
        #[command(flatten)]
        call: CallArgs,
    },
    Withdraw {
        nonce: i64,
        #[arg(long, default_value_t = 0)]
        fee: i64,
        #[command(flatten)]
        call: CallArgs,
    },
    Mapping {
        nonce: i64,
        #[arg(long, default_value_t = 0)]
        fee: i64,
        #[command(flatten)]
        call: CallArgs,
    },
}

/// Flags shared by every gateway call
#[derive(Args)]
struct CallArgs {
    /// Fee limit in sun; defaults to the configured one
    #[arg(long)]
    fee_limit: Option<i64>,

    /// Co-sign under this permission id
    #[arg(long)]
    permission_id: Option<u32>,

    /// Wait for the execution receipt
    #[arg(long)]
    poll: bool,

    /// With --poll, print the receipt instead of the decoded result
    #[arg(long)]
    raw: bool,
}

impl CallArgs {
    fn options(&self, cancellation: &CancellationToken) -> BridgeCallOptions {
        BridgeCallOptions {
            permission_id: self.permission_id,
            should_poll_response: self.poll,
            raw_response: self.raw,
            cancellation: Some(cancellation.clone()),
            ..Default::default()
        }
    }
}

fn init_logging(verbose: bool, level: &str) {
    let default_level = if verbose { "debug" } else { level };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false))
        .init();
}

fn expand_path(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/")) {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

fn connect(endpoints: &NodeEndpoints, config: &SunConfig, key: Option<&PrivateKey>) -> anyhow::Result<LedgerClient> {
    let transport = HttpTransport::with_options(
        &endpoints.full_node,
        &endpoints.solidity_node,
        &endpoints.headers(),
        endpoints.timeout(),
    )
    .with_context(|| format!("connecting to {}", endpoints.full_node))?;

    let mut builder = LedgerClient::builder(Arc::new(transport)).fee_limit(config.client.fee_limit);
    if let Some(key) = key {
        builder = builder.private_key(key.clone());
    }
    Ok(builder.build())
}

fn identity(cli_key: Option<&str>, config: &SunConfig) -> anyhow::Result<Option<PrivateKey>> {
    cli_key
        .or(config.client.private_key.as_deref())
        .map(|hex| PrivateKey::from_hex(hex).context("Invalid private key provided"))
        .transpose()
}

fn report(outcome: SendOutcome) -> anyhow::Result<()> {
    match outcome {
        SendOutcome::Submitted(tx_id) => println!("txid: {}", tx_id),
        SendOutcome::Confirmed(result) => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = expand_path(&cli.config);
    let config = SunConfig::load(&config_path)
        .with_context(|| format!("loading configuration from {:?}", config_path))?;
    init_logging(cli.verbose, &config.logging.level);

    if let Commands::Config = cli.command {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let key = identity(cli.private_key.as_deref(), &config)?;
    let main_chain = connect(&config.main, &config, key.as_ref())?;
    let side_chain = connect(&config.side, &config, key.as_ref())?;
    let fee_limit = config.client.fee_limit;

    let cancellation = CancellationToken::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let bridge = || {
        SidechainBridge::new(main_chain.clone(), side_chain.clone(), &config.bridge.gateway_config())
            .context("invalid bridge configuration")
    };

    match cli.command {
        Commands::Keygen => {
            let key = PrivateKey::generate();
            let address = key.address();
            println!("Private key: {}", key.to_hex().as_str());
            println!("Address: {}", address.to_base58());
            println!("Hex: {}", address.to_hex());
        }

        Commands::Address { address } => {
            let address = Address::parse(&address).context("Invalid address provided")?;
            println!("Base58: {}", address.to_base58());
            println!("Hex: {}", address.to_hex());
        }

        Commands::SendTrx { to, amount, side, permission_id } => {
            let (client, domain) = if side {
                let gateways = config.bridge.gateway_config().validate()?;
                (&side_chain, SigningDomain::SideChain { chain_id: gateways.chain_id })
            } else {
                (&main_chain, SigningDomain::MainChain)
            };
            let key = key.clone().context("No private key available")?;

            let transaction = client
                .transaction_builder()
                .send_trx(&to, amount, None, &TxOptions::default())
                .await?;
            let sign_options = SignOptions {
                permission_id,
                ..Default::default()
            };
            let signed = sun_bridge::sign(client, transaction, &key, &domain, &sign_options).await?;
            let result = client.broadcast(&signed).await?;
            println!("txid: {}", result.txid);
        }

        Commands::Deposit { asset } => {
            let bridge = bridge()?;
            let outcome = match asset {
                DepositCommands::Trx { amount, fee, call } => {
                    bridge
                        .deposit_trx(amount, fee, call.fee_limit.unwrap_or(fee_limit), &call.options(&cancellation), None)
                        .await?
                }
                DepositCommands::Trc10 { token_id, amount, fee, call } => {
                    bridge
                        .deposit_trc10(token_id, amount, fee, call.fee_limit.unwrap_or(fee_limit), &call.options(&cancellation), None)
                        .await?
                }
                DepositCommands::Trc20 { contract, amount, fee, call } => {
                    bridge
                        .deposit_trc20(amount, fee, call.fee_limit.unwrap_or(fee_limit), &contract, &call.options(&cancellation), None)
                        .await?
                }
                DepositCommands::Trc721 { contract, id, fee, call } => {
                    bridge
                        .deposit_trc721(id, fee, call.fee_limit.unwrap_or(fee_limit), &contract, &call.options(&cancellation), None)
                        .await?
                }
            };
            report(outcome)?;
        }

        Commands::Withdraw { asset } => {
            let bridge = bridge()?;
            let outcome = match asset {
                WithdrawCommands::Trx { amount, fee, call } => {
                    bridge
                        .withdraw_trx(amount, fee, call.fee_limit.unwrap_or(fee_limit), &call.options(&cancellation), None)
                        .await?
                }
                WithdrawCommands::Trc10 { token_id, amount, fee, call } => {
                    bridge
                        .withdraw_trc10(token_id, amount, fee, call.fee_limit.unwrap_or(fee_limit), &call.options(&cancellation), None)
                        .await?
                }
                WithdrawCommands::Trc20 { contract, amount, fee, call } => {
                    bridge
                        .withdraw_trc20(amount, fee, call.fee_limit.unwrap_or(fee_limit), &contract, &call.options(&cancellation), None)
                        .await?
                }
                WithdrawCommands::Trc721 { contract, id, fee, call } => {
                    bridge
                        .withdraw_trc721(id, fee, call.fee_limit.unwrap_or(fee_limit), &contract, &call.options(&cancellation), None)
                        .await?
                }
            };
            report(outcome)?;
        }

        Commands::Mapping { trx_hash, trc721, fee, call } => {
            let bridge = bridge()?;
            let limit = call.fee_limit.unwrap_or(fee_limit);
            let options = call.options(&cancellation);
            let outcome = if trc721 {
                bridge.mapping_trc721(&trx_hash, fee, limit, &options, None).await?
            } else {
                bridge.mapping_trc20(&trx_hash, fee, limit, &options, None).await?
            };
            report(outcome)?;
        }

        Commands::Retry { target } => {
            let bridge = bridge()?;
            let outcome = match target {
                RetryCommands::Deposit { nonce, fee, call } => {
                    bridge
                        .retry_deposit(nonce, fee, call.fee_limit.unwrap_or(fee_limit), &call.options(&cancellation), None)
                        .await?
                }
                RetryCommands::Withdraw { nonce, fee, call } => {
                    bridge
                        .retry_withdraw(nonce, fee, call.fee_limit.unwrap_or(fee_limit), &call.options(&cancellation), None)
                        .await?
                }
                RetryCommands::Mapping { nonce, fee, call } => {
                    bridge
                        .retry_mapping(nonce, fee, call.fee_limit.unwrap_or(fee_limit), &call.options(&cancellation), None)
                        .await?
                }
            };
            report(outcome)?;
        }

        Commands::InjectFund { amount, fee_limit: limit } => {
            let tx_id = bridge()?
                .inject_fund(amount, limit.unwrap_or(fee_limit), None)
                .await?;
            println!("txid: {}", tx_id);
        }

        Commands::Config => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_deposit_with_poll() {
        let cli = Cli::try_parse_from([
            "sun", "deposit", "trc20", "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t", "100", "--fee-limit", "10000000", "--poll",
        ])
        .unwrap();
        let Commands::Deposit { asset: DepositCommands::Trc20 { contract, amount, fee, call } } = cli.command else {
            panic!("unexpected command");
        };
        assert_eq!(contract, "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t");
        assert_eq!(amount, 100);
        assert_eq!(fee, 0);
        assert_eq!(call.fee_limit, Some(10_000_000));

        let options = call.options(&CancellationToken::new());
        assert!(options.should_poll_response);
        assert!(!options.raw_response);
        assert!(options.fee_limit.is_none());
    }

    #[test]
    fn test_expand_path() {
        let plain = PathBuf::from("sun.toml");
        assert_eq!(expand_path(&plain), plain);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path(Path::new("~/.sun/sun.toml")), home.join(".sun/sun.toml"));
        }
    }

    #[test]
    fn test_cli_key_wins_over_config() {
        let mut config = SunConfig::default();
        config.client.private_key = Some(format!("{:064x}", 1));
        let cli_key = format!("{:064x}", 2);

        let chosen = identity(Some(&cli_key), &config).unwrap().unwrap();
        assert_eq!(chosen.to_hex().as_str(), cli_key);
        assert!(identity(Some("zz"), &config).is_err());
        assert!(identity(None, &SunConfig::default()).unwrap().is_none());
    }
}
