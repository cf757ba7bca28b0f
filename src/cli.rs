use std::io::Write;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use alloy::providers::ProviderBuilder;
use bonddesk_evm::ProviderEvm;
use bonddesk_evm::local::connect_http;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use crate::actions::{BondActions, BondAsset, CalcBondDetails, ChangeApproval, RedeemBond};
use crate::bond::BondKey;
use crate::chain::{BondChain, BondSigner, ChainReader, WalletSigner};
use crate::config::{Ctx, Env};
use crate::store::Dispatcher;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Slippage must not be negative, got {value}%")]
    NegativeSlippage { value: Decimal },
    #[error("Amount must not be empty")]
    EmptyAmount,
    #[error("No account given. Pass --address or configure a private key")]
    MissingAccount,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Allow a bond to spend its reserve token
    Approve {
        /// Bond key (e.g., mai, mai_clam)
        #[arg(short = 'b', long = "bond")]
        bond: String,
    },
    /// Show pricing details of a bond
    Details {
        #[arg(short = 'b', long = "bond")]
        bond: String,
        /// Amount of reserve token to quote
        #[arg(short = 'a', long = "amount")]
        amount: Option<String>,
        /// Account whose balance caps the purchasable amount
        #[arg(long = "address")]
        address: Option<Address>,
    },
    /// Bond reserve tokens
    Bond {
        #[arg(short = 'b', long = "bond")]
        bond: String,
        #[arg(short = 'a', long = "amount")]
        amount: String,
        /// Accepted price increase in percent (0 uses 0.5%)
        #[arg(short = 's', long = "slippage", default_value = "0")]
        slippage: Decimal,
    },
    /// Redeem the vested payout of a bond
    Redeem {
        #[arg(short = 'b', long = "bond")]
        bond: String,
        /// Stake the payout instead of sending it to the wallet
        #[arg(long = "autostake")]
        autostake: bool,
    },
    /// Show an account's bond position and protocol token balances
    Account {
        #[arg(short = 'b', long = "bond")]
        bond: String,
        #[arg(long = "address")]
        address: Option<Address>,
    },
}

#[derive(Debug, Parser)]
#[command(name = "bonddesk")]
#[command(about = "A CLI tool for bonding against a bond depository")]
#[command(version)]
pub struct CliEnv {
    #[clap(flatten)]
    env: Env,
    #[command(subcommand)]
    pub command: Commands,
}

impl CliEnv {
    /// Parse CLI arguments and load the runtime context
    pub fn parse_and_convert() -> anyhow::Result<(Ctx, Commands)> {
        let cli_env = Self::parse();
        let ctx = Ctx::load_files(&cli_env.env.config, &cli_env.env.secrets)?;
        Ok((ctx, cli_env.command))
    }
}

fn validate_slippage(slippage: Decimal) -> Result<Decimal, CliError> {
    if slippage.is_sign_negative() {
        return Err(CliError::NegativeSlippage { value: slippage });
    }

    Ok(slippage)
}

fn validate_amount(amount: String) -> Result<String, CliError> {
    let amount = amount.trim().to_owned();
    if amount.is_empty() {
        return Err(CliError::EmptyAmount);
    }

    Ok(amount)
}

pub async fn run_command(ctx: Ctx, command: Commands) -> anyhow::Result<()> {
    run_command_with_writers(ctx, command, &mut std::io::stdout()).await
}

async fn run_command_with_writers<W: Write>(
    ctx: Ctx,
    command: Commands,
    stdout: &mut W,
) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::default();

    if let Some(private_key) = ctx.private_key {
        let wallet = Arc::new(connect_http(
            &private_key,
            ctx.rpc_url.clone(),
            ctx.required_confirmations,
        )?);
        let actions = BondActions::new(
            ChainReader::new(Arc::clone(&wallet)),
            Arc::clone(&ctx.registry),
            dispatcher,
        );
        let signer = WalletSigner::new(wallet);

        execute(&ctx, &actions, Some(&signer), command, stdout).await
    } else {
        let provider = ProviderBuilder::new().connect_http(ctx.rpc_url.clone());
        let actions = BondActions::new(
            ChainReader::new(ProviderEvm::new(provider)),
            Arc::clone(&ctx.registry),
            dispatcher,
        );

        execute(&ctx, &actions, None::<&dyn BondSigner>, command, stdout).await
    }
}

async fn execute<C, S, W>(
    ctx: &Ctx,
    actions: &BondActions<C>,
    signer: Option<&S>,
    command: Commands,
    stdout: &mut W,
) -> anyhow::Result<()>
where
    C: BondChain,
    S: BondSigner + ?Sized,
    W: Write,
{
    let mut alerts = actions.dispatcher().subscribe_alerts();
    let result = execute_command(ctx, actions, signer, command, stdout).await;

    while let Ok(alert) = alerts.try_recv() {
        writeln!(stdout, "⚠️  {alert}")?;
    }

    result
}

async fn execute_command<C, S, W>(
    ctx: &Ctx,
    actions: &BondActions<C>,
    signer: Option<&S>,
    command: Commands,
    stdout: &mut W,
) -> anyhow::Result<()>
where
    C: BondChain,
    S: BondSigner + ?Sized,
    W: Write,
{
    let network = ctx.chain_id;
    let wallet_address = signer.map(BondSigner::address);

    match command {
        Commands::Approve { bond } => {
            let request = ChangeApproval {
                bond: BondKey::new(bond),
                network,
                address: wallet_address.unwrap_or_default(),
            };
            let update = actions.change_approval(signer, &request).await?;

            writeln!(stdout, "✅ Approved {}", request.bond)?;
            writeln!(stdout, "   Balance: {}", update.balance)?;
        }
        Commands::Details {
            bond,
            amount,
            address,
        } => {
            let bond = BondKey::new(bond);
            let user_balance = match address.or(wallet_address) {
                Some(account) => {
                    let resolved = ctx.registry.resolve(&bond, network)?;
                    actions
                        .chain()
                        .balance_of(resolved.reserve(), account)
                        .await?
                }
                None => U256::ZERO,
            };

            let details = actions
                .calc_bond_details(&CalcBondDetails {
                    bond,
                    value: amount,
                    network,
                    user_balance,
                })
                .await?;

            writeln!(stdout, "{}", serde_json::to_string_pretty(&details)?)?;
        }
        Commands::Bond {
            bond,
            amount,
            slippage,
        } => {
            let request = BondAsset {
                value: validate_amount(amount)?,
                address: wallet_address.unwrap_or_default(),
                bond: BondKey::new(bond),
                network,
                slippage: validate_slippage(slippage)?,
            };
            actions.bond_asset(signer, &request).await?;

            info!(bond = %request.bond, value = %request.value, "Bond purchased");
            writeln!(stdout, "✅ Bonded {} {}", request.value, request.bond)?;
        }
        Commands::Redeem { bond, autostake } => {
            let request = RedeemBond {
                address: wallet_address.unwrap_or_default(),
                bond: BondKey::new(bond),
                network,
                autostake,
            };
            actions.redeem_bond(signer, &request).await?;

            writeln!(stdout, "✅ Redeemed {}", request.bond)?;
        }
        Commands::Account { bond, address } => {
            let account = address
                .or(wallet_address)
                .ok_or(CliError::MissingAccount)?;
            let details = actions
                .calculate_user_bond_details(account, &BondKey::new(bond), network)
                .await?;
            let balances = actions.get_balances(account, network).await?;

            writeln!(stdout, "{}", serde_json::to_string_pretty(&details)?)?;
            writeln!(stdout, "{}", serde_json::to_string_pretty(&balances)?)?;
        }
    }

    Ok(())
}
