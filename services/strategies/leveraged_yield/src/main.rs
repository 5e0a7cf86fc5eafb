use anyhow::{Context, Result};
use clap::Parser;
use leveraged_yield::{
    log_error, log_metrics, log_profit, log_success, Balances, Deposited, Deployment, LeveragedYieldConfig, Withdrawn,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Deposit, let interest and rewards accrue, then withdraw against an
/// in-memory deployment
#[derive(Debug, Parser)]
#[command(name = "leveraged_yield", version)]
struct Args {
    /// JSON configuration file; defaults plus LYF_* environment overrides otherwise
    #[arg(long)]
    config: Option<PathBuf>,

    /// Principal to deposit and withdraw, in base-asset units
    #[arg(long, default_value_t = 1_000_000)]
    amount: u128,

    /// Extra base asset sent to the strategy alongside the principal
    #[arg(long, default_value_t = 100_000)]
    headroom: u128,

    /// Blocks to mine between deposit and withdraw
    #[arg(long, default_value_t = 1)]
    blocks: u64,

    /// Seconds per mined block; overrides the configured interval
    #[arg(long)]
    block_interval: Option<u64>,
}

#[derive(Serialize)]
struct RunReport {
    deposit: Deposited,
    withdraw: Withdrawn,
    owner_before: Balances,
    owner_after: Balances,
    vault_loans_served: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    info!("🚀 Starting Leveraged Yield Farm simulation...");

    let mut config = match &args.config {
        Some(path) => LeveragedYieldConfig::from_file(path)?,
        None => LeveragedYieldConfig::from_env(),
    };
    if let Some(interval) = args.block_interval {
        config.simulation.block_interval_secs = interval;
    }

    let mut deployment = Deployment::new(config)?;
    let owner = deployment.owner();
    let before = deployment.balances(owner);
    log_metrics!("Owner balances before: {}", serde_json::to_string(&before)?);

    let deposited = deployment
        .deposit(args.amount, args.headroom)
        .inspect_err(|e| log_error!("Deposit failed: {}", e))
        .context("deposit")?;
    log_success!(
        "Supplied {} with {} flash loan, {} receipt minted",
        deposited.supplied,
        deposited.flash_amount,
        deposited.receipt_minted
    );

    let receipt_before = deployment.balances(deployment.strategy()).receipt;
    let owner_before_withdraw = deployment.balances(owner);
    deployment.mine(args.blocks);

    let withdrawn = deployment
        .withdraw(args.amount)
        .inspect_err(|e| log_error!("Withdraw failed: {}", e))
        .context("withdraw")?;

    let after = deployment.balances(owner);
    let receipt_after = deployment.balances(deployment.strategy()).receipt;
    log_profit!(
        "Base {} -> {}, reward {} -> {}",
        owner_before_withdraw.base,
        after.base,
        owner_before_withdraw.reward,
        after.reward
    );
    log_metrics!("Strategy receipt {} -> {}", receipt_before, receipt_after);

    let report = RunReport {
        deposit: deposited,
        withdraw: withdrawn,
        owner_before: before,
        owner_after: after,
        vault_loans_served: deployment.farm.vault().loans_served(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
