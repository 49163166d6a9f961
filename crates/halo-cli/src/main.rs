//! Halo CLI
//!
//! Command-line interface for the Halo reward ledger.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use halo_core::fixed::{format_wad, WAD};
use halo_core::{Address, ManualClock, PoolClass, SystemClock, TimeSource};
use halo_economics::{DecaySchedule, HaloChest, PoolInfo};
use halo_node::{LedgerConfig, LedgerService, SNAPSHOT_KEY};
use halo_storage::{FileStateStore, SnapshotStore, StateStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Account used by the scripted simulation
const SIMULATION_USER: Address = Address::repeat(0xa1);

#[derive(Parser)]
#[command(name = "halo")]
#[command(version = "0.1.0")]
#[command(about = "Halo - decaying epoch rewards and collateral minter ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "HALO_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the deploy-and-simulate script
    Simulate {
        /// Wait on the wall clock instead of a simulated one
        #[arg(long)]
        realtime: bool,
    },

    /// Write the default configuration
    InitConfig {
        /// Output file
        #[arg(short, long, default_value = "halo.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the epoch and decayed budget at a timestamp
    Epoch {
        /// Unix timestamp
        #[arg(short, long)]
        timestamp: i64,
    },

    /// Show every pool of the persisted ledger
    PoolInfo,
}

fn init_logging(verbose: bool, level: &str, format: &str) {
    let env_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false),
            )
            .init();
    }
}

fn expand_path(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(rest) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
    }
    path.to_path_buf()
}

// Amounts are rendered as decimal strings; JSON numbers cannot hold u128

#[derive(Serialize)]
struct SimulationReport {
    epoch: u64,
    budget: String,
    pending_amm_lp_rewards: String,
    pending_minter_lp_rewards: String,
    amm_pool: PoolReport,
    minter_pool: PoolReport,
}

#[derive(Serialize)]
struct PoolReport {
    address: String,
    class: String,
    weight: u64,
    acc_reward_per_share: String,
    last_update_epoch: u64,
    total_deposited: String,
    undistributed: String,
    depositors: usize,
}

impl From<PoolInfo> for PoolReport {
    fn from(info: PoolInfo) -> Self {
        Self {
            address: info.address.to_hex(),
            class: info.class.to_string(),
            weight: info.weight,
            acc_reward_per_share: info.acc_reward_per_share.to_string(),
            last_update_epoch: info.last_update_epoch,
            total_deposited: format_wad(info.total_deposited),
            undistributed: format_wad(info.undistributed),
            depositors: info.depositors,
        }
    }
}

#[derive(Serialize)]
struct EpochReport {
    timestamp: i64,
    epoch: u64,
    epoch_start: i64,
    budget: String,
}

#[derive(Serialize)]
struct LedgerReport {
    budget_epoch: u64,
    budget: String,
    amm_pools: Vec<PoolReport>,
    minter_pools: Vec<PoolReport>,
    unclaimed_vesting: String,
    chest: ChestReport,
}

#[derive(Serialize)]
struct ChestReport {
    address: String,
    halo_balance: String,
    total_shares: String,
    price: String,
    holders: usize,
}

impl ChestReport {
    fn new(chest: &HaloChest) -> anyhow::Result<Self> {
        Ok(Self {
            address: chest.address().to_hex(),
            halo_balance: format_wad(chest.halo_balance()),
            total_shares: format_wad(chest.total_shares()),
            price: format_wad(chest.price()?),
            holders: chest.holders(),
        })
    }
}

fn pool_reports(infos: Vec<PoolInfo>) -> Vec<PoolReport> {
    infos.into_iter().map(PoolReport::from).collect()
}

/// Clock driving the simulation
enum SimClock {
    Manual(Arc<ManualClock>),
    Wall(Arc<SystemClock>),
}

impl SimClock {
    fn source(&self) -> Arc<dyn TimeSource> {
        match self {
            Self::Manual(clock) => clock.clone() as Arc<dyn TimeSource>,
            Self::Wall(clock) => clock.clone() as Arc<dyn TimeSource>,
        }
    }

    async fn wait(&self, secs: u64) {
        match self {
            Self::Manual(clock) => {
                clock.advance(secs as i64);
            }
            Self::Wall(_) => tokio::time::sleep(Duration::from_secs(secs)).await,
        }
    }
}

async fn simulate<S: SnapshotStore>(
    config: &LedgerConfig,
    store: S,
    clock: SimClock,
) -> anyhow::Result<()> {
    let service = LedgerService::open(config, store, clock.source())?;
    let lp_pool = config
        .rewards
        .amm_pools
        .first()
        .map(|p| p.address)
        .context("no AMM pool configured")?;
    let collateral = config
        .rewards
        .minter_pools
        .first()
        .map(|p| p.address)
        .context("no minter pool configured")?;
    let user = SIMULATION_USER;

    service.deposit(lp_pool, 100 * WAD, user)?;
    tracing::info!(%lp_pool, %user, "Deposited 100 LP");

    let wait = config.rewards.epoch_length_secs * 2 + 5;
    tracing::info!(secs = wait, "Waiting two epochs");
    clock.wait(wait).await;

    service.deposit_collateral(100 * WAD, 100 * WAD, collateral, user)?;
    tracing::info!(%collateral, %user, "Deposited 100 collateral, minted 100 PHM");

    let amm = service.update_amm_reward_pool(lp_pool)?;
    let minter = service.update_minter_reward_pool(collateral)?;

    let report = SimulationReport {
        epoch: service.current_epoch()?,
        budget: format_wad(service.current_budget()?),
        pending_amm_lp_rewards: format_wad(service.pending_rewards(PoolClass::Amm, lp_pool, user)?),
        pending_minter_lp_rewards: format_wad(service.pending_rewards(
            PoolClass::Minter,
            collateral,
            user,
        )?),
        amm_pool: amm.into(),
        minter_pool: minter.into(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn epoch(config: &LedgerConfig, timestamp: i64) -> anyhow::Result<()> {
    let engine = config.engine_config(SystemClock.now())?;
    let schedule = DecaySchedule::new(
        engine.initial_budget,
        engine.decay_factor,
        engine.epoch_length_secs,
        engine.start_timestamp,
    )?;
    let epoch = schedule.epoch_at(timestamp);
    let report = EpochReport {
        timestamp,
        epoch,
        epoch_start: schedule.epoch_start(epoch),
        budget: format_wad(schedule.budget_at_epoch(epoch)?),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn pool_info(config: &LedgerConfig) -> anyhow::Result<()> {
    let data_dir = expand_path(Path::new(&config.storage.data_dir));
    let store = FileStateStore::open(&data_dir)?;
    let Some(service) = LedgerService::resume(store, Arc::new(SystemClock))? else {
        bail!("no ledger snapshot in {}", data_dir.display());
    };

    let state = service.snapshot();
    let report = LedgerReport {
        budget_epoch: state.engine.budget_epoch()?,
        budget: format_wad(state.engine.current_budget()?),
        amm_pools: pool_reports(state.engine.pool_infos(PoolClass::Amm)?),
        minter_pools: pool_reports(state.engine.pool_infos(PoolClass::Minter)?),
        unclaimed_vesting: format_wad(state.engine.unclaimed_vesting_rewards()?),
        chest: ChestReport::new(&state.chest)?,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref().map(expand_path);
    let config = LedgerConfig::load(config_path.as_deref())
        .with_context(|| format!("loading configuration {:?}", config_path))?;
    init_logging(cli.verbose, &config.logging.level, &config.logging.format);

    match cli.command {
        Commands::Simulate { realtime } => {
            let clock = if realtime {
                SimClock::Wall(Arc::new(SystemClock))
            } else {
                let start = config
                    .rewards
                    .start_timestamp
                    .unwrap_or_else(|| SystemClock.now());
                SimClock::Manual(Arc::new(ManualClock::new(start)))
            };

            if config.storage.persist {
                let data_dir = expand_path(Path::new(&config.storage.data_dir));
                let store = FileStateStore::open(&data_dir)?;
                if store.contains(SNAPSHOT_KEY) {
                    bail!(
                        "ledger snapshot already exists in {}; remove it or set storage.persist = false",
                        data_dir.display()
                    );
                }
                simulate(&config, store, clock).await?;
            } else {
                simulate(&config, StateStore::new(), clock).await?;
            }
        }

        Commands::InitConfig { output, force } => {
            let output = expand_path(&output);
            if output.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", output.display());
            }
            std::fs::write(&output, LedgerConfig::default().to_toml()?)?;
            println!("Wrote default configuration to {}", output.display());
        }

        Commands::Epoch { timestamp } => epoch(&config, timestamp)?,

        Commands::PoolInfo => pool_info(&config)?,
    }

    Ok(())
}
