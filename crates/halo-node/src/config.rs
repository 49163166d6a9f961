//! Ledger configuration types
//!
//! Loaded from a TOML file with `HALO__SECTION__KEY` environment overrides,
//! e.g. `HALO__REWARDS__EPOCH_LENGTH_SECS=60`.

use crate::error::{NodeError, Result};
use halo_core::fixed::parse_wad;
use halo_core::Address;
use halo_economics::{constants, ClassRatios, PoolWeight, RewardEngineConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment prefix for overrides
pub const ENV_PREFIX: &str = "HALO";

/// Complete ledger configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Reward engine settings
    #[serde(default)]
    pub rewards: RewardsConfig,

    /// Collateral minter settings
    #[serde(default)]
    pub minter: MinterConfig,

    /// Snapshot storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LedgerConfig {
    /// Load `path` (optional) layered under `HALO__*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Same as [`LedgerConfig::load`] with a custom environment prefix
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let loaded: Self = builder
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Cross-section checks that serde cannot express
    pub fn validate(&self) -> Result<()> {
        self.rewards.ratios().validate()?;
        parse_wad(&self.rewards.initial_budget)?;
        parse_wad(&self.rewards.decay_factor)?;
        parse_wad(&self.minter.collateralization_ratio)?;
        if self.minter.rewards_contract != self.rewards.address {
            return Err(NodeError::Config(format!(
                "minter.rewards_contract {} does not match rewards.address {}",
                self.minter.rewards_contract, self.rewards.address
            )));
        }
        Ok(())
    }

    /// Engine parameters; an absent start timestamp means `now`
    pub fn engine_config(&self, now: i64) -> Result<RewardEngineConfig> {
        let rewards = &self.rewards;
        Ok(RewardEngineConfig {
            initial_budget: parse_wad(&rewards.initial_budget)?,
            decay_factor: parse_wad(&rewards.decay_factor)?,
            epoch_length_secs: rewards.epoch_length_secs,
            start_timestamp: rewards.start_timestamp.unwrap_or(now),
            ratios: rewards.ratios(),
            amm_pools: rewards.amm_pools.iter().map(PoolEntry::weight).collect(),
            minter_pools: rewards.minter_pools.iter().map(PoolEntry::weight).collect(),
        })
    }

    pub fn collateralization_ratio(&self) -> Result<u128> {
        Ok(parse_wad(&self.minter.collateralization_ratio)?)
    }
}

/// Weighted pool entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub address: Address,
    pub weight: u64,
}

impl PoolEntry {
    fn weight(&self) -> PoolWeight {
        PoolWeight::new(self.address, self.weight)
    }
}

/// Reward engine settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RewardsConfig {
    /// Engine identity the minter is wired to
    #[serde(default = "default_rewards_address")]
    pub address: Address,

    /// Epoch 0 budget in whole tokens (decimal string)
    #[serde(default = "default_initial_budget")]
    pub initial_budget: String,

    /// Per-epoch decay multiplier (decimal string)
    #[serde(default = "default_decay_factor")]
    pub decay_factor: String,

    #[serde(default = "default_epoch_length")]
    pub epoch_length_secs: u64,

    /// Unix timestamp of epoch 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<i64>,

    #[serde(default = "default_amm_lp_ratio")]
    pub amm_lp_ratio_bps: u32,

    #[serde(default = "default_minter_lp_ratio")]
    pub minter_lp_ratio_bps: u32,

    #[serde(default)]
    pub vesting_ratio_bps: u32,

    /// HALOHALO chest that vested rewards are released into
    #[serde(default = "default_halo_chest")]
    pub halo_chest: Address,

    #[serde(default = "default_amm_pools")]
    pub amm_pools: Vec<PoolEntry>,

    #[serde(default = "default_minter_pools")]
    pub minter_pools: Vec<PoolEntry>,
}

impl RewardsConfig {
    pub fn ratios(&self) -> ClassRatios {
        ClassRatios {
            amm_lp_bps: self.amm_lp_ratio_bps,
            minter_lp_bps: self.minter_lp_ratio_bps,
            vesting_bps: self.vesting_ratio_bps,
        }
    }
}

fn default_rewards_address() -> Address {
    Address::repeat(0xee)
}

fn default_halo_chest() -> Address {
    Address::repeat(0xca)
}

fn default_initial_budget() -> String {
    "7500000".to_string()
}

fn default_decay_factor() -> String {
    constants::DEFAULT_DECAY_FACTOR.to_string()
}

fn default_epoch_length() -> u64 {
    constants::DEFAULT_EPOCH_LENGTH_SECS
}

fn default_amm_lp_ratio() -> u32 {
    constants::DEFAULT_AMM_LP_BPS
}

fn default_minter_lp_ratio() -> u32 {
    constants::DEFAULT_MINTER_LP_BPS
}

fn default_amm_pools() -> Vec<PoolEntry> {
    vec![PoolEntry {
        address: Address::repeat(0x11),
        weight: 10,
    }]
}

fn default_minter_pools() -> Vec<PoolEntry> {
    vec![PoolEntry {
        address: Address::repeat(0xc0),
        weight: 10,
    }]
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            address: default_rewards_address(),
            initial_budget: default_initial_budget(),
            decay_factor: default_decay_factor(),
            epoch_length_secs: default_epoch_length(),
            start_timestamp: None,
            amm_lp_ratio_bps: default_amm_lp_ratio(),
            minter_lp_ratio_bps: default_minter_lp_ratio(),
            vesting_ratio_bps: 0,
            halo_chest: default_halo_chest(),
            amm_pools: default_amm_pools(),
            minter_pools: default_minter_pools(),
        }
    }
}

/// Collateral minter settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MinterConfig {
    /// Collateral per minted unit (decimal string)
    #[serde(default = "default_collateralization_ratio")]
    pub collateralization_ratio: String,

    #[serde(default = "default_rewards_address")]
    pub rewards_contract: Address,

    #[serde(default = "default_phm_contract")]
    pub phm_contract: Address,
}

fn default_collateralization_ratio() -> String {
    constants::DEFAULT_COLLATERALIZATION_RATIO.to_string()
}

fn default_phm_contract() -> Address {
    Address::repeat(0x77)
}

impl Default for MinterConfig {
    fn default() -> Self {
        Self {
            collateralization_ratio: default_collateralization_ratio(),
            rewards_contract: default_rewards_address(),
            phm_contract: default_phm_contract(),
        }
    }
}

/// Storage settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Write snapshots to disk; memory only when false
    #[serde(default = "default_true")]
    pub persist: bool,
}

fn default_data_dir() -> String {
    "~/.halo/data".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            persist: true,
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use halo_core::fixed::WAD;
    use halo_core::LedgerError;
    use std::io::Write;

    #[test]
    fn test_defaults_match_deploy_script() {
        let config = LedgerConfig::default();
        config.validate().unwrap();

        let engine = config.engine_config(1_000).unwrap();
        assert_eq!(engine.initial_budget, 7_500_000 * WAD);
        assert_eq!(engine.decay_factor, 813 * WAD / 1_000);
        assert_eq!(engine.epoch_length_secs, 30);
        assert_eq!(engine.start_timestamp, 1_000);
        assert_eq!(engine.amm_pools.len(), 1);
        assert_eq!(engine.minter_pools[0].weight, 10);
        assert_eq!(config.collateralization_ratio().unwrap(), WAD);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = LedgerConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("decay_factor = \"0.813\""));

        let parsed: LedgerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.rewards.amm_pools, config.rewards.amm_pools);
        assert_eq!(parsed.minter.phm_contract, config.minter.phm_contract);
        assert_eq!(parsed.rewards.halo_chest, Address::repeat(0xca));
    }

    #[test]
    fn test_load_file_with_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("halo.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[rewards]
initial_budget = "1000"
start_timestamp = 42
amm_lp_ratio_bps = 6000
minter_lp_ratio_bps = 3000
vesting_ratio_bps = 1000

[[rewards.amm_pools]]
address = "0x2222222222222222222222222222222222222222"
weight = 3

[[rewards.amm_pools]]
address = "0x3333333333333333333333333333333333333333"
weight = 1
"#
        )
        .unwrap();

        let config = LedgerConfig::load_with_prefix(Some(&path), "HALO_TEST_PARTIAL").unwrap();
        let engine = config.engine_config(0).unwrap();
        assert_eq!(engine.initial_budget, 1_000 * WAD);
        assert_eq!(engine.start_timestamp, 42);
        assert_eq!(engine.ratios.vesting_bps, 1_000);
        assert_eq!(engine.amm_pools.len(), 2);
        assert_eq!(engine.amm_pools[0].address, Address::repeat(0x22));
        // Untouched sections keep defaults
        assert_eq!(config.logging.level, "info");
        assert_eq!(engine.minter_pools[0].address, Address::repeat(0xc0));
    }

    #[test]
    fn test_env_overrides_file() {
        std::env::set_var("HALO_TEST_ENV__REWARDS__EPOCH_LENGTH_SECS", "60");
        std::env::set_var("HALO_TEST_ENV__LOGGING__LEVEL", "debug");
        let config = LedgerConfig::load_with_prefix(None, "HALO_TEST_ENV").unwrap();
        std::env::remove_var("HALO_TEST_ENV__REWARDS__EPOCH_LENGTH_SECS");
        std::env::remove_var("HALO_TEST_ENV__LOGGING__LEVEL");

        assert_eq!(config.rewards.epoch_length_secs, 60);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validate_rejects_bad_ratios() {
        let mut config = LedgerConfig::default();
        config.rewards.vesting_ratio_bps = 1;
        assert!(matches!(
            config.validate(),
            Err(NodeError::Ledger(LedgerError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_validate_rejects_wiring_mismatch() {
        let mut config = LedgerConfig::default();
        config.minter.rewards_contract = Address::repeat(0x01);
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));
    }
}
