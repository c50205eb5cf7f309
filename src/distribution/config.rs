// Distribution configuration - split ratio, per-stage rules and the unlock table
//
// The configuration is fixed when a distribution is created. `Default`
// reproduces the eight-stage schedule; every field can be overridden with
// the `with_*` builders or loaded from JSON.

use crate::distribution::Stage;
use crate::identity::Address;
use crate::ledger::Amount;
use crate::vault::{UnlockSchedule, VestingError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Base units per whole token
pub const UNIT: Amount = 1_000_000;

/// Earliest entry into the terminal stage (2031-01-01T00:00:00Z)
pub const FINAL_UNLOCK_TIME_GATE: i64 = 1_925_097_600;

/// Treasury auto-mint on DAOSaleStart: half of minted less burned
pub const DAO_SALE_START_TREASURY_MINT: Ratio = Ratio::new(1, 2);

/// Treasury auto-mint on DAOAMMStart: a third of minted less burned
pub const DAO_AMM_START_TREASURY_MINT: Ratio = Ratio::new(1, 3);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid split ratio: {0}")]
    InvalidSplit(String),

    #[error("Invalid stage table: {0}")]
    InvalidStageTable(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Schedule(#[from] VestingError),

    #[error("Failed to read config: {0}")]
    Io(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),
}

// ============================================================================
// RATIOS
// ============================================================================

/// A non-negative rational `numerator / denominator`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    pub numerator: u64,
    pub denominator: u64,
}

impl Ratio {
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    /// `floor(amount * numerator / denominator)`, `None` on overflow or a zero denominator
    pub fn of(&self, amount: Amount) -> Option<Amount> {
        mul_div(amount, self.numerator, self.denominator)
    }
}

/// Spendable-to-locked proportion applied to every mint
///
/// Minting `amount` credits `amount` spendable and
/// `amount * locked / spendable` locked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRatio {
    pub spendable: u64,
    pub locked: u64,
}

impl SplitRatio {
    pub const fn new(spendable: u64, locked: u64) -> Self {
        Self { spendable, locked }
    }

    /// Locked part escrowed for a spendable mint of `amount`
    pub fn locked_part(&self, amount: Amount) -> Option<Amount> {
        mul_div(amount, self.locked, self.spendable)
    }
}

impl Default for SplitRatio {
    /// A quarter spendable, three quarters locked
    fn default() -> Self {
        Self::new(1, 3)
    }
}

fn mul_div(amount: Amount, numerator: u64, denominator: u64) -> Option<Amount> {
    if denominator == 0 {
        return None;
    }
    let (num, den) = (Amount::from(numerator), Amount::from(denominator));
    let whole = (amount / den).checked_mul(num)?;
    let rest = (amount % den).checked_mul(num)? / den;
    whole.checked_add(rest)
}

// ============================================================================
// STAGE RULES
// ============================================================================

/// How the mint ceiling is set when a stage is entered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MintCeiling {
    Unbounded,
    /// Cap on the cumulative minted total
    Absolute(Amount),
    /// Cap at the minted total on entry plus this allowance
    AboveEntry(Amount),
}

impl MintCeiling {
    /// Concrete ceiling given the minted total at stage entry
    pub fn resolve(&self, minted_on_entry: Amount) -> Option<Amount> {
        match self {
            MintCeiling::Unbounded => None,
            MintCeiling::Absolute(cap) => Some(*cap),
            MintCeiling::AboveEntry(room) => Some(minted_on_entry.saturating_add(*room)),
        }
    }
}

/// Fixed rules for one stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    pub stage: Stage,
    /// Whether `mint` is open while this stage is active
    pub minting: bool,
    pub ceiling: MintCeiling,
    /// Fraction of minted less burned issued to the treasury on entry
    pub treasury_mint: Option<Ratio>,
    /// Unix timestamp before which the stage cannot be entered
    pub time_gate: Option<i64>,
}

impl StageConfig {
    /// A stage with no minting and no entry actions
    pub fn passive(stage: Stage) -> Self {
        Self {
            stage,
            minting: false,
            ceiling: MintCeiling::Unbounded,
            treasury_mint: None,
            time_gate: None,
        }
    }

    pub fn minting(stage: Stage, ceiling: MintCeiling) -> Self {
        Self {
            minting: true,
            ceiling,
            ..Self::passive(stage)
        }
    }

    pub fn with_treasury_mint(mut self, fraction: Ratio) -> Self {
        self.treasury_mint = Some(fraction);
        self
    }

    pub fn with_time_gate(mut self, timestamp: i64) -> Self {
        self.time_gate = Some(timestamp);
        self
    }
}

/// Display metadata for the two units
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub locked_name: String,
    pub locked_symbol: String,
    pub decimals: u8,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: "Stage Token".to_string(),
            symbol: "STG".to_string(),
            locked_name: "Locked Stage Token".to_string(),
            locked_symbol: "STG-L".to_string(),
            decimals: 6,
        }
    }
}

// ============================================================================
// ALLOCATIONS
// ============================================================================

/// One row of the initial allocation table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub account: Address,
    #[serde(with = "amount_text")]
    pub amount: Amount,
}

impl Allocation {
    pub fn new(account: Address, amount: Amount) -> Self {
        Self { account, amount }
    }

    /// Parse a JSON array of `{ "account": "0x..", "amount": "123" }`
    pub fn list_from_json(json: &str) -> Result<Vec<Allocation>, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Amounts as decimal strings in text formats, integers otherwise
mod amount_text {
    use crate::ledger::Amount;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Decimal(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&amount.to_string())
        } else {
            serializer.serialize_u128(*amount)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        if !deserializer.is_human_readable() {
            return Amount::deserialize(deserializer);
        }
        match Text::deserialize(deserializer)? {
            Text::Decimal(s) => s.trim().parse().map_err(D::Error::custom),
            Text::Number(n) => Ok(Amount::from(n)),
        }
    }
}

// ============================================================================
// DISTRIBUTION CONFIG
// ============================================================================

/// Everything fixed at distribution creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionConfig {
    pub metadata: TokenMetadata,
    pub split: SplitRatio,
    /// Redemption sink and recipient of treasury auto-mints
    pub treasury: Address,
    /// One entry per stage, in lifecycle order
    pub stages: Vec<StageConfig>,
    pub schedule: UnlockSchedule,
    /// Upper bound on registered accounts
    pub max_accounts: usize,
    /// Maximum releases performed by one bulk unlock pass
    pub bulk_unlock_limit: usize,
}

impl DistributionConfig {
    /// Create a new config with builder pattern
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, metadata: TokenMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_split(mut self, split: SplitRatio) -> Self {
        self.split = split;
        self
    }

    pub fn with_treasury(mut self, treasury: Address) -> Self {
        self.treasury = treasury;
        self
    }

    /// Replace the rules of the stage named in `stage_config`
    pub fn with_stage(mut self, stage_config: StageConfig) -> Self {
        if let Some(slot) = self.stages.get_mut(stage_config.stage.index()) {
            *slot = stage_config;
        }
        self
    }

    /// Replace the ceiling of one stage
    pub fn with_ceiling(mut self, stage: Stage, ceiling: MintCeiling) -> Self {
        if let Some(slot) = self.stages.get_mut(stage.index()) {
            slot.ceiling = ceiling;
        }
        self
    }

    /// Replace or clear the time gate of one stage
    pub fn with_time_gate(mut self, stage: Stage, time_gate: Option<i64>) -> Self {
        if let Some(slot) = self.stages.get_mut(stage.index()) {
            slot.time_gate = time_gate;
        }
        self
    }

    pub fn with_schedule(mut self, schedule: UnlockSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_max_accounts(mut self, max_accounts: usize) -> Self {
        self.max_accounts = max_accounts;
        self
    }

    pub fn with_bulk_unlock_limit(mut self, limit: usize) -> Self {
        self.bulk_unlock_limit = limit;
        self
    }

    /// Rules of one stage
    pub fn stage(&self, stage: Stage) -> Result<&StageConfig, ConfigError> {
        self.stages.get(stage.index()).ok_or_else(|| {
            ConfigError::InvalidStageTable(format!("no rules for stage {}", stage))
        })
    }

    /// Stages during which `mint` is open
    pub fn minting_stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.stages.iter().filter(|s| s.minting).map(|s| s.stage)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.split.spendable == 0 {
            return Err(ConfigError::InvalidSplit(
                "spendable numerator must be positive".to_string(),
            ));
        }

        if self.stages.len() != Stage::ALL.len() {
            return Err(ConfigError::InvalidStageTable(format!(
                "expected {} stages, got {}",
                Stage::ALL.len(),
                self.stages.len()
            )));
        }
        for (expected, rules) in Stage::ALL.iter().zip(&self.stages) {
            if rules.stage != *expected {
                return Err(ConfigError::InvalidStageTable(format!(
                    "stage {} listed where {} belongs",
                    rules.stage, expected
                )));
            }
            if let Some(fraction) = rules.treasury_mint {
                if fraction.denominator == 0 {
                    return Err(ConfigError::InvalidStageTable(format!(
                        "treasury mint of {} has a zero denominator",
                        rules.stage
                    )));
                }
            }
        }

        self.schedule.validate()?;

        let rounds = self.schedule.rounds();
        if self.split.locked > 0 {
            for stage in self.minting_stages() {
                if !rounds.contains(&stage) {
                    return Err(ConfigError::InvalidConfig(format!(
                        "grants made during {} are never released",
                        stage
                    )));
                }
            }
        }
        for round in rounds {
            if !self.stage(round)?.minting {
                return Err(ConfigError::InvalidConfig(format!(
                    "unlock windows scheduled for {}, which never mints",
                    round
                )));
            }
        }

        if self.treasury.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "treasury must not be the zero address".to_string(),
            ));
        }
        if self.max_accounts == 0 {
            return Err(ConfigError::InvalidConfig(
                "max_accounts must be positive".to_string(),
            ));
        }
        if self.bulk_unlock_limit == 0 {
            return Err(ConfigError::InvalidConfig(
                "bulk_unlock_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json(&json)
    }
}

impl Default for DistributionConfig {
    fn default() -> Self {
        let stages = vec![
            StageConfig::minting(Stage::Presale1, MintCeiling::Absolute(5_000_000 * UNIT)),
            StageConfig::minting(Stage::Presale2, MintCeiling::Absolute(10_000_000 * UNIT)),
            StageConfig::passive(Stage::DaoSaleStart).with_treasury_mint(DAO_SALE_START_TREASURY_MINT),
            StageConfig::passive(Stage::DaoSaleEnd),
            StageConfig::passive(Stage::DaoAmmStart).with_treasury_mint(DAO_AMM_START_TREASURY_MINT),
            StageConfig::passive(Stage::Presale2Unlock),
            StageConfig::minting(Stage::FinalMint, MintCeiling::AboveEntry(5_000_000 * UNIT)),
            StageConfig::passive(Stage::FinalUnlock).with_time_gate(FINAL_UNLOCK_TIME_GATE),
        ];

        Self {
            metadata: TokenMetadata::default(),
            split: SplitRatio::default(),
            treasury: Address::from_label("treasury"),
            stages,
            schedule: UnlockSchedule::default(),
            max_accounts: 10_000,
            bulk_unlock_limit: 5_000,
        }
    }
}
