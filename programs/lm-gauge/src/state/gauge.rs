use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::{
    constants::{MAX_WEEK_STEPS, TOKENLESS_PRODUCTION},
    error::GaugeError,
    math::U256,
    state::GaugeAccount,
};

/// Lifecycle of a gauge. Binding happens once and is never undone.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeStatus {
    Uninitialized,
    Active,
}

impl Default for GaugeStatus {
    fn default() -> Self {
        GaugeStatus::Uninitialized
    }
}

/// Running reward-per-working-collateral integral
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RewardIntegral {
    /// WAD-scaled reward per unit of working collateral
    pub value: U256,
    /// Time the integral was last advanced to
    pub timestamp: i64,
}

/// Tunables fixed at bind time
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaugeConfig {
    /// Percentage of raw collateral that counts with no vote-escrow weight
    pub tokenless_production: u8,
    /// Week steps walked per integral advance before giving up on the rest
    pub max_week_steps: u16,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            tokenless_production: TOKENLESS_PRODUCTION,
            max_week_steps: MAX_WEEK_STEPS as u16,
        }
    }
}

impl GaugeConfig {
    pub fn validate(&self) -> Result<(), ProgramError> {
        if self.tokenless_production > 100 {
            return Err(GaugeError::InvalidConfig.into());
        }
        if self.max_week_steps == 0 || self.max_week_steps as usize > MAX_WEEK_STEPS {
            return Err(GaugeError::InvalidConfig.into());
        }
        Ok(())
    }
}

/// Addresses the gauge was bound to
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GaugeBinding {
    /// May kill or revive the gauge
    pub authority: Pubkey,
    /// Market maker allowed to push collateral and share updates
    pub amm: Pubkey,
    /// AMM `coins(1)`
    pub collateral_mint: Pubkey,
    /// Signer allowed to checkpoint on behalf of users
    pub minter: Pubkey,
    /// Owner of per-user minted records
    pub minter_program: Pubkey,
    pub emission_schedule: Pubkey,
    pub weight_history: Pubkey,
    pub ve_supply: Pubkey,
    /// Owner of per-user vote-escrow balance accounts
    pub ve_program: Pubkey,
}

impl GaugeBinding {
    pub const LEN: usize = 32 * 9;
}

/// Global gauge record, one per AMM
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct GaugeState {
    pub discriminator: [u8; 8],
    pub status: GaugeStatus,
    pub bump: u8,
    pub binding: GaugeBinding,
    pub config: GaugeConfig,
    /// Killed gauges keep advancing time but accrue at a zero rate
    pub is_killed: bool,
    pub integral: RewardIntegral,
    /// Sum of boosted balances
    pub working_supply: u128,
    /// Sum of raw collateral, the base of the boost bonus
    pub total_collateral: u128,
    /// Cached emission rate, valid until `next_epoch_time`
    pub inflation_rate: u128,
    pub next_epoch_time: i64,
}

impl GaugeState {
    pub fn new(bump: u8) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            bump,
            config: GaugeConfig::default(),
            ..Default::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == GaugeStatus::Active
    }
}

impl GaugeAccount for GaugeState {
    const DISCRIMINATOR: [u8; 8] = *b"LMGAUGE\0";
    // discriminator + status + bump + binding + config + killed + integral
    // + working_supply + total_collateral + rate + next_epoch_time, plus padding
    const LEN: usize = 8 + 1 + 1 + GaugeBinding::LEN + 3 + 1 + 40 + 16 + 16 + 16 + 8 + 64;

    fn discriminator(&self) -> [u8; 8] {
        self.discriminator
    }
}
