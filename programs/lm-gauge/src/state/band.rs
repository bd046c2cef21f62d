use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::{math::U256, state::GaugeAccount};

/// Reward accrued per band share, tracked against the global integral
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BandIntegral {
    /// WAD-scaled reward per share
    pub value: U256,
    /// Global integral value this band was last brought up to
    pub last_global_seen: U256,
}

/// One price band of the AMM
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct BandRecord {
    pub discriminator: [u8; 8],
    pub gauge: Pubkey,
    pub index: i32,
    pub bump: u8,
    /// WAD collateral backing one share of this band
    pub collateral_per_share: u128,
    /// Sum of boosted shares held in this band
    pub working_shares_total: u128,
    pub reward_per_share: BandIntegral,
}

impl BandRecord {
    pub fn new(gauge: Pubkey, index: i32, bump: u8) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            gauge,
            index,
            bump,
            ..Default::default()
        }
    }
}

impl GaugeAccount for BandRecord {
    const DISCRIMINATOR: [u8; 8] = *b"LMBAND\0\0";
    const LEN: usize = 8 + 32 + 4 + 1 + 16 + 16 + 64;

    fn discriminator(&self) -> [u8; 8] {
        self.discriminator
    }
}
