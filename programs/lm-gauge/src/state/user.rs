use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::{constants::MAX_TICKS, error::GaugeError, math::U256, state::GaugeAccount};

/// A user's stake in one band
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserBandEntry {
    /// Raw AMM shares
    pub shares: u128,
    /// Shares scaled by the user's boost, counted in the band total
    pub working_shares: u128,
    /// Band reward-per-share value already settled into `integral`
    pub reward_per_share_paid: U256,
    /// Reward accrued from this band
    pub integral: u128,
}

impl UserBandEntry {
    pub const LEN: usize = 16 * 3 + 32;
}

/// Per-user ledger; `bands[i]` belongs to band `band_start + i`
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct UserPosition {
    pub discriminator: [u8; 8],
    pub gauge: Pubkey,
    pub owner: Pubkey,
    pub bump: u8,
    pub band_start: i32,
    pub range_size: u8,
    pub raw_collateral: u128,
    pub working_balance: u128,
    /// Reward accrued over the life of the position, before mint deductions
    pub claimable_accrued: u128,
    pub bands: Vec<UserBandEntry>,
}

impl UserPosition {
    pub fn new(gauge: Pubkey, owner: Pubkey, bump: u8) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            gauge,
            owner,
            bump,
            ..Default::default()
        }
    }

    /// Band index of slot `offset` in a range starting at `start`
    pub fn band_at(start: i32, offset: usize) -> Result<i32, ProgramError> {
        i32::try_from(offset)
            .ok()
            .and_then(|offset| start.checked_add(offset))
            .ok_or_else(|| GaugeError::ArithmeticOverflow.into())
    }

    /// Indices of the occupied bands
    pub fn occupied_bands(&self) -> Result<Vec<i32>, ProgramError> {
        (0..self.range_size as usize)
            .map(|offset| Self::band_at(self.band_start, offset))
            .collect()
    }
}

impl GaugeAccount for UserPosition {
    const DISCRIMINATOR: [u8; 8] = *b"LMUSER\0\0";
    const LEN: usize = 8 + 32 + 32 + 1 + 4 + 1 + 16 * 3 + 4 + MAX_TICKS * UserBandEntry::LEN;

    fn discriminator(&self) -> [u8; 8] {
        self.discriminator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_range_fits_account() {
        let mut position = UserPosition::new(Pubkey::new_unique(), Pubkey::new_unique(), 9);
        position.range_size = MAX_TICKS as u8;
        position.bands = vec![UserBandEntry::default(); MAX_TICKS];
        assert_eq!(position.try_to_vec().unwrap().len(), UserPosition::LEN);
    }

    #[test]
    fn test_occupied_bands_follow_start() {
        let mut position = UserPosition::new(Pubkey::default(), Pubkey::default(), 0);
        position.band_start = -2;
        position.range_size = 3;
        assert_eq!(position.occupied_bands().unwrap(), vec![-2, -1, 0]);

        position.range_size = 0;
        assert!(position.occupied_bands().unwrap().is_empty());
    }

    #[test]
    fn test_band_at_overflow() {
        assert!(UserPosition::band_at(i32::MAX, 1).is_err());
        assert_eq!(UserPosition::band_at(-5, 5).unwrap(), 0);
    }
}
