use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    constants::{WAD, YEAR},
    math::mul_div,
    sources::EpochRateSource,
    state::GaugeAccount,
};

/// Epochs rolled in one call at most; past this the rate is effectively zero
const MAX_EPOCH_ROLLS: u32 = 256;

/// Emission schedule published by the reward token program.
///
/// Each elapsed epoch divides the rate by `reduction_coefficient` (WAD).
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct EmissionSchedule {
    pub discriminator: [u8; 8],
    pub rate: u128,
    pub start_epoch_time: i64,
    pub epoch_length: i64,
    pub reduction_coefficient: u128,
}

impl EmissionSchedule {
    pub fn new(rate: u128, start_epoch_time: i64, epoch_length: i64, reduction_coefficient: u128) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            rate,
            start_epoch_time,
            epoch_length,
            reduction_coefficient,
        }
    }

    /// Yearly epochs with no reduction
    pub fn constant(rate: u128, start_epoch_time: i64) -> Self {
        Self::new(rate, start_epoch_time, YEAR, WAD)
    }

    pub fn next_epoch_time(&self) -> i64 {
        self.start_epoch_time.saturating_add(self.epoch_length)
    }
}

impl EpochRateSource for EmissionSchedule {
    fn current_rate(&self) -> u128 {
        self.rate
    }

    fn advance_epoch(&mut self, now: i64) -> i64 {
        if self.epoch_length <= 0 {
            return i64::MAX;
        }
        let mut rolls = 0;
        while now >= self.next_epoch_time() && rolls < MAX_EPOCH_ROLLS {
            self.start_epoch_time = self.next_epoch_time();
            if self.reduction_coefficient > 0 {
                self.rate = mul_div(self.rate, WAD, self.reduction_coefficient).unwrap_or(0);
            }
            rolls += 1;
        }
        self.next_epoch_time()
    }
}

impl GaugeAccount for EmissionSchedule {
    const DISCRIMINATOR: [u8; 8] = *b"EMISSION";
    const LEN: usize = 8 + 16 + 8 + 8 + 16;

    fn discriminator(&self) -> [u8; 8] {
        self.discriminator
    }
}
