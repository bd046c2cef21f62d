use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::{constants::WEEK, sources::WeightSchedule, state::GaugeAccount};

/// Points kept in a weight history account
pub const MAX_WEIGHT_POINTS: usize = 64;

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightPoint {
    /// Week-aligned timestamp the weight takes effect from
    pub week: i64,
    /// WAD fraction of total emissions
    pub weight: u128,
}

/// Governance weight history of one gauge, sorted by week.
///
/// A week's weight is the last point at or before it.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct WeightHistory {
    pub discriminator: [u8; 8],
    pub gauge: Pubkey,
    pub points: Vec<WeightPoint>,
}

pub fn week_floor(t: i64) -> i64 {
    t.div_euclid(WEEK) * WEEK
}

impl WeightHistory {
    pub fn new(gauge: Pubkey, mut points: Vec<WeightPoint>) -> Self {
        points.sort_by_key(|p| p.week);
        Self {
            discriminator: Self::DISCRIMINATOR,
            gauge,
            points,
        }
    }

    pub fn constant(gauge: Pubkey, weight: u128) -> Self {
        Self::new(gauge, vec![WeightPoint { week: 0, weight }])
    }
}

impl WeightSchedule for WeightHistory {
    fn relative_weight(&self, week_start: i64) -> u128 {
        let week = week_floor(week_start);
        self.points
            .iter()
            .rev()
            .find(|p| p.week <= week)
            .map(|p| p.weight)
            .unwrap_or(0)
    }

    fn force_checkpoint(&mut self, now: i64) {
        let week = week_floor(now);
        if let Some(last) = self.points.last().copied() {
            if last.week < week && self.points.len() < MAX_WEIGHT_POINTS {
                self.points.push(WeightPoint { week, weight: last.weight });
            }
        }
    }
}

impl GaugeAccount for WeightHistory {
    const DISCRIMINATOR: [u8; 8] = *b"WEIGHTS\0";
    const LEN: usize = 8 + 32 + 4 + MAX_WEIGHT_POINTS * 24;

    fn discriminator(&self) -> [u8; 8] {
        self.discriminator
    }
}
