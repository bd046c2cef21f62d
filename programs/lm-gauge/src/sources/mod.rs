//! Interfaces to the collaborators the gauge consumes, plus the snapshot
//! accounts those collaborators publish on chain.

pub mod emission;
pub mod market_maker;
pub mod minter;
pub mod vote_escrow;
pub mod weights;

pub use emission::*;
pub use market_maker::*;
pub use minter::*;
pub use vote_escrow::*;
pub use weights::*;

use solana_program::pubkey::Pubkey;

/// Inflation schedule of the reward token
pub trait EpochRateSource {
    /// Emission rate (reward units per second) of the current epoch
    fn current_rate(&self) -> u128;

    /// Roll the schedule forward to `now` and return the start of the next epoch
    fn advance_epoch(&mut self, now: i64) -> i64;
}

/// Weekly governance weight of this gauge
pub trait WeightSchedule {
    /// WAD-scaled share of emissions for the week containing `week_start`
    fn relative_weight(&self, week_start: i64) -> u128;

    /// Bring the weight history up to `now`
    fn force_checkpoint(&mut self, now: i64);
}

pub trait VoteEscrowSource {
    fn boosted_balance_of(&self, user: &Pubkey) -> u128;
    fn total_supply(&self) -> u128;
}

pub trait Minter {
    /// Reward already paid out to `user` from this gauge
    fn already_minted(&self, user: &Pubkey) -> u128;
}
