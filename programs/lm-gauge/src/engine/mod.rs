//! Reward accrual engine
//!
//! `GaugeEngine` holds everything one instruction touches: the gauge record,
//! the bands it loaded and the user positions it loaded. Each entry point
//! works on a scratch copy and replaces `self` only when every step
//! succeeded, so a failed call leaves no partial update behind.

pub mod band;
pub mod boost;
pub mod global;
pub mod user;

pub use band::BandLedger;
pub use boost::BoostCalculator;
pub use global::GlobalIntegral;
pub use user::UserLedger;

use std::collections::BTreeMap;

use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    constants::MAX_TICKS,
    error::GaugeError,
    events::{CollateralCheckpoint, Event, GaugeInitialized, GaugeKilled},
    math::percent_of,
    sources::{EpochRateSource, MarketMakerView, Minter, VoteEscrowSource, WeightSchedule},
    state::{BandRecord, GaugeBinding, GaugeConfig, GaugeState, GaugeStatus, UserPosition},
};

/// Collaborators needed to advance the global integral
pub struct IntegralSources<'a> {
    pub emission: &'a mut dyn EpochRateSource,
    pub weights: &'a mut dyn WeightSchedule,
}

impl<'a> IntegralSources<'a> {
    pub fn new(
        emission: &'a mut dyn EpochRateSource,
        weights: &'a mut dyn WeightSchedule,
    ) -> Self {
        Self { emission, weights }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GaugeEngine {
    pub state: GaugeState,
    pub bands: BTreeMap<i32, BandRecord>,
    pub users: BTreeMap<Pubkey, UserPosition>,
}

impl GaugeEngine {
    pub fn new(state: GaugeState) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }

    /// Bind the gauge to its market maker and read the first emission rate
    pub fn initialize(
        &mut self,
        binding: GaugeBinding,
        market: &MarketMakerView,
        config: GaugeConfig,
        now: i64,
        emission: &mut dyn EpochRateSource,
    ) -> Result<(), ProgramError> {
        if self.state.is_active() {
            return Err(GaugeError::AlreadyInitialized.into());
        }
        config.validate()?;
        let borrowed = market.coins(0).ok_or(GaugeError::InvalidAccountData)?;
        let collateral = market.coins(1).ok_or(GaugeError::InvalidAccountData)?;
        if borrowed == collateral {
            return Err(GaugeError::SameCoin.into());
        }

        let state = &mut self.state;
        state.binding = GaugeBinding {
            collateral_mint: collateral,
            ..binding
        };
        state.config = config;
        state.integral.timestamp = now;
        state.next_epoch_time = emission.advance_epoch(now);
        state.inflation_rate = emission.current_rate();
        state.status = GaugeStatus::Active;

        msg!(
            "Gauge bound to {} at rate {}",
            state.binding.amm,
            state.inflation_rate
        );
        GaugeInitialized {
            amm: state.binding.amm,
            collateral_mint: state.binding.collateral_mint,
            inflation_rate: state.inflation_rate,
            next_epoch_time: state.next_epoch_time,
        }
        .emit();
        Ok(())
    }

    /// AMM callback: new collateral per share for bands `[start, start + len)`
    pub fn on_collateral_changed(
        &mut self,
        caller: &Pubkey,
        now: i64,
        start: i32,
        collateral_per_share: &[u128],
        src: IntegralSources,
    ) -> Result<(), ProgramError> {
        self.require_amm(caller)?;
        Self::check_range(collateral_per_share.len())?;
        self.transact(|engine| engine.checkpoint_collateral(now, start, collateral_per_share, src))
    }

    /// AMM callback: the user's shares now span `[start, start + len)`.
    ///
    /// Uses the collateral per share stored by the preceding
    /// `on_collateral_changed` of the same transition.
    pub fn on_user_changed(
        &mut self,
        caller: &Pubkey,
        user: &Pubkey,
        start: i32,
        shares: &[u128],
        ve: &dyn VoteEscrowSource,
    ) -> Result<(), ProgramError> {
        self.require_amm(caller)?;
        Self::check_range(shares.len())?;
        self.transact(|engine| engine.replace_position(user, start, shares, ve))
    }

    /// Both AMM callbacks of one transition, in order
    #[allow(clippy::too_many_arguments)]
    pub fn sync_position(
        &mut self,
        caller: &Pubkey,
        now: i64,
        user: &Pubkey,
        collateral_start: i32,
        collateral_per_share: &[u128],
        start: i32,
        shares: &[u128],
        src: IntegralSources,
        ve: &dyn VoteEscrowSource,
    ) -> Result<(), ProgramError> {
        self.require_amm(caller)?;
        Self::check_range(collateral_per_share.len())?;
        Self::check_range(shares.len())?;
        self.transact(|engine| {
            engine.checkpoint_collateral(now, collateral_start, collateral_per_share, src)?;
            engine.replace_position(user, start, shares, ve)
        })
    }

    /// Bring `user`'s accrued reward up to `now` and refresh their boost.
    /// Callable by the user or the minter.
    pub fn checkpoint(
        &mut self,
        caller: &Pubkey,
        now: i64,
        user: &Pubkey,
        src: IntegralSources,
        ve: &dyn VoteEscrowSource,
    ) -> Result<u128, ProgramError> {
        self.require_active()?;
        if caller != user && *caller != self.state.binding.minter {
            return Err(GaugeError::Unauthorized.into());
        }
        self.transact(|engine| engine.checkpoint_user(now, user, src, ve))
    }

    /// Reward earned by `user` and not yet minted, as of `now`
    pub fn claimable(
        &mut self,
        now: i64,
        user: &Pubkey,
        src: IntegralSources,
        ve: &dyn VoteEscrowSource,
        minter: &dyn Minter,
    ) -> Result<u128, ProgramError> {
        self.require_active()?;
        let accrued = self.transact(|engine| engine.checkpoint_user(now, user, src, ve))?;
        Ok(accrued.saturating_sub(minter.already_minted(user)))
    }

    /// Checkpoint someone else's position once their vote-escrow balance no
    /// longer supports the boost they hold. Callable by anyone.
    pub fn kick(
        &mut self,
        now: i64,
        user: &Pubkey,
        src: IntegralSources,
        ve: &dyn VoteEscrowSource,
    ) -> Result<(), ProgramError> {
        self.require_active()?;
        let position = self
            .users
            .get(user)
            .ok_or(GaugeError::InvalidAccountData)?;

        // only a boost above the floor can decay, and only a lower balance
        // than the one it was granted at makes it stale
        let floor = percent_of(position.raw_collateral, self.state.config.tokenless_production)?;
        let supported = BoostCalculator::working_balance(
            position.raw_collateral,
            self.state.total_collateral,
            ve.boosted_balance_of(user),
            ve.total_supply(),
            self.state.config.tokenless_production,
        )?;
        if position.working_balance <= floor || supported >= position.working_balance {
            return Err(GaugeError::KickNotAllowed.into());
        }

        self.transact(|engine| engine.checkpoint_user(now, user, src, ve).map(|_| ()))
    }

    /// Stop or resume emissions. Accrual up to `now` uses the old setting.
    pub fn set_killed(
        &mut self,
        caller: &Pubkey,
        now: i64,
        killed: bool,
        src: IntegralSources,
    ) -> Result<(), ProgramError> {
        self.require_active()?;
        if *caller != self.state.binding.authority {
            return Err(GaugeError::Unauthorized.into());
        }
        self.transact(|engine| {
            GlobalIntegral::advance(&mut engine.state, now, src.emission, src.weights)?;
            engine.state.is_killed = killed;
            GaugeKilled {
                killed,
                timestamp: now,
            }
            .emit();
            Ok(())
        })
    }

    pub fn working_balance(&self, user: &Pubkey) -> u128 {
        self.users
            .get(user)
            .map(|position| position.working_balance)
            .unwrap_or(0)
    }

    pub fn working_supply(&self) -> u128 {
        self.state.working_supply
    }

    pub fn total_collateral(&self) -> u128 {
        self.state.total_collateral
    }

    /// Total reward credited to `user` so far, minted or not
    pub fn integrate_fraction(&self, user: &Pubkey) -> u128 {
        self.users
            .get(user)
            .map(|position| position.claimable_accrued)
            .unwrap_or(0)
    }

    pub fn last_checkpoint(&self) -> i64 {
        self.state.integral.timestamp
    }

    fn checkpoint_collateral(
        &mut self,
        now: i64,
        start: i32,
        collateral_per_share: &[u128],
        src: IntegralSources,
    ) -> Result<(), ProgramError> {
        GlobalIntegral::advance(&mut self.state, now, src.emission, src.weights)?;
        BandLedger::apply_collateral_update(
            &mut self.state,
            &mut self.bands,
            start,
            Some(collateral_per_share),
            collateral_per_share.len(),
        )?;

        CollateralCheckpoint {
            band_start: start,
            size: collateral_per_share.len() as u8,
            integral: self.state.integral.value,
            working_supply: self.state.working_supply,
        }
        .emit();
        Ok(())
    }

    fn replace_position(
        &mut self,
        user: &Pubkey,
        start: i32,
        shares: &[u128],
        ve: &dyn VoteEscrowSource,
    ) -> Result<(), ProgramError> {
        let position = self
            .users
            .entry(*user)
            .or_insert_with(|| UserPosition::new(Pubkey::default(), *user, 0));
        UserLedger::set_position(&mut self.state, &mut self.bands, position, start, Some(shares), ve)
    }

    /// Advance the integral, settle the user's stored range and refresh their
    /// boost. Returns the user's `claimable_accrued`; an unknown user has
    /// nothing to settle.
    fn checkpoint_user(
        &mut self,
        now: i64,
        user: &Pubkey,
        src: IntegralSources,
        ve: &dyn VoteEscrowSource,
    ) -> Result<u128, ProgramError> {
        GlobalIntegral::advance(&mut self.state, now, src.emission, src.weights)?;

        let position = match self.users.get_mut(user) {
            Some(position) => position,
            None => return Ok(0),
        };
        let start = position.band_start;
        UserLedger::set_position(&mut self.state, &mut self.bands, position, start, None, ve)?;
        Ok(position.claimable_accrued)
    }

    fn transact<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ProgramError>,
    ) -> Result<T, ProgramError> {
        let mut scratch = self.clone();
        let out = f(&mut scratch)?;
        *self = scratch;
        Ok(out)
    }

    fn require_active(&self) -> Result<(), ProgramError> {
        if !self.state.is_active() {
            return Err(GaugeError::NotInitialized.into());
        }
        Ok(())
    }

    fn require_amm(&self, caller: &Pubkey) -> Result<(), ProgramError> {
        self.require_active()?;
        if *caller != self.state.binding.amm {
            return Err(GaugeError::Unauthorized.into());
        }
        Ok(())
    }

    fn check_range(size: usize) -> Result<(), ProgramError> {
        if size > MAX_TICKS {
            return Err(GaugeError::RangeTooLarge.into());
        }
        Ok(())
    }
}
