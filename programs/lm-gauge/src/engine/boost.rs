use solana_program::program_error::ProgramError;

use crate::{
    events::{BoostUpdated, Event},
    math::{apply_delta, checked_add, mul_div, percent_of},
    sources::VoteEscrowSource,
    state::{GaugeState, UserPosition},
};

/// Turns raw collateral into a vote-escrow boosted working balance
pub struct BoostCalculator;

impl BoostCalculator {
    /// Record `raw` as the user's collateral and recompute their working
    /// balance. Returns the new working balance.
    pub fn update(
        state: &mut GaugeState,
        position: &mut UserPosition,
        raw: u128,
        ve: &dyn VoteEscrowSource,
    ) -> Result<u128, ProgramError> {
        let total_collateral = apply_delta(state.total_collateral, raw, position.raw_collateral);
        let working_balance = Self::working_balance(
            raw,
            total_collateral,
            ve.boosted_balance_of(&position.owner),
            ve.total_supply(),
            state.config.tokenless_production,
        )?;

        state.total_collateral = total_collateral;
        state.working_supply =
            apply_delta(state.working_supply, working_balance, position.working_balance);
        position.raw_collateral = raw;
        position.working_balance = working_balance;

        BoostUpdated {
            user: position.owner,
            raw_collateral: raw,
            total_collateral,
            working_balance,
            working_supply: state.working_supply,
        }
        .emit();

        Ok(working_balance)
    }

    /// `min(raw, raw * tp% + total * ve_balance / ve_total * (100 - tp)%)`
    pub fn working_balance(
        raw: u128,
        total_collateral: u128,
        ve_balance: u128,
        ve_total: u128,
        tokenless_production: u8,
    ) -> Result<u128, ProgramError> {
        let mut limit = percent_of(raw, tokenless_production)?;
        if ve_total > 0 {
            let share = mul_div(total_collateral, ve_balance, ve_total)?;
            limit = checked_add(limit, percent_of(share, 100 - tokenless_production)?)?;
        }
        Ok(limit.min(raw))
    }
}
