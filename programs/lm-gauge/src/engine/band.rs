use std::collections::BTreeMap;

use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::{
    constants::{MAX_TICKS, WAD},
    error::GaugeError,
    math::{wad_mul, U256},
    state::{BandRecord, GaugeState, UserPosition},
};

/// Keeps per-band reward-per-share integrals in step with the global one
pub struct BandLedger;

impl BandLedger {
    /// Refresh `size` bands from `start`, overwriting their collateral per
    /// share when `values` is given. Must run after the global integral was
    /// advanced for the same call.
    pub fn apply_collateral_update(
        state: &mut GaugeState,
        bands: &mut BTreeMap<i32, BandRecord>,
        start: i32,
        values: Option<&[u128]>,
        size: usize,
    ) -> Result<(), ProgramError> {
        if size > MAX_TICKS {
            return Err(GaugeError::RangeTooLarge.into());
        }
        if let Some(values) = values {
            if values.len() != size {
                return Err(GaugeError::MismatchedDataLength.into());
            }
        }

        for offset in 0..size {
            let index = UserPosition::band_at(start, offset)?;
            let band = bands
                .entry(index)
                .or_insert_with(|| BandRecord::new(Pubkey::default(), index, 0));
            let new_cps = values.map(|values| values[offset]);
            Self::refresh_band(state, band, new_cps)?;
        }
        Ok(())
    }

    /// Bring one band up to the current global integral, then apply a new
    /// collateral per share if one is given. The band integral saturates
    /// rather than failing.
    pub fn refresh_band(
        state: &mut GaugeState,
        band: &mut BandRecord,
        new_cps: Option<u128>,
    ) -> Result<(), ProgramError> {
        let global = state.integral.value;
        let old_cps = band.collateral_per_share;

        let elapsed = global.saturating_sub(&band.reward_per_share.last_global_seen);
        if !elapsed.is_zero() {
            let accrued = elapsed.mul_div(old_cps, WAD).unwrap_or(U256::MAX);
            band.reward_per_share.value = band.reward_per_share.value.saturating_add(&accrued);
        }
        band.reward_per_share.last_global_seen = global;

        if let Some(new_cps) = new_cps {
            if new_cps != old_cps {
                let shift = wad_mul(band.working_shares_total, new_cps.abs_diff(old_cps))?;
                state.working_supply = if new_cps > old_cps {
                    state.working_supply.saturating_add(shift)
                } else {
                    state.working_supply.saturating_sub(shift)
                };
                band.collateral_per_share = new_cps;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_at(value: u128, working_supply: u128) -> GaugeState {
        let mut state = GaugeState::new(0);
        state.integral.value = U256::from_u128(value);
        state.working_supply = working_supply;
        state
    }

    #[test]
    fn test_new_bands_created_on_first_write() {
        let mut state = state_at(0, 0);
        let mut bands = BTreeMap::new();

        BandLedger::apply_collateral_update(&mut state, &mut bands, -1, Some(&[WAD, 2 * WAD]), 2)
            .unwrap();

        assert_eq!(bands.len(), 2);
        assert_eq!(bands[&-1].collateral_per_share, WAD);
        assert_eq!(bands[&0].collateral_per_share, 2 * WAD);
        assert_eq!(bands[&0].index, 0);
    }

    #[test]
    fn test_band_accrues_at_old_collateral_per_share() {
        let mut state = state_at(0, 10 * WAD);
        let mut bands = BTreeMap::new();
        BandLedger::apply_collateral_update(&mut state, &mut bands, 3, Some(&[2 * WAD]), 1)
            .unwrap();

        state.integral.value = U256::from_u128(5 * WAD);
        BandLedger::apply_collateral_update(&mut state, &mut bands, 3, Some(&[WAD]), 1).unwrap();

        let band = &bands[&3];
        assert_eq!(band.reward_per_share.value, U256::from_u128(10 * WAD));
        assert_eq!(band.reward_per_share.last_global_seen, U256::from_u128(5 * WAD));
        assert_eq!(band.collateral_per_share, WAD);
    }

    #[test]
    fn test_refresh_without_values_keeps_collateral() {
        let mut state = state_at(0, 0);
        let mut bands = BTreeMap::new();
        BandLedger::apply_collateral_update(&mut state, &mut bands, 0, Some(&[WAD]), 1).unwrap();

        state.integral.value = U256::from_u128(3 * WAD);
        BandLedger::apply_collateral_update(&mut state, &mut bands, 0, None, 1).unwrap();
        BandLedger::apply_collateral_update(&mut state, &mut bands, 0, None, 1).unwrap();

        assert_eq!(bands[&0].collateral_per_share, WAD);
        assert_eq!(bands[&0].reward_per_share.value, U256::from_u128(3 * WAD));
    }

    #[test]
    fn test_collateral_move_shifts_working_supply() {
        let mut state = state_at(0, 12 * WAD);
        let mut band = BandRecord::new(Pubkey::default(), 0, 0);
        band.collateral_per_share = WAD;
        band.working_shares_total = 12 * WAD;

        BandLedger::refresh_band(&mut state, &mut band, Some(WAD / 2)).unwrap();
        assert_eq!(state.working_supply, 6 * WAD);

        BandLedger::refresh_band(&mut state, &mut band, Some(2 * WAD)).unwrap();
        assert_eq!(state.working_supply, 24 * WAD);
    }

    #[test]
    fn test_working_supply_clamped_at_zero() {
        let mut state = state_at(0, WAD);
        let mut band = BandRecord::new(Pubkey::default(), 0, 0);
        band.collateral_per_share = 4 * WAD;
        band.working_shares_total = WAD;

        BandLedger::refresh_band(&mut state, &mut band, Some(0)).unwrap();
        assert_eq!(state.working_supply, 0);
    }

    #[test]
    fn test_range_checks_before_mutation() {
        let mut state = state_at(0, 0);
        let mut bands = BTreeMap::new();
        let values = vec![WAD; MAX_TICKS + 1];

        let err = BandLedger::apply_collateral_update(
            &mut state,
            &mut bands,
            0,
            Some(&values),
            MAX_TICKS + 1,
        )
        .unwrap_err();
        assert_eq!(err, ProgramError::from(GaugeError::RangeTooLarge));

        let err =
            BandLedger::apply_collateral_update(&mut state, &mut bands, 0, Some(&[WAD]), 2)
                .unwrap_err();
        assert_eq!(err, ProgramError::from(GaugeError::MismatchedDataLength));
        assert!(bands.is_empty());
    }

    #[test]
    fn test_band_integral_follows_wide_global() {
        let mut state = state_at(0, 1);
        let mut bands = BTreeMap::new();
        BandLedger::apply_collateral_update(&mut state, &mut bands, 0, Some(&[2 * WAD]), 1)
            .unwrap();

        let global = U256::new(3, 7);
        state.integral.value = global;
        BandLedger::apply_collateral_update(&mut state, &mut bands, 0, None, 1).unwrap();

        let band = &bands[&0];
        assert_eq!(band.reward_per_share.value, U256::new(6, 14));
        assert_eq!(band.reward_per_share.last_global_seen, global);
    }
}
