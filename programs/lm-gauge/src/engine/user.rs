use std::collections::BTreeMap;

use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::{
    constants::{MAX_TICKS, WAD},
    engine::{BandLedger, BoostCalculator},
    error::GaugeError,
    events::{Event, UserCheckpoint},
    math::{checked_add, mul_div, wad_mul},
    sources::VoteEscrowSource,
    state::{BandRecord, GaugeState, UserBandEntry, UserPosition},
};

/// Per-user, per-band reward bookkeeping
pub struct UserLedger;

impl UserLedger {
    /// Settle the user's accrued reward, and with `shares` replace their
    /// whole band range with `[start, start + shares.len())`.
    ///
    /// Without `shares` the stored range is settled and `start` is ignored.
    /// The boost is then recomputed from the stored shares at the current
    /// collateral per share and vote-escrow balance, so a decayed or grown
    /// lock takes effect without moving the position.
    pub fn set_position(
        state: &mut GaugeState,
        bands: &mut BTreeMap<i32, BandRecord>,
        position: &mut UserPosition,
        start: i32,
        shares: Option<&[u128]>,
        ve: &dyn VoteEscrowSource,
    ) -> Result<(), ProgramError> {
        match shares {
            Some(shares) => Self::replace_range(state, bands, position, start, shares, ve)?,
            None => {
                let start = position.band_start;
                let shares = Self::stored_shares(position);
                Self::replace_range(state, bands, position, start, &shares, ve)?;
            }
        }
        Self::emit_checkpoint(position);
        Ok(())
    }

    /// Raw shares of the stored range, in band order
    fn stored_shares(position: &UserPosition) -> Vec<u128> {
        position.bands.iter().map(|entry| entry.shares).collect()
    }

    fn emit_checkpoint(position: &UserPosition) {
        UserCheckpoint {
            user: position.owner,
            band_start: position.band_start,
            size: position.range_size,
            claimable_accrued: position.claimable_accrued,
        }
        .emit();
    }

    fn replace_range(
        state: &mut GaugeState,
        bands: &mut BTreeMap<i32, BandRecord>,
        position: &mut UserPosition,
        start: i32,
        shares: &[u128],
        ve: &dyn VoteEscrowSource,
    ) -> Result<(), ProgramError> {
        let size = shares.len();
        if size > MAX_TICKS {
            return Err(GaugeError::RangeTooLarge.into());
        }
        let old_range = position.occupied_bands()?;
        let new_range = (0..size)
            .map(|offset| UserPosition::band_at(start, offset))
            .collect::<Result<Vec<_>, _>>()?;

        // Departed bands may not have been part of this call's collateral
        // update, so bring every touched band up to the global integral.
        for &index in old_range.iter().chain(new_range.iter()) {
            let band = bands
                .entry(index)
                .or_insert_with(|| BandRecord::new(Pubkey::default(), index, 0));
            BandLedger::refresh_band(state, band, None)?;
        }

        // Settle and release the old range at its old working shares
        let mut kept: BTreeMap<i32, UserBandEntry> = BTreeMap::new();
        let mut accrued = position.claimable_accrued;
        for (mut entry, index) in position.bands.iter().copied().zip(old_range) {
            let band = bands.get_mut(&index).ok_or(GaugeError::InvalidBandAccount)?;
            accrued = checked_add(accrued, Self::settle(&mut entry, band)?)?;
            band.working_shares_total =
                band.working_shares_total.saturating_sub(entry.working_shares);
            kept.insert(index, entry);
        }
        position.claimable_accrued = accrued;

        let mut raw = 0u128;
        for (&amount, index) in shares.iter().zip(&new_range) {
            let band = bands.get(index).ok_or(GaugeError::InvalidBandAccount)?;
            raw = checked_add(raw, wad_mul(amount, band.collateral_per_share)?)?;
        }
        let working_balance = BoostCalculator::update(state, position, raw, ve)?;

        let mut entries = Vec::with_capacity(size);
        for (&amount, index) in shares.iter().zip(&new_range) {
            let band = bands.get_mut(index).ok_or(GaugeError::InvalidBandAccount)?;
            let working_shares = if raw == 0 {
                0
            } else {
                mul_div(amount, working_balance, raw)?
            };
            band.working_shares_total = checked_add(band.working_shares_total, working_shares)?;

            let mut entry = kept.remove(index).unwrap_or_default();
            entry.shares = amount;
            entry.working_shares = working_shares;
            entry.reward_per_share_paid = band.reward_per_share.value;
            entries.push(entry);
        }

        position.band_start = start;
        position.range_size = size as u8;
        position.bands = entries;
        Ok(())
    }

    /// Credit the entry with reward accrued since it was last settled against
    /// `band` and return the credited amount
    fn settle(entry: &mut UserBandEntry, band: &BandRecord) -> Result<u128, ProgramError> {
        let current = band.reward_per_share.value;
        let delta = current
            .saturating_sub(&entry.reward_per_share_paid)
            .mul_div(entry.working_shares, WAD)
            .and_then(|delta| delta.to_u128())
            .ok_or(GaugeError::ArithmeticOverflow)?;
        entry.integral = checked_add(entry.integral, delta)?;
        entry.reward_per_share_paid = current;
        Ok(delta)
    }
}
