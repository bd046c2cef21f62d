use solana_program::program_error::ProgramError;

use crate::{
    constants::WEEK,
    math::U256,
    sources::{week_floor, EpochRateSource, WeightSchedule},
    state::GaugeState,
};

/// Advances the gauge-wide reward-per-working-collateral integral
pub struct GlobalIntegral;

impl GlobalIntegral {
    /// Integrate `rate * weight / working_supply` from the last checkpoint to
    /// `now`, one governance week at a time.
    ///
    /// The cached emission rate is refreshed once its epoch has ended; the
    /// part of the window before the old epoch boundary keeps the old rate.
    /// With no working supply the timestamp still moves and that reward time
    /// is dropped. Walking stops after `config.max_week_steps` weeks and the
    /// remainder up to `now` is dropped as well.
    ///
    /// The integral is 256 bits wide so a dust working supply cannot overflow
    /// it; a step that still would saturates instead of failing the call.
    pub fn advance(
        state: &mut GaugeState,
        now: i64,
        emission: &mut dyn EpochRateSource,
        weights: &mut dyn WeightSchedule,
    ) -> Result<(), ProgramError> {
        let last = state.integral.timestamp;
        if now <= last {
            return Ok(());
        }

        let mut rate = state.inflation_rate;
        let mut new_rate = rate;
        let prev_epoch = state.next_epoch_time;
        if prev_epoch <= now {
            state.next_epoch_time = emission.advance_epoch(now);
            new_rate = emission.current_rate();
            state.inflation_rate = new_rate;
            if prev_epoch <= last {
                // boundary already behind the window
                rate = new_rate;
            }
        }
        if state.is_killed {
            rate = 0;
            new_rate = 0;
        }

        weights.force_checkpoint(now);

        let working_supply = state.working_supply;
        if working_supply > 0 {
            let mut value = state.integral.value;
            let mut step_start = last;
            let mut step_end = next_week(last).min(now);

            for _ in 0..state.config.max_week_steps {
                let weight = weights.relative_weight(week_floor(step_start));
                if prev_epoch >= step_start && prev_epoch < step_end {
                    value = value.saturating_add(&segment(
                        rate,
                        weight,
                        prev_epoch - step_start,
                        working_supply,
                    ));
                    rate = new_rate;
                    value = value.saturating_add(&segment(
                        rate,
                        weight,
                        step_end - prev_epoch,
                        working_supply,
                    ));
                } else {
                    value = value.saturating_add(&segment(
                        rate,
                        weight,
                        step_end - step_start,
                        working_supply,
                    ));
                }

                if step_end == now {
                    break;
                }
                step_start = step_end;
                step_end = step_end.saturating_add(WEEK).min(now);
            }
            state.integral.value = value;
        }

        state.integral.timestamp = now;
        Ok(())
    }
}

fn next_week(t: i64) -> i64 {
    week_floor(t).saturating_add(WEEK)
}

/// rate * dt * weight / working_supply, saturated
fn segment(rate: u128, weight: u128, dt: i64, working_supply: u128) -> U256 {
    let dt = u128::try_from(dt).unwrap_or(0);
    U256::mul_u128(rate, dt)
        .mul_div(weight, working_supply)
        .unwrap_or(U256::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::{WAD, YEAR},
        sources::{EmissionSchedule, WeightHistory, WeightPoint},
        state::GaugeStatus,
    };
    use solana_program::pubkey::Pubkey;

    fn active_state(now: i64, schedule: &mut EmissionSchedule, supply: u128) -> GaugeState {
        let mut state = GaugeState::new(0);
        state.status = GaugeStatus::Active;
        state.integral.timestamp = now;
        state.next_epoch_time = schedule.advance_epoch(now);
        state.inflation_rate = schedule.current_rate();
        state.working_supply = supply;
        state
    }

    #[test]
    fn test_constant_rate_within_week() {
        let mut schedule = EmissionSchedule::constant(WAD, 0);
        let mut weights = WeightHistory::constant(Pubkey::default(), WAD);
        let mut state = active_state(100, &mut schedule, 10 * WAD);

        GlobalIntegral::advance(&mut state, 1_100, &mut schedule, &mut weights).unwrap();

        // 1 token/s for 1000s over 10 units of supply
        assert_eq!(state.integral.value, U256::from_u128(100 * WAD));
        assert_eq!(state.integral.timestamp, 1_100);
    }

    #[test]
    fn test_no_op_when_time_does_not_move() {
        let mut schedule = EmissionSchedule::constant(WAD, 0);
        let mut weights = WeightHistory::constant(Pubkey::default(), WAD);
        let mut state = active_state(500, &mut schedule, WAD);

        GlobalIntegral::advance(&mut state, 500, &mut schedule, &mut weights).unwrap();
        GlobalIntegral::advance(&mut state, 400, &mut schedule, &mut weights).unwrap();
        assert_eq!(state.integral.value, U256::ZERO);
        assert_eq!(state.integral.timestamp, 500);
    }

    #[test]
    fn test_zero_supply_drops_reward_time() {
        let mut schedule = EmissionSchedule::constant(WAD, 0);
        let mut weights = WeightHistory::constant(Pubkey::default(), WAD);
        let mut state = active_state(0, &mut schedule, 0);

        GlobalIntegral::advance(&mut state, 1_000, &mut schedule, &mut weights).unwrap();
        assert_eq!(state.integral.value, U256::ZERO);
        assert_eq!(state.integral.timestamp, 1_000);

        state.working_supply = WAD;
        GlobalIntegral::advance(&mut state, 1_010, &mut schedule, &mut weights).unwrap();
        // only the last 10 seconds count
        assert_eq!(state.integral.value, U256::from_u128(10 * WAD));
    }

    #[test]
    fn test_weight_changes_at_week_boundary() {
        let mut schedule = EmissionSchedule::constant(WAD, 0);
        let mut weights = WeightHistory::new(
            Pubkey::default(),
            vec![
                WeightPoint { week: 0, weight: WAD },
                WeightPoint { week: WEEK, weight: WAD / 2 },
            ],
        );
        let mut state = active_state(WEEK - 100, &mut schedule, WAD);

        GlobalIntegral::advance(&mut state, WEEK + 100, &mut schedule, &mut weights).unwrap();
        // 100s at full weight, 100s at half weight
        assert_eq!(state.integral.value, U256::from_u128(150 * WAD));
    }

    #[test]
    fn test_epoch_split_matches_two_advances() {
        let epoch = 3 * WEEK + 12_345;
        let new_schedule = || EmissionSchedule::new(4 * WAD, epoch - YEAR, YEAR, 2 * WAD);
        let weights = WeightHistory::constant(Pubkey::default(), WAD / 3);
        let start = 2 * WEEK + 77;
        let end = 5 * WEEK + 1_001;

        let mut schedule = new_schedule();
        let mut w = weights.clone();
        let mut single = active_state(start, &mut schedule, 7 * WAD);
        GlobalIntegral::advance(&mut single, end, &mut schedule, &mut w).unwrap();

        let mut schedule = new_schedule();
        let mut w = weights.clone();
        let mut split = active_state(start, &mut schedule, 7 * WAD);
        GlobalIntegral::advance(&mut split, epoch, &mut schedule, &mut w).unwrap();
        assert_eq!(split.inflation_rate, 2 * WAD);
        GlobalIntegral::advance(&mut split, end, &mut schedule, &mut w).unwrap();

        assert_eq!(single.integral, split.integral);
        assert_eq!(single.inflation_rate, 2 * WAD);
        assert_eq!(single.next_epoch_time, epoch + YEAR);
    }

    #[test]
    fn test_epoch_uses_old_rate_before_boundary() {
        let epoch = 1_000;
        let mut schedule = EmissionSchedule::new(4 * WAD, epoch - YEAR, YEAR, 2 * WAD);
        let mut weights = WeightHistory::constant(Pubkey::default(), WAD);
        let mut state = active_state(0, &mut schedule, WAD);

        GlobalIntegral::advance(&mut state, 2_000, &mut schedule, &mut weights).unwrap();
        // 1000s at 4/s then 1000s at 2/s
        assert_eq!(state.integral.value, U256::from_u128(6_000 * WAD));
    }

    #[test]
    fn test_killed_gauge_accrues_nothing() {
        let mut schedule = EmissionSchedule::constant(WAD, 0);
        let mut weights = WeightHistory::constant(Pubkey::default(), WAD);
        let mut state = active_state(0, &mut schedule, WAD);
        state.is_killed = true;

        GlobalIntegral::advance(&mut state, 5_000, &mut schedule, &mut weights).unwrap();
        assert_eq!(state.integral.value, U256::ZERO);
        assert_eq!(state.integral.timestamp, 5_000);
    }

    #[test]
    fn test_step_cap_drops_remaining_time() {
        let mut schedule = EmissionSchedule::constant(1, 0);
        let mut weights = WeightHistory::constant(Pubkey::default(), WAD);
        let mut state = active_state(0, &mut schedule, WAD);
        state.config.max_week_steps = 2;

        GlobalIntegral::advance(&mut state, 10 * WEEK, &mut schedule, &mut weights).unwrap();
        // only the first two weeks were walked
        assert_eq!(state.integral.value, U256::from_u128(2 * WEEK as u128));
        assert_eq!(state.integral.timestamp, 10 * WEEK);
    }

    #[test]
    fn test_dust_supply_grows_past_u128() {
        let mut schedule = EmissionSchedule::constant(WAD, 0);
        let mut weights = WeightHistory::constant(Pubkey::default(), WAD);
        let mut state = active_state(0, &mut schedule, 1);

        GlobalIntegral::advance(&mut state, WEEK, &mut schedule, &mut weights).unwrap();
        let week = U256::mul_u128(WAD * WEEK as u128, WAD);
        assert!(week.to_u128().is_none());
        assert_eq!(state.integral.value, week);

        GlobalIntegral::advance(&mut state, 2 * WEEK, &mut schedule, &mut weights).unwrap();
        assert_eq!(state.integral.value, week.checked_add(&week).unwrap());
    }

    #[test]
    fn test_integral_saturates_instead_of_failing() {
        let mut schedule = EmissionSchedule::constant(u128::MAX, 0);
        let mut weights = WeightHistory::constant(Pubkey::default(), WAD);
        let mut state = active_state(0, &mut schedule, 1);
        state.integral.value = U256::MAX.saturating_sub(&U256::from_u128(5));

        GlobalIntegral::advance(&mut state, 3 * WEEK, &mut schedule, &mut weights).unwrap();
        assert_eq!(state.integral.value, U256::MAX);
        assert_eq!(state.integral.timestamp, 3 * WEEK);
    }
}
