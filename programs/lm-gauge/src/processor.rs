use std::collections::BTreeMap;

use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke_signed, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::{
    constants::{BAND_SEED, GAUGE_SEED, MAX_TICKS, USER_SEED},
    engine::{GaugeEngine, IntegralSources},
    error::GaugeError,
    instruction::{
        band_address, gauge_address, minted_address, user_address, ve_balance_address,
        GaugeInstruction,
    },
    sources::{
        EmissionSchedule, MarketMakerView, MintedRecord, MintedView, VoteEscrowBalance,
        VoteEscrowSupply, VoteEscrowView, WeightHistory,
    },
    state::{BandRecord, GaugeAccount, GaugeBinding, GaugeConfig, GaugeState, UserPosition},
};

/// Band accounts passed to an instruction, keyed by band index
type BandInfos<'a, 'b> = BTreeMap<i32, &'a AccountInfo<'b>>;

/// Payer and system program, for instructions that may create accounts
type Funding<'a, 'b> = (&'a AccountInfo<'b>, &'a AccountInfo<'b>);

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = GaugeInstruction::unpack(instruction_data)?;

        match instruction {
            GaugeInstruction::Initialize {
                minter,
                minter_program,
                ve_program,
                config,
            } => {
                msg!("Instruction: Initialize");
                Self::process_initialize(program_id, accounts, minter, minter_program, ve_program, config)
            }
            GaugeInstruction::CollateralSharesChanged {
                start,
                collateral_per_share,
            } => {
                msg!("Instruction: CollateralSharesChanged");
                Self::process_collateral_shares_changed(program_id, accounts, start, collateral_per_share)
            }
            GaugeInstruction::UserSharesChanged { user, start, shares } => {
                msg!("Instruction: UserSharesChanged");
                Self::process_user_shares_changed(program_id, accounts, user, start, shares)
            }
            GaugeInstruction::SyncPosition {
                user,
                collateral_start,
                collateral_per_share,
                start,
                shares,
            } => {
                msg!("Instruction: SyncPosition");
                Self::process_sync_position(
                    program_id,
                    accounts,
                    user,
                    collateral_start,
                    collateral_per_share,
                    start,
                    shares,
                )
            }
            GaugeInstruction::Checkpoint { user } => {
                msg!("Instruction: Checkpoint");
                Self::process_checkpoint(program_id, accounts, user)
            }
            GaugeInstruction::Claimable { user } => {
                msg!("Instruction: Claimable");
                Self::process_claimable(program_id, accounts, user)
            }
            GaugeInstruction::Kick { user } => {
                msg!("Instruction: Kick");
                Self::process_kick(program_id, accounts, user)
            }
            GaugeInstruction::SetKilled { killed } => {
                msg!("Instruction: SetKilled");
                Self::process_set_killed(program_id, accounts, killed)
            }
        }
    }

    fn process_initialize(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        minter: Pubkey,
        minter_program: Pubkey,
        ve_program: Pubkey,
        config: GaugeConfig,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let gauge_info = next_account_info(account_info_iter)?;
        let amm_info = next_account_info(account_info_iter)?;
        let emission_info = next_account_info(account_info_iter)?;
        let weights_info = next_account_info(account_info_iter)?;
        let ve_supply_info = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (gauge_key, bump) = gauge_address(program_id, amm_info.key);
        if gauge_key != *gauge_info.key {
            return Err(GaugeError::InvalidPDA.into());
        }
        if !gauge_info.data_is_empty() {
            return Err(GaugeError::AlreadyInitialized.into());
        }

        let market = MarketMakerView::unpack(&amm_info.try_borrow_data()?)?;
        let mut emission = EmissionSchedule::unpack(&emission_info.try_borrow_data()?)?;
        WeightHistory::unpack(&weights_info.try_borrow_data()?)?;
        VoteEscrowSupply::unpack(&ve_supply_info.try_borrow_data()?)?;

        Self::create_pda_account(
            program_id,
            (authority_info, system_program),
            gauge_info,
            GaugeState::LEN,
            &[GAUGE_SEED, amm_info.key.as_ref(), &[bump]],
        )?;

        let binding = GaugeBinding {
            authority: *authority_info.key,
            amm: *amm_info.key,
            collateral_mint: Pubkey::default(),
            minter,
            minter_program,
            emission_schedule: *emission_info.key,
            weight_history: *weights_info.key,
            ve_supply: *ve_supply_info.key,
            ve_program,
        };
        let now = Clock::get()?.unix_timestamp;

        let mut engine = GaugeEngine::new(GaugeState::new(bump));
        engine.initialize(binding, &market, config, now, &mut emission)?;
        engine.state.pack(&mut gauge_info.try_borrow_mut_data()?)?;

        msg!("Gauge {} initialized", gauge_key);
        Ok(())
    }

    fn process_collateral_shares_changed(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        start: i32,
        collateral_per_share: Vec<u128>,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let amm_info = next_account_info(account_info_iter)?;
        let gauge_info = next_account_info(account_info_iter)?;
        let payer_info = next_account_info(account_info_iter)?;
        let emission_info = next_account_info(account_info_iter)?;
        let weights_info = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;
        let band_accounts = account_info_iter.as_slice();

        if !amm_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        let state = Self::load_gauge(program_id, gauge_info)?;
        let (mut emission, mut weights) = Self::load_sources(&state, emission_info, weights_info)?;

        let needed = Self::band_range(start, collateral_per_share.len())?;
        let (bands, band_infos) = Self::load_bands(
            program_id,
            gauge_info.key,
            band_accounts,
            &needed,
            Some((payer_info, system_program)),
        )?;

        let mut engine = GaugeEngine {
            state,
            bands,
            users: BTreeMap::new(),
        };
        let now = Clock::get()?.unix_timestamp;
        engine.on_collateral_changed(
            amm_info.key,
            now,
            start,
            &collateral_per_share,
            IntegralSources::new(&mut emission, &mut weights),
        )?;

        Self::store_engine(&engine, gauge_info, &band_infos, None)
    }

    fn process_user_shares_changed(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        user: Pubkey,
        start: i32,
        shares: Vec<u128>,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let amm_info = next_account_info(account_info_iter)?;
        let gauge_info = next_account_info(account_info_iter)?;
        let payer_info = next_account_info(account_info_iter)?;
        let ve_supply_info = next_account_info(account_info_iter)?;
        let ve_balance_info = next_account_info(account_info_iter)?;
        let user_info = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;
        let band_accounts = account_info_iter.as_slice();

        if !amm_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        let state = Self::load_gauge(program_id, gauge_info)?;
        let ve = Self::load_vote_escrow(&state, ve_supply_info, ve_balance_info, &user)?;
        let new_range = Self::band_range(start, shares.len())?;

        let funding = (payer_info, system_program);
        let position = Self::load_user(program_id, gauge_info.key, &user, user_info, Some(funding))?
            .ok_or(GaugeError::InvalidAccountData)?;
        let mut needed = position.occupied_bands()?;
        needed.extend(new_range);
        let (bands, band_infos) =
            Self::load_bands(program_id, gauge_info.key, band_accounts, &needed, Some(funding))?;

        let mut engine = GaugeEngine {
            state,
            bands,
            users: BTreeMap::from([(user, position)]),
        };
        engine.on_user_changed(amm_info.key, &user, start, &shares, &ve)?;

        Self::store_engine(&engine, gauge_info, &band_infos, Some((&user, user_info)))
    }

    fn process_sync_position(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        user: Pubkey,
        collateral_start: i32,
        collateral_per_share: Vec<u128>,
        start: i32,
        shares: Vec<u128>,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let amm_info = next_account_info(account_info_iter)?;
        let gauge_info = next_account_info(account_info_iter)?;
        let payer_info = next_account_info(account_info_iter)?;
        let emission_info = next_account_info(account_info_iter)?;
        let weights_info = next_account_info(account_info_iter)?;
        let ve_supply_info = next_account_info(account_info_iter)?;
        let ve_balance_info = next_account_info(account_info_iter)?;
        let user_info = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;
        let band_accounts = account_info_iter.as_slice();

        if !amm_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        let state = Self::load_gauge(program_id, gauge_info)?;
        let (mut emission, mut weights) = Self::load_sources(&state, emission_info, weights_info)?;
        let ve = Self::load_vote_escrow(&state, ve_supply_info, ve_balance_info, &user)?;
        let collateral_range = Self::band_range(collateral_start, collateral_per_share.len())?;
        let new_range = Self::band_range(start, shares.len())?;

        let funding = (payer_info, system_program);
        let position = Self::load_user(program_id, gauge_info.key, &user, user_info, Some(funding))?
            .ok_or(GaugeError::InvalidAccountData)?;
        let mut needed = collateral_range;
        needed.extend(position.occupied_bands()?);
        needed.extend(new_range);
        let (bands, band_infos) =
            Self::load_bands(program_id, gauge_info.key, band_accounts, &needed, Some(funding))?;

        let mut engine = GaugeEngine {
            state,
            bands,
            users: BTreeMap::from([(user, position)]),
        };
        let now = Clock::get()?.unix_timestamp;
        engine.sync_position(
            amm_info.key,
            now,
            &user,
            collateral_start,
            &collateral_per_share,
            start,
            &shares,
            IntegralSources::new(&mut emission, &mut weights),
            &ve,
        )?;

        Self::store_engine(&engine, gauge_info, &band_infos, Some((&user, user_info)))
    }

    fn process_checkpoint(program_id: &Pubkey, accounts: &[AccountInfo], user: Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let gauge_info = next_account_info(account_info_iter)?;
        let emission_info = next_account_info(account_info_iter)?;
        let weights_info = next_account_info(account_info_iter)?;
        let ve_supply_info = next_account_info(account_info_iter)?;
        let ve_balance_info = next_account_info(account_info_iter)?;
        let user_info = next_account_info(account_info_iter)?;
        let band_accounts = account_info_iter.as_slice();

        if !caller_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        let state = Self::load_gauge(program_id, gauge_info)?;
        let (mut emission, mut weights) = Self::load_sources(&state, emission_info, weights_info)?;
        let ve = Self::load_vote_escrow(&state, ve_supply_info, ve_balance_info, &user)?;
        let (mut engine, band_infos) =
            Self::load_user_engine(program_id, state, gauge_info.key, &user, user_info, band_accounts)?;

        let now = Clock::get()?.unix_timestamp;
        let accrued = engine.checkpoint(
            caller_info.key,
            now,
            &user,
            IntegralSources::new(&mut emission, &mut weights),
            &ve,
        )?;
        msg!("Checkpoint {}: accrued {}", user, accrued);

        Self::store_engine(&engine, gauge_info, &band_infos, Some((&user, user_info)))
    }

    fn process_claimable(program_id: &Pubkey, accounts: &[AccountInfo], user: Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let gauge_info = next_account_info(account_info_iter)?;
        let emission_info = next_account_info(account_info_iter)?;
        let weights_info = next_account_info(account_info_iter)?;
        let ve_supply_info = next_account_info(account_info_iter)?;
        let ve_balance_info = next_account_info(account_info_iter)?;
        let user_info = next_account_info(account_info_iter)?;
        let minted_info = next_account_info(account_info_iter)?;
        let band_accounts = account_info_iter.as_slice();

        let state = Self::load_gauge(program_id, gauge_info)?;
        let (mut emission, mut weights) = Self::load_sources(&state, emission_info, weights_info)?;
        let ve = Self::load_vote_escrow(&state, ve_supply_info, ve_balance_info, &user)?;
        let minted = Self::load_minted(&state, gauge_info.key, minted_info, &user)?;
        let (mut engine, band_infos) =
            Self::load_user_engine(program_id, state, gauge_info.key, &user, user_info, band_accounts)?;

        let now = Clock::get()?.unix_timestamp;
        let amount = engine.claimable(
            now,
            &user,
            IntegralSources::new(&mut emission, &mut weights),
            &ve,
            &minted,
        )?;
        Self::store_engine(&engine, gauge_info, &band_infos, Some((&user, user_info)))?;

        msg!("Claimable {}: {}", user, amount);
        set_return_data(&amount.to_le_bytes());
        Ok(())
    }

    fn process_kick(program_id: &Pubkey, accounts: &[AccountInfo], user: Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let gauge_info = next_account_info(account_info_iter)?;
        let emission_info = next_account_info(account_info_iter)?;
        let weights_info = next_account_info(account_info_iter)?;
        let ve_supply_info = next_account_info(account_info_iter)?;
        let ve_balance_info = next_account_info(account_info_iter)?;
        let user_info = next_account_info(account_info_iter)?;
        let band_accounts = account_info_iter.as_slice();

        let state = Self::load_gauge(program_id, gauge_info)?;
        let (mut emission, mut weights) = Self::load_sources(&state, emission_info, weights_info)?;
        let ve = Self::load_vote_escrow(&state, ve_supply_info, ve_balance_info, &user)?;
        let (mut engine, band_infos) =
            Self::load_user_engine(program_id, state, gauge_info.key, &user, user_info, band_accounts)?;

        let now = Clock::get()?.unix_timestamp;
        engine.kick(now, &user, IntegralSources::new(&mut emission, &mut weights), &ve)?;
        msg!("Kicked {}: working balance {}", user, engine.working_balance(&user));

        Self::store_engine(&engine, gauge_info, &band_infos, Some((&user, user_info)))
    }

    fn process_set_killed(program_id: &Pubkey, accounts: &[AccountInfo], killed: bool) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let gauge_info = next_account_info(account_info_iter)?;
        let emission_info = next_account_info(account_info_iter)?;
        let weights_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        let state = Self::load_gauge(program_id, gauge_info)?;
        let (mut emission, mut weights) = Self::load_sources(&state, emission_info, weights_info)?;

        let mut engine = GaugeEngine::new(state);
        let now = Clock::get()?.unix_timestamp;
        engine.set_killed(
            authority_info.key,
            now,
            killed,
            IntegralSources::new(&mut emission, &mut weights),
        )?;

        Self::store_engine(&engine, gauge_info, &BTreeMap::new(), None)
    }

    fn load_gauge(program_id: &Pubkey, gauge_info: &AccountInfo) -> Result<GaugeState, ProgramError> {
        if gauge_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        let state = GaugeState::unpack(&gauge_info.try_borrow_data()?)?;
        if !state.is_active() {
            return Err(GaugeError::NotInitialized.into());
        }
        let expected = Pubkey::create_program_address(
            &[GAUGE_SEED, state.binding.amm.as_ref(), &[state.bump]],
            program_id,
        )
        .map_err(|_| GaugeError::InvalidPDA)?;
        if expected != *gauge_info.key {
            return Err(GaugeError::InvalidPDA.into());
        }
        Ok(state)
    }

    fn load_sources(
        state: &GaugeState,
        emission_info: &AccountInfo,
        weights_info: &AccountInfo,
    ) -> Result<(EmissionSchedule, WeightHistory), ProgramError> {
        if *emission_info.key != state.binding.emission_schedule
            || *weights_info.key != state.binding.weight_history
        {
            return Err(GaugeError::InvalidAccountData.into());
        }
        let emission = EmissionSchedule::unpack(&emission_info.try_borrow_data()?)?;
        let weights = WeightHistory::unpack(&weights_info.try_borrow_data()?)?;
        Ok((emission, weights))
    }

    /// A balance account that does not exist yet counts as a zero balance
    fn load_vote_escrow(
        state: &GaugeState,
        supply_info: &AccountInfo,
        balance_info: &AccountInfo,
        user: &Pubkey,
    ) -> Result<VoteEscrowView, ProgramError> {
        if *supply_info.key != state.binding.ve_supply {
            return Err(GaugeError::InvalidAccountData.into());
        }
        let supply = VoteEscrowSupply::unpack(&supply_info.try_borrow_data()?)?;

        let (expected, _) = ve_balance_address(&state.binding.ve_program, user);
        if expected != *balance_info.key {
            return Err(GaugeError::InvalidPDA.into());
        }
        let view = VoteEscrowView::new(supply.total);
        if balance_info.owner != &state.binding.ve_program || balance_info.data_is_empty() {
            return Ok(view);
        }
        let balance = VoteEscrowBalance::unpack(&balance_info.try_borrow_data()?)?;
        if balance.owner != *user {
            return Err(GaugeError::InvalidAccountData.into());
        }
        Ok(view.with_balance(*user, balance.balance))
    }

    /// A record that does not exist yet means nothing was minted
    fn load_minted(
        state: &GaugeState,
        gauge: &Pubkey,
        record_info: &AccountInfo,
        user: &Pubkey,
    ) -> Result<MintedView, ProgramError> {
        let (expected, _) = minted_address(&state.binding.minter_program, gauge, user);
        if expected != *record_info.key {
            return Err(GaugeError::InvalidPDA.into());
        }
        let view = MintedView::default();
        if record_info.owner != &state.binding.minter_program || record_info.data_is_empty() {
            return Ok(view);
        }
        let record = MintedRecord::unpack(&record_info.try_borrow_data()?)?;
        if record.gauge != *gauge || record.user != *user {
            return Err(GaugeError::InvalidAccountData.into());
        }
        Ok(view.with_minted(*user, record.minted))
    }

    /// Load the user's position, creating it when `funding` is given.
    /// Returns `None` for a user that never held a position.
    fn load_user<'b>(
        program_id: &Pubkey,
        gauge: &Pubkey,
        user: &Pubkey,
        user_info: &AccountInfo<'b>,
        funding: Option<Funding<'_, 'b>>,
    ) -> Result<Option<UserPosition>, ProgramError> {
        let (expected, bump) = user_address(program_id, gauge, user);
        if expected != *user_info.key {
            return Err(GaugeError::InvalidPDA.into());
        }

        if user_info.data_is_empty() {
            let funding = match funding {
                Some(funding) => funding,
                None => return Ok(None),
            };
            Self::create_pda_account(
                program_id,
                funding,
                user_info,
                UserPosition::LEN,
                &[USER_SEED, gauge.as_ref(), user.as_ref(), &[bump]],
            )?;
            return Ok(Some(UserPosition::new(*gauge, *user, bump)));
        }

        if user_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        let position = UserPosition::unpack(&user_info.try_borrow_data()?)?;
        if position.gauge != *gauge || position.owner != *user {
            return Err(GaugeError::InvalidAccountData.into());
        }
        Ok(Some(position))
    }

    /// Engine over one user's stored position and the bands of its range
    fn load_user_engine<'a, 'b>(
        program_id: &Pubkey,
        state: GaugeState,
        gauge: &Pubkey,
        user: &Pubkey,
        user_info: &AccountInfo,
        band_accounts: &'a [AccountInfo<'b>],
    ) -> Result<(GaugeEngine, BandInfos<'a, 'b>), ProgramError> {
        let position = Self::load_user(program_id, gauge, user, user_info, None)?;
        let needed = match &position {
            Some(position) => position.occupied_bands()?,
            None => Vec::new(),
        };
        let (bands, band_infos) = Self::load_bands(program_id, gauge, band_accounts, &needed, None)?;

        let mut engine = GaugeEngine {
            state,
            bands,
            users: BTreeMap::new(),
        };
        if let Some(position) = position {
            engine.users.insert(*user, position);
        }
        Ok((engine, band_infos))
    }

    /// Find the account of every band in `needed` among `band_accounts`.
    /// Missing band accounts are created when `funding` is given.
    fn load_bands<'a, 'b>(
        program_id: &Pubkey,
        gauge: &Pubkey,
        band_accounts: &'a [AccountInfo<'b>],
        needed: &[i32],
        funding: Option<Funding<'_, 'b>>,
    ) -> Result<(BTreeMap<i32, BandRecord>, BandInfos<'a, 'b>), ProgramError> {
        let mut indices = needed.to_vec();
        indices.sort_unstable();
        indices.dedup();

        let mut bands = BTreeMap::new();
        let mut infos = BTreeMap::new();
        for index in indices {
            let (key, bump) = band_address(program_id, gauge, index);
            let info = band_accounts
                .iter()
                .find(|info| *info.key == key)
                .ok_or(GaugeError::InvalidBandAccount)?;

            let band = if info.data_is_empty() {
                let funding = funding.ok_or(GaugeError::InvalidBandAccount)?;
                Self::create_pda_account(
                    program_id,
                    funding,
                    info,
                    BandRecord::LEN,
                    &[BAND_SEED, gauge.as_ref(), &index.to_le_bytes(), &[bump]],
                )?;
                BandRecord::new(*gauge, index, bump)
            } else {
                if info.owner != program_id {
                    return Err(ProgramError::IncorrectProgramId);
                }
                let band = BandRecord::unpack(&info.try_borrow_data()?)?;
                if band.gauge != *gauge || band.index != index {
                    return Err(GaugeError::InvalidBandAccount.into());
                }
                band
            };
            bands.insert(index, band);
            infos.insert(index, info);
        }
        Ok((bands, infos))
    }

    fn band_range(start: i32, size: usize) -> Result<Vec<i32>, ProgramError> {
        if size > MAX_TICKS {
            return Err(GaugeError::RangeTooLarge.into());
        }
        (0..size)
            .map(|offset| UserPosition::band_at(start, offset))
            .collect()
    }

    fn store_engine(
        engine: &GaugeEngine,
        gauge_info: &AccountInfo,
        band_infos: &BandInfos,
        user: Option<(&Pubkey, &AccountInfo)>,
    ) -> ProgramResult {
        engine.state.pack(&mut gauge_info.try_borrow_mut_data()?)?;

        for (index, band) in &engine.bands {
            let info = band_infos.get(index).ok_or(GaugeError::InvalidBandAccount)?;
            band.pack(&mut info.try_borrow_mut_data()?)?;
        }

        if let Some((user, user_info)) = user {
            if let Some(position) = engine.users.get(user) {
                position.pack(&mut user_info.try_borrow_mut_data()?)?;
            }
        }
        Ok(())
    }

    fn create_pda_account<'b>(
        program_id: &Pubkey,
        (payer_info, system_program): Funding<'_, 'b>,
        target_info: &AccountInfo<'b>,
        space: usize,
        seeds: &[&[u8]],
    ) -> ProgramResult {
        let lamports = Rent::get()?.minimum_balance(space);
        invoke_signed(
            &system_instruction::create_account(
                payer_info.key,
                target_info.key,
                lamports,
                space as u64,
                program_id,
            ),
            &[payer_info.clone(), target_info.clone(), system_program.clone()],
            &[seeds],
        )
    }
}
