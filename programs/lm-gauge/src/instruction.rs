use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::{
    constants::{BAND_SEED, GAUGE_SEED, USER_SEED},
    error::GaugeError,
    sources::{MINTED_SEED, VE_BALANCE_SEED},
    state::GaugeConfig,
};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum GaugeInstruction {
    /// Bind a new gauge to its market maker
    /// Accounts:
    /// 0. `[signer, writable]` Authority, pays for the gauge account
    /// 1. `[writable]` Gauge PDA `["gauge", amm]`
    /// 2. `[]` Market maker account
    /// 3. `[]` Emission schedule
    /// 4. `[]` Weight history
    /// 5. `[]` Vote-escrow supply
    /// 6. `[]` System program
    Initialize {
        minter: Pubkey,
        minter_program: Pubkey,
        ve_program: Pubkey,
        config: GaugeConfig,
    },

    /// Market maker callback: collateral per share of bands
    /// `[start, start + collateral_per_share.len())` changed
    /// Accounts:
    /// 0. `[signer]` Market maker
    /// 1. `[writable]` Gauge PDA
    /// 2. `[signer, writable]` Payer for new band accounts
    /// 3. `[]` Emission schedule
    /// 4. `[]` Weight history
    /// 5. `[]` System program
    /// 6+. `[writable]` Band PDAs of the range
    CollateralSharesChanged {
        start: i32,
        collateral_per_share: Vec<u128>,
    },

    /// Market maker callback: `user` now holds `shares` in bands
    /// `[start, start + shares.len())`
    /// Accounts:
    /// 0. `[signer]` Market maker
    /// 1. `[writable]` Gauge PDA
    /// 2. `[signer, writable]` Payer for new accounts
    /// 3. `[]` Vote-escrow supply
    /// 4. `[]` Vote-escrow balance PDA of the user
    /// 5. `[writable]` User position PDA
    /// 6. `[]` System program
    /// 7+. `[writable]` Band PDAs of the old and the new range
    UserSharesChanged {
        user: Pubkey,
        start: i32,
        shares: Vec<u128>,
    },

    /// Both market maker callbacks of one transition, in order
    /// Accounts:
    /// 0. `[signer]` Market maker
    /// 1. `[writable]` Gauge PDA
    /// 2. `[signer, writable]` Payer for new accounts
    /// 3. `[]` Emission schedule
    /// 4. `[]` Weight history
    /// 5. `[]` Vote-escrow supply
    /// 6. `[]` Vote-escrow balance PDA of the user
    /// 7. `[writable]` User position PDA
    /// 8. `[]` System program
    /// 9+. `[writable]` Band PDAs of the collateral range, the old and the new range
    SyncPosition {
        user: Pubkey,
        collateral_start: i32,
        collateral_per_share: Vec<u128>,
        start: i32,
        shares: Vec<u128>,
    },

    /// Bring a user's accrued reward up to date and refresh their boost
    /// Accounts:
    /// 0. `[signer]` The user or the minter
    /// 1. `[writable]` Gauge PDA
    /// 2. `[]` Emission schedule
    /// 3. `[]` Weight history
    /// 4. `[]` Vote-escrow supply
    /// 5. `[]` Vote-escrow balance PDA of the user
    /// 6. `[writable]` User position PDA
    /// 7+. `[writable]` Band PDAs of the user's range
    Checkpoint { user: Pubkey },

    /// Checkpoint a user and return their unminted reward as a little-endian
    /// u128 in the return data
    /// Accounts:
    /// 0. `[writable]` Gauge PDA
    /// 1. `[]` Emission schedule
    /// 2. `[]` Weight history
    /// 3. `[]` Vote-escrow supply
    /// 4. `[]` Vote-escrow balance PDA of the user
    /// 5. `[writable]` User position PDA
    /// 6. `[]` Minted record PDA of the user
    /// 7+. `[writable]` Band PDAs of the user's range
    Claimable { user: Pubkey },

    /// Recompute a user's boost once their vote-escrow balance no longer
    /// backs it
    /// Accounts:
    /// 0. `[writable]` Gauge PDA
    /// 1. `[]` Emission schedule
    /// 2. `[]` Weight history
    /// 3. `[]` Vote-escrow supply
    /// 4. `[]` Vote-escrow balance PDA of the user
    /// 5. `[writable]` User position PDA
    /// 6+. `[writable]` Band PDAs of the user's range
    Kick { user: Pubkey },

    /// Stop or resume emissions to the gauge
    /// Accounts:
    /// 0. `[signer]` Authority
    /// 1. `[writable]` Gauge PDA
    /// 2. `[]` Emission schedule
    /// 3. `[]` Weight history
    SetKilled { killed: bool },
}

impl GaugeInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| GaugeError::InvalidInstruction.into())
    }

    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        self.try_to_vec()
            .map_err(|_| GaugeError::InvalidInstruction.into())
    }
}

pub fn gauge_address(program_id: &Pubkey, amm: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[GAUGE_SEED, amm.as_ref()], program_id)
}

pub fn band_address(program_id: &Pubkey, gauge: &Pubkey, index: i32) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[BAND_SEED, gauge.as_ref(), &index.to_le_bytes()],
        program_id,
    )
}

pub fn user_address(program_id: &Pubkey, gauge: &Pubkey, user: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[USER_SEED, gauge.as_ref(), user.as_ref()], program_id)
}

pub fn ve_balance_address(ve_program: &Pubkey, user: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VE_BALANCE_SEED, user.as_ref()], ve_program)
}

pub fn minted_address(minter_program: &Pubkey, gauge: &Pubkey, user: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[MINTED_SEED, gauge.as_ref(), user.as_ref()], minter_program)
}

/// Collaborator accounts read by integral advances
#[derive(Debug, Clone, Copy)]
pub struct SourceKeys {
    pub emission_schedule: Pubkey,
    pub weight_history: Pubkey,
}

fn band_metas(program_id: &Pubkey, gauge: &Pubkey, bands: &[i32]) -> Vec<AccountMeta> {
    let mut bands = bands.to_vec();
    bands.sort_unstable();
    bands.dedup();
    bands
        .into_iter()
        .map(|index| AccountMeta::new(band_address(program_id, gauge, index).0, false))
        .collect()
}

fn range(start: i32, len: usize) -> impl Iterator<Item = i32> {
    (0..len as i32).map(move |offset| start.saturating_add(offset))
}

#[allow(clippy::too_many_arguments)]
pub fn initialize(
    program_id: &Pubkey,
    authority: &Pubkey,
    amm: &Pubkey,
    sources: SourceKeys,
    ve_supply: &Pubkey,
    minter: Pubkey,
    minter_program: Pubkey,
    ve_program: Pubkey,
    config: GaugeConfig,
) -> Result<Instruction, ProgramError> {
    let (gauge, _) = gauge_address(program_id, amm);
    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(gauge, false),
        AccountMeta::new_readonly(*amm, false),
        AccountMeta::new_readonly(sources.emission_schedule, false),
        AccountMeta::new_readonly(sources.weight_history, false),
        AccountMeta::new_readonly(*ve_supply, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    let data = GaugeInstruction::Initialize {
        minter,
        minter_program,
        ve_program,
        config,
    }
    .pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

pub fn collateral_shares_changed(
    program_id: &Pubkey,
    amm: &Pubkey,
    payer: &Pubkey,
    sources: SourceKeys,
    start: i32,
    collateral_per_share: Vec<u128>,
) -> Result<Instruction, ProgramError> {
    let (gauge, _) = gauge_address(program_id, amm);
    let mut accounts = vec![
        AccountMeta::new_readonly(*amm, true),
        AccountMeta::new(gauge, false),
        AccountMeta::new(*payer, true),
        AccountMeta::new_readonly(sources.emission_schedule, false),
        AccountMeta::new_readonly(sources.weight_history, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    let bands: Vec<i32> = range(start, collateral_per_share.len()).collect();
    accounts.extend(band_metas(program_id, &gauge, &bands));

    let data = GaugeInstruction::CollateralSharesChanged {
        start,
        collateral_per_share,
    }
    .pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// `old_range` is the user's stored `(band_start, range_size)`
#[allow(clippy::too_many_arguments)]
pub fn user_shares_changed(
    program_id: &Pubkey,
    amm: &Pubkey,
    payer: &Pubkey,
    ve_supply: &Pubkey,
    ve_program: &Pubkey,
    user: &Pubkey,
    old_range: (i32, u8),
    start: i32,
    shares: Vec<u128>,
) -> Result<Instruction, ProgramError> {
    let (gauge, _) = gauge_address(program_id, amm);
    let mut accounts = vec![
        AccountMeta::new_readonly(*amm, true),
        AccountMeta::new(gauge, false),
        AccountMeta::new(*payer, true),
        AccountMeta::new_readonly(*ve_supply, false),
        AccountMeta::new_readonly(ve_balance_address(ve_program, user).0, false),
        AccountMeta::new(user_address(program_id, &gauge, user).0, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    let bands: Vec<i32> = range(old_range.0, old_range.1 as usize)
        .chain(range(start, shares.len()))
        .collect();
    accounts.extend(band_metas(program_id, &gauge, &bands));

    let data = GaugeInstruction::UserSharesChanged {
        user: *user,
        start,
        shares,
    }
    .pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn sync_position(
    program_id: &Pubkey,
    amm: &Pubkey,
    payer: &Pubkey,
    sources: SourceKeys,
    ve_supply: &Pubkey,
    ve_program: &Pubkey,
    user: &Pubkey,
    old_range: (i32, u8),
    collateral_start: i32,
    collateral_per_share: Vec<u128>,
    start: i32,
    shares: Vec<u128>,
) -> Result<Instruction, ProgramError> {
    let (gauge, _) = gauge_address(program_id, amm);
    let mut accounts = vec![
        AccountMeta::new_readonly(*amm, true),
        AccountMeta::new(gauge, false),
        AccountMeta::new(*payer, true),
        AccountMeta::new_readonly(sources.emission_schedule, false),
        AccountMeta::new_readonly(sources.weight_history, false),
        AccountMeta::new_readonly(*ve_supply, false),
        AccountMeta::new_readonly(ve_balance_address(ve_program, user).0, false),
        AccountMeta::new(user_address(program_id, &gauge, user).0, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    let bands: Vec<i32> = range(collateral_start, collateral_per_share.len())
        .chain(range(old_range.0, old_range.1 as usize))
        .chain(range(start, shares.len()))
        .collect();
    accounts.extend(band_metas(program_id, &gauge, &bands));

    let data = GaugeInstruction::SyncPosition {
        user: *user,
        collateral_start,
        collateral_per_share,
        start,
        shares,
    }
    .pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// `user_range` is the user's stored `(band_start, range_size)`
#[allow(clippy::too_many_arguments)]
pub fn checkpoint(
    program_id: &Pubkey,
    caller: &Pubkey,
    amm: &Pubkey,
    sources: SourceKeys,
    ve_supply: &Pubkey,
    ve_program: &Pubkey,
    user: &Pubkey,
    user_range: (i32, u8),
) -> Result<Instruction, ProgramError> {
    let (gauge, _) = gauge_address(program_id, amm);
    let mut accounts = vec![
        AccountMeta::new_readonly(*caller, true),
        AccountMeta::new(gauge, false),
        AccountMeta::new_readonly(sources.emission_schedule, false),
        AccountMeta::new_readonly(sources.weight_history, false),
        AccountMeta::new_readonly(*ve_supply, false),
        AccountMeta::new_readonly(ve_balance_address(ve_program, user).0, false),
        AccountMeta::new(user_address(program_id, &gauge, user).0, false),
    ];
    let bands: Vec<i32> = range(user_range.0, user_range.1 as usize).collect();
    accounts.extend(band_metas(program_id, &gauge, &bands));

    let data = GaugeInstruction::Checkpoint { user: *user }.pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn claimable(
    program_id: &Pubkey,
    amm: &Pubkey,
    sources: SourceKeys,
    ve_supply: &Pubkey,
    ve_program: &Pubkey,
    minter_program: &Pubkey,
    user: &Pubkey,
    user_range: (i32, u8),
) -> Result<Instruction, ProgramError> {
    let (gauge, _) = gauge_address(program_id, amm);
    let mut accounts = vec![
        AccountMeta::new(gauge, false),
        AccountMeta::new_readonly(sources.emission_schedule, false),
        AccountMeta::new_readonly(sources.weight_history, false),
        AccountMeta::new_readonly(*ve_supply, false),
        AccountMeta::new_readonly(ve_balance_address(ve_program, user).0, false),
        AccountMeta::new(user_address(program_id, &gauge, user).0, false),
        AccountMeta::new_readonly(minted_address(minter_program, &gauge, user).0, false),
    ];
    let bands: Vec<i32> = range(user_range.0, user_range.1 as usize).collect();
    accounts.extend(band_metas(program_id, &gauge, &bands));

    let data = GaugeInstruction::Claimable { user: *user }.pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn kick(
    program_id: &Pubkey,
    amm: &Pubkey,
    sources: SourceKeys,
    ve_supply: &Pubkey,
    ve_program: &Pubkey,
    user: &Pubkey,
    user_range: (i32, u8),
) -> Result<Instruction, ProgramError> {
    let (gauge, _) = gauge_address(program_id, amm);
    let mut accounts = vec![
        AccountMeta::new(gauge, false),
        AccountMeta::new_readonly(sources.emission_schedule, false),
        AccountMeta::new_readonly(sources.weight_history, false),
        AccountMeta::new_readonly(*ve_supply, false),
        AccountMeta::new_readonly(ve_balance_address(ve_program, user).0, false),
        AccountMeta::new(user_address(program_id, &gauge, user).0, false),
    ];
    let bands: Vec<i32> = range(user_range.0, user_range.1 as usize).collect();
    accounts.extend(band_metas(program_id, &gauge, &bands));

    let data = GaugeInstruction::Kick { user: *user }.pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

pub fn set_killed(
    program_id: &Pubkey,
    authority: &Pubkey,
    amm: &Pubkey,
    sources: SourceKeys,
    killed: bool,
) -> Result<Instruction, ProgramError> {
    let (gauge, _) = gauge_address(program_id, amm);
    let accounts = vec![
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new(gauge, false),
        AccountMeta::new_readonly(sources.emission_schedule, false),
        AccountMeta::new_readonly(sources.weight_history, false),
    ];

    let data = GaugeInstruction::SetKilled { killed }.pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}
