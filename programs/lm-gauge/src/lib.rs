// Liquidity-mining gauge for a band-based lending AMM
// Native Solana implementation - NO ANCHOR

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, msg, pubkey::Pubkey};

pub mod constants;
pub mod engine;
pub mod error;
pub mod events;
pub mod instruction;
pub mod math;
pub mod processor;
pub mod sources;
pub mod state;

use crate::processor::Processor;

solana_program::declare_id!("LMGauge111111111111111111111111111111111111");

#[cfg(not(feature = "no-entrypoint"))]
solana_program::entrypoint!(process);

pub fn process(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    msg!("LM gauge entrypoint");
    Processor::process(program_id, accounts, instruction_data)
}
