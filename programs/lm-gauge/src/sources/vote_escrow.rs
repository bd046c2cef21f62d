use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::{sources::VoteEscrowSource, state::GaugeAccount};

pub const VE_BALANCE_SEED: &[u8] = b"ve_balance";

/// Total boosted vote-escrow supply
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct VoteEscrowSupply {
    pub discriminator: [u8; 8],
    pub total: u128,
}

impl VoteEscrowSupply {
    pub fn new(total: u128) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            total,
        }
    }
}

impl GaugeAccount for VoteEscrowSupply {
    const DISCRIMINATOR: [u8; 8] = *b"VESUPPLY";
    const LEN: usize = 8 + 16;

    fn discriminator(&self) -> [u8; 8] {
        self.discriminator
    }
}

/// One user's boosted vote-escrow balance, at PDA `["ve_balance", owner]` of
/// the vote-escrow program
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct VoteEscrowBalance {
    pub discriminator: [u8; 8],
    pub owner: Pubkey,
    pub balance: u128,
}

impl VoteEscrowBalance {
    pub fn new(owner: Pubkey, balance: u128) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            owner,
            balance,
        }
    }
}

impl GaugeAccount for VoteEscrowBalance {
    const DISCRIMINATOR: [u8; 8] = *b"VEBALANC";
    const LEN: usize = 8 + 32 + 16;

    fn discriminator(&self) -> [u8; 8] {
        self.discriminator
    }
}

/// Vote-escrow balances known for the current call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteEscrowView {
    pub total: u128,
    pub balances: BTreeMap<Pubkey, u128>,
}

impl VoteEscrowView {
    pub fn new(total: u128) -> Self {
        Self {
            total,
            balances: BTreeMap::new(),
        }
    }

    pub fn with_balance(mut self, user: Pubkey, balance: u128) -> Self {
        self.balances.insert(user, balance);
        self
    }
}

impl VoteEscrowSource for VoteEscrowView {
    fn boosted_balance_of(&self, user: &Pubkey) -> u128 {
        self.balances.get(user).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> u128 {
        self.total
    }
}
