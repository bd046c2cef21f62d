use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::{sources::Minter, state::GaugeAccount};

pub const MINTED_SEED: &[u8] = b"minted";

/// Amount the minter has paid `user` from `gauge`, at PDA
/// `["minted", gauge, user]` of the minter program
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct MintedRecord {
    pub discriminator: [u8; 8],
    pub gauge: Pubkey,
    pub user: Pubkey,
    pub minted: u128,
}

impl MintedRecord {
    pub fn new(gauge: Pubkey, user: Pubkey, minted: u128) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            gauge,
            user,
            minted,
        }
    }
}

impl GaugeAccount for MintedRecord {
    const DISCRIMINATOR: [u8; 8] = *b"MINTED\0\0";
    const LEN: usize = 8 + 32 + 32 + 16;

    fn discriminator(&self) -> [u8; 8] {
        self.discriminator
    }
}

/// Minted totals known for the current call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MintedView {
    pub minted: BTreeMap<Pubkey, u128>,
}

impl MintedView {
    pub fn with_minted(mut self, user: Pubkey, amount: u128) -> Self {
        self.minted.insert(user, amount);
        self
    }
}

impl Minter for MintedView {
    fn already_minted(&self, user: &Pubkey) -> u128 {
        self.minted.get(user).copied().unwrap_or(0)
    }
}
