use arrayref::{array_ref, array_refs};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::error::GaugeError;

/// The leading fields of the AMM account the gauge reads at bind time.
///
/// Layout: 8-byte discriminator, then `coins[0]` (borrowed) and `coins[1]`
/// (collateral) as raw pubkeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketMakerView {
    pub coins: [Pubkey; 2],
}

impl MarketMakerView {
    pub const PREFIX_LEN: usize = 8 + 32 + 32;

    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        if data.len() < Self::PREFIX_LEN {
            return Err(GaugeError::InvalidAccountData.into());
        }
        let src = array_ref![data, 0, 72];
        let (_discriminator, borrowed, collateral) = array_refs![src, 8, 32, 32];
        Ok(Self {
            coins: [
                Pubkey::new_from_array(*borrowed),
                Pubkey::new_from_array(*collateral),
            ],
        })
    }

    pub fn coins(&self, i: usize) -> Option<Pubkey> {
        self.coins.get(i).copied()
    }

    /// Raw prefix bytes for an AMM account with these coins
    pub fn to_prefix(&self, discriminator: [u8; 8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(Self::PREFIX_LEN);
        data.extend_from_slice(&discriminator);
        data.extend_from_slice(self.coins[0].as_ref());
        data.extend_from_slice(self.coins[1].as_ref());
        data
    }
}
