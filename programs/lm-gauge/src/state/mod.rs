pub mod band;
pub mod gauge;
pub mod user;

pub use band::*;
pub use gauge::*;
pub use user::*;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::program_error::ProgramError;

use crate::error::GaugeError;

/// Discriminated, fixed-size account layout owned by this program
pub trait GaugeAccount: BorshSerialize + BorshDeserialize {
    const DISCRIMINATOR: [u8; 8];
    const LEN: usize;

    fn discriminator(&self) -> [u8; 8];

    /// Deserialize ignoring trailing padding, then check the discriminator
    fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        let mut cursor: &[u8] = data;
        let account =
            Self::deserialize(&mut cursor).map_err(|_| GaugeError::InvalidAccountData)?;
        if account.discriminator() != Self::DISCRIMINATOR {
            return Err(GaugeError::InvalidAccountData.into());
        }
        Ok(account)
    }

    fn pack(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        let data = self
            .try_to_vec()
            .map_err(|_| GaugeError::InvalidAccountData)?;
        if data.len() > dst.len() {
            return Err(GaugeError::InvalidAccountData.into());
        }
        dst[..data.len()].copy_from_slice(&data);
        Ok(())
    }
}
