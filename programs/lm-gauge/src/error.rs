use num_derive::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, FromPrimitive, PartialEq, Eq)]
pub enum GaugeError {
    #[error("Invalid instruction")]
    InvalidInstruction = 0,

    #[error("Unauthorized")]
    Unauthorized = 1,

    #[error("Gauge not initialized")]
    NotInitialized = 2,

    #[error("Gauge already initialized")]
    AlreadyInitialized = 3,

    #[error("Band range exceeds the per-position cap")]
    RangeTooLarge = 4,

    #[error("Invalid PDA")]
    InvalidPDA = 5,

    #[error("Invalid account data")]
    InvalidAccountData = 6,

    #[error("Band account missing or out of range")]
    InvalidBandAccount = 7,

    #[error("Mismatched data length")]
    MismatchedDataLength = 8,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 9,

    #[error("Invalid gauge configuration")]
    InvalidConfig = 10,

    #[error("Borrowed token equals collateral token")]
    SameCoin = 11,

    #[error("Boost is still backed by the vote-escrow balance")]
    KickNotAllowed = 12,
}

impl PrintProgramError for GaugeError {
    fn print<E>(&self) {
        use solana_program::msg;
        msg!("GaugeError: {}", self);
    }
}

impl From<GaugeError> for ProgramError {
    fn from(e: GaugeError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for GaugeError {
    fn type_of() -> &'static str {
        "GaugeError"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn test_custom_codes_round_trip() {
        let err: ProgramError = GaugeError::RangeTooLarge.into();
        assert_eq!(err, ProgramError::Custom(4));

        let decoded = GaugeError::from_u32(4).unwrap();
        assert_eq!(decoded, GaugeError::RangeTooLarge);
        assert_eq!(GaugeError::from_u32(12), Some(GaugeError::KickNotAllowed));
        assert!(GaugeError::from_u32(99).is_none());
    }
}
