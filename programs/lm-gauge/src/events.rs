//! Structured event logging
//!
//! Events are borsh payloads logged as a type tag followed by a bs58 body,
//! for off-chain indexers. Nothing inside the program reads them back.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, pubkey::Pubkey};

use crate::math::U256;

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    GaugeInitialized = 1,
    BoostUpdated = 2,
    CollateralCheckpoint = 3,
    UserCheckpoint = 4,
    GaugeKilled = 5,
}

pub trait Event: BorshSerialize {
    fn event_type() -> EventType;

    fn emit(&self) {
        msg!("LM_GAUGE_EVENT");
        msg!("TYPE:{:?}", Self::event_type());

        if let Ok(data) = self.try_to_vec() {
            msg!("DATA:{}", bs58::encode(&data).into_string());
        }
    }
}

#[macro_export]
macro_rules! define_event {
    ($name:ident { $($field:ident: $type:ty),* $(,)? }) => {
        #[derive(::borsh::BorshSerialize, ::borsh::BorshDeserialize, Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            $(pub $field: $type,)*
        }

        impl $crate::events::Event for $name {
            fn event_type() -> $crate::events::EventType {
                $crate::events::EventType::$name
            }
        }
    };
}

define_event!(GaugeInitialized {
    amm: Pubkey,
    collateral_mint: Pubkey,
    inflation_rate: u128,
    next_epoch_time: i64,
});

define_event!(BoostUpdated {
    user: Pubkey,
    raw_collateral: u128,
    total_collateral: u128,
    working_balance: u128,
    working_supply: u128,
});

define_event!(CollateralCheckpoint {
    band_start: i32,
    size: u8,
    integral: U256,
    working_supply: u128,
});

define_event!(UserCheckpoint {
    user: Pubkey,
    band_start: i32,
    size: u8,
    claimable_accrued: u128,
});

define_event!(GaugeKilled {
    killed: bool,
    timestamp: i64,
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_round_trip() {
        let event = BoostUpdated {
            user: Pubkey::new_unique(),
            raw_collateral: 30,
            total_collateral: 30,
            working_balance: 12,
            working_supply: 12,
        };
        let data = event.try_to_vec().unwrap();
        let decoded = BoostUpdated::try_from_slice(&data).unwrap();
        assert_eq!(decoded, event);
        assert_eq!(BoostUpdated::event_type(), EventType::BoostUpdated);
        event.emit();
    }
}
