//! Gauge-wide constants

/// Fixed-point scale used by every integral and per-share value (18 decimals)
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Length of a governance weight period in seconds
pub const WEEK: i64 = 7 * 86_400;

/// Default inflation epoch length (one year)
pub const YEAR: i64 = 365 * 86_400;

/// Upper bound on week steps walked by a single integral advance
pub const MAX_WEEK_STEPS: usize = 500;

/// Upper bound on contiguous bands in a single position
pub const MAX_TICKS: usize = 50;

/// Share of raw collateral that counts without any vote-escrow weight
pub const TOKENLESS_PRODUCTION: u8 = 40;

// PDA seeds
pub const GAUGE_SEED: &[u8] = b"gauge";
pub const BAND_SEED: &[u8] = b"band";
pub const USER_SEED: &[u8] = b"user";
