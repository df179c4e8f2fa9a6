pub mod atr;
pub mod supertrend;

pub use atr::{atr, true_range};
pub use supertrend::{
    step, BandInputs, PriceSource, Supertrend, SupertrendParams, SupertrendResult,
    SupertrendState,
};
