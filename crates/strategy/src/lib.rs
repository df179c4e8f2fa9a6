pub mod alerts;
pub mod config;
pub mod indicators;
pub mod series;
pub mod triple;

pub use config::{SupertrendFileConfig, UnitConfig};
pub use indicators::{PriceSource, Supertrend, SupertrendParams, SupertrendResult};
pub use series::Series;
pub use triple::{Composite, CompositeState, TripleSupertrend};

use common::{AlertEvent, Candle, Result};

/// Validate `candles`, run the composite indicator and collect its alerts.
///
/// Fails before any computation on fewer than two bars or on timestamps
/// that are not strictly increasing.
pub fn run(triple: &TripleSupertrend, candles: Vec<Candle>) -> Result<(Composite, Vec<AlertEvent>)> {
    let series = Series::new(candles)?;
    let composite = triple.evaluate(&series);
    let alerts = alerts::detect(&composite, &series);
    Ok((composite, alerts))
}
