use tracing::info;

use common::{AlertEvent, AlertKind};

use crate::series::Series;
use crate::triple::Composite;

/// Turn the combiner's edge flags into timestamped alert events.
///
/// One event per flagged bar, oldest first. The flags are already
/// edge-triggered, so no state is kept here beyond the scan position.
///
/// `composite` must have been evaluated from `series`.
pub fn detect(composite: &Composite, series: &Series) -> Vec<AlertEvent> {
    debug_assert_eq!(
        composite.len(),
        series.len(),
        "composite was evaluated from a different series"
    );

    let alerts: Vec<AlertEvent> = series
        .candles()
        .iter()
        .zip(composite.green_alert().iter().zip(composite.red_alert()))
        .filter_map(|(candle, (&green, &red))| {
            let kind = match (green, red) {
                (true, _) => AlertKind::UptrendConfirmed,
                (false, true) => AlertKind::DowntrendConfirmed,
                (false, false) => return None,
            };
            Some(AlertEvent {
                timestamp: candle.timestamp,
                kind,
            })
        })
        .collect();

    if let Some(latest) = alerts.last() {
        info!(
            count = alerts.len(),
            latest = %latest.kind,
            at = %latest.timestamp,
            "Composite Supertrend alerts detected"
        );
    }
    alerts
}
