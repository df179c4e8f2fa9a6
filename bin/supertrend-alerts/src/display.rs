use chrono::{DateTime, FixedOffset, Utc};

use common::{AlertEvent, Candle};
use strategy::CompositeState;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M %:z";

fn local(ts: DateTime<Utc>, offset: FixedOffset) -> String {
    ts.with_timezone(&offset).format(TIME_FORMAT).to_string()
}

/// `2024-01-01 05:30 +05:30 BTCUSDT Uptrend Confirmed`
pub fn alert_line(alert: &AlertEvent, symbol: &str, offset: FixedOffset) -> String {
    format!("{} {symbol} {}", local(alert.timestamp, offset), alert.kind)
}

/// Composite state of the most recent closed bar.
pub fn state_line(last: &Candle, state: &CompositeState, symbol: &str, offset: FixedOffset) -> String {
    let label = if state.all_up() {
        "all up"
    } else if state.all_down() {
        "all down"
    } else {
        "mixed"
    };
    format!(
        "{} {symbol} close={} trends=[{}, {}, {}] ({label})",
        local(last.timestamp, offset),
        last.close,
        state.trend1,
        state.trend2_confirmed,
        state.trend3_confirmed,
    )
}
