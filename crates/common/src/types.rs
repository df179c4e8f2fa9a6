use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One fully-closed OHLCV bar.
///
/// `timestamp` is the bar's open time in UTC. Incomplete bars are filtered
/// by the `CandleSource` before they reach the indicator engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Midpoint of the bar's range, `(high + low) / 2`.
    pub fn hl2(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

/// Direction of a trend stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    #[default]
    Up,
    Down,
}

impl Trend {
    /// `+1` for up, `-1` for down.
    pub fn as_i8(self) -> i8 {
        match self {
            Trend::Up => 1,
            Trend::Down => -1,
        }
    }

    pub fn is_up(self) -> bool {
        self == Trend::Up
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Up => write!(f, "up"),
            Trend::Down => write!(f, "down"),
        }
    }
}

/// Kind of a composite-trend alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    UptrendConfirmed,
    DowntrendConfirmed,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::UptrendConfirmed => write!(f, "Uptrend Confirmed"),
            AlertKind::DowntrendConfirmed => write!(f, "Downtrend Confirmed"),
        }
    }
}

/// Emitted on the bar where all three trend streams enter agreement.
///
/// Carries the UTC instant only; conversion to a display timezone is the
/// presentation layer's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: AlertKind,
}
