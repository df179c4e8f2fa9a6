//! Supertrend band-following indicator.
//!
//! The indicator value is always the band on the side implied by the current
//! trend: the lower band in an uptrend, the upper band in a downtrend. The
//! trend flips only when the close strictly crosses the *previous* value;
//! an exact tie carries the prior trend forward.
//!
//! Each bar depends on the immediately preceding output, so the series is
//! produced by folding `step` left to right.

use serde::{Deserialize, Serialize};

use common::{Candle, Error, Result, Trend};

use super::atr::atr;
use crate::series::Series;

/// Which price feeds the band midline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    /// `(high + low) / 2`
    #[default]
    Hl2,
    Open,
    High,
    Low,
    Close,
}

impl PriceSource {
    pub fn price(self, candle: &Candle) -> f64 {
        match self {
            PriceSource::Hl2 => candle.hl2(),
            PriceSource::Open => candle.open,
            PriceSource::High => candle.high,
            PriceSource::Low => candle.low,
            PriceSource::Close => candle.close,
        }
    }
}

/// Validated parameters for one Supertrend unit. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupertrendParams {
    period: usize,
    multiplier: f64,
    source: PriceSource,
}

impl SupertrendParams {
    /// Reference parameterization of the composite signal, narrowest first.
    pub const DEFAULT_TRIPLE: [SupertrendParams; 3] = [
        Self::trusted(10, 1.0),
        Self::trusted(11, 2.0),
        Self::trusted(12, 3.0),
    ];

    const fn trusted(period: usize, multiplier: f64) -> Self {
        Self {
            period,
            multiplier,
            source: PriceSource::Hl2,
        }
    }

    /// Rejects a zero period or a multiplier that is not a positive finite number.
    pub fn new(period: usize, multiplier: f64) -> Result<Self> {
        if period == 0 {
            return Err(Error::InvalidParameter(
                "Supertrend period must be >= 1".to_string(),
            ));
        }
        if !(multiplier.is_finite() && multiplier > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "Supertrend multiplier must be > 0, got {multiplier}"
            )));
        }
        Ok(Self {
            period,
            multiplier,
            source: PriceSource::default(),
        })
    }

    pub fn with_source(self, source: PriceSource) -> Self {
        Self { source, ..self }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn source(&self) -> PriceSource {
        self.source
    }
}

impl std::fmt::Display for SupertrendParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "supertrend({}, {})", self.period, self.multiplier)
    }
}

/// Recurrence state carried from one bar to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupertrendState {
    /// `None` only for the seed bar.
    pub value: Option<f64>,
    pub trend: Trend,
}

impl SupertrendState {
    /// Index-0 state: no value, uptrend by convention.
    pub const SEED: Self = Self {
        value: None,
        trend: Trend::Up,
    };
}

/// The per-bar quantities `step` consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandInputs {
    pub close: f64,
    pub upper: f64,
    pub lower: f64,
}

/// Advance the recurrence by one bar.
pub fn step(prior: SupertrendState, bar: BandInputs) -> SupertrendState {
    let trend = match prior.value {
        Some(prev) if bar.close > prev => Trend::Up,
        Some(prev) if bar.close < prev => Trend::Down,
        _ => prior.trend,
    };
    let value = match trend {
        Trend::Up => bar.lower,
        Trend::Down => bar.upper,
    };
    SupertrendState {
        value: Some(value),
        trend,
    }
}

/// Output of one unit, parallel to the input `Series`.
#[derive(Debug, Clone, PartialEq)]
pub struct SupertrendResult {
    pub value: Vec<Option<f64>>,
    pub trend: Vec<Trend>,
    pub upper_band: Vec<f64>,
    pub lower_band: Vec<f64>,
    pub atr: Vec<f64>,
}

impl SupertrendResult {
    pub fn len(&self) -> usize {
        self.trend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trend.is_empty()
    }

    /// Value at the bar before `index`, `None` at or before the seed bar.
    pub fn prev_value(&self, index: usize) -> Option<f64> {
        index.checked_sub(1).and_then(|p| self.value[p])
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Supertrend {
    params: SupertrendParams,
}

impl Supertrend {
    pub fn new(params: SupertrendParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SupertrendParams {
        &self.params
    }

    pub fn compute(&self, series: &Series) -> SupertrendResult {
        let candles = series.candles();
        let atr = atr(candles, self.params.period);

        let (upper_band, lower_band): (Vec<f64>, Vec<f64>) = candles
            .iter()
            .zip(&atr)
            .map(|(c, a)| {
                let src = self.params.source.price(c);
                let offset = self.params.multiplier * a;
                (src + offset, src - offset)
            })
            .unzip();

        let states: Vec<SupertrendState> = std::iter::once(SupertrendState::SEED)
            .chain((1..candles.len()).scan(SupertrendState::SEED, |prior, i| {
                let next = step(
                    *prior,
                    BandInputs {
                        close: candles[i].close,
                        upper: upper_band[i],
                        lower: lower_band[i],
                    },
                );
                *prior = next;
                Some(next)
            }))
            .collect();

        let (value, trend) = states.into_iter().map(|s| (s.value, s.trend)).unzip();

        SupertrendResult {
            value,
            trend,
            upper_band,
            lower_band,
            atr,
        }
    }
}
