use std::sync::Arc;

use tracing::debug;

use common::{Error, Result, Trend};

use crate::indicators::{Supertrend, SupertrendParams, SupertrendResult};
use crate::series::Series;

/// Per-bar agreement state of the three trend streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeState {
    pub trend1: Trend,
    pub trend2_confirmed: Trend,
    pub trend3_confirmed: Trend,
}

impl CompositeState {
    pub fn all_up(&self) -> bool {
        self.trend1.is_up() && self.trend2_confirmed.is_up() && self.trend3_confirmed.is_up()
    }

    pub fn all_down(&self) -> bool {
        !self.trend1.is_up() && !self.trend2_confirmed.is_up() && !self.trend3_confirmed.is_up()
    }
}

/// Advance a confirmed trend stream by one bar.
///
/// Asymmetric: a down stream turns up when the close strictly
/// exceeds the *fast* unit's previous value, while an up stream turns down
/// only when the close falls strictly below the stream's *own* unit's
/// previous value. A missing previous value never flips.
pub fn confirm(prev: Trend, close: f64, fast_prev: Option<f64>, own_prev: Option<f64>) -> Trend {
    match prev {
        Trend::Down if fast_prev.is_some_and(|v| close > v) => Trend::Up,
        Trend::Up if own_prev.is_some_and(|v| close < v) => Trend::Down,
        _ => prev,
    }
}

/// Everything the combiner derives for a series, parallel to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    /// Unit results, narrowest (fastest) first.
    pub units: [SupertrendResult; 3],
    pub trend2_confirmed: Vec<Trend>,
    pub trend3_confirmed: Vec<Trend>,
    pub states: Vec<CompositeState>,
    green_alert: Vec<bool>,
    red_alert: Vec<bool>,
}

impl Composite {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn last_state(&self) -> Option<&CompositeState> {
        self.states.last()
    }

    /// Bars where all three streams just turned up. Never set at index 0.
    pub fn green_alert(&self) -> &[bool] {
        &self.green_alert
    }

    /// Bars where all three streams just turned down. Never set at index 0.
    pub fn red_alert(&self) -> &[bool] {
        &self.red_alert
    }

    /// Replace the edge flags, keeping everything else.
    #[cfg(test)]
    pub(crate) fn with_alert_flags(self, green_alert: Vec<bool>, red_alert: Vec<bool>) -> Self {
        assert_eq!(green_alert.len(), self.len());
        assert_eq!(red_alert.len(), self.len());
        Self {
            green_alert,
            red_alert,
            ..self
        }
    }

    fn combine(series: &Series, units: [SupertrendResult; 3]) -> Self {
        let closes: Vec<f64> = series.closes().collect();
        let [fast, second, third] = &units;

        let trend2_confirmed = confirmed_stream(&closes, fast, second);
        let trend3_confirmed = confirmed_stream(&closes, fast, third);

        let states: Vec<CompositeState> = (0..closes.len())
            .map(|i| CompositeState {
                trend1: fast.trend[i],
                trend2_confirmed: trend2_confirmed[i],
                trend3_confirmed: trend3_confirmed[i],
            })
            .collect();

        let green_alert = rising_edges(states.iter().map(CompositeState::all_up));
        let red_alert = rising_edges(states.iter().map(CompositeState::all_down));

        Self {
            units,
            trend2_confirmed,
            trend3_confirmed,
            states,
            green_alert,
            red_alert,
        }
    }
}

fn confirmed_stream(closes: &[f64], fast: &SupertrendResult, own: &SupertrendResult) -> Vec<Trend> {
    std::iter::once(Trend::Up)
        .chain((1..closes.len()).scan(Trend::Up, |prev, i| {
            *prev = confirm(*prev, closes[i], fast.prev_value(i), own.prev_value(i));
            Some(*prev)
        }))
        .collect()
}

/// `flag[i] && !flag[i-1]`, with index 0 never reported.
fn rising_edges(flags: impl Iterator<Item = bool>) -> Vec<bool> {
    let mut prev = None;
    flags
        .map(|current| {
            let edge = matches!(prev, Some(false)) && current;
            prev = Some(current);
            edge
        })
        .collect()
}

/// Three Supertrend units combined into one composite trend signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripleSupertrend {
    units: [Supertrend; 3],
}

impl Default for TripleSupertrend {
    fn default() -> Self {
        Self::new(SupertrendParams::DEFAULT_TRIPLE)
    }
}

impl TripleSupertrend {
    /// `params[0]` is the fast unit whose previous value gates up-confirmation.
    pub fn new(params: [SupertrendParams; 3]) -> Self {
        Self {
            units: params.map(Supertrend::new),
        }
    }

    pub fn params(&self) -> [SupertrendParams; 3] {
        self.units.map(|u| *u.params())
    }

    /// Run all three units and combine them on the current thread.
    pub fn evaluate(&self, series: &Series) -> Composite {
        let units = self.units.map(|u| u.compute(series));
        let composite = Composite::combine(series, units);
        log_summary(&composite);
        composite
    }

    /// Like `evaluate`, but each unit runs on the blocking pool.
    ///
    /// The units share nothing mutable; they are joined before combining.
    pub async fn evaluate_concurrent(&self, series: Arc<Series>) -> Result<Composite> {
        let [u1, u2, u3] = self.units;
        let spawn = |unit: Supertrend| {
            let series = Arc::clone(&series);
            tokio::task::spawn_blocking(move || unit.compute(&series))
        };

        let (r1, r2, r3) = tokio::try_join!(spawn(u1), spawn(u2), spawn(u3))
            .map_err(|e| Error::Other(format!("Supertrend task failed: {e}")))?;

        let composite = Composite::combine(&series, [r1, r2, r3]);
        log_summary(&composite);
        Ok(composite)
    }
}

fn log_summary(composite: &Composite) {
    debug!(
        bars = composite.len(),
        green = composite.green_alert.iter().filter(|&&g| g).count(),
        red = composite.red_alert.iter().filter(|&&r| r).count(),
        "Composite Supertrend evaluated"
    );
}
