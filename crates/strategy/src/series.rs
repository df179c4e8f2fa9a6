use common::{Candle, Error, Result};

/// A validated, chronologically ordered run of closed candles.
///
/// Every derived sequence in this crate (true range, ATR, bands, trend flags)
/// is the same length as the `Series` and indexed positionally against it.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    candles: Vec<Candle>,
}

impl Series {
    /// Minimum number of bars needed for any prior-bar context.
    pub const MIN_BARS: usize = 2;

    /// Validate and wrap a candle sequence.
    ///
    /// Fails with `InsufficientData` below two bars, with `NonFiniteInput`
    /// at the first bar carrying a NaN or infinite price, and with
    /// `NonMonotonicInput` at the first timestamp that does not strictly
    /// follow its predecessor.
    pub fn new(candles: Vec<Candle>) -> Result<Self> {
        if candles.len() < Self::MIN_BARS {
            return Err(Error::InsufficientData { bars: candles.len() });
        }

        if let Some(index) = candles
            .iter()
            .position(|c| ![c.open, c.high, c.low, c.close].iter().all(|v| v.is_finite()))
        {
            return Err(Error::NonFiniteInput { index });
        }

        if let Some(index) = candles
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(Error::NonMonotonicInput { index: index + 1 });
        }

        Ok(Self { candles })
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Always false: a `Series` holds at least `MIN_BARS` candles.
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.candles.iter().map(|c| c.close)
    }

    pub fn last(&self) -> &Candle {
        &self.candles[self.candles.len() - 1]
    }
}

impl AsRef<[Candle]> for Series {
    fn as_ref(&self) -> &[Candle] {
        &self.candles
    }
}
