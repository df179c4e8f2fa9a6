use async_trait::async_trait;

use crate::{Candle, Result};

/// Abstraction over the market-data provider.
///
/// `BinanceKlines` implements this against the public REST API.
/// `JsonFileSource` implements this for offline replay.
///
/// Implementations must only return fully-closed bars, sorted oldest first
/// with strictly increasing timestamps. Retries and timeouts belong here,
/// never in the indicator engine.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Short label for logs (e.g. "binance:BTCUSDT:1h").
    fn describe(&self) -> String;

    /// Fetch the closed candles available from this source.
    async fn closed_candles(&self) -> Result<Vec<Candle>>;
}
