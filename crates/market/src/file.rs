use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use common::{Candle, CandleSource, Result};

/// Replays candles stored as a JSON array of `Candle` records.
///
/// Useful for offline runs and reproducing an alert from a saved snapshot.
/// The file is trusted to contain closed bars only; ordering is checked
/// downstream when the engine builds its `Series`.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CandleSource for JsonFileSource {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn closed_candles(&self) -> Result<Vec<Candle>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let candles: Vec<Candle> = serde_json::from_str(&raw)?;
        info!(source = %self.describe(), bars = candles.len(), "Loaded candles from file");
        Ok(candles)
    }
}
