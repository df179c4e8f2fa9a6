mod display;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::{CandleSource, Config};
use market::{BinanceKlines, JsonFileSource};
use strategy::{alerts, Series, SupertrendFileConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("invalid configuration")?;
    info!(
        symbol = %cfg.symbol,
        interval = %cfg.interval,
        account = cfg.account_id.as_deref().unwrap_or("-"),
        "Supertrend alerts starting"
    );

    let params = SupertrendFileConfig::load_or_default(cfg.strategy_config_path.as_deref())
        .context("failed to load Supertrend parameters")?;
    let triple = params.build().context("invalid Supertrend parameters")?;
    for p in triple.params() {
        info!(period = p.period(), multiplier = p.multiplier(), source = ?p.source(), "Supertrend unit");
    }

    // ── Market data (file replay or exchange) ─────────────────────────────────
    let source: Box<dyn CandleSource> = match &cfg.candle_file {
        Some(path) => Box::new(JsonFileSource::new(path)),
        None => Box::new(
            BinanceKlines::new(&cfg.symbol, &cfg.interval, cfg.candle_limit)?
                .with_api_key(cfg.api_key.clone())
                .with_retries(cfg.fetch_retries),
        ),
    };
    let candles = source
        .closed_candles()
        .await
        .with_context(|| format!("failed to fetch candles from {}", source.describe()))?;

    // ── Indicator engine ──────────────────────────────────────────────────────
    let series = Arc::new(Series::new(candles).context("candle series rejected")?);
    let composite = triple.evaluate_concurrent(Arc::clone(&series)).await?;
    let alerts = alerts::detect(&composite, &series);

    // ── Presentation ──────────────────────────────────────────────────────────
    for alert in &alerts {
        println!("{}", display::alert_line(alert, &cfg.symbol, cfg.display_offset));
    }
    if let Some(state) = composite.last_state() {
        println!(
            "{}",
            display::state_line(series.last(), state, &cfg.symbol, cfg.display_offset)
        );
    }

    info!(bars = series.len(), alerts = alerts.len(), "Done");
    Ok(())
}
