use chrono::{FixedOffset, Offset, Utc};
use tracing::warn;

use crate::{Error, Result};

/// Runtime configuration loaded from environment variables at startup.
///
/// Credentials and account identifiers are never compiled in; a missing
/// `BINANCE_API_KEY` simply means public (unauthenticated) market data.
#[derive(Debug, Clone)]
pub struct Config {
    // Market data
    pub symbol: String,
    pub interval: String,
    pub candle_limit: u16,
    pub fetch_retries: u32,

    // Credentials (optional for public kline data)
    pub api_key: Option<String>,
    pub account_id: Option<String>,

    // Offline replay: read candles from this JSON file instead of the network
    pub candle_file: Option<String>,

    // Indicator parameter file (TOML); defaults apply when unset
    pub strategy_config_path: Option<String>,

    // Presentation
    pub display_offset: FixedOffset,
}

impl Config {
    pub const DEFAULT_SYMBOL: &'static str = "BTCUSDT";
    pub const DEFAULT_INTERVAL: &'static str = "1h";
    pub const DEFAULT_CANDLE_LIMIT: u16 = 200;
    pub const MAX_CANDLE_LIMIT: u16 = 1000;
    pub const DEFAULT_FETCH_RETRIES: u32 = 3;

    /// Load configuration from the process environment.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let candle_limit = match get("CANDLE_LIMIT") {
            Some(raw) => {
                let requested = raw.parse::<u64>().map_err(|_| {
                    Error::Config(format!("CANDLE_LIMIT must be an integer, got '{raw}'"))
                })?;
                let limit = requested.clamp(1, u64::from(Self::MAX_CANDLE_LIMIT));
                if limit != requested {
                    warn!(requested, limit, "CANDLE_LIMIT out of range, clamped");
                }
                // Clamped to MAX_CANDLE_LIMIT, so always fits.
                limit as u16
            }
            None => Self::DEFAULT_CANDLE_LIMIT,
        };

        let fetch_retries = match get("FETCH_RETRIES") {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| Error::Config(format!("FETCH_RETRIES must be an integer, got '{raw}'")))?,
            None => Self::DEFAULT_FETCH_RETRIES,
        };

        let display_offset = match get("DISPLAY_UTC_OFFSET") {
            Some(raw) => parse_utc_offset(&raw)?,
            None => utc(),
        };

        Ok(Config {
            symbol: get("SYMBOL")
                .map(|s| s.to_uppercase())
                .unwrap_or_else(|| Self::DEFAULT_SYMBOL.to_string()),
            interval: get("INTERVAL").unwrap_or_else(|| Self::DEFAULT_INTERVAL.to_string()),
            candle_limit,
            fetch_retries,
            api_key: get("BINANCE_API_KEY"),
            account_id: get("ACCOUNT_ID"),
            candle_file: get("CANDLE_FILE"),
            strategy_config_path: get("STRATEGY_CONFIG_PATH"),
            display_offset,
        })
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Parse an offset of the form `+HH:MM`, `-HH:MM`, `+HHMM` or `Z`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let invalid = || Error::Config(format!("DISPLAY_UTC_OFFSET must look like '+05:30', got '{raw}'"));

    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Ok(utc());
    }

    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.symbol, "BTCUSDT");
        assert_eq!(cfg.interval, "1h");
        assert_eq!(cfg.candle_limit, 200);
        assert_eq!(cfg.fetch_retries, 3);
        assert!(cfg.api_key.is_none());
        assert!(cfg.candle_file.is_none());
        assert_eq!(cfg.display_offset.local_minus_utc(), 0);
    }

    #[test]
    fn reads_overrides_and_clamps_limit() {
        let cfg = Config::from_lookup(lookup(&[
            ("SYMBOL", "ethusdt"),
            ("INTERVAL", "15m"),
            ("CANDLE_LIMIT", "5000"),
            ("BINANCE_API_KEY", "key"),
            ("ACCOUNT_ID", "  "),
            ("DISPLAY_UTC_OFFSET", "+05:30"),
        ]))
        .unwrap();
        assert_eq!(cfg.symbol, "ETHUSDT");
        assert_eq!(cfg.interval, "15m");
        assert_eq!(cfg.candle_limit, Config::MAX_CANDLE_LIMIT);
        assert_eq!(cfg.api_key.as_deref(), Some("key"));
        assert!(cfg.account_id.is_none(), "blank values count as unset");
        assert_eq!(cfg.display_offset.local_minus_utc(), 5 * 3600 + 30 * 60);
    }

    #[test]
    fn clamps_limits_beyond_sixteen_bits() {
        for raw in ["70000", "18446744073709551615"] {
            let cfg = Config::from_lookup(lookup(&[("CANDLE_LIMIT", raw)])).unwrap();
            assert_eq!(cfg.candle_limit, Config::MAX_CANDLE_LIMIT, "{raw}");
        }
        let cfg = Config::from_lookup(lookup(&[("CANDLE_LIMIT", "0")])).unwrap();
        assert_eq!(cfg.candle_limit, 1);
    }

    #[test]
    fn rejects_malformed_numbers() {
        let err = Config::from_lookup(lookup(&[("CANDLE_LIMIT", "lots")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn parses_offsets() {
        assert_eq!(parse_utc_offset("-04:00").unwrap().local_minus_utc(), -4 * 3600);
        assert_eq!(parse_utc_offset("+0100").unwrap().local_minus_utc(), 3600);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("05:00").is_err());
        assert!(parse_utc_offset("+25:00").is_err());
        assert!(parse_utc_offset("+5").is_err());
    }
}
