use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use common::{Candle, CandleSource, Error, Result};

const BASE_URL: &str = "https://api.binance.com";
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// REST kline client for Binance spot market data.
///
/// Returns only bars whose close time has passed; the still-forming bar at
/// the end of the response is dropped. Transient failures (transport
/// errors, HTTP 429 and 5xx) are retried with exponential backoff.
pub struct BinanceKlines {
    symbol: String,
    interval: String,
    limit: u16,
    api_key: Option<String>,
    retries: u32,
    initial_backoff: Duration,
    base_url: String,
    http: Client,
}

impl BinanceKlines {
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>, limit: u16) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            symbol: symbol.into(),
            interval: interval.into(),
            limit,
            api_key: None,
            retries: 3,
            initial_backoff: Duration::from_secs(1),
            base_url: BASE_URL.to_string(),
            http,
        })
    }

    /// Send `X-MBX-APIKEY` with every request.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_once(&self) -> Result<String> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let limit = self.limit.to_string();

        let mut request = self.http.get(&url).query(&[
            ("symbol", self.symbol.as_str()),
            ("interval", self.interval.as_str()),
            ("limit", limit.as_str()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("X-MBX-APIKEY", key);
        }

        let resp = request.send().await.map_err(|e| Error::Http(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if status.is_success() {
            return Ok(body);
        }
        let msg = format!("HTTP {status}: {}", truncate(&body, 256));
        if is_transient(status) {
            Err(Error::Http(msg))
        } else {
            Err(Error::Exchange(msg))
        }
    }

    async fn fetch_with_retry(&self) -> Result<String> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 0;

        loop {
            match self.fetch_once().await {
                Ok(body) => return Ok(body),
                Err(Error::Http(e)) if attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        symbol = %self.symbol,
                        attempt,
                        error = %e,
                        backoff = ?backoff,
                        "Kline request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl CandleSource for BinanceKlines {
    fn describe(&self) -> String {
        format!("binance:{}:{}", self.symbol, self.interval)
    }

    async fn closed_candles(&self) -> Result<Vec<Candle>> {
        debug!(symbol = %self.symbol, interval = %self.interval, limit = self.limit, "Fetching klines");
        let body = self.fetch_with_retry().await?;
        let candles = parse_klines(&body, Utc::now())?;
        info!(
            source = %self.describe(),
            bars = candles.len(),
            "Fetched closed candles"
        );
        Ok(candles)
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

// ─── Kline JSON parsing ──────────────────────────────────────────────────────

/// Parse the `/api/v3/klines` array-of-arrays payload.
///
/// Bars with a close time at or after `now` are still forming and are
/// dropped. The result is sorted by open time with duplicates removed.
pub fn parse_klines(body: &str, now: DateTime<Utc>) -> Result<Vec<Candle>> {
    let entries: Vec<Vec<Value>> = serde_json::from_str(body)?;
    let now_ms = now.timestamp_millis();

    let mut candles = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let (candle, close_time_ms) = parse_entry(entry)
            .ok_or_else(|| Error::Exchange(format!("Malformed kline entry at position {i}")))?;
        if close_time_ms < now_ms {
            candles.push(candle);
        } else {
            debug!(open = %candle.timestamp, "Dropping incomplete kline");
        }
    }

    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);
    Ok(candles)
}

fn parse_entry(entry: &[Value]) -> Option<(Candle, i64)> {
    if entry.len() < 7 {
        return None;
    }
    let timestamp = DateTime::<Utc>::from_timestamp_millis(entry[0].as_i64()?)?;
    let number = |v: &Value| {
        v.as_str()?
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
    };
    let candle = Candle {
        timestamp,
        open: number(&entry[1])?,
        high: number(&entry[2])?,
        low: number(&entry[3])?,
        close: number(&entry[4])?,
        volume: number(&entry[5])?,
    };
    Some((candle, entry[6].as_i64()?))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::TimeZone;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    const HOUR_MS: i64 = 3_600_000;
    const T0: i64 = 1_704_067_200_000; // 2024-01-01T00:00:00Z

    fn kline(open_ms: i64, close: &str) -> String {
        format!(
            r#"[{open_ms},"100.0","110.5","95.25","{close}","12.5",{},"1000.0",42,"6.0","600.0","0"]"#,
            open_ms + HOUR_MS - 1
        )
    }

    fn payload(rows: &[String]) -> String {
        format!("[{}]", rows.join(","))
    }

    #[test]
    fn parses_fields_from_string_prices() {
        let body = payload(&[kline(T0, "104.75")]);
        let now = Utc.timestamp_millis_opt(T0 + 2 * HOUR_MS).unwrap();
        let candles = parse_klines(&body, now).unwrap();

        assert_eq!(candles.len(), 1);
        let c = candles[0];
        assert_eq!(c.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(c.open, 100.0);
        assert_eq!(c.high, 110.5);
        assert_eq!(c.low, 95.25);
        assert_eq!(c.close, 104.75);
        assert_eq!(c.volume, 12.5);
    }

    #[test]
    fn drops_bar_that_has_not_closed() {
        let body = payload(&[kline(T0, "1"), kline(T0 + HOUR_MS, "2"), kline(T0 + 2 * HOUR_MS, "3")]);
        // Halfway through the third bar.
        let now = Utc.timestamp_millis_opt(T0 + 2 * HOUR_MS + HOUR_MS / 2).unwrap();
        let candles = parse_klines(&body, now).unwrap();
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![1.0, 2.0]);
    }

    #[test]
    fn sorts_and_dedups_by_open_time() {
        let body = payload(&[kline(T0 + HOUR_MS, "2"), kline(T0, "1"), kline(T0 + HOUR_MS, "2")]);
        let now = Utc.timestamp_millis_opt(T0 + 10 * HOUR_MS).unwrap();
        let candles = parse_klines(&body, now).unwrap();
        assert_eq!(candles.len(), 2);
        assert!(candles[0].timestamp < candles[1].timestamp);
    }

    #[test]
    fn rejects_malformed_entry() {
        let now = Utc.timestamp_millis_opt(T0).unwrap();
        let err = parse_klines(r#"[[1, "a", "b"]]"#, now).unwrap_err();
        assert!(matches!(err, Error::Exchange(_)));

        let err = parse_klines(r#"{"code": -1121}"#, now).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn rejects_non_finite_prices() {
        let now = Utc.timestamp_millis_opt(T0 + 10 * HOUR_MS).unwrap();
        for bad in ["NaN", "inf", "-infinity"] {
            let body = payload(&[kline(T0, "1"), kline(T0 + HOUR_MS, bad)]);
            let err = parse_klines(&body, now).unwrap_err();
            assert!(
                matches!(err, Error::Exchange(ref msg) if msg.contains("position 1")),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn truncate_keeps_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    /// Answer each connection with the next canned `(status, body)` pair.
    async fn serve(listener: TcpListener, responses: Vec<(&'static str, String)>, hits: Arc<AtomicUsize>) {
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut buf = Vec::new();
            let mut tmp = [0u8; 1024];
            loop {
                let n = socket.read(&mut tmp).await.expect("read");
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&tmp[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            hits.fetch_add(1, Ordering::SeqCst);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("write");
        }
    }

    #[tokio::test]
    async fn retries_transient_status_then_succeeds() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let body = payload(&[kline(T0, "1"), kline(T0 + HOUR_MS, "2")]);
        let handle = tokio::spawn(serve(
            listener,
            vec![("503 Service Unavailable", "busy".to_string()), ("200 OK", body)],
            hits.clone(),
        ));

        let client = BinanceKlines::new("BTCUSDT", "1h", 2)
            .unwrap()
            .with_base_url(format!("http://{addr}"))
            .with_initial_backoff(Duration::from_millis(10))
            .with_retries(2);
        let candles = client.closed_candles().await.unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = tokio::spawn(serve(
            listener,
            vec![("400 Bad Request", r#"{"code":-1121,"msg":"Invalid symbol."}"#.to_string())],
            hits.clone(),
        ));

        let client = BinanceKlines::new("NOPE", "1h", 10)
            .unwrap()
            .with_base_url(format!("http://{addr}"))
            .with_initial_backoff(Duration::from_millis(10));
        let err = client.closed_candles().await.unwrap_err();

        assert!(matches!(err, Error::Exchange(ref msg) if msg.contains("Invalid symbol")));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn gives_up_after_configured_retries() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = tokio::spawn(serve(
            listener,
            vec![
                ("500 Internal Server Error", "oops".to_string()),
                ("429 Too Many Requests", "slow down".to_string()),
            ],
            hits.clone(),
        ));

        let client = BinanceKlines::new("BTCUSDT", "1h", 10)
            .unwrap()
            .with_base_url(format!("http://{addr}"))
            .with_initial_backoff(Duration::from_millis(5))
            .with_retries(1);
        let err = client.closed_candles().await.unwrap_err();

        assert!(matches!(err, Error::Http(ref msg) if msg.contains("429")));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        handle.await.unwrap();
    }
}
