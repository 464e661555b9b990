use serde::{Deserialize, Serialize};

/// Unique identifier for an exchange server that serves historical klines.
///
/// ### Notes
/// BinanceSpot and BinanceFuturesUsd have distinct REST APIs (different base urls, kline paths
/// and per-request limits), and are therefore represented as unique variants.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename = "exchange", rename_all = "snake_case")]
pub enum ExchangeId {
    BinanceFuturesUsd,
    BinanceSpot,
}

impl ExchangeId {
    /// Return the &str representation of this [`ExchangeId`]
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::BinanceFuturesUsd => "binance_futures_usd",
            ExchangeId::BinanceSpot => "binance_spot",
        }
    }

    /// Maximum number of klines the exchange returns for a single request.
    pub fn max_klines_per_request(&self) -> u32 {
        match self {
            ExchangeId::BinanceFuturesUsd => 1500,
            ExchangeId::BinanceSpot => 1000,
        }
    }
}

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExchangeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "binance_futures_usd" | "binancelinear" | "futures" => {
                Ok(ExchangeId::BinanceFuturesUsd)
            }
            "binance_spot" | "spot" => Ok(ExchangeId::BinanceSpot),
            _ => Err(format!("unrecognised ExchangeId: {s}")),
        }
    }
}
