use crate::{candle::Candle, error::DataError};
use barter_integration::{de::extract_next, protocol::http::rest::RestRequest};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::borrow::Cow;

/// REST request to fetch kline/candlestick data from a Binance API variant.
///
/// The `path` field stores the endpoint path, which differs between spot
/// (`/api/v3/klines`) and futures (`/fapi/v1/klines`).
#[derive(Debug, Clone)]
pub struct GetKlines {
    pub path: &'static str,
    pub params: GetKlinesParams,
}

/// Query parameters for a Binance klines REST request.
///
/// Both `startTime` and `endTime` are inclusive millisecond instants.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct GetKlinesParams {
    pub symbol: String,
    pub interval: &'static str,
    #[serde(rename = "startTime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(rename = "endTime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl RestRequest for GetKlines {
    type Response = Vec<BinanceKlineRaw>;
    type QueryParams = GetKlinesParams;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.path)
    }

    fn method() -> reqwest::Method {
        reqwest::Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.params)
    }
}

/// Raw kline/candlestick row returned by the Binance REST API.
///
/// Binance returns klines as positional arrays of mixed types:
/// ```json
/// [1499040000000, "0.01634790", "0.80000000", "0.01575800", "0.01577100", "148976.11427815",
///  1499644799999, "2434.19055334", 308, "1756.87402397", "28.46694368", "0"]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BinanceKlineRaw {
    pub open_time: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub close_time: i64,
    pub quote_asset_volume: String,
    pub trade_count: u64,
    pub taker_buy_base_asset_volume: String,
    pub taker_buy_quote_asset_volume: String,
}

impl<'de> serde::Deserialize<'de> for BinanceKlineRaw {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        struct BinanceKlineVisitor;

        impl<'de> serde::de::Visitor<'de> for BinanceKlineVisitor {
            type Value = BinanceKlineRaw;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a Binance kline array with at least 11 elements")
            }

            fn visit_seq<SeqAccessor>(
                self,
                mut seq: SeqAccessor,
            ) -> Result<Self::Value, SeqAccessor::Error>
            where
                SeqAccessor: serde::de::SeqAccess<'de>,
            {
                let kline = BinanceKlineRaw {
                    open_time: extract_next(&mut seq, "open_time")?,
                    open: extract_next(&mut seq, "open")?,
                    high: extract_next(&mut seq, "high")?,
                    low: extract_next(&mut seq, "low")?,
                    close: extract_next(&mut seq, "close")?,
                    volume: extract_next(&mut seq, "volume")?,
                    close_time: extract_next(&mut seq, "close_time")?,
                    quote_asset_volume: extract_next(&mut seq, "quote_asset_volume")?,
                    trade_count: extract_next(&mut seq, "trade_count")?,
                    taker_buy_base_asset_volume: extract_next(
                        &mut seq,
                        "taker_buy_base_asset_volume",
                    )?,
                    taker_buy_quote_asset_volume: extract_next(
                        &mut seq,
                        "taker_buy_quote_asset_volume",
                    )?,
                };

                // Trailing "ignore" element(s)
                while seq.next_element::<serde::de::IgnoredAny>()?.is_some() {}

                Ok(kline)
            }
        }

        deserializer.deserialize_seq(BinanceKlineVisitor)
    }
}

fn parse_millis(name: &str, millis: i64) -> Result<DateTime<Utc>, DataError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| DataError::Conversion(format!("invalid {name} millis: {millis}")))
}

fn parse_decimal(name: &str, value: &str) -> Result<f64, DataError> {
    value
        .parse::<f64>()
        .map_err(|error| DataError::Conversion(format!("failed to parse {name} '{value}': {error}")))
}

impl TryFrom<BinanceKlineRaw> for Candle {
    type Error = DataError;

    fn try_from(raw: BinanceKlineRaw) -> Result<Self, Self::Error> {
        Ok(Candle {
            open_time: parse_millis("open_time", raw.open_time)?,
            open: parse_decimal("open", &raw.open)?,
            high: parse_decimal("high", &raw.high)?,
            low: parse_decimal("low", &raw.low)?,
            close: parse_decimal("close", &raw.close)?,
            volume: parse_decimal("volume", &raw.volume)?,
            close_time: parse_millis("close_time", raw.close_time)?,
            quote_asset_volume: parse_decimal("quote_asset_volume", &raw.quote_asset_volume)?,
            trade_count: raw.trade_count,
            taker_buy_base_asset_volume: parse_decimal(
                "taker_buy_base_asset_volume",
                &raw.taker_buy_base_asset_volume,
            )?,
            taker_buy_quote_asset_volume: parse_decimal(
                "taker_buy_quote_asset_volume",
                &raw.taker_buy_quote_asset_volume,
            )?,
        })
    }
}
