use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalised OHLCV [`Candle`] model.
///
/// `open_time` is the ordering and pagination key. Every other field is payload that only matters
/// to the output writer, which reads it through the declared [`CANDLE_FIELDS`] schema.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: DateTime<Utc>,
    pub quote_asset_volume: f64,
    pub trade_count: u64,
    pub taker_buy_base_asset_volume: f64,
    pub taker_buy_quote_asset_volume: f64,
}

/// Kind of value held by a [`CandleField`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum FieldKind {
    /// Absolute instant, exchange native millisecond resolution.
    Timestamp,
    /// Price or volume.
    Decimal,
    /// Non-negative count.
    Count,
}

/// Statically declared [`Candle`] attribute, shared by the model and the delimited-file writer.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct CandleField {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl CandleField {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Ordered [`Candle`] schema. This is also the header order of written files.
pub const CANDLE_FIELDS: [CandleField; 11] = [
    CandleField::new("openTime", FieldKind::Timestamp),
    CandleField::new("open", FieldKind::Decimal),
    CandleField::new("high", FieldKind::Decimal),
    CandleField::new("low", FieldKind::Decimal),
    CandleField::new("close", FieldKind::Decimal),
    CandleField::new("volume", FieldKind::Decimal),
    CandleField::new("closeTime", FieldKind::Timestamp),
    CandleField::new("quoteAssetVolume", FieldKind::Decimal),
    CandleField::new("numTrades", FieldKind::Count),
    CandleField::new("takerBuyBaseAssetVolume", FieldKind::Decimal),
    CandleField::new("takerBuyQuoteAssetVolume", FieldKind::Decimal),
];

/// Typed value of a single [`CandleField`] of a [`Candle`].
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum FieldValue {
    Timestamp(DateTime<Utc>),
    Decimal(f64),
    Count(u64),
}

impl Candle {
    /// Return the value of the provided [`CandleField`], or `None` if the field is not part of
    /// the [`CANDLE_FIELDS`] schema.
    pub fn value(&self, field: &CandleField) -> Option<FieldValue> {
        let value = match field.name {
            "openTime" => FieldValue::Timestamp(self.open_time),
            "open" => FieldValue::Decimal(self.open),
            "high" => FieldValue::Decimal(self.high),
            "low" => FieldValue::Decimal(self.low),
            "close" => FieldValue::Decimal(self.close),
            "volume" => FieldValue::Decimal(self.volume),
            "closeTime" => FieldValue::Timestamp(self.close_time),
            "quoteAssetVolume" => FieldValue::Decimal(self.quote_asset_volume),
            "numTrades" => FieldValue::Count(self.trade_count),
            "takerBuyBaseAssetVolume" => FieldValue::Decimal(self.taker_buy_base_asset_volume),
            "takerBuyQuoteAssetVolume" => FieldValue::Decimal(self.taker_buy_quote_asset_volume),
            _ => return None,
        };
        Some(value)
    }

    /// `open_time` in exchange native milliseconds.
    pub fn open_time_millis(&self) -> i64 {
        self.open_time.timestamp_millis()
    }
}

/// Normalised candlestick interval period.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum Interval {
    M1,
    M3,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    H6,
    H8,
    H12,
    D1,
    D3,
    W1,
    Month1,
}

impl Interval {
    /// Every permitted [`Interval`], finest first.
    pub const ALL: [Interval; 15] = [
        Interval::M1,
        Interval::M3,
        Interval::M5,
        Interval::M15,
        Interval::M30,
        Interval::H1,
        Interval::H2,
        Interval::H4,
        Interval::H6,
        Interval::H8,
        Interval::H12,
        Interval::D1,
        Interval::D3,
        Interval::W1,
        Interval::Month1,
    ];

    /// Canonical timeframe token (eg/ "1m", "4h", "1M").
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M3 => "3m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::H2 => "2h",
            Interval::H4 => "4h",
            Interval::H6 => "6h",
            Interval::H8 => "8h",
            Interval::H12 => "12h",
            Interval::D1 => "1d",
            Interval::D3 => "3d",
            Interval::W1 => "1w",
            Interval::Month1 => "1M",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Interval {
    type Err = ValidationError;

    // Case-sensitive: "1m" is one minute, "1M" is one month.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .into_iter()
            .find(|interval| interval.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownTimeframe(s.to_string()))
    }
}
