use crate::{
    candle::{Candle, Interval},
    error::DataError,
};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Exponential backoff [`RetryPolicy`](retry::RetryPolicy) used by REST kline collaborators.
pub mod retry;

/// Request parameters for fetching one bounded chunk of historical kline/candlestick data.
#[derive(Clone, Debug)]
pub struct KlineRequest {
    /// Exchange-specific market string (e.g., "BTCUSDT").
    pub market: String,
    /// Candlestick interval period.
    pub interval: Interval,
    /// Optional start time filter (inclusive).
    pub start: Option<DateTime<Utc>>,
    /// Optional end time filter (inclusive).
    pub end: Option<DateTime<Utc>>,
    /// Optional limit on the number of klines to return.
    pub limit: Option<u32>,
}

/// Exchange collaborator capable of fetching a single bounded chunk of klines.
///
/// Implementations must return candles ordered by non-decreasing `open_time`, may return fewer
/// than `limit` candles, and may repeat the candle opening exactly at `start` (which is the last
/// candle of the previous chunk when paginating).
pub trait KlineFetcher {
    /// Timeframes served by this collaborator. Any other interval is rejected before the first
    /// request of a retrieval.
    fn supported_intervals() -> &'static [Interval];

    /// Fetch a single chunk of klines for the given request parameters.
    fn fetch_klines(
        &self,
        request: KlineRequest,
    ) -> impl Future<Output = Result<Vec<Candle>, DataError>> + Send;
}
