use thiserror::Error;

/// Validation failures produced while resolving a
/// [`RetrievalRequest`](crate::window::RetrievalRequest) into a
/// [`TimeWindow`](crate::window::TimeWindow).
///
/// None of these are retryable; the request must be corrected and resubmitted.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ValidationError {
    #[error("a trading pair is required for retrieval")]
    EmptyPair,

    #[error("timeframe is not permitted: {0}")]
    UnknownTimeframe(String),

    #[error("timeframe is not served by the exchange: {0}")]
    UnsupportedTimeframe(String),

    #[error("limit must be a positive integer, got: {0}")]
    InvalidLimit(i64),

    #[error("start '{start}' and end '{end}' are neither date-times nor times-of-day")]
    MalformedBoundary { start: String, end: String },

    #[error("end date/time {end} must not be before start date/time {start}")]
    InvertedWindow { start: String, end: String },

    #[error("start date/time {start} must not be after the current date/time {now}")]
    FutureStart { start: String, now: String },
}

/// All errors generated in `kline-data`.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("SocketError: {0}")]
    Socket(String),

    #[error("exchange API error (HTTP {status}, code {code}): {message}")]
    Api {
        status: u16,
        code: i64,
        message: String,
    },

    #[error("failed to convert kline: {0}")]
    Conversion(String),

    #[error("invalid retrieval request: {0}")]
    Validation(#[from] ValidationError),

    #[error("retrieval failed fetching chunk {chunk}: {source}")]
    RetrievalFailed {
        chunk: usize,
        #[source]
        source: Box<DataError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl DataError {
    /// Wrap a kline collaborator failure that occurred while fetching the given 1-based chunk.
    pub fn retrieval_failed(chunk: usize, source: DataError) -> Self {
        Self::RetrievalFailed {
            chunk,
            source: Box::new(source),
        }
    }

    /// Determines if the error is a [`ValidationError`] (ie/ caused by the request itself).
    pub fn is_validation(&self) -> bool {
        matches!(self, DataError::Validation(_))
    }
}

#[cfg(feature = "rest")]
impl From<barter_integration::error::SocketError> for DataError {
    fn from(value: barter_integration::error::SocketError) -> Self {
        Self::Socket(value.to_string())
    }
}
