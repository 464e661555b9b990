#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Kline-Data
//! Paginated retrieval of historical kline/candlestick data from exchange REST APIs.
//!
//! A retrieval flows through three stages, each producing a new immutable value for the next:
//! * [`WindowResolver`](window::WindowResolver): validates a raw
//!   [`RetrievalRequest`](window::RetrievalRequest) (pair, timeframe, limit, start/end boundaries)
//!   into a [`ResolvedWindow`](window::ResolvedWindow), clamping a future end to "now".
//! * [`CandlestickFetcher`](fetcher::CandlestickFetcher): chains bounded
//!   [`KlineFetcher`](rest::KlineFetcher) requests across the window, deduplicating the boundary
//!   candle that exchanges echo between consecutive chunks.
//! * [`CsvWriter`](output::CsvWriter): writes the [`RetrievalResult`](fetcher::RetrievalResult) as
//!   a `;` delimited file named after the resolved window.
//!
//! ## Example
//! ```rust,no_run
//! use kline_data::{
//!     config::{Credentials, RestConfig},
//!     exchange::binance::futures::BinanceFuturesUsdRestClient,
//!     fetcher::CandlestickFetcher,
//!     output::CsvWriter,
//!     window::{RetrievalRequest, WindowResolver},
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let request = RetrievalRequest::new("BTCUSDT", "00:00", "08:00", "1m", 1500);
//!     let resolved = WindowResolver.resolve(&request).unwrap();
//!
//!     let client = BinanceFuturesUsdRestClient::new(RestConfig::with_credentials(
//!         Credentials::from_env(),
//!     ));
//!
//!     let result = CandlestickFetcher::new(client)
//!         .fetch_all(&resolved)
//!         .await
//!         .unwrap();
//!
//!     let path = CsvWriter::default().write(&result).unwrap();
//!     println!("wrote {} candles to {}", result.batch.len(), path.display());
//! }
//! ```

/// [`Candle`](candle::Candle) model, its declared field schema, and the
/// [`Interval`](candle::Interval) timeframe.
pub mod candle;

/// Exchange [`Credentials`](config::Credentials) and REST client
/// [`RestConfig`](config::RestConfig).
pub mod config;

/// All [`Error`](std::error::Error)s generated in Kline-Data.
pub mod error;

/// REST kline collaborators for each supported exchange server.
#[cfg(feature = "rest")]
pub mod exchange;

/// Chunked, deduplicating retrieval of every candle in a resolved window.
pub mod fetcher;

/// Delimited-file output of a [`RetrievalResult`](fetcher::RetrievalResult).
pub mod output;

/// The [`KlineFetcher`](rest::KlineFetcher) collaborator trait and request types.
pub mod rest;

/// Validation and resolution of raw retrieval requests into absolute time windows.
pub mod window;
