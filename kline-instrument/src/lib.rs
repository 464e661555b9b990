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

//! Exchange identifiers and trading pair types shared by the `kline-data` library and the
//! `kline-retriever` driver.

/// [`ExchangeId`](exchange::ExchangeId) identifying each supported exchange server.
pub mod exchange;

/// Validated exchange trading [`Pair`](pair::Pair) (eg/ "BTCUSDT").
pub mod pair;
