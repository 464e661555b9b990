/// [`RestExchangeServer`](crate::exchange::RestExchangeServer) implementation for
/// [`BinanceServerFuturesUsd`](futures::BinanceServerFuturesUsd).
pub mod futures;

/// Generic REST client for Binance exchange variants.
pub mod rest;

/// [`RestExchangeServer`](crate::exchange::RestExchangeServer) implementation for
/// [`BinanceServerSpot`](spot::BinanceServerSpot).
pub mod spot;

/// Header carrying the Binance API key on REST requests.
pub const HEADER_API_KEY: &str = "X-MBX-APIKEY";
