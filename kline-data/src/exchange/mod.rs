use kline_instrument::exchange::ExchangeId;

/// `Binance` USD-margined futures and spot REST kline collaborators.
pub mod binance;

/// Static description of an exchange server that serves historical klines over REST.
///
/// Used by generic REST clients (eg/ [`BinanceRestClient<Server>`](binance::rest::BinanceRestClient))
/// to select the base URL and kline endpoint of a particular server variant.
pub trait RestExchangeServer: Send + Sync + 'static {
    /// Unique [`ExchangeId`] of the server.
    const ID: ExchangeId;

    /// Base URL of the server REST API (eg/ `https://fapi.binance.com`).
    fn rest_base_url() -> &'static str;

    /// Path of the kline/candlestick endpoint (eg/ `/fapi/v1/klines`).
    fn klines_path() -> &'static str;
}
