use super::rest::BinanceRestClient;
use crate::exchange::RestExchangeServer;
use kline_instrument::exchange::ExchangeId;

/// [`BinanceServerFuturesUsd`] REST API base url.
///
/// See docs: <https://binance-docs.github.io/apidocs/futures/en/#general-info>
pub const REST_BASE_URL_BINANCE_FUTURES_USD: &str = "https://fapi.binance.com";

/// Binance perpetual usd REST kline client.
pub type BinanceFuturesUsdRestClient = BinanceRestClient<BinanceServerFuturesUsd>;

/// Binance perpetual usd [`RestExchangeServer`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct BinanceServerFuturesUsd;

impl RestExchangeServer for BinanceServerFuturesUsd {
    const ID: ExchangeId = ExchangeId::BinanceFuturesUsd;

    fn rest_base_url() -> &'static str {
        REST_BASE_URL_BINANCE_FUTURES_USD
    }

    fn klines_path() -> &'static str {
        "/fapi/v1/klines"
    }
}
