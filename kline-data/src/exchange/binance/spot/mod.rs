use super::rest::BinanceRestClient;
use crate::exchange::RestExchangeServer;
use kline_instrument::exchange::ExchangeId;

/// [`BinanceServerSpot`] REST API base url.
///
/// See docs: <https://binance-docs.github.io/apidocs/spot/en/#general-api-information>
pub const REST_BASE_URL_BINANCE_SPOT: &str = "https://api.binance.com";

/// Binance spot REST kline client.
pub type BinanceSpotRestClient = BinanceRestClient<BinanceServerSpot>;

/// Binance spot [`RestExchangeServer`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct BinanceServerSpot;

impl RestExchangeServer for BinanceServerSpot {
    const ID: ExchangeId = ExchangeId::BinanceSpot;

    fn rest_base_url() -> &'static str {
        REST_BASE_URL_BINANCE_SPOT
    }

    fn klines_path() -> &'static str {
        "/api/v3/klines"
    }
}
