use super::HEADER_API_KEY;
use crate::{
    candle::{Candle, Interval},
    config::{Credentials, RestConfig},
    error::DataError,
    exchange::RestExchangeServer,
    rest::{
        KlineFetcher, KlineRequest,
        retry::{RetryPolicy, is_retriable_data_error},
    },
};
use barter_integration::{
    error::SocketError,
    protocol::http::{
        BuildStrategy, HttpParser,
        rest::{RestRequest, client::RestClient},
    },
};
use governor::Quota;
use reqwest::StatusCode;
use serde::Deserialize;
use std::{fmt, marker::PhantomData, sync::Arc};
use tracing::{Instrument, debug, warn};

/// Binance kline/candlestick REST request, raw DTO, and conversion to [`Candle`].
pub mod klines;

/// Binance REST API error payload.
///
/// Returned by the Binance API when a request fails, e.g.:
/// ```json
/// { "code": -1121, "msg": "Invalid symbol." }
/// ```
#[derive(Debug, Deserialize)]
pub struct BinanceApiError {
    pub code: i64,
    pub msg: String,
}

/// HTTP response parser for Binance REST API responses.
#[derive(Debug)]
pub struct BinanceHttpParser;

impl HttpParser for BinanceHttpParser {
    type ApiError = BinanceApiError;
    type OutputError = DataError;

    fn parse_api_error(&self, status: StatusCode, error: Self::ApiError) -> Self::OutputError {
        DataError::Api {
            status: status.as_u16(),
            code: error.code,
            message: error.msg,
        }
    }
}

/// [`BuildStrategy`] that attaches the Binance API key header, unless the configured key is the
/// placeholder.
#[derive(Clone)]
pub struct ApiKeyHeader {
    api_key: Option<String>,
}

impl From<&Credentials> for ApiKeyHeader {
    fn from(credentials: &Credentials) -> Self {
        Self {
            api_key: (!credentials.is_placeholder()).then(|| credentials.api_key.clone()),
        }
    }
}

impl fmt::Debug for ApiKeyHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyHeader")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl BuildStrategy for ApiKeyHeader {
    fn build<Request>(
        &self,
        _: Request,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Request, SocketError>
    where
        Request: RestRequest,
    {
        let builder = match &self.api_key {
            Some(api_key) => builder.header(HEADER_API_KEY, api_key),
            None => builder,
        };

        builder.build().map_err(SocketError::from)
    }
}

/// Type alias for the direct (non-keyed) rate limiter used by the Binance REST client.
///
/// Uses an in-memory state with the default clock and no middleware.
type BinanceRateLimiter = governor::RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
    governor::middleware::NoOpMiddleware,
>;

/// Generic REST kline client for Binance exchange variants.
///
/// The `Server` type parameter determines which Binance server variant (spot or futures) this
/// client connects to, via the [`RestExchangeServer`] trait.
///
/// Every request waits on a rate limiter (see [`RestConfig::requests_per_minute`]) and
/// retriable failures are retried according to [`RestConfig::retry`].
pub struct BinanceRestClient<Server> {
    pub client: Arc<RestClient<'static, ApiKeyHeader, BinanceHttpParser>>,
    pub rate_limiter: Arc<BinanceRateLimiter>,
    pub retry: RetryPolicy,
    _server: PhantomData<Server>,
}

impl<Server> Clone for BinanceRestClient<Server> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            rate_limiter: Arc::clone(&self.rate_limiter),
            retry: self.retry.clone(),
            _server: PhantomData,
        }
    }
}

impl<Server> fmt::Debug for BinanceRestClient<Server> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinanceRestClient")
            .field("client", &self.client)
            .field("rate_limiter", &"BinanceRateLimiter { .. }")
            .field("retry", &self.retry)
            .finish()
    }
}

impl<Server> BinanceRestClient<Server>
where
    Server: RestExchangeServer,
{
    /// Construct a new [`BinanceRestClient`] from the provided [`RestConfig`].
    ///
    /// A `None` [`RestConfig::base_url`] uses
    /// [`Server::rest_base_url()`](RestExchangeServer::rest_base_url).
    pub fn new(config: RestConfig) -> Self {
        let RestConfig {
            base_url,
            credentials,
            requests_per_minute,
            retry,
        } = config;

        if credentials.is_placeholder() {
            warn!(
                exchange = %Server::ID,
                "no API credentials configured, requests are sent without an API key"
            );
        }

        let base_url = base_url.unwrap_or_else(|| Server::rest_base_url().to_owned());
        let client = RestClient::new(
            base_url,
            ApiKeyHeader::from(&credentials),
            BinanceHttpParser,
        );

        let rate_limiter = governor::RateLimiter::direct(Quota::per_minute(requests_per_minute));

        Self {
            client: Arc::new(client),
            rate_limiter: Arc::new(rate_limiter),
            retry,
            _server: PhantomData,
        }
    }

    /// Construct a [`BinanceRestClient`] with default configuration and a custom base URL.
    ///
    /// Useful for testing with a mock server where the URL is not known at compile time.
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self::new(RestConfig::default().base_url(base_url))
    }
}

impl<Server> Default for BinanceRestClient<Server>
where
    Server: RestExchangeServer,
{
    fn default() -> Self {
        Self::new(RestConfig::default())
    }
}

impl<Server> BinanceRestClient<Server> {
    /// Wait until the rate limiter permits the next request.
    pub async fn wait_for_rate_limit(&self) {
        debug!("waiting for rate limit permit");
        self.rate_limiter.until_ready().await;
    }
}

impl<Server> KlineFetcher for BinanceRestClient<Server>
where
    Server: RestExchangeServer,
{
    fn supported_intervals() -> &'static [Interval] {
        &Interval::ALL
    }

    /// Fetch a single batch of klines from the Binance REST API.
    ///
    /// Builds a [`GetKlines`](klines::GetKlines) request from the provided [`KlineRequest`],
    /// waits for the rate limiter, executes the request with exponential-backoff retry, and
    /// converts raw DTOs into [`Candle`]s.
    fn fetch_klines(
        &self,
        request: KlineRequest,
    ) -> impl std::future::Future<Output = Result<Vec<Candle>, DataError>> + Send {
        let this = self.clone();
        let span = tracing::info_span!(
            "fetch_klines",
            exchange = %Server::ID,
            market = %request.market,
            interval = %request.interval,
        );
        async move {
            let get_klines = klines::GetKlines {
                path: Server::klines_path(),
                params: klines::GetKlinesParams {
                    symbol: request.market,
                    interval: request.interval.as_str(),
                    start_time: request.start.map(|start| start.timestamp_millis()),
                    end_time: request.end.map(|end| end.timestamp_millis()),
                    limit: request.limit,
                },
            };
            debug!(params = ?get_klines.params, "built klines request");

            let raw_klines = this
                .retry
                .execute(is_retriable_data_error, || {
                    let this = this.clone();
                    let request = get_klines.clone();
                    async move {
                        this.wait_for_rate_limit().await;
                        this.client
                            .execute(request)
                            .await
                            .map(|(response, _metric)| response)
                    }
                })
                .await
                .inspect_err(|error| warn!(%error, "klines fetch failed"))?;

            let candles = raw_klines
                .into_iter()
                .map(Candle::try_from)
                .collect::<Result<Vec<_>, _>>()?;

            debug!(count = candles.len(), "fetched klines batch");

            Ok(candles)
        }
        .instrument(span)
    }
}
