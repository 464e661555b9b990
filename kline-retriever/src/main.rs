//! Retrieve historical klines for a single pair and window, writing them to a `;` delimited file.
//!
//! Usage:
//!   kline-retriever --pair BTCUSDT --start "2020-10-20 00:00" --end "2020-10-20 08:00" \
//!     --timeframe 1m --limit 1500 --market futures

use clap::Parser;
use kline_data::{
    config::{Credentials, RestConfig},
    error::DataError,
    exchange::binance::{
        futures::BinanceFuturesUsdRestClient, rest::BinanceRestClient,
        spot::BinanceSpotRestClient,
    },
    fetcher::{CandlestickFetcher, RetrievalResult},
    output::{CsvWriter, DATA_DIR, DateStyle},
    rest::KlineFetcher,
    window::{ResolvedWindow, RetrievalRequest, WindowResolver},
};
use kline_instrument::exchange::ExchangeId;
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info, warn};

/// Exit status reported when the retrieval request itself is invalid.
const EXIT_INVALID_REQUEST: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "kline-retriever", version)]
#[command(about = "Retrieve historical Binance klines into a ';' delimited file")]
struct Args {
    /// Trading pair (e.g., BTCUSDT)
    #[arg(long, default_value = "BTCUSDT")]
    pair: String,

    /// Window start: a date-time (e.g., "2020-10-20 00:00") or a time-of-day today (e.g., "00:00")
    #[arg(long, default_value = "00:00")]
    start: String,

    /// Window end, same formats as --start. A future end is clamped to now
    #[arg(long, default_value = "08:00")]
    end: String,

    /// Candle timeframe (1m, 3m, 5m, 15m, 30m, 1h, 2h, 4h, 6h, 8h, 12h, 1d, 3d, 1w, 1M)
    #[arg(long, default_value = "1m")]
    timeframe: String,

    /// Maximum number of candles requested per chunk
    #[arg(long, default_value_t = 1500, allow_negative_numbers = true)]
    limit: i64,

    /// Binance market (futures, spot)
    #[arg(long, default_value = "futures")]
    market: ExchangeId,

    /// Directory the output file is written to
    #[arg(long, default_value = DATA_DIR)]
    data_dir: PathBuf,

    /// Write raw millisecond timestamps instead of ISO date-times
    #[arg(long)]
    raw_dates: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn request(&self) -> RetrievalRequest {
        RetrievalRequest::new(
            &self.pair,
            &self.start,
            &self.end,
            &self.timeframe,
            self.limit,
        )
    }

    fn writer(&self) -> CsvWriter {
        let date_style = if self.raw_dates {
            DateStyle::Raw
        } else {
            DateStyle::Iso
        };
        CsvWriter::new(&self.data_dir, date_style)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.json_logs);

    match run(&args).await {
        Ok(path) => {
            info!(path = %path.display(), "retrieval complete");
            ExitCode::SUCCESS
        }
        Err(error) if error.is_validation() => {
            error!(%error, "invalid retrieval request");
            ExitCode::from(EXIT_INVALID_REQUEST)
        }
        Err(error) => {
            error!(%error, "retrieval failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<PathBuf, DataError> {
    let resolved = cap_limit(WindowResolver.resolve(&args.request())?, args.market);

    info!(
        pair = %resolved.pair,
        interval = %resolved.interval,
        start = %resolved.start_label,
        end = %resolved.end_label,
        end_clamped = resolved.end_clamped,
        market = %args.market,
        "resolved retrieval window"
    );

    let config = RestConfig::with_credentials(Credentials::from_env());
    let result = match args.market {
        ExchangeId::BinanceFuturesUsd => {
            retrieve(BinanceFuturesUsdRestClient::new(config), &resolved).await?
        }
        ExchangeId::BinanceSpot => {
            retrieve(BinanceSpotRestClient::new(config), &resolved).await?
        }
    };

    args.writer().write(&result)
}

/// Cap the per-request limit at the market maximum, since Binance rejects larger requests.
fn cap_limit(mut resolved: ResolvedWindow, market: ExchangeId) -> ResolvedWindow {
    let max = market.max_klines_per_request();
    if resolved.limit > max {
        warn!(
            requested = resolved.limit,
            max,
            %market,
            "limit exceeds the exchange per-request maximum, using the maximum"
        );
        resolved.limit = max;
    }
    resolved
}

async fn retrieve<Server>(
    client: BinanceRestClient<Server>,
    resolved: &ResolvedWindow,
) -> Result<RetrievalResult, DataError>
where
    BinanceRestClient<Server>: KlineFetcher + Clone + Send + Sync,
{
    CandlestickFetcher::new(client).fetch_all(resolved).await
}

fn init_logging(json: bool) {
    let builder = tracing_subscriber::fmt()
        // Filter messages based on the INFO
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        // Disable colours on release builds
        .with_ansi(cfg!(debug_assertions));

    if json {
        builder.json().init()
    } else {
        builder.init()
    }
}
