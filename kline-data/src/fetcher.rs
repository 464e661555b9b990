use crate::{
    candle::{Candle, Interval},
    error::{DataError, ValidationError},
    rest::{KlineFetcher, KlineRequest},
    window::ResolvedWindow,
};
use chrono::{DateTime, Utc};
use futures::{Stream, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, info, warn};

/// Complete, deduplicated and chronologically ordered candle sequence for a [`ResolvedWindow`],
/// together with the provenance needed to name and label the output.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct RetrievalResult {
    pub batch: Vec<Candle>,
    pub resolved: ResolvedWindow,
}

/// Retrieves the full candle sequence spanning a [`ResolvedWindow`] by chaining bounded
/// [`KlineFetcher`] requests keyed on the last seen `open_time`.
///
/// Chunks are fetched strictly one after another. Failures are never retried here; that is the
/// responsibility of the [`KlineFetcher`] collaborator.
#[derive(Clone, Debug)]
pub struct CandlestickFetcher<Fetcher> {
    client: Fetcher,
}

impl<Fetcher> CandlestickFetcher<Fetcher>
where
    Fetcher: KlineFetcher + Clone + Send + Sync,
{
    pub fn new(client: Fetcher) -> Self {
        Self { client }
    }

    /// Lazily paginate the [`ResolvedWindow`], yielding only the newly appended candles of each
    /// chunk.
    ///
    /// The stream ends when the window is covered, a chunk holds one candle or fewer, or a chunk
    /// fails to advance the cursor. A failed fetch is yielded once as
    /// [`DataError::RetrievalFailed`] and ends the stream.
    pub fn stream_chunks(
        &self,
        resolved: &ResolvedWindow,
    ) -> impl Stream<Item = Result<Vec<Candle>, DataError>> + Send {
        let state = PaginationState {
            client: self.client.clone(),
            market: resolved.pair.to_string(),
            interval: resolved.interval,
            limit: resolved.limit,
            start: resolved.window.start,
            end: resolved.window.end,
            cursor: None,
            chunk: 0,
            done: false,
        };

        stream::unfold(state, |mut state| async move {
            let item = state.next_chunk().await?;
            Some((item, state))
        })
    }

    /// Fetch every candle in the [`ResolvedWindow`].
    ///
    /// An interval the collaborator does not serve is rejected before any request is sent. A
    /// fetch error at any chunk discards everything accumulated so far.
    pub async fn fetch_all(&self, resolved: &ResolvedWindow) -> Result<RetrievalResult, DataError> {
        let span = tracing::info_span!(
            "fetch_all",
            pair = %resolved.pair,
            interval = %resolved.interval,
            start = %resolved.start_label,
            end = %resolved.end_label,
        );

        async move {
            if !Fetcher::supported_intervals().contains(&resolved.interval) {
                warn!("interval is not served by the kline collaborator");
                return Err(DataError::from(ValidationError::UnsupportedTimeframe(
                    resolved.interval.to_string(),
                )));
            }

            info!(limit = resolved.limit, "starting candle retrieval");

            let batch = self
                .stream_chunks(resolved)
                .try_concat()
                .await
                .inspect_err(|error| warn!(%error, "candle retrieval failed"))?;

            info!(candles = batch.len(), "candle retrieval complete");

            Ok(RetrievalResult {
                batch,
                resolved: resolved.clone(),
            })
        }
        .instrument(span)
        .await
    }
}

/// Cursor state threaded through [`CandlestickFetcher::stream_chunks`].
struct PaginationState<Fetcher> {
    client: Fetcher,
    market: String,
    interval: Interval,
    limit: u32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    /// `open_time` of the last candle seen, `None` before the first chunk.
    cursor: Option<DateTime<Utc>>,
    /// 1-based index of the most recently requested chunk.
    chunk: usize,
    done: bool,
}

impl<Fetcher> PaginationState<Fetcher>
where
    Fetcher: KlineFetcher,
{
    fn request(&self, from: DateTime<Utc>) -> KlineRequest {
        KlineRequest {
            market: self.market.clone(),
            interval: self.interval,
            start: Some(from),
            end: Some(self.end),
            limit: Some(self.limit),
        }
    }

    async fn next_chunk(&mut self) -> Option<Result<Vec<Candle>, DataError>> {
        if self.done {
            return None;
        }

        let from = match self.cursor {
            None => self.start,
            Some(cursor) if cursor >= self.end => {
                debug!(%cursor, end = %self.end, "window fully covered");
                return None;
            }
            Some(cursor) => cursor,
        };

        self.chunk += 1;
        let chunk = self.chunk;

        let batch = match self.client.fetch_klines(self.request(from)).await {
            Ok(batch) => batch,
            Err(error) => {
                self.done = true;
                return Some(Err(DataError::retrieval_failed(chunk, error)));
            }
        };

        let Some(last) = batch.last().map(|candle| candle.open_time) else {
            debug!(chunk, "empty chunk, window exhausted");
            self.done = true;
            return None;
        };

        if batch.len() <= 1 {
            debug!(chunk, "chunk holds one candle or fewer, window exhausted");
            self.done = true;
        }

        let fetched = batch.len();
        let appended = match self.cursor {
            None => batch,
            Some(cursor) => {
                if last <= cursor {
                    warn!(chunk, %cursor, "chunk did not advance past the cursor, stopping");
                    self.done = true;
                }
                batch
                    .into_iter()
                    .filter(|candle| candle.open_time > cursor)
                    .collect()
            }
        };

        self.cursor = Some(last);

        debug!(
            chunk,
            fetched,
            appended = appended.len(),
            cursor = %last,
            "advancing candle pagination"
        );

        if appended.is_empty() {
            None
        } else {
            Some(Ok(appended))
        }
    }
}
