use crate::{candle::Interval, error::ValidationError};
use chrono::{
    DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, TimeZone, Utc,
    format::{Parsed, StrftimeItems},
};
use kline_instrument::pair::Pair;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Full date-time boundary formats accepted in addition to RFC 3339.
const DATE_TIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H",
    "%Y-%m-%d %H",
];

/// Bare calendar date boundary, meaning 00:00 of that day.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time-of-day boundary formats, combined with the current calendar date.
const TIME_FORMATS: [&str; 3] = ["%H:%M:%S%.f", "%H:%M", "%H"];

/// Optional `±HH:MM` suffix of date-time and time-of-day boundaries. Without it a boundary is a
/// wall clock time in the resolver's zone.
const OFFSET_FORMAT: &str = "%:z";

/// Trailing specifier of formats that omit the minute, which then defaults to zero.
const HOUR_ONLY_SUFFIX: &str = "%H";

/// Number of sub-second digits kept, matching the exchange native millisecond timestamps.
const MILLISECOND_DIGITS: u16 = 3;

/// Raw, unvalidated kline retrieval request as supplied by the driver.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct RetrievalRequest {
    pub pair: String,
    pub start: String,
    pub end: String,
    pub timeframe: String,
    pub limit: i64,
}

impl RetrievalRequest {
    pub fn new<P, S, E, T>(pair: P, start: S, end: E, timeframe: T, limit: i64) -> Self
    where
        P: Into<String>,
        S: Into<String>,
        E: Into<String>,
        T: Into<String>,
    {
        Self {
            pair: pair.into(),
            start: start.into(),
            end: end.into(),
            timeframe: timeframe.into(),
            limit,
        }
    }
}

/// Resolved `[start, end]` retrieval window in absolute instants.
///
/// Invariant: `start <= end <= now` at resolution time, both with millisecond resolution.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// `start` in exchange native milliseconds.
    pub fn start_millis(&self) -> i64 {
        self.start.timestamp_millis()
    }

    /// `end` in exchange native milliseconds.
    pub fn end_millis(&self) -> i64 {
        self.end.timestamp_millis()
    }
}

/// Validated request: the [`TimeWindow`] to fetch plus everything needed to label the output.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct ResolvedWindow {
    pub pair: Pair,
    pub interval: Interval,
    pub limit: u32,
    pub window: TimeWindow,
    /// Wall clock start date-time in the resolver's zone, used purely for labelling.
    pub start_label: NaiveDateTime,
    /// Wall clock end date-time in the resolver's zone, after any clamping to "now".
    pub end_label: NaiveDateTime,
    /// True if the requested end was in the future and has been clamped to "now".
    pub end_clamped: bool,
}

/// Parses and validates [`RetrievalRequest`] boundaries into a [`ResolvedWindow`].
///
/// Boundaries are either both full date-times, or both bare times-of-day that are combined with
/// the current calendar date. Naive boundaries are interpreted in the time zone of the supplied
/// "now" (local time for [`WindowResolver::resolve`]).
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct WindowResolver;

impl WindowResolver {
    /// Resolve the [`RetrievalRequest`] against the local wall clock.
    pub fn resolve(&self, request: &RetrievalRequest) -> Result<ResolvedWindow, ValidationError> {
        self.resolve_at(request, Local::now())
    }

    /// Resolve the [`RetrievalRequest`] against the provided "now".
    ///
    /// Identical inputs resolved at the same instant always yield identical output.
    pub fn resolve_at<Tz>(
        &self,
        request: &RetrievalRequest,
        now: DateTime<Tz>,
    ) -> Result<ResolvedWindow, ValidationError>
    where
        Tz: TimeZone,
    {
        let pair = Pair::new(&request.pair).map_err(|_| ValidationError::EmptyPair)?;
        let interval = request.timeframe.parse::<Interval>()?;
        let limit = validate_limit(request.limit)?;

        let now = now.trunc_subsecs(MILLISECOND_DIGITS);
        let (start, end) = parse_boundaries(&request.start, &request.end, &now)?;

        if start > end {
            return Err(ValidationError::InvertedWindow {
                start: start.naive_local().to_string(),
                end: end.naive_local().to_string(),
            });
        }

        if start > now {
            return Err(ValidationError::FutureStart {
                start: start.naive_local().to_string(),
                now: now.naive_local().to_string(),
            });
        }

        let end_clamped = end > now;
        let end = if end_clamped {
            info!(
                requested_end = %end.naive_local(),
                now = %now.naive_local(),
                "end boundary is in the future, clamping to now"
            );
            now
        } else {
            end
        };

        Ok(ResolvedWindow {
            pair,
            interval,
            limit,
            window: TimeWindow {
                start: start.with_timezone(&Utc),
                end: end.with_timezone(&Utc),
            },
            start_label: start.naive_local(),
            end_label: end.naive_local(),
            end_clamped,
        })
    }
}

fn validate_limit(limit: i64) -> Result<u32, ValidationError> {
    u32::try_from(limit)
        .ok()
        .filter(|limit| *limit > 0)
        .ok_or(ValidationError::InvalidLimit(limit))
}

/// Parse both boundaries as full date-times, falling back to times-of-day on today's date.
fn parse_boundaries<Tz>(
    start: &str,
    end: &str,
    now: &DateTime<Tz>,
) -> Result<(DateTime<Tz>, DateTime<Tz>), ValidationError>
where
    Tz: TimeZone,
{
    let tz = now.timezone();

    if let (Some(start), Some(end)) = (parse_date_time(start, &tz), parse_date_time(end, &tz)) {
        return Ok((start, end));
    }

    debug!(start, end, "boundaries are not both date-times, trying times-of-day");

    let today = now.date_naive();
    let combine = |raw: &str| parse_time_on(raw, today, &tz);

    match (combine(start), combine(end)) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(ValidationError::MalformedBoundary {
            start: start.to_string(),
            end: end.to_string(),
        }),
    }
}

fn parse_date_time<Tz>(raw: &str, tz: &Tz) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
{
    if let Ok(date_time) = DateTime::parse_from_rfc3339(raw) {
        return Some(date_time.with_timezone(tz).trunc_subsecs(MILLISECOND_DIGITS));
    }

    if let Some(parsed) = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| parse_fields(raw, format))
    {
        let naive = parsed
            .to_naive_date()
            .ok()?
            .and_time(parsed.to_naive_time().ok()?);
        return at_parsed_offset(naive, &parsed, tz);
    }

    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .and_then(|date| localise(date.and_time(NaiveTime::MIN), tz))
}

fn parse_time_on<Tz>(raw: &str, date: NaiveDate, tz: &Tz) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
{
    let parsed = TIME_FORMATS
        .iter()
        .find_map(|format| parse_fields(raw, format))?;

    at_parsed_offset(date.and_time(parsed.to_naive_time().ok()?), &parsed, tz)
}

/// Parse `raw` against `format`, with or without a trailing [`OFFSET_FORMAT`].
fn parse_fields(raw: &str, format: &str) -> Option<Parsed> {
    [format.to_string(), format!("{format}{OFFSET_FORMAT}")]
        .iter()
        .find_map(|candidate| {
            let mut parsed = Parsed::new();
            chrono::format::parse(&mut parsed, raw, StrftimeItems::new(candidate)).ok()?;
            if format.ends_with(HOUR_ONLY_SUFFIX) {
                parsed.set_minute(0).ok()?;
            }
            Some(parsed)
        })
}

/// Interpret the wall clock date-time at the offset it was written with, if any, otherwise in
/// the provided zone.
fn at_parsed_offset<Tz>(naive: NaiveDateTime, parsed: &Parsed, tz: &Tz) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
{
    match parsed.to_fixed_offset() {
        Ok(offset) => localise(naive, &offset).map(|date_time| date_time.with_timezone(tz)),
        Err(_) => localise(naive, tz),
    }
}

/// Interpret a naive wall clock date-time in the provided zone.
///
/// Wall clock times skipped by a DST transition do not exist and yield `None`. Ambiguous ones
/// take the earliest instant.
fn localise<Tz>(naive: NaiveDateTime, tz: &Tz) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
{
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|date_time| date_time.trunc_subsecs(MILLISECOND_DIGITS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 10, 20, 12, 0, 0).unwrap()
    }

    fn request(start: &str, end: &str) -> RetrievalRequest {
        RetrievalRequest::new("BTCUSDT", start, end, "1m", 10)
    }

    fn naive(date_time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(date_time, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_resolve_correct_dates() {
        let resolved = WindowResolver
            .resolve_at(&request("2020-09-11", "2020-10-11"), now())
            .unwrap();

        assert_eq!(resolved.pair.as_str(), "BTCUSDT");
        assert_eq!(resolved.interval, Interval::M1);
        assert_eq!(resolved.limit, 10);
        assert_eq!(resolved.window.start_millis(), 1599782400000);
        assert_eq!(resolved.window.end_millis(), 1602374400000);
        assert_eq!(resolved.start_label, naive("2020-09-11 00:00:00"));
        assert_eq!(resolved.end_label, naive("2020-10-11 00:00:00"));
        assert!(!resolved.end_clamped);
    }

    #[test]
    fn test_resolve_full_date_time_formats() {
        let cases = [
            ("2020-09-11T10:15:30", "2020-09-11 10:15:30"),
            ("2020-09-11 10:15:30", "2020-09-11 10:15:30"),
            ("2020-09-11T10:15", "2020-09-11 10:15:00"),
            ("2020-09-11 10:15", "2020-09-11 10:15:00"),
            ("2020-09-11T12:15:30+02:00", "2020-09-11 10:15:30"),
            ("2020-09-11T10", "2020-09-11 10:00:00"),
            ("2020-09-11 10", "2020-09-11 10:00:00"),
            ("2020-09-11T10:15+02:00", "2020-09-11 08:15:00"),
            ("2020-09-11 10:15+02:00", "2020-09-11 08:15:00"),
            ("2020-09-11T10+02:00", "2020-09-11 08:00:00"),
            ("2020-09-11 10:15:30.5-01:30", "2020-09-11 11:45:30"),
        ];

        for (raw, expected) in cases {
            let resolved = WindowResolver
                .resolve_at(&request(raw, "2020-10-11"), now())
                .unwrap_or_else(|error| panic!("{raw:?} failed: {error}"));
            assert_eq!(
                resolved.start_label.trunc_subsecs(0),
                naive(expected),
                "input {raw:?}"
            );
        }
    }

    #[test]
    fn test_resolve_hour_only_date_times() {
        let resolved = WindowResolver
            .resolve_at(&request("2020-09-11T10", "2020-09-11T11"), now())
            .unwrap();

        assert_eq!(resolved.start_label, naive("2020-09-11 10:00:00"));
        assert_eq!(resolved.end_label, naive("2020-09-11 11:00:00"));
        assert_eq!(
            resolved.window.end - resolved.window.start,
            chrono::TimeDelta::hours(1)
        );
    }

    #[test]
    fn test_resolve_bare_times_use_current_date() {
        let resolved = WindowResolver
            .resolve_at(&request("01:00", "02:00"), now())
            .unwrap();

        assert_eq!(resolved.start_label, naive("2020-10-20 01:00:00"));
        assert_eq!(resolved.end_label, naive("2020-10-20 02:00:00"));
        assert_eq!(
            resolved.window.end - resolved.window.start,
            chrono::TimeDelta::hours(1)
        );
    }

    #[test]
    fn test_resolve_bare_time_formats() {
        struct TestCase {
            start: &'static str,
            end: &'static str,
            expected_start: &'static str,
            expected_end: &'static str,
        }

        let tests = vec![
            TestCase {
                // TC0: hour only
                start: "01",
                end: "02",
                expected_start: "2020-10-20 01:00:00",
                expected_end: "2020-10-20 02:00:00",
            },
            TestCase {
                // TC1: explicit UTC offset
                start: "01:00+00:00",
                end: "02:00+00:00",
                expected_start: "2020-10-20 01:00:00",
                expected_end: "2020-10-20 02:00:00",
            },
            TestCase {
                // TC2: offset converted into the resolver's zone
                start: "03:30+02:00",
                end: "09:45:10-01:00",
                expected_start: "2020-10-20 01:30:00",
                expected_end: "2020-10-20 10:45:10",
            },
            TestCase {
                // TC3: hour only with offset, mixed with a naive time
                start: "05+03:00",
                end: "04:00",
                expected_start: "2020-10-20 02:00:00",
                expected_end: "2020-10-20 04:00:00",
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let resolved = WindowResolver
                .resolve_at(&request(test.start, test.end), now())
                .unwrap_or_else(|error| panic!("TC{index} failed: {error}"));

            assert_eq!(resolved.start_label, naive(test.expected_start), "TC{index} failed");
            assert_eq!(resolved.end_label, naive(test.expected_end), "TC{index} failed");
        }
    }

    #[test]
    fn test_resolve_bare_times_use_current_date_of_zone() {
        // 2020-10-20T00:30+02:00 is still 2020-10-19 in UTC
        let now = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2020, 10, 20, 0, 30, 0)
            .unwrap();

        let resolved = WindowResolver
            .resolve_at(&request("00:00", "00:15:30.250"), now)
            .unwrap();

        assert_eq!(resolved.start_label, naive("2020-10-20 00:00:00"));
        assert_eq!(
            resolved.window.start,
            Utc.with_ymd_and_hms(2020, 10, 19, 22, 0, 0).unwrap()
        );
        assert_eq!(
            resolved.window.end_millis() - resolved.window.start_millis(),
            (15 * 60 + 30) * 1000 + 250
        );
    }

    #[test]
    fn test_resolve_daylight_saving_transitions() {
        use chrono_tz::Europe::Berlin;

        let now = Berlin.with_ymd_and_hms(2020, 11, 1, 12, 0, 0).unwrap();

        // 2020-03-29 02:00 to 03:00 does not exist in Berlin
        assert_eq!(
            WindowResolver.resolve_at(&request("2020-03-29 02:30", "2020-03-29 04:00"), now),
            Err(ValidationError::MalformedBoundary {
                start: "2020-03-29 02:30".to_string(),
                end: "2020-03-29 04:00".to_string(),
            })
        );

        // 2020-10-25 02:00 to 03:00 occurs twice, first at +02:00 then at +01:00
        let resolved = WindowResolver
            .resolve_at(&request("2020-10-25 02:30", "2020-10-25 04:00"), now)
            .unwrap();
        assert_eq!(
            resolved.window.start,
            Utc.with_ymd_and_hms(2020, 10, 25, 0, 30, 0).unwrap()
        );
        assert_eq!(resolved.start_label, naive("2020-10-25 02:30:00"));

        // An explicit offset picks the later occurrence
        let resolved = WindowResolver
            .resolve_at(&request("2020-10-25T02:30+01:00", "2020-10-25 04:00"), now)
            .unwrap();
        assert_eq!(
            resolved.window.start,
            Utc.with_ymd_and_hms(2020, 10, 25, 1, 30, 0).unwrap()
        );
        assert_eq!(resolved.start_label, naive("2020-10-25 02:30:00"));
    }

    #[test]
    fn test_resolve_rejects_empty_pair() {
        let request = RetrievalRequest::new("", "2020-09-11", "2020-10-11", "1m", 10);
        assert_eq!(
            WindowResolver.resolve_at(&request, now()),
            Err(ValidationError::EmptyPair)
        );
    }

    #[test]
    fn test_resolve_rejects_unknown_timeframe() {
        let request = RetrievalRequest::new("BTCUSDT", "2020-09-11", "2020-10-11", "bad", 10);
        assert_eq!(
            WindowResolver.resolve_at(&request, now()),
            Err(ValidationError::UnknownTimeframe("bad".to_string()))
        );
    }

    #[test]
    fn test_resolve_rejects_non_positive_limit() {
        for limit in [0, -10, i64::from(u32::MAX) + 1] {
            let request = RetrievalRequest::new("BTCUSDT", "2020-09-11", "2020-10-11", "1m", limit);
            assert_eq!(
                WindowResolver.resolve_at(&request, now()),
                Err(ValidationError::InvalidLimit(limit))
            );
        }
    }

    #[test]
    fn test_resolve_rejects_malformed_boundaries() {
        for (start, end) in [
            ("bad", "worst"),
            ("2020-09-11", "worst"),
            ("2020-09-11", "02:00"),
            ("25:00", "26:00"),
            ("2020-13-01", "2020-13-02"),
            ("", ""),
        ] {
            assert_eq!(
                WindowResolver.resolve_at(&request(start, end), now()),
                Err(ValidationError::MalformedBoundary {
                    start: start.to_string(),
                    end: end.to_string(),
                }),
                "{start:?} -> {end:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_resolve_rejects_inverted_dates() {
        assert_eq!(
            WindowResolver.resolve_at(&request("2020-09-11", "2020-01-11"), now()),
            Err(ValidationError::InvertedWindow {
                start: "2020-09-11 00:00:00".to_string(),
                end: "2020-01-11 00:00:00".to_string(),
            })
        );
    }

    #[test]
    fn test_resolve_rejects_inverted_bare_times() {
        let result = WindowResolver.resolve_at(&request("02:00", "01:00"), now());
        assert!(matches!(result, Err(ValidationError::InvertedWindow { .. })));
    }

    #[test]
    fn test_resolve_rejects_future_start() {
        let result = WindowResolver.resolve_at(&request("2020-10-21", "2020-10-22"), now());
        assert_eq!(
            result,
            Err(ValidationError::FutureStart {
                start: "2020-10-21 00:00:00".to_string(),
                now: "2020-10-20 12:00:00".to_string(),
            })
        );

        let result = WindowResolver.resolve_at(&request("13:00", "14:00"), now());
        assert!(matches!(result, Err(ValidationError::FutureStart { .. })));
    }

    #[test]
    fn test_resolve_clamps_future_end_to_now() {
        let resolved = WindowResolver
            .resolve_at(&request("2020-10-20T00:00", "2020-10-25"), now())
            .unwrap();

        assert!(resolved.end_clamped);
        assert_eq!(resolved.window.end, now());
        assert_eq!(resolved.end_label, naive("2020-10-20 12:00:00"));
    }

    #[test]
    fn test_resolve_start_equals_end() {
        let resolved = WindowResolver
            .resolve_at(&request("2020-09-11T10:00", "2020-09-11T10:00"), now())
            .unwrap();
        assert_eq!(resolved.window.start, resolved.window.end);
    }

    #[test]
    fn test_resolve_truncates_now_to_milliseconds() {
        let precise_now = now() + chrono::TimeDelta::nanoseconds(123_456_789);

        let resolved = WindowResolver
            .resolve_at(&request("2020-10-20", "2020-10-21"), precise_now)
            .unwrap();

        assert!(resolved.end_clamped);
        assert_eq!(resolved.window.end.timestamp_subsec_nanos(), 123_000_000);
        assert_eq!(resolved.window.end_millis(), now().timestamp_millis() + 123);
    }

    #[test]
    fn test_resolve_is_idempotent_at_the_same_instant() {
        let request = request("2020-10-19T01:00", "2020-10-25");

        let first = WindowResolver.resolve_at(&request, now()).unwrap();
        let second = WindowResolver.resolve_at(&request, now()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolved_window_is_never_after_now() {
        let cases = [
            ("2020-01-01", "2020-12-31"),
            ("2020-10-20T11:59", "2020-10-20T12:00"),
            ("00:00", "23:59"),
            ("11:00:00.999", "11:00:00.999"),
            ("2019-05-05 05:05", "2030-01-01 00:00"),
        ];

        for (start, end) in cases {
            let resolved = WindowResolver
                .resolve_at(&request(start, end), now())
                .unwrap_or_else(|error| panic!("{start:?} -> {end:?} failed: {error}"));
            assert!(resolved.window.start <= resolved.window.end);
            assert!(resolved.window.end <= now());
        }
    }
}
