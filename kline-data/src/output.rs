use crate::{
    candle::{CANDLE_FIELDS, FieldValue},
    error::DataError,
    fetcher::RetrievalResult,
};
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use std::{
    fs,
    io::Write,
    path::PathBuf,
};
use tracing::info;

/// Default directory that retrieval output is written to.
pub const DATA_DIR: &str = "./data";

/// Field delimiter of written files.
pub const DELIMITER: u8 = b';';

/// Characters that are illegal in a file name on at least one supported platform.
const ILLEGAL_FILE_NAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// How [`FieldKind::Timestamp`](crate::candle::FieldKind::Timestamp) fields are rendered.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum DateStyle {
    /// Exchange native millisecond integers.
    Raw,
    /// Human-readable local wall clock date-time (eg/ `2020-10-20T08:00:59.999`).
    #[default]
    Iso,
}

/// Writes a [`RetrievalResult`] as a `;` delimited file with one header row followed by one row
/// per candle, columns ordered by [`CANDLE_FIELDS`].
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct CsvWriter {
    pub data_dir: PathBuf,
    pub date_style: DateStyle,
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new(DATA_DIR, DateStyle::default())
    }
}

impl CsvWriter {
    pub fn new<P: Into<PathBuf>>(data_dir: P, date_style: DateStyle) -> Self {
        Self {
            data_dir: data_dir.into(),
            date_style,
        }
    }

    /// Deterministic file name `{pair}_{start}_{end}_{limit}_{timeframe}.csv` derived from the
    /// resolved (possibly clamped) window.
    pub fn file_name(result: &RetrievalResult) -> String {
        let resolved = &result.resolved;
        let stem = format!(
            "{}_{}_{}_{}_{}",
            resolved.pair,
            format_label(&resolved.start_label),
            format_label(&resolved.end_label),
            resolved.limit,
            resolved.interval,
        );

        format!("{}.csv", sanitise_file_name(&stem))
    }

    /// Full path the [`RetrievalResult`] is written to.
    pub fn path(&self, result: &RetrievalResult) -> PathBuf {
        self.data_dir.join(Self::file_name(result))
    }

    /// Write the [`RetrievalResult`] into the data directory, creating it if required.
    ///
    /// Returns the path of the written file.
    pub fn write(&self, result: &RetrievalResult) -> Result<PathBuf, DataError> {
        fs::create_dir_all(&self.data_dir)?;

        let path = self.path(result);
        let file = fs::File::create(&path)?;
        self.write_to(result, file)?;

        info!(
            path = %path.display(),
            candles = result.batch.len(),
            "wrote retrieval result"
        );

        Ok(path)
    }

    /// Write the [`RetrievalResult`] to the provided sink.
    pub fn write_to<W: Write>(&self, result: &RetrievalResult, sink: W) -> Result<(), DataError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .terminator(terminator())
            .from_writer(sink);

        writer.write_record(CANDLE_FIELDS.iter().map(|field| field.name))?;

        for candle in &result.batch {
            writer.write_record(CANDLE_FIELDS.iter().map(|field| {
                candle
                    .value(field)
                    .map(|value| self.format_value(value))
                    .unwrap_or_default()
            }))?;
        }

        writer.flush()?;
        Ok(())
    }

    fn format_value(&self, value: FieldValue) -> String {
        match value {
            FieldValue::Timestamp(timestamp) => self.format_timestamp(timestamp),
            FieldValue::Decimal(decimal) => decimal.to_string(),
            FieldValue::Count(count) => count.to_string(),
        }
    }

    fn format_timestamp(&self, timestamp: DateTime<Utc>) -> String {
        match self.date_style {
            DateStyle::Raw => timestamp.timestamp_millis().to_string(),
            DateStyle::Iso => format_label(&timestamp.with_timezone(&Local).naive_local()),
        }
    }
}

fn format_label(label: &NaiveDateTime) -> String {
    label.format(DATE_TIME_FORMAT).to_string()
}

/// Replace every character that is illegal in a file name with `_`.
pub fn sanitise_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if ILLEGAL_FILE_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

fn terminator() -> csv::Terminator {
    if cfg!(windows) {
        csv::Terminator::CRLF
    } else {
        csv::Terminator::Any(b'\n')
    }
}
