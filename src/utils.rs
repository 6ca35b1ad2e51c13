use std::{fs::File, io::Read, path::Path};

use chrono::{DateTime, FixedOffset};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, warn};

use crate::{
    engine::{Bar, BarBuilder},
    errors::{Error, Result},
};

/// Parses `2025-11-19T09:15:00+05:30` (RFC 3339) or `2025-11-19 09:15:00+05:30`.
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%:z"))
        .map_err(|_| Error::InvalidTimestamp(value.to_owned()))
}

/// Column positions resolved from the header row.
struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
    open_interest: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        let require = |name: &'static str| find(name).ok_or(Error::MissingField(name));

        Ok(Self {
            timestamp: require("timestamp")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: find("volume"),
            open_interest: find("oi").or_else(|| find("open_interest")),
        })
    }

    fn bar(&self, record: &StringRecord) -> Result<Bar> {
        let price = |column: usize, name: &'static str| -> Result<f64> {
            let field = record.get(column).map(str::trim).unwrap_or_default();
            if field.is_empty() {
                return Err(Error::MissingField(name));
            }
            field
                .parse()
                .map_err(|_| Error::Msg(format!("{name} is not a number: {field}")))
        };
        let optional = |column: Option<usize>| -> f64 {
            column
                .and_then(|c| record.get(c))
                .and_then(|field| field.trim().parse().ok())
                .unwrap_or_default()
        };

        let timestamp = record
            .get(self.timestamp)
            .filter(|field| !field.trim().is_empty())
            .ok_or(Error::MissingField("timestamp"))?;

        BarBuilder::builder()
            .timestamp(parse_timestamp(timestamp)?)
            .open(price(self.open, "open")?)
            .high(price(self.high, "high")?)
            .low(price(self.low, "low")?)
            .close(price(self.close, "close")?)
            .volume(optional(self.volume))
            .open_interest(optional(self.open_interest))
            .build()
    }
}

/// Reads bars from CSV data with a `timestamp,open,high,low,close[,volume][,oi]` header.
///
/// Header names are matched case-insensitively and in any order. Rows that cannot form a
/// valid bar are skipped with a warning. Files written newest-first are reversed so the
/// result is always in ascending order.
///
/// ### Errors
/// * [`Error::MissingField`] if a required column is absent from the header.
/// * [`Error::BarDataEmpty`] if no row forms a valid bar.
pub fn bars_from_csv<R: Read>(reader: R) -> Result<Vec<Bar>> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).flexible(true).from_reader(reader);
    let columns = Columns::from_headers(csv_reader.headers()?)?;

    let mut bars = Vec::new();
    let mut skipped = 0usize;
    for (line, record) in csv_reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        match columns.bar(&record) {
            Ok(bar) => bars.push(bar),
            Err(error) => {
                skipped += 1;
                warn!(row = line + 1, %error, "row skipped");
            }
        }
    }

    if bars.is_empty() {
        return Err(Error::BarDataEmpty);
    }

    if let (Some(first), Some(last)) = (bars.first(), bars.last())
        && first.timestamp() > last.timestamp()
    {
        bars.reverse();
    }

    debug!(bars = bars.len(), skipped, "bars loaded");
    Ok(bars)
}

/// Reads bars from the CSV file at `path`. See [`bars_from_csv`].
pub fn get_bars_from_file(path: impl AsRef<Path>) -> Result<Vec<Bar>> {
    let file = File::open(path)?;
    bars_from_csv(file)
}

/// Reads bars from a JSON array of `{timestamp, open, high, low, close[, volume][, oi]}`
/// objects.
///
/// Each element goes through [`BarBuilder`]; elements that do not form a valid bar are
/// skipped with a warning, like rows of [`bars_from_csv`]. The result is sorted by timestamp.
///
/// ### Errors
/// * [`Error::JsonError`] if the data is not an array of bar objects.
/// * [`Error::BarDataEmpty`] if no element forms a valid bar.
#[cfg(feature = "serde")]
pub fn bars_from_json<R: Read>(reader: R) -> Result<Vec<Bar>> {
    use crate::engine::BarRecord;

    let records: Vec<BarRecord> = serde_json::from_reader(reader)?;
    let mut bars = Vec::with_capacity(records.len());
    let mut skipped = 0usize;
    for (row, record) in records.into_iter().enumerate() {
        match Bar::try_from(record) {
            Ok(bar) => bars.push(bar),
            Err(error) => {
                skipped += 1;
                warn!(row = row + 1, %error, "row skipped");
            }
        }
    }

    if bars.is_empty() {
        return Err(Error::BarDataEmpty);
    }
    bars.sort_by_key(Bar::timestamp);

    debug!(bars = bars.len(), skipped, "bars loaded");
    Ok(bars)
}

/// Reads the JSON bar file at `path`. See [`bars_from_json`].
#[cfg(feature = "serde")]
pub fn get_bars_from_json(path: impl AsRef<Path>) -> Result<Vec<Bar>> {
    let file = File::open(path)?;
    bars_from_json(std::io::BufReader::new(file))
}
