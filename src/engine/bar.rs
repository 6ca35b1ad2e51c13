use chrono::{DateTime, FixedOffset, NaiveTime};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// One OHLC(V) sample of the instrument over a fixed interval.
///
/// Bars are small `Copy` snapshots: a session that keeps a reference bar holds its own
/// copy, so nothing downstream can alias or mutate the replayed data.
///
/// With the `serde` feature, deserialization goes through [`BarBuilder`], so a bar read
/// from a file is validated the same way as one built in code.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(try_from = "BarRecord"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    timestamp: DateTime<FixedOffset>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    open_interest: f64,
}

/// Unchecked bar fields as they appear in a data file.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BarRecord {
    timestamp: DateTime<FixedOffset>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
    #[serde(default, alias = "oi")]
    open_interest: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<BarRecord> for Bar {
    type Error = Error;

    fn try_from(record: BarRecord) -> Result<Self> {
        BarBuilder::builder()
            .timestamp(record.timestamp)
            .open(record.open)
            .high(record.high)
            .low(record.low)
            .close(record.close)
            .volume(record.volume)
            .open_interest(record.open_interest)
            .build()
    }
}

impl Bar {
    /// Returns the bar timestamp, in the exchange-local offset it was recorded with.
    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    /// Returns the local wall-clock time of day of the bar.
    pub fn time_of_day(&self) -> NaiveTime {
        self.timestamp.time()
    }

    /// Returns the opening price.
    pub fn open(&self) -> f64 {
        self.open
    }

    /// Returns the highest price.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Returns the lowest price.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Returns the closing price.
    pub fn close(&self) -> f64 {
        self.close
    }

    /// Returns the traded volume.
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Returns the open interest.
    pub fn open_interest(&self) -> f64 {
        self.open_interest
    }

    /// A bearish ("red") bar closes below its open.
    pub fn is_bearish(&self) -> bool {
        self.open > self.close
    }

    /// A bullish ("green") bar closes above its open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Size of the move in the bar's own direction: `high - close` for a bearish bar,
    /// `close - low` for a bullish one, `0.0` for a doji.
    pub fn directional_range(&self) -> f64 {
        if self.is_bearish() {
            self.high - self.close
        } else if self.is_bullish() {
            self.close - self.low
        } else {
            0.0
        }
    }
}

/// Builder for [`Bar`].
///
/// `volume` and `open_interest` default to zero; every other field is required.
#[derive(Debug, Default)]
pub struct BarBuilder {
    timestamp: Option<DateTime<FixedOffset>>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
    open_interest: Option<f64>,
}

impl BarBuilder {
    /// Starts a new, empty builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the timestamp.
    pub fn timestamp(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the opening price.
    pub fn open(mut self, open: f64) -> Self {
        self.open = Some(open);
        self
    }

    /// Sets the highest price.
    pub fn high(mut self, high: f64) -> Self {
        self.high = Some(high);
        self
    }

    /// Sets the lowest price.
    pub fn low(mut self, low: f64) -> Self {
        self.low = Some(low);
        self
    }

    /// Sets the closing price.
    pub fn close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    /// Sets the traded volume.
    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Sets the open interest.
    pub fn open_interest(mut self, open_interest: f64) -> Self {
        self.open_interest = Some(open_interest);
        self
    }

    /// Validates the fields and builds the bar.
    ///
    /// ### Errors
    /// * [`Error::MissingField`] if the timestamp or a price is unset.
    /// * [`Error::InvalidBar`] if a price is not finite, `high < low`, or the open/close
    ///   fall outside `[low, high]`.
    pub fn build(self) -> Result<Bar> {
        let timestamp = self.timestamp.ok_or(Error::MissingField("timestamp"))?;
        let open = self.open.ok_or(Error::MissingField("open"))?;
        let high = self.high.ok_or(Error::MissingField("high"))?;
        let low = self.low.ok_or(Error::MissingField("low"))?;
        let close = self.close.ok_or(Error::MissingField("close"))?;

        let finite = [open, high, low, close].iter().all(|p| p.is_finite());
        let contained = low <= high && (low..=high).contains(&open) && (low..=high).contains(&close);
        if !finite || !contained {
            return Err(Error::InvalidBar { open, high, low, close });
        }

        Ok(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume: self.volume.unwrap_or_default(),
            open_interest: self.open_interest.unwrap_or_default(),
        })
    }
}
