/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building bars, loading data or sweeping parameters.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The bar data provided is empty.
    #[error("Bar data is empty: at least one bar is required")]
    BarDataEmpty,

    /// A required builder field was never set.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The bar prices are not finite or do not form a valid OHLC range.
    #[error("Invalid bar (open: {open}, high: {high}, low: {low}, close: {close})")]
    InvalidBar {
        /// Opening price.
        open: f64,
        /// Highest price.
        high: f64,
        /// Lowest price.
        low: f64,
        /// Closing price.
        close: f64,
    },

    /// The timestamp could not be parsed.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The time of day could not be parsed (expected HH:MM or HH:MM:SS).
    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    /// No strategy is registered under this id.
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV reading error occurred.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Custom error message.
    #[error("{0}")]
    Msg(String),
}
