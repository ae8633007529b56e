/// Errors raised by the index engine.
///
/// Only structural failures are represented here. A single date with no
/// eligible data, or an item without a usable base price, never surfaces as
/// an error: it is excluded from the aggregate (or recorded as `0.0`).
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("no price data for {0}")]
    MissingPriceSource(chrono::NaiveDate),

    #[error("invalid weight configuration: {0}")]
    InvalidWeightConfiguration(String),

    #[error("invalid category hierarchy: {0}")]
    InvalidHierarchy(String),

    #[error("invalid index configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("price feed contains no usable observations")]
    EmptyFeed,

    #[error("base windows overlap at {0}")]
    OverlappingWindows(chrono::NaiveDate),
}

pub type Result<T> = std::result::Result<T, IndexError>;
