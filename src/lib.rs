//! Daily price index computation.
//!
//! Turns per-item price observations and category weight metadata into
//! index series: an unweighted geometric-mean index, a category-weighted
//! index, and a weighted daily CPI normalized to 1.0. The computation never
//! performs I/O; [`csv_processor`] and the binary are the only I/O edge.

pub mod base_period;
pub mod baseline;
pub mod cli;
pub mod config;
pub mod csv_processor;
pub mod error;
pub mod feed;
pub mod geometric;
pub mod hierarchy;
pub mod index;
pub mod series;
pub mod utils;
pub mod validation;
pub mod weighted;

pub use baseline::compute_baseline_series;
pub use config::{BaseMode, IndexConfig};
pub use error::{IndexError, Result};
pub use feed::{PriceFeed, PricePoint, PriceTable};
pub use geometric::compute_geometric_index;
pub use hierarchy::{Category, CategoryId, Item};
pub use index::IndexRecord;
pub use validation::validate_data_ready;
pub use weighted::{compute_weighted_index, CategoryDailyAggregate};
