//! Unweighted geometric-mean price index (Cavallo-style).

use rayon::prelude::*;

use crate::base_period::{self, BasePeriod};
use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::feed::PriceFeed;
use crate::index::{self, IndexRecord};
use crate::series::{BaseSnapshot, PriceMatrix};

/// Geometric mean of price ratios, `exp(mean(ln(ratio)))`.
///
/// Returns `None` when there are no ratios.
pub fn geometric_mean<I: IntoIterator<Item = f64>>(ratios: I) -> Option<f64> {
    let (sum, count) = ratios
        .into_iter()
        .fold((0.0_f64, 0usize), |(sum, count), r| (sum + r.ln(), count + 1));
    if count == 0 {
        return None;
    }
    Some((sum / count as f64).exp())
}

/// Index value on axis position `date_idx` against `snapshot`.
///
/// `100 * exp(mean(ln(current / base)))` over every eligible item, rounded
/// to 4 decimals; `0.0` when no item is eligible.
pub fn index_on(matrix: &PriceMatrix, date_idx: usize, snapshot: &BaseSnapshot) -> f64 {
    match geometric_mean(matrix.ratios(date_idx, snapshot).map(|(_, r)| r)) {
        Some(mean) => index::round4(100.0 * mean),
        None => {
            tracing::debug!(date = %matrix.dates()[date_idx], "no eligible items, index is 0.0");
            0.0
        }
    }
}

/// Computes the geometric-mean index over every date of `feed`.
///
/// The date axis is the set of distinct observation dates. Prices are
/// forward-filled along it before ratios are taken, and each base window
/// normalizes against its own base-date snapshot.
///
/// # Errors
/// * `EmptyFeed` if the feed has no observations.
/// * `OverlappingWindows` if assembled windows are not strictly ascending.
pub fn compute_geometric_index<F: PriceFeed + ?Sized>(
    config: IndexConfig,
    feed: &F,
) -> Result<Vec<IndexRecord>> {
    tracing::info!(base_mode = %config.base_mode(), "calculating geometric-mean index");

    let dates = feed.all_dates();
    if dates.is_empty() {
        return Err(IndexError::EmptyFeed);
    }

    let matrix = PriceMatrix::build(feed, &dates);
    let periods = base_period::select_base_periods(&config, &dates, |base| {
        matrix.base_snapshot(base)
    });

    let windows = periods
        .iter()
        .map(|period| window_records(&matrix, period))
        .collect();

    let series = index::assemble(windows)?;
    tracing::info!(records = series.len(), "geometric-mean index complete");
    Ok(series)
}

fn window_records(matrix: &PriceMatrix, period: &BasePeriod<BaseSnapshot>) -> Vec<IndexRecord> {
    let dates = period.window.slice(matrix.dates());
    let offset = dates
        .first()
        .and_then(|d| matrix.date_position(*d))
        .unwrap_or(0);

    if period.snapshot.priced_items() == 0 {
        tracing::warn!(
            base_date = %period.window.base_date,
            "no item priced on base date, window yields 0.0"
        );
    }

    (offset..offset + dates.len())
        .into_par_iter()
        .map(|date_idx| IndexRecord {
            date: matrix.dates()[date_idx],
            index: index_on(matrix, date_idx, &period.snapshot),
            base_date: period.window.base_date,
        })
        .collect()
}
