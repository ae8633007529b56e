//! Daily CPI normalized to 1.0 at a single base date.
//!
//! Each leaf category gets the geometric mean of its items' price ratios;
//! the day's value is the weight-combined sum of those category indices.

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::error::{IndexError, Result};
use crate::feed::PriceFeed;
use crate::geometric;
use crate::hierarchy::{self, Category, CategoryId, Item};
use crate::index;
use crate::series::{BaseSnapshot, PriceMatrix};

/// Computes the daily baseline series over every calendar day in `[start, end]`.
///
/// The base date is `start`. Items whose category is not a leaf are ignored.
///
/// # Errors
/// * `InvalidDateRange` if `start` is after `end`.
/// * `InvalidHierarchy` if the categories fail leaf resolution.
/// * `MissingPriceSource` for the first day in the range without any observation.
pub fn compute_baseline_series<F: PriceFeed + ?Sized>(
    start: NaiveDate,
    end: NaiveDate,
    categories: &[Category],
    items: &[Item],
    feed: &F,
) -> Result<Vec<(NaiveDate, f64)>> {
    if start > end {
        return Err(IndexError::InvalidDateRange { start, end });
    }
    tracing::info!(%start, %end, "calculating baseline series");

    let weights = hierarchy::leaf_weights(categories)?;

    let days: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).collect();
    if let Some(missing) = days.iter().find(|d| feed.observations_on(**d).is_empty()) {
        return Err(IndexError::MissingPriceSource(*missing));
    }

    let matrix = PriceMatrix::build(feed, &days);
    let snapshot = matrix.base_snapshot(start);

    // Leaf category of each matrix item, if it has one.
    let item_categories: std::collections::HashMap<&str, CategoryId> = items
        .iter()
        .filter(|item| weights.contains_key(&item.category_id))
        .map(|item| (item.item_id.as_str(), item.category_id))
        .collect();
    let item_leaf: Vec<Option<CategoryId>> = matrix
        .items()
        .iter()
        .map(|id| item_categories.get(id.as_str()).copied())
        .collect();

    let series = (0..days.len())
        .into_par_iter()
        .map(|date_idx| {
            let value = baseline_on(&matrix, date_idx, &snapshot, &item_leaf, &weights);
            (days[date_idx], value)
        })
        .collect();

    Ok(series)
}

fn baseline_on(
    matrix: &PriceMatrix,
    date_idx: usize,
    snapshot: &BaseSnapshot,
    item_leaf: &[Option<CategoryId>],
    weights: &std::collections::BTreeMap<CategoryId, f64>,
) -> f64 {
    let mut ratios_by_category: std::collections::BTreeMap<CategoryId, Vec<f64>> =
        std::collections::BTreeMap::new();
    for (item_idx, ratio) in matrix.ratios(date_idx, snapshot) {
        if let Some(category_id) = item_leaf[item_idx] {
            ratios_by_category.entry(category_id).or_default().push(ratio);
        }
    }

    let value: f64 = ratios_by_category
        .into_iter()
        .filter_map(|(category_id, ratios)| {
            let category_index = geometric::geometric_mean(ratios)?;
            Some(category_index * weights[&category_id])
        })
        .sum();

    index::round4(value)
}
