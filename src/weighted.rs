//! Category-weighted price index (Tmall-style).

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::base_period::{self, BasePeriod};
use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::hierarchy::{self, CategoryId};
use crate::index::{self, IndexRecord};

/// Average price of one category on one date, pre-aggregated upstream.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CategoryDailyAggregate {
    pub date: NaiveDate,
    pub category_id: CategoryId,
    pub avg_price: f64,
    pub item_count: u64,
}

type CategoryPrices = std::collections::BTreeMap<CategoryId, f64>;

/// Category averages grouped by date. Empty or non-positive aggregates are
/// dropped; for duplicate (date, category) rows the first one wins.
fn group_by_date(
    aggregates: &[CategoryDailyAggregate],
) -> std::collections::BTreeMap<NaiveDate, CategoryPrices> {
    let mut by_date: std::collections::BTreeMap<NaiveDate, CategoryPrices> =
        std::collections::BTreeMap::new();
    let mut dropped = 0usize;

    for row in aggregates {
        if row.item_count == 0 || !(row.avg_price.is_finite() && row.avg_price > 0.0) {
            dropped += 1;
            continue;
        }
        by_date
            .entry(row.date)
            .or_default()
            .entry(row.category_id)
            .or_insert(row.avg_price);
    }

    if dropped > 0 {
        tracing::debug!(dropped, "ignored empty or non-positive category aggregates");
    }
    by_date
}

/// Weighted index value for one date.
///
/// `100 * Σ(ratio·weight) / Σ(weight)` over categories with a base average,
/// rounded to 4 decimals. Categories without a configured weight count with
/// weight 0. Returns `0.0` when no weight qualifies.
pub fn weighted_index_on(
    current: &CategoryPrices,
    base: &CategoryPrices,
    weights: &std::collections::BTreeMap<CategoryId, f64>,
) -> f64 {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for (category_id, avg_price) in current {
        let Some(base_price) = base.get(category_id).filter(|p| **p > 0.0) else {
            continue;
        };
        let weight = weights.get(category_id).copied().unwrap_or(0.0);
        weighted_sum += avg_price / base_price * weight;
        total_weight += weight;
    }

    if total_weight > 0.0 {
        index::round4(100.0 * weighted_sum / total_weight)
    } else {
        0.0
    }
}

/// Computes the weighted category index over every date of `aggregates`.
///
/// Weights are validated once before anything is computed.
///
/// # Errors
/// * `InvalidHierarchy` if a weight is not finite or lies outside `[0, 1]`.
/// * `InvalidWeightConfiguration` if `weights` is empty or does not sum to 1 within 1%.
/// * `EmptyFeed` if no usable aggregate exists.
/// * `OverlappingWindows` if assembled windows are not strictly ascending.
pub fn compute_weighted_index(
    config: IndexConfig,
    weights: &std::collections::BTreeMap<CategoryId, f64>,
    aggregates: &[CategoryDailyAggregate],
) -> Result<Vec<IndexRecord>> {
    tracing::info!(base_mode = %config.base_mode(), "calculating weighted category index");
    hierarchy::validate_weights(weights)?;

    let by_date = group_by_date(aggregates);
    if by_date.is_empty() {
        return Err(IndexError::EmptyFeed);
    }
    let dates: Vec<NaiveDate> = by_date.keys().copied().collect();
    let empty = CategoryPrices::new();

    let periods = base_period::select_base_periods(&config, &dates, |base| {
        by_date.get(&base).unwrap_or(&empty)
    });

    let windows = periods
        .iter()
        .map(|period| window_records(&dates, &by_date, weights, period))
        .collect();

    let series = index::assemble(windows)?;
    tracing::info!(records = series.len(), "weighted category index complete");
    Ok(series)
}

fn window_records(
    dates: &[NaiveDate],
    by_date: &std::collections::BTreeMap<NaiveDate, CategoryPrices>,
    weights: &std::collections::BTreeMap<CategoryId, f64>,
    period: &BasePeriod<&CategoryPrices>,
) -> Vec<IndexRecord> {
    if period.snapshot.is_empty() {
        tracing::warn!(
            base_date = %period.window.base_date,
            "no category priced on base date, window yields 0.0"
        );
    }

    period
        .window
        .slice(dates)
        .par_iter()
        .map(|date| {
            let index = by_date
                .get(date)
                .map(|current| weighted_index_on(current, period.snapshot, weights))
                .unwrap_or(0.0);
            IndexRecord { date: *date, index, base_date: period.window.base_date }
        })
        .collect()
}

/// Groups item prices into per-category daily averages.
///
/// This is the aggregation the upstream store performs; it is provided for
/// callers that only hold raw observations.
pub fn aggregate_by_category<F: crate::feed::PriceFeed + ?Sized>(
    feed: &F,
    items: &[hierarchy::Item],
) -> Vec<CategoryDailyAggregate> {
    let categories: std::collections::HashMap<&str, CategoryId> = items
        .iter()
        .map(|item| (item.item_id.as_str(), item.category_id))
        .collect();

    let mut aggregates = Vec::new();
    for date in feed.all_dates() {
        let mut sums: std::collections::BTreeMap<CategoryId, (f64, u64)> =
            std::collections::BTreeMap::new();
        for point in feed.observations_on(date) {
            if let Some(category_id) = categories.get(point.item_id.as_str()) {
                let entry = sums.entry(*category_id).or_insert((0.0, 0));
                entry.0 += point.price;
                entry.1 += 1;
            }
        }
        aggregates.extend(sums.into_iter().map(|(category_id, (sum, count))| {
            CategoryDailyAggregate {
                date,
                category_id,
                avg_price: sum / count as f64,
                item_count: count,
            }
        }));
    }
    aggregates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{PricePoint, PriceTable};
    use crate::hierarchy::Item;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn agg(m: u32, d: u32, category_id: CategoryId, avg_price: f64) -> CategoryDailyAggregate {
        CategoryDailyAggregate { date: date(m, d), category_id, avg_price, item_count: 1 }
    }

    fn weights(pairs: &[(CategoryId, f64)]) -> std::collections::BTreeMap<CategoryId, f64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn base_date_is_exactly_one_hundred() {
        let rows = vec![agg(1, 1, 1, 10.0), agg(1, 1, 2, 20.0)];
        let series =
            compute_weighted_index(IndexConfig::auto(), &weights(&[(1, 0.6), (2, 0.4)]), &rows)
                .unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].index, 100.0);
    }

    #[test]
    fn combines_ratios_by_weight() {
        let rows = vec![
            agg(1, 1, 1, 10.0),
            agg(1, 1, 2, 20.0),
            agg(1, 2, 1, 12.0),
            agg(1, 2, 2, 20.0),
        ];
        let series =
            compute_weighted_index(IndexConfig::auto(), &weights(&[(1, 0.5), (2, 0.5)]), &rows)
                .unwrap();

        // (1.2 * 0.5 + 1.0 * 0.5) / 1.0
        assert_eq!(series[1].index, 110.0);
    }

    #[test]
    fn renormalizes_to_weight_actually_used() {
        let rows = vec![agg(1, 1, 1, 10.0), agg(1, 2, 1, 15.0), agg(1, 2, 2, 99.0)];
        let series =
            compute_weighted_index(IndexConfig::auto(), &weights(&[(1, 0.4), (2, 0.6)]), &rows)
                .unwrap();

        // Category 2 has no base average, so only category 1 counts.
        assert_eq!(series[1].index, 150.0);
    }

    #[test]
    fn invalid_weights_abort_before_computation() {
        let rows = vec![agg(1, 1, 1, 10.0)];
        let err = compute_weighted_index(
            IndexConfig::auto(),
            &weights(&[(1, 0.4), (2, 0.2), (3, 0.2), (4, 0.1)]),
            &rows,
        )
        .unwrap_err();

        assert!(matches!(err, IndexError::InvalidWeightConfiguration(_)));
    }

    #[test]
    fn out_of_range_weights_abort_even_when_sum_is_one() {
        let rows = vec![
            agg(1, 1, 1, 10.0),
            agg(1, 1, 2, 10.0),
            agg(1, 2, 1, 10.0),
            agg(1, 2, 2, 20.0),
        ];
        let err =
            compute_weighted_index(IndexConfig::auto(), &weights(&[(1, 1.5), (2, -0.5)]), &rows)
                .unwrap_err();

        assert!(matches!(err, IndexError::InvalidHierarchy(_)));
    }

    #[test]
    fn fixed_base_date_with_coverage() {
        let rows = vec![
            agg(1, 1, 1, 10.0),
            agg(1, 1, 2, 20.0),
            agg(1, 2, 1, 11.0),
            agg(1, 2, 2, 20.0),
            agg(1, 3, 1, 13.2),
            agg(1, 3, 2, 20.0),
        ];
        let series = compute_weighted_index(
            IndexConfig::fixed(date(1, 2)),
            &weights(&[(1, 0.5), (2, 0.5)]),
            &rows,
        )
        .unwrap();

        assert_eq!(series.len(), 2);
        assert!(series.iter().all(|r| r.base_date == date(1, 2)));
        assert_eq!(series[0].date, date(1, 2));
        assert_eq!(series[0].index, 100.0);
        // (1.2 * 0.5 + 1.0 * 0.5) / 1.0
        assert_eq!(series[1].index, 110.0);
    }

    #[test]
    fn fixed_base_date_without_coverage_is_zero() {
        let rows = vec![agg(1, 1, 1, 10.0), agg(1, 3, 1, 12.0), agg(1, 4, 1, 13.0)];
        let series =
            compute_weighted_index(IndexConfig::fixed(date(1, 2)), &weights(&[(1, 1.0)]), &rows)
                .unwrap();

        assert_eq!(series.len(), 2);
        assert!(series.iter().all(|r| r.index == 0.0));
        assert!(series.iter().all(|r| r.base_date == date(1, 2)));
    }

    #[test]
    fn unchanged_prices_keep_index_flat() {
        let rows: Vec<CategoryDailyAggregate> = (1..=5)
            .flat_map(|d| [agg(1, d, 1, 10.0), agg(1, d, 2, 25.0)])
            .collect();
        let series =
            compute_weighted_index(IndexConfig::auto(), &weights(&[(1, 0.3), (2, 0.7)]), &rows)
                .unwrap();

        assert_eq!(series.len(), 5);
        assert!(series.iter().all(|r| r.index == 100.0));
    }

    #[test]
    fn recomputation_is_identical() {
        let rows = vec![
            agg(1, 1, 1, 10.0),
            agg(1, 1, 2, 20.0),
            agg(1, 2, 1, 10.7),
            agg(1, 2, 2, 19.3),
            agg(2, 1, 1, 11.0),
            agg(2, 2, 2, 21.0),
        ];
        let map = weights(&[(1, 0.45), (2, 0.55)]);

        let first = compute_weighted_index(IndexConfig::monthly(), &map, &rows).unwrap();
        let second = compute_weighted_index(IndexConfig::monthly(), &map, &rows).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn no_qualifying_category_is_zero() {
        let rows = vec![agg(1, 1, 1, 10.0), agg(1, 2, 2, 10.0)];
        let series =
            compute_weighted_index(IndexConfig::auto(), &weights(&[(1, 0.5), (2, 0.5)]), &rows)
                .unwrap();

        assert_eq!(series[1].index, 0.0);
    }

    #[test]
    fn monthly_mode_excludes_following_month() {
        let rows = vec![
            agg(1, 31, 1, 10.0),
            agg(2, 1, 1, 20.0),
            agg(2, 2, 1, 22.0),
        ];
        let series =
            compute_weighted_index(IndexConfig::monthly(), &weights(&[(1, 1.0)]), &rows).unwrap();

        let january: Vec<&IndexRecord> =
            series.iter().filter(|r| r.base_date == date(1, 31)).collect();
        assert_eq!(january.len(), 1);
        assert_eq!(series[1].index, 100.0);
        assert_eq!(series[2].index, 110.0);
    }

    #[test]
    fn empty_aggregates_are_ignored() {
        let mut empty = agg(1, 1, 1, 10.0);
        empty.item_count = 0;
        let err = compute_weighted_index(IndexConfig::auto(), &weights(&[(1, 1.0)]), &[empty])
            .unwrap_err();

        assert!(matches!(err, IndexError::EmptyFeed));
    }

    #[test]
    fn aggregates_raw_prices_by_category() {
        let feed: PriceTable = vec![
            PricePoint { date: date(1, 1), item_id: "A".into(), price: 10.0 },
            PricePoint { date: date(1, 1), item_id: "B".into(), price: 30.0 },
            PricePoint { date: date(1, 1), item_id: "C".into(), price: 5.0 },
            PricePoint { date: date(1, 1), item_id: "ORPHAN".into(), price: 1.0 },
        ]
        .into_iter()
        .collect();
        let items = vec![
            Item { item_id: "A".into(), category_id: 1 },
            Item { item_id: "B".into(), category_id: 1 },
            Item { item_id: "C".into(), category_id: 2 },
        ];

        let aggregates = aggregate_by_category(&feed, &items);

        assert_eq!(
            aggregates,
            vec![
                CategoryDailyAggregate { date: date(1, 1), category_id: 1, avg_price: 20.0, item_count: 2 },
                CategoryDailyAggregate { date: date(1, 1), category_id: 2, avg_price: 5.0, item_count: 1 },
            ]
        );
    }
}
