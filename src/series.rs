use chrono::NaiveDate;

use crate::feed::PriceFeed;

/// Item × date price table, forward-filled along its date axis.
///
/// Prices are stored column-major: one column per axis date, one slot per
/// item (items sorted by id). A slot is `None` until the item's first
/// observation on or after the axis start; afterwards it carries the most
/// recent known price. There is no back-fill.
#[derive(Debug, Clone)]
pub struct PriceMatrix {
    dates: Vec<NaiveDate>,
    items: Vec<String>,
    positions: std::collections::HashMap<String, usize>,
    columns: Vec<Vec<Option<f64>>>,
}

/// Base-date prices for one window, aligned with a [`PriceMatrix`]'s items.
///
/// A slot is `Some` only for strictly positive base prices.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseSnapshot {
    prices: Vec<Option<f64>>,
}

impl PriceMatrix {
    /// Builds the matrix for `dates` (ascending) from `feed`.
    ///
    /// For duplicate observations of an item on one date the first one wins.
    /// Observations outside the axis are ignored.
    pub fn build<F: PriceFeed + ?Sized>(feed: &F, dates: &[NaiveDate]) -> Self {
        let items: Vec<String> = dates
            .iter()
            .flat_map(|date| feed.observations_on(*date))
            .map(|p| p.item_id.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        let positions: std::collections::HashMap<String, usize> = items
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut last: Vec<Option<f64>> = vec![None; items.len()];
        let mut columns = Vec::with_capacity(dates.len());

        for date in dates {
            let mut seen = vec![false; items.len()];
            for point in feed.observations_on(*date) {
                let Some(&i) = positions.get(&point.item_id) else {
                    continue;
                };
                if seen[i] || !(point.price.is_finite() && point.price > 0.0) {
                    continue;
                }
                seen[i] = true;
                last[i] = Some(point.price);
            }
            columns.push(last.clone());
        }

        tracing::debug!(
            items = items.len(),
            dates = dates.len(),
            "built forward-filled price matrix"
        );

        PriceMatrix { dates: dates.to_vec(), items, positions, columns }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Position of `date` on the axis.
    pub fn date_position(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    pub fn item_position(&self, item_id: &str) -> Option<usize> {
        self.positions.get(item_id).copied()
    }

    /// Forward-filled price of `item_id` on `date`.
    pub fn price(&self, item_id: &str, date: NaiveDate) -> Option<f64> {
        let d = self.date_position(date)?;
        let i = self.item_position(item_id)?;
        self.columns[d][i]
    }

    /// Extracts base prices on `base_date`.
    ///
    /// A date that is not on the axis yields an empty snapshot, so every
    /// ratio computed against it is excluded.
    pub fn base_snapshot(&self, base_date: NaiveDate) -> BaseSnapshot {
        let prices = match self.date_position(base_date) {
            Some(d) => self.columns[d]
                .iter()
                .map(|p| p.filter(|price| *price > 0.0))
                .collect(),
            None => vec![None; self.items.len()],
        };
        BaseSnapshot { prices }
    }

    /// Price ratios `current / base` at axis position `date_idx`.
    ///
    /// Yields `(item_idx, ratio)` for every item that has both a usable base
    /// price and a current price; other items are skipped.
    pub fn ratios<'a>(
        &'a self,
        date_idx: usize,
        snapshot: &'a BaseSnapshot,
    ) -> impl Iterator<Item = (usize, f64)> + 'a {
        self.columns[date_idx]
            .iter()
            .zip(snapshot.prices.iter())
            .enumerate()
            .filter_map(|(i, (current, base))| match (current, base) {
                (Some(current), Some(base)) => Some((i, current / base)),
                _ => None,
            })
    }
}

impl BaseSnapshot {
    /// Number of items with a usable base price.
    pub fn priced_items(&self) -> usize {
        self.prices.iter().filter(|p| p.is_some()).count()
    }
}
