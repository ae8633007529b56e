//! Read-only access to materialized price observations.

use chrono::NaiveDate;

/// A single observed price for an item on a date.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    #[serde(alias = "product_id")]
    pub item_id: String,
    pub price: f64,
}

/// A source of daily price observations.
///
/// Implementations are expected to be already materialized in memory; the
/// engine treats every call as synchronous and infallible.
pub trait PriceFeed: Sync {
    /// Distinct observation dates within `[start, end]`, ascending.
    fn dates_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate>;

    /// Every observation recorded on `date`, in feed order.
    fn observations_on(&self, date: NaiveDate) -> &[PricePoint];

    /// Earliest and latest observation dates, or `None` for an empty feed.
    fn date_span(&self) -> Option<(NaiveDate, NaiveDate)>;

    /// Price of `item_id` observed exactly on `date`.
    fn price(&self, item_id: &str, date: NaiveDate) -> Option<f64> {
        self.observations_on(date)
            .iter()
            .find(|p| p.item_id == item_id)
            .map(|p| p.price)
    }

    /// Every distinct observation date, ascending.
    fn all_dates(&self) -> Vec<NaiveDate> {
        match self.date_span() {
            Some((first, last)) => self.dates_between(first, last),
            None => Vec::new(),
        }
    }
}

/// In-memory price feed grouped by date.
///
/// Only usable observations are kept: prices that are not strictly positive
/// (or not finite) are dropped on insertion.
#[derive(Debug, Default, Clone)]
pub struct PriceTable {
    by_date: std::collections::BTreeMap<NaiveDate, Vec<PricePoint>>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observation, returning `false` if it was dropped as unusable.
    pub fn insert(&mut self, point: PricePoint) -> bool {
        if !(point.price.is_finite() && point.price > 0.0) {
            return false;
        }
        self.by_date.entry(point.date).or_default().push(point);
        true
    }

    pub fn len(&self) -> usize {
        self.by_date.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

impl FromIterator<PricePoint> for PriceTable {
    fn from_iter<I: IntoIterator<Item = PricePoint>>(iter: I) -> Self {
        let mut table = PriceTable::new();
        let mut dropped = 0usize;
        for point in iter {
            if !table.insert(point) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, "dropped non-positive price observations");
        }
        table
    }
}

impl PriceFeed for PriceTable {
    fn dates_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        if start > end {
            return Vec::new();
        }
        self.by_date.range(start..=end).map(|(date, _)| *date).collect()
    }

    fn observations_on(&self, date: NaiveDate) -> &[PricePoint] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = *self.by_date.keys().next()?;
        let last = *self.by_date.keys().next_back()?;
        Some((first, last))
    }
}
