use crate::error::{IndexError, Result};
use crate::feed::PriceFeed;
use crate::hierarchy::{self, Category};

/// Checks that the inputs are ready for index computation.
///
/// 1. The feed holds at least one usable price.
/// 2. Leaf weights are valid and sum to 1 within 1%.
/// 3. The earliest date, the default base date, prices at least one item.
///
/// # Errors
/// * `EmptyFeed`, `InvalidHierarchy`, `InvalidWeightConfiguration` or
///   `MissingPriceSource`, for the first check that fails.
pub fn validate_data_ready<F: PriceFeed + ?Sized>(categories: &[Category], feed: &F) -> Result<()> {
    let Some((first, last)) = feed.date_span() else {
        return Err(IndexError::EmptyFeed);
    };

    let weights = hierarchy::leaf_weights(categories)?;
    hierarchy::validate_weights(&weights)?;

    if feed.observations_on(first).is_empty() {
        return Err(IndexError::MissingPriceSource(first));
    }

    tracing::info!(
        %first,
        %last,
        leaves = weights.len(),
        base_items = feed.observations_on(first).len(),
        "data ready for index computation"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{PricePoint, PriceTable};

    fn categories(weights: &[f64]) -> Vec<Category> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| Category { category_id: i as u32 + 1, parent: None, weight: *w })
            .collect()
    }

    fn feed() -> PriceTable {
        vec![PricePoint {
            date: chrono::NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            item_id: "A".into(),
            price: 10.0,
        }]
        .into_iter()
        .collect()
    }

    #[test]
    fn ready_data_passes() {
        assert!(validate_data_ready(&categories(&[0.4, 0.2, 0.2, 0.2]), &feed()).is_ok());
    }

    #[test]
    fn empty_feed_fails_first() {
        let err = validate_data_ready(&categories(&[0.4]), &PriceTable::new()).unwrap_err();
        assert!(matches!(err, IndexError::EmptyFeed));
    }

    #[test]
    fn bad_weights_fail() {
        let err = validate_data_ready(&categories(&[0.4, 0.2, 0.2, 0.1]), &feed()).unwrap_err();
        assert!(matches!(err, IndexError::InvalidWeightConfiguration(_)));
    }
}
