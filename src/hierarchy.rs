use crate::error::{IndexError, Result};

pub type CategoryId = u32;

/// Lowest accepted sum of leaf weights.
pub const MIN_WEIGHT_SUM: f64 = 0.99;
/// Highest accepted sum of leaf weights.
pub const MAX_WEIGHT_SUM: f64 = 1.01;

/// A product category with its parent link and expenditure weight.
///
/// Ids also accept integral floats (`1.0`): exports that mix ids with
/// empty parents write every id of that column as a float.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "deserialize_id")]
    pub category_id: CategoryId,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub parent: Option<CategoryId>,
    pub weight: f64,
}

/// A priced item and the category it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Item {
    #[serde(alias = "product_id")]
    pub item_id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub category_id: CategoryId,
}

fn integral_id(value: f64) -> Option<CategoryId> {
    if value.fract() == 0.0 && (0.0..=CategoryId::MAX as f64).contains(&value) {
        Some(value as CategoryId)
    } else {
        None
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<CategoryId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = <f64 as serde::Deserialize>::deserialize(deserializer)?;
    integral_id(value).ok_or_else(|| {
        serde::de::Error::custom(format!("category id {} is not a non-negative integer", value))
    })
}

fn deserialize_optional_id<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<CategoryId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match <Option<f64> as serde::Deserialize>::deserialize(deserializer)? {
        Some(value) => integral_id(value).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("category id {} is not a non-negative integer", value))
        }),
        None => Ok(None),
    }
}

/// Rejects a weight that is not finite or lies outside `[0, 1]`.
fn check_weight(category_id: CategoryId, weight: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&weight) {
        return Err(IndexError::InvalidHierarchy(format!(
            "category {} has weight {} outside [0, 1]",
            category_id, weight
        )));
    }
    Ok(())
}

/// Returns the leaf categories: those never referenced as another category's parent.
///
/// # Errors
/// * `InvalidHierarchy` if a category is its own parent or has a weight
///   outside `[0, 1]`.
pub fn resolve_leaves(categories: &[Category]) -> Result<Vec<&Category>> {
    for category in categories {
        if category.parent == Some(category.category_id) {
            return Err(IndexError::InvalidHierarchy(format!(
                "category {} is its own parent",
                category.category_id
            )));
        }
        check_weight(category.category_id, category.weight)?;
    }

    let parents: std::collections::HashSet<CategoryId> =
        categories.iter().filter_map(|c| c.parent).collect();

    let leaves: Vec<&Category> = categories
        .iter()
        .filter(|c| !parents.contains(&c.category_id))
        .collect();

    tracing::debug!(
        categories = categories.len(),
        leaves = leaves.len(),
        "resolved category hierarchy"
    );
    Ok(leaves)
}

/// Maps every leaf category to its weight.
pub fn leaf_weights(
    categories: &[Category],
) -> Result<std::collections::BTreeMap<CategoryId, f64>> {
    let leaves = resolve_leaves(categories)?;
    Ok(leaves.into_iter().map(|c| (c.category_id, c.weight)).collect())
}

/// Checks that a weight mapping is usable for weighted aggregation.
///
/// # Errors
/// * `InvalidHierarchy` if any weight is not finite or lies outside `[0, 1]`.
/// * `InvalidWeightConfiguration` if the mapping is empty or its sum falls
///   outside `[MIN_WEIGHT_SUM, MAX_WEIGHT_SUM]`.
pub fn validate_weights(weights: &std::collections::BTreeMap<CategoryId, f64>) -> Result<()> {
    if weights.is_empty() {
        return Err(IndexError::InvalidWeightConfiguration(
            "no category weights found".to_string(),
        ));
    }
    for (category_id, weight) in weights {
        check_weight(*category_id, *weight)?;
    }

    let total: f64 = weights.values().sum();
    if !(MIN_WEIGHT_SUM..=MAX_WEIGHT_SUM).contains(&total) {
        return Err(IndexError::InvalidWeightConfiguration(format!(
            "leaf weights sum to {:.4}, expected 1 within 1%",
            total
        )));
    }

    Ok(())
}
