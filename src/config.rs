use crate::error::{IndexError, Result};

/// How base periods are chosen for an index run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseMode {
    /// One window over the whole feed, based on its first date.
    Auto,
    /// One window per calendar month, based on the first data date of the month.
    Monthly,
    /// One window from a caller-supplied base date to the last data date.
    Fixed,
}

impl std::str::FromStr for BaseMode {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(BaseMode::Auto),
            "monthly" => Ok(BaseMode::Monthly),
            "fixed" => Ok(BaseMode::Fixed),
            other => Err(IndexError::InvalidConfiguration(format!(
                "unknown base mode '{}' (expected auto, monthly or fixed)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for BaseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BaseMode::Auto => "auto",
            BaseMode::Monthly => "monthly",
            BaseMode::Fixed => "fixed",
        };
        f.write_str(name)
    }
}

/// Configuration for one index computation.
///
/// Built once (usually from command-line arguments) and passed by value into
/// each entry point. `base_date` is only meaningful for [`BaseMode::Fixed`],
/// where it is required, so the only way to build one is through
/// [`IndexConfig::new`] or the per-mode constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    base_mode: BaseMode,
    base_date: Option<chrono::NaiveDate>,
}

impl IndexConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    /// * `InvalidConfiguration` if `base_mode` is `Fixed` and no base date is given.
    pub fn new(base_mode: BaseMode, base_date: Option<chrono::NaiveDate>) -> Result<Self> {
        if base_mode == BaseMode::Fixed && base_date.is_none() {
            return Err(IndexError::InvalidConfiguration(
                "fixed base mode requires a base date".to_string(),
            ));
        }
        if base_mode != BaseMode::Fixed && base_date.is_some() {
            tracing::warn!(%base_mode, "base date is ignored outside fixed mode");
        }
        Ok(IndexConfig { base_mode, base_date })
    }

    pub fn auto() -> Self {
        IndexConfig { base_mode: BaseMode::Auto, base_date: None }
    }

    pub fn monthly() -> Self {
        IndexConfig { base_mode: BaseMode::Monthly, base_date: None }
    }

    pub fn fixed(base_date: chrono::NaiveDate) -> Self {
        IndexConfig { base_mode: BaseMode::Fixed, base_date: Some(base_date) }
    }

    pub fn base_mode(&self) -> BaseMode {
        self.base_mode
    }

    pub fn base_date(&self) -> Option<chrono::NaiveDate> {
        self.base_date
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig::auto()
    }
}
