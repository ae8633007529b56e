use chrono::{Datelike, NaiveDate};

use crate::config::{BaseMode, IndexConfig};

/// A span of dates normalized against a single base date.
///
/// Bounds are inclusive. `start` always equals `base_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub base_date: NaiveDate,
}

/// A window paired with the base values its aggregator normalizes against.
#[derive(Debug, Clone)]
pub struct BasePeriod<S> {
    pub window: BaseWindow,
    pub snapshot: S,
}

impl BaseWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Dates of `dates` (ascending) that fall inside this window.
    pub fn slice<'a>(&self, dates: &'a [NaiveDate]) -> &'a [NaiveDate] {
        let from = dates.partition_point(|d| *d < self.start);
        let to = dates.partition_point(|d| *d <= self.end);
        &dates[from..to.max(from)]
    }
}

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(date);
    first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Splits the data calendar into base windows according to `config`.
///
/// `dates` are the distinct data dates, ascending. The result is ordered
/// and non-overlapping. An empty calendar yields no windows.
///
/// # Arguments
/// * `config` - Base period policy.
/// * `dates` - Distinct data dates, ascending.
///
/// # Returns
/// * `Vec<BaseWindow>` - One window for `auto`/`fixed`, one per month present for `monthly`.
pub fn select_windows(config: &IndexConfig, dates: &[NaiveDate]) -> Vec<BaseWindow> {
    let (Some(&first), Some(&last)) = (dates.first(), dates.last()) else {
        return Vec::new();
    };

    match config.base_mode() {
        BaseMode::Auto => vec![BaseWindow { start: first, end: last, base_date: first }],
        BaseMode::Fixed => {
            let base_date = config.base_date().unwrap_or(first);
            if base_date > last {
                tracing::warn!(%base_date, %last, "fixed base date is after the last data date");
            }
            vec![BaseWindow { start: base_date, end: last, base_date }]
        }
        BaseMode::Monthly => monthly_windows(dates),
    }
}

/// One window per calendar month present in `dates`.
fn monthly_windows(dates: &[NaiveDate]) -> Vec<BaseWindow> {
    let mut windows = Vec::new();
    let mut current: Option<BaseWindow> = None;

    for &date in dates {
        match current {
            Some(ref window) if window.contains(date) => {}
            Some(window) => {
                windows.push(window);
                current = Some(BaseWindow { start: date, end: month_end(date), base_date: date });
            }
            None => {
                current = Some(BaseWindow { start: date, end: month_end(date), base_date: date });
            }
        }
    }

    if let Some(window) = current {
        windows.push(window);
    }

    windows
}

/// Pairs each window with the snapshot taken at its base date.
pub fn select_base_periods<S, F>(
    config: &IndexConfig,
    dates: &[NaiveDate],
    mut snapshot: F,
) -> Vec<BasePeriod<S>>
where
    F: FnMut(NaiveDate) -> S,
{
    select_windows(config, dates)
        .into_iter()
        .map(|window| BasePeriod { window, snapshot: snapshot(window.base_date) })
        .collect()
}
