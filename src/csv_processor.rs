use crate::feed::{PricePoint, PriceTable};
use crate::hierarchy::{Category, Item};
use crate::index::IndexRecord;
use crate::weighted::CategoryDailyAggregate;

pub const CATEGORIES_FILE: &str = "categories.csv";
pub const ITEMS_FILE: &str = "products.csv";
pub const PRICES_FILE: &str = "prices.csv";
pub const CATEGORY_DAILY_FILE: &str = "category_daily.csv";
/// Directory of per-day exports, used when `prices.csv` is absent.
pub const DAILY_PRICE_DIR: &str = "daily_price";
const DAILY_PRICE_PREFIX: &str = "daily_prices_";

/// Represents a single row of the price export.
///
/// `price` is optional because exports carry empty cells for unpriced items.
#[derive(Debug, serde::Deserialize)]
struct PriceRow {
    date: chrono::NaiveDate,
    #[serde(alias = "product_id")]
    item_id: String,
    price: Option<f64>,
}

/// A row of a per-day export; the date comes from the file name.
#[derive(Debug, serde::Deserialize)]
struct DailyPriceRow {
    #[serde(alias = "product_id")]
    item_id: String,
    price: Option<f64>,
}

/// Tabular inputs for one index run, loaded from a data directory.
#[derive(Debug)]
pub struct Dataset {
    pub categories: Vec<Category>,
    pub items: Vec<Item>,
    pub prices: PriceTable,
}

/// Canonical form of an item id: trimmed and upper-cased.
pub fn normalize_item_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Reads every row of a headed CSV file into `T`.
///
/// # Errors
/// * If the file cannot be opened or a row fails to deserialize.
fn read_rows<T, P>(path: P) -> anyhow::Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<std::path::Path>,
{
    let file = std::fs::File::open(path.as_ref())
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", path.as_ref().display(), e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for result in reader.deserialize::<T>() {
        let row: T = result
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.as_ref().display(), e))?;
        rows.push(row);
    }
    anyhow::Ok(rows)
}

/// Loads category metadata (`category_id,parent,weight`).
pub fn load_categories<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Vec<Category>> {
    read_rows(path)
}

/// Loads item metadata (`item_id,category_id`), normalizing item ids.
pub fn load_items<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Vec<Item>> {
    let items: Vec<Item> = read_rows(path)?;
    anyhow::Ok(
        items
            .into_iter()
            .map(|item| Item { item_id: normalize_item_id(&item.item_id), ..item })
            .collect(),
    )
}

/// Loads price observations (`date,item_id,price`).
///
/// Rows with an empty or non-positive price are dropped; item ids are
/// normalized so they match the item metadata.
pub fn load_prices<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<PriceTable> {
    let rows: Vec<PriceRow> = read_rows(path)?;
    let total = rows.len();

    let table: PriceTable = rows
        .into_iter()
        .filter_map(|row| {
            Some(PricePoint {
                date: row.date,
                item_id: normalize_item_id(&row.item_id),
                price: row.price?,
            })
        })
        .collect();

    tracing::debug!(rows = total, kept = table.len(), "loaded price observations");
    anyhow::Ok(table)
}

/// Date encoded in a per-day export name (`daily_prices_YYYYMMDD.csv`).
fn daily_file_date(path: &std::path::Path) -> Option<chrono::NaiveDate> {
    if path.extension()? != "csv" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix(DAILY_PRICE_PREFIX)?;
    chrono::NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
}

/// Loads every `daily_prices_YYYYMMDD.csv` file (`product_id,price`) in `dir`.
///
/// Files whose name carries no date are skipped. A day without a file has
/// no observations, which the baseline series reports as a missing price
/// source for that day.
pub fn load_daily_prices<P: AsRef<std::path::Path>>(dir: P) -> anyhow::Result<PriceTable> {
    let mut paths = std::fs::read_dir(dir.as_ref())
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", dir.as_ref().display(), e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect::<Vec<_>>();
    paths.sort();

    let mut points = Vec::new();
    for path in paths {
        let Some(date) = daily_file_date(&path) else {
            tracing::debug!("skipping {}", path.display());
            continue;
        };
        let rows: Vec<DailyPriceRow> = read_rows(&path)?;
        points.extend(rows.into_iter().filter_map(|row| {
            Some(PricePoint { date, item_id: normalize_item_id(&row.item_id), price: row.price? })
        }));
    }

    let table: PriceTable = points.into_iter().collect();
    tracing::debug!(kept = table.len(), "loaded daily price files");
    anyhow::Ok(table)
}

/// Loads pre-aggregated category averages (`date,category_id,avg_price,item_count`).
pub fn load_category_daily<P: AsRef<std::path::Path>>(
    path: P,
) -> anyhow::Result<Vec<CategoryDailyAggregate>> {
    read_rows(path)
}

/// Loads categories, items and prices from `dir`.
///
/// Prices come from `prices.csv`, or from the `daily_price/` directory of
/// per-day exports when that file is absent.
///
/// # Errors
/// * If a metadata file or the price source is missing or malformed.
pub fn load_dataset<P: AsRef<std::path::Path>>(dir: P) -> anyhow::Result<Dataset> {
    let dir = dir.as_ref();
    let categories = load_categories(dir.join(CATEGORIES_FILE))?;
    let items = load_items(dir.join(ITEMS_FILE))?;
    let prices_path = dir.join(PRICES_FILE);
    let daily_dir = dir.join(DAILY_PRICE_DIR);
    let prices = if !prices_path.exists() && daily_dir.is_dir() {
        load_daily_prices(&daily_dir)?
    } else {
        load_prices(&prices_path)?
    };
    let dataset = Dataset { categories, items, prices };
    tracing::info!(
        categories = dataset.categories.len(),
        items = dataset.items.len(),
        prices = dataset.prices.len(),
        "loaded dataset from {}",
        dir.display()
    );
    anyhow::Ok(dataset)
}

/// Writes an index series as `date,index,base_date` with a header row.
///
/// Parent directories are created if needed.
pub fn write_index_csv<P: AsRef<std::path::Path>>(
    records: &[IndexRecord],
    output_path: P,
) -> anyhow::Result<()> {
    if let Some(parent) = output_path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(output_path.as_ref())?;
    if records.is_empty() {
        writer.write_record(["date", "index", "base_date"])?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    anyhow::Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::PriceFeed;

    fn write(dir: &std::path::Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn loads_dataset_and_cleans_prices() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CATEGORIES_FILE, "category_id,parent,weight\n1,,0.0\n2,1,1.0\n");
        write(dir.path(), ITEMS_FILE, "product_id,category_id\n sku-1 ,2\n");
        write(
            dir.path(),
            PRICES_FILE,
            "date,item_id,price\n2025-05-01,sku-1,10.5\n2025-05-02,SKU-1,\n2025-05-03,sku-1,-1\n",
        );

        let dataset = load_dataset(dir.path()).unwrap();

        assert_eq!(dataset.categories[1].parent, Some(1));
        assert_eq!(dataset.categories[0].parent, None);
        assert_eq!(dataset.items[0].item_id, "SKU-1");
        assert_eq!(dataset.prices.len(), 1);
        let date = chrono::NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        assert_eq!(dataset.prices.price("SKU-1", date), Some(10.5));
    }

    #[test]
    fn reads_float_formatted_category_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CATEGORIES_FILE);
        write(dir.path(), CATEGORIES_FILE, "category_id,parent,weight\n1,,0.0\n2,1.0,1.0\n");

        let categories = load_categories(&path).unwrap();

        assert_eq!(categories[1].category_id, 2);
        assert_eq!(categories[1].parent, Some(1));
    }

    #[test]
    fn falls_back_to_daily_price_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CATEGORIES_FILE, "category_id,parent,weight\n1001,,1.0\n");
        write(dir.path(), ITEMS_FILE, "product_id,category_id\n1,1001\n");
        let daily = dir.path().join(DAILY_PRICE_DIR);
        std::fs::create_dir(&daily).unwrap();
        write(&daily, "daily_prices_20250501.csv", "product_id,price\n1,100.0\n");
        write(&daily, "daily_prices_20250502.csv", "product_id,price\n1,101.0\n");
        write(&daily, "notes.txt", "ignored");

        let dataset = load_dataset(dir.path()).unwrap();

        let second = chrono::NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        assert_eq!(dataset.prices.len(), 2);
        assert_eq!(dataset.prices.price("1", second), Some(101.0));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_dataset(dir.path()).unwrap_err();
        assert!(err.to_string().contains(CATEGORIES_FILE));
    }

    #[test]
    fn writes_index_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("index.csv");
        let date = chrono::NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        let base = chrono::NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();

        write_index_csv(&[IndexRecord { date, index: 101.23456, base_date: base }], &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "date,index,base_date\n2025-05-02,101.2346,2025-05-01\n");
    }

    #[test]
    fn empty_series_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        write_index_csv(&[], &path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "date,index,base_date\n");
    }
}
