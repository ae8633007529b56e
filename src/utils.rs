use crate::index::IndexRecord;

/// Configures a custom Rayon thread pool with specified size.
///
/// Per-date aggregation runs on whichever pool is current, so installing
/// this pool bounds the parallelism of a whole index run.
///
/// # Arguments
/// * `num_threads` - Desired number of threads for the pool.
///
/// # Returns
/// * `Result<ThreadPool>` - Created thread pool or an error if creation fails.
pub fn configure_thread_pool(num_threads: usize) -> anyhow::Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build thread pool: {}", e))
}

/// Parses an ISO-8601 calendar date (`%Y-%m-%d`).
///
/// # Examples
///
/// ```
/// let date = price_index::utils::parse_date("2025-07-08").unwrap();
/// assert_eq!(date.to_string(), "2025-07-08");
/// ```
pub fn parse_date(date_str: &str) -> anyhow::Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("Invalid date '{}': {}", date_str, e))
}

/// Prints the first `count` records of an index series.
///
/// # Example Output
/// ```text
///  - date: 2025-05-01, index: 100.0000, base: 2025-05-01
///  - date: 2025-05-02, index: 101.0000, base: 2025-05-01
/// ```
pub fn print_records(records: &[IndexRecord], count: usize) {
    for record in records.iter().take(count) {
        println!(
            " - date: {}, index: {:.4}, base: {}",
            record.date, record.index, record.base_date,
        );
    }
}
