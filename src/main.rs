use price_index::cli;
use price_index::csv_processor;
use price_index::utils;
use price_index::{
    compute_baseline_series, compute_geometric_index, compute_weighted_index, hierarchy,
    validate_data_ready, weighted, IndexConfig, IndexRecord,
};

/// Main entry point of the application.
///
/// This function orchestrates the entire workflow:
/// 1. Parses command-line arguments into one immutable configuration.
/// 2. Determines the number of threads to use.
/// 3. Loads the tables and computes the requested index.
/// 4. Writes the series as CSV and optionally prints its first records.
///
/// # Returns
///
/// * `anyhow::Result<()>` - Success or an error if any step fails.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let total_start = std::time::Instant::now();
    let args = cli::Args::parse();
    let config = IndexConfig::new(args.base_mode, args.base_date)?;
    println!("Start calculation...");

    let effective_threads = match args.threads {
        Some(n) => {
            let max_threads = num_cpus::get();
            if n > max_threads {
                println!("⚠️ Warning: Limiting thread count to {} (max available)", max_threads);
                max_threads
            } else { n }
        }
        None => rayon::current_num_threads(),
    };
    println!("🚀 Using {} thread(s)", effective_threads);

    let records = if args.threads.is_some() {
        let local_pool = utils::configure_thread_pool(effective_threads)?;
        local_pool.install(|| run(&args, config))?
    } else {
        run(&args, config)?
    };

    csv_processor::write_index_csv(&records, &args.output)?;
    println!(
        "✅ Wrote {} records to {} in {:?} seconds",
        records.len(),
        args.output.display(),
        total_start.elapsed().as_secs_f64()
    );

    if args.check {
        println!("📄 First 5 records");
        utils::print_records(&records, 5);
    }
    Ok(())
}

/// Loads the dataset and computes the index selected by `args.method`.
fn run(args: &cli::Args, config: IndexConfig) -> anyhow::Result<Vec<IndexRecord>> {
    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner.set_message(format!("Loading {}", args.input.display()));

    let dataset = csv_processor::load_dataset(&args.input)?;

    if args.validate {
        spinner.set_message("Validating data");
        validate_data_ready(&dataset.categories, &dataset.prices)?;
    }

    spinner.set_message("Computing index");
    let records: Vec<IndexRecord> = match args.method {
        cli::Method::Cavallo => compute_geometric_index(config, &dataset.prices)?,
        cli::Method::Tmall => {
            let weights = hierarchy::leaf_weights(&dataset.categories)?;
            let daily_path = args.input.join(csv_processor::CATEGORY_DAILY_FILE);
            let aggregates = if daily_path.exists() {
                csv_processor::load_category_daily(&daily_path)?
            } else {
                tracing::info!("{} not found, aggregating prices by category", daily_path.display());
                weighted::aggregate_by_category(&dataset.prices, &dataset.items)
            };
            compute_weighted_index(config, &weights, &aggregates)?
        }
        cli::Method::Baseline => {
            let (Some(start), Some(end)) = (args.start, args.end) else {
                return Err(anyhow::anyhow!("Baseline requires --start and --end"));
            };
            compute_baseline_series(start, end, &dataset.categories, &dataset.items, &dataset.prices)?
                .into_iter()
                .map(|(date, index)| IndexRecord { date, index, base_date: start })
                .collect()
        }
    };

    spinner.finish_and_clear();
    anyhow::Ok(records)
}
