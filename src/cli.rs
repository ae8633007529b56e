use crate::config::BaseMode;

/// Which index to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Unweighted geometric-mean index.
    Cavallo,
    /// Category-weighted index.
    Tmall,
    /// Daily CPI over a fixed date range, 1.0 at the start date.
    Baseline,
}

impl Method {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "cavallo" => Some(Method::Cavallo),
            "tmall" => Some(Method::Tmall),
            "baseline" => Some(Method::Baseline),
            _ => None,
        }
    }
}

/// Structure representing command-line arguments.
#[derive(Debug)]
pub struct Args {
    pub input: std::path::PathBuf,
    pub output: std::path::PathBuf,
    pub method: Method,
    pub base_mode: BaseMode,
    pub base_date: Option<chrono::NaiveDate>,
    pub start: Option<chrono::NaiveDate>,
    pub end: Option<chrono::NaiveDate>,
    pub threads: Option<usize>,
    pub check: bool,
    pub validate: bool,
}

/// Command-line arguments parser using Clap.
impl Args {
    /// Parses command-line arguments using `clap`.
    ///
    /// Exits with a usage message if required arguments are missing or invalid.
    pub fn parse() -> Self {
        Self::parse_from(std::env::args_os())
    }

    /// Parses arguments from an explicit iterator (first item is the binary name).
    pub fn parse_from<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = command().get_matches_from(args);
        Self::from_matches(&matches)
    }

    /// Like [`Args::parse_from`] but returns parse errors instead of exiting.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = command().try_get_matches_from(args)?;
        Ok(Self::from_matches(&matches))
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        Args {
            input: matches.get_one::<std::path::PathBuf>("input").cloned().unwrap_or_default(),
            output: matches.get_one::<std::path::PathBuf>("output").cloned().unwrap_or_default(),
            method: matches.get_one::<Method>("method").copied().unwrap_or(Method::Cavallo),
            base_mode: matches.get_one::<BaseMode>("base-mode").copied().unwrap_or(BaseMode::Auto),
            base_date: matches.get_one::<chrono::NaiveDate>("base-date").copied(),
            start: matches.get_one::<chrono::NaiveDate>("start").copied(),
            end: matches.get_one::<chrono::NaiveDate>("end").copied(),
            threads: matches.get_one::<usize>("threads").cloned(),
            check: matches.get_flag("check"),
            validate: matches.get_flag("validate"),
        }
    }
}

fn command() -> clap::Command {
    clap::Command::new("price-index")
        .version("0.1.0")
        .about("Compute daily price indices from category, item and price tables")
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("Directory with categories.csv, products.csv, prices.csv (and optionally category_daily.csv)")
                .required(true)
                .num_args(1)
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::Arg::new("output")
            .short('o')
            .long("output")
            .help("Path of the index CSV to write")
            .required(true)
            .num_args(1)
            .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::Arg::new("method")
            .short('m')
            .long("method")
            .help("Index to compute. Available: cavallo, tmall, baseline")
            .num_args(1)
            .default_value("cavallo")
            .value_parser(clap::builder::ValueParser::new(parse_method)),
        )
        .arg(
            clap::Arg::new("base-mode")
            .long("base-mode")
            .help("Base period policy. Available: auto, monthly, fixed")
            .num_args(1)
            .default_value("auto")
            .value_parser(clap::builder::ValueParser::new(parse_base_mode)),
        )
        .arg(
            clap::Arg::new("base-date")
            .long("base-date")
            .help("Base date (YYYY-MM-DD), required with --base-mode fixed")
            .num_args(1)
            .required_if_eq("base-mode", "fixed")
            .value_parser(clap::builder::ValueParser::new(parse_date)),
        )
        .arg(
            clap::Arg::new("start")
            .long("start")
            .help("First day of the baseline range (YYYY-MM-DD)")
            .num_args(1)
            .required_if_eq("method", "baseline")
            .requires("end")
            .value_parser(clap::builder::ValueParser::new(parse_date)),
        )
        .arg(
            clap::Arg::new("end")
            .long("end")
            .help("Last day of the baseline range (YYYY-MM-DD)")
            .num_args(1)
            .requires("start")
            .value_parser(clap::builder::ValueParser::new(parse_date)),
        )
        .arg(
            clap::Arg::new("threads")
            .short('t')
            .long("threads")
            .help("Number of threads to use (default: all available)")
            .num_args(1)
            .value_parser(clap::builder::ValueParser::new(parse_usize_positive)),
        )
        .arg(
            clap::Arg::new("check")
            .short('c')
            .long("check")
            .help("After computing, print the first 5 records")
            .required(false)
            .action(clap::ArgAction::SetTrue)
        )
        .arg(
            clap::Arg::new("validate")
            .long("validate")
            .help("Check price coverage and category weights before computing")
            .required(false)
            .action(clap::ArgAction::SetTrue)
        )
}

/// Validates that the number of threads is a positive integer.
///
/// # Arguments
/// * `s` - String representation of the number of threads.
///
/// # Returns
/// * `Result<usize>` - Validated number of threads.
fn parse_usize_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("Must be a positive integer".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("Not a valid number: {}", e)),
    }
}

fn parse_method(s: &str) -> Result<Method, String> {
    Method::from_name(s).ok_or_else(|| format!("Unknown method '{}'", s))
}

fn parse_base_mode(s: &str) -> Result<BaseMode, String> {
    s.parse::<BaseMode>().map_err(|e| e.to_string())
}

fn parse_date(s: &str) -> Result<chrono::NaiveDate, String> {
    crate::utils::parse_date(s).map_err(|e| e.to_string())
}
