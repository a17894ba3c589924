//! `waybill` — e-way-bill dataset processing from the command line.

mod exit_codes;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use waybill_core::store::DatasetStore;
use waybill_core::{aggregate, compare, normalize, reconcile, PipelineConfig, PipelineError, Table};
use waybill_io::{csv as csv_io, xlsx, FileStore};

use exit_codes::*;

#[derive(Parser)]
#[command(name = "waybill")]
#[command(about = "Normalize, reconcile and summarize e-way-bill spreadsheets")]
#[command(version)]
struct Cli {
    /// Config file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a raw e-way-bill export: derive party fields, round
    /// values, drop self-transactions and duplicate rows
    #[command(after_help = "\
Examples:
  waybill process ewaybills.xlsx
  waybill process ewaybills.xlsx -o normalized.xlsx --save-session")]
    Process {
        /// Raw export file (xlsx, xls or csv)
        input: PathBuf,

        /// Output workbook (defaults to the processed directory)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Persist the result under a fresh session id
        #[arg(long)]
        save_session: bool,
    },

    /// Reconcile a dataset against a reference price list; rows no price
    /// entry matched are highlighted yellow in the output workbook
    #[command(after_help = "\
Examples:
  waybill clean ewaybills.xlsx prices.xlsx
  waybill clean ewaybills.xlsx prices.xlsx -o cleaned.xlsx --save-session")]
    Clean {
        /// Primary dataset (xlsx, xls or csv)
        primary: PathBuf,

        /// Reference price list
        prices: PathBuf,

        /// Output workbook (defaults to the processed directory)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Persist the result under a fresh session id
        #[arg(long)]
        save_session: bool,
    },

    /// Buyer summary: value per buyer and product, with buyer grand totals
    Summary {
        /// Dataset file (omit when using --session)
        #[arg(required_unless_present = "session")]
        input: Option<PathBuf>,

        /// Load the dataset saved under this session id
        #[arg(long, conflicts_with = "input")]
        session: Option<String>,

        /// Also write the summary as a workbook
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List the sellers present in a dataset
    Sellers {
        /// Dataset file (omit when using --session)
        #[arg(required_unless_present = "session")]
        input: Option<PathBuf>,

        /// Load the dataset saved under this session id
        #[arg(long, conflicts_with = "input")]
        session: Option<String>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Compare two sellers: shared buyers, unique buyers, per-product lines
    #[command(after_help = "\
Examples:
  waybill compare 'STEEL WORKS' 'NORTHERN ALLOYS' ewaybills.xlsx
  waybill compare 'STEEL WORKS' 'NORTHERN ALLOYS' --session 3f2a... --page 2")]
    Compare {
        /// First seller, by display name
        seller1: String,

        /// Second seller, by display name
        seller2: String,

        /// Dataset file (omit when using --session)
        #[arg(required_unless_present = "session")]
        input: Option<PathBuf>,

        /// Load the dataset saved under this session id
        #[arg(long, conflicts_with = "input")]
        session: Option<String>,

        /// Buyer page to show
        #[arg(long, default_value = "1")]
        page: usize,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Process {
            input,
            output,
            save_session,
        } => cmd_process(&config, &input, output, save_session),
        Commands::Clean {
            primary,
            prices,
            output,
            save_session,
        } => cmd_clean(&config, &primary, &prices, output, save_session),
        Commands::Summary {
            input,
            session,
            output,
            json,
        } => cmd_summary(&config, input.as_deref(), session.as_deref(), output, json),
        Commands::Sellers {
            input,
            session,
            json,
        } => cmd_sellers(&config, input.as_deref(), session.as_deref(), json),
        Commands::Compare {
            seller1,
            seller2,
            input,
            session,
            page,
            json,
        } => cmd_compare(
            &config,
            &seller1,
            &seller2,
            input.as_deref(),
            session.as_deref(),
            page,
            json,
        ),
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_USAGE,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_ERROR,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn source(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_SOURCE_READ,
            message: msg.into(),
            hint: None,
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        let code = match &err {
            PipelineError::SourceRead(_) => EXIT_SOURCE_READ,
            PipelineError::Schema { .. } => EXIT_SCHEMA,
            PipelineError::Aggregation { .. } => EXIT_AGGREGATION,
            PipelineError::UnknownSeller(_) => EXIT_UNKNOWN_SELLER,
            PipelineError::ConfigParse(_) | PipelineError::ConfigValidation(_) => EXIT_USAGE,
            PipelineError::Store(_) => EXIT_ERROR,
        };
        let hint = match &err {
            PipelineError::UnknownSeller(_) => {
                Some("run 'waybill sellers' to list seller names in the dataset".to_string())
            }
            PipelineError::Schema { .. } => {
                Some("headers are matched ignoring case, spaces and underscores".to_string())
            }
            _ => None,
        };
        Self {
            code,
            message: err.to_string(),
            hint,
        }
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, CliError> {
    match path {
        None => Ok(PipelineConfig::default()),
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| CliError::usage(format!("cannot read {}: {}", path.display(), e)))?;
            Ok(PipelineConfig::from_toml(&text)?)
        }
    }
}

/// Reject inputs the pipeline should never attempt to parse: unknown
/// extensions and oversized files.
fn check_upload(config: &PipelineConfig, path: &Path) -> Result<(), CliError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if !config.allows_extension(ext) {
        return Err(CliError::usage(format!(
            "unsupported file type '{}' for {}",
            ext,
            path.display()
        ))
        .with_hint(format!(
            "accepted extensions: {}",
            config.allowed_extensions.join(", ")
        )));
    }

    let metadata = fs::metadata(path)
        .map_err(|e| CliError::source(format!("cannot read {}: {}", path.display(), e)))?;
    if metadata.len() > config.max_upload_bytes {
        return Err(CliError::usage(format!(
            "{} is {} bytes, over the {} byte limit",
            path.display(),
            metadata.len(),
            config.max_upload_bytes
        )));
    }
    Ok(())
}

fn read_table(path: &Path) -> Result<Table, CliError> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    let result = if is_csv {
        csv_io::import(path)
    } else {
        xlsx::import(path)
    };
    result.map_err(CliError::source)
}

fn dataset_key(session: &str) -> String {
    format!("{session}-dataset")
}

fn load_dataset(
    config: &PipelineConfig,
    input: Option<&Path>,
    session: Option<&str>,
) -> Result<Table, CliError> {
    match (input, session) {
        (Some(path), _) => {
            check_upload(config, path)?;
            read_table(path)
        }
        (None, Some(id)) => {
            let store = FileStore::new(&config.cache_dir);
            store
                .get(&dataset_key(id))?
                .ok_or_else(|| {
                    CliError::usage(format!("session '{id}' has no stored dataset")).with_hint(
                        "run 'waybill process --save-session' or 'waybill clean --save-session' first",
                    )
                })
        }
        (None, None) => Err(CliError::usage("an input file or --session is required")),
    }
}

fn save_session_dataset(config: &PipelineConfig, table: &Table) -> Result<String, CliError> {
    let mut store = FileStore::new(&config.cache_dir);
    let id = FileStore::new_session_id();
    store.put(&dataset_key(&id), table)?;
    Ok(id)
}

fn default_output(
    config: &PipelineConfig,
    prefix: &str,
    input: &Path,
) -> Result<PathBuf, CliError> {
    fs::create_dir_all(&config.processed_dir).map_err(|e| {
        CliError::io(format!(
            "cannot create {}: {}",
            config.processed_dir.display(),
            e
        ))
    })?;
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    Ok(config.processed_dir.join(format!("{prefix}_{stem}.xlsx")))
}

fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_process(
    config: &PipelineConfig,
    input: &Path,
    output: Option<PathBuf>,
    save_session: bool,
) -> Result<(), CliError> {
    check_upload(config, input)?;
    let raw = read_table(input)?;
    let out = normalize::normalize(&raw);
    print_warnings(&out.report.warnings);

    let path = match output {
        Some(path) => path,
        None => default_output(config, "normalized", input)?,
    };
    xlsx::export(&out.table, &path).map_err(CliError::io)?;

    println!("rows:                  {}", out.table.rows.len());
    println!("self rows removed:     {}", out.report.self_rows_removed);
    println!("duplicates removed:    {}", out.report.duplicate_rows_removed);
    println!("wrote {}", path.display());

    if save_session {
        let id = save_session_dataset(config, &out.table)?;
        println!("session: {id}");
    }
    Ok(())
}

fn cmd_clean(
    config: &PipelineConfig,
    primary: &Path,
    prices: &Path,
    output: Option<PathBuf>,
    save_session: bool,
) -> Result<(), CliError> {
    check_upload(config, primary)?;
    check_upload(config, prices)?;
    let primary_table = read_table(primary)?;
    let price_table = read_table(prices)?;

    let out = reconcile::clean(&primary_table, &price_table, &config.price_year_token)?;
    print_warnings(&out.warnings);

    let path = match output {
        Some(path) => path,
        None => default_output(config, "cleaned", primary)?,
    };
    let not_updated: Vec<bool> = out.updated.iter().map(|u| !u).collect();
    xlsx::export_highlighted(&out.table, Some(&not_updated), &path).map_err(CliError::io)?;

    println!("rows:                  {}", out.stats.total_rows);
    println!("updated:               {}", out.stats.updated_rows);
    println!("not updated:           {}", out.stats.not_updated_rows);
    println!("eligible price codes:  {}", out.stats.matched_codes);
    println!("wrote {}", path.display());

    if save_session {
        let id = save_session_dataset(config, &out.table)?;
        println!("session: {id}");
    }
    Ok(())
}

fn cmd_summary(
    config: &PipelineConfig,
    input: Option<&Path>,
    session: Option<&str>,
    output: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let mut table = load_dataset(config, input, session)?;
    // Raw exports first pass through normalization; stored and pre-processed
    // datasets already carry the derived columns.
    if !table.has_column(normalize::COL_TAX_ID) {
        let out = normalize::normalize(&table);
        print_warnings(&out.report.warnings);
        table = out.table;
    }

    let rows = aggregate::buyer_summary(&table)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).map_err(|e| CliError::io(e.to_string()))?
        );
    } else {
        println!(
            "{:<12} {:<30} {:<24} {:>14} {:>14}",
            "PAN", "NAME", "PRODUCT", "VALUE", "TOTAL"
        );
        for row in &rows {
            println!(
                "{:<12} {:<30} {:<24} {:>14.0} {:>14.0}",
                row.tax_id, row.name, row.product, row.product_value, row.total_value
            );
        }
    }

    if let Some(path) = output {
        xlsx::export(&aggregate::to_table(&rows), &path).map_err(CliError::io)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_sellers(
    config: &PipelineConfig,
    input: Option<&Path>,
    session: Option<&str>,
    json: bool,
) -> Result<(), CliError> {
    let table = load_dataset(config, input, session)?;
    let analysis = compare::seller_analysis(&table, &config.price_year_token)?;
    print_warnings(&analysis.warnings);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&analysis.sellers)
                .map_err(|e| CliError::io(e.to_string()))?
        );
    } else {
        for seller in &analysis.sellers {
            println!("{:<12} {}", seller.tax_id, seller.name);
        }
    }
    Ok(())
}

fn cmd_compare(
    config: &PipelineConfig,
    seller1: &str,
    seller2: &str,
    input: Option<&Path>,
    session: Option<&str>,
    page: usize,
    json: bool,
) -> Result<(), CliError> {
    let table = load_dataset(config, input, session)?;
    let report = compare::compare_sellers(
        &table,
        seller1,
        seller2,
        page,
        config.buyers_per_page,
        &config.price_year_token,
    )?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).map_err(|e| CliError::io(e.to_string()))?
        );
        return Ok(());
    }

    for side in [&report.seller1, &report.seller2] {
        println!(
            "{} ({}): value {:.0}, quantity {:.3}",
            side.name, side.tax_id, side.total_value, side.total_quantity
        );
    }
    println!("common buyers:  {}", report.common_buyers.join(", "));
    println!(
        "only {}: {}",
        report.seller1.name,
        report.seller1_unique.join(", ")
    );
    println!(
        "only {}: {}",
        report.seller2.name,
        report.seller2_unique.join(", ")
    );

    println!("page {}/{}", report.page, report.total_pages);
    for buyer in &report.page_buyers {
        println!("{buyer}");
        for side in [&report.seller1, &report.seller2] {
            for line in side.lines.iter().filter(|l| &l.buyer == buyer) {
                println!(
                    "  {:<30} {:<24} {:>14.0} {:>10.3}",
                    side.name, line.product, line.value, line.quantity
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_checks_reject_extension_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            max_upload_bytes: 4,
            ..PipelineConfig::default()
        };

        let exe = dir.path().join("data.exe");
        fs::write(&exe, b"x").unwrap();
        assert_eq!(check_upload(&config, &exe).unwrap_err().code, EXIT_USAGE);

        let big = dir.path().join("big.csv");
        fs::write(&big, b"12345").unwrap();
        assert_eq!(check_upload(&config, &big).unwrap_err().code, EXIT_USAGE);

        let ok = dir.path().join("ok.csv");
        fs::write(&ok, b"ab").unwrap();
        assert!(check_upload(&config, &ok).is_ok());
    }

    #[test]
    fn missing_input_is_a_source_error() {
        let config = PipelineConfig::default();
        let err = check_upload(&config, Path::new("/no/such/file.csv")).unwrap_err();
        assert_eq!(err.code, EXIT_SOURCE_READ);
    }

    #[test]
    fn pipeline_errors_map_to_registered_exit_codes() {
        let err: CliError = PipelineError::UnknownSeller("X".into()).into();
        assert_eq!(err.code, EXIT_UNKNOWN_SELLER);
        assert!(err.hint.is_some());

        let err: CliError = PipelineError::Aggregation {
            column: "VALUE".into(),
            discovered: vec![],
        }
        .into();
        assert_eq!(err.code, EXIT_AGGREGATION);

        let err: CliError = PipelineError::SourceRead("bad".into()).into();
        assert_eq!(err.code, EXIT_SOURCE_READ);
    }

    #[test]
    fn default_output_uses_prefix_and_stem() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            processed_dir: dir.path().join("out"),
            ..PipelineConfig::default()
        };
        let path = default_output(&config, "normalized", Path::new("bills/july.xlsx")).unwrap();
        assert_eq!(path, config.processed_dir.join("normalized_july.xlsx"));
        assert!(config.processed_dir.is_dir());
    }

    #[test]
    fn session_round_trip_through_the_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            cache_dir: dir.path().to_path_buf(),
            ..PipelineConfig::default()
        };

        let mut t = Table::new(vec!["PAN".into()]);
        t.push_row(vec![waybill_core::Value::text("AACI6306G1")]);

        let id = save_session_dataset(&config, &t).unwrap();
        let back = load_dataset(&config, None, Some(&id)).unwrap();
        assert_eq!(back, t);

        let err = load_dataset(&config, None, Some("missing")).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
    }
}
