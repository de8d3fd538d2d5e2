// duodata - run DUO dataset passes from the command line

mod exit_codes;

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use duodata_config::Settings;
use duodata_io::TableKind;
use duodata_pipeline::{
    find_available_datasets, lookup, reference_date_from_file_name, run_pass, DatasetDef,
    JsonLinesSink, PassInput, PassOptions, PipelineError, ReferenceDate, DATASETS,
};

use exit_codes::{EXIT_PASS, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "duodata")]
#[command(about = "Decode, normalize and merge published DUO education datasets")]
#[command(long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("DUODATA_BUILD_COMMIT"), ")"))]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the user config dir)
    #[arg(long, global = true, env = "DUODATA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered datasets
    Datasets,

    /// Print the listing pages a dataset's files are published on
    Listings {
        /// Dataset id (see `duodata datasets`)
        dataset: String,
    },

    /// Find downloadable files on a saved listing page
    #[command(after_help = "\
Examples:
  duodata discover adressen.html
  duodata discover leerlingen.html --extension zip
  duodata discover bron.html --dataset po_students_in_bron")]
    Discover {
        /// Listing page (HTML)
        listing: PathBuf,

        /// File extension to look for [default: csv, or the dataset's own]
        #[arg(long, conflicts_with = "dataset")]
        extension: Option<String>,

        /// Look for the files of this dataset
        #[arg(long)]
        dataset: Option<String>,
    },

    /// Run one dataset pass over a local file
    #[command(after_help = "\
Examples:
  duodata run po_weights_per_school 2012-10-01.csv
  duodata run vo_board_staff personeel.xlsx --reference-date 2013-10-01 --out staff.jsonl
  RUST_LOG=debug duodata run po_student_residences 2012-10-01.zip")]
    Run {
        /// Dataset id (see `duodata datasets`)
        dataset: String,

        /// Source file (csv, xls, xlsx or zip)
        file: PathBuf,

        /// Reference date (YYYY-MM-DD); defaults to the file name
        #[arg(long, value_name = "DATE")]
        reference_date: Option<NaiveDate>,

        /// Locator recorded as provenance; defaults to the file path
        #[arg(long, value_name = "URL")]
        locator: Option<String>,

        /// Output file for JSON lines (omit for stdout)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },
}

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

    pub fn pass(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_PASS,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::UnknownDataset(_) => {
                Self::usage(err.to_string()).with_hint("run `duodata datasets` for the list")
            }
            PipelineError::Decode { .. } | PipelineError::Sink(_) => Self::pass(err.to_string()),
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Datasets => cmd_datasets(),
        Commands::Listings { dataset } => cmd_listings(&dataset),
        Commands::Discover {
            listing,
            extension,
            dataset,
        } => cmd_discover(
            cli.config.as_deref(),
            &listing,
            extension.as_deref(),
            dataset.as_deref(),
        ),
        Commands::Run {
            dataset,
            file,
            reference_date,
            locator,
            out,
        } => cmd_run(
            cli.config.as_deref(),
            &dataset,
            &file,
            reference_date,
            locator,
            out,
        ),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError {
            code,
            message,
            hint,
        }) => {
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

fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    Settings::load_or_default(path).map_err(|e| CliError::usage(e.to_string()))
}

fn cmd_datasets() -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for def in DATASETS {
        writeln!(
            out,
            "{:<40} {:<13} {:<4} {}",
            def.id,
            def.entity.as_str(),
            def.extension,
            def.field
        )
        .map_err(|e| CliError::pass(e.to_string()))?;
    }
    Ok(())
}

fn find_dataset(id: &str) -> Result<&'static DatasetDef, CliError> {
    lookup(id).ok_or_else(|| CliError::from(PipelineError::UnknownDataset(id.to_string())))
}

fn cmd_listings(dataset: &str) -> Result<(), CliError> {
    let def = find_dataset(dataset)?;
    for url in def.listing_urls() {
        println!("{}", url);
    }
    Ok(())
}

fn cmd_discover(
    config: Option<&Path>,
    listing: &Path,
    extension: Option<&str>,
    dataset: Option<&str>,
) -> Result<(), CliError> {
    let extension = match (extension, dataset) {
        (Some(extension), _) => extension,
        (None, Some(id)) => find_dataset(id)?.extension,
        (None, None) => "csv",
    };
    let settings = load_settings(config)?;
    let html = fs::read_to_string(listing)
        .map_err(|e| CliError::usage(format!("cannot read '{}': {}", listing.display(), e)))?;

    let found = find_available_datasets(&html, extension, &settings.host_root);
    log::info!("{} files with extension '{}' found", found.len(), extension);

    let listed: serde_json::Map<String, serde_json::Value> = found
        .into_iter()
        .map(|(locator, date)| (locator, date.format("%Y-%m-%d").to_string().into()))
        .collect();
    let json = serde_json::to_string_pretty(&listed).map_err(|e| CliError::pass(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn cmd_run(
    config: Option<&Path>,
    dataset: &str,
    file: &Path,
    reference_date: Option<NaiveDate>,
    locator: Option<String>,
    out: Option<PathBuf>,
) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let def = find_dataset(dataset)?;

    let reference_date = reference_date
        .or_else(|| reference_date_from_file_name(file))
        .ok_or_else(|| {
            CliError::usage(format!(
                "no reference date for '{}'",
                file.display()
            ))
            .with_hint("name the file <YYYY-MM-DD>.<ext> or pass --reference-date")
        })?;

    let path = file.to_string_lossy();
    let kind = TableKind::from_path(&path).map_err(|e| CliError::usage(e.to_string()))?;
    let bytes = fs::read(file)
        .map_err(|e| CliError::usage(format!("cannot read '{}': {}", file.display(), e)))?;

    let options = PassOptions {
        decode: settings
            .decode_options()
            .map_err(|e| CliError::usage(e.to_string()))?,
        redaction_marker: settings.redaction_marker.clone(),
    };
    let locator = locator.unwrap_or_else(|| path.to_string());
    let input = PassInput {
        bytes: &bytes,
        kind,
        locator: &locator,
        reference_date: ReferenceDate(reference_date),
    };

    let writer: Box<dyn Write> = match &out {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|e| {
            CliError::usage(format!("cannot create '{}': {}", path.display(), e))
        })?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut sink = JsonLinesSink::new(writer);
    let stats = run_pass(def, &input, &options, &mut sink)?;
    sink.into_inner()?;

    if stats.rows_skipped > 0 || stats.coercion_failures > 0 {
        eprintln!(
            "note: {} of {} rows skipped, {} cells could not be coerced",
            stats.rows_skipped, stats.rows, stats.coercion_failures
        );
    }
    Ok(())
}
