//! `altos-dashboard` CLI: composition root for the listings dashboard backend.

use std::path::PathBuf;
use std::sync::Arc;

use app_lib::app::charts::HISTOGRAM_COLUMNS;
use app_lib::app::{
    histogram, map_points, preview, write_export, CsvExporter, DashboardSession, DateRange,
    ListingsAssembler, unique_sorted, ZipSelection,
};
use app_lib::error::{exit_status, AppError};
use app_lib::infra::config::{resolve_secrets_path, ENV_DB_USERNAME};
use app_lib::infra::{init_db, ConnectionProvider, SecretsStore};
use app_lib::query::{Dataset, ExecutorConfig, QueryExecutor};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value as JsonValue};

#[derive(Parser)]
#[command(
    name = "altos-dashboard",
    version,
    about = "Query rental listings by date range, filter by zip code, export CSV"
)]
struct Cli {
    #[arg(long, global = true, help = "Secrets JSON file (default: config dir or ALTOS_SECRETS_PATH)")]
    secrets: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct RangeArgs {
    #[arg(long, help = "First listing date, inclusive (YYYY-MM-DD)")]
    start: NaiveDate,
    #[arg(long, help = "Last listing date, inclusive (YYYY-MM-DD)")]
    end: NaiveDate,
}

#[derive(Args)]
struct ZipArgs {
    #[arg(long = "zip", help = "Zip code to keep; repeatable. Nothing chosen keeps nothing")]
    zips: Vec<String>,
    #[arg(long, conflicts_with = "zips", help = "Keep every zip code in the loaded data")]
    all_zips: bool,
}

impl ZipArgs {
    fn selection(&self) -> ZipSelection {
        if self.all_zips {
            ZipSelection::All
        } else {
            ZipSelection::Only(self.zips.clone())
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "List distinct zip codes in the database")]
    Zips,
    #[command(about = "Print the first rows of the filtered listings as JSON")]
    Preview {
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        zips: ZipArgs,
        #[arg(long, default_value_t = 10, help = "Rows to show")]
        rows: usize,
    },
    #[command(about = "Write the filtered listings to altos_data_<today>.csv")]
    Export {
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        zips: ZipArgs,
        #[arg(long, default_value = ".", help = "Output directory")]
        out: PathBuf,
    },
    #[command(about = "Counts per bedroom or bathroom value")]
    Histogram {
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        zips: ZipArgs,
        #[arg(
            long,
            value_parser = clap::builder::PossibleValuesParser::new(HISTOGRAM_COLUMNS.iter().copied()),
            default_value = "bedrooms"
        )]
        column: String,
    },
    #[command(about = "Latitude/longitude points of the filtered listings")]
    Map {
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        zips: ZipArgs,
    },
    #[command(about = "Report whether ALTOS_DB_USERNAME matches the stored secret")]
    CheckEnv,
    #[command(about = "Create or migrate a local database file")]
    InitDb { path: PathBuf },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            if let AppError::Connection(msg) = &e {
                // Nothing downstream has data to show; stop quietly.
                log::error!("Database connection failed: {}", msg);
            }
            let (code, line) = exit_status(&e);
            if let Some(line) = line {
                eprintln!("{}", line);
            }
            code
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<(), AppError> {
    let secrets = SecretsStore::load(&resolve_secrets_path(cli.secrets.as_deref()))?;

    match cli.command {
        Command::CheckEnv => {
            let matches = secrets.env_matches_secret(ENV_DB_USERNAME)?;
            println!("Has environment variables been set: {}", matches);
            Ok(())
        }
        Command::InitDb { path } => {
            let session = init_db(&path)?;
            drop(session);
            println!("{}", path.display());
            Ok(())
        }
        command => {
            let mut provider = ConnectionProvider::new(secrets.db_credentials()?);
            let session = provider.get_connection()?;
            let mut assembler =
                ListingsAssembler::new(QueryExecutor::new(session, ExecutorConfig::default()));
            let outcome = dispatch(command, &mut assembler);
            if let Err(e) = provider.shutdown() {
                log::warn!("Shutdown failed: {}", e);
            }
            outcome
        }
    }
}

fn dispatch(command: Command, assembler: &mut ListingsAssembler) -> Result<(), AppError> {
    match command {
        Command::Zips => {
            let ds = assembler.get_zip_codes()?;
            let zips = ds.column("zip").map(unique_sorted).unwrap_or_default();
            for zip in zips.iter() {
                println!("{}", zip);
            }
            Ok(())
        }
        Command::Preview { range, zips, rows } => {
            let mut session = load(assembler, &range)?;
            let kept = filtered(&mut session, &zips)?;
            print_json(&json!({
                "total_rows": kept.len(),
                "rows": rows_as_json(&preview(kept, rows)),
            }))
        }
        Command::Export { range, zips, out } => {
            let mut session = load(assembler, &range)?;
            filtered(&mut session, &zips)?;
            let mut exporter = CsvExporter::new();
            let blob = session.export_csv(&mut exporter)?;
            let path = write_export(&out, today(), &blob)?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Histogram {
            range,
            zips,
            column,
        } => {
            let mut session = load(assembler, &range)?;
            let bins = histogram(filtered(&mut session, &zips)?, &column)?;
            print_json(&json!({ "column": column, "bins": bins }))
        }
        Command::Map { range, zips } => {
            let mut session = load(assembler, &range)?;
            let points = map_points(filtered(&mut session, &zips)?)?;
            print_json(&json!({ "points": points }))
        }
        Command::CheckEnv | Command::InitDb { .. } => Ok(()),
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn load(
    assembler: &mut ListingsAssembler,
    range: &RangeArgs,
) -> Result<DashboardSession, AppError> {
    let mut session = DashboardSession::new();
    session.set_dates(DateRange::new(range.start, range.end, today())?)?;
    let data: Arc<Dataset> = session.trigger_query(assembler)?;
    log::info!(
        "{} listings loaded across {} zip codes",
        data.len(),
        session.zip_options().len()
    );
    Ok(session)
}

fn filtered<'a>(session: &'a mut DashboardSession, zips: &ZipArgs) -> Result<&'a Dataset, AppError> {
    session.apply_filter(&zips.selection())
}

fn rows_as_json(ds: &Dataset) -> Vec<JsonValue> {
    ds.rows
        .iter()
        .map(|row| {
            let obj: Map<String, JsonValue> = ds
                .columns
                .iter()
                .zip(row)
                .map(|(c, v)| (c.name.clone(), serde_json::to_value(v).unwrap_or(JsonValue::Null)))
                .collect();
            JsonValue::Object(obj)
        })
        .collect()
}

fn print_json(value: &JsonValue) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Export(format!("JSON serialization failed: {}", e)))?;
    println!("{}", text);
    Ok(())
}
