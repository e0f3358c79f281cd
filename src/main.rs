use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use report_tools::config::{
    DEFAULT_DOWNLOAD_DIR, DEFAULT_LOG_LEVEL, DEFAULT_SCREENSHOT_DIR, Settings,
};
use report_tools::consolidate::ConsolidationJob;
use report_tools::files::{FileManager, OverwritePolicy};
use report_tools::{Result, logging, naming, validate};
use serde::Serialize;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = logging::init_logging(&cli.log_level) {
        eprintln!("warning: {error}");
    }
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = cli.settings();
    match cli.command {
        Command::Filename(args) => {
            let name = naming::build_report_filename(
                &args.report_type,
                &args.tenant,
                args.period.as_deref(),
                &args.extension,
            );
            println!("{name}");
            Ok(())
        }
        Command::Validate { path } => {
            let inspection = validate::inspect_spreadsheet(&path);
            let valid = validate::validate_spreadsheet(&path);
            print_json(&serde_json::json!({
                "path": path,
                "valid": valid,
                "reason": inspection.err().map(|failure| failure.to_string()),
            }))
        }
        command => {
            let manager = FileManager::new(settings)?;
            execute(&manager, command)
        }
    }
}

fn execute(manager: &FileManager, command: Command) -> Result<()> {
    match command {
        Command::Consolidate(args) => {
            let job = ConsolidationJob::new(args.sources, args.output).with_prefixes(args.prefix);
            print_json(&manager.consolidate(&job)?)
        }
        Command::List => print_json(&manager.list_files()?),
        Command::Cleanup { max_age_days } => {
            let deleted = manager.cleanup(max_age_days)?;
            print_json(&serde_json::json!({ "deleted": deleted }))
        }
        Command::Rename {
            original,
            new_filename,
            policy,
        } => {
            let path = manager.rename_download(&original, &new_filename, policy.into())?;
            print_json(&manager.file_info(&path)?)
        }
        Command::Info { path } => print_json(&manager.file_info(&path)?),
        Command::Filename(_) | Command::Validate { .. } => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Manage downloaded report workbooks and consolidate them into one."
)]
struct Cli {
    /// Directory holding downloads and consolidated outputs.
    #[arg(long, env = "DOWNLOAD_DIR", default_value = DEFAULT_DOWNLOAD_DIR, global = true)]
    download_dir: PathBuf,

    /// Directory holding screenshots.
    #[arg(long, env = "SCREENSHOT_DIR", default_value = DEFAULT_SCREENSHOT_DIR, global = true)]
    screenshot_dir: PathBuf,

    /// Tracing filter used when RUST_LOG is not set.
    #[arg(long, env = "LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL, global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            download_dir: self.download_dir.clone(),
            screenshot_dir: self.screenshot_dir.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Merge several workbooks into one file in the download directory.
    Consolidate(ConsolidateArgs),
    /// Check that a file looks like a ZIP-based spreadsheet.
    Validate { path: PathBuf },
    /// List files in the download directory, newest first.
    List,
    /// Delete files older than the retention period.
    Cleanup {
        #[arg(long, default_value_t = 30)]
        max_age_days: u32,
    },
    /// Move a file into the download directory under a new name.
    Rename {
        original: PathBuf,
        new_filename: String,
        #[arg(long, value_enum, default_value_t = PolicyArg::Overwrite)]
        policy: PolicyArg,
    },
    /// Print metadata for a file.
    Info { path: PathBuf },
    /// Print a timestamped report file name.
    Filename(FilenameArgs),
}

#[derive(clap::Args)]
struct ConsolidateArgs {
    /// Output file name, created inside the download directory.
    #[arg(long)]
    output: String,

    /// Sheet-name prefix for the source at the same position; repeatable.
    #[arg(long)]
    prefix: Vec<String>,

    /// Source workbooks in consolidation order.
    #[arg(required = true)]
    sources: Vec<PathBuf>,
}

#[derive(clap::Args)]
struct FilenameArgs {
    /// Report type such as `activity_statement`.
    #[arg(long)]
    report_type: String,

    /// Tenant the report belongs to.
    #[arg(long)]
    tenant: String,

    /// Optional period such as `2026-01`.
    #[arg(long)]
    period: Option<String>,

    #[arg(long, default_value = "xlsx")]
    extension: String,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PolicyArg {
    Fail,
    Overwrite,
    AutoRename,
}

impl From<PolicyArg> for OverwritePolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Fail => OverwritePolicy::Fail,
            PolicyArg::Overwrite => OverwritePolicy::Overwrite,
            PolicyArg::AutoRename => OverwritePolicy::AutoRename,
        }
    }
}
