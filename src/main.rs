use clap::{Parser, Subcommand};
use restman::domain::RequestSpec;
use restman::engine::{benchmark, http};
use restman::history::HistoryLedger;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "restman",
    version,
    about = "Headless HTTP request engine with sandboxed scripts and a load-test harness"
)]
struct Cli {
    /// Log at debug level (also via RESTMAN_LOG / RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute one request described by a JSON spec file
    Send {
        /// Path to a RequestSpec JSON file
        file: PathBuf,
    },
    /// Run a load test against the request in a JSON spec file
    Bench {
        /// Path to a RequestSpec JSON file
        file: PathBuf,
        /// Number of concurrent virtual users
        #[arg(short, long, default_value_t = 1)]
        concurrency: u32,
        /// Sequential requests per virtual user
        #[arg(short, long, default_value_t = 1)]
        loops: u32,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    restman::logger::init_logging(cli.verbose);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("restman: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Send { file } => {
            let spec = load_spec(&file)?;
            let history = HistoryLedger::new();
            let outcome = http::execute(&spec, &history).await;
            print_json(&outcome)
        }
        Command::Bench {
            file,
            concurrency,
            loops,
        } => {
            let spec = load_spec(&file)?;
            let report = benchmark::run_load(&spec, concurrency, loops)
                .await
                .map_err(|err| err.to_string())?;
            print_json(&report)
        }
    }
}

fn load_spec(path: &Path) -> Result<RequestSpec, String> {
    let content = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    serde_json::from_str(&content).map_err(|err| format!("invalid request spec: {err}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{json}");
    Ok(())
}
