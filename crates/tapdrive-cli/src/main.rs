//! tapdrive CLI: launch a mirror process and drive a scripted touch gesture
//! into its stdin.

// CLI-specific lint allowances
#![allow(missing_docs)]
#![allow(clippy::print_stdout)] // CLI must print to stdout
#![allow(clippy::print_stderr)] // CLI must print to stderr
#![allow(clippy::exit)] // CLI uses exit codes

use clap::{Args, CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tapdrive::model::{GestureScript, LaunchConfig};
use tapdrive::protocol;
use tapdrive::relay::{ConsoleSink, LineSink};
use tapdrive::runner::{self, codes, HarnessConfig, HarnessError, NoopObserver, RunObserver};

mod progress;

#[derive(Debug, Parser)]
#[command(
    name = "tapdrive",
    version,
    about = "Scripted touch-gesture harness for scrcpy-style mirror processes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Launch the mirror process and run the gesture script against it.
    Run {
        /// Path to the mirror process executable.
        #[arg(long, default_value = "./x/app/scrcpy")]
        command: String,
        /// Working directory for the child (the project root).
        #[arg(long)]
        cwd: Option<PathBuf>,
        #[command(flatten)]
        script: ScriptArgs,
        /// Emit the run report as a JSON line on stdout after the run.
        #[arg(long)]
        json: bool,
        /// Per-phase spinner and per-event echo on stderr.
        #[arg(long)]
        verbose: bool,
        /// Extra arguments passed to the mirror process.
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Print the protocol lines the script would write, one per line.
    Script {
        #[command(flatten)]
        script: ScriptArgs,
    },
    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Args)]
struct ScriptArgs {
    /// Starting X coordinate of the drag.
    #[arg(long, default_value_t = 500, allow_negative_numbers = true)]
    start_x: i32,
    /// Starting Y coordinate of the drag.
    #[arg(long, default_value_t = 1200, allow_negative_numbers = true)]
    start_y: i32,
    /// Number of Move events between Down and Up.
    #[arg(long, default_value_t = 10)]
    moves: u32,
    /// X shift applied per Move event.
    #[arg(long, default_value_t = -50, allow_negative_numbers = true)]
    step_x: i32,
    /// Y shift applied per Move event.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    step_y: i32,
    /// Delay between event writes, in milliseconds.
    #[arg(long, default_value_t = 10)]
    pacing_ms: u64,
    /// Delay after spawn before the first event, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    warmup_ms: u64,
    /// Delay after the last event before teardown, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    settle_ms: u64,
}

impl From<ScriptArgs> for GestureScript {
    fn from(args: ScriptArgs) -> Self {
        Self {
            origin_x: args.start_x,
            origin_y: args.start_y,
            moves: args.moves,
            step_x: args.step_x,
            step_y: args.step_y,
            pacing_ms: args.pacing_ms,
            warmup_ms: args.warmup_ms,
            settle_ms: args.settle_ms,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            command,
            cwd,
            script,
            json,
            verbose,
            args,
        } => {
            let launch = LaunchConfig {
                command,
                args,
                cwd,
                ..LaunchConfig::default()
            };
            run_command(launch, script.into(), json, verbose)
        }
        Commands::Script { script } => print_script(&script.into()),
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "tapdrive",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_command(
    launch: LaunchConfig,
    script: GestureScript,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupt);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)).into_diagnostic()?;

    let total = script.event_count();
    let config = HarnessConfig {
        launch,
        script,
        ..HarnessConfig::default()
    };
    tracing::debug!(command = %config.launch.command, events = total, "starting run");
    let sink: Arc<dyn LineSink> = Arc::new(ConsoleSink);
    let observer: Arc<dyn RunObserver> = if verbose {
        Arc::new(progress::VerboseProgress::new(total))
    } else {
        Arc::new(NoopObserver)
    };

    match runner::run_with(&config, sink, interrupt, observer) {
        Ok(report) => {
            if json {
                let payload = serde_json::to_string(&report).into_diagnostic()?;
                println!("{payload}");
            } else {
                eprintln!(
                    "run {}: {} lines written, child exit {:?}",
                    report.run_id, report.lines_written, report.exit_status
                );
            }
            Ok(())
        }
        Err(err) => {
            if json {
                let payload = serde_json::to_string(&err.to_error_info()).into_diagnostic()?;
                println!("{payload}");
            } else {
                eprintln!("error: {err}");
            }
            std::process::exit(exit_code_for_error(&err));
        }
    }
}

fn print_script(script: &GestureScript) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for event in script.events() {
        let line = protocol::encode_line(&event)?;
        out.write_all(line.as_bytes()).into_diagnostic()?;
    }
    out.flush().into_diagnostic()?;
    Ok(())
}

fn exit_code_for_error(err: &HarnessError) -> i32 {
    match err.code {
        codes::LAUNCH => 2,
        codes::CHANNEL => 3,
        codes::PROTOCOL => 9,
        codes::IO => 10,
        _ => 1,
    }
}
