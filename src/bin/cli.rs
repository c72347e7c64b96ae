//! Cognitive kernel CLI
//!
//! Runs a single task non-interactively when given a positional argument,
//! or drops into an interactive REPL otherwise (§6).

use std::io::{self, Write};

use clap::Parser;
use console::style;
use cogkernel::cognitive_loop::TaskOutcome;
use cogkernel::config::load_config;
use cogkernel::kernel::Kernel;
use cogkernel::trace::TraceLog;
use cogkernel::{Error, Result};

#[derive(Parser)]
#[command(
    name = "cogkernel",
    version,
    about = "A cognitive agent kernel: executes natural-language tasks against a capability-backed intent index",
    long_about = None
)]
struct Cli {
    /// The task to run. If omitted, starts an interactive REPL.
    task: Option<String>,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,

    /// Maximum Reason/Act iterations before giving up.
    #[arg(long)]
    max_iterations: Option<u32>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            1
        }
    };
    std::process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "cogkernel=debug" } else { "cogkernel=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_directive.parse().unwrap()),
        )
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config()?;
    let kernel = Kernel::start(config).await?;

    let result = match cli.task {
        Some(task) => run_one_task(&kernel, &task, cli.max_iterations).await,
        None => repl(&kernel, cli.max_iterations).await,
    };

    kernel.shutdown().await?;
    result
}

async fn run_one_task(kernel: &Kernel, task: &str, max_iterations: Option<u32>) -> Result<()> {
    let (outcome, _trace) = kernel.run_task(task, max_iterations).await?;
    print_outcome(&outcome);
    Ok(())
}

async fn repl(kernel: &Kernel, max_iterations: Option<u32>) -> Result<()> {
    println!("{}", style("cogkernel interactive session").bold());
    println!("Type a task to run it, {} for commands, {} to exit.\n", style("/help").cyan(), style("quit").cyan());

    let mut last_trace: Option<TraceLog> = None;
    let stdin = io::stdin();

    loop {
        print!("{} ", style(">").green().bold());
        io::stdout().flush().map_err(Error::Io)?;

        let mut line = String::new();
        if stdin.read_line(&mut line).map_err(Error::Io)? == 0 {
            break;
        }
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        match line {
            "quit" | "exit" => break,
            "/help" => print_help(),
            "/showtrace" => print_trace(last_trace.as_ref()),
            _ => {
                let (outcome, trace) = kernel.run_task(line, max_iterations).await?;
                print_outcome(&outcome);
                last_trace = Some(trace);
            }
        }
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  /showtrace   show the trace of the most recently run task");
    println!("  /help        show this message");
    println!("  quit | exit  leave the session");
}

fn print_trace(trace: Option<&TraceLog>) {
    let Some(trace) = trace else {
        println!("(no task has been run yet)");
        return;
    };

    for entry in trace.snapshot() {
        println!(
            "[{}] reasoning={:?} action={:?} result={:?}",
            entry.timestamp, entry.reasoning, entry.action, entry.result
        );
    }
}

fn print_outcome(outcome: &TaskOutcome) {
    match outcome {
        TaskOutcome::Complete { message } => {
            println!("{} {}", style("COMPLETE").green().bold(), message);
        }
        TaskOutcome::Blocked { reason } => {
            println!("{} {}", style("BLOCKED").yellow().bold(), reason);
        }
    }
}
