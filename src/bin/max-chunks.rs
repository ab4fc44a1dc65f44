use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use max_chunks::{
    chunks::MaxChunkSolver,
    demand::DemandBound,
    feasibility::{self, Verdict},
    load::{self, LoadError},
};

/// Compute the maximal non-preemptive chunk of every task in a task set.
///
/// Returns zero if the task set is schedulable, 1 if it is not, and 255
/// on malformed input or I/O errors.
#[derive(Parser, Debug)]
#[command(name = "max-chunks", version)]
struct Args {
    #[arg(short = 's', long = "task-set")]
    /// CSV file with one task per line: name, period, deadline, wcet(1), ..., wcet(m)
    task_set: PathBuf,
    #[arg(short = 'l', long = "log")]
    /// Auditable log file receiving every probed chunk length
    log: Option<PathBuf>,
    #[arg(long = "nonp")]
    /// Only test fully non-preemptive execution (chunks equal to WCETs)
    nonp: bool,
    #[arg(short = 'v', long = "verbose")]
    /// Write the audit log to standard output
    verbose: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("unable to read task set: {0}")]
    Load(#[from] LoadError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn audit_log(args: &Args) -> io::Result<Box<dyn Write>> {
    let log: Box<dyn Write> = match (&args.log, args.verbose) {
        (Some(path), _) => Box::new(File::create(path)?),
        (None, true) => Box::new(io::stdout()),
        (None, false) => Box::new(io::sink()),
    };
    Ok(log)
}

fn run(args: &Args) -> Result<Verdict, CliError> {
    let mut ts = load::read_task_set(&args.task_set)?;
    let mut log = audit_log(args)?;

    println!("Task Set:\n{ts}\n");

    let mut solver = MaxChunkSolver::new();
    let searched = solver.solve_traced(&mut ts, log.as_mut())?;
    log.flush()?;
    // the chunks found by the search are still reported
    let verdict = if args.nonp {
        solver.check_nonpreemptive(&ts)
    } else {
        searched
    };

    if let Verdict::Malformed(reason) = &verdict {
        println!("Poorly formed task set: {reason}");
    }
    println!("After assigning non-preemptive chunks\n{ts}");
    println!("-------------------------------------------------");
    let t_star = feasibility::star_bound(&ts).map_or_else(|_| "N/A".to_string(), |t| t.to_string());
    println!(
        "Utilization: {:.4}, T*: {}, Feasible: {}",
        ts.utilization(),
        t_star,
        verdict
    );
    Ok(verdict)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            eprint!("{e}");
            return ExitCode::from(255);
        }
        Err(e) => {
            print!("{e}");
            return ExitCode::SUCCESS;
        }
    };

    match run(&args) {
        Ok(verdict) => {
            tracing::info!(%verdict, code = verdict.exit_code(), "analysis complete");
            ExitCode::from(verdict.exit_code())
        }
        Err(e) => {
            eprintln!("max-chunks: {e}");
            ExitCode::from(255)
        }
    }
}
