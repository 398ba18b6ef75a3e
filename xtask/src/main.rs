use std::process::{exit, Command};

use clap::{Parser, Subcommand, ValueEnum};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the campus ride workspace",
    long_about = "A unified CLI for demo requests, benchmarks,\n\
                  and CI checks in the campus ride workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a demo destination trip and wait for the simulated rider
    Demo {
        /// Queue file the demo writes to
        #[arg(long, default_value = "target/demo_requests_queue.json")]
        queue: String,
        /// Cancel after this many milliseconds instead of waiting for the match
        #[arg(long)]
        cancel_after_ms: Option<u64>,
    },
    /// Print the demo queue with live statuses
    Queue {
        #[arg(long, default_value = "target/demo_requests_queue.json")]
        queue: String,
    },
    /// Run the lifecycle benchmarks, optionally saving or comparing a named baseline
    Bench {
        /// Save results as this baseline
        #[arg(long, conflicts_with = "baseline")]
        save_baseline: Option<String>,
        /// Compare against a previously saved baseline
        #[arg(long)]
        baseline: Option<String>,
    },
    /// Run CI checks (fmt, clippy, tests, demo, benchmarks)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Build without default features (no HTTP backends)
    Minimal,
    /// Run the demo request end to end
    Demo,
    /// Run benchmarks
    Bench,
    /// Run check + minimal + demo + bench
    All,
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n--- {label}");
}

/// Run `cargo` with `args`, exiting with its status code if it fails.
fn cargo(args: &[&str]) {
    eprintln!("$ cargo {}", args.join(" "));
    match Command::new("cargo").args(args).status() {
        Ok(status) if status.success() => {}
        Ok(status) => exit(status.code().unwrap_or(1)),
        Err(error) => {
            eprintln!("could not start cargo: {error}");
            exit(1);
        }
    }
}

fn bench(criterion_args: &[&str]) {
    let mut args = vec!["bench", "-p", "ride_core", "--bench", "lifecycle"];
    if !criterion_args.is_empty() {
        args.push("--");
        args.extend_from_slice(criterion_args);
    }
    cargo(&args);
}

fn run_demo(queue: &str, cancel_after_ms: Option<u64>) {
    let cancel = cancel_after_ms.map(|ms| ms.to_string());
    let mut args = vec![
        "run",
        "-p",
        "ride_cli",
        "--",
        "--queue",
        queue,
        "request",
        "destination-trip",
        "--lat",
        "14.83",
        "--lng",
        "120.28",
        "--to",
        "annex",
    ];
    if let Some(ms) = cancel.as_deref() {
        args.extend(["--cancel-after-ms", ms]);
    }
    cargo(&args);
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test ride_core");
    cargo(&["test", "-p", "ride_core"]);

    step("Test ride_cli");
    cargo(&["test", "-p", "ride_cli"]);
}

fn ci_minimal() {
    step("Test ride_core without HTTP backends");
    cargo(&[
        "test",
        "-p",
        "ride_core",
        "--no-default-features",
        "--features",
        "test-helpers",
    ]);

    step("Test ride_cli without HTTP backends");
    cargo(&["test", "-p", "ride_cli", "--no-default-features"]);
}

fn ci_demo() {
    step("Run demo request (matched)");
    run_demo("target/ci_requests_queue.json", None);

    step("Run demo request (cancelled before match)");
    run_demo("target/ci_requests_queue.json", Some(500));
}

fn ci_bench() {
    step("Run benchmarks");
    bench(&[]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            queue,
            cancel_after_ms,
        } => run_demo(&queue, cancel_after_ms),
        Commands::Queue { queue } => {
            cargo(&["run", "-p", "ride_cli", "--", "--queue", &queue, "queue", "--live"]);
        }
        Commands::Bench {
            save_baseline,
            baseline,
        } => match (save_baseline.as_deref(), baseline.as_deref()) {
            (Some(name), _) => bench(&["--save-baseline", name]),
            (None, Some(name)) => bench(&["--baseline", name]),
            (None, None) => bench(&[]),
        },
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Minimal => ci_minimal(),
                CiJob::Demo => ci_demo(),
                CiJob::Bench => ci_bench(),
                CiJob::All => {
                    ci_check();
                    ci_minimal();
                    ci_demo();
                    ci_bench();
                }
            }
            eprintln!("\nCI job passed.");
        }
    }
}
