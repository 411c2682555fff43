use std::process::{exit, Command};

use clap::{Parser, Subcommand, ValueEnum};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the cab fleet workspace",
    long_about = "Runs the fleet harness, the cab_core benchmarks, the ignored load\n\
                  tests and the CI job set for the cab fleet workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the fleet harness in release mode (default: 20 cabs, 3 shards, 200 rides)
    Run {
        /// Optional JSON scenario file
        #[arg(long)]
        scenario: Option<String>,
        /// Shard selection strategy: random, round-robin or hash
        #[arg(long)]
        shard_selection: Option<String>,
    },
    /// Run the cab_core Criterion benchmarks
    Bench,
    /// Run CI jobs
    Ci {
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Run the ignored large-fleet tests in cab_sim
    LoadTest,
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// fmt, clippy, and tests for both crates
    Check,
    /// One harness run per shard selection strategy
    Harness,
    /// Benchmarks
    Bench,
    /// check + harness + bench
    All,
}

// ── helpers ────────────────────────────────────────────────────────

/// Runs `cargo <args>` and exits with its status code on failure.
fn cargo(label: &str, args: &[&str]) {
    eprintln!("\n=== {label} ===\n+ cargo {}", args.join(" "));
    let status = match Command::new("cargo").args(args).status() {
        Ok(status) => status,
        Err(err) => {
            eprintln!("failed to execute cargo: {err}");
            exit(1);
        }
    };
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn harness(label: &str, extra: &[&str]) {
    let mut args = vec!["run", "-p", "cab_sim", "--release", "--"];
    args.extend_from_slice(extra);
    cargo(label, &args);
}

fn bench() {
    cargo(
        "cab_core benchmarks",
        &["bench", "-p", "cab_core", "--bench", "performance"],
    );
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    cargo("fmt", &["fmt", "--all", "--", "--check"]);
    cargo(
        "clippy",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    );
    for package in ["cab_core", "cab_sim"] {
        cargo(&format!("test {package}"), &["test", "-p", package]);
    }
}

fn ci_harness() {
    for selection in ["random", "round-robin", "hash"] {
        harness(
            &format!("harness with {selection} shard selection"),
            &["--shard-selection", selection, "--log-level", "warn"],
        );
    }
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    match Cli::parse().command {
        Commands::Run {
            scenario,
            shard_selection,
        } => {
            let mut extra = Vec::new();
            if let Some(path) = scenario.as_deref() {
                extra.extend(["--scenario", path]);
            }
            if let Some(selection) = shard_selection.as_deref() {
                extra.extend(["--shard-selection", selection]);
            }
            harness("fleet harness", &extra);
        }
        Commands::Bench => bench(),
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Harness => ci_harness(),
                CiJob::Bench => bench(),
                CiJob::All => {
                    ci_check();
                    ci_harness();
                    bench();
                }
            }
            eprintln!("\nCI job passed.");
        }
        Commands::LoadTest => cargo(
            "load tests",
            &["test", "-p", "cab_sim", "--test", "load_tests", "--", "--ignored"],
        ),
    }
}
