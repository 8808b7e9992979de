use clap::Parser;
use lset_harness::cli::Cli;
use lset_harness::client::LargeSetClient;
use lset_harness::config::messages;
use lset_harness::error::{AppError, Result};
use lset_harness::harness::{Harness, RunReport};
use lset_harness::memory::MemoryClient;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    // RUST_LOG 优先，其次由 -v 决定级别
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_results(client: &str, report: &RunReport) {
    println!("=== LSET Test Results ({}) ===", client);
    println!(
        "[RESULTS] insert: Success({}) Errors({}) of {}{}",
        report.insert.success,
        report.insert.errors,
        report.insert.planned,
        if report.insert.aborted { " [aborted]" } else { "" }
    );
    match &report.search {
        Some(search) => println!(
            "[RESULTS] search: Success({}) NotFound({}) Errors({}) of {} ({:.2}%)",
            search.success,
            search.not_found,
            search.errors,
            search.planned,
            search.success_rate()
        ),
        None => println!("[RESULTS] search: skipped"),
    }
    println!("final state: {:?}", report.state);
    println!("==================================");
}

async fn run<C: LargeSetClient>(mut harness: Harness<C>) -> Result<()> {
    let report = harness.run().await?;
    print_results(harness.client().name(), &report);
    report.status()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let memory = cli.memory;
    let config = cli.into_config();
    init_tracing(config.verbose);

    let runtime = match compio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            let err = AppError::RuntimeCreate(format!("{}: {}", messages::RUNTIME_CREATE_FAILED, e));
            error!(error = %err, "startup failed");
            return ExitCode::from(err.exit_code());
        }
    };

    let result = runtime.block_on(async move {
        if memory {
            let client = MemoryClient::from_config(&config);
            run(Harness::with_client(config, client)?).await
        } else {
            run(Harness::connect(config).await?).await
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "harness failed");
            ExitCode::from(e.exit_code())
        }
    }
}
