// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ayllu Service Node
//!
//! Entry point for the `ayllu-node` binary. Parses CLI arguments, loads the
//! ledger settings, initializes logging and metrics, and either serves the
//! HTTP API or runs one pipeline and exits.
//!
//! - `run`       — serve the REST API and the metrics endpoint
//! - `claim`     — transfer reward tokens once
//! - `register`  — register one student
//! - `addresses` — print the validator script addresses
//! - `version`   — print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod validation;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use ayllu_contracts::RegistrationAction;
use ayllu_protocol::{
    LedgerService, LedgerSettings, PipelineOutcome, RegistrationRequest, TransactionService,
    TransferRequest,
};

use cli::{AylluNodeCli, Commands, ConfigArgs};
use logging::LogFormat;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = AylluNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Claim(args) => claim(args).await,
        Commands::Register(args) => register(args).await,
        Commands::Addresses(args) => addresses(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Initializes logging and builds the service from the settings file.
fn bootstrap(args: &ConfigArgs) -> Result<(LedgerService, u64)> {
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&args.log_format),
    );

    let settings = load_settings(&args.config)?;
    let max_claim_amount = settings.max_claim_amount;
    let service = LedgerService::new(settings).context("failed to prepare scratch space")?;
    tracing::info!(
        config = %args.config.display(),
        network = service.settings().network.as_deref().unwrap_or("unset"),
        scratch = %service.scratch().root().display(),
        "ledger settings loaded"
    );
    Ok((service, max_claim_amount))
}

fn load_settings(path: &Path) -> Result<LedgerSettings> {
    LedgerSettings::load(path)
        .with_context(|| format!("failed to load ledger settings from {}", path.display()))
}

/// Serves the REST API and the metrics endpoint until a shutdown signal.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    let (service, max_claim_amount) = bootstrap(&args.settings)?;

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        "starting ayllu-node"
    );

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());

    // --- Application state ---
    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: Arc::new(service),
        metrics: Arc::clone(&node_metrics),
        max_claim_amount,
        started_at: chrono::Utc::now(),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("{}:{}", args.bind, args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("{}:{}", args.bind, args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("ayllu-node stopped");
    Ok(())
}

async fn claim(args: cli::ClaimArgs) -> Result<()> {
    let (service, max_claim_amount) = bootstrap(&args.settings)?;
    let request = TransferRequest::new(args.receiver, args.amount);
    if let Err(rejection) = validation::check_claim(&request, max_claim_amount) {
        bail!("claim rejected: {rejection}");
    }
    report(service.transfer_tokens(request).await)
}

async fn register(args: cli::RegisterArgs) -> Result<()> {
    let (service, _) = bootstrap(&args.settings)?;
    let request = RegistrationRequest {
        student_address: args.student_address,
        student_pkh: args.student_pkh,
        tx_hash: args.tx_hash,
        output_index: args.output_index,
        action: if args.cancel {
            RegistrationAction::Cancel
        } else {
            RegistrationAction::Register
        },
    };
    if let Err(rejection) = validation::check_registration(&request) {
        bail!("registration rejected: {rejection}");
    }
    report(service.register_student(request).await)
}

async fn addresses(args: cli::AddressesArgs) -> Result<()> {
    let (service, _) = bootstrap(&args.settings)?;
    let addresses = service.validator_addresses().await?;
    let rendered =
        serde_json::to_string_pretty(&addresses).context("failed to render address map")?;
    println!("{rendered}");
    Ok(())
}

/// Prints a successful outcome; a failed one becomes the process error.
fn report(outcome: PipelineOutcome) -> Result<()> {
    if outcome.succeeded {
        println!("{}", outcome.message);
        Ok(())
    } else {
        bail!("{}", outcome.message)
    }
}

/// Prints version information to stdout.
fn print_version() {
    println!("ayllu-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
