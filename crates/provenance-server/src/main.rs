//! Provenance Server
//!
//! Human-vs-machine authorship detection over a five-model ensemble.
//!
//! `serve` exposes the ensemble over HTTP, `predict` classifies text from
//! the command line, and `check` loads every model and reports the active
//! feature schema.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

use provenance_classifiers::{ModelRegistry, Orchestrator};
use provenance_server::config::{load_ensemble, ServerConfig};
use provenance_server::input::{self, Prompt};
use provenance_server::report::TextReport;
use provenance_server::{routes, AppState};

#[derive(Parser, Debug)]
#[command(name = "provenance-server")]
#[command(about = "Human or AI text classification with a five-model ensemble", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve(ServeArgs),

    /// Classify text from an argument, a file, or stdin
    Predict(PredictArgs),

    /// Load every model and print the feature schema
    Check(EnsembleArgs),
}

#[derive(Args, Debug)]
struct EnsembleArgs {
    /// Ensemble configuration file (model artifacts, device)
    #[arg(short, long, env = "PROVENANCE_ENSEMBLE")]
    ensemble: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Server configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(flatten)]
    ensemble: EnsembleArgs,

    /// Listen address
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long, env = "PROVENANCE_PORT")]
    port: Option<u16>,

    /// Load all models before accepting requests
    #[arg(long)]
    preload: bool,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[command(flatten)]
    ensemble: EnsembleArgs,

    /// Read the text from a file
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Print the JSON report instead of the table
    #[arg(long)]
    json: bool,

    /// Text to classify; omit for an interactive prompt
    text: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Predict(args) => predict(args).await,
        Command::Check(args) => check(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    info!("Starting Provenance server");

    let config = ServerConfig::load(&args.config)?.with_overrides(
        args.listen,
        args.port,
        args.ensemble.ensemble,
        args.preload,
    );
    info!("Configuration loaded successfully");

    let metrics_handle = init_metrics()?;

    let state = AppState::from_config(&config, metrics_handle).await?;
    let app = routes::create_router(state);

    let addr: SocketAddr = config.address().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn predict(args: PredictArgs) -> Result<()> {
    let config = load_ensemble(args.ensemble.ensemble.as_deref())?;
    let orchestrator = Orchestrator::new(Arc::new(ModelRegistry::from_config(config)));

    if let Some(text) = args.text {
        return classify(&orchestrator, &text, args.json).await;
    }
    if let Some(path) = args.file {
        let text = tokio::fs::read_to_string(&path).await?;
        return classify(&orchestrator, &text, args.json).await;
    }

    // Interactive: texts end at a blank line, quit/exit ends the session
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout
            .write_all(b"\nEnter text to classify, then a blank line (quit to exit):\n")
            .await?;
        stdout.flush().await?;

        let text = match input::read_text(&mut lines).await? {
            Prompt::Text(text) => text,
            Prompt::Quit => break,
        };

        if let Err(e) = classify(&orchestrator, &text, args.json).await {
            eprintln!("Error: {:#}", e);
        }
    }
    Ok(())
}

async fn classify(orchestrator: &Orchestrator, text: &str, json: bool) -> Result<()> {
    if text.trim().is_empty() {
        anyhow::bail!("No text provided");
    }

    let result = orchestrator.analyze(text).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", TextReport::new(text, &result));
    }
    Ok(())
}

async fn check(args: EnsembleArgs) -> Result<()> {
    let config = load_ensemble(args.ensemble.as_deref())?;
    println!("Models directory: {}", config.models_dir.display());

    let registry = ModelRegistry::from_config(config);
    let models = registry.ensure_ready().await?;
    let schema = models.schema();

    println!("Registry phase: {}", registry.phase().as_str());
    println!("Schema kind: {:?}", schema.kind());
    println!("Schema width: {}", schema.width());
    println!("Schema fingerprint: {}", schema.fingerprint());
    if let Some(names) = schema.names() {
        let head: Vec<&str> = names.iter().take(10).map(String::as_str).collect();
        println!("Top schema columns: {}", head.join(", "));
    }
    println!("Loaded models: {}", models.model_names().join(", "));
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging on stderr so reports on stdout stay clean
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("provenance=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("provenance=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "provenance_analyze_total",
        "Total number of analyze calls by outcome"
    );
    metrics::describe_histogram!(
        "provenance_analyze_latency_us",
        metrics::Unit::Microseconds,
        "End-to-end analyze latency in microseconds"
    );
    metrics::describe_histogram!(
        "provenance_votes_human",
        "Number of models voting HUMAN per request"
    );
    metrics::describe_counter!(
        "provenance_classifier_errors_total",
        "Total number of classifier failures by model"
    );
    metrics::describe_counter!(
        "provenance_registry_initializations_total",
        "Registry initialization attempts by outcome"
    );
    metrics::describe_counter!(
        "provenance_http_requests_total",
        "Total number of HTTP requests by route"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
