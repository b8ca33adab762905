mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::{fmt, EnvFilter};

use uptime_core::{
    CheckStatus, Engine, HttpMethod, HttpProber, MemoryStore, MonitorStore, ProbeRequest, Prober,
};

fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");

    if GIT_HASH.is_empty() {
        // Leak is fine — called once, lives for the program's lifetime.
        Box::leak(VERSION.to_string().into_boxed_str())
    } else {
        Box::leak(format!("{VERSION} ({GIT_HASH})").into_boxed_str())
    }
}

/// HTTP uptime monitor — periodic health checks with downtime alerts.
#[derive(Parser)]
#[command(name = "uptime-monitor", version = version_string(), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the monitoring engine and HTTP API server.
    Serve {
        /// Listen address (e.g. 0.0.0.0:8080). Overrides config file.
        #[arg(short, long)]
        listen: Option<SocketAddr>,

        /// Path to TOML config file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Probe a URL once and report the result (no server).
    Check {
        /// URL to probe.
        url: String,

        /// HTTP method: GET, POST, PUT or HEAD.
        #[arg(long, default_value = "GET")]
        method: String,

        /// Probe timeout in milliseconds.
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,

        /// Expected HTTP status code.
        #[arg(long, default_value_t = 200)]
        expect: u16,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { listen, config } => {
            run_serve(listen, config).await;
        }
        Commands::Check {
            url,
            method,
            timeout_ms,
            expect,
        } => {
            fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
                )
                .init();
            run_check(url, method, timeout_ms, expect).await;
        }
    }
}

async fn run_serve(listen_override: Option<SocketAddr>, config_path: Option<PathBuf>) {
    let app_config = if let Some(ref path) = config_path {
        match config::AppConfig::load(path) {
            Ok(c) => {
                init_tracing(&c.server.log_format);
                tracing::info!(path = %path.display(), "Loaded config file");
                Some(c)
            }
            Err(e) => {
                init_tracing("pretty");
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
    } else {
        init_tracing("pretty");
        None
    };

    let listen = listen_override
        .or(app_config.as_ref().map(|c| c.server.listen))
        .unwrap_or_else(|| "0.0.0.0:8080".parse().unwrap());

    let engine_config = app_config
        .as_ref()
        .map(|c| c.engine.to_engine_config())
        .unwrap_or_default();

    let store = Arc::new(MemoryStore::new());

    if let Some(ref app_config) = app_config {
        for def in &app_config.monitor {
            let monitor = def.to_monitor(app_config.seed_user_id);
            let id = monitor.id;
            let url = monitor.url.clone();
            if let Err(e) = store.insert_monitor(monitor).await {
                tracing::error!(name = %def.name, error = %e, "Failed to seed monitor");
                continue;
            }
            tracing::info!(monitor_id = %id, %url, "Monitor seeded from config");
        }
    }

    let prober = Arc::new(HttpProber::new(engine_config.connect_timeout));
    let engine = Arc::new(Engine::new(
        Arc::clone(&store) as Arc<dyn MonitorStore>,
        prober,
        engine_config,
    ));
    engine.start().await;

    let state = uptime_api::state::AppState::new(Arc::clone(&store))
        .with_engine(Arc::clone(&engine));

    tracing::info!(%listen, "Starting uptime monitor API server");
    if let Err(e) = uptime_api::serve_with_state(listen, state, uptime_api::shutdown_signal()).await
    {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }

    tracing::info!("Shutdown signal received, stopping engine...");
    engine.stop().await;
    tracing::info!("Shutdown complete");
}

async fn run_check(url: String, method: String, timeout_ms: u64, expect: u16) {
    let method = match method.to_ascii_uppercase().as_str() {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "HEAD" => HttpMethod::Head,
        other => {
            eprintln!(
                "{} unsupported method '{}' (expected GET, POST, PUT or HEAD)",
                style("error:").red().bold(),
                other
            );
            std::process::exit(2);
        }
    };

    println!(
        "{} {}",
        style("uptime-monitor").bold(),
        style(env!("CARGO_PKG_VERSION")).dim()
    );
    println!("  {} {}", style("url:    ").dim(), style(&url).bold());
    println!("  {} {}", style("method: ").dim(), method);
    println!("  {} {}ms", style("timeout:").dim(), timeout_ms);
    println!("  {} {}", style("expect: ").dim(), expect);
    println!();

    let prober = HttpProber::default();
    let request = ProbeRequest {
        url,
        method,
        timeout_ms,
        expected_status: expect,
    };
    let outcome = prober.probe(&request).await;

    let code = outcome
        .status_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());

    match outcome.status {
        CheckStatus::Up => {
            println!(
                "  {}  status={} time={}ms",
                style("UP").green().bold(),
                code,
                outcome.response_time_ms
            );
        }
        CheckStatus::Down => {
            println!(
                "  {}  status={} time={}ms  {}",
                style("DOWN").red().bold(),
                code,
                outcome.response_time_ms,
                style(outcome.error.as_deref().unwrap_or("unknown error")).red()
            );
            std::process::exit(1);
        }
    }
}

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format {
        "json" => {
            fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt().with_env_filter(filter).init();
        }
    }
}
