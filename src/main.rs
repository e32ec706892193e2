//! CompanyLens: multi-source company profile consolidation
//!
//! This is the main entry point for the application.

use anyhow::Result;
use companylens::{
    config::{self, Settings},
    network::HttpClient,
    web::{create_router, AppState},
    Consolidator, Limits, SourceLoader,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("-h") | Some("--help") => {
            print_usage();
            return Ok(());
        }
        Some("-V") | Some("--version") => {
            println!("companylens {}", companylens::VERSION);
            return Ok(());
        }
        _ => {}
    }

    let settings = config::load_settings()?;
    init_logging(&settings);

    info!("Starting CompanyLens v{}", companylens::VERSION);
    info!("Loaded configuration for instance: {}", settings.general.instance_name);

    let client = HttpClient::with_settings(&settings.outgoing)?;
    let registry = SourceLoader::load(&settings, &client)?;

    match args.first().map(String::as_str) {
        Some("lookup") => {
            let company_name = args[1..].join(" ");
            lookup(&settings, registry, &company_name).await
        }
        None | Some("serve") => serve(settings, registry).await,
        Some(other) => {
            print_usage();
            Err(anyhow::anyhow!("Unknown command: {}", other))
        }
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` in debug mode
fn init_logging(settings: &Settings) {
    let default_level = if settings.general.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn serve(settings: Settings, registry: companylens::SourceRegistry) -> Result<()> {
    let addr = SocketAddr::new(settings.server.bind_address.parse()?, settings.server.port);

    let state = AppState::new(settings, registry);
    let app = create_router(state);

    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run a single consolidation and print it as JSON
async fn lookup(
    settings: &Settings,
    registry: companylens::SourceRegistry,
    company_name: &str,
) -> Result<()> {
    let consolidator = Consolidator::from_settings(Arc::new(registry), settings);
    let consolidation = consolidator
        .consolidate(company_name, Limits::from(&settings.limits))
        .await?;

    println!("{}", serde_json::to_string_pretty(&consolidation)?);
    Ok(())
}

/// Print usage information
fn print_usage() {
    println!(
        r#"
CompanyLens v{}
Multi-source company profile consolidation

USAGE:
    companylens [serve]
    companylens lookup <COMPANY NAME>

OPTIONS:
    -h, --help             Print help information
    -V, --version          Print version information

ENVIRONMENT VARIABLES:
    COMPANYLENS_SETTINGS_PATH      Path to settings.yml
    COMPANYLENS_DEBUG              Enable debug mode (true/false)
    COMPANYLENS_PORT               Server port
    COMPANYLENS_BIND_ADDRESS       Bind address
    COMPANYLENS_TOTAL_MAX          Maximum companies per lookup
    COMPANYLENS_<SOURCE>_API_KEY   API key for a source (e.g. CRUNCHBASE)
    RUST_LOG                       Log filter
"#,
        companylens::VERSION
    );
}
