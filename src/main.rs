use anyhow::Context;
use backend_client::{AuthProvider, Backend, RestBackend};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Table};
use configuration::{load_config, Config, LoggingConfig};
use core_types::ReportingPeriod;
use database::{connect, run_migrations, DbRepository};
use ranking::{RankedEntry, Standing};
use service::{Caller, SalesService};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use web_server::{run_server, AppState};

/// The main entry point for the Salesboard application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already carry everything.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        // Migrations only need DATABASE_URL, not a full configuration.
        Commands::Migrate => {
            let _guard = init_tracing(&LoggingConfig::default());
            handle_migrate().await
        }
        Commands::Serve(args) => {
            let (config, _guard) = setup(cli.config)?;
            handle_serve(args, config).await
        }
        Commands::Ranking(args) => {
            let (config, _guard) = setup(cli.config)?;
            handle_ranking(args, config).await
        }
        Commands::Export(args) => {
            let (config, _guard) = setup(cli.config)?;
            handle_export(args, config).await
        }
    }
}

fn setup(path: Option<PathBuf>) -> anyhow::Result<(Config, Option<WorkerGuard>)> {
    let config = load_config(path.as_deref()).context("Failed to load configuration")?;
    let guard = init_tracing(&config.logging);
    Ok((config, guard))
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Monthly sales ranking for the operations desk.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (defaults to ./config.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Print the leaderboard for a month.
    Ranking(RankingArgs),
    /// Write a month's orders to a CSV file (admins only).
    Export(ExportArgs),
    /// Apply the database schema through DATABASE_URL.
    Migrate,
}

#[derive(Parser)]
struct ServeArgs {
    /// Overrides `server.port`.
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Parser)]
struct RankingArgs {
    /// The month to rank (format: YYYY-MM). Defaults to the current month.
    #[arg(long)]
    period: Option<ReportingPeriod>,

    /// An access token; when given, your own position is shown too.
    #[arg(long)]
    token: Option<String>,
}

#[derive(Parser)]
struct ExportArgs {
    /// The month to export (format: YYYY-MM).
    #[arg(long)]
    period: ReportingPeriod,

    /// Output file. Defaults to `orders-YYYY-MM.csv` in the working directory.
    #[arg(long)]
    output: Option<PathBuf>,

    /// An admin's access token.
    #[arg(long)]
    token: String,
}

// ==============================================================================
// Logging
// ==============================================================================

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
///
/// The returned guard flushes the log file on drop and must live until exit.
fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let console = fmt::layer().with_target(false);

    match logging.directory.as_deref() {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "salesboard.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(console).init();
            None
        }
    }
}

// ==============================================================================
// Command Logic
// ==============================================================================

/// The data backend: Postgres directly when `DATABASE_URL` is set, else the platform's REST API.
async fn data_backend(rest: &RestBackend) -> anyhow::Result<Arc<dyn Backend>> {
    if std::env::var("DATABASE_URL").is_ok() {
        let pool = connect().await.context("Failed to connect to the database")?;
        tracing::info!("Using the direct database backend.");
        Ok(Arc::new(DbRepository::new(pool)))
    } else {
        Ok(Arc::new(rest.clone()))
    }
}

fn service_for(backend: Arc<dyn Backend>, config: &Config) -> SalesService {
    SalesService::new(backend, config.auth.clone(), config.export.clone())
}

/// Resolves a token into the caller it belongs to.
async fn caller_for(rest: &RestBackend, backend: &dyn Backend, token: &str) -> anyhow::Result<Caller> {
    let user = rest.user_for_token(token).await.context("The access token was rejected")?;
    let profile = session::resolve_profile(backend, &user)
        .await
        .context("Failed to resolve the user's profile")?;
    Ok(Caller::new(profile))
}

async fn handle_migrate() -> anyhow::Result<()> {
    let pool = connect().await.context("Failed to connect to the database")?;
    run_migrations(&pool).await.context("Failed to run database migrations")?;
    println!("Migrations applied.");
    Ok(())
}

async fn handle_serve(args: ServeArgs, config: Config) -> anyhow::Result<()> {
    let rest = RestBackend::new(&config.backend).context("Failed to build the backend client")?;
    let backend = data_backend(&rest).await?;
    let auth: Arc<dyn AuthProvider> = Arc::new(rest);

    let mut server = config.server.clone();
    if let Some(port) = args.port {
        server.port = port;
    }
    let addr: SocketAddr = server
        .address()
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", server.address()))?;

    let state = AppState::new(backend, auth, config.auth.clone(), config.export.clone());
    run_server(Arc::new(state), addr).await
}

async fn handle_ranking(args: RankingArgs, config: Config) -> anyhow::Result<()> {
    let period = args.period.unwrap_or_else(ReportingPeriod::current);
    let mut rest = RestBackend::new(&config.backend).context("Failed to build the backend client")?;
    if let Some(token) = &args.token {
        rest = rest.with_access_token(token.clone());
    }
    let backend = data_backend(&rest).await?;
    let service = service_for(backend.clone(), &config);

    let (entries, me) = match &args.token {
        Some(token) => {
            let caller = caller_for(&rest, backend.as_ref(), token).await?;
            let view = service.ranking(&caller, period).await?;
            (view.entries, Some(view.me))
        }
        None => (service.leaderboard(period).await?, None),
    };

    println!("Ranking for {period}");
    println!("{}", leaderboard_table(&entries));
    match me {
        Some(Standing::Ranked { position, score }) => println!("Your position: #{position} ({score} points)"),
        Some(Standing::Unranked) => println!("You are not on this leaderboard."),
        None => {}
    }
    Ok(())
}

fn leaderboard_table(entries: &[RankedEntry]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["#", "Operator", "Orders", "Revenue", "Score"]);
    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.position).set_alignment(CellAlignment::Right),
            Cell::new(&entry.operator_name),
            Cell::new(entry.order_count).set_alignment(CellAlignment::Right),
            Cell::new(ranking::report::to_display(entry.total_revenue)).set_alignment(CellAlignment::Right),
            Cell::new(entry.score).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

async fn handle_export(args: ExportArgs, config: Config) -> anyhow::Result<()> {
    let rest = RestBackend::new(&config.backend)
        .context("Failed to build the backend client")?
        .with_access_token(args.token.clone());
    let backend = data_backend(&rest).await?;
    let caller = caller_for(&rest, backend.as_ref(), &args.token).await?;

    let export = service_for(backend, &config).export_orders(&caller, args.period).await?;
    let path = args.output.unwrap_or_else(|| PathBuf::from(&export.file_name));
    std::fs::write(&path, &export.content).with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Exported {} orders to {}", export.rows, path.display());
    Ok(())
}
