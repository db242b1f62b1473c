mod auth_commands;
mod config_commands;
mod report_commands;
mod resource_commands;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use {
    anyhow::{Context as _, Result},
    clap::{Parser, Subcommand},
    salesdesk_auth::{FileStore, KeyValueStore},
    salesdesk_client::{ApiClient, ApiError},
    salesdesk_config::SalesdeskConfig,
    serde::Serialize,
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "salesdesk", about = "salesdesk, command-line client for the sales API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to load instead of discovering one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory to look for (and write) salesdesk.toml in.
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Session management.
    Auth {
        #[command(subcommand)]
        action: auth_commands::AuthAction,
    },
    /// Customer accounts.
    Accounts {
        #[command(subcommand)]
        action: resource_commands::AccountAction,
    },
    /// Root (parent) accounts.
    RootAccounts {
        #[command(subcommand)]
        action: resource_commands::AccountTreeAction,
    },
    /// Branch accounts.
    BranchAccounts {
        #[command(subcommand)]
        action: resource_commands::AccountTreeAction,
    },
    Invoices {
        #[command(subcommand)]
        action: resource_commands::CrudAction,
    },
    /// Products and their categories, subcategories and tags.
    Products {
        #[command(subcommand)]
        action: resource_commands::ProductAction,
    },
    /// Sales reps.
    Reps {
        #[command(subcommand)]
        action: resource_commands::CrudAction,
    },
    /// Dashboard widgets.
    Dashboard {
        /// One of: gross-sales, top-ten-branch-ytd, top-ten-sales-rep-ytd,
        /// top-brands-ytd, monthly-sales-by-sales-rep.
        report: salesdesk_client::DashboardReport,
    },
    /// Sales reports.
    Reports {
        #[command(subcommand)]
        report: report_commands::ReportAction,
    },
    /// Fetch reference data into the local cache.
    Sync {
        /// Drop the cached reference data instead of fetching it.
        #[arg(long)]
        clear: bool,
    },
    /// Check that the API is reachable.
    Health,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

/// What every command needs: loaded config and a client bound to the session store.
pub struct Context {
    pub config: SalesdeskConfig,
    pub client: ApiClient,
    pub session_path: PathBuf,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self> {
        let config = salesdesk_config::load_or_discover(cli.config.as_deref())?;
        let store = match &config.storage.path {
            Some(path) => FileStore::with_path(path.clone()),
            None => FileStore::new(),
        };
        let session_path = store.path().to_path_buf();
        debug!(
            base_url = %config.api.base_url,
            session = %session_path.display(),
            "loaded configuration"
        );
        let store: Arc<dyn KeyValueStore> = Arc::new(store);
        let client = ApiClient::from_config(&config, store)
            .with_context(|| format!("invalid api.base_url '{}'", config.api.base_url))?;
        Ok(Self {
            config,
            client,
            session_path,
        })
    }
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse a `--data` argument.
pub fn parse_data(raw: &str) -> Result<serde_json::Value> {
    serde_json::from_str(raw).context("--data must be valid JSON")
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn is_authentication_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_authentication)
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(dir) = &cli.config_dir {
        salesdesk_config::set_config_dir(dir.clone());
    }
    let ctx = Context::load(&cli)?;

    match cli.command {
        Commands::Auth { action } => auth_commands::handle_auth(&ctx, action).await,
        Commands::Accounts { action } => resource_commands::handle_accounts(&ctx, action).await,
        Commands::RootAccounts { action } => {
            resource_commands::handle_account_tree(ctx.client.root_accounts(), action).await
        },
        Commands::BranchAccounts { action } => {
            resource_commands::handle_account_tree(ctx.client.branch_accounts(), action).await
        },
        Commands::Invoices { action } => {
            resource_commands::handle_crud(ctx.client.invoices(), action).await
        },
        Commands::Products { action } => resource_commands::handle_products(&ctx, action).await,
        Commands::Reps { action } => {
            resource_commands::handle_crud(ctx.client.sales_reps(), action).await
        },
        Commands::Dashboard { report } => print_json(&ctx.client.dashboard(report).await?),
        Commands::Reports { report } => report_commands::handle_report(&ctx, report).await,
        Commands::Sync { clear: true } => {
            ctx.client.cache().clear()?;
            println!("Cleared cached reference data.");
            Ok(())
        },
        Commands::Sync { clear: false } => {
            let summary = ctx.client.prefetch_reference_data().await?;
            print_json(&summary)
        },
        Commands::Health => print_json(&ctx.client.health().await?),
        Commands::Config { action } => config_commands::handle_config(&ctx, action),
    }
}

/// Exit status for a session that needs a fresh login.
const EXIT_AUTHENTICATION: u8 = 2;

/// Report a failed command once on stderr and pick the exit status.
fn report_failure(err: &anyhow::Error) -> u8 {
    if is_authentication_error(err) {
        debug!(error = %err, "authentication failed");
        eprintln!("Your session is no longer valid. Run `salesdesk auth login` to log in again.");
        EXIT_AUTHENTICATION
    } else {
        debug!(error = %format!("{err:#}"), "command failed");
        eprintln!("Error: {err:#}");
        1
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "salesdesk starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(report_failure(&e)),
    }
}
