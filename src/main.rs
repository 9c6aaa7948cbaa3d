//! Tenant Inventory - directory and subscription inventory for Azure tenants
//!
//! Lists accounts with a status heuristic, applies bulk account actions and
//! exports subscriptions and organization settings to CSV/JSON.

#![deny(clippy::all)]

mod api;
mod auth;
mod bulk;
mod classify;
mod commands;
mod config;
mod context;
mod error;
mod export;
mod fetch;
mod query;
mod report;
mod runlog;
mod settings;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use bulk::BulkAction;
use commands::accounts::AccountsArgs;
use commands::bulk::BulkArgs;
use commands::organization::OrganizationArgs;
use commands::subscriptions::SubscriptionsArgs;
use config::Config;
use context::{CancelFlag, RunContext};
use error::{AppError, SetupError};
use query::QuerySpec;
use runlog::RunLog;

#[derive(Debug, Parser)]
#[command(name = "tenant-inventory", version, about)]
struct Cli {
    /// Directory for exported files (overrides export.output_dir)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Export directory users with their account status
    Accounts {
        /// Only users whose UPN ends with @DOMAIN
        #[arg(long)]
        domain: Option<String>,

        /// Include disabled accounts
        #[arg(long)]
        include_disabled: bool,
    },

    /// Disable, delete or revoke sessions for every user in a domain
    Bulk {
        #[arg(long, value_enum)]
        action: BulkAction,

        /// Only users whose UPN ends with @DOMAIN
        #[arg(long)]
        domain: String,

        /// Include disabled accounts
        #[arg(long)]
        include_disabled: bool,

        /// Disable accounts even if they are already disabled
        #[arg(long)]
        no_skip_disabled: bool,

        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// Export Azure subscriptions
    Subscriptions,

    /// Export organization settings as JSON
    Organization,
}

impl Command {
    fn log_prefix(&self) -> &'static str {
        match self {
            Self::Accounts { .. } => "TenantAccounts",
            Self::Bulk { .. } => "BulkAction",
            Self::Subscriptions => "AzureSubscriptions",
            Self::Organization => "TenantOrganization",
        }
    }
}

fn main() {
    // Load .env file (if present) before anything else
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            print_remedy(&e);
            std::process::exit(1);
        }
    };

    init_logging(&config);
    info!("Starting {} v{}", config.app.name, config.app.version);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create Tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    let code = runtime.block_on(run(cli, config));
    std::process::exit(code);
}

fn init_logging(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

fn print_remedy(err: &anyhow::Error) {
    if let Some(app) = err.downcast_ref::<AppError>() {
        eprintln!("{}", app.user_message());
        eprintln!("  {}", app.remedy());
    }
}

/// Run one subcommand and return the process exit code.
async fn run(cli: Cli, config: Config) -> i32 {
    let log_dir = settings::log_directory(&config);
    let log = match RunLog::open(&log_dir, cli.command.log_prefix()) {
        Ok(log) => log,
        Err(e) => {
            warn!("Run log disabled: {}", e);
            RunLog::tracing_only()
        }
    };

    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current request");
            flag.cancel();
        }
    });

    let mut ctx = RunContext::new(cancel, log);
    if let Some(path) = ctx.log.path() {
        info!("Run log: {}", path.display());
    }

    match dispatch(cli, &config, &mut ctx).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Run failed: {:#}", e);
            ctx.log.error(format!("{:#}", e));
            eprintln!("Error: {:#}", e);
            print_remedy(&e);
            1
        }
    }
}

/// A parsed command with its arguments resolved against the configuration.
#[derive(Debug)]
enum Job {
    Accounts(AccountsArgs),
    Bulk(BulkArgs),
    Subscriptions(SubscriptionsArgs),
    Organization(OrganizationArgs),
}

impl Cli {
    fn into_job(self, config: &Config) -> Result<Job, SetupError> {
        let output_dir = self
            .output_dir
            .unwrap_or_else(|| config.export.output_dir.clone());

        let job = match self.command {
            Command::Accounts {
                domain,
                include_disabled,
            } => Job::Accounts(AccountsArgs {
                query: QuerySpec::new(domain.as_deref(), include_disabled)?,
                output_dir,
            }),
            Command::Bulk {
                action,
                domain,
                include_disabled,
                no_skip_disabled,
                yes,
            } => Job::Bulk(BulkArgs::new(
                &domain,
                action,
                include_disabled,
                config.bulk.skip_already_disabled && !no_skip_disabled,
                yes,
                output_dir,
            )?),
            Command::Subscriptions => Job::Subscriptions(SubscriptionsArgs { output_dir }),
            Command::Organization => Job::Organization(OrganizationArgs { output_dir }),
        };
        Ok(job)
    }
}

async fn dispatch(cli: Cli, config: &Config, ctx: &mut RunContext) -> Result<()> {
    match cli.into_job(config).map_err(AppError::from)? {
        Job::Accounts(args) => commands::accounts::run(config, &args, ctx).await,
        Job::Bulk(args) => commands::bulk::run(config, &args, ctx).await,
        Job::Subscriptions(args) => commands::subscriptions::run(config, &args, ctx).await,
        Job::Organization(args) => commands::organization::run(config, &args, ctx).await,
    }
}
