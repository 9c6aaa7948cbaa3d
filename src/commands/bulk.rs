//! `bulk`: disable, delete or revoke sessions for every matching account.

use std::path::PathBuf;

use anyhow::{Context, Result};
use dialoguer::Confirm;

use super::{connect, export_csv, finish};
use crate::api::models::User;
use crate::api::GraphClient;
use crate::auth::ApiSurface;
use crate::bulk::{execute, BulkAction, BulkOptions, BulkReport};
use crate::config::Config;
use crate::context::RunContext;
use crate::error::{AppError, FetchError, SetupError};
use crate::fetch::paginate;
use crate::query::QuerySpec;

const EXPORT_PREFIX: &str = "BulkAction";

#[derive(Debug, Clone)]
pub struct BulkArgs {
    pub query: QuerySpec,
    pub action: BulkAction,
    pub skip_already_disabled: bool,
    /// Skip the confirmation prompt.
    pub assume_yes: bool,
    pub output_dir: PathBuf,
}

impl BulkArgs {
    /// Build the arguments for one run from command-line values.
    ///
    /// A skipping `disable` run always fetches disabled accounts, so they are
    /// reported as skipped instead of silently dropped by the query.
    pub fn new(
        domain: &str,
        action: BulkAction,
        include_disabled: bool,
        skip_already_disabled: bool,
        assume_yes: bool,
        output_dir: PathBuf,
    ) -> Result<Self, SetupError> {
        let fetch_disabled =
            include_disabled || (action == BulkAction::Disable && skip_already_disabled);

        Ok(Self {
            query: QuerySpec::new(Some(domain), fetch_disabled)?,
            action,
            skip_already_disabled,
            assume_yes,
            output_dir,
        })
    }
}

/// Fetch the target users and drop any the query would not select.
pub async fn collect_targets(
    client: &GraphClient,
    config: &Config,
    query: &QuerySpec,
    ctx: &mut RunContext,
) -> Result<Vec<User>, FetchError> {
    let limits = config.graph_page_limits();
    let fetched = paginate(
        &config.retry_policy(),
        "list users",
        client.users_url(query, limits.page_size),
        &limits,
        &ctx.cancel,
        move |url| async move { client.get_page::<User>(url).await },
    )
    .await?;

    let total = fetched.len();
    let targets: Vec<User> = fetched
        .into_records()
        .into_iter()
        .filter(|user| query.matches(user))
        .collect();

    if targets.len() < total {
        ctx.log.warning(format!(
            "Ignored {} accounts outside the requested scope",
            total - targets.len()
        ));
    }
    Ok(targets)
}

fn options(config: &Config, args: &BulkArgs) -> BulkOptions {
    BulkOptions {
        action: args.action,
        skip_already_disabled: args.skip_already_disabled,
        inter_request_delay: config.inter_request_delay(),
        retry: config.retry_policy(),
    }
}

/// Apply the action to `targets` without prompting.
pub async fn apply(
    client: &GraphClient,
    config: &Config,
    args: &BulkArgs,
    targets: &[User],
    ctx: &mut RunContext,
) -> BulkReport {
    execute(client, targets, &options(config, args), ctx).await
}

fn confirm(action: BulkAction, count: usize, scope: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(format!("{} {} accounts in {}?", action, count, scope))
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

/// The operator answered no: nothing changed, but the run still closes out.
fn declined(ctx: &mut RunContext) {
    ctx.log.warning("Cancelled by operator before any change was made");
    finish(ctx);
}

pub async fn run(config: &Config, args: &BulkArgs, ctx: &mut RunContext) -> Result<()> {
    let session = connect(config, ApiSurface::Graph, &ctx.cancel).await?;
    let client = GraphClient::new(&config.api.graph_base_url, &session)?;
    let scope = args.query.scope_label(&session.tenant).to_string();

    let targets = collect_targets(&client, config, &args.query, ctx)
        .await
        .map_err(AppError::from)?;

    if targets.is_empty() {
        ctx.log.info(format!("No accounts matched in {}", scope));
        finish(ctx);
        return Ok(());
    }

    if !args.assume_yes && !confirm(args.action, targets.len(), &scope)? {
        declined(ctx);
        return Ok(());
    }

    let report = apply(&client, config, args, &targets, ctx).await;
    if report.failed() > 0 {
        ctx.log.warning(format!(
            "{} accounts could not be processed; see the errors above",
            report.failed()
        ));
    }

    export_csv(&args.output_dir, EXPORT_PREFIX, &scope, &report.outcomes, ctx)?;

    finish(ctx);
    Ok(())
}
