//! `subscriptions`: Azure subscription inventory over Resource Manager.

use std::path::PathBuf;

use anyhow::Result;

use super::{connect, export_csv, finish};
use crate::api::models::Subscription;
use crate::api::ArmClient;
use crate::auth::ApiSurface;
use crate::config::Config;
use crate::context::RunContext;
use crate::error::{AppError, FetchError};
use crate::fetch::{paginate, PageLimits, ResultSet};

const EXPORT_PREFIX: &str = "AzureSubscriptions";

#[derive(Debug, Clone)]
pub struct SubscriptionsArgs {
    pub output_dir: PathBuf,
}

pub async fn collect_subscriptions(
    client: &ArmClient,
    config: &Config,
    ctx: &RunContext,
) -> Result<ResultSet<Subscription>, FetchError> {
    // ARM picks its own page size
    let limits = PageLimits {
        max_pages: config.pagination.max_pages,
        ..PageLimits::default()
    };

    paginate(
        &config.retry_policy(),
        "list subscriptions",
        client.subscriptions_url(),
        &limits,
        &ctx.cancel,
        move |url| async move { client.get_page::<Subscription>(url).await },
    )
    .await
}

pub async fn run(config: &Config, args: &SubscriptionsArgs, ctx: &mut RunContext) -> Result<()> {
    let session = connect(config, ApiSurface::ResourceManager, &ctx.cancel).await?;
    let client = ArmClient::new(
        &config.api.management_base_url,
        &config.api.subscriptions_api_version,
        &session,
    )?;

    let subscriptions = collect_subscriptions(&client, config, ctx)
        .await
        .map_err(AppError::from)?;
    ctx.report.found = subscriptions.len();

    let disabled = subscriptions
        .records()
        .iter()
        .filter(|s| s.state != "Enabled")
        .count();
    if disabled > 0 {
        ctx.log.warning(format!("{} subscriptions are not enabled", disabled));
    }

    export_csv(
        &args.output_dir,
        EXPORT_PREFIX,
        &session.tenant,
        subscriptions.records(),
        ctx,
    )?;
    ctx.report.processed = subscriptions.len();

    finish(ctx);
    Ok(())
}
