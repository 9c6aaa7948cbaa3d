//! `organization`: tenant organization settings as depth-bounded JSON.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;

use super::{connect, finish};
use crate::api::models::Organization;
use crate::api::GraphClient;
use crate::auth::ApiSurface;
use crate::config::Config;
use crate::context::{CancelFlag, RunContext};
use crate::error::{AppError, FetchError};
use crate::export::{self, DEFAULT_JSON_DEPTH};
use crate::fetch::with_retry;
use crate::settings;

const EXPORT_PREFIX: &str = "TenantOrganization";

#[derive(Debug, Clone)]
pub struct OrganizationArgs {
    pub output_dir: PathBuf,
}

pub async fn fetch_organization(
    client: &GraphClient,
    config: &Config,
    cancel: &CancelFlag,
) -> Result<Organization, FetchError> {
    with_retry(&config.retry_policy(), "get organization", cancel, move || {
        client.get_organization()
    })
    .await
}

pub async fn run(config: &Config, args: &OrganizationArgs, ctx: &mut RunContext) -> Result<()> {
    let session = connect(config, ApiSurface::Graph, &ctx.cancel).await?;
    let client = GraphClient::new(&config.api.graph_base_url, &session)?;

    let organization = fetch_organization(&client, config, &ctx.cancel)
        .await
        .map_err(AppError::from)?;
    ctx.report.found = 1;
    ctx.log.info(format!(
        "Organization {} ({} verified domains)",
        organization.name_or_id(),
        organization.verified_domains.len()
    ));

    let label = organization.default_domain().unwrap_or(&session.tenant);
    settings::ensure_output_dir(&args.output_dir).map_err(AppError::from)?;
    let path = export::output_path(&args.output_dir, EXPORT_PREFIX, label, Local::now(), "json");
    export::write_json(&path, &organization, DEFAULT_JSON_DEPTH).map_err(AppError::from)?;

    ctx.log.success(format!("Wrote organization settings to {}", path.display()));
    ctx.report.processed = 1;
    ctx.report.set_output_path(path);

    finish(ctx);
    Ok(())
}
