//! `accounts`: directory user inventory with account status.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;

use super::{connect, export_csv, finish};
use crate::api::models::{ClassifiedUser, User};
use crate::api::GraphClient;
use crate::auth::ApiSurface;
use crate::classify::classify_user;
use crate::config::Config;
use crate::context::RunContext;
use crate::error::{ApiError, AppError, FetchError};
use crate::fetch::{paginate, Page, ResultSet};
use crate::query::QuerySpec;

const EXPORT_PREFIX: &str = "TenantAccounts";

#[derive(Debug, Clone)]
pub struct AccountsArgs {
    pub query: QuerySpec,
    pub output_dir: PathBuf,
}

/// Fetch every user matching `query`, classifying each page as it arrives.
pub async fn collect_accounts(
    client: &GraphClient,
    config: &Config,
    query: &QuerySpec,
    ctx: &RunContext,
) -> Result<ResultSet<ClassifiedUser>, FetchError> {
    let limits = config.graph_page_limits();

    paginate(
        &config.retry_policy(),
        "list users",
        client.users_url(query, limits.page_size),
        &limits,
        &ctx.cancel,
        move |url| async move {
            let page: Page<User> = client.get_page(url).await?;
            Ok::<_, ApiError>(Page {
                records: page
                    .records
                    .into_iter()
                    .map(|user| ClassifiedUser {
                        status: classify_user(&user),
                        user,
                    })
                    .collect(),
                next_link: page.next_link,
            })
        },
    )
    .await
}

pub async fn run(config: &Config, args: &AccountsArgs, ctx: &mut RunContext) -> Result<()> {
    let session = connect(config, ApiSurface::Graph, &ctx.cancel).await?;
    let client = GraphClient::new(&config.api.graph_base_url, &session)?;

    ctx.log.info(format!(
        "Collecting accounts for {} (disabled accounts {})",
        args.query.scope_label(&session.tenant),
        if args.query.include_disabled() { "included" } else { "excluded" }
    ));

    let accounts = collect_accounts(&client, config, &args.query, ctx)
        .await
        .map_err(AppError::from)?;
    ctx.report.found = accounts.len();
    if accounts.is_empty() {
        ctx.log.warning("No accounts matched the query");
    }

    if !accounts.is_complete() {
        ctx.log.warning(format!(
            "Run cancelled after {} pages; exporting partial results",
            accounts.pages()
        ));
    }

    let mut by_status: BTreeMap<&str, usize> = BTreeMap::new();
    for account in accounts.records() {
        *by_status.entry(account.status.as_str()).or_default() += 1;
    }
    for (status, count) in &by_status {
        ctx.log.info(format!("{}: {}", status, count));
    }

    export_csv(
        &args.output_dir,
        EXPORT_PREFIX,
        args.query.scope_label(&session.tenant),
        accounts.records(),
        ctx,
    )?;
    ctx.report.processed = accounts.len();

    finish(ctx);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{SecureString, TenantContext};
    use crate::classify::AccountStatus;
    use chrono::Utc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session() -> TenantContext {
        TenantContext {
            tenant: "contoso.onmicrosoft.com".into(),
            principal: "test".into(),
            surface: ApiSurface::Graph,
            access_token: SecureString::from("graph-token".to_string()),
            acquired_at: Utc::now(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_collect_accounts_classifies_in_page_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users"))
            .and(query_param("$skiptoken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [
                    {"id": "3", "userPrincipalName": "shared@example.com", "accountEnabled": false}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users"))
            .and(query_param("$top", "999"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [
                    {"id": "1", "userPrincipalName": "a@example.com", "accountEnabled": true,
                     "assignedLicenses": [{"skuId": "sku"}]},
                    {"id": "2", "userPrincipalName": "b@example.com", "accountEnabled": true}
                ],
                "@odata.nextLink": format!("{}/v1.0/users?$skiptoken=p2", server.uri())
            })))
            .mount(&server)
            .await;

        let mut config = Config::embedded().unwrap();
        config.retry.base_delay_seconds = 0;
        let client = GraphClient::new(&format!("{}/v1.0", server.uri()), &session()).unwrap();
        let query = QuerySpec::new(Some("example.com"), true).unwrap();
        let ctx = RunContext::detached();

        let accounts = collect_accounts(&client, &config, &query, &ctx).await.unwrap();

        assert!(accounts.is_complete());
        assert_eq!(accounts.pages(), 2);
        let statuses: Vec<_> = accounts
            .records()
            .iter()
            .map(|a| (a.user.id.as_str(), a.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("1", AccountStatus::EnabledUser),
                ("2", AccountStatus::EnabledUnlicensed),
                ("3", AccountStatus::SharedMailboxProbable),
            ]
        );
    }

    #[tokio::test]
    async fn test_repeated_next_link_is_rejected() {
        let server = MockServer::start().await;
        let looping = format!("{}/v1.0/users?$skiptoken=same", server.uri());
        Mock::given(method("GET"))
            .and(path("/v1.0/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{"id": "1"}],
                "@odata.nextLink": looping
            })))
            .mount(&server)
            .await;

        let config = Config::embedded().unwrap();
        let client = GraphClient::new(&format!("{}/v1.0", server.uri()), &session()).unwrap();
        let query = QuerySpec::new(None, true).unwrap();
        let ctx = RunContext::detached();

        let err = collect_accounts(&client, &config, &query, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::PaginationLoopSuspected { pages: 2, .. }));
    }
}
