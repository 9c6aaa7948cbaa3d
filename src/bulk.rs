//! Sequential bulk account actions.
//!
//! Targets are processed one at a time with a fixed pause between requests.
//! A failing record is logged and counted; the batch carries on.

use std::fmt;
use std::time::Duration;

use clap::ValueEnum;

use crate::api::models::User;
use crate::context::RunContext;
use crate::error::{ApiError, FetchError};
use crate::export::{FlatRecord, Flatten};
use crate::fetch::{with_retry, RetryPolicy};

/// Account-level mutations the tool can apply.
#[allow(async_fn_in_trait)]
pub trait AccountMutator {
    async fn disable_user(&self, user_id: &str) -> Result<(), ApiError>;
    async fn delete_user(&self, user_id: &str) -> Result<(), ApiError>;
    async fn revoke_sessions(&self, user_id: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BulkAction {
    Disable,
    Delete,
    RevokeSessions,
}

impl BulkAction {
    /// Past-tense verb for log lines.
    fn done(&self) -> &'static str {
        match self {
            Self::Disable => "Disabled",
            Self::Delete => "Deleted",
            Self::RevokeSessions => "Revoked sessions for",
        }
    }
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disable => f.write_str("disable"),
            Self::Delete => f.write_str("delete"),
            Self::RevokeSessions => f.write_str("revoke-sessions"),
        }
    }
}

async fn apply<M: AccountMutator>(
    mutator: &M,
    action: BulkAction,
    user_id: &str,
) -> Result<(), ApiError> {
    match action {
        BulkAction::Disable => mutator.disable_user(user_id).await,
        BulkAction::Delete => mutator.delete_user(user_id).await,
        BulkAction::RevokeSessions => mutator.revoke_sessions(user_id).await,
    }
}

#[derive(Debug, Clone)]
pub struct BulkOptions {
    pub action: BulkAction,
    /// Skip accounts that are already disabled when the action is `disable`.
    pub skip_already_disabled: bool,
    pub inter_request_delay: Duration,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOutcome {
    Succeeded,
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub user_id: String,
    pub principal_name: String,
    pub outcome: BulkOutcome,
}

impl Flatten for RecordOutcome {
    const COLUMNS: &'static [&'static str] = &["Id", "UserPrincipalName", "Result", "Detail"];

    fn flatten(&self) -> FlatRecord {
        let (result, detail) = match &self.outcome {
            BulkOutcome::Succeeded => ("Succeeded", ""),
            BulkOutcome::Skipped { reason } => ("Skipped", reason.as_str()),
            BulkOutcome::Failed { error } => ("Failed", error.as_str()),
        };

        FlatRecord::new()
            .field("Id", &self.user_id)
            .field("UserPrincipalName", &self.principal_name)
            .field("Result", result)
            .field("Detail", detail)
    }
}

/// Per-record outcomes in processing order.
#[derive(Debug, Default)]
pub struct BulkReport {
    pub outcomes: Vec<RecordOutcome>,
    /// Targets never attempted because the run was cancelled.
    pub not_attempted: usize,
}

impl BulkReport {
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, BulkOutcome::Succeeded))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, BulkOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, BulkOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&BulkOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|r| pred(&r.outcome)).count()
    }
}

fn precondition_failure(user: &User, options: &BulkOptions) -> Option<String> {
    if options.action == BulkAction::Disable
        && options.skip_already_disabled
        && user.account_enabled == Some(false)
    {
        return Some("already disabled".to_string());
    }
    None
}

fn stop_cancelled(report: &mut BulkReport, remaining: usize, ctx: &mut RunContext) {
    report.not_attempted = remaining;
    ctx.log.warning(format!(
        "Cancelled, {} accounts not processed",
        report.not_attempted
    ));
}

/// Apply `options.action` to every target in order.
///
/// Counts land in `ctx.report`; every outcome is written to `ctx.log`.
pub async fn execute<M: AccountMutator>(
    mutator: &M,
    targets: &[User],
    options: &BulkOptions,
    ctx: &mut RunContext,
) -> BulkReport {
    let mut report = BulkReport::default();
    ctx.report.found = targets.len();
    ctx.log.info(format!(
        "Starting {} for {} accounts",
        options.action,
        targets.len()
    ));

    for (idx, user) in targets.iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            stop_cancelled(&mut report, targets.len() - idx, ctx);
            break;
        }

        let principal = user.principal_name().to_string();

        let outcome = if let Some(reason) = precondition_failure(user, options) {
            ctx.report.skipped += 1;
            ctx.log.warning(format!("Skipped {}: {}", principal, reason));
            BulkOutcome::Skipped { reason }
        } else {
            if idx > 0 && !options.inter_request_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(options.inter_request_delay) => {}
                    _ = ctx.cancel.cancelled() => {
                        stop_cancelled(&mut report, targets.len() - idx, ctx);
                        break;
                    }
                }
            }

            let operation = format!("{} {}", options.action, principal);
            let action = options.action;
            let user_id = user.id.as_str();
            let result = with_retry(&options.retry, &operation, &ctx.cancel, move || {
                apply(mutator, action, user_id)
            })
            .await;
            match result {
                Ok(()) => {
                    ctx.report.processed += 1;
                    ctx.log.success(format!("{} {}", action.done(), principal));
                    BulkOutcome::Succeeded
                }
                Err(FetchError::Cancelled { .. }) => {
                    stop_cancelled(&mut report, targets.len() - idx, ctx);
                    break;
                }
                Err(e) => {
                    ctx.report.errored += 1;
                    ctx.log.error(format!("Failed to {} {}: {}", action, principal, e));
                    BulkOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            }
        };

        report.outcomes.push(RecordOutcome {
            user_id: user.id.clone(),
            principal_name: principal,
            outcome,
        });
    }

    ctx.log.info(ctx.report.summary_line());
    report
}
