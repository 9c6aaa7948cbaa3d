//! Subcommand drivers: each one composes auth, fetch, classify and export.

pub mod accounts;
pub mod bulk;
pub mod organization;
pub mod subscriptions;

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::auth::{ApiSurface, AuthProvider, Credentials, TenantContext};
use crate::config::Config;
use crate::context::{CancelFlag, RunContext};
use crate::error::{AppError, AuthError};
use crate::export::{self, Flatten};
use crate::settings;

/// Resolve credentials and open a session for `surface`.
///
/// An interrupt during sign-in is reported as a cancellation, not a failure.
pub async fn connect(
    config: &Config,
    surface: ApiSurface,
    cancel: &CancelFlag,
) -> Result<TenantContext, AppError> {
    let credentials = Credentials::resolve(config)?;
    let session = credentials.connect(surface).await;
    if cancel.is_cancelled() {
        return Err(AuthError::UserCancelled.into());
    }

    let session = session?;
    if session.is_expired() {
        return Err(AuthError::InvalidTokenResponse(format!(
            "{} token for {} has already expired",
            session.surface, session.tenant
        ))
        .into());
    }
    Ok(session)
}

/// Write `records` as CSV under `dir` and record the path in the run report.
pub(crate) fn export_csv<T: Flatten>(
    dir: &Path,
    prefix: &str,
    label: &str,
    records: &[T],
    ctx: &mut RunContext,
) -> Result<PathBuf, AppError> {
    settings::ensure_output_dir(dir)?;
    let path = export::output_path(dir, prefix, label, Local::now(), "csv");
    let flat: Vec<_> = records.iter().map(Flatten::flatten).collect();
    let rows = export::write_csv(&path, T::COLUMNS, &flat)?;

    ctx.log.success(format!("Wrote {} rows to {}", rows, path.display()));
    ctx.report.set_output_path(path.clone());
    Ok(path)
}

/// Close out a run: freeze timing and log the summary.
pub(crate) fn finish(ctx: &mut RunContext) {
    ctx.report.finish();
    let line = ctx.report.closing_line();
    ctx.log.info(line);
}
