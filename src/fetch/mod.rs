//! Shared fetch utilities: throttling-aware retry and link-following pagination.

pub mod paginate;
pub mod retry;

pub use paginate::{paginate, Page, PageLimits, ResultSet};
pub use retry::{with_retry, RetryPolicy};
