//! Persistence of audit verdicts.

pub mod sqlite;

use async_trait::async_trait;

use crate::domain::models::{AuditResult, AuditType};
use crate::error::Result;

/// Verdict cache keyed by (site URL, page URL, audit type).
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Insert or replace the row for the result's key. Re-upserting the same
    /// key is idempotent; the last write wins.
    async fn upsert(&self, result: &AuditResult) -> Result<()>;

    async fn get(&self, site_url: &str, page_url: &str, audit_type: AuditType) -> Result<Option<AuditResult>>;
}
