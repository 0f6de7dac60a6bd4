use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::models::{AuditResult, AuditType};
use crate::error::AppError;
use crate::repository::AuditStore;

pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace the verdict for (site, page, audit type).
    pub async fn save_result(&self, result: &AuditResult) -> Result<()> {
        let json = serde_json::to_string(result).context("Failed to serialize audit result")?;
        let created_at = result.created_at.to_rfc3339();

        sqlx::query(
            "INSERT INTO audit_results (site_url, page_url, audit_type, keyword, score, result_json, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))
             ON CONFLICT(site_url, page_url, audit_type) DO UPDATE SET
                keyword = excluded.keyword,
                score = excluded.score,
                result_json = excluded.result_json,
                created_at = excluded.created_at,
                updated_at = datetime('now')",
        )
        .bind(&result.site_url)
        .bind(&result.page_url)
        .bind(result.audit_type.as_str())
        .bind(result.keyword.as_deref())
        .bind(i64::from(result.score))
        .bind(json)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .context("Failed to save audit result to database")?;

        Ok(())
    }

    pub async fn get_result(&self, site_url: &str, page_url: &str, audit_type: AuditType) -> Result<Option<AuditResult>> {
        let row = sqlx::query_scalar::<_, String>(
            "SELECT result_json FROM audit_results WHERE site_url = ? AND page_url = ? AND audit_type = ?",
        )
        .bind(site_url)
        .bind(page_url)
        .bind(audit_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get audit result from database")?;

        row.map(|json| serde_json::from_str(&json).context("Stored audit result is not valid JSON"))
            .transpose()
    }

    pub async fn count_for_site(&self, site_url: &str) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM audit_results WHERE site_url = ?")
            .bind(site_url)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count audit results")
    }
}

#[async_trait]
impl AuditStore for AuditRepository {
    async fn upsert(&self, result: &AuditResult) -> crate::error::Result<()> {
        self.save_result(result)
            .await
            .map_err(|e| AppError::persistence(format!("{:#}", e)))
    }

    async fn get(
        &self,
        site_url: &str,
        page_url: &str,
        audit_type: AuditType,
    ) -> crate::error::Result<Option<AuditResult>> {
        self.get_result(site_url, page_url, audit_type)
            .await
            .map_err(|e| AppError::persistence(format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AuditTarget, AuditVerdict};
    use crate::test_utils::fixtures;

    fn result_with_score(score: u8) -> AuditResult {
        let target = AuditTarget::new("https://example.com", "https://example.com/pricing");
        AuditResult::from_verdict(
            &target,
            AuditType::Seo,
            AuditVerdict {
                score,
                summary: format!("score {}", score),
                strengths: vec!["Fast".into()],
                ..Default::default()
            },
            None,
        )
    }

    #[tokio::test]
    async fn test_get_returns_none_when_not_cached() {
        let pool = fixtures::setup_test_db().await;
        let repo = AuditRepository::new(pool);

        let result = repo
            .get_result("https://example.com", "https://example.com/", AuditType::Seo)
            .await
            .unwrap();
        assert!(result.is_none(), "Should return None for an unknown key");
    }

    #[tokio::test]
    async fn test_save_and_get_result() {
        let pool = fixtures::setup_test_db().await;
        let repo = AuditRepository::new(pool);
        let saved = result_with_score(72);

        repo.save_result(&saved).await.unwrap();

        let loaded = repo
            .get_result("https://example.com", "https://example.com/pricing", AuditType::Seo)
            .await
            .unwrap();
        assert_eq!(loaded, Some(saved));
    }

    #[tokio::test]
    async fn test_upsert_is_last_write_wins() {
        let pool = fixtures::setup_test_db().await;
        let repo = AuditRepository::new(pool);

        repo.upsert(&result_with_score(40)).await.unwrap();
        repo.upsert(&result_with_score(90)).await.unwrap();
        repo.upsert(&result_with_score(90)).await.unwrap();

        let loaded = repo
            .get("https://example.com", "https://example.com/pricing", AuditType::Seo)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.score, 90);
        assert_eq!(repo.count_for_site("https://example.com").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_audit_types_are_separate_rows() {
        let pool = fixtures::setup_test_db().await;
        let repo = AuditRepository::new(pool);

        let seo = result_with_score(50);
        let mut security = result_with_score(60);
        security.audit_type = AuditType::Security;
        repo.upsert(&seo).await.unwrap();
        repo.upsert(&security).await.unwrap();

        assert_eq!(repo.count_for_site("https://example.com").await.unwrap(), 2);
    }
}
