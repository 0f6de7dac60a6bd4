//! Audit orchestration.
//!
//! One pipeline serves every audit type:
//! fetch → extract → keyword analysis → grading → context → model →
//! JSON repair → persist.
//!
//! Per-item failures never escape: a fetch, model or parse failure becomes
//! a zero-score `AuditResult` carrying the error, so batch and multi-type
//! runs always return one result per requested item.

mod context;
mod profile;

pub use context::ContextBuilder;
pub use profile::{AuditProfile, Grading};

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::models::{AuditResult, AuditTarget, AuditType, GradeSheet, KeywordRelevance, PageFacts};
use crate::error::{AppError, Result};
use crate::extractor::{ExtractOptions, PageExtractor};
use crate::repository::AuditStore;
use crate::service::http::{FetchedPage, PageFetcher};
use crate::service::llm::{json_repair, LlmClient};
use crate::service::{keyword, rubric};

#[derive(Debug, Clone)]
pub struct AuditSettings {
    pub fetch_timeout: Duration,
    pub llm_timeout: Duration,
    pub persist_timeout: Duration,
    pub max_concurrency: usize,
    pub max_output_tokens: u32,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(15),
            llm_timeout: Duration::from_secs(90),
            persist_timeout: Duration::from_secs(10),
            max_concurrency: 5,
            max_output_tokens: 2048,
        }
    }
}

pub struct AuditOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn AuditStore>,
    settings: AuditSettings,
}

impl AuditOrchestrator {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn AuditStore>,
        settings: AuditSettings,
    ) -> Self {
        Self {
            fetcher,
            llm,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &AuditSettings {
        &self.settings
    }

    // ====== Public operations ======

    /// Audits one page. Never fails; see the module docs.
    pub async fn run_audit(&self, target: &AuditTarget, audit_type: AuditType) -> AuditResult {
        log::info!("[AUDIT] {} audit of {}", audit_type, target.page_url);
        let result = match self.fetch(&target.page_url).await {
            Ok(page) => self.audit_page(target, audit_type, &page).await,
            Err(e) => self.failure(target, audit_type, e),
        };
        self.persist(&result).await;
        result
    }

    /// Audits several pages with at most `max_concurrency` in flight.
    /// Results come back in input order, one per target.
    pub async fn run_batch(&self, targets: Vec<AuditTarget>, audit_type: AuditType) -> Vec<AuditResult> {
        log::info!(
            "[AUDIT] Batch {} audit of {} pages (concurrency {})",
            audit_type,
            targets.len(),
            self.settings.max_concurrency
        );
        let results: Vec<AuditResult> = stream::iter(targets)
            .map(|target| async move { self.run_audit(&target, audit_type).await })
            .buffered(self.settings.max_concurrency.max(1))
            .collect()
            .await;

        let failed = results.iter().filter(|r| r.is_failure()).count();
        log::info!(
            "[AUDIT] Batch complete: {} succeeded, {} failed",
            results.len() - failed,
            failed
        );
        results
    }

    /// Fetches the page once and runs every requested audit type against
    /// it concurrently. Duplicate types are run once.
    pub async fn run_audit_types(&self, target: &AuditTarget, audit_types: &[AuditType]) -> Vec<AuditResult> {
        // Duplicates collapse onto their first occurrence; request order is kept.
        let mut types: Vec<AuditType> = Vec::with_capacity(audit_types.len());
        for audit_type in audit_types {
            if !types.contains(audit_type) {
                types.push(*audit_type);
            }
        }
        log::info!(
            "[AUDIT] {} audit types for {}",
            types.len(),
            target.page_url
        );

        let page = match self.fetch(&target.page_url).await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("[AUDIT] {}", e);
                return types
                    .into_iter()
                    .map(|t| AuditResult::failed(target, t, &e))
                    .collect();
            }
        };

        let page = &page;
        let results: Vec<AuditResult> = stream::iter(types)
            .map(|audit_type| async move {
                let result = self.audit_page(target, audit_type, page).await;
                self.persist(&result).await;
                result
            })
            .buffered(self.settings.max_concurrency.max(1))
            .collect()
            .await;
        results
    }

    // ====== Pipeline ======

    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        if url.trim().is_empty() {
            return Err(AppError::input("pageUrl is required"));
        }
        self.fetcher.fetch(url, self.settings.fetch_timeout).await
    }

    /// Everything after the fetch, with failures folded into the result.
    async fn audit_page(&self, target: &AuditTarget, audit_type: AuditType, page: &FetchedPage) -> AuditResult {
        match self.try_audit_page(target, audit_type, page).await {
            Ok(result) => result,
            Err(e) => self.failure(target, audit_type, e),
        }
    }

    async fn try_audit_page(
        &self,
        target: &AuditTarget,
        audit_type: AuditType,
        page: &FetchedPage,
    ) -> Result<AuditResult> {
        let profile = AuditProfile::for_type(audit_type);
        let facts = self.extract(profile, target, page);
        let relevance = target.keyword().map(|k| keyword::analyze(&facts, k));
        let grades = Self::grade(profile, &facts, relevance.as_ref());

        let user_prompt = ContextBuilder::new(profile, target, &facts)
            .relevance(relevance.as_ref())
            .grades(grades.as_ref())
            .build();
        let raw = self.complete(&profile.system_prompt(), &user_prompt).await?;
        let verdict = json_repair::parse_verdict(&raw)?;

        log::info!(
            "[AUDIT] {} audit of {} scored {}",
            audit_type,
            target.page_url,
            verdict.score
        );
        Ok(AuditResult::from_verdict(target, audit_type, verdict, grades))
    }

    fn extract(&self, profile: &AuditProfile, target: &AuditTarget, page: &FetchedPage) -> PageFacts {
        let options = ExtractOptions {
            headers: Some(&page.headers),
            technical: profile.technical,
            performance: profile.performance,
        };
        PageExtractor::extract_with(&page.body, &target.page_url, &options)
    }

    fn grade(profile: &AuditProfile, facts: &PageFacts, relevance: Option<&KeywordRelevance>) -> Option<GradeSheet> {
        let fallback = KeywordRelevance::default();
        let relevance = relevance.unwrap_or(&fallback);
        match profile.grading {
            Grading::None => None,
            Grading::Core => Some(rubric::grade(facts, relevance)),
            Grading::Scoped(criteria) => Some(rubric::grade_criteria(facts, relevance, criteria)),
        }
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let call = self
            .llm
            .complete(system_prompt, user_prompt, self.settings.max_output_tokens);
        match tokio::time::timeout(self.settings.llm_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::service(
                "llm",
                format!(
                    "{} timed out after {}s",
                    self.llm.name(),
                    self.settings.llm_timeout.as_secs()
                ),
            )),
        }
    }

    fn failure(&self, target: &AuditTarget, audit_type: AuditType, error: AppError) -> AuditResult {
        log::warn!("[AUDIT] {} audit of {} failed: {}", audit_type, target.page_url, error);
        AuditResult::failed(target, audit_type, &error)
    }

    /// Best-effort upsert of successful verdicts. Errors and timeouts are
    /// logged and swallowed.
    async fn persist(&self, result: &AuditResult) {
        if result.is_failure() {
            return;
        }
        match tokio::time::timeout(self.settings.persist_timeout, self.store.upsert(result)).await {
            Ok(Ok(())) => log::debug!("[STORE] Saved {} result for {}", result.audit_type, result.page_url),
            Ok(Err(e)) => log::error!("[STORE] Failed to save result for {}: {}", result.page_url, e),
            Err(_) => log::error!("[STORE] Timed out saving result for {}", result.page_url),
        }
    }
}
