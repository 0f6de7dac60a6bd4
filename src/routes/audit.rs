use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::required;
use crate::domain::models::{AuditResult, AuditTarget, AuditType};
use crate::error::{AppError, Result};
use crate::lifecycle::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunAuditRequest {
    pub site_url: String,
    pub page_url: String,
    pub audit_type: Option<String>,
    pub keyword: Option<String>,
    pub business_context: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunBatchRequest {
    pub site_url: String,
    pub page_urls: Vec<String>,
    pub audit_type: Option<String>,
    pub keyword: Option<String>,
    pub business_context: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunTypesRequest {
    pub site_url: String,
    pub page_url: String,
    pub audit_types: Vec<String>,
    pub keyword: Option<String>,
    pub business_context: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResultQuery {
    pub site_url: String,
    pub page_url: String,
    pub audit_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub results: Vec<AuditResult>,
}

fn audit_type(raw: Option<&str>) -> Result<AuditType> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw.parse(),
        None => Ok(AuditType::Seo),
    }
}

fn target(site_url: &str, page_url: &str, keyword: Option<String>, business_context: Option<String>) -> Result<AuditTarget> {
    let mut target = AuditTarget::new(required(site_url, "siteUrl")?, required(page_url, "pageUrl")?);
    target.keyword = keyword;
    target.business_context = business_context.unwrap_or_default();
    Ok(target)
}

#[post("/run")]
pub async fn run_audit(state: web::Data<AppState>, body: web::Json<RunAuditRequest>) -> Result<HttpResponse> {
    let body = body.into_inner();
    let audit_type = audit_type(body.audit_type.as_deref())?;
    let target = target(&body.site_url, &body.page_url, body.keyword, body.business_context)?;
    let auditor = state.auditor()?;

    let result = auditor.run_audit(&target, audit_type).await;
    Ok(HttpResponse::Ok().json(result))
}

#[post("/run-batch")]
pub async fn run_batch(state: web::Data<AppState>, body: web::Json<RunBatchRequest>) -> Result<HttpResponse> {
    let body = body.into_inner();
    let audit_type = audit_type(body.audit_type.as_deref())?;
    let site_url = required(&body.site_url, "siteUrl")?;
    if body.page_urls.is_empty() {
        return Err(AppError::input("pageUrls must not be empty"));
    }
    if body.page_urls.len() > state.max_batch_pages {
        return Err(AppError::input(format!(
            "Batch of {} pages exceeds the limit of {}",
            body.page_urls.len(),
            state.max_batch_pages
        )));
    }
    let targets = body
        .page_urls
        .iter()
        .map(|page_url| target(site_url, page_url, body.keyword.clone(), body.business_context.clone()))
        .collect::<Result<Vec<_>>>()?;
    let auditor = state.auditor()?;

    let results = auditor.run_batch(targets, audit_type).await;
    Ok(HttpResponse::Ok().json(ResultsResponse { results }))
}

#[post("/run-types")]
pub async fn run_types(state: web::Data<AppState>, body: web::Json<RunTypesRequest>) -> Result<HttpResponse> {
    let body = body.into_inner();
    if body.audit_types.is_empty() {
        return Err(AppError::input("auditTypes must not be empty"));
    }
    let audit_types = body
        .audit_types
        .iter()
        .map(|t| t.parse())
        .collect::<Result<Vec<AuditType>>>()?;
    let target = target(&body.site_url, &body.page_url, body.keyword, body.business_context)?;
    let auditor = state.auditor()?;

    let results = auditor.run_audit_types(&target, &audit_types).await;
    Ok(HttpResponse::Ok().json(ResultsResponse { results }))
}

/// Last stored verdict for (siteUrl, pageUrl, auditType).
#[get("/result")]
pub async fn get_result(state: web::Data<AppState>, query: web::Query<ResultQuery>) -> Result<HttpResponse> {
    let audit_type = audit_type(query.audit_type.as_deref())?;
    let site_url = required(&query.site_url, "siteUrl")?;
    let page_url = required(&query.page_url, "pageUrl")?;

    match state.store.get(site_url, page_url, audit_type).await? {
        Some(result) => Ok(HttpResponse::Ok().json(result)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "error": format!("No {} audit stored for {}", audit_type, page_url)
        }))),
    }
}
