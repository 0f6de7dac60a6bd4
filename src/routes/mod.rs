//! HTTP surface.
//!
//! Audit handlers answer 200 even when an individual audit failed; the
//! failure is embedded in the result body. Only malformed input (400) and
//! missing configuration (500) change the status.

pub mod audit;
pub mod health;
pub mod sitemap;

use actix_web::web;

use crate::error::{AppError, Result};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(
            web::scope("/audit")
                .service(audit::run_audit)
                .service(audit::run_batch)
                .service(audit::run_types)
                .service(audit::get_result),
        )
        .service(web::scope("/sitemap").service(sitemap::discover));
}

/// Trimmed value of a required string field.
pub(crate) fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::input(format!("{} is required", field)));
    }
    Ok(value)
}
