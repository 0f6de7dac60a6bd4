use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;

use crate::lifecycle::AppState;

/// Liveness plus whether the audit routes are usable.
#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "llmConfigured": state.auditor().is_ok(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use serde_json::Value;
    use std::sync::Arc;

    use crate::routes::configure;
    use crate::service::auditor::AuditSettings;
    use crate::test_utils::fakes::{FakeFetcher, MemoryStore};

    #[actix_web::test]
    async fn test_health() {
        let state = web::Data::new(AppState::new(
            None,
            Arc::new(MemoryStore::default()),
            Arc::new(FakeFetcher::new()),
            AuditSettings::default(),
            10,
        ));
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["llmConfigured"], false);
    }
}
