//! Process lifecycle: logging, shared state and the HTTP server.

use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};
use anyhow::Result;
use sqlx::SqlitePool;
use std::net::TcpListener;
use std::sync::Arc;

use crate::config::{AppConfig, ENV_PREFIX};
use crate::error::AppError;
use crate::repository::sqlite::AuditRepository;
use crate::repository::AuditStore;
use crate::routes;
use crate::service::{AuditOrchestrator, AuditSettings, ClientType, GeminiClient, HttpFetcher, PageFetcher};

/// Initialize logging with tracing_subscriber.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("sqlx=warn".parse().expect("valid directive"))
        .add_directive("seo_auditor=debug".parse().expect("valid directive"))
        .add_directive("info".parse().expect("valid directive"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_target(false)
        .with_ansi(true)
        .init();
}

/// Everything the request handlers share.
pub struct AppState {
    /// `None` when no LLM credential is configured; audit routes then
    /// answer with a `ConfigError`.
    auditor: Option<Arc<AuditOrchestrator>>,
    pub store: Arc<dyn AuditStore>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub settings: AuditSettings,
    pub max_batch_pages: usize,
}

impl AppState {
    pub fn new(
        auditor: Option<Arc<AuditOrchestrator>>,
        store: Arc<dyn AuditStore>,
        fetcher: Arc<dyn PageFetcher>,
        settings: AuditSettings,
        max_batch_pages: usize,
    ) -> Self {
        Self {
            auditor,
            store,
            fetcher,
            settings,
            max_batch_pages,
        }
    }

    pub fn auditor(&self) -> crate::error::Result<&AuditOrchestrator> {
        self.auditor.as_deref().ok_or_else(|| {
            AppError::config(format!(
                "Gemini API key missing; set {}__GEMINI__API_KEY",
                ENV_PREFIX
            ))
        })
    }
}

/// Wires the production collaborators from configuration.
pub fn build_state(config: &AppConfig, pool: SqlitePool) -> Result<AppState> {
    let settings = config.audit_settings();
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(ClientType::Browser)?);
    let store: Arc<dyn AuditStore> = Arc::new(AuditRepository::new(pool));

    let auditor = match config.gemini_settings() {
        Ok(gemini) => {
            log::info!("[LLM] Using Gemini model {}", gemini.model);
            let llm = Arc::new(GeminiClient::new(gemini)?);
            Some(Arc::new(AuditOrchestrator::new(
                fetcher.clone(),
                llm,
                store.clone(),
                settings.clone(),
            )))
        }
        Err(e) => {
            log::warn!("[LLM] {}; audit routes are disabled", e);
            None
        }
    };

    Ok(AppState::new(
        auditor,
        store,
        fetcher,
        settings,
        config.audit.max_batch_pages,
    ))
}

pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(routes::configure)
            .app_data(state.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
