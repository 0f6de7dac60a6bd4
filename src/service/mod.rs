pub mod auditor;
pub mod http;
pub mod keyword;
pub mod llm;
pub mod rubric;

pub use auditor::{AuditOrchestrator, AuditSettings};
pub use http::{ClientType, HttpFetcher, PageFetcher};
pub use llm::{GeminiClient, LlmClient};
