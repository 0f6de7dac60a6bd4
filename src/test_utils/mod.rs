//! Shared test utilities and fixtures
//!
//! In-process fakes for the fetch, model and persistence seams, plus canned
//! pages and payloads, so unit tests never touch the network.

#[cfg(test)]
pub mod fixtures {
    use sqlx::SqlitePool;

    /// Creates an in-memory SQLite database with migrations applied
    pub async fn setup_test_db() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        sqlx::migrate!()
            .run(&pool)
            .await
            .expect("Failed to run migrations");
        pool
    }
}
