//! Health checks.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::OK;
    };

    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use secrecy::SecretString;

    use super::*;
    use crate::config::{GeolocationConfig, StorefrontConfig};
    use crate::db::memory::{MemoryCatalog, MemoryOrders, MemorySettings};
    use crate::state::Repositories;

    fn state() -> AppState {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/oja"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("Zr8#kLq2!vW9mXp4@nTb7$hYc3&fJd6*"),
            admin_token: SecretString::from("k7Qm2vXp9LrT4wZs8NbYc3HfJd6GaE1u"),
            geolocation: GeolocationConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        };
        let repos = Repositories {
            catalog: Arc::new(MemoryCatalog::new()),
            orders: Arc::new(MemoryOrders::new()),
            settings: Arc::new(MemorySettings::new()),
        };
        AppState::new(config, None, repos).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        assert_eq!(health().await, "ok");
    }

    #[tokio::test]
    async fn test_ready_without_pool() {
        assert_eq!(readiness(State(state())).await, StatusCode::OK);
    }
}
