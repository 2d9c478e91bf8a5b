//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{
    CatalogRepository, OrderRepository, PgCatalogRepository, PgOrderRepository,
    PgSettingsRepository, SettingsRepository,
};
use crate::models::DetectionRegistry;
use crate::services::{CheckoutSubmitter, GeolocationClient};

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to build geolocation client: {0}")]
    Geolocation(#[from] reqwest::Error),
}

/// Repositories backing the state.
#[derive(Clone)]
pub struct Repositories {
    pub catalog: Arc<dyn CatalogRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub settings: Arc<dyn SettingsRepository>,
}

impl Repositories {
    /// `PostgreSQL` repositories sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            catalog: Arc::new(PgCatalogRepository::new(pool.clone())),
            orders: Arc::new(PgOrderRepository::new(pool.clone())),
            settings: Arc::new(PgSettingsRepository::new(pool.clone())),
        }
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like repositories, clients, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: Option<PgPool>,
    repos: Repositories,
    geolocation: GeolocationClient,
    detections: DetectionRegistry,
    checkout: CheckoutSubmitter,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` pool, checked by the readiness probe when present
    /// * `repos` - Catalog, order, and settings repositories
    ///
    /// # Errors
    ///
    /// Returns an error if the geolocation HTTP client cannot be built.
    pub fn new(
        config: StorefrontConfig,
        pool: Option<PgPool>,
        repos: Repositories,
    ) -> Result<Self, StateError> {
        let geolocation = GeolocationClient::new(&config.geolocation)?;
        let checkout = CheckoutSubmitter::new(repos.orders.clone(), repos.catalog.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                repos,
                geolocation,
                detections: DetectionRegistry::new(),
                checkout,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The database pool, if the state runs against `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogRepository {
        self.inner.repos.catalog.as_ref()
    }

    #[must_use]
    pub fn orders(&self) -> &dyn OrderRepository {
        self.inner.repos.orders.as_ref()
    }

    #[must_use]
    pub fn settings(&self) -> &dyn SettingsRepository {
        self.inner.repos.settings.as_ref()
    }

    /// Get a reference to the geolocation client.
    #[must_use]
    pub fn geolocation(&self) -> &GeolocationClient {
        &self.inner.geolocation
    }

    /// Detection state shared by concurrent requests of one session.
    #[must_use]
    pub fn detections(&self) -> &DetectionRegistry {
        &self.inner.detections
    }

    /// Get a reference to the checkout submitter.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutSubmitter {
        &self.inner.checkout
    }
}
