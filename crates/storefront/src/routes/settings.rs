//! Site settings.
//!
//! Read publicly (the storefront needs the analytics ids), written by admins.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::instrument;

use crate::db::RepositoryError;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{SITE_SETTINGS_KEY, SiteSettings};
use crate::state::AppState;

async fn store(state: &AppState, settings: &SiteSettings) -> Result<()> {
    let value = serde_json::to_value(settings)
        .map_err(|e| RepositoryError::DataCorruption(format!("site settings: {e}")))?;
    state.settings().set(SITE_SETTINGS_KEY, &value).await?;
    Ok(())
}

/// Current settings. A missing document is created from defaults.
pub async fn show(State(state): State<AppState>) -> Result<Json<SiteSettings>> {
    if let Some(value) = state.settings().get(SITE_SETTINGS_KEY).await? {
        let settings: SiteSettings = serde_json::from_value(value)
            .map_err(|e| RepositoryError::DataCorruption(format!("site settings: {e}")))?;
        return Ok(Json(settings));
    }

    let settings = SiteSettings::default();
    store(&state, &settings).await?;
    tracing::info!("Created default site settings");
    Ok(Json(settings))
}

/// Replace the settings.
#[instrument(skip_all)]
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    payload: std::result::Result<Json<SiteSettings>, JsonRejection>,
) -> Result<Json<SiteSettings>> {
    let Json(settings) = payload?;
    let settings = settings.normalized();
    store(&state, &settings).await?;

    tracing::info!(store_name = %settings.store_name, "Site settings updated");
    Ok(Json(settings))
}
