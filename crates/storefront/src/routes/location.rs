//! Visitor location and display currency.
//!
//! The first read of `/api/location` triggers a detection; later reads return
//! whatever the session holds. Detection failures never block the visitor:
//! pricing falls back to base prices and a manual choice is offered.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use oja_core::{CountryCode, CurrencyCode, LocationInfo};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::ClientIp;
use crate::models::session::{display_currency, set_currency_preference};
use crate::services::DetectionError;
use crate::state::AppState;

/// Location state returned to the client.
#[derive(Debug, Serialize)]
pub struct LocationView {
    pub location: Option<LocationInfo>,
    pub currency: CurrencyCode,
    /// Set when detection failed and the visitor should pick a country.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_error: Option<String>,
}

/// Manual country selection.
#[derive(Debug, Deserialize)]
pub struct SetLocationRequest {
    pub country_code: String,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Display currency selection.
#[derive(Debug, Deserialize)]
pub struct SetCurrencyRequest {
    pub currency: String,
}

/// Run one detection for this session, applying the result only if no newer
/// request of the same session has been applied in the meantime.
async fn run_detection(
    state: &AppState,
    session: &Session,
    ip: ClientIp,
    bypass_cache: bool,
) -> Result<std::result::Result<LocationInfo, DetectionError>> {
    let pending = state.detections().begin(session).await?;
    let outcome = state.geolocation().detect(ip.0, bypass_cache).await;
    state
        .detections()
        .complete(session, pending, outcome.as_ref().ok().cloned())
        .await?;
    Ok(outcome)
}

async fn current_location(state: &AppState, session: &Session) -> Result<Option<LocationInfo>> {
    Ok(state.detections().current(session).await?.location().cloned())
}

async fn view(
    session: &Session,
    location: Option<LocationInfo>,
    error: Option<&DetectionError>,
) -> Result<LocationView> {
    let currency = display_currency(session, location.as_ref()).await?;
    Ok(LocationView {
        location,
        currency,
        fallback: error.map(|_| "manual"),
        detection_error: error.map(ToString::to_string),
    })
}

/// Current location, detecting it on first use.
#[instrument(skip(state, session))]
pub async fn get_location(
    State(state): State<AppState>,
    session: Session,
    ip: ClientIp,
) -> Result<Json<LocationView>> {
    let detection = state.detections().current(&session).await?;
    if detection.has_attempted() {
        return Ok(Json(
            view(&session, detection.location().cloned(), None).await?,
        ));
    }

    let outcome = run_detection(&state, &session, ip, false).await?;
    let location = current_location(&state, &session).await?;
    let error = outcome.err();
    if let Some(err) = &error {
        tracing::warn!(error = %err, "Initial location detection failed");
    }

    Ok(Json(view(&session, location, error.as_ref()).await?))
}

/// Detect again, skipping the cache. Used by the "retry" action.
#[instrument(skip(state, session))]
pub async fn detect_location(
    State(state): State<AppState>,
    session: Session,
    ip: ClientIp,
) -> Result<Json<LocationView>> {
    run_detection(&state, &session, ip, true).await??;
    let location = current_location(&state, &session).await?;
    Ok(Json(view(&session, location, None).await?))
}

/// Choose a country by hand.
#[instrument(skip(state, session))]
pub async fn set_location(
    State(state): State<AppState>,
    session: Session,
    payload: std::result::Result<Json<SetLocationRequest>, JsonRejection>,
) -> Result<Json<LocationView>> {
    let Json(request) = payload?;
    let country_code = CountryCode::parse(&request.country_code)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let location = LocationInfo {
        country_code,
        city: request.city.filter(|c| !c.trim().is_empty()),
        country: request.country.filter(|c| !c.trim().is_empty()),
    };

    state
        .detections()
        .set_manual(&session, location.clone())
        .await?;
    add_breadcrumb(
        "location",
        "Location chosen manually",
        Some(&[("country_code", location.country_code.as_str())]),
    );

    Ok(Json(view(&session, Some(location), None).await?))
}

/// Choose the display currency.
#[instrument(skip(state, session))]
pub async fn set_currency(
    State(state): State<AppState>,
    session: Session,
    payload: std::result::Result<Json<SetCurrencyRequest>, JsonRejection>,
) -> Result<Json<LocationView>> {
    let Json(request) = payload?;
    let currency: CurrencyCode = request
        .currency
        .parse()
        .map_err(|e: oja_core::UnknownCurrency| AppError::BadRequest(e.to_string()))?;
    set_currency_preference(&session, currency).await?;

    let location = current_location(&state, &session).await?;
    Ok(Json(view(&session, location, None).await?))
}
