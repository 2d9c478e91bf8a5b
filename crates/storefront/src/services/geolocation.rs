//! Visitor location lookup.
//!
//! One HTTP call to an IP geolocation provider (ipapi.co-compatible JSON).
//! Successful answers are cached per client IP; failures are never cached so
//! a retry always reaches the provider.

use std::net::IpAddr;

use moka::future::Cache;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use oja_core::{CountryCode, LocationInfo};

use crate::config::GeolocationConfig;

/// Why a location could not be determined.
///
/// None of these are fatal: the visitor keeps browsing with fallback prices
/// and can pick a country by hand.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("geolocation request failed: {0}")]
    Http(#[source] reqwest::Error),
    #[error("geolocation provider did not answer in time")]
    Timeout,
    #[error("geolocation provider returned HTTP {0}")]
    Status(u16),
    #[error("geolocation provider error: {0}")]
    Provider(String),
    #[error("malformed geolocation response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for DetectionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

/// Provider response body. Failures come back as `{"error": true, "reason": ...}`.
#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    error: bool,
    reason: Option<String>,
    country_code: Option<String>,
    city: Option<String>,
    country_name: Option<String>,
}

impl ProviderResponse {
    fn into_location(self) -> Result<LocationInfo, DetectionError> {
        if self.error {
            return Err(DetectionError::Provider(
                self.reason.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let raw = self
            .country_code
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| DetectionError::Malformed("missing country_code".to_string()))?;
        let country_code =
            CountryCode::parse(&raw).map_err(|e| DetectionError::Malformed(e.to_string()))?;

        Ok(LocationInfo {
            country_code,
            city: self.city.filter(|c| !c.trim().is_empty()),
            country: self.country_name.filter(|c| !c.trim().is_empty()),
        })
    }
}

/// Client for the geolocation provider.
#[derive(Clone)]
pub struct GeolocationClient {
    http: reqwest::Client,
    endpoint: String,
    cache: Cache<IpAddr, LocationInfo>,
}

impl GeolocationClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the HTTP client cannot be built.
    pub fn new(config: &GeolocationConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("oja-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            cache,
        })
    }

    /// The provider URL for `ip`. Without an IP the provider is asked about
    /// the caller's own address.
    fn url_for(&self, ip: Option<IpAddr>) -> String {
        match ip {
            Some(ip) => self.endpoint.replace("{ip}", &ip.to_string()),
            None => self.endpoint.replace("{ip}/", "").replace("{ip}", ""),
        }
    }

    /// Look up the location of `ip`.
    ///
    /// With `bypass_cache` the provider is always asked, and a successful
    /// answer refreshes the cache.
    ///
    /// # Errors
    ///
    /// Returns a [`DetectionError`] for network failures, timeouts, non-2xx
    /// statuses, provider-reported errors, and bodies without a usable
    /// country code.
    #[instrument(skip(self), fields(ip = ?ip))]
    pub async fn detect(
        &self,
        ip: Option<IpAddr>,
        bypass_cache: bool,
    ) -> Result<LocationInfo, DetectionError> {
        if let Some(ip) = ip
            && !bypass_cache
            && let Some(cached) = self.cache.get(&ip).await
        {
            tracing::debug!(country = %cached.country_code, "Geolocation cache hit");
            return Ok(cached);
        }

        let response = self.http.get(self.url_for(ip)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DetectionError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let body: ProviderResponse = serde_json::from_slice(&bytes)
            .map_err(|e| DetectionError::Malformed(e.to_string()))?;
        let location = body.into_location()?;

        tracing::info!(country = %location.country_code, "Location detected");
        if let Some(ip) = ip {
            self.cache.insert(ip, location.clone()).await;
        }
        Ok(location)
    }
}
