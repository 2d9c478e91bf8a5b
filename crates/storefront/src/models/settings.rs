//! Site-wide settings.

use serde::{Deserialize, Serialize};

use oja_core::CurrencyCode;

/// Settings key the document is stored under.
pub const SITE_SETTINGS_KEY: &str = "site";

/// Store identity and analytics ids shown to the storefront.
///
/// Every field has a default so a partially written document still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub store_name: String,
    pub contact_email: Option<String>,
    pub default_currency: CurrencyCode,
    pub ga4_measurement_id: Option<String>,
    pub meta_pixel_id: Option<String>,
    pub tiktok_pixel_id: Option<String>,
    pub google_ads_id: Option<String>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            store_name: "Oja".to_string(),
            contact_email: None,
            default_currency: CurrencyCode::USD,
            ga4_measurement_id: None,
            meta_pixel_id: None,
            tiktok_pixel_id: None,
            google_ads_id: None,
        }
    }
}

impl SiteSettings {
    /// Trim every text field and turn blank optional ids into `None`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        self.store_name = self.store_name.trim().to_string();
        if self.store_name.is_empty() {
            self.store_name = Self::default().store_name;
        }
        self.contact_email = clean(self.contact_email);
        self.ga4_measurement_id = clean(self.ga4_measurement_id);
        self.meta_pixel_id = clean(self.meta_pixel_id);
        self.tiktok_pixel_id = clean(self.tiktok_pixel_id);
        self.google_ads_id = clean(self.google_ads_id);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_fills_defaults() {
        let settings: SiteSettings =
            serde_json::from_str(r#"{"ga4_measurement_id": "G-ABC123"}"#).unwrap();
        assert_eq!(settings.store_name, "Oja");
        assert_eq!(settings.ga4_measurement_id.as_deref(), Some("G-ABC123"));
        assert_eq!(settings.default_currency, CurrencyCode::USD);
    }

    #[test]
    fn test_normalized_blanks_become_none() {
        let settings = SiteSettings {
            store_name: "  ".into(),
            meta_pixel_id: Some("   ".into()),
            tiktok_pixel_id: Some(" C123 ".into()),
            ..SiteSettings::default()
        }
        .normalized();

        assert_eq!(settings.store_name, "Oja");
        assert_eq!(settings.meta_pixel_id, None);
        assert_eq!(settings.tiktok_pixel_id.as_deref(), Some("C123"));
    }
}
