//! Session-stored visitor state.
//!
//! The cart, detected or chosen location, and display currency live in the
//! visitor's session. Handlers load a value, mutate it in place, and save it
//! back; nothing derived (totals, counts) is ever stored.

use tower_sessions::Session;
use uuid::Uuid;

use oja_core::{CartLedger, CurrencyCode, DetectionState, LocationInfo, currency_for_location};

use crate::error::Result;

/// Session keys for visitor data.
pub mod keys {
    /// Key for the cart ledger.
    pub const CART: &str = "cart";

    /// Key for location detection bookkeeping.
    pub const DETECTION: &str = "detection";

    /// Key for an explicit display currency choice.
    pub const CURRENCY: &str = "currency";

    /// Key for the idempotency key of the pending checkout.
    pub const CHECKOUT_KEY: &str = "checkout_key";
}

/// Load the cart, empty if the session has none.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_cart(session: &Session) -> Result<CartLedger> {
    Ok(session.get(keys::CART).await?.unwrap_or_default())
}

/// Save the cart. Any pending checkout key is dropped since it belonged to
/// the previous cart contents.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_cart(session: &Session, cart: &CartLedger) -> Result<()> {
    session.insert(keys::CART, cart).await?;
    session.remove::<Uuid>(keys::CHECKOUT_KEY).await?;
    Ok(())
}

/// Load location detection state.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_detection(session: &Session) -> Result<DetectionState> {
    Ok(session.get(keys::DETECTION).await?.unwrap_or_default())
}

/// Save location detection state.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_detection(session: &Session, state: &DetectionState) -> Result<()> {
    session.insert(keys::DETECTION, state).await?;
    Ok(())
}

/// The visitor's explicit currency choice, if any.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn currency_preference(session: &Session) -> Result<Option<CurrencyCode>> {
    Ok(session.get(keys::CURRENCY).await?)
}

/// Record an explicit currency choice.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn set_currency_preference(session: &Session, currency: CurrencyCode) -> Result<()> {
    session.insert(keys::CURRENCY, currency).await?;
    Ok(())
}

/// The currency to display: the visitor's choice, else the location default.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn display_currency(
    session: &Session,
    location: Option<&LocationInfo>,
) -> Result<CurrencyCode> {
    Ok(currency_preference(session)
        .await?
        .unwrap_or_else(|| currency_for_location(location)))
}

/// The idempotency key for checking out the current cart.
///
/// The same key is returned until the cart changes or an order is placed,
/// so a resubmitted checkout cannot create a second order.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn checkout_key(session: &Session) -> Result<Uuid> {
    if let Some(key) = session.get::<Uuid>(keys::CHECKOUT_KEY).await? {
        return Ok(key);
    }
    let key = Uuid::new_v4();
    session.insert(keys::CHECKOUT_KEY, key).await?;
    Ok(key)
}

/// Everything a completed checkout resets: the cart and its checkout key.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn finish_checkout(session: &Session) -> Result<()> {
    session.remove::<CartLedger>(keys::CART).await?;
    session.remove::<Uuid>(keys::CHECKOUT_KEY).await?;
    Ok(())
}
