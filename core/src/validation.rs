//! Input validation, run before any request is built.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ApiError;
use crate::types::CalculateCartRequest;

pub const MAX_ADDRESS_LEN: usize = 100;
pub const MIN_API_KEY_LEN: usize = 10;
pub const MAX_LINE_ITEMS: usize = 250;

static POSTAL_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}(-[0-9]{4})?$").expect("postal code pattern is valid"));

fn invalid(message: impl Into<String>) -> ApiError {
    ApiError::Validation(message.into())
}

pub fn validate_address(address: &str) -> Result<(), ApiError> {
    if address.is_empty() {
        return Err(invalid("address cannot be empty"));
    }
    if address.chars().count() > MAX_ADDRESS_LEN {
        return Err(invalid(format!(
            "address cannot exceed {MAX_ADDRESS_LEN} characters"
        )));
    }
    Ok(())
}

/// Latitude and longitude are passed through as strings; they only need to
/// parse and fall inside the valid ranges.
pub fn validate_coordinates(lat: &str, lng: &str) -> Result<(), ApiError> {
    if lat.is_empty() || lng.is_empty() {
        return Err(invalid("latitude and longitude cannot be empty"));
    }
    let (lat_val, lng_val) = match (lat.trim().parse::<f64>(), lng.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) if a.is_finite() && b.is_finite() => (a, b),
        _ => return Err(invalid("latitude and longitude must be valid numbers")),
    };
    if !(-90.0..=90.0).contains(&lat_val) {
        return Err(invalid("latitude must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&lng_val) {
        return Err(invalid("longitude must be between -180 and 180"));
    }
    Ok(())
}

/// `YYYYMM`, year 1900..=2100, month 1..=12.
pub fn validate_historical_date(historical: &str) -> Result<(), ApiError> {
    let malformed = || invalid(format!("historical date must be in YYYYMM format, got: {historical}"));
    if historical.len() != 6 || !historical.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let year: u32 = historical[..4].parse().map_err(|_| malformed())?;
    let month: u32 = historical[4..].parse().map_err(|_| malformed())?;
    if !(1900..=2100).contains(&year) {
        return Err(invalid(format!("invalid year: {year}")));
    }
    if !(1..=12).contains(&month) {
        return Err(invalid(format!("invalid month: {month}")));
    }
    Ok(())
}

pub fn validate_postal_code(postal_code: &str) -> Result<(), ApiError> {
    if postal_code.is_empty() {
        return Err(invalid("postal code cannot be empty"));
    }
    if !POSTAL_CODE_RE.is_match(postal_code) {
        return Err(invalid(format!(
            "postal code must be in 5-digit (e.g., 92694) or 9-digit (e.g., 92694-1234) format, got: {postal_code}"
        )));
    }
    Ok(())
}

pub fn validate_api_key(api_key: &str) -> Result<(), ApiError> {
    if api_key.is_empty() {
        return Err(invalid("API key cannot be empty"));
    }
    if api_key.len() < MIN_API_KEY_LEN {
        return Err(invalid("API key appears to be invalid (too short)"));
    }
    Ok(())
}

/// Structural checks shared by both cart backends.
pub fn validate_cart(request: &CalculateCartRequest) -> Result<(), ApiError> {
    if request.items.len() != 1 {
        return Err(invalid(format!(
            "cart request must contain exactly one cart, got {}",
            request.items.len()
        )));
    }
    for cart in &request.items {
        if cart.customer_id.trim().is_empty() {
            return Err(invalid("customer id cannot be empty"));
        }
        if cart.line_items.is_empty() || cart.line_items.len() > MAX_LINE_ITEMS {
            return Err(invalid(format!(
                "cart must contain between 1 and {MAX_LINE_ITEMS} line items, got {}",
                cart.line_items.len()
            )));
        }
        for (i, item) in cart.line_items.iter().enumerate() {
            if item.item_id.trim().is_empty() {
                return Err(invalid(format!("line item {i}: item id cannot be empty")));
            }
            if !(item.price.is_finite() && item.price > 0.0) {
                return Err(invalid(format!(
                    "line item {i}: price must be greater than 0, got {}",
                    item.price
                )));
            }
            if !(item.quantity.is_finite() && item.quantity > 0.0) {
                return Err(invalid(format!(
                    "line item {i}: quantity must be greater than 0, got {}",
                    item.quantity
                )));
            }
        }
    }
    Ok(())
}
