//! Cart tax calculation models for the ZipTax `/calculate/cart` endpoint.

use serde::{Deserialize, Serialize};

/// The only currency the cart endpoints accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CurrencyCode {
    #[default]
    #[serde(rename = "USD")]
    Usd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCurrency {
    pub currency_code: CurrencyCode,
}

/// Single-line address, e.g. `"200 Spectrum Center Dr, Irvine, CA 92618"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartAddress {
    pub address: String,
}

impl CartAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub item_id: String,
    pub price: f64,
    pub quantity: f64,
    /// Product taxability classifier. Sent as `tic` to TaxCloud.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxability_code: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub customer_id: String,
    pub currency: CartCurrency,
    pub destination: CartAddress,
    pub origin: CartAddress,
    pub line_items: Vec<CartLineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculateCartRequest {
    pub items: Vec<CartItem>,
}

/// Per-line tax result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tax {
    pub amount: f64,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItemResponse {
    pub item_id: String,
    pub price: f64,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxability_code: Option<u32>,
    pub tax: Tax,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemResponse {
    pub cart_id: String,
    pub customer_id: String,
    pub currency: CartCurrency,
    pub destination: CartAddress,
    pub origin: CartAddress,
    pub line_items: Vec<CartLineItemResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculateCartResponse {
    pub items: Vec<CartItemResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case_and_omits_unset_fields() {
        let request = CalculateCartRequest {
            items: vec![CartItem {
                customer_id: "customer-453".into(),
                currency: CartCurrency::default(),
                destination: CartAddress::new("200 Spectrum Center Dr, Irvine, CA 92618"),
                origin: CartAddress::new("323 Washington Ave N, Minneapolis, MN 55401"),
                line_items: vec![
                    CartLineItem {
                        item_id: "item-1".into(),
                        price: 10.75,
                        quantity: 1.5,
                        taxability_code: None,
                    },
                    CartLineItem {
                        item_id: "item-2".into(),
                        price: 3.0,
                        quantity: 2.0,
                        taxability_code: Some(10010),
                    },
                ],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        let cart = &json["items"][0];
        assert_eq!(cart["customerId"], "customer-453");
        assert_eq!(cart["currency"]["currencyCode"], "USD");
        assert_eq!(cart["lineItems"][0]["itemId"], "item-1");
        assert!(cart["lineItems"][0].get("taxabilityCode").is_none());
        assert_eq!(cart["lineItems"][1]["taxabilityCode"], 10010);
    }

    #[test]
    fn unsupported_currency_is_rejected() {
        let result: Result<CartCurrency, _> = serde_json::from_str(r#"{"currencyCode":"EUR"}"#);
        assert!(result.is_err());
    }
}
