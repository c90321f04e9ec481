//! TaxCloud order-management models.
//!
//! TaxCloud uses structured addresses, calls the taxability classifier
//! `tic`, and numbers line items with a 0-based `index`.

use serde::{Deserialize, Serialize};

use super::cart::{CartCurrency, Tax};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxCloudAddress {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exemption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exemption_id: Option<String>,
    #[serde(default)]
    pub is_exempt: bool,
}

// ---------------------------------------------------------------------------
// Cart calculation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxCloudCartLineItem {
    pub index: u32,
    pub item_id: String,
    pub price: f64,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tic: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxCloudCartItem {
    pub customer_id: String,
    pub currency: CartCurrency,
    pub destination: TaxCloudAddress,
    pub origin: TaxCloudAddress,
    pub line_items: Vec<TaxCloudCartLineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxCloudCartRequest {
    pub items: Vec<TaxCloudCartItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemWithTaxResponse {
    pub index: u32,
    pub item_id: String,
    pub price: f64,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tic: Option<u32>,
    pub tax: Tax,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxCloudCartItemResponse {
    pub cart_id: String,
    pub customer_id: String,
    pub currency: CartCurrency,
    pub destination: TaxCloudAddress,
    pub origin: TaxCloudAddress,
    #[serde(default)]
    pub delivered_by_seller: bool,
    #[serde(default)]
    pub exemption: Exemption,
    pub line_items: Vec<CartItemWithTaxResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxCloudCartResponse {
    pub connection_id: String,
    pub transaction_date: String,
    pub items: Vec<TaxCloudCartItemResponse>,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Whether TaxCloud should correct addresses before computing tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressAutocomplete {
    #[default]
    None,
    Origin,
    Destination,
    All,
}

impl AddressAutocomplete {
    pub fn as_str(self) -> &'static str {
        match self {
            AddressAutocomplete::None => "none",
            AddressAutocomplete::Origin => "origin",
            AddressAutocomplete::Destination => "destination",
            AddressAutocomplete::All => "all",
        }
    }
}

impl std::str::FromStr for AddressAutocomplete {
    type Err = crate::error::ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(AddressAutocomplete::None),
            "origin" => Ok(AddressAutocomplete::Origin),
            "destination" => Ok(AddressAutocomplete::Destination),
            "all" => Ok(AddressAutocomplete::All),
            other => Err(crate::error::ApiError::Validation(format!(
                "address autocomplete must be one of none, origin, destination, all; got: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemWithTax {
    pub index: u32,
    pub item_id: String,
    pub price: f64,
    pub quantity: f64,
    pub tax: Tax,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tic: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub order_id: String,
    pub customer_id: String,
    pub transaction_date: String,
    pub completed_date: String,
    pub origin: TaxCloudAddress,
    pub destination: TaxCloudAddress,
    pub line_items: Vec<CartItemWithTax>,
    pub currency: CartCurrency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_by_seller: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_from_filing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exemption: Option<Exemption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub completed_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: String,
    pub customer_id: String,
    pub connection_id: String,
    pub transaction_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<String>,
    pub origin: TaxCloudAddress,
    pub destination: TaxCloudAddress,
    pub line_items: Vec<CartItemWithTaxResponse>,
    pub currency: CartCurrency,
    #[serde(default)]
    pub delivered_by_seller: bool,
    #[serde(default)]
    pub exclude_from_filing: bool,
    #[serde(default)]
    pub exemption: Exemption,
}

// ---------------------------------------------------------------------------
// Refunds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRefundWithTaxRequest {
    pub item_id: String,
    pub quantity: f64,
}

/// Omit `items` (or leave it empty) to refund the whole order. An order can
/// be refunded only once.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundTransactionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<CartItemRefundWithTaxRequest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRefundWithTaxResponse {
    pub index: u32,
    pub item_id: String,
    pub price: f64,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tic: Option<u32>,
    pub tax: Tax,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundTransactionResponse {
    pub connection_id: String,
    pub created_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_date: Option<String>,
    pub items: Vec<CartItemRefundWithTaxResponse>,
}
