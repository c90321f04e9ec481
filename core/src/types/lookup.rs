//! Rate lookup models (`/request/v60/`, `/account/v60/metrics`).

use serde::{Deserialize, Serialize};

/// Country accepted by the rate lookup endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CountryCode {
    #[default]
    #[serde(rename = "USA")]
    Usa,
    #[serde(rename = "CAN")]
    Can,
}

impl CountryCode {
    pub fn as_str(self) -> &'static str {
        match self {
            CountryCode::Usa => "USA",
            CountryCode::Can => "CAN",
        }
    }
}

/// Optional parameters shared by the address and geolocation lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupOptions {
    /// Product taxability code. Ignored by the geolocation lookup.
    pub taxability_code: Option<String>,
    pub country_code: CountryCode,
    /// Rates as of a past month, `YYYYMM`.
    pub historical: Option<String>,
}

/// `"Y"` / `"N"` flags used across the v60 schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Taxable {
    #[serde(rename = "Y")]
    Yes,
    #[serde(rename = "N")]
    No,
}

/// Origin- or destination-based sourcing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourcingValue {
    #[serde(rename = "O")]
    Origin,
    #[serde(rename = "D")]
    Destination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct V60ResponseInfo {
    /// 100 means success.
    pub code: i64,
    pub name: String,
    pub message: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct V60Metadata {
    pub version: String,
    pub response: V60ResponseInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V60BaseRate {
    pub rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_id: Option<String>,
    pub jur_type: String,
    pub jur_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jur_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jur_tax_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V60Service {
    pub adjustment_type: String,
    pub taxable: Taxable,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V60Shipping {
    pub adjustment_type: String,
    pub taxable: Taxable,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V60SourcingRules {
    pub adjustment_type: String,
    pub description: String,
    pub value: SourcingValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct V60DisplayRate {
    pub name: String,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V60TaxSummary {
    pub rate: f64,
    pub tax_type: String,
    pub summary_name: String,
    pub display_rates: Vec<V60DisplayRate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V60AddressDetail {
    pub normalized_address: String,
    /// `"true"` or `"false"`, sent as a string.
    pub incorporated: String,
    pub geo_lat: f64,
    pub geo_lng: f64,
}

/// Rates for a single address or coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V60Response {
    pub metadata: V60Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_rates: Option<Vec<V60BaseRate>>,
    pub service: V60Service,
    pub shipping: V60Shipping,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sourcing_rules: Option<V60SourcingRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_summaries: Option<Vec<V60TaxSummary>>,
    pub address_detail: V60AddressDetail,
}

/// Usage counters for the calling API key. This endpoint uses snake_case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct V60AccountMetrics {
    pub core_request_count: u64,
    pub core_request_limit: u64,
    pub core_usage_percent: f64,
    pub geo_enabled: bool,
    pub geo_request_count: u64,
    pub geo_request_limit: u64,
    pub geo_usage_percent: f64,
    pub is_active: bool,
    pub message: String,
}

/// One location inside a postal code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V60PostalCodeResult {
    pub geo_postal_code: String,
    pub geo_city: String,
    pub geo_county: String,
    pub geo_state: String,
    pub tax_sales: f64,
    pub tax_use: f64,
    pub txb_service: Taxable,
    pub txb_freight: Taxable,
    pub state_sales_tax: f64,
    pub state_use_tax: f64,
    pub city_sales_tax: f64,
    pub city_use_tax: f64,
    pub city_tax_code: String,
    pub county_sales_tax: f64,
    pub county_use_tax: f64,
    pub county_tax_code: String,
    pub district_sales_tax: f64,
    pub district_use_tax: f64,
    pub district1_code: String,
    pub district1_sales_tax: f64,
    pub district1_use_tax: f64,
    pub district2_code: String,
    pub district2_sales_tax: f64,
    pub district2_use_tax: f64,
    pub district3_code: String,
    pub district3_sales_tax: f64,
    pub district3_use_tax: f64,
    pub district4_code: String,
    pub district4_sales_tax: f64,
    pub district4_use_tax: f64,
    pub district5_code: String,
    pub district5_sales_tax: f64,
    pub district5_use_tax: f64,
    pub origin_destination: SourcingValue,
}

/// Address detail for postal code lookups; geocoding fields are blank/zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V60PostalCodeAddressDetail {
    pub normalized_address: String,
    pub incorporated: String,
    pub geo_lat: f64,
    pub geo_lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V60PostalCodeResponse {
    pub version: String,
    pub r_code: i64,
    pub results: Vec<V60PostalCodeResult>,
    pub address_detail: V60PostalCodeAddressDetail,
}
