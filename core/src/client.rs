//! Stateless request builder and response parser for the ZipTax API.
//!
//! # Design
//! `ZipTaxClient` holds only the base URL and API key and carries no mutable
//! state between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. Input validation happens in `build_*`, so an invalid call
//! never reaches the transport.

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    CalculateCartRequest, CalculateCartResponse, LookupOptions, V60AccountMetrics,
    V60PostalCodeResponse, V60Response,
};
use crate::validation::{
    validate_address, validate_cart, validate_coordinates, validate_historical_date,
    validate_postal_code,
};

pub(crate) const API_KEY_HEADER: &str = "X-API-Key";
const RESPONSE_FORMAT: &str = "json";

#[derive(Clone)]
pub struct ZipTaxClient {
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for ZipTaxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipTaxClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ZipTaxClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_sales_tax_by_address(
        &self,
        address: &str,
        options: &LookupOptions,
    ) -> Result<HttpRequest, ApiError> {
        validate_address(address)?;
        if let Some(historical) = &options.historical {
            validate_historical_date(historical)?;
        }

        let mut params = vec![
            ("address", address),
            ("countryCode", options.country_code.as_str()),
            ("format", RESPONSE_FORMAT),
        ];
        if let Some(code) = options.taxability_code.as_deref().filter(|c| !c.is_empty()) {
            params.push(("taxabilityCode", code));
        }
        if let Some(historical) = &options.historical {
            params.push(("historical", historical.as_str()));
        }
        self.get("/request/v60/", &params)
    }

    pub fn build_sales_tax_by_geolocation(
        &self,
        lat: &str,
        lng: &str,
        options: &LookupOptions,
    ) -> Result<HttpRequest, ApiError> {
        validate_coordinates(lat, lng)?;
        if let Some(historical) = &options.historical {
            validate_historical_date(historical)?;
        }

        let mut params = vec![
            ("lat", lat),
            ("lng", lng),
            ("countryCode", options.country_code.as_str()),
            ("format", RESPONSE_FORMAT),
        ];
        if let Some(historical) = &options.historical {
            params.push(("historical", historical.as_str()));
        }
        self.get("/request/v60/", &params)
    }

    pub fn build_account_metrics(&self, key: Option<&str>) -> Result<HttpRequest, ApiError> {
        let params: Vec<(&str, &str)> = key
            .filter(|k| !k.is_empty())
            .map(|k| vec![("key", k)])
            .unwrap_or_default();
        self.get("/account/v60/metrics", &params)
    }

    pub fn build_rates_by_postal_code(&self, postal_code: &str) -> Result<HttpRequest, ApiError> {
        validate_postal_code(postal_code)?;
        self.get(
            "/request/v60/",
            &[("postalcode", postal_code), ("format", RESPONSE_FORMAT)],
        )
    }

    pub fn build_calculate_cart(
        &self,
        request: &CalculateCartRequest,
    ) -> Result<HttpRequest, ApiError> {
        validate_cart(request)?;
        self.post("/calculate/cart", request)
    }

    pub fn parse_sales_tax(&self, response: HttpResponse) -> Result<V60Response, ApiError> {
        parse_json(&response)
    }

    pub fn parse_account_metrics(
        &self,
        response: HttpResponse,
    ) -> Result<V60AccountMetrics, ApiError> {
        parse_json(&response)
    }

    pub fn parse_rates_by_postal_code(
        &self,
        response: HttpResponse,
    ) -> Result<V60PostalCodeResponse, ApiError> {
        parse_json(&response)
    }

    pub fn parse_calculate_cart(
        &self,
        response: HttpResponse,
    ) -> Result<CalculateCartResponse, ApiError> {
        parse_json(&response)
    }

    fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: build_url(&self.base_url, path, params)?,
            headers: vec![(API_KEY_HEADER.to_string(), self.api_key.clone())],
            body: None,
        })
    }

    fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<HttpRequest, ApiError> {
        json_request(
            HttpMethod::Post,
            build_url(&self.base_url, path, &[])?,
            &self.api_key,
            body,
        )
    }
}

/// Join `base` and `path` and append URL-encoded query parameters.
pub(crate) fn build_url(base: &str, path: &str, params: &[(&str, &str)]) -> Result<String, ApiError> {
    let raw = format!("{base}{path}");
    let url = if params.is_empty() {
        Url::parse(&raw)
    } else {
        Url::parse_with_params(&raw, params)
    }
    .map_err(|e| ApiError::Config(format!("invalid URL {raw:?}: {e}")))?;
    Ok(url.into())
}

pub(crate) fn json_request<B: Serialize>(
    method: HttpMethod,
    url: String,
    api_key: &str,
    body: &B,
) -> Result<HttpRequest, ApiError> {
    let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
    Ok(HttpRequest {
        method,
        url,
        headers: vec![
            (API_KEY_HEADER.to_string(), api_key.to_string()),
            ("content-type".to_string(), "application/json".to_string()),
        ],
        body: Some(body),
    })
}

/// Map non-2xx statuses to `ApiError`, otherwise decode the body.
pub(crate) fn parse_json<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    check_status(response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

pub(crate) fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    Err(ApiError::from_response(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CartAddress, CartCurrency, CartItem, CartLineItem, CountryCode};

    const KEY: &str = "test-api-key-1234567890";

    fn client() -> ZipTaxClient {
        ZipTaxClient::new("http://localhost:3000", KEY)
    }

    fn ok(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    fn cart_request() -> CalculateCartRequest {
        CalculateCartRequest {
            items: vec![CartItem {
                customer_id: "customer-453".into(),
                currency: CartCurrency::default(),
                destination: CartAddress::new("200 Spectrum Center Dr, Irvine, CA 92618"),
                origin: CartAddress::new("323 Washington Ave N, Minneapolis, MN 55401"),
                line_items: vec![CartLineItem {
                    item_id: "item-1".into(),
                    price: 10.75,
                    quantity: 1.5,
                    taxability_code: None,
                }],
            }],
        }
    }

    #[test]
    fn address_lookup_encodes_query() {
        let req = client()
            .build_sales_tax_by_address(
                "200 Spectrum Center Drive, Irvine, CA 92618",
                &LookupOptions::default(),
            )
            .unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        let url = Url::parse(&req.url).unwrap();
        assert_eq!(url.path(), "/request/v60/");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("address".into(), "200 Spectrum Center Drive, Irvine, CA 92618".into()),
                ("countryCode".into(), "USA".into()),
                ("format".into(), "json".into()),
            ]
        );
        assert_eq!(req.headers, vec![("X-API-Key".to_string(), KEY.to_string())]);
        assert!(req.body.is_none());
    }

    #[test]
    fn address_lookup_with_options() {
        let options = LookupOptions {
            taxability_code: Some("31000".into()),
            country_code: CountryCode::Can,
            historical: Some("202401".into()),
        };
        let req = client().build_sales_tax_by_address("1 Main St", &options).unwrap();
        let url = Url::parse(&req.url).unwrap();
        let pairs: std::collections::HashMap<String, String> =
            url.query_pairs().into_owned().collect();
        assert_eq!(pairs["countryCode"], "CAN");
        assert_eq!(pairs["taxabilityCode"], "31000");
        assert_eq!(pairs["historical"], "202401");
    }

    #[test]
    fn address_lookup_rejects_bad_historical() {
        let options = LookupOptions {
            historical: Some("2024-1".into()),
            ..LookupOptions::default()
        };
        let err = client().build_sales_tax_by_address("1 Main St", &options).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn geolocation_lookup() {
        let req = client()
            .build_sales_tax_by_geolocation("33.6489", "-117.8386", &LookupOptions::default())
            .unwrap();
        assert!(req.url.contains("lat=33.6489"));
        assert!(req.url.contains("lng=-117.8386"));
        assert!(client()
            .build_sales_tax_by_geolocation("100", "0", &LookupOptions::default())
            .is_err());
    }

    #[test]
    fn account_metrics_optional_key() {
        let req = client().build_account_metrics(None).unwrap();
        assert_eq!(req.url, "http://localhost:3000/account/v60/metrics");
        let req = client().build_account_metrics(Some("abc")).unwrap();
        assert_eq!(req.url, "http://localhost:3000/account/v60/metrics?key=abc");
    }

    #[test]
    fn postal_code_lookup() {
        let req = client().build_rates_by_postal_code("92694").unwrap();
        assert_eq!(
            req.url,
            "http://localhost:3000/request/v60/?postalcode=92694&format=json"
        );
        assert!(client().build_rates_by_postal_code("9269").is_err());
    }

    #[test]
    fn calculate_cart_posts_camel_case_json() {
        let req = client().build_calculate_cart(&cart_request()).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/calculate/cart");
        assert!(req
            .headers
            .contains(&("content-type".to_string(), "application/json".to_string())));
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["items"][0]["lineItems"][0]["price"], 10.75);
        assert!(body["items"][0]["lineItems"][0].get("taxabilityCode").is_none());
    }

    #[test]
    fn calculate_cart_validates_before_building() {
        let mut request = cart_request();
        request.items[0].line_items[0].price = -5.0;
        let err = client().build_calculate_cart(&request).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn parse_account_metrics_success() {
        let metrics = client()
            .parse_account_metrics(ok(r#"{
                "core_request_count": 15595, "core_request_limit": 1000000,
                "core_usage_percent": 1.5595, "geo_enabled": true,
                "geo_request_count": 43891, "geo_request_limit": 1000000,
                "geo_usage_percent": 4.3891, "is_active": true,
                "message": "Contact support@zip.tax to modify your account"
            }"#))
            .unwrap();
        assert_eq!(metrics.core_request_count, 15595);
        assert!(metrics.geo_enabled);
    }

    #[test]
    fn parse_maps_error_statuses() {
        let response = HttpResponse {
            status: 401,
            headers: Vec::new(),
            body: r#"{"message":"Invalid API key"}"#.to_string(),
        };
        let err = client().parse_sales_tax(response).unwrap_err();
        assert!(matches!(err, ApiError::Authentication { status: 401, .. }));
    }

    #[test]
    fn parse_bad_json() {
        let err = client().parse_calculate_cart(ok("not json")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = ZipTaxClient::new("http://localhost:3000/", KEY);
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn debug_hides_api_key() {
        assert!(!format!("{:?}", client()).contains(KEY));
    }
}
