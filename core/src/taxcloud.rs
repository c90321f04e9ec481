//! Stateless request builder and response parser for the TaxCloud API.
//!
//! Every path is scoped to the configured connection:
//! `/tax/connections/{connectionId}/...`.

use serde::Deserialize;
use uuid::Uuid;

use crate::client::{build_url, json_request, parse_json, API_KEY_HEADER};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    AddressAutocomplete, CreateOrderRequest, OrderResponse, RefundTransactionRequest,
    RefundTransactionResponse, TaxCloudCartRequest, TaxCloudCartResponse, UpdateOrderRequest,
};

#[derive(Clone)]
pub struct TaxCloudClient {
    base_url: String,
    connection_id: Uuid,
    api_key: String,
}

impl std::fmt::Debug for TaxCloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaxCloudClient")
            .field("base_url", &self.base_url)
            .field("connection_id", &self.connection_id)
            .finish_non_exhaustive()
    }
}

/// Refunds come back as one object or a list depending on the request.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl TaxCloudClient {
    pub fn new(base_url: &str, connection_id: Uuid, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            connection_id,
            api_key: api_key.to_string(),
        }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    fn path(&self, suffix: &str) -> String {
        format!("/tax/connections/{}{suffix}", self.connection_id)
    }

    fn url(&self, suffix: &str, params: &[(&str, &str)]) -> Result<String, ApiError> {
        build_url(&self.base_url, &self.path(suffix), params)
    }

    pub fn build_calculate_cart(
        &self,
        request: &TaxCloudCartRequest,
    ) -> Result<HttpRequest, ApiError> {
        json_request(HttpMethod::Post, self.url("/carts", &[])?, &self.api_key, request)
    }

    pub fn build_create_order(
        &self,
        request: &CreateOrderRequest,
        autocomplete: AddressAutocomplete,
    ) -> Result<HttpRequest, ApiError> {
        let params: Vec<(&str, &str)> = match autocomplete {
            AddressAutocomplete::None => Vec::new(),
            other => vec![("addressAutocomplete", other.as_str())],
        };
        json_request(HttpMethod::Post, self.url("/orders", &params)?, &self.api_key, request)
    }

    pub fn build_get_order(&self, order_id: &str) -> Result<HttpRequest, ApiError> {
        let order_id = require_order_id(order_id)?;
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: self.url(&format!("/orders/{order_id}"), &[])?,
            headers: vec![(API_KEY_HEADER.to_string(), self.api_key.clone())],
            body: None,
        })
    }

    pub fn build_update_order(
        &self,
        order_id: &str,
        request: &UpdateOrderRequest,
    ) -> Result<HttpRequest, ApiError> {
        let order_id = require_order_id(order_id)?;
        json_request(
            HttpMethod::Patch,
            self.url(&format!("/orders/{order_id}"), &[])?,
            &self.api_key,
            request,
        )
    }

    /// `None` refunds the whole order and sends `{}`.
    pub fn build_refund_order(
        &self,
        order_id: &str,
        request: Option<&RefundTransactionRequest>,
    ) -> Result<HttpRequest, ApiError> {
        let order_id = require_order_id(order_id)?;
        let url = self.url(&format!("/orders/refunds/{order_id}"), &[])?;
        match request {
            Some(request) => json_request(HttpMethod::Post, url, &self.api_key, request),
            None => json_request(
                HttpMethod::Post,
                url,
                &self.api_key,
                &RefundTransactionRequest::default(),
            ),
        }
    }

    pub fn parse_calculate_cart(
        &self,
        response: HttpResponse,
    ) -> Result<TaxCloudCartResponse, ApiError> {
        parse_json(&response)
    }

    pub fn parse_order(&self, response: HttpResponse) -> Result<OrderResponse, ApiError> {
        parse_json(&response)
    }

    pub fn parse_refund_order(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<RefundTransactionResponse>, ApiError> {
        Ok(match parse_json(&response)? {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        })
    }
}

/// Order ids are embedded in the path, so they must be non-empty and free of
/// path separators.
fn require_order_id(order_id: &str) -> Result<&str, ApiError> {
    if order_id.trim().is_empty() {
        return Err(ApiError::Validation("order id cannot be empty".into()));
    }
    if order_id.contains(['/', '?', '#']) {
        return Err(ApiError::Validation(format!(
            "order id contains reserved characters: {order_id:?}"
        )));
    }
    Ok(order_id)
}
