use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const MOCK_API_KEY: &str = "mock-ziptax-key-0001";
pub const MOCK_TAXCLOUD_API_KEY: &str = "mock-taxcloud-key-0001";
pub const MOCK_CONNECTION_ID: &str = "25eb9b97-5acb-492d-b720-c03e79cf715a";
pub const MOCK_TRANSACTION_DATE: &str = "2024-01-15T09:30:00Z";
pub const ZIPTAX_RATE: f64 = 0.0775;
pub const TAXCLOUD_RATE: f64 = 0.0813;

// --- wire types (independent of the client crate) ---

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub currency_code: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TaxAmount {
    pub amount: f64,
    pub rate: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineAddress {
    pub address: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub item_id: String,
    pub price: f64,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxability_code: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub customer_id: String,
    pub currency: Currency,
    pub destination: LineAddress,
    pub origin: LineAddress,
    pub line_items: Vec<CartLine>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartRequest {
    pub items: Vec<Cart>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exemption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exemption_id: Option<String>,
    #[serde(default)]
    pub is_exempt: bool,
}

/// TaxCloud line items are strict: a stray `taxabilityCode` is rejected.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IndexedLine {
    pub index: u32,
    pub item_id: String,
    pub price: f64,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tic: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxCloudCart {
    pub customer_id: String,
    pub currency: Currency,
    pub destination: Address,
    pub origin: Address,
    pub line_items: Vec<IndexedLine>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaxCloudCartRequest {
    pub items: Vec<TaxCloudCart>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxedLine {
    pub index: u32,
    pub item_id: String,
    pub price: f64,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tic: Option<u32>,
    pub tax: TaxAmount,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub order_id: String,
    pub customer_id: String,
    pub transaction_date: String,
    pub completed_date: String,
    pub origin: Address,
    pub destination: Address,
    pub line_items: Vec<TaxedLine>,
    pub currency: Currency,
    #[serde(default)]
    pub delivered_by_seller: bool,
    #[serde(default)]
    pub exclude_from_filing: bool,
    #[serde(default)]
    pub exemption: Exemption,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub connection_id: String,
    pub transaction_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<String>,
    pub origin: Address,
    pub destination: Address,
    pub line_items: Vec<TaxedLine>,
    pub currency: Currency,
    pub delivered_by_seller: bool,
    pub exclude_from_filing: bool,
    pub exemption: Exemption,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrder {
    pub completed_date: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundLine {
    pub item_id: String,
    pub quantity: f64,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    #[serde(default)]
    pub items: Option<Vec<RefundLine>>,
    #[serde(default)]
    pub returned_date: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub connection_id: String,
    pub created_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_date: Option<String>,
    pub items: Vec<TaxedLine>,
}

// --- state ---

struct StoredOrder {
    order: Order,
    refunded: bool,
}

/// A scripted failure returned instead of the real response.
#[derive(Clone, Copy, Debug)]
struct Failure {
    remaining: usize,
    status: StatusCode,
    retry_after: Option<u64>,
}

/// Shared server state. Tests hold an `Arc` to inject failures and read
/// per-backend hit counters.
#[derive(Default)]
pub struct MockState {
    orders: RwLock<HashMap<String, StoredOrder>>,
    failure: Mutex<Option<Failure>>,
    ziptax_hits: AtomicUsize,
    taxcloud_hits: AtomicUsize,
}

pub type SharedState = Arc<MockState>;

impl MockState {
    pub fn new() -> SharedState {
        Arc::new(Self::default())
    }

    /// Answer the next `count` requests with `status`.
    pub fn fail_next(&self, count: usize, status: u16) {
        self.script(count, status, None);
    }

    /// Answer the next `count` requests with 429 and a `Retry-After` header.
    pub fn rate_limit_next(&self, count: usize, retry_after_secs: u64) {
        self.script(count, 429, Some(retry_after_secs));
    }

    fn script(&self, count: usize, status: u16, retry_after: Option<u64>) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(Failure {
                remaining: count,
                status,
                retry_after,
            });
        }
    }

    fn take_failure(&self) -> Option<Failure> {
        let mut slot = self.failure.lock().ok()?;
        let failure = slot.as_mut()?;
        if failure.remaining == 0 {
            *slot = None;
            return None;
        }
        failure.remaining -= 1;
        Some(*failure)
    }

    /// Requests that reached any ZipTax route.
    pub fn ziptax_hits(&self) -> usize {
        self.ziptax_hits.load(Ordering::SeqCst)
    }

    /// Requests that reached any TaxCloud route.
    pub fn taxcloud_hits(&self) -> usize {
        self.taxcloud_hits.load(Ordering::SeqCst)
    }
}

// --- errors ---

#[derive(Debug)]
pub struct MockError {
    status: StatusCode,
    message: String,
    retry_after: Option<u64>,
}

impl MockError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(json!({ "message": self.message }))).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

type ApiResult<T> = Result<Json<T>, MockError>;

/// Scripted failures win, then the API key is checked.
fn guard(state: &MockState, headers: &HeaderMap, expected_key: &str) -> Result<(), MockError> {
    if let Some(failure) = state.take_failure() {
        debug!(status = failure.status.as_u16(), "injecting failure");
        return Err(MockError {
            status: failure.status,
            message: format!("injected {} failure", failure.status.as_u16()),
            retry_after: failure.retry_after,
        });
    }
    match headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        Some(key) if key == expected_key => Ok(()),
        _ => Err(MockError::new(StatusCode::UNAUTHORIZED, "invalid API key")),
    }
}

fn ziptax_guard(state: &MockState, headers: &HeaderMap) -> Result<(), MockError> {
    state.ziptax_hits.fetch_add(1, Ordering::SeqCst);
    guard(state, headers, MOCK_API_KEY)
}

fn taxcloud_guard(
    state: &MockState,
    headers: &HeaderMap,
    connection_id: &str,
) -> Result<(), MockError> {
    state.taxcloud_hits.fetch_add(1, Ordering::SeqCst);
    guard(state, headers, MOCK_TAXCLOUD_API_KEY)?;
    if connection_id != MOCK_CONNECTION_ID {
        return Err(MockError::new(
            StatusCode::NOT_FOUND,
            format!("connection {connection_id} not found"),
        ));
    }
    Ok(())
}

fn tax_for(price: f64, quantity: f64, rate: f64) -> TaxAmount {
    TaxAmount {
        amount: (price * quantity * rate * 100.0).round() / 100.0,
        rate,
    }
}

// --- router ---

pub fn app() -> Router {
    app_with_state(MockState::new())
}

pub fn app_with_state(state: SharedState) -> Router {
    Router::new()
        .route("/request/v60/", get(sales_tax))
        .route("/account/v60/metrics", get(account_metrics))
        .route("/calculate/cart", post(calculate_cart))
        .route(
            "/tax/connections/{connection_id}/carts",
            post(taxcloud_cart),
        )
        .route(
            "/tax/connections/{connection_id}/orders",
            post(create_order),
        )
        .route(
            "/tax/connections/{connection_id}/orders/{order_id}",
            get(get_order).patch(update_order),
        )
        .route(
            "/tax/connections/{connection_id}/orders/refunds/{order_id}",
            post(refund_order),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, MockState::new()).await
}

pub async fn run_with_state(listener: TcpListener, state: SharedState) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock tax server listening");
    }
    axum::serve(listener, app_with_state(state)).await
}

// --- ZipTax ---

async fn sales_tax(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Value> {
    ziptax_guard(&state, &headers)?;
    if let Some(postal_code) = params.get("postalcode") {
        return Ok(Json(postal_code_response(postal_code)));
    }
    let normalized = match (params.get("address"), params.get("lat"), params.get("lng")) {
        (Some(address), _, _) => address.clone(),
        (None, Some(lat), Some(lng)) => format!("{lat}, {lng}"),
        _ => {
            return Err(MockError::new(
                StatusCode::BAD_REQUEST,
                "address or lat/lng is required",
            ))
        }
    };
    Ok(Json(rate_response(&normalized)))
}

async fn account_metrics(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ApiResult<Value> {
    ziptax_guard(&state, &headers)?;
    Ok(Json(json!({
        "core_request_count": 15595,
        "core_request_limit": 1000000,
        "core_usage_percent": 1.5595,
        "geo_enabled": true,
        "geo_request_count": 43853,
        "geo_request_limit": 1000000,
        "geo_usage_percent": 4.3853,
        "is_active": true,
        "message": "Contact support@zip.tax to modify your account"
    })))
}

async fn calculate_cart(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<CartRequest>,
) -> ApiResult<Value> {
    ziptax_guard(&state, &headers)?;
    let mut items = Vec::with_capacity(request.items.len());
    for cart in request.items {
        if cart.line_items.is_empty() {
            return Err(MockError::new(
                StatusCode::BAD_REQUEST,
                "cart must contain at least one line item",
            ));
        }
        let line_items: Vec<Value> = cart
            .line_items
            .iter()
            .map(|line| {
                let mut value = json!({
                    "itemId": line.item_id,
                    "price": line.price,
                    "quantity": line.quantity,
                    "tax": tax_for(line.price, line.quantity, ZIPTAX_RATE),
                });
                if let Some(code) = line.taxability_code {
                    value["taxabilityCode"] = json!(code);
                }
                value
            })
            .collect();
        items.push(json!({
            "cartId": Uuid::new_v4().to_string(),
            "customerId": cart.customer_id,
            "currency": cart.currency,
            "destination": cart.destination,
            "origin": cart.origin,
            "lineItems": line_items,
        }));
    }
    debug!(carts = items.len(), "calculated ziptax cart");
    Ok(Json(json!({ "items": items })))
}

fn rate_response(normalized_address: &str) -> Value {
    json!({
        "metadata": {
            "version": "v60",
            "response": {
                "code": 100,
                "name": "RESPONSE_CODE_SUCCESS",
                "message": "Successful API Request.",
                "definition": "http://api.zip-tax.com/request/v60/schema"
            }
        },
        "baseRates": [
            {"rate": 0.0725, "rateId": "r-state", "jurType": "US_STATE_SALES_TAX", "jurName": "CA", "jurDescription": "US State Sales Tax", "jurTaxCode": "06"},
            {"rate": 0.005, "rateId": "r-district", "jurType": "US_DISTRICT_SALES_TAX", "jurName": "ORANGE CO LOCAL TAX SL", "jurDescription": "US District Sales Tax", "jurTaxCode": "30"}
        ],
        "service": {"adjustmentType": "SERVICE_TAXABLE", "taxable": "N", "description": "Services non-taxable"},
        "shipping": {"adjustmentType": "FREIGHT_TAXABLE", "taxable": "N", "description": "Freight non-taxable"},
        "sourcingRules": {"adjustmentType": "ORIGIN_DESTINATION", "description": "Destination Based Taxation", "value": "D"},
        "taxSummaries": [
            {"rate": ZIPTAX_RATE, "taxType": "SALES_TAX", "summaryName": "Total Base Sales Tax",
             "displayRates": [{"name": "Total Rate", "rate": ZIPTAX_RATE}]}
        ],
        "addressDetail": {
            "normalizedAddress": normalized_address,
            "incorporated": "true",
            "geoLat": 33.6489,
            "geoLng": -117.8386
        }
    })
}

fn postal_code_response(postal_code: &str) -> Value {
    json!({
        "version": "v60",
        "rCode": 100,
        "results": [{
            "geoPostalCode": postal_code,
            "geoCity": "LADERA RANCH",
            "geoCounty": "ORANGE",
            "geoState": "CA",
            "taxSales": ZIPTAX_RATE,
            "taxUse": ZIPTAX_RATE,
            "txbService": "N",
            "txbFreight": "N",
            "stateSalesTax": 0.06,
            "stateUseTax": 0.06,
            "citySalesTax": 0.0,
            "cityUseTax": 0.0,
            "cityTaxCode": "",
            "countySalesTax": 0.0025,
            "countyUseTax": 0.0025,
            "countyTaxCode": "30",
            "districtSalesTax": 0.015,
            "districtUseTax": 0.015,
            "district1Code": "26",
            "district1SalesTax": 0.0,
            "district1UseTax": 0.0,
            "district2Code": "26",
            "district2SalesTax": 0.0025,
            "district2UseTax": 0.0025,
            "district3Code": "",
            "district3SalesTax": 0.0,
            "district3UseTax": 0.0,
            "district4Code": "33",
            "district4SalesTax": 0.01,
            "district4UseTax": 0.01,
            "district5Code": "",
            "district5SalesTax": 0.0,
            "district5UseTax": 0.0,
            "originDestination": "D"
        }],
        "addressDetail": {
            "normalizedAddress": "Not Found",
            "incorporated": "",
            "geoLat": 0.0,
            "geoLng": 0.0
        }
    })
}

// --- TaxCloud ---

async fn taxcloud_cart(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(connection_id): Path<String>,
    Json(request): Json<TaxCloudCartRequest>,
) -> ApiResult<Value> {
    taxcloud_guard(&state, &headers, &connection_id)?;
    let items: Vec<Value> = request
        .items
        .into_iter()
        .map(|cart| {
            let line_items: Vec<TaxedLine> = cart
                .line_items
                .into_iter()
                .map(|line| TaxedLine {
                    tax: tax_for(line.price, line.quantity, TAXCLOUD_RATE),
                    index: line.index,
                    item_id: line.item_id,
                    price: line.price,
                    quantity: line.quantity,
                    tic: line.tic,
                })
                .collect();
            json!({
                "cartId": Uuid::new_v4().to_string(),
                "customerId": cart.customer_id,
                "currency": cart.currency,
                "destination": cart.destination,
                "origin": cart.origin,
                "deliveredBySeller": false,
                "exemption": Exemption::default(),
                "lineItems": line_items,
            })
        })
        .collect();
    Ok(Json(json!({
        "connectionId": connection_id,
        "transactionDate": MOCK_TRANSACTION_DATE,
        "items": items,
    })))
}

async fn create_order(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(connection_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(input): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>), MockError> {
    taxcloud_guard(&state, &headers, &connection_id)?;
    if let Some(mode) = params.get("addressAutocomplete") {
        if !matches!(mode.as_str(), "none" | "origin" | "destination" | "all") {
            return Err(MockError::new(
                StatusCode::BAD_REQUEST,
                format!("unknown addressAutocomplete value: {mode}"),
            ));
        }
    }

    let mut orders = state.orders.write().await;
    if orders.contains_key(&input.order_id) {
        return Err(MockError::new(
            StatusCode::CONFLICT,
            format!("order {} already exists", input.order_id),
        ));
    }
    let order = Order {
        order_id: input.order_id,
        customer_id: input.customer_id,
        connection_id,
        transaction_date: input.transaction_date,
        completed_date: Some(input.completed_date),
        origin: input.origin,
        destination: input.destination,
        line_items: input.line_items,
        currency: input.currency,
        delivered_by_seller: input.delivered_by_seller,
        exclude_from_filing: input.exclude_from_filing,
        exemption: input.exemption,
    };
    orders.insert(
        order.order_id.clone(),
        StoredOrder {
            order: order.clone(),
            refunded: false,
        },
    );
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path((connection_id, order_id)): Path<(String, String)>,
) -> ApiResult<Order> {
    taxcloud_guard(&state, &headers, &connection_id)?;
    let orders = state.orders.read().await;
    orders
        .get(&order_id)
        .map(|stored| Json(stored.order.clone()))
        .ok_or_else(|| order_not_found(&order_id))
}

async fn update_order(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path((connection_id, order_id)): Path<(String, String)>,
    Json(input): Json<UpdateOrder>,
) -> ApiResult<Order> {
    taxcloud_guard(&state, &headers, &connection_id)?;
    let mut orders = state.orders.write().await;
    let stored = orders
        .get_mut(&order_id)
        .ok_or_else(|| order_not_found(&order_id))?;
    stored.order.completed_date = Some(input.completed_date);
    Ok(Json(stored.order.clone()))
}

async fn refund_order(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path((connection_id, order_id)): Path<(String, String)>,
    Json(input): Json<RefundRequest>,
) -> Result<(StatusCode, Json<Refund>), MockError> {
    taxcloud_guard(&state, &headers, &connection_id)?;
    let mut orders = state.orders.write().await;
    let stored = orders
        .get_mut(&order_id)
        .ok_or_else(|| order_not_found(&order_id))?;
    if stored.refunded {
        return Err(MockError::new(
            StatusCode::CONFLICT,
            format!("order {order_id} has already been refunded"),
        ));
    }

    let items = match input.items.filter(|items| !items.is_empty()) {
        None => stored.order.line_items.clone(),
        Some(requested) => {
            let mut refunded = Vec::with_capacity(requested.len());
            for line in requested {
                let original = stored
                    .order
                    .line_items
                    .iter()
                    .find(|item| item.item_id == line.item_id)
                    .ok_or_else(|| {
                        MockError::new(
                            StatusCode::BAD_REQUEST,
                            format!("item {} is not part of order {order_id}", line.item_id),
                        )
                    })?;
                if line.quantity <= 0.0 || line.quantity > original.quantity {
                    return Err(MockError::new(
                        StatusCode::BAD_REQUEST,
                        format!("invalid refund quantity for item {}", line.item_id),
                    ));
                }
                refunded.push(TaxedLine {
                    quantity: line.quantity,
                    tax: tax_for(original.price, line.quantity, original.tax.rate),
                    ..original.clone()
                });
            }
            refunded
        }
    };
    stored.refunded = true;

    Ok((
        StatusCode::CREATED,
        Json(Refund {
            connection_id,
            created_date: MOCK_TRANSACTION_DATE.to_string(),
            returned_date: input.returned_date,
            items,
        }),
    ))
}

fn order_not_found(order_id: &str) -> MockError {
    MockError::new(StatusCode::NOT_FOUND, format!("order {order_id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_is_rounded_to_cents() {
        let tax = tax_for(10.75, 1.5, ZIPTAX_RATE);
        assert_eq!(tax.amount, 1.25);
        assert_eq!(tax.rate, ZIPTAX_RATE);
    }

    #[test]
    fn scripted_failures_run_out() {
        let state = MockState::default();
        state.fail_next(2, 503);
        assert_eq!(state.take_failure().map(|f| f.status), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert!(state.take_failure().is_some());
        assert!(state.take_failure().is_none());
    }

    #[test]
    fn rate_limit_carries_retry_after() {
        let state = MockState::default();
        state.rate_limit_next(1, 7);
        let failure = state.take_failure().unwrap();
        assert_eq!(failure.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(failure.retry_after, Some(7));
    }

    #[test]
    fn taxcloud_line_rejects_unknown_fields() {
        let result: Result<IndexedLine, _> = serde_json::from_str(
            r#"{"index":0,"itemId":"a","price":1.0,"quantity":1.0,"taxabilityCode":1}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn refund_request_accepts_empty_object() {
        let input: RefundRequest = serde_json::from_str("{}").unwrap();
        assert!(input.items.is_none());
        assert!(input.returned_date.is_none());
    }
}
