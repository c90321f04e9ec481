//! Blocking SDK facade.
//!
//! `TaxService` ties the configuration, both request builders, a
//! `Transport` and the retry executor together. Each call validates and
//! builds its request first, so invalid input and missing TaxCloud
//! credentials fail without any network traffic. The build → execute →
//! parse round-trip then runs inside `RetryExecutor::execute`.

use tracing::debug;

use crate::client::ZipTaxClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::retry::{RetryExecutor, Sleeper, ThreadSleeper};
use crate::router::{to_taxcloud_cart, CartBackend, CartResponse};
use crate::taxcloud::TaxCloudClient;
use crate::types::{
    AddressAutocomplete, CalculateCartRequest, CreateOrderRequest, LookupOptions, OrderResponse,
    RefundTransactionRequest, RefundTransactionResponse, UpdateOrderRequest, V60AccountMetrics,
    V60PostalCodeResponse, V60Response,
};
use crate::validation::validate_cart;

#[derive(Debug)]
pub struct TaxService<T = UreqTransport, S = ThreadSleeper> {
    ziptax: ZipTaxClient,
    taxcloud: Option<TaxCloudClient>,
    backend: CartBackend,
    transport: T,
    retry: RetryExecutor<S>,
}

impl TaxService<UreqTransport, ThreadSleeper> {
    /// Default stack: blocking `ureq` transport and real sleeps.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::with_parts(config, UreqTransport::new(config.timeout()), ThreadSleeper)
    }
}

impl<T: Transport, S: Sleeper> TaxService<T, S> {
    pub fn with_parts(config: &ClientConfig, transport: T, sleeper: S) -> Result<Self, ApiError> {
        config.validate()?;
        let taxcloud = config.taxcloud.as_ref().map(|creds| {
            TaxCloudClient::new(
                &config.taxcloud_base_url,
                creds.connection_id,
                &creds.api_key,
            )
        });
        Ok(Self {
            ziptax: ZipTaxClient::new(&config.base_url, &config.api_key),
            taxcloud,
            backend: CartBackend::select(config.has_taxcloud_config()),
            transport,
            retry: RetryExecutor::with_sleeper(config.retry_policy(), sleeper),
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn retry(&self) -> &RetryExecutor<S> {
        &self.retry
    }

    /// Backend that `calculate_cart` will use.
    pub fn cart_backend(&self) -> CartBackend {
        self.backend
    }

    pub fn sales_tax_by_address(
        &self,
        address: &str,
        options: &LookupOptions,
    ) -> Result<V60Response, ApiError> {
        let request = self.ziptax.build_sales_tax_by_address(address, options)?;
        self.send(&request, |response| self.ziptax.parse_sales_tax(response))
    }

    pub fn sales_tax_by_geolocation(
        &self,
        lat: &str,
        lng: &str,
        options: &LookupOptions,
    ) -> Result<V60Response, ApiError> {
        let request = self.ziptax.build_sales_tax_by_geolocation(lat, lng, options)?;
        self.send(&request, |response| self.ziptax.parse_sales_tax(response))
    }

    pub fn account_metrics(&self) -> Result<V60AccountMetrics, ApiError> {
        let request = self.ziptax.build_account_metrics(None)?;
        self.send(&request, |response| self.ziptax.parse_account_metrics(response))
    }

    pub fn rates_by_postal_code(
        &self,
        postal_code: &str,
    ) -> Result<V60PostalCodeResponse, ApiError> {
        let request = self.ziptax.build_rates_by_postal_code(postal_code)?;
        self.send(&request, |response| {
            self.ziptax.parse_rates_by_postal_code(response)
        })
    }

    /// Calculate cart tax on whichever backend is configured.
    ///
    /// Only the selected backend is ever contacted.
    pub fn calculate_cart(&self, request: &CalculateCartRequest) -> Result<CartResponse, ApiError> {
        validate_cart(request)?;
        match self.backend {
            CartBackend::ZipTax => {
                debug!(backend = CartBackend::ZipTax.as_str(), "routing cart");
                let http = self.ziptax.build_calculate_cart(request)?;
                self.send(&http, |response| self.ziptax.parse_calculate_cart(response))
                    .map(CartResponse::ZipTax)
            }
            CartBackend::TaxCloud => {
                debug!(backend = CartBackend::TaxCloud.as_str(), "routing cart");
                let taxcloud = self.require_taxcloud()?;
                let converted = to_taxcloud_cart(request)?;
                let http = taxcloud.build_calculate_cart(&converted)?;
                self.send(&http, |response| taxcloud.parse_calculate_cart(response))
                    .map(CartResponse::TaxCloud)
            }
        }
    }

    pub fn create_order(
        &self,
        request: &CreateOrderRequest,
        autocomplete: AddressAutocomplete,
    ) -> Result<OrderResponse, ApiError> {
        let taxcloud = self.require_taxcloud()?;
        let http = taxcloud.build_create_order(request, autocomplete)?;
        self.send(&http, |response| taxcloud.parse_order(response))
    }

    pub fn get_order(&self, order_id: &str) -> Result<OrderResponse, ApiError> {
        let taxcloud = self.require_taxcloud()?;
        let http = taxcloud.build_get_order(order_id)?;
        self.send(&http, |response| taxcloud.parse_order(response))
    }

    pub fn update_order(
        &self,
        order_id: &str,
        request: &UpdateOrderRequest,
    ) -> Result<OrderResponse, ApiError> {
        let taxcloud = self.require_taxcloud()?;
        let http = taxcloud.build_update_order(order_id, request)?;
        self.send(&http, |response| taxcloud.parse_order(response))
    }

    /// Refund part of an order, or all of it when `request` is `None`.
    pub fn refund_order(
        &self,
        order_id: &str,
        request: Option<&RefundTransactionRequest>,
    ) -> Result<Vec<RefundTransactionResponse>, ApiError> {
        let taxcloud = self.require_taxcloud()?;
        let http = taxcloud.build_refund_order(order_id, request)?;
        self.send(&http, |response| taxcloud.parse_refund_order(response))
    }

    fn require_taxcloud(&self) -> Result<&TaxCloudClient, ApiError> {
        self.taxcloud.as_ref().ok_or_else(|| {
            ApiError::Config(
                "TaxCloud credentials are not configured; set a connection id and API key".into(),
            )
        })
    }

    fn send<R, P>(&self, request: &HttpRequest, parse: P) -> Result<R, ApiError>
    where
        P: Fn(HttpResponse) -> Result<R, ApiError>,
    {
        self.retry
            .execute(|| self.transport.execute(request).and_then(&parse))
    }
}
