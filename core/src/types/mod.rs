//! Wire models for both backends.
//!
//! # Design
//! Field names are snake_case in Rust and camelCase on the wire. Optional
//! request fields are skipped when unset so the JSON only carries what the
//! caller provided. The two cart response shapes are kept as separate types;
//! `router::CartResponse` tags which one a call produced.

mod cart;
mod lookup;
mod taxcloud;

pub use cart::{
    CalculateCartRequest, CalculateCartResponse, CartAddress, CartCurrency, CartItem,
    CartItemResponse, CartLineItem, CartLineItemResponse, CurrencyCode, Tax,
};
pub use lookup::{
    LookupOptions, Taxable, V60AccountMetrics, V60AddressDetail, V60BaseRate, V60DisplayRate,
    V60Metadata, V60PostalCodeAddressDetail, V60PostalCodeResponse, V60PostalCodeResult,
    V60Response, V60ResponseInfo, V60Service, V60Shipping, V60SourcingRules, V60TaxSummary,
    CountryCode, SourcingValue,
};
pub use taxcloud::{
    AddressAutocomplete, CartItemRefundWithTaxRequest, CartItemRefundWithTaxResponse,
    CartItemWithTax, CartItemWithTaxResponse, CreateOrderRequest, Exemption, OrderResponse,
    RefundTransactionRequest, RefundTransactionResponse, TaxCloudAddress, TaxCloudCartItem,
    TaxCloudCartItemResponse, TaxCloudCartLineItem, TaxCloudCartRequest, TaxCloudCartResponse,
    UpdateOrderRequest,
};
