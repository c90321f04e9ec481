//! Cart routing between the ZipTax and TaxCloud backends.
//!
//! The backend is a pure function of whether TaxCloud credentials are
//! configured. The two response shapes are kept apart in `CartResponse`.

use crate::address::parse_address;
use crate::error::ApiError;
use crate::types::{
    CalculateCartRequest, CalculateCartResponse, CartAddress, TaxCloudAddress, TaxCloudCartItem,
    TaxCloudCartLineItem, TaxCloudCartRequest, TaxCloudCartResponse,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartBackend {
    ZipTax,
    TaxCloud,
}

impl CartBackend {
    pub fn select(taxcloud_configured: bool) -> Self {
        if taxcloud_configured {
            CartBackend::TaxCloud
        } else {
            CartBackend::ZipTax
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CartBackend::ZipTax => "ziptax",
            CartBackend::TaxCloud => "taxcloud",
        }
    }
}

/// Result of a routed cart calculation.
#[derive(Debug, Clone, PartialEq)]
pub enum CartResponse {
    ZipTax(CalculateCartResponse),
    TaxCloud(TaxCloudCartResponse),
}

impl CartResponse {
    pub fn backend(&self) -> CartBackend {
        match self {
            CartResponse::ZipTax(_) => CartBackend::ZipTax,
            CartResponse::TaxCloud(_) => CartBackend::TaxCloud,
        }
    }

    pub fn as_ziptax(&self) -> Option<&CalculateCartResponse> {
        match self {
            CartResponse::ZipTax(response) => Some(response),
            CartResponse::TaxCloud(_) => None,
        }
    }

    pub fn as_taxcloud(&self) -> Option<&TaxCloudCartResponse> {
        match self {
            CartResponse::TaxCloud(response) => Some(response),
            CartResponse::ZipTax(_) => None,
        }
    }
}

/// Rewrite a ZipTax cart into the TaxCloud shape.
///
/// Addresses are split into structured parts, `taxabilityCode` becomes
/// `tic`, and line items are numbered from 0 in their original order.
pub fn to_taxcloud_cart(request: &CalculateCartRequest) -> Result<TaxCloudCartRequest, ApiError> {
    let items = request
        .items
        .iter()
        .map(|cart| {
            let line_items = cart
                .line_items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    let index = u32::try_from(index).map_err(|_| {
                        ApiError::Validation(format!("line item index {index} out of range"))
                    })?;
                    Ok(TaxCloudCartLineItem {
                        index,
                        item_id: item.item_id.clone(),
                        price: item.price,
                        quantity: item.quantity,
                        tic: item.taxability_code,
                    })
                })
                .collect::<Result<Vec<_>, ApiError>>()?;
            Ok(TaxCloudCartItem {
                customer_id: cart.customer_id.clone(),
                currency: cart.currency,
                destination: structured_address(&cart.destination)?,
                origin: structured_address(&cart.origin)?,
                line_items,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;
    Ok(TaxCloudCartRequest { items })
}

fn structured_address(address: &CartAddress) -> Result<TaxCloudAddress, ApiError> {
    let parsed = parse_address(&address.address)?;
    Ok(TaxCloudAddress {
        line1: parsed.line1,
        line2: None,
        city: parsed.city,
        state: parsed.state,
        zip: parsed.zip,
        country_code: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CartCurrency, CartItem, CartLineItem};

    fn line(id: &str, code: Option<u32>) -> CartLineItem {
        CartLineItem {
            item_id: id.into(),
            price: 10.0,
            quantity: 1.0,
            taxability_code: code,
        }
    }

    fn cart(destination: &str) -> CalculateCartRequest {
        CalculateCartRequest {
            items: vec![CartItem {
                customer_id: "customer-453".into(),
                currency: CartCurrency::default(),
                destination: CartAddress::new(destination),
                origin: CartAddress::new("323 Washington Ave N, Minneapolis, MN 55401-2427"),
                line_items: vec![
                    line("item-a", None),
                    line("item-b", Some(31000)),
                    line("item-c", None),
                ],
            }],
        }
    }

    #[test]
    fn selection_follows_credentials() {
        assert_eq!(CartBackend::select(false), CartBackend::ZipTax);
        assert_eq!(CartBackend::select(true), CartBackend::TaxCloud);
    }

    #[test]
    fn indices_follow_original_order() {
        let converted = to_taxcloud_cart(&cart("200 Spectrum Center Dr, Irvine, CA 92618")).unwrap();
        let items = &converted.items[0].line_items;
        let indices: Vec<u32> = items.iter().map(|i| i.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        let ids: Vec<&str> = items.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, vec!["item-a", "item-b", "item-c"]);
    }

    #[test]
    fn taxability_code_becomes_tic() {
        let converted = to_taxcloud_cart(&cart("200 Spectrum Center Dr, Irvine, CA 92618")).unwrap();
        let json = serde_json::to_value(&converted).unwrap();
        let line_items = &json["items"][0]["lineItems"];
        assert_eq!(line_items[1]["tic"], 31000);
        assert!(line_items[0].get("tic").is_none());
        assert!(line_items[1].get("taxabilityCode").is_none());
    }

    #[test]
    fn addresses_are_structured() {
        let converted = to_taxcloud_cart(&cart("200 Spectrum Center Dr, Irvine, CA 92618")).unwrap();
        let item = &converted.items[0];
        assert_eq!(item.destination.line1, "200 Spectrum Center Dr");
        assert_eq!(item.destination.city, "Irvine");
        assert_eq!(item.destination.state, "CA");
        assert_eq!(item.destination.zip, "92618");
        assert_eq!(item.origin.zip, "55401-2427");
    }

    #[test]
    fn unparseable_address_is_a_validation_error() {
        let err = to_taxcloud_cart(&cart("200 Spectrum Center Dr Irvine CA")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn response_reports_its_backend() {
        let response = CartResponse::ZipTax(CalculateCartResponse { items: Vec::new() });
        assert_eq!(response.backend(), CartBackend::ZipTax);
        assert!(response.as_taxcloud().is_none());
        assert_eq!(response.backend().as_str(), "ziptax");
    }
}
