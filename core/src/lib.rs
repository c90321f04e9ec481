//! Synchronous client core for the ZipTax and TaxCloud tax APIs.
//!
//! # Overview
//! `ZipTaxClient` and `TaxCloudClient` build `HttpRequest` values and parse
//! `HttpResponse` values without touching the network. A `Transport`
//! performs the round-trip, and `RetryExecutor` retries transient failures
//! with exponential backoff. `TaxService` wires these together into a
//! blocking SDK and routes cart calculations to whichever backend is
//! configured.
//!
//! # Design
//! - The builders hold only base URL and credentials; they are cheap to
//!   clone and carry no state between calls.
//! - Each operation is split into `build_*` and `parse_*`, so the I/O
//!   boundary is explicit and tests can feed hand-written responses.
//! - Input validation runs in `build_*`; invalid calls never reach the
//!   transport.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod address;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod retry;
pub mod router;
pub mod service;
pub mod taxcloud;
pub mod types;
pub mod validation;

pub use address::{parse_address, ParsedAddress};
pub use client::ZipTaxClient;
pub use config::{ClientConfig, TaxCloudCredentials};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use retry::{RetryDecision, RetryExecutor, RetryPolicy, Sleeper, ThreadSleeper};
pub use router::{to_taxcloud_cart, CartBackend, CartResponse};
pub use service::TaxService;
pub use taxcloud::TaxCloudClient;
pub use types::*;
