//! Free-text address parsing for the TaxCloud backend.
//!
//! TaxCloud wants structured addresses while the ZipTax cart API takes a
//! single line. Accepted shape: `"<street>, <city>, <ST> <zip>"` where the
//! zip is 5 digits or ZIP+4. Extra comma-separated segments at the front
//! stay in `line1`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(.+?)\s*,\s*([^,]+?)\s*,\s*([A-Za-z]{2})\s+(\d{5}(?:-\d{4})?)\s*$")
        .expect("address pattern is valid")
});

/// Structured form of a single-line US address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAddress {
    pub line1: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

pub fn parse_address(address: &str) -> Result<ParsedAddress, ApiError> {
    let caps = ADDRESS_RE.captures(address).ok_or_else(|| {
        ApiError::Validation(format!(
            "cannot parse address {address:?}: expected \"street, city, ST zip\""
        ))
    })?;
    Ok(ParsedAddress {
        line1: caps[1].to_string(),
        city: caps[2].to_string(),
        state: caps[3].to_ascii_uppercase(),
        zip: caps[4].to_string(),
    })
}
