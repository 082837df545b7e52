//! EasyEDA part records and fetching
//!
//! A [`PartRecord`] is the `result` object of the EasyEDA component API. Only
//! the title is interpreted here; the rest is left to the component converter.

use crate::error::{FabError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Editor version the component API expects in its query string
const API_VERSION: &str = "6.4.19.5";

const USER_AGENT: &str = concat!("tscircuit-fab/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

lazy_static! {
    /// Characters that may not survive in a file name component
    static ref NAME_SEPARATORS: Regex = Regex::new(r"[-\s/\\]").unwrap();
}

/// Turn a part title into a file name: `ABC-123-XY` → `ABC_123_XY`
pub fn part_name(title: &str) -> String {
    NAME_SEPARATORS.replace_all(title.trim(), "_").into_owned()
}

/// Remote component description
#[derive(Debug, Clone, PartialEq)]
pub struct PartRecord {
    raw: Value,
}

impl PartRecord {
    /// Wrap a record; it must carry a string `title`
    pub fn new(raw: Value) -> Result<Self> {
        match raw.get("title").and_then(Value::as_str) {
            Some(title) if !title.trim().is_empty() => Ok(Self { raw }),
            _ => Err(FabError::conversion("EasyEDA part", "record has no title").into()),
        }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn title(&self) -> &str {
        self.raw
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// File name derived from the title
    pub fn name(&self) -> String {
        part_name(self.title())
    }

    /// LCSC / JLCPCB part number, if the record carries one
    pub fn lcsc_number(&self) -> Option<&str> {
        self.raw
            .pointer("/lcsc/number")
            .or_else(|| self.raw.pointer("/dataStr/head/c_para/Supplier Part"))
            .and_then(Value::as_str)
    }
}

/// Looks up a part by number
pub trait PartFetcher {
    fn fetch(&self, part_number: &str) -> Result<PartRecord>;
}

/// [`PartFetcher`] talking to the EasyEDA component API
pub struct HttpPartFetcher {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpPartFetcher {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FabError::Network {
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn component_url(&self, part_number: &str) -> String {
        format!(
            "{}/{}/components?version={}",
            self.base_url, part_number, API_VERSION
        )
    }
}

/// Pull the part out of an API response body
pub fn record_from_response(part_number: &str, body: Value) -> Result<PartRecord> {
    let success = body.get("success").and_then(Value::as_bool).unwrap_or(true);
    match body.get("result") {
        Some(result) if success && !result.is_null() => PartRecord::new(result.clone()),
        _ => Err(FabError::PartNotFound {
            part: part_number.to_string(),
        }
        .into()),
    }
}

impl PartFetcher for HttpPartFetcher {
    fn fetch(&self, part_number: &str) -> Result<PartRecord> {
        let url = self.component_url(part_number);
        info!("Fetching {}", url);

        let network = |e: reqwest::Error| FabError::Network {
            reason: e.to_string(),
        };

        let response = self.client.get(&url).send().map_err(network)?;
        let status = response.status();
        debug!("EasyEDA responded with {}", status);

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FabError::PartNotFound {
                part: part_number.to_string(),
            }
            .into());
        }
        if !status.is_success() {
            return Err(FabError::Network {
                reason: format!("{} returned {}", url, status),
            }
            .into());
        }

        let body: Value = response.json().map_err(network)?;
        record_from_response(part_number, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use serde_json::json;

    #[test]
    fn test_part_name_replaces_dashes() {
        assert_eq!(part_name("ABC-123-XY"), "ABC_123_XY");
        assert_eq!(part_name("NE555DR"), "NE555DR");
        assert_eq!(part_name("LM 317/TO-220"), "LM_317_TO_220");
    }

    #[test]
    fn test_record_requires_title() {
        assert!(PartRecord::new(json!({ "title": "NE555" })).is_ok());
        assert!(PartRecord::new(json!({ "description": "no title" })).is_err());
        assert!(PartRecord::new(json!({ "title": "  " })).is_err());
    }

    #[test]
    fn test_lcsc_number() {
        let record = PartRecord::new(json!({ "title": "NE555", "lcsc": { "number": "C7593" } })).unwrap();
        assert_eq!(record.lcsc_number(), Some("C7593"));
    }

    #[test]
    fn test_response_unwrapping() {
        let record = record_from_response(
            "C7593",
            json!({ "success": true, "result": { "title": "NE555DR" } }),
        )
        .unwrap();
        assert_eq!(record.title(), "NE555DR");

        let err = record_from_response("C0", json!({ "success": false, "result": null })).unwrap_err();
        assert!(matches!(classify(&err), Some(FabError::PartNotFound { .. })));
    }

    #[test]
    fn test_component_url() {
        let fetcher = HttpPartFetcher::new("https://example.com/api/products/").unwrap();
        assert_eq!(
            fetcher.component_url("C46499"),
            "https://example.com/api/products/C46499/components?version=6.4.19.5"
        );
    }
}
