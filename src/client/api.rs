use std::collections::{BTreeMap, HashMap};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use crate::errors::HarvesterError;
use crate::models::{IndicatorType, ProvidersMetadata};

/// Body of the batch lookup endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchLookupRequest {
    pub indicators: Vec<String>,
    /// Lookup type name -> provider IDs to query.
    pub providers_by_type: BTreeMap<String, Vec<String>>,
}

/// Raw per-indicator records; decoding into envelopes happens in the executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRecords {
    pub indicator: String,
    #[serde(default)]
    pub results: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchLookupResponse {
    #[serde(default)]
    pub results: Vec<IndicatorRecords>,
    #[serde(default)]
    pub indicator_types: HashMap<String, String>,
}

impl BatchLookupResponse {
    pub fn records_for(&self, indicator: &str) -> &[Value] {
        self.results
            .iter()
            .find(|r| r.indicator == indicator)
            .map(|r| r.results.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifiedIndicator {
    pub value: String,
    #[serde(rename = "type")]
    pub indicator_type: IndicatorType,
}

/// Backend operations the lookup engine depends on.
#[async_trait]
pub trait HarvesterApi: Send + Sync {
    /// Resolve indicator types. Malformed responses yield an empty list.
    async fn identify(&self, indicators: &[String]) -> Result<Vec<IdentifiedIndicator>, HarvesterError>;

    /// Run lookups for the given indicators and type -> providers map.
    async fn batch_lookup(&self, request: &BatchLookupRequest) -> Result<BatchLookupResponse, HarvesterError>;

    /// Providers per lookup type, presets and backend version.
    async fn providers(&self) -> Result<ProvidersMetadata, HarvesterError>;

    /// Backend name for logging
    fn backend_name(&self) -> &str {
        "http"
    }
}

/// Decode an identification response body. Anything but an array is logged
/// and treated as "nothing resolved"; malformed entries are skipped.
pub fn decode_identified(body: Value) -> Vec<IdentifiedIndicator> {
    let entries = match body {
        Value::Array(entries) => entries,
        other => {
            warn!(
                kind = json_kind(&other),
                "Identification response is not an array, treating as unresolved"
            );
            return Vec::new();
        }
    };

    let total = entries.len();
    let decoded: Vec<IdentifiedIndicator> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect();

    if decoded.len() < total {
        debug!(skipped = total - decoded.len(), "Skipped malformed identification entries");
    }
    decoded
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
