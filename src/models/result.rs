use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use super::indicator::IndicatorType;
use super::lookup_type::LookupType;

/// Provider used in merge keys when a record does not name its provider.
pub const UNKNOWN_PROVIDER: &str = "unknown";

/// Keys lifted out of a raw backend record into the envelope's tag fields.
/// `type` joins them only when it is the record's lookup-type tag.
const TAG_FIELDS: &[&str] = &["lookup_type", "provider", "error", "essential", "additional"];

/// Failure reported by a single provider. Backends send either a plain
/// message or an object with provider-specific detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Structured(Map<String, Value>),
}

impl ErrorDetail {
    pub fn summary(&self) -> String {
        match self {
            ErrorDetail::Message(m) => m.clone(),
            ErrorDetail::Structured(map) => map
                .get("message")
                .or_else(|| map.get("detail"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
        }
    }
}

/// One provider's answer for one lookup type against one indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    pub lookup_type: LookupType,
    pub provider: Option<String>,
    /// Summary fields shown on the overview card.
    #[serde(default)]
    pub essential: Map<String, Value>,
    /// Detail-only fields.
    #[serde(default)]
    pub additional: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    pub fetched_at: DateTime<Utc>,
}

impl LookupResult {
    pub fn new(lookup_type: LookupType, provider: Option<&str>) -> Self {
        Self {
            lookup_type,
            provider: provider.map(str::to_string),
            essential: Map::new(),
            additional: Map::new(),
            error: None,
            fetched_at: Utc::now(),
        }
    }

    /// The `(lookup_type, provider)` identity results are de-duplicated on.
    pub fn merge_key(&self) -> String {
        format!(
            "{}::{}",
            self.lookup_type.as_str(),
            self.provider.as_deref().unwrap_or(UNKNOWN_PROVIDER)
        )
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Tag the record carries for its lookup type, if any.
    pub fn record_lookup_type(record: &Value) -> Option<LookupType> {
        record
            .get("lookup_type")
            .or_else(|| record.get("type"))
            .and_then(Value::as_str)
            .and_then(LookupType::parse)
    }

    pub fn record_provider(record: &Value) -> Option<&str> {
        record.get("provider").and_then(Value::as_str)
    }

    /// Build an envelope from a raw backend record. `lookup_type` is the
    /// resolved tag and always overrides whatever the record says.
    ///
    /// Records carrying `essential`/`additional` objects keep that split;
    /// flat records put every non-tag field under `essential`.
    pub fn from_record(record: &Value, lookup_type: LookupType) -> Option<Self> {
        let obj = record.as_object()?;
        let mut result = Self::new(lookup_type, Self::record_provider(record));

        result.error = obj.get("error").and_then(decode_error);
        let type_is_tag = !obj.contains_key("lookup_type")
            && obj.get("type").and_then(Value::as_str).and_then(LookupType::parse).is_some();

        let split = obj.get("essential").and_then(Value::as_object).is_some()
            || obj.get("additional").and_then(Value::as_object).is_some();

        if split {
            if let Some(Value::Object(essential)) = obj.get("essential") {
                result.essential = essential.clone();
            }
            if let Some(Value::Object(additional)) = obj.get("additional") {
                result.additional = additional.clone();
            }
        } else {
            for (key, value) in obj {
                if TAG_FIELDS.contains(&key.as_str()) || (type_is_tag && key == "type") {
                    continue;
                }
                result.essential.insert(key.clone(), value.clone());
            }
        }

        Some(result)
    }
}

/// Providers flag failures with a message, a detail object or a bare
/// boolean. `false`, null and empty strings mean success.
fn decode_error(value: &Value) -> Option<ErrorDetail> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(ErrorDetail::Message(s.clone())),
        Value::Object(map) => Some(ErrorDetail::Structured(map.clone())),
        Value::Bool(true) => Some(ErrorDetail::Message("provider reported an error".into())),
        other => Some(ErrorDetail::Message(other.to_string())),
    }
}

/// Every lookup result known for one indicator, de-duplicated by merge key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub indicator: String,
    pub indicator_type: Option<IndicatorType>,
    pub results: Vec<LookupResult>,
}

impl IndicatorResult {
    pub fn find(&self, lookup_type: LookupType, provider: &str) -> Option<&LookupResult> {
        self.results
            .iter()
            .find(|r| r.lookup_type == lookup_type && r.provider.as_deref() == Some(provider))
    }
}
