use serde::{Deserialize, Deserializer, Serialize};

/// Kind of observable an indicator value represents, as resolved by the
/// backend identification endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorType {
    Domain,
    Ip,
    Url,
    Email,
    Hash,
    Cve,
    /// The backend could not classify the value.
    Unknown,
}

impl IndicatorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Ip => "ip",
            Self::Url => "url",
            Self::Email => "email",
            Self::Hash => "hash",
            Self::Cve => "cve",
            Self::Unknown => "unknown",
        }
    }

    /// Lenient parse: anything unrecognised maps to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "domain" => Self::Domain,
            "ip" | "ipv4" | "ipv6" => Self::Ip,
            "url" => Self::Url,
            "email" => Self::Email,
            "hash" | "md5" | "sha1" | "sha256" => Self::Hash,
            "cve" => Self::Cve,
            _ => Self::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for IndicatorType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

impl std::fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_type_deserialize() {
        let parsed: IndicatorType = serde_json::from_str("\"domain\"").unwrap();
        assert_eq!(parsed, IndicatorType::Domain);
    }

    #[test]
    fn test_indicator_type_aliases() {
        assert_eq!(IndicatorType::from_label("IPv4"), IndicatorType::Ip);
        assert_eq!(IndicatorType::from_label("sha256"), IndicatorType::Hash);
    }

    #[test]
    fn test_unrecognised_label_is_unknown() {
        let parsed: IndicatorType = serde_json::from_str("\"asn\"").unwrap();
        assert_eq!(parsed, IndicatorType::Unknown);
    }

    #[test]
    fn test_indicator_type_display() {
        assert_eq!(format!("{}", IndicatorType::Cve), "cve");
        assert_eq!(serde_json::to_string(&IndicatorType::Email).unwrap(), "\"email\"");
    }
}
