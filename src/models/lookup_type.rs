use serde::{Deserialize, Serialize};
use super::indicator::IndicatorType;

/// Category of enrichment that can be run against an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupType {
    Whois,
    IpInfo,
    Reputation,
    Dns,
    PassiveDns,
    WhoisHistory,
    ReverseDns,
    Screenshot,
    EmailValidator,
    Vulnerability,
    WebSearch,
    WebsiteStatus,
    WebRedirects,
    WebScan,
    Subdomains,
    CveDetails,
}

impl LookupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whois => "whois",
            Self::IpInfo => "ip_info",
            Self::Reputation => "reputation",
            Self::Dns => "dns",
            Self::PassiveDns => "passive_dns",
            Self::WhoisHistory => "whois_history",
            Self::ReverseDns => "reverse_dns",
            Self::Screenshot => "screenshot",
            Self::EmailValidator => "email_validator",
            Self::Vulnerability => "vulnerability",
            Self::WebSearch => "web_search",
            Self::WebsiteStatus => "website_status",
            Self::WebRedirects => "web_redirects",
            Self::WebScan => "web_scan",
            Self::Subdomains => "subdomains",
            Self::CveDetails => "cve_details",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        LOOKUP_TYPES
            .iter()
            .map(|d| d.lookup_type)
            .find(|t| t.as_str() == name.trim())
    }

    pub fn definition(&self) -> &'static LookupTypeDefinition {
        LOOKUP_TYPES
            .iter()
            .find(|d| d.lookup_type == *self)
            .unwrap_or(&LOOKUP_TYPES[0])
    }

    pub fn applies_to(&self, indicator_type: IndicatorType) -> bool {
        self.definition().applies_to.contains(&indicator_type)
    }

    pub fn default_providers(&self) -> Vec<String> {
        self.definition()
            .default_providers
            .iter()
            .map(|p| p.to_string())
            .collect()
    }

    pub fn all() -> impl Iterator<Item = LookupType> {
        LOOKUP_TYPES.iter().map(|d| d.lookup_type)
    }
}

impl std::fmt::Display for LookupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct LookupTypeDefinition {
    pub lookup_type: LookupType,
    pub display_name: &'static str,
    pub applies_to: &'static [IndicatorType],
    pub default_providers: &'static [&'static str],
}

use super::indicator::IndicatorType::{Cve, Domain, Email, Hash, Ip, Url};

pub static LOOKUP_TYPES: &[LookupTypeDefinition] = &[
    LookupTypeDefinition {
        lookup_type: LookupType::Whois,
        display_name: "WHOIS",
        applies_to: &[Domain],
        default_providers: &["whois"],
    },
    LookupTypeDefinition {
        lookup_type: LookupType::IpInfo,
        display_name: "IP Info",
        applies_to: &[Ip],
        default_providers: &["ipinfo"],
    },
    LookupTypeDefinition {
        lookup_type: LookupType::Reputation,
        display_name: "Reputation",
        applies_to: &[Domain, Ip, Url, Hash],
        default_providers: &["virustotal"],
    },
    LookupTypeDefinition {
        lookup_type: LookupType::Dns,
        display_name: "DNS Records",
        applies_to: &[Domain],
        default_providers: &["dns"],
    },
    LookupTypeDefinition {
        lookup_type: LookupType::PassiveDns,
        display_name: "Passive DNS",
        applies_to: &[Domain, Ip],
        default_providers: &[],
    },
    LookupTypeDefinition {
        lookup_type: LookupType::WhoisHistory,
        display_name: "WHOIS History",
        applies_to: &[Domain],
        default_providers: &[],
    },
    LookupTypeDefinition {
        lookup_type: LookupType::ReverseDns,
        display_name: "Reverse DNS",
        applies_to: &[Ip],
        default_providers: &["reverse_dns"],
    },
    LookupTypeDefinition {
        lookup_type: LookupType::Screenshot,
        display_name: "Screenshot",
        applies_to: &[Domain, Url],
        default_providers: &[],
    },
    LookupTypeDefinition {
        lookup_type: LookupType::EmailValidator,
        display_name: "Email Validator",
        applies_to: &[Email],
        default_providers: &["email_validator"],
    },
    LookupTypeDefinition {
        lookup_type: LookupType::Vulnerability,
        display_name: "Vulnerabilities",
        applies_to: &[Domain, Ip],
        default_providers: &[],
    },
    LookupTypeDefinition {
        lookup_type: LookupType::WebSearch,
        display_name: "Web Search",
        applies_to: &[Domain, Ip, Url, Email, Hash, Cve],
        default_providers: &[],
    },
    LookupTypeDefinition {
        lookup_type: LookupType::WebsiteStatus,
        display_name: "Website Status",
        applies_to: &[Domain, Url],
        default_providers: &["website_status"],
    },
    LookupTypeDefinition {
        lookup_type: LookupType::WebRedirects,
        display_name: "Web Redirects",
        applies_to: &[Domain, Url],
        default_providers: &[],
    },
    LookupTypeDefinition {
        lookup_type: LookupType::WebScan,
        display_name: "Web Scan",
        applies_to: &[Domain, Url],
        default_providers: &[],
    },
    LookupTypeDefinition {
        lookup_type: LookupType::Subdomains,
        display_name: "Subdomains",
        applies_to: &[Domain],
        default_providers: &[],
    },
    LookupTypeDefinition {
        lookup_type: LookupType::CveDetails,
        display_name: "CVE Details",
        applies_to: &[Cve],
        default_providers: &["nvd"],
    },
];
