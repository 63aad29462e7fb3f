use serde::{Deserialize, Serialize};

use super::types::canonical_symbol;

/// Company profile data.
///
/// Effectively static within a trading day, so it is cached for 24 hours.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub symbol: String,
    /// Display name, e.g. "Apple Inc"
    pub name: String,
    /// Listing exchange; "-" when unknown
    pub exchange: String,
    /// Industry sector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    /// Company website
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
}

impl CompanyProfile {
    pub fn new(symbol: &str, name: &str, exchange: &str) -> Self {
        Self {
            symbol: canonical_symbol(symbol),
            name: name.to_string(),
            exchange: exchange.to_string(),
            industry: None,
            web_url: None,
        }
    }

    /// Fallback profile for a symbol nothing is known about.
    pub fn unknown(symbol: &str) -> Self {
        let symbol = canonical_symbol(symbol);
        Self::new(&symbol, &symbol, "-")
    }

    pub fn with_industry(mut self, industry: Option<String>) -> Self {
        self.industry = industry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_profile() {
        let profile = CompanyProfile::unknown("xyz");
        assert_eq!(profile.symbol, "XYZ");
        assert_eq!(profile.name, "XYZ");
        assert_eq!(profile.exchange, "-");
        assert!(profile.industry.is_none());
    }
}
