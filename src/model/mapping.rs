use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diff::BusinessFields;
use crate::model::RefEntity;
use crate::temporal::{Bitemporal, BitemporalStamp};

/// Relationship class of a code mapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingType {
    #[default]
    Exact,
    Broader,
    Narrower,
    Related,
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MappingType::Exact => "exact",
            MappingType::Broader => "broader",
            MappingType::Narrower => "narrower",
            MappingType::Related => "related",
        };
        f.write_str(s)
    }
}

/// Crosswalk between a code in one coding system and its equivalent in
/// another. Itself a bitemporal entity: mappings are versioned, corrected,
/// and deprecated over time like any other reference record.
///
/// The business key is the full `from_system|from_code|to_system|to_code`
/// quad — alternative target codes for the same source are distinct logical
/// mappings, which is what lets `check_deprecation` surface them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodeMapping {
    #[serde(flatten)]
    pub stamp: BitemporalStamp,
    pub from_system: String,
    pub from_code: String,
    pub to_system: String,
    pub to_code: String,
    pub mapping_type: MappingType,
    /// 0–100; higher wins when several mappings match a lookup.
    pub confidence: u8,
    pub is_deprecated: bool,
    pub deprecation_reason: Option<String>,
    pub rule_id: Option<String>,
}

impl CodeMapping {
    pub fn record(
        from_system: impl Into<String>,
        from_code: impl Into<String>,
        to_system: impl Into<String>,
        to_code: impl Into<String>,
    ) -> Self {
        let from_system = from_system.into();
        let from_code = from_code.into();
        let to_system = to_system.into();
        let to_code = to_code.into();
        let key = Self::business_key_for(&from_system, &from_code, &to_system, &to_code);
        CodeMapping {
            stamp: BitemporalStamp::draft(key),
            from_system,
            from_code,
            to_system,
            to_code,
            mapping_type: MappingType::Exact,
            confidence: 100,
            is_deprecated: false,
            deprecation_reason: None,
            rule_id: None,
        }
    }

    pub fn business_key_for(
        from_system: &str,
        from_code: &str,
        to_system: &str,
        to_code: &str,
    ) -> String {
        format!("{}|{}|{}|{}", from_system, from_code, to_system, to_code)
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence = confidence.min(100);
        self
    }

    pub fn with_type(mut self, mapping_type: MappingType) -> Self {
        self.mapping_type = mapping_type;
        self
    }

    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.is_deprecated = true;
        self.deprecation_reason = Some(reason.into());
        self
    }

    /// Whether this mapping answers a `(from_system, from_code, to_system)`
    /// lookup.
    pub fn matches_source(&self, from_system: &str, from_code: &str, to_system: &str) -> bool {
        self.from_system == from_system && self.from_code == from_code && self.to_system == to_system
    }
}

impl Bitemporal for CodeMapping {
    fn stamp(&self) -> &BitemporalStamp {
        &self.stamp
    }

    fn stamp_mut(&mut self) -> &mut BitemporalStamp {
        &mut self.stamp
    }
}

impl BusinessFields for CodeMapping {
    fn business_fields(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("mapping_type", Some(self.mapping_type.to_string())),
            ("confidence", Some(self.confidence.to_string())),
            ("is_deprecated", Some(self.is_deprecated.to_string())),
            ("deprecation_reason", self.deprecation_reason.clone()),
            ("rule_id", self.rule_id.clone()),
        ]
    }
}

impl RefEntity for CodeMapping {
    const AGGREGATE_TYPE: &'static str = "code-mappings";

    fn natural_key(&self) -> String {
        Self::business_key_for(&self.from_system, &self.from_code, &self.to_system, &self.to_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_key_is_the_full_quad() {
        let mapping = CodeMapping::record("ISO3166-1", "USA", "CBP-COUNTRY5", "US");
        assert_eq!(mapping.natural_key(), "ISO3166-1|USA|CBP-COUNTRY5|US");
        assert_eq!(mapping.stamp.business_key, mapping.natural_key());
    }

    #[test]
    fn confidence_is_clamped() {
        let mapping = CodeMapping::record("A", "1", "B", "2").with_confidence(250);
        assert_eq!(mapping.confidence, 100);
    }

    #[test]
    fn matches_source_ignores_target_code() {
        let mapping = CodeMapping::record("ISO3166-1", "USA", "CBP-COUNTRY5", "US");
        assert!(mapping.matches_source("ISO3166-1", "USA", "CBP-COUNTRY5"));
        assert!(!mapping.matches_source("ISO3166-1", "USA", "ICAO"));
    }
}
