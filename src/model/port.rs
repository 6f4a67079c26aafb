use serde::{Deserialize, Serialize};

use crate::diff::BusinessFields;
use crate::model::RefEntity;
use crate::temporal::{Bitemporal, BitemporalStamp};

/// UN/LOCODE port reference record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Port {
    #[serde(flatten)]
    pub stamp: BitemporalStamp,
    /// Five-character UN/LOCODE; the business key.
    pub code: String,
    pub name: String,
    pub country_code: Option<String>,
}

impl Port {
    pub fn record(code: impl Into<String>, name: impl Into<String>) -> Self {
        let code = code.into();
        Port {
            stamp: BitemporalStamp::draft(&code),
            code,
            name: name.into(),
            country_code: None,
        }
    }

    pub fn with_country(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = Some(country_code.into());
        self
    }
}

impl Bitemporal for Port {
    fn stamp(&self) -> &BitemporalStamp {
        &self.stamp
    }

    fn stamp_mut(&mut self) -> &mut BitemporalStamp {
        &mut self.stamp
    }
}

impl BusinessFields for Port {
    fn business_fields(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("name", Some(self.name.clone())),
            ("country_code", self.country_code.clone()),
        ]
    }
}

impl RefEntity for Port {
    const AGGREGATE_TYPE: &'static str = "ports";

    fn natural_key(&self) -> String {
        self.code.clone()
    }
}
