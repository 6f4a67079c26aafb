use serde::{Deserialize, Serialize};

use crate::diff::BusinessFields;
use crate::model::RefEntity;
use crate::temporal::{Bitemporal, BitemporalStamp};

/// ISO 3166-1 country reference record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Country {
    #[serde(flatten)]
    pub stamp: BitemporalStamp,
    /// Two-letter ISO code; the business key.
    pub code: String,
    pub name: String,
    pub iso3: Option<String>,
    pub numeric_code: Option<String>,
}

impl Country {
    /// A candidate record as delivered by an external feed, not yet
    /// versioned.
    pub fn record(code: impl Into<String>, name: impl Into<String>) -> Self {
        let code = code.into();
        Country {
            stamp: BitemporalStamp::draft(&code),
            code,
            name: name.into(),
            iso3: None,
            numeric_code: None,
        }
    }

    pub fn with_iso3(mut self, iso3: impl Into<String>) -> Self {
        self.iso3 = Some(iso3.into());
        self
    }

    pub fn with_numeric_code(mut self, numeric: impl Into<String>) -> Self {
        self.numeric_code = Some(numeric.into());
        self
    }
}

impl Bitemporal for Country {
    fn stamp(&self) -> &BitemporalStamp {
        &self.stamp
    }

    fn stamp_mut(&mut self) -> &mut BitemporalStamp {
        &mut self.stamp
    }
}

impl BusinessFields for Country {
    fn business_fields(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("name", Some(self.name.clone())),
            ("iso3", self.iso3.clone()),
            ("numeric_code", self.numeric_code.clone()),
        ]
    }
}

impl RefEntity for Country {
    const AGGREGATE_TYPE: &'static str = "countries";

    fn natural_key(&self) -> String {
        self.code.clone()
    }
}
