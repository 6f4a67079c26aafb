use serde::{Deserialize, Serialize};

use crate::diff::BusinessFields;
use crate::model::RefEntity;
use crate::temporal::{Bitemporal, BitemporalStamp};

/// Carrier reference record keyed by SCAC.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Carrier {
    #[serde(flatten)]
    pub stamp: BitemporalStamp,
    /// Standard Carrier Alpha Code; the business key.
    pub code: String,
    pub name: String,
    /// Transport mode, e.g. "ocean", "air", "rail".
    pub mode: Option<String>,
}

impl Carrier {
    pub fn record(code: impl Into<String>, name: impl Into<String>) -> Self {
        let code = code.into();
        Carrier {
            stamp: BitemporalStamp::draft(&code),
            code,
            name: name.into(),
            mode: None,
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }
}

impl Bitemporal for Carrier {
    fn stamp(&self) -> &BitemporalStamp {
        &self.stamp
    }

    fn stamp_mut(&mut self) -> &mut BitemporalStamp {
        &mut self.stamp
    }
}

impl BusinessFields for Carrier {
    fn business_fields(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("name", Some(self.name.clone())),
            ("mode", self.mode.clone()),
        ]
    }
}

impl RefEntity for Carrier {
    const AGGREGATE_TYPE: &'static str = "carriers";

    fn natural_key(&self) -> String {
        self.code.clone()
    }
}
