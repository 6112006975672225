use serde::{Deserialize, Serialize};

/// OutputUnit locates one rejection of the failure trace: the schema
/// location which rejected, and the instance location which was rejected.
/// `keyword_location` and `error` are reserved extension fields and are not
/// populated by the core engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputUnit {
    pub absolute_keyword_location: String,
    pub instance_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutputUnit {
    pub(crate) fn new(absolute_keyword_location: &str, instance_location: &str) -> OutputUnit {
        OutputUnit {
            absolute_keyword_location: absolute_keyword_location.to_string(),
            instance_location: instance_location.to_string(),
            keyword_location: None,
            error: None,
        }
    }
}

/// Output is the outcome of a validation: valid, or invalid together with a
/// non-empty trace of OutputUnits in schema document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<OutputUnit>,
}

impl Output {
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}
