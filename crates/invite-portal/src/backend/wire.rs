use serde::Deserialize;
use serde_json::Value;

use crate::workflows::admin::domain::AdminRecord;
use crate::workflows::window::SystemConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct IssueResponse {
    #[serde(default)]
    pub invitation_code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct AdminDataResponse {
    #[serde(default)]
    pub success: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AdminDataResponse {
    pub fn succeeded(&self) -> bool {
        is_truthy(self.success.as_ref())
    }

    pub fn into_records(self) -> Result<Vec<AdminRecord>, String> {
        match self.data {
            Some(data @ Value::Array(_)) => {
                serde_json::from_value(data).map_err(|error| error.to_string())
            }
            _ => Err("data is not a record list".to_string()),
        }
    }
}

/// Only a literal `true` counts as success.
#[derive(Debug, Default, Deserialize)]
pub(super) struct MutationResponse {
    #[serde(default)]
    pub success: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl MutationResponse {
    pub fn succeeded(&self) -> bool {
        self.success == Some(Value::Bool(true))
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ConfigResponse {
    #[serde(default)]
    pub data: Option<SystemConfig>,
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
        Some(Value::Null) | None => false,
    }
}
