//! Workflow step records as stored in the vector index

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Payload key that scopes every record to one logical corpus.
pub const NAMESPACE_KEY: &str = "namespace";

/// Record identifier assigned by the vector index (integer or UUID string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(String),
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Num(n) => write!(f, "{n}"),
            PointId::Uuid(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for PointId {
    fn from(n: u64) -> Self {
        PointId::Num(n)
    }
}

impl From<&str> for PointId {
    fn from(s: &str) -> Self {
        PointId::Uuid(s.to_string())
    }
}

/// Attributes of one workflow step.
///
/// Only `namespace` is mandatory; every other attribute may be missing
/// from the stored payload and is modelled as present-or-absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepPayload {
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Free text ("15 minutes") or a bare number in the stored payload
    #[serde(
        default,
        deserialize_with = "text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_time: Option<String>,
    /// Identifiers of prerequisite steps, in stored order
    #[serde(
        default,
        deserialize_with = "identifier_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub dependencies: Option<Vec<String>>,
}

impl StepPayload {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn with_estimated_time(mut self, estimated_time: impl Into<String>) -> Self {
        self.estimated_time = Some(estimated_time.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = Some(dependencies.into_iter().map(Into::into).collect());
        self
    }
}

/// One retrieved record paired with its similarity score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: PointId,
    /// Higher is more similar; scale depends on the index's distance metric
    pub score: f32,
    pub payload: StepPayload,
}

fn scalar_to_text(value: Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(format!("expected string or number, found {other}")),
    }
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?.unwrap_or(Value::Null);
    scalar_to_text(value).map_err(de::Error::custom)
}

fn identifier_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(items) = Option::<Vec<Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        if let Some(id) = scalar_to_text(item).map_err(de::Error::custom)? {
            ids.push(id);
        }
    }
    Ok(Some(ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_with_all_attributes() {
        let payload: StepPayload = serde_json::from_value(json!({
            "namespace": "light-node",
            "name": "Install celestia-node",
            "description": "Build the binary from source.",
            "phase": "setup",
            "estimated_time": "10 minutes",
            "dependencies": ["install-go", "clone-repo"]
        }))
        .unwrap();

        assert_eq!(payload.namespace, "light-node");
        assert_eq!(payload.name.as_deref(), Some("Install celestia-node"));
        assert_eq!(payload.phase.as_deref(), Some("setup"));
        assert_eq!(
            payload.dependencies,
            Some(vec!["install-go".to_string(), "clone-repo".to_string()])
        );
    }

    #[test]
    fn test_payload_optional_attributes_absent() {
        let payload: StepPayload =
            serde_json::from_value(json!({ "namespace": "light-node" })).unwrap();
        assert_eq!(payload, StepPayload::new("light-node"));
    }

    #[test]
    fn test_payload_numeric_values_become_text() {
        let payload: StepPayload = serde_json::from_value(json!({
            "namespace": "validator",
            "estimated_time": 45,
            "dependencies": [3, "step-7", null]
        }))
        .unwrap();

        assert_eq!(payload.estimated_time.as_deref(), Some("45"));
        assert_eq!(
            payload.dependencies,
            Some(vec!["3".to_string(), "step-7".to_string()])
        );
    }

    #[test]
    fn test_payload_null_dependencies_is_absent() {
        let payload: StepPayload = serde_json::from_value(json!({
            "namespace": "validator",
            "dependencies": null,
            "estimated_time": null
        }))
        .unwrap();
        assert!(payload.dependencies.is_none());
        assert!(payload.estimated_time.is_none());
    }

    #[test]
    fn test_payload_requires_namespace() {
        let result = serde_json::from_value::<StepPayload>(json!({ "name": "orphan" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_point_id_accepts_integer_and_uuid() {
        let num: PointId = serde_json::from_value(json!(42)).unwrap();
        let uuid: PointId =
            serde_json::from_value(json!("5c56c793-69f3-4fbf-87e6-c4bf54c28c26")).unwrap();
        assert_eq!(num, PointId::Num(42));
        assert_eq!(uuid.to_string(), "5c56c793-69f3-4fbf-87e6-c4bf54c28c26");
    }
}
