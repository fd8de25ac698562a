//! Invocation envelope: the flat-parameter request shape produced by the
//! conversational front-end, and the single-text-body response it expects.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

/// One named string parameter of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

/// An inbound function invocation. All parameters arrive as strings; embedded
/// structures are JSON-encoded inside a parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation {
    pub action_group: String,
    pub function: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// Note attached when a malformed parameter was replaced by a default rather
/// than failing the invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedInput {
    pub parameter: String,
    pub reason: String,
}

impl Invocation {
    /// Parameters flattened name -> value; the last occurrence of a repeated
    /// name wins.
    pub fn parameter_map(&self) -> HashMap<&str, &str> {
        self.parameters
            .iter()
            .map(|p| (p.name.as_str(), p.value.as_str()))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .rev()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Parse a parameter holding embedded JSON. A missing or malformed value
    /// degrades to an empty object with a logged note instead of failing.
    pub fn embedded_json(&self, name: &str) -> (Value, Option<DegradedInput>) {
        let Some(raw) = self.get(name) else {
            let note = DegradedInput {
                parameter: name.to_string(),
                reason: "parameter missing".to_string(),
            };
            warn!(parameter = name, "embedded JSON parameter missing, using empty object");
            return (json!({}), Some(note));
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => (value, None),
            Err(e) => {
                let note = DegradedInput {
                    parameter: name.to_string(),
                    reason: e.to_string(),
                };
                warn!(
                    parameter = name,
                    error = %e,
                    "embedded JSON parameter malformed, using empty object"
                );
                (json!({}), Some(note))
            }
        }
    }
}

/// Response carrying one JSON document rendered into a text body.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub action_group: String,
    pub function: String,
    pub body: String,
}

impl ResponseEnvelope {
    pub fn new(invocation: &Invocation, payload: &Value) -> Self {
        Self {
            action_group: invocation.action_group.clone(),
            function: invocation.function.clone(),
            body: payload.to_string(),
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "messageVersion": "1.0",
            "response": {
                "actionGroup": self.action_group,
                "function": self.function,
                "functionResponse": {
                    "responseBody": {
                        "TEXT": { "body": self.body }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(parameters: Vec<Parameter>) -> Invocation {
        Invocation {
            action_group: "dmta-orchestration".to_string(),
            function: "design_cycle".to_string(),
            parameters,
        }
    }

    fn param(name: &str, value: &str) -> Parameter {
        Parameter {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn deserializes_wire_shape() {
        let raw = r#"{
            "actionGroup": "dmta-orchestration",
            "function": "plan_project",
            "parameters": [
                {"name": "target_molecule", "value": "Cablivi"}
            ]
        }"#;
        let inv: Invocation = serde_json::from_str(raw).unwrap();
        assert_eq!(inv.function, "plan_project");
        assert_eq!(inv.get("target_molecule"), Some("Cablivi"));
        assert_eq!(inv.get("missing"), None);
    }

    #[test]
    fn repeated_parameter_last_wins() {
        let inv = invocation(vec![param("cycle", "1"), param("cycle", "2")]);
        assert_eq!(inv.get("cycle"), Some("2"));
        assert_eq!(inv.parameter_map()["cycle"], "2");
    }

    #[test]
    fn embedded_json_parses_well_formed_value() {
        let inv = invocation(vec![param("model_state", r#"{"uncertainty": 0.3}"#)]);
        let (value, note) = inv.embedded_json("model_state");
        assert_eq!(value["uncertainty"], 0.3);
        assert!(note.is_none());
    }

    #[test]
    fn embedded_json_degrades_on_malformed_value() {
        let inv = invocation(vec![param("model_state", "{not json")]);
        let (value, note) = inv.embedded_json("model_state");
        assert_eq!(value, serde_json::json!({}));
        let note = note.unwrap();
        assert_eq!(note.parameter, "model_state");

        let (value, note) = inv.embedded_json("absent");
        assert_eq!(value, serde_json::json!({}));
        assert_eq!(note.unwrap().reason, "parameter missing");
    }

    #[test]
    fn response_envelope_wraps_single_text_body() {
        let inv = invocation(vec![]);
        let payload = serde_json::json!({"status": "ok", "cycle": 1});
        let envelope = ResponseEnvelope::new(&inv, &payload);
        let value = envelope.to_value();

        assert_eq!(value["messageVersion"], "1.0");
        assert_eq!(value["response"]["actionGroup"], "dmta-orchestration");
        let body = value["response"]["functionResponse"]["responseBody"]["TEXT"]["body"]
            .as_str()
            .unwrap();
        let parsed: Value = serde_json::from_str(body).unwrap();
        assert_eq!(parsed["cycle"], 1);
    }
}
