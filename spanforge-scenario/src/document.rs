//! Raw scenario documents as they appear on disk.
//!
//! These structs mirror the YAML surface exactly; every semantic rule
//! (weights, delay ranges, probabilities, template syntax) is enforced by
//! the loader, which turns them into the frozen [`model`](crate::model)
//! types or a list of validation issues.

use std::collections::BTreeMap;

use serde::Deserialize;

/// The shared `_base.yaml` document.
#[derive(Debug, Deserialize)]
pub struct BaseDocument {
    pub schema_version: Option<i64>,
    #[serde(default)]
    pub services: Vec<String>,
}

/// A scenario document: either one scenario or a list of scenarios.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ScenarioDocument {
    Many(Vec<RawScenario>),
    One(RawScenario),
}

impl ScenarioDocument {
    pub fn into_scenarios(self) -> Vec<RawScenario> {
        match self {
            Self::Many(list) => list,
            Self::One(one) => vec![one],
        }
    }
}

/// A scenario as declared in YAML.
#[derive(Debug, Deserialize)]
pub struct RawScenario {
    pub name: Option<String>,
    pub weight: Option<i64>,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    pub root_span: Option<RawSpanNode>,
}

/// A span node as declared in YAML. Recursive via `calls`.
#[derive(Debug, Deserialize)]
pub struct RawSpanNode {
    pub service: Option<String>,
    pub operation: Option<String>,
    pub kind: Option<String>,
    pub delay_ms: Option<Vec<i64>>,
    #[serde(default)]
    pub attributes: BTreeMap<String, RawValue>,
    #[serde(default)]
    pub events: Vec<RawEvent>,
    #[serde(default)]
    pub error_conditions: Vec<RawErrorCondition>,
    pub export_context_as: Option<String>,
    pub link_from_context: Option<String>,
    #[serde(default)]
    pub calls: Vec<RawSpanNode>,
}

/// An event as declared in YAML.
#[derive(Debug, Deserialize)]
pub struct RawEvent {
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, RawValue>,
    pub offset_ms: Option<i64>,
}

/// An error condition as declared in YAML.
#[derive(Debug, Deserialize)]
pub struct RawErrorCondition {
    pub probability: Option<i64>,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub message: Option<String>,
}

/// A scalar attribute value; strings may carry template markers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}
