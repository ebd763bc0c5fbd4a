//! The frozen scenario model handed to the trace engine.
//!
//! Produced by the loader after validation; all templates are compiled,
//! all defaults are filled, and the tree is immutable from here on.

use spanforge_core::SpanKind;

use crate::template::Template;

/// The full validated scenario library.
#[derive(Debug, Clone)]
pub struct ScenarioSet {
    pub schema_version: i64,
    /// Known service names from the base document. Open-set: scenarios may
    /// name services outside this list.
    pub services: Vec<String>,
    pub scenarios: Vec<Scenario>,
}

impl ScenarioSet {
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }
}

/// A named trace template.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    /// Relative selection weight, `>= 1`.
    pub weight: u32,
    /// Trace-level vars, sorted by name. Resolved once per trace.
    pub vars: Vec<(String, Template)>,
    pub root: SpanNode,
}

/// One node of a scenario's span tree.
#[derive(Debug, Clone)]
pub struct SpanNode {
    pub service: String,
    pub operation: Template,
    pub kind: SpanKind,
    /// Inclusive sampling range for the span's own duration, milliseconds.
    pub delay_ms: (u64, u64),
    /// Attribute templates, sorted by key.
    pub attributes: Vec<(String, AttrTemplate)>,
    pub events: Vec<EventSpec>,
    pub error_conditions: Vec<ErrorCondition>,
    pub export_context_as: Option<Template>,
    /// Glob pattern (`*` matches any substring) against the context store.
    pub link_from_context: Option<String>,
    pub calls: Vec<SpanNode>,
}

/// An event to emit between span start and end.
#[derive(Debug, Clone)]
pub struct EventSpec {
    pub name: Template,
    pub attributes: Vec<(String, AttrTemplate)>,
    /// Explicit offset from span start; evenly spaced when absent.
    pub offset_ms: Option<u64>,
}

/// A declared, simulated failure outcome.
#[derive(Debug, Clone)]
pub struct ErrorCondition {
    /// Percentage in `[0, 100]`.
    pub probability: u8,
    pub error_type: String,
    pub message: String,
}

/// An attribute value template. Non-string scalars pass through untouched.
#[derive(Debug, Clone)]
pub enum AttrTemplate {
    Text(Template),
    Int(i64),
    Float(f64),
    Bool(bool),
}
