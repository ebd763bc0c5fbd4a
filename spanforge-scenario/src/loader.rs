//! Directory loader and validator for scenario documents.
//!
//! Loading is all-or-nothing: every document is parsed and checked, all
//! problems are collected into structured issues, and emission never starts
//! unless the whole library is clean.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use spanforge_core::SpanKind;

use crate::document::{
    BaseDocument, RawErrorCondition, RawEvent, RawScenario, RawSpanNode, RawValue,
    ScenarioDocument,
};
use crate::model::{
    AttrTemplate, ErrorCondition, EventSpec, Scenario, ScenarioSet, SpanNode,
};
use crate::template::Template;

/// Schema versions this loader understands.
pub const SUPPORTED_SCHEMA_VERSIONS: &[i64] = &[1];
/// The version new documents should declare.
pub const CURRENT_SCHEMA_VERSION: i64 = 1;
/// The shared base document name.
pub const BASE_FILE: &str = "_base.yaml";

/// One structured validation problem: where it is and what is wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// File name plus field path, e.g. `orders.yaml: scenarios[0].root_span.delay_ms`.
    pub location: String,
    pub reason: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.reason)
    }
}

/// Errors from loading a scenario directory.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("scenarios directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("scenarios path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("base document not found: {0}")]
    MissingBase(PathBuf),

    #[error("error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} validation error(s) in scenario documents", .0.len())]
    Invalid(Vec<ValidationIssue>),
}

/// Load, validate, and freeze every scenario document under `dir`.
///
/// Files are visited in sorted name order so the resulting scenario order
/// (and therefore weighted selection under a fixed seed) is deterministic.
pub fn load_scenarios(dir: &Path) -> Result<ScenarioSet, LoadError> {
    if !dir.exists() {
        return Err(LoadError::MissingDirectory(dir.to_owned()));
    }
    if !dir.is_dir() {
        return Err(LoadError::NotADirectory(dir.to_owned()));
    }

    let base_path = dir.join(BASE_FILE);
    if !base_path.exists() {
        return Err(LoadError::MissingBase(base_path));
    }

    let mut issues = Vec::new();

    let (schema_version, services) = load_base(&base_path, &mut issues)?;

    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|source| LoadError::Io {
            path: dir.to_owned(),
            source,
        })?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("yaml" | "yml")
            ) && p.file_name().and_then(|n| n.to_str()) != Some(BASE_FILE)
        })
        .collect();
    files.sort();

    info!(count = files.len(), directory = %dir.display(), "loading scenario files");

    let mut scenarios = Vec::new();
    for file in &files {
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("<non-utf8>")
            .to_owned();
        let contents = fs::read_to_string(file).map_err(|source| LoadError::Io {
            path: file.clone(),
            source,
        })?;

        let document: ScenarioDocument = match serde_yaml_ng::from_str(&contents) {
            Ok(doc) => doc,
            Err(e) => {
                issues.push(ValidationIssue {
                    location: file_name,
                    reason: format!("yaml parse error: {e}"),
                });
                continue;
            }
        };

        for (index, raw) in document.into_scenarios().into_iter().enumerate() {
            let location = format!("{file_name}: scenarios[{index}]");
            if let Some(scenario) = compile_scenario(&location, raw, &services, &mut issues) {
                scenarios.push(scenario);
            }
        }
    }

    if scenarios.is_empty() && issues.is_empty() {
        issues.push(ValidationIssue {
            location: dir.display().to_string(),
            reason: "no scenarios found in any scenario file".to_owned(),
        });
    }

    if !issues.is_empty() {
        return Err(LoadError::Invalid(issues));
    }

    info!(
        scenarios = scenarios.len(),
        services = services.len(),
        "scenario library validated"
    );

    Ok(ScenarioSet {
        schema_version,
        services,
        scenarios,
    })
}

fn load_base(
    path: &Path,
    issues: &mut Vec<ValidationIssue>,
) -> Result<(i64, Vec<String>), LoadError> {
    let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_owned(),
        source,
    })?;

    let base: BaseDocument = match serde_yaml_ng::from_str(&contents) {
        Ok(base) => base,
        Err(e) => {
            issues.push(ValidationIssue {
                location: BASE_FILE.to_owned(),
                reason: format!("yaml parse error: {e}"),
            });
            return Ok((CURRENT_SCHEMA_VERSION, Vec::new()));
        }
    };

    let version = match base.schema_version {
        None => {
            issues.push(ValidationIssue {
                location: BASE_FILE.to_owned(),
                reason: format!(
                    "missing required 'schema_version' field; current version is {CURRENT_SCHEMA_VERSION}"
                ),
            });
            CURRENT_SCHEMA_VERSION
        }
        Some(v) if !SUPPORTED_SCHEMA_VERSIONS.contains(&v) => {
            issues.push(ValidationIssue {
                location: BASE_FILE.to_owned(),
                reason: format!(
                    "unsupported schema version {v}; supported: {SUPPORTED_SCHEMA_VERSIONS:?}"
                ),
            });
            v
        }
        Some(v) => {
            if v != CURRENT_SCHEMA_VERSION {
                warn!(
                    version = v,
                    current = CURRENT_SCHEMA_VERSION,
                    "base document uses an older schema version"
                );
            }
            v
        }
    };

    if base.services.is_empty() {
        issues.push(ValidationIssue {
            location: BASE_FILE.to_owned(),
            reason: "'services' must be a non-empty list".to_owned(),
        });
    }

    Ok((version, base.services))
}

fn compile_scenario(
    location: &str,
    raw: RawScenario,
    services: &[String],
    issues: &mut Vec<ValidationIssue>,
) -> Option<Scenario> {
    let before = issues.len();

    let name = match raw.name {
        Some(name) if !name.is_empty() => name,
        _ => {
            issues.push(ValidationIssue {
                location: location.to_owned(),
                reason: "missing required 'name' field".to_owned(),
            });
            String::new()
        }
    };

    let weight = match raw.weight {
        None => 1,
        Some(w) if w >= 1 => w as u32,
        Some(w) => {
            issues.push(ValidationIssue {
                location: location.to_owned(),
                reason: format!("'weight' must be >= 1, got {w}"),
            });
            1
        }
    };

    let mut vars = Vec::with_capacity(raw.vars.len());
    for (key, value) in raw.vars {
        let template = compile_template_field(
            &format!("{location}.vars.{key}"),
            &value,
            issues,
        );
        vars.push((key, template));
    }

    let root = match raw.root_span {
        Some(root) => compile_span(&format!("{location}.root_span"), root, services, issues),
        None => {
            issues.push(ValidationIssue {
                location: location.to_owned(),
                reason: "missing required 'root_span' field".to_owned(),
            });
            return None;
        }
    };

    if issues.len() > before {
        return None;
    }

    Some(Scenario {
        name,
        weight,
        vars,
        root,
    })
}

fn compile_span(
    location: &str,
    raw: RawSpanNode,
    services: &[String],
    issues: &mut Vec<ValidationIssue>,
) -> SpanNode {
    let service = match raw.service {
        Some(s) if !s.is_empty() => s,
        _ => {
            issues.push(ValidationIssue {
                location: location.to_owned(),
                reason: "missing required 'service' field".to_owned(),
            });
            String::new()
        }
    };
    if !service.is_empty() && !services.iter().any(|s| s == &service) {
        // Services are open-set; unknown names are a warning, not an error.
        warn!(service = %service, location, "service not listed in base document");
    }

    let operation = match raw.operation {
        Some(op) => compile_template_field(&format!("{location}.operation"), &op, issues),
        None => {
            issues.push(ValidationIssue {
                location: location.to_owned(),
                reason: "missing required 'operation' field".to_owned(),
            });
            Template::literal("")
        }
    };

    let kind = match raw.kind.as_deref() {
        None => SpanKind::default(),
        Some(s) => parse_kind(s).unwrap_or_else(|| {
            issues.push(ValidationIssue {
                location: format!("{location}.kind"),
                reason: format!(
                    "'{s}' is not one of INTERNAL, SERVER, CLIENT, PRODUCER, CONSUMER"
                ),
            });
            SpanKind::default()
        }),
    };

    let delay_ms = compile_delay(&format!("{location}.delay_ms"), raw.delay_ms, issues);

    let attributes = compile_attributes(location, raw.attributes, issues);

    let mut events = Vec::with_capacity(raw.events.len());
    for (i, event) in raw.events.into_iter().enumerate() {
        events.push(compile_event(
            &format!("{location}.events[{i}]"),
            event,
            issues,
        ));
    }

    let error_conditions =
        compile_error_conditions(location, raw.error_conditions, issues);

    let export_context_as = raw.export_context_as.map(|s| {
        compile_template_field(&format!("{location}.export_context_as"), &s, issues)
    });

    let link_from_context = match raw.link_from_context {
        Some(pattern) if pattern.is_empty() => {
            issues.push(ValidationIssue {
                location: format!("{location}.link_from_context"),
                reason: "pattern must be non-empty".to_owned(),
            });
            None
        }
        other => other,
    };

    let mut calls = Vec::with_capacity(raw.calls.len());
    for (i, child) in raw.calls.into_iter().enumerate() {
        calls.push(compile_span(
            &format!("{location}.calls[{i}]"),
            child,
            services,
            issues,
        ));
    }

    SpanNode {
        service,
        operation,
        kind,
        delay_ms,
        attributes,
        events,
        error_conditions,
        export_context_as,
        link_from_context,
        calls,
    }
}

fn compile_delay(
    location: &str,
    raw: Option<Vec<i64>>,
    issues: &mut Vec<ValidationIssue>,
) -> (u64, u64) {
    let Some(delay) = raw else {
        return (0, 0);
    };

    if delay.len() != 2 {
        issues.push(ValidationIssue {
            location: location.to_owned(),
            reason: format!(
                "must be a two-element list [min_ms, max_ms], got {} element(s)",
                delay.len()
            ),
        });
        return (0, 0);
    }
    if delay[0] < 0 || delay[1] < 0 {
        issues.push(ValidationIssue {
            location: location.to_owned(),
            reason: "values must be non-negative".to_owned(),
        });
        return (0, 0);
    }
    if delay[0] > delay[1] {
        issues.push(ValidationIssue {
            location: location.to_owned(),
            reason: format!("min {} exceeds max {}", delay[0], delay[1]),
        });
        return (0, 0);
    }
    (delay[0] as u64, delay[1] as u64)
}

fn compile_attributes(
    location: &str,
    raw: std::collections::BTreeMap<String, RawValue>,
    issues: &mut Vec<ValidationIssue>,
) -> Vec<(String, AttrTemplate)> {
    let mut attributes = Vec::with_capacity(raw.len());
    for (key, value) in raw {
        let attr = match value {
            RawValue::String(s) => AttrTemplate::Text(compile_template_field(
                &format!("{location}.attributes.{key}"),
                &s,
                issues,
            )),
            RawValue::Int(i) => AttrTemplate::Int(i),
            RawValue::Float(f) => AttrTemplate::Float(f),
            RawValue::Bool(b) => AttrTemplate::Bool(b),
        };
        attributes.push((key, attr));
    }
    attributes
}

fn compile_event(
    location: &str,
    raw: RawEvent,
    issues: &mut Vec<ValidationIssue>,
) -> EventSpec {
    let name = match raw.name {
        Some(name) => compile_template_field(&format!("{location}.name"), &name, issues),
        None => {
            issues.push(ValidationIssue {
                location: location.to_owned(),
                reason: "missing required 'name' field".to_owned(),
            });
            Template::literal("")
        }
    };

    let offset_ms = match raw.offset_ms {
        Some(off) if off < 0 => {
            issues.push(ValidationIssue {
                location: format!("{location}.offset_ms"),
                reason: "must be non-negative".to_owned(),
            });
            None
        }
        Some(off) => Some(off as u64),
        None => None,
    };

    EventSpec {
        name,
        attributes: compile_attributes(location, raw.attributes, issues),
        offset_ms,
    }
}

fn compile_error_conditions(
    location: &str,
    raw: Vec<RawErrorCondition>,
    issues: &mut Vec<ValidationIssue>,
) -> Vec<ErrorCondition> {
    let mut conditions = Vec::with_capacity(raw.len());
    let mut total: i64 = 0;

    for (i, cond) in raw.into_iter().enumerate() {
        let cond_location = format!("{location}.error_conditions[{i}]");

        let probability = match cond.probability.unwrap_or(0) {
            p @ 0..=100 => {
                total += p;
                p as u8
            }
            p => {
                issues.push(ValidationIssue {
                    location: cond_location.clone(),
                    reason: format!("'probability' must be between 0 and 100, got {p}"),
                });
                0
            }
        };

        let error_type = match cond.error_type {
            Some(t) => t,
            None => {
                issues.push(ValidationIssue {
                    location: cond_location.clone(),
                    reason: "missing required 'type' field".to_owned(),
                });
                String::new()
            }
        };

        let message = match cond.message {
            Some(m) => m,
            None => {
                issues.push(ValidationIssue {
                    location: cond_location.clone(),
                    reason: "missing required 'message' field".to_owned(),
                });
                String::new()
            }
        };

        conditions.push(ErrorCondition {
            probability,
            error_type,
            message,
        });
    }

    // With one roulette roll per span, probabilities over 100 in total
    // would make later conditions unreachable or skew earlier ones.
    if total > 100 {
        issues.push(ValidationIssue {
            location: format!("{location}.error_conditions"),
            reason: format!("probabilities sum to {total}, must not exceed 100"),
        });
    }

    conditions
}

fn compile_template_field(
    location: &str,
    value: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Template {
    match Template::compile(value) {
        Ok(template) => template,
        Err(e) => {
            issues.push(ValidationIssue {
                location: location.to_owned(),
                reason: e.to_string(),
            });
            Template::literal("")
        }
    }
}

fn parse_kind(s: &str) -> Option<SpanKind> {
    match s {
        "INTERNAL" => Some(SpanKind::Internal),
        "SERVER" => Some(SpanKind::Server),
        "CLIENT" => Some(SpanKind::Client),
        "PRODUCER" => Some(SpanKind::Producer),
        "CONSUMER" => Some(SpanKind::Consumer),
        _ => None,
    }
}
