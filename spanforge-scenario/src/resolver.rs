use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use thiserror::Error;

use spanforge_core::AttributeValue;

use crate::model::AttrTemplate;
use crate::template::{Expr, Segment, Template, TemplateError};

/// User agents served by `{{random.user_agent}}`.
const USER_AGENTS: &[&str] = &[
    "curl/7.68.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.1 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 10; SM-G975F) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Mobile Safari/537.36",
];

/// Errors raised while resolving templates at emission time.
///
/// Any of these aborts the current trace only; the worker moves on to the
/// next one.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("parent attribute '{0}' is not set")]
    MissingParentAttribute(String),

    #[error("no exported context key in scope")]
    MissingContextKey,

    #[error("template did not resolve after {limit} iterations: '{value}'")]
    IterationLimit { limit: usize, value: String },
}

/// The layered lookup environment for one span's resolution pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct Env<'a> {
    /// Scenario-level vars, resolved once per trace.
    pub vars: Option<&'a BTreeMap<String, String>>,
    /// The immediate parent span's already-resolved attributes.
    pub parent_attributes: Option<&'a BTreeMap<String, AttributeValue>>,
    /// The current span's own resolved attributes (visible to its events).
    pub own_attributes: Option<&'a BTreeMap<String, AttributeValue>>,
    /// The resolved `export_context_as` key for the current span.
    pub context_key: Option<&'a str>,
}

impl<'a> Env<'a> {
    fn lookup_var(&self, name: &str) -> Option<String> {
        if let Some(vars) = self.vars {
            if let Some(v) = vars.get(name) {
                return Some(v.clone());
            }
        }
        self.own_attributes
            .and_then(|attrs| attrs.get(name))
            .map(AttributeValue::render)
    }
}

/// Interprets compiled templates against an [`Env`] and an RNG stream.
///
/// Resolution is iterative: an evaluated value may itself contain
/// `{{ ... }}` markers, in which case it is recompiled and evaluated again
/// until it is placeholder-free or the iteration bound is hit.
#[derive(Debug, Clone)]
pub struct ValueResolver {
    max_iterations: usize,
}

impl ValueResolver {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    /// Fully resolve a template to a placeholder-free string.
    pub fn resolve(
        &self,
        template: &Template,
        env: &Env<'_>,
        rng: &mut StdRng,
    ) -> Result<String, ResolveError> {
        let mut value = self.eval(template, env, rng)?;

        let mut iterations = 0;
        while value.contains("{{") {
            if iterations >= self.max_iterations {
                return Err(ResolveError::IterationLimit {
                    limit: self.max_iterations,
                    value,
                });
            }
            let recompiled = Template::compile(&value)?;
            let next = self.eval(&recompiled, env, rng)?;
            if next == value {
                // A value that re-evaluates to itself will never converge.
                return Err(ResolveError::IterationLimit {
                    limit: self.max_iterations,
                    value,
                });
            }
            value = next;
            iterations += 1;
        }

        Ok(value)
    }

    /// Resolve an attribute template, preserving non-string scalars.
    pub fn resolve_attr(
        &self,
        attr: &AttrTemplate,
        env: &Env<'_>,
        rng: &mut StdRng,
    ) -> Result<AttributeValue, ResolveError> {
        match attr {
            AttrTemplate::Text(t) => Ok(AttributeValue::String(self.resolve(t, env, rng)?)),
            AttrTemplate::Int(i) => Ok(AttributeValue::Int(*i)),
            AttrTemplate::Float(f) => Ok(AttributeValue::Float(*f)),
            AttrTemplate::Bool(b) => Ok(AttributeValue::Bool(*b)),
        }
    }

    /// Resolve scenario vars once for a new trace.
    ///
    /// Vars may reference each other regardless of declaration order, so
    /// resolution runs in passes: each pass resolves whatever it can and
    /// defers vars whose references are still missing. No forward progress
    /// with vars outstanding means a reference that will never exist.
    pub fn resolve_vars(
        &self,
        vars: &[(String, Template)],
        rng: &mut StdRng,
    ) -> Result<BTreeMap<String, String>, ResolveError> {
        let mut resolved: BTreeMap<String, String> = BTreeMap::new();
        let mut pending: Vec<&(String, Template)> = vars.iter().collect();

        while !pending.is_empty() {
            let mut deferred = Vec::new();
            let mut progressed = false;

            for entry in pending {
                let env = Env {
                    vars: Some(&resolved),
                    ..Env::default()
                };
                match self.resolve(&entry.1, &env, rng) {
                    Ok(value) => {
                        resolved.insert(entry.0.clone(), value);
                        progressed = true;
                    }
                    Err(ResolveError::UnknownVariable(_)) => deferred.push(entry),
                    Err(e) => return Err(e),
                }
            }

            if !progressed {
                let name = deferred
                    .first()
                    .map(|e| e.0.clone())
                    .unwrap_or_default();
                return Err(ResolveError::UnknownVariable(name));
            }
            pending = deferred;
        }

        Ok(resolved)
    }

    /// Single evaluation pass over a compiled template.
    fn eval(
        &self,
        template: &Template,
        env: &Env<'_>,
        rng: &mut StdRng,
    ) -> Result<String, ResolveError> {
        let mut out = String::new();
        for segment in template.segments() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Expr(expr) => out.push_str(&eval_expr(expr, env, rng)?),
            }
        }
        Ok(out)
    }
}

fn eval_expr(expr: &Expr, env: &Env<'_>, rng: &mut StdRng) -> Result<String, ResolveError> {
    match expr {
        Expr::RandomInt(lo, hi) => Ok(rng.gen_range(*lo..=*hi).to_string()),
        Expr::RandomFloat(lo, hi) => Ok(format!("{:.2}", rng.gen_range(*lo..=*hi))),
        Expr::RandomUuid => {
            let uuid = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
            Ok(uuid.to_string())
        }
        Expr::RandomIpv4 => Ok(format!(
            "{}.{}.{}.{}",
            rng.gen_range(1..=254),
            rng.gen_range(0..=255),
            rng.gen_range(0..=255),
            rng.gen_range(1..=254),
        )),
        Expr::RandomUserAgent => {
            let idx = rng.gen_range(0..USER_AGENTS.len());
            Ok(USER_AGENTS[idx].to_owned())
        }
        Expr::RandomChoice(choices) => {
            let idx = rng.gen_range(0..choices.len());
            Ok(choices[idx].clone())
        }
        Expr::TimeIso => Ok(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        Expr::TimeNow => Ok(Utc::now().timestamp().to_string()),
        Expr::ContextKey => env
            .context_key
            .map(str::to_owned)
            .ok_or(ResolveError::MissingContextKey),
        Expr::ParentAttribute(key) => env
            .parent_attributes
            .and_then(|attrs| attrs.get(key))
            .map(AttributeValue::render)
            .ok_or_else(|| ResolveError::MissingParentAttribute(key.clone())),
        Expr::Var(name) => env
            .lookup_var(name)
            .ok_or_else(|| ResolveError::UnknownVariable(name.clone())),
    }
}
