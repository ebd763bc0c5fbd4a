use thiserror::Error;

/// Errors raised while compiling a `{{ ... }}` template string.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unclosed template expression: missing '}}'")]
    Unclosed,

    #[error("empty template expression: '{{{{ }}}}'")]
    Empty,

    #[error("unknown template function: {0}")]
    UnknownFunction(String),

    #[error("invalid arguments for {func}: {reason}")]
    BadArguments { func: String, reason: String },

    #[error("invalid reference: {0}")]
    BadReference(String),
}

/// A single expression inside `{{ ... }}` markers.
///
/// Templates are parsed once at load time; emission interprets the AST
/// against a per-trace environment instead of re-scanning strings.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `random.int(lo, hi)` — uniform inclusive integer.
    RandomInt(i64, i64),
    /// `random.float(lo, hi)` — uniform float, rendered with two decimals.
    RandomFloat(f64, f64),
    /// `random.uuid` — a fresh UUID per evaluation.
    RandomUuid,
    /// `random.ipv4` — a synthetic dotted quad.
    RandomIpv4,
    /// `random.user_agent` — one of a small fixed table.
    RandomUserAgent,
    /// `random.choice([a, b, c])` — uniform pick from a literal list.
    RandomChoice(Vec<String>),
    /// `time.iso` — current wall time, ISO 8601.
    TimeIso,
    /// `time.now` — current wall time, whole seconds since the epoch.
    TimeNow,
    /// `context_key` — the key this span exported via `export_context_as`.
    ContextKey,
    /// `parent.attributes.<key>` — a resolved attribute of the parent span.
    /// The key may itself contain dots (`user.id`).
    ParentAttribute(String),
    /// `<name>` — lookup in the trace-local variable environment.
    Var(String),
}

/// One piece of a compiled template: literal text or an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Expr(Expr),
}

/// A compiled template string.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Compile a string that may contain `{{ ... }}` interpolation markers.
    pub fn compile(input: &str) -> Result<Self, TemplateError> {
        // Fast path: no markers at all.
        if !input.contains("{{") {
            return Ok(Self {
                segments: vec![Segment::Literal(input.to_owned())],
            });
        }

        let mut segments = Vec::new();
        let mut remaining = input;

        while let Some(start) = remaining.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(remaining[..start].to_owned()));
            }

            let after_open = &remaining[start + 2..];
            let end = after_open.find("}}").ok_or(TemplateError::Unclosed)?;

            let inner = after_open[..end].trim();
            if inner.is_empty() {
                return Err(TemplateError::Empty);
            }

            segments.push(Segment::Expr(parse_expr(inner)?));
            remaining = &after_open[end + 2..];
        }

        if !remaining.is_empty() {
            segments.push(Segment::Literal(remaining.to_owned()));
        }

        Ok(Self { segments })
    }

    /// Build a template holding a single literal, bypassing the parser.
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Literal(text.into())],
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// `true` if evaluation can produce anything other than fixed text.
    pub fn has_expressions(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Expr(_)))
    }
}

/// Parse the inside of a `{{ ... }}` marker.
fn parse_expr(inner: &str) -> Result<Expr, TemplateError> {
    match inner {
        "random.uuid" => return Ok(Expr::RandomUuid),
        "random.ipv4" => return Ok(Expr::RandomIpv4),
        "random.user_agent" => return Ok(Expr::RandomUserAgent),
        "time.iso" => return Ok(Expr::TimeIso),
        "time.now" => return Ok(Expr::TimeNow),
        "context_key" => return Ok(Expr::ContextKey),
        _ => {}
    }

    if let Some(args) = call_args(inner, "random.int") {
        let (lo, hi) = parse_int_pair("random.int", args)?;
        return Ok(Expr::RandomInt(lo, hi));
    }
    if let Some(args) = call_args(inner, "random.float") {
        let (lo, hi) = parse_float_pair("random.float", args)?;
        return Ok(Expr::RandomFloat(lo, hi));
    }
    if let Some(args) = call_args(inner, "random.choice") {
        let choices = parse_list("random.choice", args)?;
        return Ok(Expr::RandomChoice(choices));
    }

    if let Some(key) = inner.strip_prefix("parent.attributes.") {
        if key.is_empty() {
            return Err(TemplateError::BadReference(inner.to_owned()));
        }
        return Ok(Expr::ParentAttribute(key.to_owned()));
    }

    // Anything else in the function namespaces is a typo, not a variable.
    if inner.starts_with("random.") || inner.starts_with("time.") {
        return Err(TemplateError::UnknownFunction(inner.to_owned()));
    }

    if inner
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        Ok(Expr::Var(inner.to_owned()))
    } else {
        Err(TemplateError::BadReference(inner.to_owned()))
    }
}

/// If `inner` is a call of `name(...)`, return the raw argument text.
fn call_args<'a>(inner: &'a str, name: &str) -> Option<&'a str> {
    let rest = inner.strip_prefix(name)?;
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('(')?;
    let rest = rest.strip_suffix(')')?;
    Some(rest)
}

fn parse_int_pair(func: &str, args: &str) -> Result<(i64, i64), TemplateError> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(TemplateError::BadArguments {
            func: func.to_owned(),
            reason: format!("expected two integers, got '{args}'"),
        });
    }
    let lo: i64 = parts[0].parse().map_err(|_| TemplateError::BadArguments {
        func: func.to_owned(),
        reason: format!("'{}' is not an integer", parts[0]),
    })?;
    let hi: i64 = parts[1].parse().map_err(|_| TemplateError::BadArguments {
        func: func.to_owned(),
        reason: format!("'{}' is not an integer", parts[1]),
    })?;
    if lo > hi {
        return Err(TemplateError::BadArguments {
            func: func.to_owned(),
            reason: format!("lower bound {lo} exceeds upper bound {hi}"),
        });
    }
    Ok((lo, hi))
}

fn parse_float_pair(func: &str, args: &str) -> Result<(f64, f64), TemplateError> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(TemplateError::BadArguments {
            func: func.to_owned(),
            reason: format!("expected two numbers, got '{args}'"),
        });
    }
    let lo: f64 = parts[0].parse().map_err(|_| TemplateError::BadArguments {
        func: func.to_owned(),
        reason: format!("'{}' is not a number", parts[0]),
    })?;
    let hi: f64 = parts[1].parse().map_err(|_| TemplateError::BadArguments {
        func: func.to_owned(),
        reason: format!("'{}' is not a number", parts[1]),
    })?;
    if lo > hi {
        return Err(TemplateError::BadArguments {
            func: func.to_owned(),
            reason: format!("lower bound {lo} exceeds upper bound {hi}"),
        });
    }
    Ok((lo, hi))
}

/// Parse a literal list `['a', 'b', 42]`. Elements are kept as strings;
/// quotes (single or double) are honoured so elements may contain commas.
fn parse_list(func: &str, args: &str) -> Result<Vec<String>, TemplateError> {
    let trimmed = args.trim();
    let body = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| TemplateError::BadArguments {
            func: func.to_owned(),
            reason: format!("expected a list literal, got '{args}'"),
        })?;

    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in body.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                ',' => {
                    items.push(current.trim().to_owned());
                    current.clear();
                }
                _ => current.push(c),
            },
        }
    }
    if quote.is_some() {
        return Err(TemplateError::BadArguments {
            func: func.to_owned(),
            reason: "unterminated quote in list literal".to_owned(),
        });
    }
    let last = current.trim();
    if !last.is_empty() {
        items.push(last.to_owned());
    }

    if items.is_empty() {
        return Err(TemplateError::BadArguments {
            func: func.to_owned(),
            reason: "choice list is empty".to_owned(),
        });
    }
    Ok(items)
}
