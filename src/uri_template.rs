//! RFC 6570 URI Templates
//!
//! Full level 4 expansion (all eight operators, prefix and explode
//! modifiers) plus a best-effort reverse match used to recognise which
//! variable values could have produced a given URI.
//!
//! Template variables are supplied as a `serde_json` object:
//! - strings, numbers and booleans are scalar values
//! - arrays are lists
//! - objects are associative arrays
//! - `null`, `[]` and `{}` are undefined and elided from the output

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Variable bindings for template expansion.
pub type TemplateParams = Map<String, Value>;

/// Everything except ALPHA / DIGIT / "-" / "." / "_" / "~"
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// UNRESERVED minus the RFC 3986 gen-delims and sub-delims
const RESERVED: &AsciiSet = &UNRESERVED
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'[')
    .remove(b']')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

const MAX_PREFIX: usize = 9999;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed expression starting at offset {0}")]
    Unclosed(usize),

    #[error("unexpected '}}' at offset {0}")]
    StrayClose(usize),

    #[error("empty expression at offset {0}")]
    EmptyExpression(usize),

    #[error("reserved operator '{op}' in expression at offset {offset}")]
    ReservedOperator { op: char, offset: usize },

    #[error("invalid variable name '{name}' in expression at offset {offset}")]
    InvalidVariable { name: String, offset: usize },

    #[error("invalid prefix length '{spec}' in expression at offset {offset}")]
    InvalidPrefix { spec: String, offset: usize },
}

/// A parsed URI Template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    source: String,
    parts: Vec<Part>,
    matcher: OnceLock<Option<Regex>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Expression {
    op: Operator,
    vars: Vec<VarSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct VarSpec {
    name: String,
    modifier: Modifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    None,
    Prefix(usize),
    Explode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Simple,
    Reserved,
    Fragment,
    Label,
    Path,
    PathParam,
    Query,
    QueryContinuation,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Reserved),
            '#' => Some(Self::Fragment),
            '.' => Some(Self::Label),
            '/' => Some(Self::Path),
            ';' => Some(Self::PathParam),
            '?' => Some(Self::Query),
            '&' => Some(Self::QueryContinuation),
            _ => None,
        }
    }

    fn first(self) -> &'static str {
        match self {
            Self::Simple | Self::Reserved => "",
            Self::Fragment => "#",
            Self::Label => ".",
            Self::Path => "/",
            Self::PathParam => ";",
            Self::Query => "?",
            Self::QueryContinuation => "&",
        }
    }

    fn separator(self) -> &'static str {
        match self {
            Self::Simple | Self::Reserved | Self::Fragment => ",",
            Self::Label => ".",
            Self::Path => "/",
            Self::PathParam => ";",
            Self::Query | Self::QueryContinuation => "&",
        }
    }

    fn named(self) -> bool {
        matches!(self, Self::PathParam | Self::Query | Self::QueryContinuation)
    }

    fn if_empty(self) -> &'static str {
        match self {
            Self::Query | Self::QueryContinuation => "=",
            _ => "",
        }
    }

    fn allow_reserved(self) -> bool {
        matches!(self, Self::Reserved | Self::Fragment)
    }
}

/// A variable value after classification.
enum Resolved<'a> {
    Scalar(String),
    List(Vec<String>),
    Assoc(Vec<(&'a str, String)>),
}

impl UriTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        let mut pos = 0;

        while pos < source.len() {
            let rest = &source[pos..];
            let Some(idx) = rest.find(['{', '}']) else {
                parts.push(Part::Literal(rest.to_string()));
                break;
            };
            if idx > 0 {
                parts.push(Part::Literal(rest[..idx].to_string()));
            }

            let at = pos + idx;
            if rest.as_bytes()[idx] == b'}' {
                return Err(TemplateError::StrayClose(at));
            }
            let close = source[at + 1..]
                .find('}')
                .ok_or(TemplateError::Unclosed(at))?;
            let body = &source[at + 1..at + 1 + close];
            parts.push(Part::Expression(Expression::parse(body, at)?));
            pos = at + close + 2;
        }

        Ok(Self {
            source: source.to_string(),
            parts,
            matcher: OnceLock::new(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of every variable referenced, in template order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.var_specs().map(|var| var.name.as_str())
    }

    fn var_specs(&self) -> impl Iterator<Item = &VarSpec> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Literal(_) => None,
                Part::Expression(expr) => Some(expr.vars.iter()),
            })
            .flatten()
    }

    pub fn has_expressions(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, Part::Expression(_)))
    }

    pub fn expand(&self, params: &TemplateParams) -> String {
        let mut out = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                Part::Literal(literal) => encode_into(&mut out, literal, true),
                Part::Expression(expr) => expr.expand_into(&mut out, params),
            }
        }
        out
    }

    /// Reverse match: the variable values that expand this template to `uri`.
    ///
    /// Each variable is captured as a single decoded string; explode and
    /// list structure are not reconstructed. Variables absent from the URI
    /// are absent from the result.
    pub fn extract(&self, uri: &str) -> Option<BTreeMap<String, String>> {
        let matcher = self.matcher.get_or_init(|| self.build_matcher()).as_ref()?;
        let captures = matcher.captures(uri)?;

        let values = self
            .var_specs()
            .enumerate()
            .filter_map(|(idx, var)| {
                let raw = captures.get(idx + 1)?.as_str();
                let decoded = percent_decode_str(raw).decode_utf8_lossy().into_owned();
                Some((var.name.clone(), decoded))
            })
            .collect();
        Some(values)
    }

    fn build_matcher(&self) -> Option<Regex> {
        let mut pattern = String::from("^");
        for part in &self.parts {
            match part {
                Part::Literal(literal) => {
                    let mut encoded = String::new();
                    encode_into(&mut encoded, literal, true);
                    pattern.push_str(&regex::escape(&encoded));
                }
                Part::Expression(expr) => expr.push_pattern(&mut pattern),
            }
        }
        pattern.push('$');
        Regex::new(&pattern).ok()
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for UriTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for UriTemplate {}

impl std::str::FromStr for UriTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Expression {
    fn parse(body: &str, offset: usize) -> Result<Self, TemplateError> {
        let Some(first) = body.chars().next() else {
            return Err(TemplateError::EmptyExpression(offset));
        };

        let (op, list) = match Operator::from_char(first) {
            Some(op) => (op, &body[first.len_utf8()..]),
            None if matches!(first, '=' | ',' | '!' | '@' | '|') => {
                return Err(TemplateError::ReservedOperator { op: first, offset });
            }
            None => (Operator::Simple, body),
        };
        if list.is_empty() {
            return Err(TemplateError::EmptyExpression(offset));
        }

        let vars = list
            .split(',')
            .map(|spec| VarSpec::parse(spec, offset))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { op, vars })
    }

    fn expand_into(&self, out: &mut String, params: &TemplateParams) {
        let op = self.op;
        let reserved = op.allow_reserved();
        let mut first = true;

        for var in &self.vars {
            let Some(value) = resolve(params.get(&var.name)) else {
                continue;
            };
            out.push_str(if first { op.first() } else { op.separator() });
            first = false;

            match value {
                Resolved::Scalar(s) => {
                    let s = match var.modifier {
                        Modifier::Prefix(n) => truncate_chars(&s, n),
                        _ => s.as_str(),
                    };
                    if op.named() {
                        out.push_str(&var.name);
                        if s.is_empty() {
                            out.push_str(op.if_empty());
                            continue;
                        }
                        out.push('=');
                    }
                    encode_into(out, s, reserved);
                }
                Resolved::List(items) if var.modifier == Modifier::Explode => {
                    for (idx, item) in items.iter().enumerate() {
                        if idx > 0 {
                            out.push_str(op.separator());
                        }
                        if op.named() {
                            out.push_str(&var.name);
                            if item.is_empty() {
                                out.push_str(op.if_empty());
                                continue;
                            }
                            out.push('=');
                        }
                        encode_into(out, item, reserved);
                    }
                }
                Resolved::List(items) => {
                    if op.named() {
                        out.push_str(&var.name);
                        out.push('=');
                    }
                    for (idx, item) in items.iter().enumerate() {
                        if idx > 0 {
                            out.push(',');
                        }
                        encode_into(out, item, reserved);
                    }
                }
                Resolved::Assoc(pairs) if var.modifier == Modifier::Explode => {
                    for (idx, (key, value)) in pairs.iter().enumerate() {
                        if idx > 0 {
                            out.push_str(op.separator());
                        }
                        encode_into(out, key, reserved);
                        if op.named() && value.is_empty() {
                            out.push_str(op.if_empty());
                            continue;
                        }
                        out.push('=');
                        encode_into(out, value, reserved);
                    }
                }
                Resolved::Assoc(pairs) => {
                    if op.named() {
                        out.push_str(&var.name);
                        out.push('=');
                    }
                    for (idx, (key, value)) in pairs.iter().enumerate() {
                        if idx > 0 {
                            out.push(',');
                        }
                        encode_into(out, key, reserved);
                        out.push(',');
                        encode_into(out, value, reserved);
                    }
                }
            }
        }
    }

    fn push_pattern(&self, pattern: &mut String) {
        let op = self.op;
        let value = if op.allow_reserved() {
            ".*?"
        } else {
            "[A-Za-z0-9._~%-]*?"
        };

        for (idx, var) in self.vars.iter().enumerate() {
            let lead = if idx == 0 || op.first() == op.separator() {
                regex::escape(op.first())
            } else {
                format!(
                    "(?:{}|{})",
                    regex::escape(op.first()),
                    regex::escape(op.separator())
                )
            };
            if op.named() {
                pattern.push_str(&format!(
                    "(?:{lead}{}(?:=({value}))?)?",
                    regex::escape(&var.name)
                ));
            } else {
                pattern.push_str(&format!("(?:{lead}({value}))?"));
            }
        }
    }
}

impl VarSpec {
    fn parse(spec: &str, offset: usize) -> Result<Self, TemplateError> {
        let (name, modifier) = if let Some(name) = spec.strip_suffix('*') {
            (name, Modifier::Explode)
        } else if let Some((name, len)) = spec.split_once(':') {
            let max_len = len
                .bytes()
                .all(|b| b.is_ascii_digit())
                .then(|| len.parse::<usize>().ok())
                .flatten()
                .filter(|n| (1..=MAX_PREFIX).contains(n))
                .ok_or_else(|| TemplateError::InvalidPrefix {
                    spec: spec.to_string(),
                    offset,
                })?;
            (name, Modifier::Prefix(max_len))
        } else {
            (spec, Modifier::None)
        };

        if !is_valid_varname(name) {
            return Err(TemplateError::InvalidVariable {
                name: name.to_string(),
                offset,
            });
        }
        Ok(Self {
            name: name.to_string(),
            modifier,
        })
    }
}

fn is_valid_varname(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.ends_with('.')
        && !name.contains("..")
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'%'))
}

fn resolve(value: Option<&Value>) -> Option<Resolved<'_>> {
    match value? {
        Value::Null => None,
        Value::Array(items) => {
            let items: Vec<String> = items.iter().filter_map(scalar_string).collect();
            (!items.is_empty()).then_some(Resolved::List(items))
        }
        Value::Object(map) => {
            let pairs: Vec<(&str, String)> = map
                .iter()
                .filter_map(|(k, v)| scalar_string(v).map(|v| (k.as_str(), v)))
                .collect();
            (!pairs.is_empty()).then_some(Resolved::Assoc(pairs))
        }
        other => scalar_string(other).map(Resolved::Scalar),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Percent-encode `value`; in reserved mode reserved characters and existing
/// pct-encoded triplets pass through untouched.
fn encode_into(out: &mut String, value: &str, allow_reserved: bool) {
    if !allow_reserved {
        out.extend(utf8_percent_encode(value, UNRESERVED));
        return;
    }

    let mut rest = value;
    while let Some(idx) = rest.find('%') {
        out.extend(utf8_percent_encode(&rest[..idx], RESERVED));
        match rest.get(idx..idx + 3) {
            Some(triplet) if triplet[1..].bytes().all(|b| b.is_ascii_hexdigit()) => {
                out.push_str(triplet);
                rest = &rest[idx + 3..];
            }
            _ => {
                out.push_str("%25");
                rest = &rest[idx + 1..];
            }
        }
    }
    out.extend(utf8_percent_encode(rest, RESERVED));
}
