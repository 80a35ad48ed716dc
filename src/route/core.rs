use crate::errors::RoutingError;
use crate::handler::{AfterMiddleware, BeforeMiddleware, Converter, Handler};
use crate::request::Scheme;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::collection::Delta;

/// A single pattern-to-handler binding with its match constraints, defaults,
/// method/scheme/host requirements, priority, route-scoped middlewares and
/// converters.
///
/// Routes are mutable while staged (behind a [`super::Controller`]); the
/// copies placed into a [`crate::router::RouteTable`] at flush time are
/// never touched again, so their compiled pattern cache is stable across
/// requests.
#[derive(Clone, Default)]
pub struct Route {
    pattern: String,
    handler: Option<Handler>,
    constraints: BTreeMap<String, String>,
    defaults: BTreeMap<String, Value>,
    /// Pipe-delimited method list, stored verbatim and split at match time.
    methods: Option<String>,
    scheme: Option<Scheme>,
    host: Option<String>,
    priority: i32,
    before_middlewares: Vec<BeforeMiddleware>,
    after_middlewares: Vec<AfterMiddleware>,
    converters: BTreeMap<String, Converter>,
    compiled: OnceCell<CompiledPattern>,
}

impl Route {
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            ..<Self as Default>::default()
        }
    }

    /// Sets the requirement for a route variable.
    ///
    /// No check is made that `variable` occurs in the pattern; a constraint
    /// on an absent variable is inert.
    pub fn assert(&mut self, variable: &str, regexp: &str) -> &mut Self {
        self.constraints
            .insert(variable.to_string(), regexp.to_string());
        self.touch();
        self
    }

    /// Sets the default value for a route variable. A trailing pattern
    /// variable with a default becomes optional.
    pub fn value(&mut self, variable: &str, default: Value) -> &mut Self {
        self.defaults.insert(variable.to_string(), default);
        self.touch();
        self
    }

    /// Sets a converter for a route variable. A second call for the same
    /// variable replaces the first; converters do not chain.
    pub fn convert(&mut self, variable: &str, callback: Converter) -> &mut Self {
        self.converters.insert(variable.to_string(), callback);
        self
    }

    /// Sets the requirement for the HTTP method. Multiple methods can be
    /// supplied, delimited by a pipe character '|', eg. 'GET|POST'.
    pub fn method(&mut self, method: &str) -> &mut Self {
        self.methods = Some(method.to_string());
        self
    }

    /// Sets the requirement of HTTP (no HTTPS) on this route.
    pub fn require_http(&mut self) -> &mut Self {
        self.scheme = Some(Scheme::Http);
        self
    }

    /// Sets the requirement of HTTPS on this route.
    pub fn require_https(&mut self) -> &mut Self {
        self.scheme = Some(Scheme::Https);
        self
    }

    /// Sets the host this route is restricted to.
    pub fn host(&mut self, host: &str) -> &mut Self {
        self.host = Some(host.to_string());
        self
    }

    /// Appends a callback to run when the route is matched, just before the
    /// route handler.
    pub fn before(&mut self, callback: BeforeMiddleware) -> &mut Self {
        self.before_middlewares.push(callback);
        self
    }

    /// Appends a callback to run after the route handler.
    pub fn after(&mut self, callback: AfterMiddleware) -> &mut Self {
        self.after_middlewares.push(callback);
        self
    }

    /// Match-ordering weight; higher sorts first. Ties keep table insertion
    /// order.
    pub fn set_priority(&mut self, priority: i32) -> &mut Self {
        self.priority = priority;
        self
    }

    pub(crate) fn set_pattern(&mut self, pattern: &str) {
        self.pattern = pattern.to_string();
        self.touch();
    }

    pub(crate) fn set_handler(&mut self, handler: Handler) {
        self.handler = Some(handler);
    }

    /// Prepend a mount prefix to the pattern. Used by flush only.
    pub(crate) fn prefix_pattern(&mut self, prefix: &str) {
        if prefix.is_empty() {
            return;
        }
        self.pattern = format!("{}{}", prefix, self.pattern);
        self.touch();
    }

    /// Replay one collection-wide configuration delta onto this route.
    pub(crate) fn apply(&mut self, delta: &Delta) {
        match delta {
            Delta::Assert(variable, regexp) => {
                self.assert(variable, regexp);
            }
            Delta::Value(variable, default) => {
                self.value(variable, default.clone());
            }
            Delta::Convert(variable, callback) => {
                self.convert(variable, Converter::clone(callback));
            }
            Delta::Method(method) => {
                self.method(method);
            }
            Delta::RequireHttp => {
                self.require_http();
            }
            Delta::RequireHttps => {
                self.require_https();
            }
            Delta::Host(host) => {
                self.host(host);
            }
            Delta::Before(callback) => {
                self.before(BeforeMiddleware::clone(callback));
            }
            Delta::After(callback) => {
                self.after(AfterMiddleware::clone(callback));
            }
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    #[must_use]
    pub fn constraint(&self, variable: &str) -> Option<&str> {
        self.constraints.get(variable).map(String::as_str)
    }

    #[must_use]
    pub fn default(&self, variable: &str) -> Option<&Value> {
        self.defaults.get(variable)
    }

    pub fn defaults(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.defaults.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn method_requirement(&self) -> Option<&str> {
        self.methods.as_deref()
    }

    #[must_use]
    pub fn scheme_requirement(&self) -> Option<Scheme> {
        self.scheme
    }

    #[must_use]
    pub fn host_requirement(&self) -> Option<&str> {
        self.host.as_deref()
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    #[must_use]
    pub fn before_middlewares(&self) -> &[BeforeMiddleware] {
        &self.before_middlewares
    }

    #[must_use]
    pub fn after_middlewares(&self) -> &[AfterMiddleware] {
        &self.after_middlewares
    }

    pub fn converters(&self) -> impl Iterator<Item = (&str, &Converter)> {
        self.converters.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The compiled pattern, built on first use and cached until the next
    /// pattern/constraint/default mutation. A malformed constraint regex
    /// surfaces here as a fatal configuration error.
    pub(crate) fn compiled(&self) -> Result<&CompiledPattern, RoutingError> {
        self.compiled
            .get_or_try_init(|| CompiledPattern::compile(&self.pattern, &self.constraints, &self.defaults))
    }

    fn touch(&mut self) {
        self.compiled = OnceCell::new();
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("methods", &self.methods)
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("priority", &self.priority)
            .field("constraints", &self.constraints)
            .field("defaults", &self.defaults)
            .field("before_middlewares", &self.before_middlewares.len())
            .field("after_middlewares", &self.after_middlewares.len())
            .field("converters", &self.converters.len())
            .finish()
    }
}

/// A route pattern compiled down to a single anchored regex plus the ordered
/// list of variable names it captures.
#[derive(Debug, Clone)]
pub(crate) struct CompiledPattern {
    pub regex: Regex,
    pub variables: Vec<String>,
}

impl CompiledPattern {
    /// Compile `pattern` into an anchored regex.
    ///
    /// `{name}` placeholders become named capture groups using the
    /// constraint regex for `name` (default `[^/]+`). A run of trailing
    /// whole-segment variables that all carry defaults compiles to nested
    /// optional groups, so `/posts/{id}` with a default for `id` matches
    /// both `/posts` and `/posts/7`.
    pub fn compile(
        pattern: &str,
        constraints: &BTreeMap<String, String>,
        defaults: &BTreeMap<String, Value>,
    ) -> Result<Self, RoutingError> {
        if pattern.is_empty() || pattern == "/" {
            let regex = Regex::new("^/$").map_err(|err| RoutingError::InvalidConstraint {
                pattern: pattern.to_string(),
                source: err,
            })?;
            return Ok(Self {
                regex,
                variables: Vec::new(),
            });
        }

        let trimmed = pattern.strip_prefix('/').unwrap_or(pattern);
        let segments: Vec<&str> = trimmed.split('/').collect();

        // A trailing run of single-variable segments with defaults is optional.
        let mut optional_from = segments.len();
        for i in (0..segments.len()).rev() {
            match sole_variable(segments[i]) {
                Some(var) if defaults.contains_key(var) => optional_from = i,
                _ => break,
            }
        }

        let mut source = String::with_capacity(pattern.len() + 16);
        source.push('^');
        let mut variables = Vec::new();
        let mut open_groups = 0usize;

        for (i, segment) in segments.iter().enumerate() {
            let body = segment_source(segment, constraints, &mut variables);
            if i >= optional_from {
                if i == 0 {
                    // Leading slash stays mandatory so the bare root still matches.
                    source.push_str("/(?:");
                } else {
                    source.push_str("(?:/");
                }
                source.push_str(&body);
                open_groups += 1;
            } else {
                source.push('/');
                source.push_str(&body);
            }
        }
        for _ in 0..open_groups {
            source.push_str(")?");
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|err| RoutingError::InvalidConstraint {
            pattern: pattern.to_string(),
            source: err,
        })?;
        Ok(Self { regex, variables })
    }
}

/// The variable name if `segment` is exactly one `{name}` placeholder.
fn sole_variable(segment: &str) -> Option<&str> {
    let inner = segment.strip_prefix('{')?.strip_suffix('}')?;
    if inner.is_empty() || inner.contains('{') || inner.contains('}') {
        return None;
    }
    Some(inner)
}

/// Regex source for one path segment: literals escaped, `{name}`
/// placeholders turned into named capture groups.
fn segment_source(
    segment: &str,
    constraints: &BTreeMap<String, String>,
    variables: &mut Vec<String>,
) -> String {
    let mut out = String::new();
    let mut rest = segment;
    while let Some(open) = rest.find('{') {
        out.push_str(&regex::escape(&rest[..open]));
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let variable = &after[..close];
                let constraint = constraints
                    .get(variable)
                    .map(String::as_str)
                    .unwrap_or("[^/]+");
                out.push_str("(?P<");
                out.push_str(variable);
                out.push('>');
                out.push_str(constraint);
                out.push(')');
                variables.push(variable.to_string());
                rest = &after[close + 1..];
            }
            None => {
                // Unbalanced brace: treat the remainder as a literal.
                out.push_str(&regex::escape(&rest[open..]));
                rest = "";
            }
        }
    }
    out.push_str(&regex::escape(rest));
    out
}
