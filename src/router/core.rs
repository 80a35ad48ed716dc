use crate::errors::RoutingError;
use crate::handler::ParamMap;
use crate::request::Request;
use crate::route::Route;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::table::RouteTable;

/// Outcome of matching one request against the route table.
///
/// Only `Matched` and `Redirect` carry something to dispatch; `NotFound` and
/// `MethodNotAllowed` are ordinary results here and are translated into
/// 404/405 errors by the pipeline, not thrown by the matcher.
#[derive(Clone)]
pub enum MatchResult {
    /// A route matched; variables are resolved and converted.
    Matched {
        name: String,
        route: Arc<Route>,
        params: ParamMap,
    },
    /// The path only matches with a trailing slash appended; redirect there.
    Redirect { url: String, status: u16 },
    /// Some route matched the path structurally but rejected the method.
    /// `allow` is the union of permitted methods across those routes.
    MethodNotAllowed { allow: Vec<String> },
    /// Nothing matched.
    NotFound,
}

impl std::fmt::Debug for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchResult::Matched { name, params, .. } => f
                .debug_struct("Matched")
                .field("name", name)
                .field("params", params)
                .finish(),
            MatchResult::Redirect { url, status } => f
                .debug_struct("Redirect")
                .field("url", url)
                .field("status", status)
                .finish(),
            MatchResult::MethodNotAllowed { allow } => f
                .debug_struct("MethodNotAllowed")
                .field("allow", allow)
                .finish(),
            MatchResult::NotFound => f.write_str("NotFound"),
        }
    }
}

/// Matches requests against a flushed [`RouteTable`].
///
/// Stateless per request: candidates are tried in priority order, method and
/// scheme requirements are checked after the pattern, and a path that fails
/// only for want of a trailing slash is answered with a 301 redirect instead
/// of a miss.
pub struct UrlMatcher<'t> {
    routes: &'t RouteTable,
}

impl<'t> UrlMatcher<'t> {
    #[must_use]
    pub fn new(routes: &'t RouteTable) -> Self {
        Self { routes }
    }

    /// Match a request's method, scheme, host and path against the table.
    ///
    /// Fails only on configuration problems (a malformed constraint regex)
    /// or a converter rejection; every ordinary miss is a [`MatchResult`]
    /// variant.
    pub fn match_request(&self, request: &Request) -> Result<MatchResult, RoutingError> {
        debug!(
            method = %request.method,
            path = %request.path,
            route_count = self.routes.len(),
            "route match attempt"
        );

        let mut allow: Vec<String> = Vec::new();

        if let Some((name, route, params)) = self.match_pass(request, &request.path, &mut allow)? {
            let params = apply_converters(&name, &route, params, request)?;
            info!(
                method = %request.method,
                path = %request.path,
                route_name = %name,
                pattern = route.pattern(),
                "route matched"
            );
            return Ok(MatchResult::Matched {
                name,
                route,
                params,
            });
        }

        // One-level trailing-slash retry: a full match for `path + "/"`
        // becomes a 301 instead of a 404.
        if !request.path.ends_with('/') {
            let retried = format!("{}/", request.path);
            if self.match_pass(request, &retried, &mut allow)?.is_some() {
                let mut url = retried;
                if !request.query_string.is_empty() {
                    url.push('?');
                    url.push_str(&request.query_string);
                }
                info!(path = %request.path, target = %url, "trailing slash redirect");
                return Ok(MatchResult::Redirect { url, status: 301 });
            }
        }

        if !allow.is_empty() {
            warn!(method = %request.method, path = %request.path, allow = ?allow, "method not allowed");
            return Ok(MatchResult::MethodNotAllowed { allow });
        }

        warn!(method = %request.method, path = %request.path, "no route matched");
        Ok(MatchResult::NotFound)
    }

    /// One matching pass over the table for a given path. Structural
    /// matches that fail only on the method accumulate into `allow`.
    fn match_pass(
        &self,
        request: &Request,
        path: &str,
        allow: &mut Vec<String>,
    ) -> Result<Option<(String, Arc<Route>, ParamMap)>, RoutingError> {
        for (name, route) in self.routes.iter_prioritized() {
            let compiled = route.compiled()?;
            let Some(captures) = compiled.regex.captures(path) else {
                continue;
            };

            if let Some(host) = route.host_requirement() {
                if !host.eq_ignore_ascii_case(&request.host) {
                    continue;
                }
            }

            if let Some(methods) = route.method_requirement() {
                if !methods.split('|').any(|m| m == request.method.as_str()) {
                    for m in methods.split('|') {
                        if !allow.iter().any(|a| a == m) {
                            allow.push(m.to_string());
                        }
                    }
                    continue;
                }
            }

            if let Some(scheme) = route.scheme_requirement() {
                if scheme != request.scheme {
                    continue;
                }
            }

            let mut params = ParamMap::new();
            for (variable, default) in route.defaults() {
                params.insert(variable, default.clone());
            }
            for variable in &compiled.variables {
                if let Some(capture) = captures.name(variable) {
                    params.insert(variable.clone(), Value::String(capture.as_str().to_string()));
                }
            }

            return Ok(Some((name.to_string(), Arc::clone(route), params)));
        }
        Ok(None)
    }
}

/// Run each route converter over its variable's resolved value. A variable
/// that was never supplied converts from `Value::Null`.
fn apply_converters(
    name: &str,
    route: &Route,
    mut params: ParamMap,
    request: &Request,
) -> Result<ParamMap, RoutingError> {
    for (variable, convert) in route.converters() {
        let raw = params.get(variable).cloned().unwrap_or(Value::Null);
        let converted = convert(raw, request).map_err(|source| RoutingError::Converter {
            route: name.to_string(),
            variable: variable.to_string(),
            source,
        })?;
        params.insert(variable, converted);
    }
    Ok(params)
}
