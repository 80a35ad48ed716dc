use crate::ids::RequestId;
use http::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// URI scheme a route may require. Requests always carry exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request as seen by the matcher and the dispatch pipeline.
///
/// This is the framework-internal request value: the server layer builds one
/// from a raw `may_minihttp` request, and embedders (or tests) construct one
/// directly with [`Request::new`] plus the `with_*` builders. Matched route
/// variables do NOT live here; they travel in an explicit
/// [`crate::handler::RequestContext`] threaded through every pipeline phase.
#[derive(Debug, Clone)]
pub struct Request {
    /// Correlation id for tracing, generated or parsed from `x-request-id`.
    pub id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path without the query string, always starting with `/`.
    pub path: String,
    /// Scheme the request arrived on.
    pub scheme: Scheme,
    /// Host the request was addressed to (from the `Host` header).
    pub host: String,
    /// HTTP headers (lowercase keys).
    pub headers: HashMap<String, String>,
    /// Cookies parsed from the Cookie header.
    pub cookies: HashMap<String, String>,
    /// Raw query string, without the leading `?` (may be empty).
    pub query_string: String,
    /// Parsed query string parameters.
    pub query_params: HashMap<String, String>,
    /// Request body parsed as JSON (if present).
    pub body: Option<Value>,
}

impl Request {
    /// Create a bare request for the given method and path.
    ///
    /// Defaults: scheme `http`, host `localhost`, no headers, no body.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            id: RequestId::new(),
            method,
            path: path.to_string(),
            scheme: Scheme::Http,
            host: "localhost".to_string(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            query_string: String::new(),
            query_params: HashMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Attach a raw query string; parses it into `query_params` as well.
    #[must_use]
    pub fn with_query(mut self, query: &str) -> Self {
        self.query_string = query.to_string();
        self.query_params = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Get a header by name (case-insensitive per RFC 7230).
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Get a query parameter by name.
    #[inline]
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Get a cookie by name.
    #[inline]
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}
