use serde_json::Value;

/// An HTTP response produced by handlers, middlewares, filters, or error
/// handlers.
///
/// The body is a [`serde_json::Value`]: `Value::String` is written out as
/// plain text, anything else is serialized as JSON. String handler returns
/// are coerced through the `From` impls below.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// Response headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Value,
}

impl Response {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Value::Null,
        }
    }

    /// A `200 OK` plain-text response.
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: Value::String(body.into()),
        }
    }

    /// A JSON response with the given status.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut resp = Self::new(status);
        resp.body = body;
        resp
    }

    /// A JSON error body of the shape `{ "error": message }`.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// A redirect to `url`. Conventionally 301 for the matcher's
    /// trailing-slash synthesis and 302 for application-level redirects.
    #[must_use]
    pub fn redirect(url: &str, status: u16) -> Self {
        let mut resp = Self::new(status);
        resp.headers.push(("Location".to_string(), url.to_string()));
        resp
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value.to_string());
        self
    }

    /// Get a header by name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header, replacing any existing value for the name.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value));
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(200)
    }
}

impl From<String> for Response {
    fn from(body: String) -> Self {
        Response::text(body)
    }
}

impl From<&str> for Response {
    fn from(body: &str) -> Self {
        Response::text(body)
    }
}
