//! Handler, middleware and converter vocabulary for the dispatch pipeline.
//!
//! Everything a route can invoke is an explicit `Result`-returning callback
//! over a typed [`RequestContext`]; there is no ambient request state and no
//! "anything callable returning anything". A before middleware's outcome is
//! a tagged value: `Ok(None)` continues the chain, `Ok(Some(response))`
//! short-circuits it, `Err` enters the error phase.

use crate::errors::BoxError;
use crate::ids::RequestId;
use crate::request::Request;
use crate::response::Response;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum number of route variables before heap allocation.
/// Most routes have ≤4 path variables (e.g., /users/{id}/posts/{post_id}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Resolved route variables for one matched request.
///
/// Stack-allocated ordered pairs for routes with ≤8 variables; lookups use
/// "last write wins" semantics so a capture always shadows a default.
#[derive(Debug, Clone, Default)]
pub struct ParamMap(SmallVec<[(String, Value); MAX_INLINE_PARAMS]>);

impl ParamMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a variable value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().rfind(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Get a variable as a string slice, if it is a string value.
    #[inline]
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(k, _)| k == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Per-request context handed to route handlers and route middlewares.
///
/// Carries the request, the name the matched route was flushed under, and
/// the resolved (converted) route variables. Threaded explicitly through
/// every phase; nothing here is global.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request: Request,
    /// Name of the matched route in the flushed table.
    pub route_name: String,
    /// Resolved route variables (captures merged over defaults, converted).
    pub params: ParamMap,
}

impl RequestContext {
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Get a route variable as a string slice, if it is a string value.
    #[inline]
    #[must_use]
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get_str(name)
    }

    #[inline]
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request.id
    }
}

/// A route handler: produces the response for a matched request.
pub type Handler = Arc<dyn Fn(&RequestContext) -> Result<Response, BoxError> + Send + Sync>;

/// A route-scoped before middleware. Returning `Ok(Some(response))`
/// short-circuits past the handler straight to the after middlewares.
pub type BeforeMiddleware =
    Arc<dyn Fn(&RequestContext) -> Result<Option<Response>, BoxError> + Send + Sync>;

/// A route-scoped after middleware. Receives the current response and may
/// mutate or replace it in place.
pub type AfterMiddleware =
    Arc<dyn Fn(&RequestContext, &mut Response) -> Result<(), BoxError> + Send + Sync>;

/// A post-match variable transformer. Runs on the raw matched value (or
/// `Value::Null` when the variable was not supplied) before the handler.
pub type Converter = Arc<dyn Fn(Value, &Request) -> Result<Value, BoxError> + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&RequestContext) -> Result<Response, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a route [`BeforeMiddleware`].
pub fn before_middleware<F>(f: F) -> BeforeMiddleware
where
    F: Fn(&RequestContext) -> Result<Option<Response>, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a route [`AfterMiddleware`].
pub fn after_middleware<F>(f: F) -> AfterMiddleware
where
    F: Fn(&RequestContext, &mut Response) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`Converter`].
pub fn converter<F>(f: F) -> Converter
where
    F: Fn(Value, &Request) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_map_insert_replaces() {
        let mut params = ParamMap::new();
        params.insert("id", json!("default"));
        params.insert("id", json!("42"));
        assert_eq!(params.len(), 1);
        assert_eq!(params.get_str("id"), Some("42"));
    }

    #[test]
    fn test_param_map_from_iter() {
        let params: ParamMap = vec![
            ("a".to_string(), json!(1)),
            ("b".to_string(), json!(2)),
            ("a".to_string(), json!(3)),
        ]
        .into_iter()
        .collect();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("a"), Some(&json!(3)));
    }
}
