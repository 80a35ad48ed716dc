use crate::errors::FrozenControllerError;
use crate::handler::{AfterMiddleware, BeforeMiddleware, Converter};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

use super::collection::Delta;
use super::core::Route;

/// A mutable builder facade over one staged [`Route`].
///
/// Controllers are created by [`super::ControllerCollection::match_route`]
/// and shared: the collection keeps one handle for the flush, the caller
/// keeps another for fluent configuration. Flushing freezes the controller;
/// after that the route name can no longer be rebound.
#[derive(Debug)]
pub struct Controller {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    route: Route,
    route_name: Option<String>,
    frozen: bool,
}

impl Controller {
    pub(crate) fn new(route: Route) -> Self {
        Self {
            inner: Mutex::new(Inner {
                route,
                route_name: None,
                frozen: false,
            }),
        }
    }

    /// Sets the requirement for a route variable.
    pub fn assert(&self, variable: &str, regexp: &str) -> &Self {
        self.inner().route.assert(variable, regexp);
        self
    }

    /// Sets the default value for a route variable.
    pub fn value(&self, variable: &str, default: Value) -> &Self {
        self.inner().route.value(variable, default);
        self
    }

    /// Sets a converter for a route variable.
    pub fn convert(&self, variable: &str, callback: Converter) -> &Self {
        self.inner().route.convert(variable, callback);
        self
    }

    /// Sets the requirement for the HTTP method. Multiple methods can be
    /// supplied, delimited by a pipe character '|', eg. 'GET|POST'.
    pub fn method(&self, method: &str) -> &Self {
        self.inner().route.method(method);
        self
    }

    /// Sets the requirement of HTTP (no HTTPS) on this controller.
    pub fn require_http(&self) -> &Self {
        self.inner().route.require_http();
        self
    }

    /// Sets the requirement of HTTPS on this controller.
    pub fn require_https(&self) -> &Self {
        self.inner().route.require_https();
        self
    }

    /// Sets the host this controller's route is restricted to.
    pub fn host(&self, host: &str) -> &Self {
        self.inner().route.host(host);
        self
    }

    /// Appends a before middleware to the route.
    pub fn before(&self, callback: BeforeMiddleware) -> &Self {
        self.inner().route.before(callback);
        self
    }

    /// Appends an after middleware to the route.
    pub fn after(&self, callback: AfterMiddleware) -> &Self {
        self.inner().route.after(callback);
        self
    }

    /// Sets the match priority; higher matches first.
    pub fn priority(&self, priority: i32) -> &Self {
        self.inner().route.set_priority(priority);
        self
    }

    /// Sets the controller's route name.
    ///
    /// Fails once the controller is frozen, i.e. after the owning
    /// collection was flushed.
    pub fn bind(&self, route_name: &str) -> Result<&Self, FrozenControllerError> {
        let mut inner = self.inner();
        if inner.frozen {
            return Err(FrozenControllerError {
                attempted_name: route_name.to_string(),
            });
        }
        inner.route_name = Some(route_name.to_string());
        Ok(self)
    }

    #[must_use]
    pub fn route_name(&self) -> Option<String> {
        self.inner().route_name.clone()
    }

    /// Snapshot of the wrapped route.
    #[must_use]
    pub fn route(&self) -> Route {
        self.inner().route.clone()
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.inner().frozen
    }

    /// Freezes the controller. Idempotent.
    ///
    /// Once the controller is frozen, the route name can no longer change.
    pub(crate) fn freeze(&self) {
        self.inner().frozen = true;
    }

    pub(crate) fn apply(&self, delta: &Delta) {
        self.inner().route.apply(delta);
    }

    pub(crate) fn prefix_pattern(&self, prefix: &str) {
        self.inner().route.prefix_pattern(prefix);
    }

    pub(crate) fn set_route_name(&self, name: &str) {
        self.inner().route_name = Some(name.to_string());
    }

    /// Derive a deterministic route name from the prefix, method requirement
    /// and pattern: path separators, colons, pipes and dashes become
    /// underscores, anything outside `[a-zA-Z0-9_.]` is stripped.
    #[must_use]
    pub fn generate_route_name(&self, prefix: &str) -> String {
        let inner = self.inner();
        let method = inner.route.method_requirement().unwrap_or("");
        let raw = format!("{}{}{}", prefix, method, inner.route.pattern());
        raw.chars()
            .filter_map(|c| match c {
                '/' | ':' | '|' | '-' => Some('_'),
                c if c.is_ascii_alphanumeric() || c == '_' || c == '.' => Some(c),
                _ => None,
            })
            .collect()
    }

    // A poisoned lock means a panic mid-mutation; staging state is
    // unrecoverable at that point.
    #[allow(clippy::expect_used)]
    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("controller lock poisoned")
    }
}
