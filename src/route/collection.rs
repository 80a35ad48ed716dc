use crate::handler::{AfterMiddleware, BeforeMiddleware, Converter, Handler};
use crate::router::RouteTable;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::controller::Controller;
use super::core::Route;

/// One collection-wide configuration event.
///
/// Collection-level fluent calls are recorded as explicit deltas and
/// replayed onto the template route, every staged controller, and every
/// mounted sub-collection. New controllers pick deltas up implicitly by
/// cloning the already-updated template, which is what makes the ordering
/// of collection calls relative to `match_route` calls significant.
pub(crate) enum Delta {
    Assert(String, String),
    Value(String, Value),
    Convert(String, Converter),
    Method(String),
    RequireHttp,
    RequireHttps,
    Host(String),
    Before(BeforeMiddleware),
    After(AfterMiddleware),
}

enum StagedEntry {
    Controller(Arc<Controller>),
    Collection {
        prefix: String,
        collection: ControllerCollection,
    },
}

/// A staging area for routes.
///
/// Controllers accumulate here in declaration order until [`flush`] assigns
/// every unnamed controller a deterministic name, freezes them all, and
/// drains the collection into an immutable [`RouteTable`]. The collection
/// itself survives a flush and can stage (and flush) further batches.
///
/// [`flush`]: ControllerCollection::flush
#[derive(Default)]
pub struct ControllerCollection {
    template: Route,
    staged: Vec<StagedEntry>,
}

impl ControllerCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a pattern to a handler and stages the resulting controller.
    ///
    /// The new route starts as a clone of the collection's template, so all
    /// collection-wide configuration issued so far is already present on it.
    pub fn match_route(&mut self, pattern: &str, to: Handler) -> Arc<Controller> {
        let mut route = self.template.clone();
        route.set_pattern(pattern);
        route.set_handler(to);
        let controller = Arc::new(Controller::new(route));
        self.staged
            .push(StagedEntry::Controller(Arc::clone(&controller)));
        controller
    }

    /// Maps a GET request to a handler.
    pub fn get(&mut self, pattern: &str, to: Handler) -> Arc<Controller> {
        let controller = self.match_route(pattern, to);
        controller.method("GET");
        controller
    }

    /// Maps a POST request to a handler.
    pub fn post(&mut self, pattern: &str, to: Handler) -> Arc<Controller> {
        let controller = self.match_route(pattern, to);
        controller.method("POST");
        controller
    }

    /// Maps a PUT request to a handler.
    pub fn put(&mut self, pattern: &str, to: Handler) -> Arc<Controller> {
        let controller = self.match_route(pattern, to);
        controller.method("PUT");
        controller
    }

    /// Maps a DELETE request to a handler.
    pub fn delete(&mut self, pattern: &str, to: Handler) -> Arc<Controller> {
        let controller = self.match_route(pattern, to);
        controller.method("DELETE");
        controller
    }

    /// Sets a variable requirement on the template and every staged route.
    pub fn assert(&mut self, variable: &str, regexp: &str) -> &mut Self {
        self.apply(&Delta::Assert(variable.to_string(), regexp.to_string()));
        self
    }

    /// Sets a variable default on the template and every staged route.
    pub fn value(&mut self, variable: &str, default: Value) -> &mut Self {
        self.apply(&Delta::Value(variable.to_string(), default));
        self
    }

    /// Sets a variable converter on the template and every staged route.
    pub fn convert(&mut self, variable: &str, callback: Converter) -> &mut Self {
        self.apply(&Delta::Convert(variable.to_string(), callback));
        self
    }

    /// Sets the method requirement on the template and every staged route.
    pub fn method(&mut self, method: &str) -> &mut Self {
        self.apply(&Delta::Method(method.to_string()));
        self
    }

    /// Requires plain HTTP on the template and every staged route.
    pub fn require_http(&mut self) -> &mut Self {
        self.apply(&Delta::RequireHttp);
        self
    }

    /// Requires HTTPS on the template and every staged route.
    pub fn require_https(&mut self) -> &mut Self {
        self.apply(&Delta::RequireHttps);
        self
    }

    /// Sets the host requirement on the template and every staged route.
    pub fn host(&mut self, host: &str) -> &mut Self {
        self.apply(&Delta::Host(host.to_string()));
        self
    }

    /// Appends a before middleware to the template and every staged route.
    pub fn before(&mut self, callback: BeforeMiddleware) -> &mut Self {
        self.apply(&Delta::Before(callback));
        self
    }

    /// Appends an after middleware to the template and every staged route.
    pub fn after(&mut self, callback: AfterMiddleware) -> &mut Self {
        self.apply(&Delta::After(callback));
        self
    }

    /// Mounts a sub-collection under a route prefix. The sub-collection is
    /// flushed together with this one and keeps receiving collection-wide
    /// configuration issued here after the mount.
    pub fn mount(&mut self, prefix: &str, collection: ControllerCollection) -> &mut Self {
        self.staged.push(StagedEntry::Collection {
            prefix: prefix.to_string(),
            collection,
        });
        self
    }

    /// Builds a fresh sub-collection with the given closure and mounts it.
    pub fn mount_with(
        &mut self,
        prefix: &str,
        configure: impl FnOnce(&mut ControllerCollection),
    ) -> &mut Self {
        let mut collection = ControllerCollection::new();
        configure(&mut collection);
        self.mount(prefix, collection)
    }

    /// Number of directly staged controllers and sub-collections.
    #[must_use]
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Persist and freeze staged controllers into an immutable route table.
    ///
    /// Controllers flush in declaration order; sub-collections flush in
    /// place under their concatenated prefix. Unnamed controllers get a
    /// generated name; generated-name collisions grow a `_` suffix until
    /// unique. The returned table is a snapshot: staging more routes (or
    /// mutating leftover controller handles) does not affect it.
    pub fn flush(&mut self, prefix: &str) -> RouteTable {
        let mut table = RouteTable::new();
        self.do_flush(&normalize_prefix(prefix), &mut table);
        info!(route_count = table.len(), "controller collection flushed");
        table
    }

    fn do_flush(&mut self, prefix: &str, table: &mut RouteTable) {
        for entry in self.staged.drain(..) {
            match entry {
                StagedEntry::Controller(controller) => {
                    controller.prefix_pattern(prefix);
                    let name = match controller.route_name() {
                        Some(name) => name,
                        None => {
                            let mut name = controller.generate_route_name("");
                            while table.get(&name).is_some() {
                                name.push('_');
                            }
                            controller.set_route_name(&name);
                            name
                        }
                    };
                    let route = controller.route();
                    debug!(route_name = %name, pattern = route.pattern(), "route flushed");
                    table.add(&name, route);
                    controller.freeze();
                }
                StagedEntry::Collection {
                    prefix: sub_prefix,
                    mut collection,
                } => {
                    let combined = format!("{}{}", prefix, normalize_prefix(&sub_prefix));
                    collection.do_flush(&combined, table);
                }
            }
        }
    }

    fn apply(&mut self, delta: &Delta) {
        self.template.apply(delta);
        for entry in &mut self.staged {
            match entry {
                StagedEntry::Controller(controller) => controller.apply(delta),
                StagedEntry::Collection { collection, .. } => collection.apply(delta),
            }
        }
    }
}

/// Normalize a mount prefix: empty stays empty, anything else becomes
/// `/`-prefixed with surrounding slashes and whitespace trimmed.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
