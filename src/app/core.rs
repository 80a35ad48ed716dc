use crate::errors::{BoxError, HttpError, RoutingError};
use crate::handler::{Handler, RequestContext};
use crate::request::Request;
use crate::response::Response;
use crate::route::{Controller, ControllerCollection, Route};
use crate::router::{MatchResult, RouteTable, UrlMatcher};
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Filter priority that runs before everything registered at the default 0.
pub const EARLY_EVENT: i32 = 512;
/// Filter priority that runs after everything registered at the default 0.
pub const LATE_EVENT: i32 = -512;

/// An application-wide before filter. Runs after matching, before any route
/// middleware; returning `Ok(Some(response))` skips the route entirely.
pub type BeforeFilter = Arc<dyn Fn(&Request) -> Result<Option<Response>, BoxError> + Send + Sync>;

/// An application-wide after filter. May mutate or replace the response.
pub type AfterFilter = Arc<dyn Fn(&Request, &mut Response) -> Result<(), BoxError> + Send + Sync>;

/// A finish filter, run by [`Application::terminate`] once the response has
/// been sent. Failures here are not caught by the pipeline.
pub type FinishFilter = Arc<dyn Fn(&Request, &Response) -> Result<(), BoxError> + Send + Sync>;

/// An error handler. Handlers run in registration order until one returns
/// `Some`; type-specific handlers are registered via
/// [`Application::error_for`] and simply return `None` for errors they do
/// not recognize.
pub type ErrorHandler = Arc<dyn Fn(&BoxError, &Request) -> Option<Response> + Send + Sync>;

/// Something that can contribute a controller collection to an application,
/// typically a reusable feature module mounted under a prefix.
pub trait ControllerProvider {
    fn connect(&self, app: &mut Application) -> ControllerCollection;
}

struct Prioritized<T> {
    priority: i32,
    seq: usize,
    callback: T,
}

/// References to a filter chain in execution order: priority descending,
/// registration order within equal priorities.
fn in_priority_order<T>(filters: &[Prioritized<T>]) -> Vec<&Prioritized<T>> {
    let mut ordered: Vec<&Prioritized<T>> = filters.iter().collect();
    ordered.sort_by_key(|f| (Reverse(f.priority), f.seq));
    ordered
}

/// The framework entry point: a staging surface for routes and filters, and
/// the per-request dispatch pipeline over the flushed table.
///
/// All staging (`get`/`post`/`before`/`error`/`mount`/...) happens during
/// bootstrap, single-writer. After [`flush`] the route table is read-only,
/// so [`dispatch`] takes `&self` and can serve any number of concurrent
/// requests; [`handle`] is the flush-then-dispatch convenience for
/// embedders and tests.
///
/// [`flush`]: Application::flush
/// [`dispatch`]: Application::dispatch
/// [`handle`]: Application::handle
#[derive(Default)]
pub struct Application {
    controllers: ControllerCollection,
    routes: RouteTable,
    before_filters: Vec<Prioritized<BeforeFilter>>,
    after_filters: Vec<Prioritized<AfterFilter>>,
    finish_filters: Vec<Prioritized<FinishFilter>>,
    error_handlers: Vec<ErrorHandler>,
    seq: usize,
}

impl Application {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a pattern to a handler for any method.
    pub fn match_route(&mut self, pattern: &str, to: Handler) -> Arc<Controller> {
        self.controllers.match_route(pattern, to)
    }

    /// Maps a GET request to a handler.
    pub fn get(&mut self, pattern: &str, to: Handler) -> Arc<Controller> {
        self.controllers.get(pattern, to)
    }

    /// Maps a POST request to a handler.
    pub fn post(&mut self, pattern: &str, to: Handler) -> Arc<Controller> {
        self.controllers.post(pattern, to)
    }

    /// Maps a PUT request to a handler.
    pub fn put(&mut self, pattern: &str, to: Handler) -> Arc<Controller> {
        self.controllers.put(pattern, to)
    }

    /// Maps a DELETE request to a handler.
    pub fn delete(&mut self, pattern: &str, to: Handler) -> Arc<Controller> {
        self.controllers.delete(pattern, to)
    }

    /// The root controller collection, for collection-wide configuration.
    pub fn controllers(&mut self) -> &mut ControllerCollection {
        &mut self.controllers
    }

    /// Mounts a controller collection under the given route prefix.
    pub fn mount(&mut self, prefix: &str, collection: ControllerCollection) -> &mut Self {
        self.controllers.mount(prefix, collection);
        self
    }

    /// Connects a provider and mounts its collection under the prefix.
    pub fn mount_provider(
        &mut self,
        prefix: &str,
        provider: &dyn ControllerProvider,
    ) -> &mut Self {
        let collection = provider.connect(self);
        self.mount(prefix, collection)
    }

    /// Registers a before filter at the default priority.
    pub fn before<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&Request) -> Result<Option<Response>, BoxError> + Send + Sync + 'static,
    {
        self.before_priority(callback, 0)
    }

    /// Registers a before filter. Higher priority runs earlier.
    pub fn before_priority<F>(&mut self, callback: F, priority: i32) -> &mut Self
    where
        F: Fn(&Request) -> Result<Option<Response>, BoxError> + Send + Sync + 'static,
    {
        let seq = self.next_seq();
        self.before_filters.push(Prioritized {
            priority,
            seq,
            callback: Arc::new(callback),
        });
        self
    }

    /// Registers an after filter at the default priority.
    pub fn after<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.after_priority(callback, 0)
    }

    /// Registers an after filter. Higher priority runs earlier.
    pub fn after_priority<F>(&mut self, callback: F, priority: i32) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let seq = self.next_seq();
        self.after_filters.push(Prioritized {
            priority,
            seq,
            callback: Arc::new(callback),
        });
        self
    }

    /// Registers a finish filter at the default priority. Finish filters
    /// run from [`Application::terminate`], after the response was sent.
    pub fn finish<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&Request, &Response) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.finish_priority(callback, 0)
    }

    /// Registers a finish filter. Higher priority runs earlier.
    pub fn finish_priority<F>(&mut self, callback: F, priority: i32) -> &mut Self
    where
        F: Fn(&Request, &Response) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let seq = self.next_seq();
        self.finish_filters.push(Prioritized {
            priority,
            seq,
            callback: Arc::new(callback),
        });
        self
    }

    /// Registers an error handler.
    ///
    /// When a request ends in an error, all handlers are called in
    /// registration order until one returns `Some(response)`. Register
    /// logging handlers before output handlers. If no handler responds, the
    /// error is rethrown to the embedder; there is no built-in catch-all.
    pub fn error<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&BoxError, &Request) -> Option<Response> + Send + Sync + 'static,
    {
        self.error_handlers.push(Arc::new(callback));
        self
    }

    /// Registers an error handler for one error type.
    ///
    /// The handler only sees errors that downcast to `E`; everything else
    /// falls through to later handlers.
    pub fn error_for<E, F>(&mut self, callback: F) -> &mut Self
    where
        E: std::error::Error + 'static,
        F: Fn(&E, &Request) -> Option<Response> + Send + Sync + 'static,
    {
        self.error(move |err, request| {
            err.downcast_ref::<E>()
                .and_then(|err| callback(err, request))
        })
    }

    /// Flushes the controller collection into the route table.
    pub fn flush(&mut self) {
        let table = self.controllers.flush("");
        self.routes.add_collection(table);
    }

    /// The flushed route table.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Flush staged controllers, then dispatch the request.
    pub fn handle(&mut self, request: &Request) -> Result<Response, BoxError> {
        self.flush();
        self.dispatch(request)
    }

    /// Run the dispatch pipeline for one request against the already
    /// flushed table.
    ///
    /// Phases: matching, before filters, route before middlewares, handler,
    /// route after middlewares, after filters; any error diverts into the
    /// error-handler chain, whose response also passes the after filters.
    /// Configuration errors (malformed constraint regex, a route without a
    /// handler) are fatal and bypass error handling entirely.
    pub fn dispatch(&self, request: &Request) -> Result<Response, BoxError> {
        info!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path,
            "request dispatch start"
        );

        let match_result = match UrlMatcher::new(&self.routes).match_request(request) {
            Ok(result) => result,
            Err(err @ RoutingError::Converter { .. }) => {
                return self.recover(err.into(), request);
            }
            Err(err) => return Err(err.into()),
        };

        let attempt: Result<Response, BoxError> = match match_result {
            MatchResult::NotFound => Err(HttpError::not_found(&request.path).into()),
            MatchResult::MethodNotAllowed { allow } => {
                Err(HttpError::method_not_allowed(&request.method, &request.path, &allow).into())
            }
            MatchResult::Redirect { url, status } => {
                self.run_phases(request, Invocation::Redirect(Response::redirect(&url, status)))
            }
            MatchResult::Matched {
                name,
                route,
                params,
            } => {
                let handler = match route.handler() {
                    Some(handler) => Handler::clone(handler),
                    None => return Err(RoutingError::MissingHandler { route: name }.into()),
                };
                let context = RequestContext {
                    request: request.clone(),
                    route_name: name,
                    params,
                };
                self.run_phases(
                    request,
                    Invocation::Route {
                        route: &route,
                        handler,
                        context,
                    },
                )
            }
        };

        let err = match attempt {
            Ok(mut response) => match self.apply_after_filters(request, &mut response) {
                Ok(()) => {
                    info!(
                        request_id = %request.id,
                        status = response.status,
                        "request dispatch complete"
                    );
                    return Ok(response);
                }
                Err(err) => err,
            },
            Err(err) => err,
        };

        self.recover(err, request)
    }

    /// Runs finish filters. Call after the response has been sent; filter
    /// failures are not caught here and propagate to the caller.
    pub fn terminate(&self, request: &Request, response: &Response) -> Result<(), BoxError> {
        for filter in in_priority_order(&self.finish_filters) {
            (filter.callback)(request, response)?;
        }
        Ok(())
    }

    /// Before filters, route middlewares and the handler for one matched
    /// request. A before-filter response skips the route entirely; a route
    /// before-middleware response skips only the handler.
    fn run_phases(
        &self,
        request: &Request,
        invocation: Invocation<'_>,
    ) -> Result<Response, BoxError> {
        for filter in in_priority_order(&self.before_filters) {
            if let Some(response) = (filter.callback)(request)? {
                debug!(request_id = %request.id, "before filter short-circuited the request");
                return Ok(response);
            }
        }

        match invocation {
            Invocation::Redirect(response) => Ok(response),
            Invocation::Route {
                route,
                handler,
                context,
            } => {
                let mut early: Option<Response> = None;
                for middleware in route.before_middlewares() {
                    if let Some(response) = middleware(&context)? {
                        debug!(
                            request_id = %request.id,
                            route_name = %context.route_name,
                            "route middleware short-circuited the handler"
                        );
                        early = Some(response);
                        break;
                    }
                }

                let mut response = match early {
                    Some(response) => response,
                    None => handler(&context)?,
                };

                // After middlewares run even when a before middleware
                // short-circuited the handler.
                for middleware in route.after_middlewares() {
                    middleware(&context, &mut response)?;
                }
                Ok(response)
            }
        }
    }

    fn apply_after_filters(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> Result<(), BoxError> {
        for filter in in_priority_order(&self.after_filters) {
            (filter.callback)(request, response)?;
        }
        Ok(())
    }

    /// The error phase: registered handlers in registration order until one
    /// yields a response, which then passes the after filters like any
    /// other. An unhandled error is rethrown.
    fn recover(&self, err: BoxError, request: &Request) -> Result<Response, BoxError> {
        error!(
            request_id = %request.id,
            path = %request.path,
            error = %err,
            "request entered error handling"
        );
        for handler in &self.error_handlers {
            if let Some(mut response) = handler(&err, request) {
                self.apply_after_filters(request, &mut response)?;
                return Ok(response);
            }
        }
        Err(err)
    }

    fn next_seq(&mut self) -> usize {
        let seq = self.seq;
        self.seq += 1;
        seq
    }
}

enum Invocation<'a> {
    Redirect(Response),
    Route {
        route: &'a Arc<Route>,
        handler: Handler,
        context: RequestContext,
    },
}
