//! # Sluice
//!
//! **Sluice** is a staged-routing micro web framework core for Rust, built on
//! the `may` coroutine runtime and `may_minihttp`.
//!
//! ## Overview
//!
//! Sluice keeps route registration and request dispatch strictly separated
//! by a one-way gate. During bootstrap, routes accumulate in a staging
//! collection where they stay fully mutable: named, constrained, given
//! defaults and converters, wrapped in middlewares — individually through a
//! fluent controller builder, or collection-wide with retroactive effect.
//! Flushing the collection names and freezes everything into an immutable
//! route table; from then on, requests are matched and dispatched against
//! that table without any locking.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`route`]** - Route definitions, the fluent [`Controller`] builder,
//!   and the [`ControllerCollection`] staging area with its flush semantics
//! - **[`router`]** - The frozen [`RouteTable`] and the priority-ordered,
//!   redirect-aware [`UrlMatcher`]
//! - **[`app`]** - The [`Application`] surface and the filtered dispatch
//!   pipeline (before/after/finish filters, error handlers)
//! - **[`handler`]** - Typed handler, middleware and converter callbacks
//!   plus the per-request [`RequestContext`]
//! - **[`server`]** - HTTP server glue over `may_minihttp`
//! - **[`errors`]** - Configuration errors, routing errors and [`HttpError`]
//!
//! ## Request Handling Flow
//!
//! 1. The server parses the raw request into a [`Request`].
//! 2. The matcher resolves it against the route table: priority order,
//!    per-variable regex constraints, method/scheme/host requirements. A
//!    path failing only on a missing trailing slash becomes a 301 redirect;
//!    a method mismatch is reported as 405 with an `Allow` header.
//! 3. The pipeline runs before filters, the route's before middlewares, the
//!    handler, the route's after middlewares, and after filters. Any error
//!    diverts into the error-handler chain; unhandled errors are rethrown.
//! 4. Finish filters run after the response has been sent.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sluice::{handler, Application, Response};
//! use sluice::server::{AppService, HttpServer};
//!
//! let mut app = Application::new();
//!
//! app.get(
//!     "/hello/{name}",
//!     handler(|ctx| {
//!         let name = ctx.param_str("name").unwrap_or("world");
//!         Ok(Response::text(format!("Hello {name}!")))
//!     }),
//! )
//! .assert("name", "[a-z]+")
//! .bind("hello")
//! .expect("controller is not frozen yet");
//!
//! let server = HttpServer(AppService::new(app))
//!     .start("0.0.0.0:8080")
//!     .expect("failed to bind");
//! server.join().expect("server crashed");
//! ```
//!
//! ## Runtime Considerations
//!
//! Sluice uses the `may` coroutine runtime, not tokio or async-std:
//!
//! - Dispatch is synchronous; each request runs to completion inside its
//!   connection coroutine, with no suspension points of its own
//! - Stack size is configurable via the `SLUICE_STACK_SIZE` environment
//!   variable (see [`runtime_config`])
//! - Handlers that block forever block their request coroutine; timeouts
//!   are the host environment's job, not this core's
//!
//! Staging is single-writer and happens before serving; the flushed table
//! is read-only for the life of the process, so concurrent matching needs
//! no synchronization.

pub mod app;
pub mod errors;
pub mod handler;
pub mod ids;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod runtime_config;
pub mod server;

pub use app::{Application, ControllerProvider, EARLY_EVENT, LATE_EVENT};
pub use errors::{BoxError, FrozenControllerError, HttpError, RoutingError};
pub use handler::{
    after_middleware, before_middleware, converter, handler, Handler, ParamMap, RequestContext,
};
pub use ids::RequestId;
pub use request::{Request, Scheme};
pub use response::Response;
pub use route::{Controller, ControllerCollection, Route};
pub use router::{MatchResult, RouteTable, UrlMatcher};
