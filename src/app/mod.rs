//! The application surface and the per-request dispatch pipeline.
//!
//! ## Overview
//!
//! [`Application`] ties the staging layer to the matcher and runs the
//! filtered dispatch pipeline:
//!
//! 1. **Matching** — the URL matcher resolves the request; misses become
//!    404/405 errors that enter the error phase directly.
//! 2. **Before filters** — application-wide, priority descending; the first
//!    filter returning a response skips the route entirely.
//! 3. **Route before middlewares** — in list order; the first response
//!    skips only the handler.
//! 4. **Handler invocation** — with the typed request context.
//! 5. **Route after middlewares**, then **after filters** — each may mutate
//!    or replace the response.
//! 6. **Error phase** — on any error, registered handlers run in
//!    registration order until one responds; unhandled errors are rethrown
//!    to the embedder.
//! 7. **Finish filters** — via [`Application::terminate`], after the
//!    response has been sent.
//!
//! Within every phase, callbacks sharing a priority run in registration
//! order.

mod core;
#[cfg(test)]
mod tests;

pub use core::{
    AfterFilter, Application, BeforeFilter, ControllerProvider, ErrorHandler, FinishFilter,
    EARLY_EVENT, LATE_EVENT,
};
