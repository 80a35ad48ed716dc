//! HTTP server glue over `may_minihttp`.
//!
//! [`AppService`] adapts a flushed [`crate::app::Application`] to the
//! `may_minihttp` service interface; [`HttpServer`] starts it inside a
//! `may` coroutine and hands back a [`ServerHandle`] for readiness checks
//! and shutdown. Request parsing and response serialization live in
//! [`request`] and [`response`].

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_cookies, parse_query_params, parse_request};
pub use response::write_response;
pub use service::AppService;
