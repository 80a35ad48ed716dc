//! End-to-end tests for the application surface: staging, filters,
//! converters, error handling and redirects working together.

use serde_json::json;
use sluice::{
    before_middleware, converter, handler, Application, ControllerCollection, HttpError, Request,
    Response, Scheme,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod tracing_util;
use tracing_util::TestTracing;

#[test]
fn test_full_application_round_trip() {
    let _tracing = TestTracing::init();
    let mut app = Application::new();

    app.get(
        "/users/{id}",
        handler(|ctx| {
            Ok(Response::json(
                200,
                json!({ "id": ctx.param("id"), "route": ctx.route_name }),
            ))
        }),
    )
    .assert("id", r"\d+")
    .convert(
        "id",
        converter(|value, _req| {
            let id: i64 = value.as_str().unwrap_or_default().parse()?;
            Ok(json!(id))
        }),
    )
    .bind("user_detail")
    .unwrap();

    let response = app.handle(&Request::get("/users/37")).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({ "id": 37, "route": "user_detail" }));

    // Constraint violations are plain 404 material.
    let err = app.handle(&Request::get("/users/abc")).unwrap_err();
    let http = err.downcast_ref::<HttpError>().expect("http error");
    assert_eq!(http.status, 404);
}

#[test]
fn test_scheme_requirements_applied_collection_wide() {
    let _tracing = TestTracing::init();
    let mut app = Application::new();

    app.get("/open", handler(|_ctx| Ok("open".into())));
    app.get("/sealed", handler(|_ctx| Ok("sealed".into())));
    app.controllers().require_https();

    let err = app.handle(&Request::get("/sealed")).unwrap_err();
    assert_eq!(err.downcast_ref::<HttpError>().map(|e| e.status), Some(404));

    let response = app
        .handle(&Request::get("/sealed").with_scheme(Scheme::Https))
        .unwrap();
    assert_eq!(response.status, 200);
}

#[test]
fn test_abort_style_error_from_handler() {
    let _tracing = TestTracing::init();
    let mut app = Application::new();

    app.get(
        "/teapots/{id}",
        handler(|_ctx| Err(HttpError::new(418, "short and stout").into())),
    );
    app.error_for::<HttpError, _>(|err, _req| Some(Response::error(err.status, &err.message)));

    let response = app.handle(&Request::get("/teapots/1")).unwrap();
    assert_eq!(response.status, 418);
    assert_eq!(response.body, json!({ "error": "short and stout" }));
}

#[test]
fn test_route_middleware_gating() {
    let _tracing = TestTracing::init();
    let handler_calls = Arc::new(AtomicUsize::new(0));

    let mut app = Application::new();
    let calls = Arc::clone(&handler_calls);
    app.get(
        "/admin",
        handler(move |_ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("admin area".into())
        }),
    )
    .before(before_middleware(|ctx| {
        if ctx.request.header("x-token") != Some("secret") {
            return Ok(Some(Response::error(401, "missing token")));
        }
        Ok(None)
    }));

    let denied = app.handle(&Request::get("/admin")).unwrap();
    assert_eq!(denied.status, 401);
    assert_eq!(handler_calls.load(Ordering::SeqCst), 0);

    let granted = app
        .handle(&Request::get("/admin").with_header("X-Token", "secret"))
        .unwrap();
    assert_eq!(granted.status, 200);
    assert_eq!(handler_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_after_filter_decorates_every_response() {
    let _tracing = TestTracing::init();
    let mut app = Application::new();
    app.get("/a", handler(|_ctx| Ok("a".into())));
    app.after(|req, res| {
        res.set_header("X-Request-Id", req.id.to_string());
        Ok(())
    });

    let response = app.handle(&Request::get("/a")).unwrap();
    assert!(response.get_header("x-request-id").is_some());
}

#[test]
fn test_mounted_api_with_shared_constraints() {
    let _tracing = TestTracing::init();
    let mut api = ControllerCollection::new();
    api.assert("id", r"\d+");
    api.get(
        "/items/{id}",
        handler(|ctx| Ok(Response::text(format!("item {}", ctx.param_str("id").unwrap_or("?"))))),
    );

    let mut app = Application::new();
    app.mount("/v1", api);

    let response = app.handle(&Request::get("/v1/items/5")).unwrap();
    assert_eq!(response.body, json!("item 5"));

    let err = app.handle(&Request::get("/v1/items/five")).unwrap_err();
    assert_eq!(err.downcast_ref::<HttpError>().map(|e| e.status), Some(404));
}

#[test]
fn test_priority_route_wins_over_earlier_generic_route() {
    let _tracing = TestTracing::init();
    let mut app = Application::new();
    app.get("/{page}", handler(|_ctx| Ok("generic".into())));
    app.get("/home", handler(|_ctx| Ok("home".into()))).priority(5);

    let response = app.handle(&Request::get("/home")).unwrap();
    assert_eq!(response.body, json!("home"));
    let response = app.handle(&Request::get("/about")).unwrap();
    assert_eq!(response.body, json!("generic"));
}

#[test]
fn test_redirect_then_direct_match() {
    let _tracing = TestTracing::init();
    let mut app = Application::new();
    app.get("/docs/", handler(|_ctx| Ok("docs index".into())));

    let redirect = app.handle(&Request::get("/docs")).unwrap();
    assert_eq!(redirect.status, 301);
    assert_eq!(redirect.get_header("location"), Some("/docs/"));

    let direct = app.handle(&Request::get("/docs/")).unwrap();
    assert_eq!(direct.status, 200);
}

#[test]
fn test_unhandled_405_reports_allow_methods() {
    let _tracing = TestTracing::init();
    let mut app = Application::new();
    app.get("/resource", handler(|_ctx| Ok("r".into())));
    app.post("/resource", handler(|_ctx| Ok("created".into())));

    let err = app
        .handle(&Request::new(http::Method::DELETE, "/resource"))
        .unwrap_err();
    let http_err = err.downcast_ref::<HttpError>().expect("http error");
    assert_eq!(http_err.status, 405);
    assert_eq!(
        http_err.headers,
        vec![("Allow".to_string(), "GET, POST".to_string())]
    );
}
