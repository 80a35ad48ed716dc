use super::{Application, ControllerProvider, EARLY_EVENT, LATE_EVENT};
use crate::errors::HttpError;
use crate::handler::{after_middleware, before_middleware, handler, Handler};
use crate::request::Request;
use crate::response::Response;
use crate::route::ControllerCollection;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn ok_handler() -> Handler {
    handler(|_ctx| Ok(Response::text("ok")))
}

fn counting_handler(counter: &Arc<AtomicUsize>) -> Handler {
    let counter = Arc::clone(counter);
    handler(move |_ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Response::text("handled"))
    })
}

#[derive(Debug)]
struct TeapotError;

impl fmt::Display for TeapotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("teapot")
    }
}

impl std::error::Error for TeapotError {}

#[derive(Debug)]
struct OtherError;

impl fmt::Display for OtherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("other")
    }
}

impl std::error::Error for OtherError {}

#[test]
fn test_phases_run_in_documented_order() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let mark = |tag: &'static str| {
        let log = Arc::clone(&log);
        move || log.lock().unwrap().push(tag)
    };

    let mut app = Application::new();

    // Registered after-filter first to show phase order is not
    // registration order.
    let tag = mark("after_filter");
    app.after(move |_req, _res| {
        tag();
        Ok(())
    });
    let tag = mark("before_filter");
    app.before(move |_req| {
        tag();
        Ok(None)
    });

    let tag_before = mark("route_before");
    let tag_after = mark("route_after");
    let tag_handler = mark("handler");
    app.get(
        "/x",
        handler(move |_ctx| {
            tag_handler();
            Ok(Response::text("ok"))
        }),
    )
    .before(before_middleware(move |_ctx| {
        tag_before();
        Ok(None)
    }))
    .after(after_middleware(move |_ctx, _res| {
        tag_after();
        Ok(())
    }));

    let response = app.handle(&Request::get("/x")).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "before_filter",
            "route_before",
            "handler",
            "route_after",
            "after_filter"
        ]
    );
}

#[test]
fn test_filters_run_by_priority_then_registration_order() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let mark = |tag: &'static str| {
        let log = Arc::clone(&log);
        move || log.lock().unwrap().push(tag)
    };

    let mut app = Application::new();
    let tag = mark("late");
    app.before_priority(
        move |_req| {
            tag();
            Ok(None)
        },
        LATE_EVENT,
    );
    let tag = mark("default_a");
    app.before(move |_req| {
        tag();
        Ok(None)
    });
    let tag = mark("early");
    app.before_priority(
        move |_req| {
            tag();
            Ok(None)
        },
        EARLY_EVENT,
    );
    let tag = mark("default_b");
    app.before(move |_req| {
        tag();
        Ok(None)
    });

    app.get("/x", ok_handler());
    app.handle(&Request::get("/x")).unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["early", "default_a", "default_b", "late"]
    );
}

#[test]
fn test_before_filter_short_circuit_skips_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut app = Application::new();
    app.get("/x", counting_handler(&calls));
    app.before(|_req| Ok(Some(Response::text("intercepted"))));

    let mutated = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&mutated);
    app.after(move |_req, res| {
        seen.fetch_add(1, Ordering::SeqCst);
        res.set_header("X-After", "1".to_string());
        Ok(())
    });

    let response = app.handle(&Request::get("/x")).unwrap();
    assert_eq!(response.body, serde_json::Value::String("intercepted".into()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    // After filters still ran on the short-circuit response.
    assert_eq!(mutated.load(Ordering::SeqCst), 1);
    assert_eq!(response.get_header("x-after"), Some("1"));
}

#[test]
fn test_route_middleware_short_circuit_skips_handler_but_not_after_middlewares() {
    let calls = Arc::new(AtomicUsize::new(0));
    let after_ran = Arc::new(AtomicUsize::new(0));
    let after_seen = Arc::clone(&after_ran);

    let mut app = Application::new();
    app.get("/x", counting_handler(&calls))
        .before(before_middleware(|_ctx| {
            Ok(Some(Response::text("early")))
        }))
        .after(after_middleware(move |_ctx, res| {
            after_seen.fetch_add(1, Ordering::SeqCst);
            *res = Response::text("replaced");
            Ok(())
        }));

    let response = app.handle(&Request::get("/x")).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(after_ran.load(Ordering::SeqCst), 1);
    assert_eq!(response.body, serde_json::Value::String("replaced".into()));
}

#[test]
fn test_not_found_reaches_error_handlers_as_404() {
    let mut app = Application::new();
    app.get("/only", ok_handler());
    app.error_for::<HttpError, _>(|err, _req| {
        Some(Response::error(err.status, &err.message))
    });

    let response = app.handle(&Request::get("/missing")).unwrap();
    assert_eq!(response.status, 404);
}

#[test]
fn test_method_mismatch_reaches_error_handlers_as_405_with_allow() {
    let mut app = Application::new();
    app.get("/resource", ok_handler());
    app.error_for::<HttpError, _>(|err, _req| {
        let mut response = Response::error(err.status, &err.message);
        for (name, value) in &err.headers {
            response.set_header(name, value.clone());
        }
        Some(response)
    });

    let response = app.handle(&Request::post("/resource")).unwrap();
    assert_eq!(response.status, 405);
    assert_eq!(response.get_header("allow"), Some("GET"));
}

#[test]
fn test_unhandled_error_is_rethrown() {
    let mut app = Application::new();
    app.get("/boom", handler(|_ctx| Err("kaboom".into())));

    let err = app.handle(&Request::get("/boom")).unwrap_err();
    assert_eq!(err.to_string(), "kaboom");
}

#[test]
fn test_error_handlers_run_in_registration_order_until_one_responds() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let mut app = Application::new();
    app.get("/teapot", handler(|_ctx| Err(Box::new(TeapotError))));
    app.get("/other", handler(|_ctx| Err(Box::new(OtherError))));

    let seen = Arc::clone(&log);
    app.error_for::<TeapotError, _>(move |_err, _req| {
        seen.lock().unwrap().push("teapot_handler");
        Some(Response::error(418, "teapot"))
    });
    let seen = Arc::clone(&log);
    app.error(move |_err, _req| {
        seen.lock().unwrap().push("catch_all");
        Some(Response::error(500, "caught"))
    });

    let response = app.handle(&Request::get("/teapot")).unwrap();
    assert_eq!(response.status, 418);
    assert_eq!(*log.lock().unwrap(), vec!["teapot_handler"]);

    log.lock().unwrap().clear();
    let response = app.handle(&Request::get("/other")).unwrap();
    assert_eq!(response.status, 500);
    assert_eq!(*log.lock().unwrap(), vec!["catch_all"]);
}

#[test]
fn test_logging_error_handler_passes_through_by_returning_none() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let mut app = Application::new();
    app.get("/boom", handler(|_ctx| Err(Box::new(TeapotError))));

    let seen = Arc::clone(&log);
    app.error(move |_err, _req| {
        seen.lock().unwrap().push("logger");
        None
    });
    let seen = Arc::clone(&log);
    app.error(move |_err, _req| {
        seen.lock().unwrap().push("responder");
        Some(Response::error(500, "handled"))
    });

    let response = app.handle(&Request::get("/boom")).unwrap();
    assert_eq!(response.status, 500);
    assert_eq!(*log.lock().unwrap(), vec!["logger", "responder"]);
}

#[test]
fn test_after_filters_run_on_error_responses() {
    let mut app = Application::new();
    app.get("/boom", handler(|_ctx| Err(Box::new(TeapotError))));
    app.error(|_err, _req| Some(Response::error(500, "handled")));
    app.after(|_req, res| {
        res.set_header("X-Always", "yes".to_string());
        Ok(())
    });

    let response = app.handle(&Request::get("/boom")).unwrap();
    assert_eq!(response.get_header("x-always"), Some("yes"));
}

#[test]
fn test_handler_error_reaches_typed_error_handler() {
    let mut app = Application::new();
    app.get("/boom", handler(|_ctx| Err(Box::new(TeapotError))));
    app.error_for::<TeapotError, _>(|_err, _req| Some(Response::error(418, "short and stout")));
    // A handler for an unrelated type never fires.
    app.error_for::<OtherError, _>(|_err, _req| Some(Response::error(400, "wrong")));

    let response = app.handle(&Request::get("/boom")).unwrap();
    assert_eq!(response.status, 418);
}

#[test]
fn test_finish_filters_run_in_priority_order_via_terminate() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let mut app = Application::new();
    let seen = Arc::clone(&log);
    app.finish(move |_req, _res| {
        seen.lock().unwrap().push("default");
        Ok(())
    });
    let seen = Arc::clone(&log);
    app.finish_priority(
        move |_req, _res| {
            seen.lock().unwrap().push("early");
            Ok(())
        },
        EARLY_EVENT,
    );
    app.get("/x", ok_handler());

    let request = Request::get("/x");
    let response = app.handle(&request).unwrap();
    app.terminate(&request, &response).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["early", "default"]);
}

#[test]
fn test_finish_filter_failure_propagates() {
    let mut app = Application::new();
    app.finish(|_req, _res| Err("finish failed".into()));
    app.get("/x", ok_handler());

    let request = Request::get("/x");
    let response = app.handle(&request).unwrap();
    let err = app.terminate(&request, &response).unwrap_err();
    assert_eq!(err.to_string(), "finish failed");
}

#[test]
fn test_flush_is_idempotent_per_batch() {
    let mut app = Application::new();
    app.flush();
    assert!(app.routes().is_empty());

    app.get("/x", ok_handler()).bind("x").unwrap();
    app.flush();
    assert_eq!(app.routes().len(), 1);

    // Nothing staged between flushes: the table is unchanged.
    app.flush();
    assert_eq!(app.routes().len(), 1);
}

#[test]
fn test_handle_flushes_staged_controllers() {
    let mut app = Application::new();
    app.get("/x", ok_handler());
    // No explicit flush; handle() does it.
    let response = app.handle(&Request::get("/x")).unwrap();
    assert_eq!(response.status, 200);

    // Routes staged after the first handle are picked up by the next one.
    app.get("/y", ok_handler());
    let response = app.handle(&Request::get("/y")).unwrap();
    assert_eq!(response.status, 200);
}

#[test]
fn test_trailing_slash_redirect_response() {
    let mut app = Application::new();
    app.get("/dir/", ok_handler());

    let response = app.handle(&Request::get("/dir")).unwrap();
    assert_eq!(response.status, 301);
    assert_eq!(response.get_header("location"), Some("/dir/"));
}

#[test]
fn test_mounted_collection_routes_are_reachable() {
    let mut sub = ControllerCollection::new();
    sub.get(
        "/leaf",
        handler(|_ctx| Ok(Response::text("leaf"))),
    );

    let mut app = Application::new();
    app.mount("/branch", sub);

    let response = app.handle(&Request::get("/branch/leaf")).unwrap();
    assert_eq!(response.body, serde_json::Value::String("leaf".into()));
}

#[test]
fn test_mount_provider_connects_and_mounts() {
    struct Feature;

    impl ControllerProvider for Feature {
        fn connect(&self, _app: &mut Application) -> ControllerCollection {
            let mut collection = ControllerCollection::new();
            collection.get("/status", handler(|_ctx| Ok(Response::text("feature up"))));
            collection
        }
    }

    let mut app = Application::new();
    app.mount_provider("/feature", &Feature);

    let response = app.handle(&Request::get("/feature/status")).unwrap();
    assert_eq!(
        response.body,
        serde_json::Value::String("feature up".into())
    );
}

#[test]
fn test_handler_string_coercion_into_response() {
    let mut app = Application::new();
    app.get("/hi", handler(|_ctx| Ok("hello".into())));
    let response = app.handle(&Request::get("/hi")).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, serde_json::Value::String("hello".into()));
}

#[test]
fn test_handler_receives_route_name_and_params() {
    let mut app = Application::new();
    app.get(
        "/users/{id}",
        handler(|ctx| {
            assert_eq!(ctx.route_name, "user");
            Ok(Response::text(format!(
                "user {}",
                ctx.param_str("id").unwrap_or("?")
            )))
        }),
    )
    .bind("user")
    .unwrap();

    let response = app.handle(&Request::get("/users/9")).unwrap();
    assert_eq!(response.body, serde_json::Value::String("user 9".into()));
}
