//! Live server tests: boot the `may_minihttp` front-end and drive it with
//! raw TCP requests.

use sluice::runtime_config::RuntimeConfig;
use sluice::server::{AppService, HttpServer};
use sluice::{handler, Application, Response};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

mod tracing_util;
use tracing_util::TestTracing;

fn demo_app() -> Application {
    let mut app = Application::new();
    app.get(
        "/hello/{name}",
        handler(|ctx| {
            Ok(Response::text(format!(
                "Hello {}!",
                ctx.param_str("name").unwrap_or("world")
            )))
        }),
    );
    app.get("/dir/", handler(|_ctx| Ok("index".into())));
    app.after(|_req, res| {
        res.set_header("X-Served-By", "sluice".to_string());
        Ok(())
    });
    app
}

fn raw_request(addr: &str, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).expect("connect to test server");
    stream
        .set_read_timeout(Some(Duration::from_millis(500)))
        .expect("set read timeout");
    stream
        .write_all(request.as_bytes())
        .expect("write request");

    let mut response = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                response.extend_from_slice(&buf[..n]);
                if response.windows(4).any(|w| w == b"\r\n\r\n") && n < buf.len() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&response).to_string()
}

fn get(addr: &str, path: &str) -> String {
    raw_request(
        addr,
        &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"),
    )
}

#[test]
fn test_server_round_trip() {
    let _tracing = TestTracing::init();
    may::config().set_stack_size(RuntimeConfig::from_env().stack_size);

    let addr = "127.0.0.1:18471";
    let server = HttpServer(AppService::new(demo_app()))
        .start(addr)
        .expect("server start");
    server.wait_ready().expect("server ready");

    // Matched route with a path variable.
    let response = get(addr, "/hello/sluice");
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("Hello sluice!"), "{response}");
    assert!(response.contains("X-Served-By: sluice"), "{response}");

    // Unmatched path becomes a 404 at the server boundary.
    let response = get(addr, "/nope");
    assert!(response.starts_with("HTTP/1.1 404"), "{response}");

    // Method mismatch carries the Allow header through.
    let response = raw_request(
        addr,
        "POST /hello/x HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    );
    assert!(response.starts_with("HTTP/1.1 405"), "{response}");
    assert!(response.contains("Allow: GET"), "{response}");

    // Trailing-slash redirect.
    let response = get(addr, "/dir");
    assert!(response.starts_with("HTTP/1.1 301"), "{response}");
    assert!(response.contains("Location: /dir/"), "{response}");

    server.stop();
}
