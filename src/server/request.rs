use crate::ids::RequestId;
use crate::request::{Request, Scheme};
use http::Method;
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, info};

/// Parse cookies out of an already-lowercased header map.
pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim().to_string();
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((name, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parse query string parameters from a URL path.
///
/// Extracts everything after the `?` character and URL-decodes parameter
/// names and values.
pub fn parse_query_params(path: &str) -> HashMap<String, String> {
    if let Some(pos) = path.find('?') {
        let query_str = &path[pos + 1..];
        url::form_urlencoded::parse(query_str.as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    } else {
        HashMap::new()
    }
}

/// Extract a framework [`Request`] from a raw `may_minihttp` request.
///
/// Headers are lowercased, cookies and the query string are parsed, and the
/// body is decoded as JSON when present. The scheme comes from
/// `x-forwarded-proto` (the listener itself is plain HTTP), the host from
/// the `Host` header, and the correlation id from `x-request-id` if the
/// client sent a valid one.
pub fn parse_request(req: may_minihttp::Request) -> Request {
    let method = Method::from_bytes(req.method().as_bytes()).unwrap_or(Method::GET);
    let raw_path = req.path().to_string();
    let path = raw_path
        .split('?')
        .next()
        .unwrap_or("/")
        .to_string();
    let query_string = raw_path
        .find('?')
        .map(|pos| raw_path[pos + 1..].to_string())
        .unwrap_or_default();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();
    debug!(
        header_count = headers.len(),
        size_bytes = headers.iter().map(|(k, v)| k.len() + v.len()).sum::<usize>(),
        "headers extracted"
    );

    let cookies = parse_cookies(&headers);
    let query_params = parse_query_params(&raw_path);

    let scheme = match headers.get("x-forwarded-proto").map(String::as_str) {
        Some("https") => Scheme::Https,
        _ => Scheme::Http,
    };
    let host = headers.get("host").cloned().unwrap_or_default();
    let id = RequestId::from_header_or_new(headers.get("x-request-id").map(String::as_str));

    let body = {
        let mut body_str = String::new();
        match req.body().read_to_string(&mut body_str) {
            Ok(size) if size > 0 => {
                let parsed: Result<serde_json::Value, _> = serde_json::from_str(&body_str);
                debug!(
                    body_size_bytes = size,
                    parsed = parsed.is_ok(),
                    "request body read"
                );
                parsed.ok()
            }
            _ => None,
        }
    };

    info!(
        request_id = %id,
        method = %method,
        path = %path,
        header_count = headers.len(),
        "HTTP request parsed"
    );

    Request {
        id,
        method,
        path,
        scheme,
        host,
        headers,
        cookies,
        query_string,
        query_params,
        body,
    }
}
