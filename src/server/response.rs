use serde_json::Value;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// Serialize a framework response onto the raw `may_minihttp` response.
///
/// `Value::String` bodies go out as plain text, everything else as JSON; an
/// explicit `Content-Type` header on the response wins over both.
pub fn write_response(res: &mut may_minihttp::Response, response: &crate::response::Response) {
    res.status_code(response.status as usize, status_reason(response.status));

    let mut has_content_type = false;
    for (name, value) in &response.headers {
        if name.eq_ignore_ascii_case("content-type") {
            has_content_type = true;
        }
        // may_minihttp wants 'static header lines; responses are written
        // once, so the leak is bounded by response construction.
        let line = format!("{name}: {value}").into_boxed_str();
        res.header(Box::leak(line));
    }

    match &response.body {
        Value::Null => {
            res.body_vec(Vec::new());
        }
        Value::String(s) => {
            if !has_content_type {
                res.header("Content-Type: text/plain; charset=utf-8");
            }
            res.body_vec(s.clone().into_bytes());
        }
        other => {
            if !has_content_type {
                res.header("Content-Type: application/json");
            }
            res.body_vec(serde_json::to_vec(other).unwrap_or_default());
        }
    }
}
