use super::request::parse_request;
use super::response::write_response;
use crate::app::Application;
use crate::errors::{BoxError, HttpError};
use crate::response::Response;
use may_minihttp::HttpService;
use std::io;
use std::sync::Arc;
use tracing::error;

/// Adapts an [`Application`] to the `may_minihttp` service interface.
///
/// Construction flushes the application once; from then on the route table
/// is read-only and the service clones (one per connection coroutine) share
/// the application without locking. Each call parses the raw request, runs
/// the dispatch pipeline, writes the response, and runs the finish filters.
#[derive(Clone)]
pub struct AppService {
    app: Arc<Application>,
}

impl AppService {
    /// Wrap an application for serving, flushing any staged controllers.
    #[must_use]
    pub fn new(mut app: Application) -> Self {
        app.flush();
        Self { app: Arc::new(app) }
    }

    #[must_use]
    pub fn app(&self) -> &Application {
        &self.app
    }
}

/// Last-resort translation of an unhandled pipeline error into a response.
///
/// The pipeline itself never swallows errors; this is the embedding
/// process's catch-all. Routing misses keep their status and headers
/// (notably `Allow` on a 405), everything else becomes a 500.
fn error_response(err: &BoxError) -> Response {
    if let Some(http) = err.downcast_ref::<HttpError>() {
        let mut response = Response::error(http.status, &http.message);
        for (name, value) in &http.headers {
            response.set_header(name, value.clone());
        }
        return response;
    }
    Response::error(500, "Internal Server Error")
}

impl HttpService for AppService {
    fn call(&mut self, req: may_minihttp::Request, res: &mut may_minihttp::Response) -> io::Result<()> {
        let request = parse_request(req);

        let response = match self.app.dispatch(&request) {
            Ok(response) => response,
            Err(err) => {
                error!(
                    request_id = %request.id,
                    path = %request.path,
                    error = %err,
                    "unhandled pipeline error"
                );
                error_response(&err)
            }
        };

        write_response(res, &response);

        // Finish filters run after the response has been written out.
        if let Err(err) = self.app.terminate(&request, &response) {
            error!(
                request_id = %request.id,
                error = %err,
                "finish filter failed"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_preserves_http_error_headers() {
        let err: BoxError = Box::new(HttpError::method_not_allowed(
            &http::Method::POST,
            "/r",
            &["GET".to_string()],
        ));
        let response = error_response(&err);
        assert_eq!(response.status, 405);
        assert_eq!(response.get_header("allow"), Some("GET"));
    }

    #[test]
    fn test_error_response_defaults_to_500() {
        let err: BoxError = "boom".into();
        let response = error_response(&err);
        assert_eq!(response.status, 500);
    }
}
