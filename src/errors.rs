use std::fmt;

/// Boxed error type carried through the dispatch pipeline.
///
/// Handlers, middlewares and converters fail with any error type; registered
/// error handlers pick the ones they understand back out via
/// [`std::error::Error::downcast_ref`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Attempt to rebind a controller after the owning collection was flushed.
///
/// Route names become part of the frozen route table at flush time, so a
/// later `bind` has nothing left to rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrozenControllerError {
    /// Name the caller tried to bind.
    pub attempted_name: String,
}

impl fmt::Display for FrozenControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot bind route name '{}': the controller is frozen (its collection was flushed)",
            self.attempted_name
        )
    }
}

impl std::error::Error for FrozenControllerError {}

/// Configuration and conversion failures surfaced by the URL matcher.
///
/// Ordinary non-matches are *not* errors; they come back as
/// [`crate::router::MatchResult`] variants. `InvalidConstraint` is a fatal
/// configuration error and is never retried.
#[derive(Debug)]
pub enum RoutingError {
    /// A per-variable constraint did not compile into a usable pattern regex.
    InvalidConstraint {
        /// The route pattern the constraint belongs to.
        pattern: String,
        /// The underlying regex compilation failure.
        source: regex::Error,
    },
    /// A route carries no handler to invoke.
    MissingHandler {
        /// Name of the offending table entry.
        route: String,
    },
    /// A post-match converter rejected a variable value.
    Converter {
        /// Name of the matched route.
        route: String,
        /// The variable whose converter failed.
        variable: String,
        /// The converter's own error.
        source: BoxError,
    },
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::InvalidConstraint { pattern, source } => {
                write!(
                    f,
                    "invalid constraint regex for route pattern '{pattern}': {source}"
                )
            }
            RoutingError::MissingHandler { route } => {
                write!(f, "route '{route}' has no handler bound")
            }
            RoutingError::Converter {
                route,
                variable,
                source,
            } => {
                write!(
                    f,
                    "converter for variable '{variable}' on route '{route}' failed: {source}"
                )
            }
        }
    }
}

impl std::error::Error for RoutingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RoutingError::InvalidConstraint { source, .. } => Some(source),
            RoutingError::MissingHandler { .. } => None,
            RoutingError::Converter { source, .. } => Some(source.as_ref()),
        }
    }
}

/// An HTTP-shaped failure: a status code, a message, and optional headers.
///
/// Routing misses are translated into these (404 for no match, 405 with an
/// `Allow` header for a method mismatch) and flow through the error phase
/// like any handler error, so applications can intercept them uniformly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub status: u16,
    pub message: String,
    pub headers: Vec<(String, String)>,
}

impl HttpError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            headers: Vec::new(),
        }
    }

    pub fn not_found(path: &str) -> Self {
        Self::new(404, format!("No route found for path '{path}'"))
    }

    pub fn method_not_allowed(method: &http::Method, path: &str, allow: &[String]) -> Self {
        let mut err = Self::new(
            405,
            format!("Method '{method}' is not allowed for path '{path}'"),
        );
        err.headers.push(("Allow".to_string(), allow.join(", ")));
        err
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.message)
    }
}

impl std::error::Error for HttpError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_not_allowed_carries_allow_header() {
        let err = HttpError::method_not_allowed(
            &http::Method::POST,
            "/resource",
            &["GET".to_string(), "PUT".to_string()],
        );
        assert_eq!(err.status, 405);
        assert_eq!(
            err.headers,
            vec![("Allow".to_string(), "GET, PUT".to_string())]
        );
    }

    #[test]
    fn test_frozen_controller_error_names_the_binding() {
        let err = FrozenControllerError {
            attempted_name: "foo2".to_string(),
        };
        assert!(err.to_string().contains("foo2"));
        assert!(err.to_string().contains("frozen"));
    }
}
