//! # Sistema de Routing
//! src/router/mod.rs
//!
//! ```text
//! Request → Router → Handler → Response
//! ```
//!
//! Cada ruta es un par (método, path) exacto. Si el path existe pero con
//! otro método responde 405; si no existe, 404. `HEAD` usa la ruta `GET`
//! del mismo path y responde sin body.

use crate::http::{Method, Request, Response, StatusCode};

/// Un handler recibe un Request y retorna una Response
///
/// Es un closure para poder capturar estado compartido (p.ej. el
/// `JobManager`) sin variables globales.
pub type Handler = Box<dyn Fn(&Request) -> Response + Send + Sync>;

struct Route {
    method: Method,
    path: String,
    handler: Handler,
}

impl Route {
    fn accepts(&self, method: Method) -> bool {
        self.method == method || (method == Method::HEAD && self.method == Method::GET)
    }
}

/// Router que mapea (método, path) a handlers
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra una ruta
    ///
    /// ```
    /// use job_pipeline::http::{Method, Response};
    /// use job_pipeline::router::Router;
    ///
    /// let mut router = Router::new();
    /// router.register(Method::GET, "/hello", |_req| Response::json(r#"{"message":"hello"}"#));
    /// assert_eq!(router.len(), 1);
    /// ```
    pub fn register<F>(&mut self, method: Method, path: &str, handler: F)
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            handler: Box::new(handler),
        });
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Ejecuta el handler que corresponde al request
    pub fn route(&self, request: &Request) -> Response {
        let path = request.path();
        let mut path_known = false;

        for route in self.routes.iter().filter(|route| route.path == path) {
            path_known = true;
            if route.accepts(request.method()) {
                let mut response = (route.handler)(request);
                if request.method() == Method::HEAD {
                    response.strip_body();
                }
                Self::add_common_headers(&mut response);
                return response;
            }
        }

        let mut response = if path_known {
            let mut allowed: Vec<&str> = Vec::new();
            for route in self.routes.iter().filter(|route| route.path == path) {
                allowed.push(route.method.as_str());
                if route.method == Method::GET {
                    allowed.push(Method::HEAD.as_str());
                }
            }
            Response::error(
                StatusCode::MethodNotAllowed,
                &format!("Method {} not allowed on {}", request.method(), path),
            )
            .with_header("Allow", &allowed.join(", "))
        } else {
            Response::error(StatusCode::NotFound, &format!("Route not found: {}", path))
        };

        Self::add_common_headers(&mut response);
        response
    }

    fn add_common_headers(response: &mut Response) {
        response.add_header("Server", concat!("job_pipeline/", env!("CARGO_PKG_VERSION")));
        response.add_header("Connection", "close");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn request(raw: &str) -> Request {
        Request::parse(raw.as_bytes()).unwrap()
    }

    #[test]
    fn test_router_creation() {
        let router = Router::new();
        assert!(router.is_empty());
    }

    #[test]
    fn test_route_found() {
        let mut router = Router::new();
        router.register(Method::GET, "/status", |_| Response::json(r#"{"ok":true}"#));

        let response = router.route(&request("GET /status HTTP/1.0\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.header("Connection"), Some("close"));
    }

    #[test]
    fn test_route_not_found() {
        let router = Router::new();
        let response = router.route(&request("GET /nonexistent HTTP/1.0\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_method_not_allowed() {
        let mut router = Router::new();
        router.register(Method::POST, "/jobs", |_| Response::json("{}"));

        let response = router.route(&request("GET /jobs HTTP/1.0\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::MethodNotAllowed);
        assert_eq!(response.header("Allow"), Some("POST"));
    }

    #[test]
    fn test_head_uses_get_route_without_body() {
        let mut router = Router::new();
        router.register(Method::GET, "/status", |_| Response::json(r#"{"ok":true}"#));
        router.register(Method::POST, "/jobs", |_| Response::json("{}"));

        let response = router.route(&request("HEAD /status HTTP/1.0\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::Ok);
        assert!(response.body().is_empty());
        assert_eq!(response.header("Content-Length"), Some("11"));

        let response = router.route(&request("HEAD /jobs HTTP/1.0\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::MethodNotAllowed);
    }

    #[test]
    fn test_allow_lists_head_for_get_routes() {
        let mut router = Router::new();
        router.register(Method::GET, "/metrics", |_| Response::json("{}"));

        let response = router.route(&request("POST /metrics HTTP/1.0\r\n\r\n"));
        assert_eq!(response.header("Allow"), Some("GET, HEAD"));
    }

    #[test]
    fn test_handler_captures_state() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new();
        {
            let hits = Arc::clone(&hits);
            router.register(Method::GET, "/hit", move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
                Response::json("{}")
            });
        }

        router.route(&request("GET /hit HTTP/1.0\r\n\r\n"));
        router.route(&request("GET /hit HTTP/1.0\r\n\r\n"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
