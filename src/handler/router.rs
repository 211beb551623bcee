//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: route lookup, handler invocation
//! and conversion of the result into a response.

use crate::config::AppState;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::routing::RouteTable;
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Resolve a method and path against the route table and build the response.
///
/// A path registered under other methods yields 405, anything else 404.
pub fn dispatch(routes: &RouteTable, method: &Method, path: &str) -> Response<Full<Bytes>> {
    match routes.lookup(method, path) {
        Ok(handler) => http::build_json_response(StatusCode::OK, &handler.call()),
        Err(_) => {
            let allowed = routes.allowed_methods(path);
            if allowed.is_empty() {
                http::build_404_response()
            } else {
                http::build_405_response(&allowed)
            }
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let response = dispatch(&state.routes, req.method(), req.uri().path());

    if state.config.logging.access_log {
        let entry = build_access_entry(&req, peer_addr, &response, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

fn build_access_entry<B>(
    req: &Request<B>,
    peer_addr: SocketAddr,
    response: &Response<Full<Bytes>>,
    started: Instant,
) -> AccessLogEntry {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

fn version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, Config};
    use crate::handler::endpoints::default_routes;
    use http_body_util::{BodyExt, Empty};
    use serde_json::Value;

    fn routes() -> RouteTable {
        default_routes(&AppConfig {
            title: "Simple FastAPI App".to_string(),
            welcome_message: "Welcome to Simple FastAPI App".to_string(),
        })
        .unwrap()
    }

    async fn body_json(resp: Response<Full<Bytes>>) -> Value {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_get_root() {
        let table = routes();
        for _ in 0..3 {
            let resp = dispatch(&table, &Method::GET, "/");
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(resp.headers()["Content-Type"], "application/json");
            assert_eq!(
                body_json(resp).await,
                serde_json::json!({"message": "Welcome to Simple FastAPI App"})
            );
        }
    }

    #[tokio::test]
    async fn test_get_health() {
        let table = routes();
        for _ in 0..3 {
            let resp = dispatch(&table, &Method::GET, "/health");
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(
                body_json(resp).await,
                serde_json::json!({"status": "healthy"})
            );
        }
    }

    #[tokio::test]
    async fn test_get_random() {
        let table = routes();
        for _ in 0..200 {
            let resp = dispatch(&table, &Method::GET, "/random");
            assert_eq!(resp.status(), StatusCode::OK);
            let json = body_json(resp).await;
            let object = json.as_object().unwrap();
            assert_eq!(object.len(), 1);
            let v = object["random_number"].as_i64().unwrap();
            assert!((1..=100).contains(&v), "out of range: {v}");
        }
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let table = routes();
        for path in ["/missing", "/health/", "/random/", "//", "/HEALTH"] {
            let resp = dispatch(&table, &Method::GET, path);
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "path {path}");
        }

        let resp = dispatch(&table, &Method::DELETE, "/missing");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"detail": "Not Found"})
        );
    }

    #[tokio::test]
    async fn test_wrong_method_is_never_ok() {
        let table = routes();
        for path in ["/", "/health", "/random"] {
            for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
                let resp = dispatch(&table, &method, path);
                assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{method} {path}");
                assert_eq!(resp.headers()["Allow"], "GET");
            }
        }

        let resp = dispatch(&table, &Method::POST, "/");
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"detail": "Method Not Allowed"})
        );
    }

    #[tokio::test]
    async fn test_handle_request_ignores_query_and_body() {
        let mut cfg = Config::load_from("nonexistent-config-file").unwrap();
        cfg.logging.access_log = false;
        let state = Arc::new(AppState::new(&cfg, routes()));

        let req = Request::builder()
            .method(Method::GET)
            .uri("/health?verbose=1")
            .header("user-agent", "test")
            .body(Empty::<Bytes>::new())
            .unwrap();

        let resp = handle_request(req, "127.0.0.1:9".parse().unwrap(), state)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"status": "healthy"})
        );
    }

    #[tokio::test]
    async fn test_access_log_flag_follows_config() {
        for enabled in [true, false] {
            let mut cfg = Config::load_from("nonexistent-config-file").unwrap();
            cfg.logging.access_log = enabled;
            cfg.logging.access_log_format = "json".to_string();
            let state = Arc::new(AppState::new(&cfg, routes()));
            assert_eq!(state.config.logging.access_log, enabled);

            let req = Request::builder()
                .uri("/missing")
                .body(Empty::<Bytes>::new())
                .unwrap();
            let resp = handle_request(req, "127.0.0.1:9".parse().unwrap(), state)
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_access_entry() {
        let req = Request::builder()
            .method(Method::GET)
            .uri("/random?seed=1")
            .header("referer", "https://example.com")
            .body(())
            .unwrap();
        let resp = http::build_404_response();

        let entry = build_access_entry(&req, "10.0.0.1:5000".parse().unwrap(), &resp, Instant::now());
        assert_eq!(entry.remote_addr, "10.0.0.1");
        assert_eq!(entry.path, "/random");
        assert_eq!(entry.query.as_deref(), Some("seed=1"));
        assert_eq!(entry.status, 404);
        assert_eq!(entry.body_bytes, r#"{"detail":"Not Found"}"#.len());
        assert_eq!(entry.referer.as_deref(), Some("https://example.com"));
        assert!(entry.user_agent.is_none());
    }
}
