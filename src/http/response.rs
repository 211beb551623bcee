//! HTTP response building module
//!
//! Turns handler result mappings into JSON responses and provides the error
//! responses the dispatcher falls back to.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode};
use serde::Serialize;
use std::collections::BTreeMap;

pub const CONTENT_TYPE_JSON: &str = "application/json";

const NOT_FOUND_BODY: &str = r#"{"detail":"Not Found"}"#;
const METHOD_NOT_ALLOWED_BODY: &str = r#"{"detail":"Method Not Allowed"}"#;

/// A single value in a result mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Str(String),
    Int(i64),
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Flat key/value result produced by a handler.
///
/// Backed by a `BTreeMap` so serialized key order is always sorted.
pub type ResultMapping = BTreeMap<String, Scalar>;

/// Build a result mapping holding exactly one entry
pub fn single(key: &str, value: impl Into<Scalar>) -> ResultMapping {
    let mut mapping = ResultMapping::new();
    mapping.insert(key.to_string(), value.into());
    mapping
}

/// Encode a result mapping as a compact JSON object
pub fn serialize(mapping: &ResultMapping) -> Bytes {
    match serde_json::to_vec(mapping) {
        Ok(json) => Bytes::from(json),
        Err(e) => {
            // String keys and scalar values cannot fail to encode
            crate::logger::log_error(&format!("Failed to serialize result mapping: {e}"));
            Bytes::from_static(b"{}")
        }
    }
}

/// Build a JSON response for a handler result
pub fn build_json_response(status: StatusCode, mapping: &ResultMapping) -> Response<Full<Bytes>> {
    build_json_bytes_response(status, serialize(mapping), &[])
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_json_bytes_response(
        StatusCode::NOT_FOUND,
        Bytes::from_static(NOT_FOUND_BODY.as_bytes()),
        &[],
    )
}

/// Build 405 Method Not Allowed response listing the registered methods
pub fn build_405_response(allowed: &[Method]) -> Response<Full<Bytes>> {
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    build_json_bytes_response(
        StatusCode::METHOD_NOT_ALLOWED,
        Bytes::from_static(METHOD_NOT_ALLOWED_BODY.as_bytes()),
        &[("Allow", allow)],
    )
}

fn build_json_bytes_response(
    status: StatusCode,
    body: Bytes,
    extra_headers: &[(&str, String)],
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(status)
        .header("Content-Type", CONTENT_TYPE_JSON)
        .header("Content-Length", body.len());

    for (name, value) in extra_headers {
        builder = builder.header(*name, value.as_str());
    }

    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error(status.as_str(), &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
