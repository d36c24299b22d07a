//! HTTP response building helpers
//!
//! Provides a consistent API for building HTTP responses across all handlers.
//! Reduces boilerplate and ensures consistent error formatting.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::error::StorageError;

/// Build a JSON response with the given status code
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Build a JSON response with 200 OK status
pub fn ok<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, body)
}

/// Build a JSON response with 201 Created status
pub fn created<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::CREATED, body)
}

/// Build an empty response with 204 No Content status
pub fn no_content() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

/// Build a 404 Not Found response with message
pub fn not_found(message: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({ "error": message }),
    )
}

/// Build a 400 Bad Request response with message
pub fn bad_request(message: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::BAD_REQUEST,
        &serde_json::json!({ "error": message }),
    )
}

/// Build a 405 Method Not Allowed response
pub fn method_not_allowed() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({ "error": "Method not allowed" }),
    )
}

/// Convert a StorageError to an appropriate HTTP response
///
/// The client sees a generic message for failures it cannot act on; the
/// status code carries the category so callers can pick a retry policy.
pub fn error_response(error: StorageError) -> Response<Full<Bytes>> {
    let (status, message) = match &error {
        StorageError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        StorageError::InvalidScope(msg) => (StatusCode::BAD_REQUEST, format!("Invalid scope: {}", msg)),
        StorageError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        StorageError::Json(e) => (StatusCode::BAD_REQUEST, format!("JSON error: {}", e)),
        StorageError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        StorageError::MalformedVersion(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Could not save: stored version is corrupt".to_string(),
        ),
        StorageError::VersionExhausted(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Could not save: version cannot advance further".to_string(),
        ),
        StorageError::Database(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Storage temporarily unavailable".to_string(),
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string()),
    };

    json_response(status, &serde_json::json!({ "error": message }))
}

/// Wrap a service result into an HTTP response
pub fn from_result<T: Serialize>(result: Result<T, StorageError>) -> Response<Full<Bytes>> {
    match result {
        Ok(value) => ok(&value),
        Err(e) => error_response(e),
    }
}

/// Wrap an optional service result into an HTTP response
/// Returns 404 if None
pub fn from_option<T: Serialize>(
    result: Result<Option<T>, StorageError>,
    not_found_msg: &str,
) -> Response<Full<Bytes>> {
    match result {
        Ok(Some(value)) => ok(&value),
        Ok(None) => not_found(not_found_msg),
        Err(e) => error_response(e),
    }
}

/// Wrap a create result into an HTTP response with 201 Created
pub fn from_create_result<T: Serialize>(result: Result<T, StorageError>) -> Response<Full<Bytes>> {
    match result {
        Ok(value) => created(&value),
        Err(e) => error_response(e),
    }
}

/// Wrap a delete result (bool) into an HTTP response
/// Returns 204 No Content if deleted, 404 Not Found if not found
pub fn from_delete_bool_result(
    result: Result<bool, StorageError>,
    not_found_msg: &str,
) -> Response<Full<Bytes>> {
    match result {
        Ok(true) => no_content(),
        Ok(false) => not_found(not_found_msg),
        Err(e) => error_response(e),
    }
}
