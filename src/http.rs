//! HTTP API for versioned records
//!
//! Paths alternate a collection slug and a record reference, following the
//! parent chain of the entity kinds:
//!
//! ## Record API
//! - `GET    /api/{slug}` - List records of a global kind
//! - `POST   /api/{slug}` - Create a record (code and version are assigned)
//! - `GET    /api/{slug}/next-code` - Preview the next code
//! - `GET    /api/{slug}/{ref}` - Get a record
//! - `PUT    /api/{slug}/{ref}` - Update a record (advances its version)
//! - `DELETE /api/{slug}/{ref}` - Delete a record with no children
//!
//! Nested kinds repeat the pattern under their parent, e.g.
//! `/api/organizations/ORG-001/projects/PROJ-001/actors/next-code`.
//! Every `{ref}` may be a canonical id or the kind's human code.
//!
//! ## Example Usage
//!
//! ```bash
//! # Create an organization
//! curl -X POST -d '{"name": "Acme"}' http://localhost:8095/api/organizations
//!
//! # Create a risk in a project, addressing the parents by code
//! curl -X POST -d '{"name": "Scope creep"}' \
//!      http://localhost:8095/api/organizations/ORG-001/projects/PROJ-001/risks
//!
//! # Update it by code
//! curl -X PUT -d '{"description": "Mitigated"}' \
//!      http://localhost:8095/api/organizations/ORG-001/projects/PROJ-001/risks/RISK-0001
//! ```

use crate::db::RecordQuery;
use crate::error::StorageError;
use crate::kind::EntityKind;
use crate::services::{self, CreateRecordInput, Services, UpdateRecordInput};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

const API_PREFIX: &str = "/api/";
const NEXT_CODE: &str = "next-code";
const MAX_PAGE_SIZE: i64 = 1000;

/// What the last path segment addresses
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Collection,
    NextCode,
    Item(String),
}

/// A path with every parent reference resolved to a canonical id
#[derive(Debug, Clone)]
struct ResolvedRoute {
    kind: EntityKind,
    parent_id: Option<String>,
    target: Target,
}

/// HTTP server state
pub struct HttpServer {
    services: Arc<Services>,
    bind_addr: SocketAddr,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(services: Arc<Services>, bind_addr: SocketAddr) -> Self {
        Self {
            services,
            bind_addr,
        }
    }

    /// Run the HTTP server
    pub async fn run(self: Arc<Self>) -> Result<(), StorageError> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        info!(addr = %self.bind_addr, "HTTP server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req).await }
                });

                if let Err(err) = http1::Builder::new()
                    .serve_connection(io, service)
                    .await
                {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    /// Read the body and dispatch to the blocking router
    async fn handle_request(
        self: Arc<Self>,
        req: Request<Incoming>,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);

        debug!(method = %method, path = %path, "Incoming request");

        let body = match req.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(error = %e, "Failed to read request body");
                return Ok(services::bad_request("Failed to read body"));
            }
        };

        // SQLite calls block on busy_timeout; keep them off the reactor
        let server = self.clone();
        let response = tokio::task::spawn_blocking(move || {
            server.route(method, &path, query.as_deref(), &body)
        })
        .await;

        match response {
            Ok(response) => Ok(response),
            Err(e) => {
                error!(error = %e, "Request handler panicked");
                Ok(services::error_response(StorageError::Internal(e.to_string())))
            }
        }
    }

    /// Route a request to its handler
    pub fn route(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        body: &[u8],
    ) -> Response<Full<Bytes>> {
        if path == "/health" {
            return match method {
                Method::GET => self.handle_health(),
                _ => services::method_not_allowed(),
            };
        }

        let Some(segments) = split_api_path(path) else {
            return services::not_found("Not Found");
        };

        let route = match self.resolve_route(&segments) {
            Ok(Some(route)) => route,
            Ok(None) => return services::not_found("Not Found"),
            Err(e) => return services::error_response(e),
        };

        let records = &self.services.records;
        let kind = route.kind;
        let parent = route.parent_id.as_deref();

        match (method, route.target) {
            (Method::GET, Target::NextCode) => services::from_result(
                records
                    .next_code(kind, parent)
                    .map(|code| serde_json::json!({ "kind": kind, "code": code })),
            ),
            (Method::GET, Target::Collection) => match parse_list_query(query) {
                Ok(q) => services::from_result(records.list(kind, parent, &q)),
                Err(e) => services::error_response(e),
            },
            (Method::POST, Target::Collection) => match parse_body::<CreateRecordInput>(body) {
                Ok(input) => services::from_create_result(records.create(kind, parent, input)),
                Err(e) => services::error_response(e),
            },
            (Method::GET, Target::Item(id)) => {
                services::from_option(records.get(kind, parent, &id), "Record not found")
            }
            (Method::PUT, Target::Item(id)) | (Method::PATCH, Target::Item(id)) => {
                match parse_body::<UpdateRecordInput>(body) {
                    Ok(input) => services::from_result(records.update(kind, parent, &id, input)),
                    Err(e) => services::error_response(e),
                }
            }
            (Method::DELETE, Target::Item(id)) => {
                services::from_delete_bool_result(records.delete(kind, parent, &id), "Record not found")
            }
            _ => services::method_not_allowed(),
        }
    }

    /// Health check endpoint
    fn handle_health(&self) -> Response<Full<Bytes>> {
        match self.services.db.stats() {
            Ok(stats) => services::ok(&serde_json::json!({
                "status": "ok",
                "records": stats.record_count,
                "counters": stats.counter_count,
            })),
            Err(e) => services::error_response(e),
        }
    }

    /// Walk `slug/ref` pairs, resolving each parent reference in turn.
    ///
    /// Returns `None` for unknown slugs and for slugs that are not a child
    /// kind of the preceding one.
    fn resolve_route(&self, segments: &[&str]) -> Result<Option<ResolvedRoute>, StorageError> {
        let mut parent: Option<(EntityKind, String)> = None;
        let mut i = 0;

        loop {
            let Some(kind) = segments.get(i).and_then(|s| EntityKind::from_slug(s)) else {
                return Ok(None);
            };
            if kind.parent() != parent.as_ref().map(|(k, _)| *k) {
                return Ok(None);
            }
            let parent_id = parent.as_ref().map(|(_, id)| id.as_str());
            let is_last_pair = i + 2 >= segments.len();

            let target = match segments.get(i + 1) {
                None => Target::Collection,
                Some(&NEXT_CODE) if is_last_pair => Target::NextCode,
                Some(raw) => {
                    let id = self.services.records.resolve(kind, parent_id, raw)?;
                    if !is_last_pair {
                        parent = Some((kind, id));
                        i += 2;
                        continue;
                    }
                    Target::Item(id)
                }
            };

            return Ok(Some(ResolvedRoute {
                kind,
                parent_id: parent_id.map(str::to_string),
                target,
            }));
        }
    }
}

/// Segments after `/api/`, or `None` for paths outside the API
fn split_api_path(path: &str) -> Option<Vec<&str>> {
    let rest = path.strip_prefix(API_PREFIX)?.trim_end_matches('/');
    if rest.is_empty() {
        return None;
    }
    let segments: Vec<&str> = rest.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

fn parse_list_query(query: Option<&str>) -> Result<RecordQuery, StorageError> {
    let mut parsed: RecordQuery = serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| StorageError::InvalidInput(format!("Invalid query: {}", e)))?;
    parsed.limit = parsed.limit.clamp(1, MAX_PAGE_SIZE);
    parsed.offset = parsed.offset.max(0);
    Ok(parsed)
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, StorageError> {
    if body.is_empty() {
        return Err(StorageError::InvalidInput("Request body is required".into()));
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_api_path() {
        assert_eq!(split_api_path("/api/authors"), Some(vec!["authors"]));
        assert_eq!(
            split_api_path("/api/organizations/ORG-001/projects/"),
            Some(vec!["organizations", "ORG-001", "projects"])
        );
        assert_eq!(split_api_path("/api/"), None);
        assert_eq!(split_api_path("/api/organizations//projects"), None);
        assert_eq!(split_api_path("/health"), None);
    }

    #[test]
    fn test_parse_list_query_clamps() {
        let q = parse_list_query(Some("search=clerk&limit=50000&offset=-3")).unwrap();
        assert_eq!(q.search.as_deref(), Some("clerk"));
        assert_eq!(q.limit, MAX_PAGE_SIZE);
        assert_eq!(q.offset, 0);

        let defaults = parse_list_query(None).unwrap();
        assert_eq!(defaults.limit, 100);

        assert!(matches!(
            parse_list_query(Some("limit=many")),
            Err(StorageError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_parse_body_requires_content() {
        assert!(matches!(
            parse_body::<CreateRecordInput>(b""),
            Err(StorageError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_body::<CreateRecordInput>(b"{not json"),
            Err(StorageError::Json(_))
        ));
        let input: CreateRecordInput = parse_body(br#"{"name": "Acme"}"#).unwrap();
        assert_eq!(input.name, "Acme");
    }
}
