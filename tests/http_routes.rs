//! Integration tests for HTTP routing
//!
//! Drives `HttpServer::route` directly, without binding a socket.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Response, StatusCode};
use reqdocs_storage::{HttpServer, RecordDb, Services};
use serde_json::Value;
use std::sync::Arc;

fn create_server() -> HttpServer {
    let db = Arc::new(RecordDb::open_in_memory().unwrap());
    let services = Arc::new(Services::new(db));
    HttpServer::new(services, "127.0.0.1:0".parse().unwrap())
}

async fn body_json(response: Response<Full<Bytes>>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(server: &HttpServer, path: &str, body: &str) -> Response<Full<Bytes>> {
    server.route(Method::POST, path, None, body.as_bytes())
}

fn get(server: &HttpServer, path: &str) -> Response<Full<Bytes>> {
    server.route(Method::GET, path, None, b"")
}

#[tokio::test]
async fn test_nested_create_by_code() {
    let server = create_server();

    let org = post(&server, "/api/organizations", r#"{"name": "Acme"}"#);
    assert_eq!(org.status(), StatusCode::CREATED);
    assert_eq!(body_json(org).await["code"], "ORG-001");

    let project = post(&server, "/api/organizations/ORG-001/projects", r#"{"name": "Billing"}"#);
    assert_eq!(project.status(), StatusCode::CREATED);
    let project = body_json(project).await;
    assert_eq!(project["code"], "PROJ-001");
    assert_eq!(project["version"], "01.00");

    let preview = get(&server, "/api/organizations/ORG-001/projects/PROJ-001/risks/next-code");
    assert_eq!(preview.status(), StatusCode::OK);
    assert_eq!(body_json(preview).await["code"], "RISK-0001");

    let risk = post(
        &server,
        "/api/organizations/ORG-001/projects/PROJ-001/risks",
        r#"{"name": "Scope creep", "attributes": {"impact": "high"}}"#,
    );
    assert_eq!(risk.status(), StatusCode::CREATED);
    let risk = body_json(risk).await;
    assert_eq!(risk["code"], "RISK-0001");
    assert_eq!(risk["scope_id"], project["id"]);

    // The same record by canonical id and by code
    let by_code = get(&server, "/api/organizations/ORG-001/projects/PROJ-001/risks/RISK-0001");
    let by_id = get(
        &server,
        &format!(
            "/api/organizations/ORG-001/projects/{}/risks/{}",
            project["id"].as_str().unwrap(),
            risk["id"].as_str().unwrap()
        ),
    );
    assert_eq!(body_json(by_code).await["id"], body_json(by_id).await["id"]);
}

#[tokio::test]
async fn test_update_and_delete() {
    let server = create_server();
    post(&server, "/api/organizations", r#"{"name": "Acme"}"#);
    post(&server, "/api/organizations/ORG-001/projects", r#"{"name": "Billing"}"#);
    post(&server, "/api/organizations/ORG-001/projects/PROJ-001/actors", r#"{"name": "Clerk"}"#);

    let path = "/api/organizations/ORG-001/projects/PROJ-001/actors/ACT-0001";
    let updated = server.route(Method::PUT, path, None, br#"{"description": "Front desk"}"#);
    assert_eq!(updated.status(), StatusCode::OK);
    let updated = body_json(updated).await;
    assert_eq!(updated["version"], "00.02");
    assert_eq!(updated["description"], "Front desk");

    // A project with an actor cannot be deleted
    let refused = server.route(
        Method::DELETE,
        "/api/organizations/ORG-001/projects/PROJ-001",
        None,
        b"",
    );
    assert_eq!(refused.status(), StatusCode::CONFLICT);

    let deleted = server.route(Method::DELETE, path, None, b"");
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    // The code is gone, and will not come back
    assert_eq!(get(&server, path).status(), StatusCode::NOT_FOUND);
    let preview = get(&server, "/api/organizations/ORG-001/projects/PROJ-001/actors/next-code");
    assert_eq!(body_json(preview).await["code"], "ACT-0002");
}

#[tokio::test]
async fn test_list_with_search() {
    let server = create_server();
    post(&server, "/api/authors", r#"{"name": "Ana Lopez"}"#);
    post(&server, "/api/authors", r#"{"name": "Bruno Diaz"}"#);

    let all = body_json(get(&server, "/api/authors")).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let filtered = server.route(Method::GET, "/api/authors", Some("search=Bruno"), b"");
    let filtered = body_json(filtered).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["code"], "AUT-0002");
}

#[tokio::test]
async fn test_error_statuses() {
    let server = create_server();
    post(&server, "/api/organizations", r#"{"name": "Acme"}"#);

    // Unknown slug, and a kind that is not a child of its predecessor
    assert_eq!(get(&server, "/api/widgets").status(), StatusCode::NOT_FOUND);
    assert_eq!(
        get(&server, "/api/organizations/ORG-001/actors").status(),
        StatusCode::NOT_FOUND
    );
    // Nested kinds cannot be addressed without their parents
    assert_eq!(get(&server, "/api/projects").status(), StatusCode::NOT_FOUND);

    // Unknown parent code
    assert_eq!(
        get(&server, "/api/organizations/ORG-009/projects").status(),
        StatusCode::NOT_FOUND
    );

    // Bad bodies
    assert_eq!(
        post(&server, "/api/organizations", r#"{"name": ""}"#).status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        post(&server, "/api/organizations", "not json").status(),
        StatusCode::BAD_REQUEST
    );

    assert_eq!(
        server.route(Method::DELETE, "/api/organizations", None, b"").status(),
        StatusCode::METHOD_NOT_ALLOWED
    );
}

#[tokio::test]
async fn test_health() {
    let server = create_server();
    post(&server, "/api/roles", r#"{"name": "Analyst"}"#);

    let health = get(&server, "/health");
    assert_eq!(health.status(), StatusCode::OK);
    let health = body_json(health).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["records"], 1);
    assert_eq!(health["counters"], 1);
}
