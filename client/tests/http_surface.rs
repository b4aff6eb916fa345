//! HTTP-level tests of the client surface against a mocked server.

use client::{DatabaseRecord, DocumentStore, IndexState};
use errors::ClientError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Person {
    name: String,
}

fn initialized_store(url: &str, database: &str) -> DocumentStore {
    let mut store = DocumentStore::single_node(url, Some(database.to_string()));
    store.initialize().unwrap();
    store
}

#[tokio::test]
async fn session_load_returns_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/databases/db1/docs"))
        .and(query_param("id", "people/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "Results": [{ "name": "Grisha" }] })),
        )
        .mount(&server)
        .await;

    let store = initialized_store(&server.uri(), "db1");
    let session = store.open_session().unwrap();
    let person: Option<Person> = session.load("people/1").await.unwrap();
    assert_eq!(
        person,
        Some(Person {
            name: "Grisha".to_string()
        })
    );
}

#[tokio::test]
async fn session_load_missing_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/databases/db1/docs"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = initialized_store(&server.uri(), "db1");
    let session = store.open_session().unwrap();
    let person: Option<Person> = session.load("people/1").await.unwrap();
    assert!(person.is_none());
}

#[tokio::test]
async fn session_load_null_result_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/databases/db1/docs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Results": [null] })))
        .mount(&server)
        .await;

    let store = initialized_store(&server.uri(), "db1");
    let session = store.open_session().unwrap();
    let person: Option<Person> = session.load("missing").await.unwrap();
    assert!(person.is_none());
}

#[tokio::test]
async fn save_changes_flushes_one_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/databases/db1/bulk_docs"))
        .and(body_json(json!({
            "Commands": [
                { "Id": "people/1", "Type": "PUT", "Document": { "name": "John" } },
                { "Id": "people/2", "Type": "DELETE" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Results": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let store = initialized_store(&server.uri(), "db1");
    let mut session = store.open_session().unwrap();
    session
        .store(
            &Person {
                name: "John".to_string(),
            },
            "people/1",
        )
        .unwrap();
    session.delete("people/2");
    session.save_changes().await.unwrap();

    // Pending commands were consumed; a second flush sends nothing.
    session.save_changes().await.unwrap();
}

#[tokio::test]
async fn create_database_puts_record() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/admin/databases"))
        .and(body_json(json!({ "DatabaseName": "test_1", "Disabled": false })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = initialized_store(&server.uri(), "test_1");
    let ops = store.server_operations().unwrap();
    ops.create_database(&DatabaseRecord::new("test_1"))
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_database_missing_maps_to_domain_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/admin/databases"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = initialized_store(&server.uri(), "test_1");
    let ops = store.server_operations().unwrap();
    let result = ops.delete_database("test_1", true).await;
    assert!(matches!(
        result,
        Err(ClientError::DatabaseDoesNotExist { database }) if database == "test_1"
    ));
}

#[tokio::test]
async fn delete_database_sends_hard_delete() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/admin/databases"))
        .and(body_json(json!({
            "DatabaseNames": ["test_2"],
            "HardDelete": true
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = initialized_store(&server.uri(), "test_2");
    let ops = store.server_operations().unwrap();
    ops.delete_database("test_2", true).await.unwrap();
}

#[tokio::test]
async fn get_statistics_decodes_indexes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/databases/db1/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "CountOfDocuments": 12,
            "Indexes": [
                { "Name": "people/byName", "State": "Normal", "IsStale": false }
            ]
        })))
        .mount(&server)
        .await;

    let store = initialized_store(&server.uri(), "db1");
    let stats = store.maintenance().unwrap().get_statistics().await.unwrap();
    assert_eq!(stats.count_of_documents, 12);
    assert_eq!(stats.indexes[0].state, IndexState::Normal);
    assert!(!stats.indexes[0].is_stale);
}

#[tokio::test]
async fn get_statistics_missing_database() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/databases/gone/stats"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = initialized_store(&server.uri(), "db1");
    let result = store
        .maintenance_for("gone")
        .unwrap()
        .get_statistics()
        .await;
    assert!(matches!(
        result,
        Err(ClientError::DatabaseDoesNotExist { .. })
    ));
}

#[tokio::test]
async fn get_index_errors_decodes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/databases/db1/indexes/errors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Results": [
                {
                    "Name": "orders/byTotal",
                    "Errors": [
                        { "Error": "division by zero", "Document": "orders/7" }
                    ]
                }
            ]
        })))
        .mount(&server)
        .await;

    let store = initialized_store(&server.uri(), "db1");
    let errors = store
        .maintenance()
        .unwrap()
        .get_index_errors()
        .await
        .unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].name, "orders/byTotal");
    assert_eq!(
        errors[0].errors[0].to_string(),
        "division by zero (document: orders/7)"
    );
}

#[tokio::test]
async fn server_error_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/admin/databases"))
        .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
        .mount(&server)
        .await;

    let store = initialized_store(&server.uri(), "db1");
    let ops = store.server_operations().unwrap();
    let result = ops.create_database(&DatabaseRecord::new("db1")).await;
    match result {
        Err(ClientError::ServerError { status, details }) => {
            assert_eq!(status, 500);
            assert_eq!(details, "disk full");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}
