//! Integration tests for the APS connector against a scripted API
//!
//! These tests verify:
//! - A hub to version walk through the public `DocumentProvider` surface
//! - Pagination across several pages
//! - Retry policy forwarding on listing calls
//! - Error classification for rejected tokens

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{DocumentProvider, NodeKind},
    HttpClient, HttpRequest, HttpResponse, RetryPolicy,
};
use bytes::Bytes;
use provider_aps::ApsConnector;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt};

const BASE: &str = "https://aps.test";

// ============================================================================
// Scripted API
// ============================================================================

/// Serves canned JSON bodies keyed by full URL and records every request.
#[derive(Default)]
struct ScriptedApi {
    routes: HashMap<String, (u16, String)>,
    blobs: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<HttpRequest>>,
    policies: Mutex<Vec<RetryPolicy>>,
}

impl ScriptedApi {
    fn route(mut self, path: &str, body: &str) -> Self {
        self.routes
            .insert(format!("{}{}", BASE, path), (200, body.to_string()));
        self
    }

    fn status(mut self, path: &str, status: u16) -> Self {
        self.routes
            .insert(format!("{}{}", BASE, path), (status, "{}".to_string()));
        self
    }

    fn blob(mut self, url: &str, bytes: &[u8]) -> Self {
        self.blobs.insert(url.to_string(), bytes.to_vec());
        self
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpClient for ScriptedApi {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let (status, body) = self
            .routes
            .get(&request.url)
            .cloned()
            .unwrap_or((404, "{}".to_string()));
        self.requests.lock().unwrap().push(request);
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body),
        })
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        self.policies.lock().unwrap().push(policy);
        self.execute(request).await
    }

    async fn download_stream(
        &self,
        request: HttpRequest,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        let blob = self
            .blobs
            .get(&request.url)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(request.url.clone()))?;
        self.requests.lock().unwrap().push(request);
        Ok(Box::new(std::io::Cursor::new(blob)))
    }
}

fn acme_api() -> ScriptedApi {
    ScriptedApi::default()
        .route(
            "/project/v1/hubs",
            r#"{"data":[{"id":"b.acme","type":"hubs","attributes":{"name":"Acme Co."}}]}"#,
        )
        .route(
            "/project/v1/hubs/b.acme/projects",
            r#"{"data":[{"id":"b.tower","type":"projects","attributes":{"name":"Tower A"}}]}"#,
        )
        .route(
            "/project/v1/hubs/b.acme/projects/b.tower/topFolders",
            r#"{"data":[{"id":"urn:pf","type":"folders","attributes":{"name":"pf","displayName":"Project Files"}}]}"#,
        )
        .route(
            "/data/v1/projects/b.tower/folders/urn:pf/contents",
            r#"{"data":[{"id":"urn:plan","type":"items","attributes":{"displayName":"plan.dwg"},
                "relationships":{"parent":{"data":{"type":"folders","id":"urn:pf"}}}}]}"#,
        )
        .route(
            "/data/v1/projects/b.tower/items/urn:plan/versions",
            r#"{"data":[{"id":"urn:plan?version=1","type":"versions","attributes":{"name":"plan.dwg"},
                "relationships":{"storage":{"meta":{"link":{"href":"https://oss.test/plan-v1"}}}}}]}"#,
        )
        .blob("https://oss.test/plan-v1", b"AC1032")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_walks_hub_to_version_content() {
    let api = Arc::new(acme_api());
    let connector = ApsConnector::new(api.clone()).with_base_url(BASE);

    let hubs = connector.list_workspaces("tok").await.unwrap();
    assert_eq!(hubs[0].name, "Acme Co.");

    let projects = connector.list_projects(&hubs[0].id, "tok").await.unwrap();
    assert_eq!(projects[0].name, "Tower A");

    let top = connector
        .list_folder_contents(&hubs[0].id, &projects[0].id, None, "tok")
        .await
        .unwrap();
    assert_eq!(top[0].display_name, "Project Files");
    assert_eq!(top[0].kind, NodeKind::Folder);

    let contents = connector
        .list_folder_contents(&hubs[0].id, &projects[0].id, Some(&top[0].id), "tok")
        .await
        .unwrap();
    assert_eq!(contents[0].kind, NodeKind::Item);
    assert_eq!(contents[0].parent_id.as_deref(), Some("urn:pf"));

    let versions = connector
        .list_item_versions(&projects[0].id, &contents[0].id, "tok")
        .await
        .unwrap();
    let storage_url = versions[0].storage_url.clone().unwrap();

    let mut reader = connector.open_content(&storage_url, "tok").await.unwrap();
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).await.unwrap();
    assert_eq!(bytes, b"AC1032");

    let requests = api.requests.lock().unwrap();
    assert_eq!(requests.len(), 6);
    assert!(requests.iter().all(|r| {
        r.headers.get("Authorization").map(String::as_str) == Some("Bearer tok")
    }));
}

#[tokio::test]
async fn test_collects_every_page() {
    let api = Arc::new(
        ScriptedApi::default()
            .route(
                "/data/v1/projects/p/folders/f/contents",
                r#"{"data":[{"id":"a","type":"items","attributes":{"displayName":"a"}}],
                    "links":{"next":{"href":"https://aps.test/page/2"}}}"#,
            )
            .route(
                "/page/2",
                r#"{"data":[{"id":"b","type":"items","attributes":{"displayName":"b"}}],
                    "links":{"next":{"href":"https://aps.test/page/3"}}}"#,
            )
            .route(
                "/page/3",
                r#"{"data":[{"id":"c","type":"folders","attributes":{"displayName":"c"}}]}"#,
            ),
    );
    let connector = ApsConnector::new(api.clone()).with_base_url(BASE);

    let nodes = connector
        .list_folder_contents("h", "p", Some("f"), "tok")
        .await
        .unwrap();

    let ids: Vec<_> = nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(api.request_count(), 3);
}

#[tokio::test]
async fn test_forwards_configured_retry_policy() {
    let api = Arc::new(acme_api());
    let connector = ApsConnector::new(api.clone())
        .with_base_url(BASE)
        .with_retry_policy(RetryPolicy::no_retry());

    connector.list_workspaces("tok").await.unwrap();

    let policies = api.policies.lock().unwrap();
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].max_attempts, 1);
}

#[tokio::test]
async fn test_rejected_token_is_unauthorized() {
    let api = Arc::new(ScriptedApi::default().status("/project/v1/hubs", 403));
    let connector = ApsConnector::new(api).with_base_url(BASE);

    let err = connector.list_workspaces("tok").await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_unknown_project_is_not_found() {
    let api = Arc::new(acme_api());
    let connector = ApsConnector::new(api).with_base_url(BASE);

    let err = connector
        .list_folder_contents("b.acme", "b.missing", None, "tok")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
