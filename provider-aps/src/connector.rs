//! APS Data Management connector implementation
//!
//! Implements the `DocumentProvider` trait for the APS project and data APIs.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::storage::{
    DocumentProvider, Node, NodeKind, Project, UserProfile, Version, Workspace,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::ApsError;
use crate::types::{Collection, Resource, UserInfo};

/// APS developer API base URL
pub const APS_API_BASE: &str = "https://developer.api.autodesk.com";

/// OpenID Connect user info endpoint
pub const APS_USERINFO_URL: &str = "https://api.userprofile.autodesk.com/userinfo";

/// Upper bound on pages followed for one listing
const MAX_PAGES: usize = 1000;

const JSON_API_ACCEPT: &str = "application/vnd.api+json, application/json";

/// APS Data Management connector
///
/// # Features
///
/// - Hub, project, folder and version listings
/// - Follows JSON:API `links.next` pagination until exhausted
/// - Streams version content from its storage location
/// - Retries listing calls on 429/5xx through the `HttpClient` retry policy
///
/// The bearer token is passed into every call; the connector holds none.
///
/// # Example
///
/// ```ignore
/// use provider_aps::ApsConnector;
/// use bridge_traits::storage::DocumentProvider;
///
/// let connector = ApsConnector::new(http_client);
/// let hubs = connector.list_workspaces(&token.internal).await?;
/// ```
pub struct ApsConnector {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    userinfo_url: String,
    request_timeout: Option<Duration>,
    retry_policy: RetryPolicy,
}

impl ApsConnector {
    /// Create a connector against the public APS endpoints
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: APS_API_BASE.to_string(),
            userinfo_url: APS_USERINFO_URL.to_string(),
            request_timeout: None,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Point the connector at another API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_userinfo_url(mut self, userinfo_url: impl Into<String>) -> Self {
        self.userinfo_url = userinfo_url.into();
        self
    }

    /// Bound each listing request at the transport level.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Build an endpoint URL, percent-encoding each path segment.
    fn endpoint(&self, segments: &[&str]) -> std::result::Result<String, ApsError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApsError::ParseError(format!("Invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ApsError::ParseError("Base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.to_string())
    }

    fn get(&self, url: &str, token: &str) -> HttpRequest {
        let request = HttpRequest::get(url)
            .bearer_token(token)
            .header("Accept", JSON_API_ACCEPT);
        match self.request_timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }

    async fn fetch(&self, url: &str, token: &str, resource: &str) -> Result<HttpResponse> {
        let response = self
            .http_client
            .execute_with_retry(self.get(url, token), self.retry_policy.clone())
            .await?;

        if response.is_success() {
            debug!(status = response.status, "API request succeeded");
            Ok(response)
        } else {
            warn!(status = response.status, resource, "API request failed");
            Err(ApsError::from_status(response.status, resource, &response.body).into())
        }
    }

    /// Fetch every page of a JSON:API collection.
    #[instrument(skip(self, token), fields(resource = %resource))]
    async fn fetch_collection(
        &self,
        first_page: String,
        token: &str,
        resource: &str,
    ) -> Result<Vec<Resource>> {
        let mut resources = Vec::new();
        let mut next = Some(first_page);
        let mut pages = 0;

        while let Some(url) = next.take() {
            pages += 1;
            if pages > MAX_PAGES {
                return Err(ApsError::TooManyPages(MAX_PAGES).into());
            }

            let response = self.fetch(&url, token, resource).await?;
            let page: Collection = serde_json::from_slice(&response.body).map_err(|e| {
                ApsError::ParseError(format!("Failed to parse {} listing: {}", resource, e))
            })?;

            next = page.next_page().map(str::to_string);
            resources.extend(page.data);
        }

        debug!(count = resources.len(), pages, "Listing complete");
        Ok(resources)
    }

    fn convert_node(resource: Resource) -> Node {
        Node {
            kind: NodeKind::from_type_tag(&resource.kind),
            display_name: resource.display_name(),
            parent_id: resource.parent_id(),
            id: resource.id,
        }
    }

    fn convert_version(resource: Resource) -> Version {
        Version {
            name: resource.name(),
            storage_url: resource.storage_href(),
            id: resource.id,
        }
    }
}

#[async_trait]
impl DocumentProvider for ApsConnector {
    #[instrument(skip(self, token))]
    async fn list_workspaces(&self, token: &str) -> Result<Vec<Workspace>> {
        let url = self.endpoint(&["project", "v1", "hubs"])?;
        let hubs = self.fetch_collection(url, token, "hubs").await?;

        info!(count = hubs.len(), "Listed hubs");
        Ok(hubs
            .into_iter()
            .map(|hub| Workspace {
                name: hub.name(),
                id: hub.id,
            })
            .collect())
    }

    #[instrument(skip(self, token))]
    async fn list_projects(&self, workspace_id: &str, token: &str) -> Result<Vec<Project>> {
        let url = self.endpoint(&["project", "v1", "hubs", workspace_id, "projects"])?;
        let projects = self
            .fetch_collection(url, token, &format!("hubs/{}/projects", workspace_id))
            .await?;

        info!(count = projects.len(), "Listed projects");
        Ok(projects
            .into_iter()
            .map(|project| Project {
                name: project.name(),
                id: project.id,
                workspace_id: workspace_id.to_string(),
            })
            .collect())
    }

    #[instrument(skip(self, token))]
    async fn list_folder_contents(
        &self,
        workspace_id: &str,
        project_id: &str,
        folder_id: Option<&str>,
        token: &str,
    ) -> Result<Vec<Node>> {
        let (url, resource) = match folder_id {
            None => (
                self.endpoint(&[
                    "project",
                    "v1",
                    "hubs",
                    workspace_id,
                    "projects",
                    project_id,
                    "topFolders",
                ])?,
                format!("projects/{}/topFolders", project_id),
            ),
            Some(folder_id) => (
                self.endpoint(&[
                    "data", "v1", "projects", project_id, "folders", folder_id, "contents",
                ])?,
                format!("folders/{}", folder_id),
            ),
        };

        let contents = self.fetch_collection(url, token, &resource).await?;
        debug!(count = contents.len(), "Listed folder contents");
        Ok(contents.into_iter().map(Self::convert_node).collect())
    }

    #[instrument(skip(self, token))]
    async fn list_item_versions(
        &self,
        project_id: &str,
        item_id: &str,
        token: &str,
    ) -> Result<Vec<Version>> {
        let url = self.endpoint(&["data", "v1", "projects", project_id, "items", item_id, "versions"])?;
        let versions = self
            .fetch_collection(url, token, &format!("items/{}/versions", item_id))
            .await?;

        debug!(count = versions.len(), "Listed item versions");
        Ok(versions.into_iter().map(Self::convert_version).collect())
    }

    #[instrument(skip(self, token))]
    async fn open_content(
        &self,
        storage_url: &str,
        token: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        debug!("Opening content stream");
        self.http_client
            .download_stream(HttpRequest::get(storage_url).bearer_token(token))
            .await
    }

    #[instrument(skip(self, token))]
    async fn user_profile(&self, token: &str) -> Result<UserProfile> {
        let response = self
            .fetch(&self.userinfo_url, token, "userinfo")
            .await?;
        let info: UserInfo = serde_json::from_slice(&response.body)
            .map_err(|e| ApsError::ParseError(format!("Failed to parse user info: {}", e)))?;

        Ok(UserProfile {
            name: info
                .name
                .or(info.preferred_username)
                .unwrap_or_default(),
            email: info.email,
        })
    }
}
