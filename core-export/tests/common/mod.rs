//! In-memory document tree shared by the export integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::storage::{
    DocumentProvider, Node, NodeKind, Project, UserProfile, Version, Workspace,
};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncRead;

const TOP: &str = "<top>";

/// A scripted tenant. Folder listings are keyed by `(project, folder)`, with
/// the project's top level under `"<top>"`.
#[derive(Default)]
pub struct FakeTenant {
    workspaces: Vec<Workspace>,
    projects: HashMap<String, Vec<Project>>,
    folders: HashMap<(String, String), Vec<Node>>,
    versions: HashMap<String, Vec<Version>>,
    blobs: HashMap<String, Vec<u8>>,
    stalled: HashSet<String>,
    failing: HashSet<String>,
    denied: HashSet<String>,
    rejected_token: Option<String>,
    seen_tokens: Mutex<Vec<String>>,
}

impl FakeTenant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workspace(mut self, id: &str, name: &str) -> Self {
        self.workspaces.push(Workspace {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    pub fn project(mut self, workspace_id: &str, id: &str, name: &str) -> Self {
        self.projects
            .entry(workspace_id.into())
            .or_default()
            .push(Project {
                id: id.into(),
                name: name.into(),
                workspace_id: workspace_id.into(),
            });
        self
    }

    fn node(mut self, project_id: &str, parent: Option<&str>, node: Node) -> Self {
        self.folders
            .entry((project_id.into(), parent.unwrap_or(TOP).into()))
            .or_default()
            .push(node);
        self
    }

    pub fn folder(self, project_id: &str, parent: Option<&str>, id: &str, name: &str) -> Self {
        let node = Node {
            id: id.into(),
            display_name: name.into(),
            kind: NodeKind::Folder,
            parent_id: parent.map(str::to_string),
        };
        self.node(project_id, parent, node)
    }

    pub fn item(self, project_id: &str, parent: Option<&str>, id: &str, name: &str) -> Self {
        let node = Node {
            id: id.into(),
            display_name: name.into(),
            kind: NodeKind::Item,
            parent_id: parent.map(str::to_string),
        };
        self.node(project_id, parent, node)
    }

    /// Add a downloadable version whose content is `body`.
    pub fn version(mut self, item_id: &str, name: &str, body: &[u8]) -> Self {
        let url = format!("https://storage.test/{}/{}", item_id, name);
        self.blobs.insert(url.clone(), body.to_vec());
        self.versions.entry(item_id.into()).or_default().push(Version {
            id: format!("{}@{}", item_id, name),
            name: name.into(),
            storage_url: Some(url),
        });
        self
    }

    /// Add a version without a content location.
    pub fn version_without_content(mut self, item_id: &str, name: &str) -> Self {
        self.versions.entry(item_id.into()).or_default().push(Version {
            id: format!("{}@{}", item_id, name),
            name: name.into(),
            storage_url: None,
        });
        self
    }

    /// Make listings of `id` (a folder, item or workspace) hang.
    pub fn stall(mut self, id: &str) -> Self {
        self.stalled.insert(id.into());
        self
    }

    /// Make listings of `id` fail with a transport error.
    pub fn fail(mut self, id: &str) -> Self {
        self.failing.insert(id.into());
        self
    }

    /// Make listings of `id` fail with 403, as for a folder the user may
    /// not read.
    pub fn deny(mut self, id: &str) -> Self {
        self.denied.insert(id.into());
        self
    }

    /// Bearer tokens received so far, in call order.
    pub fn seen_tokens(&self) -> Vec<String> {
        self.seen_tokens.lock().unwrap().clone()
    }

    pub fn reject_token(mut self, token: &str) -> Self {
        self.rejected_token = Some(token.into());
        self
    }

    async fn gate(&self, id: &str, token: &str) -> Result<()> {
        self.seen_tokens.lock().unwrap().push(token.to_string());
        if self.rejected_token.as_deref() == Some(token) {
            return Err(BridgeError::Unauthorized("token rejected".into()));
        }
        if self.denied.contains(id) {
            return Err(BridgeError::Unauthorized("APS returned 403".into()));
        }
        if self.stalled.contains(id) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing.contains(id) {
            return Err(BridgeError::OperationFailed(format!("listing {} failed", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentProvider for FakeTenant {
    async fn list_workspaces(&self, token: &str) -> Result<Vec<Workspace>> {
        self.gate("workspaces", token).await?;
        Ok(self.workspaces.clone())
    }

    async fn list_projects(&self, workspace_id: &str, token: &str) -> Result<Vec<Project>> {
        self.gate(workspace_id, token).await?;
        if !self.workspaces.iter().any(|ws| ws.id == workspace_id) {
            return Err(BridgeError::NotFound(workspace_id.into()));
        }
        Ok(self.projects.get(workspace_id).cloned().unwrap_or_default())
    }

    async fn list_folder_contents(
        &self,
        _workspace_id: &str,
        project_id: &str,
        folder_id: Option<&str>,
        token: &str,
    ) -> Result<Vec<Node>> {
        let folder = folder_id.unwrap_or(TOP);
        self.gate(folder, token).await?;
        Ok(self
            .folders
            .get(&(project_id.to_string(), folder.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_item_versions(
        &self,
        _project_id: &str,
        item_id: &str,
        token: &str,
    ) -> Result<Vec<Version>> {
        self.gate(item_id, token).await?;
        Ok(self.versions.get(item_id).cloned().unwrap_or_default())
    }

    async fn open_content(
        &self,
        storage_url: &str,
        token: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        self.gate(storage_url, token).await?;
        let body = self
            .blobs
            .get(storage_url)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(storage_url.into()))?;
        Ok(Box::new(std::io::Cursor::new(body)))
    }

    async fn user_profile(&self, _token: &str) -> Result<UserProfile> {
        Ok(UserProfile {
            name: "Test User".into(),
            email: None,
        })
    }
}

/// Entry names of a finished archive, in write order.
pub fn entry_names(archive: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(archive.to_vec())).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

pub fn entry_content(archive: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(archive.to_vec())).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut body = Vec::new();
    file.read_to_end(&mut body).unwrap();
    body
}
