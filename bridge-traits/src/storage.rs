//! Remote Document Store Abstractions
//!
//! The tenant-wide document hierarchy (workspaces, projects, folders, items,
//! versions) and the provider trait used to list and download it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::error::Result;

/// Top-level tenant container (a "hub").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
}

/// A project inside a workspace. Owns a folder/item tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub workspace_id: String,
}

/// Type tag of a tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    Item,
    /// Any other resource type returned by a listing. Not exported.
    Other(String),
}

impl NodeKind {
    pub fn from_type_tag(tag: &str) -> Self {
        match tag {
            "folders" => NodeKind::Folder,
            "items" => NodeKind::Item,
            other => NodeKind::Other(other.to_string()),
        }
    }
}

/// A folder or item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub display_name: String,
    pub kind: NodeKind,
    /// Containing folder. A back-reference, absent for top-level folders.
    pub parent_id: Option<String>,
}

/// One version of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    pub name: String,
    /// Location of the version's bytes. Versions without one cannot be
    /// downloaded.
    pub storage_url: Option<String>,
}

/// Signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: Option<String>,
}

/// Read-only access to a remote document tree.
///
/// Every call takes the bearer token explicitly. Providers never cache or
/// refresh credentials themselves.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::DocumentProvider;
///
/// async fn count_projects(provider: &dyn DocumentProvider, token: &str) -> Result<usize> {
///     let mut total = 0;
///     for ws in provider.list_workspaces(token).await? {
///         total += provider.list_projects(&ws.id, token).await?.len();
///     }
///     Ok(total)
/// }
/// ```
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// List every workspace visible to the token.
    async fn list_workspaces(&self, token: &str) -> Result<Vec<Workspace>>;

    /// List the projects of one workspace.
    async fn list_projects(&self, workspace_id: &str, token: &str) -> Result<Vec<Project>>;

    /// List the children of `folder_id`, or the project's top-level folders
    /// when `folder_id` is `None`.
    async fn list_folder_contents(
        &self,
        workspace_id: &str,
        project_id: &str,
        folder_id: Option<&str>,
        token: &str,
    ) -> Result<Vec<Node>>;

    /// List every version of an item.
    async fn list_item_versions(
        &self,
        project_id: &str,
        item_id: &str,
        token: &str,
    ) -> Result<Vec<Version>>;

    /// Open the content behind a version's storage location.
    async fn open_content(
        &self,
        storage_url: &str,
        token: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>>;

    /// Profile of the user owning the token.
    async fn user_profile(&self, token: &str) -> Result<UserProfile>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_from_type_tag() {
        assert_eq!(NodeKind::from_type_tag("folders"), NodeKind::Folder);
        assert_eq!(NodeKind::from_type_tag("items"), NodeKind::Item);
        assert_eq!(
            NodeKind::from_type_tag("commands"),
            NodeKind::Other("commands".to_string())
        );
    }

    #[test]
    fn test_node_serializes_kind_lowercase() {
        let node = Node {
            id: "urn:folder".to_string(),
            display_name: "Plans".to_string(),
            kind: NodeKind::Folder,
            parent_id: None,
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["kind"], "folder");
    }
}
