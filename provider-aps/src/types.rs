//! APS Data Management response types
//!
//! Data structures for deserializing the JSON:API documents returned by the
//! project and data endpoints.
//!
//! See: https://aps.autodesk.com/en/docs/data/v2/reference/http/

use serde::Deserialize;

/// A JSON:API collection document.
#[derive(Debug, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub data: Vec<Resource>,

    #[serde(default)]
    pub links: Option<Links>,
}

impl Collection {
    /// URL of the next page, if the listing is paginated and not exhausted.
    pub fn next_page(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|links| links.next.as_ref())
            .map(|link| link.href.as_str())
            .filter(|href| !href.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub next: Option<Link>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

/// A single JSON:API resource (hub, project, folder, item or version).
#[derive(Debug, Deserialize)]
pub struct Resource {
    pub id: String,

    /// Resource type tag: `hubs`, `projects`, `folders`, `items`, `versions`
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub attributes: Attributes,

    #[serde(default)]
    pub relationships: Relationships,
}

impl Resource {
    /// Human-readable name, preferring `displayName` over `name`.
    pub fn display_name(&self) -> String {
        self.attributes
            .display_name
            .clone()
            .or_else(|| self.attributes.name.clone())
            .unwrap_or_default()
    }

    /// Plain `name`, falling back to `displayName`.
    pub fn name(&self) -> String {
        self.attributes
            .name
            .clone()
            .or_else(|| self.attributes.display_name.clone())
            .unwrap_or_default()
    }

    /// Storage location of a version's bytes.
    pub fn storage_href(&self) -> Option<String> {
        self.relationships
            .storage
            .as_ref()
            .and_then(|storage| storage.meta.as_ref())
            .and_then(|meta| meta.link.as_ref())
            .map(|link| link.href.clone())
            .filter(|href| !href.is_empty())
    }

    pub fn parent_id(&self) -> Option<String> {
        self.relationships
            .parent
            .as_ref()
            .and_then(|parent| parent.data.as_ref())
            .map(|data| data.id.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attributes {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Relationships {
    #[serde(default)]
    pub storage: Option<StorageRelationship>,

    #[serde(default)]
    pub parent: Option<ParentRelationship>,
}

#[derive(Debug, Deserialize)]
pub struct StorageRelationship {
    #[serde(default)]
    pub meta: Option<StorageMeta>,
}

#[derive(Debug, Deserialize)]
pub struct StorageMeta {
    #[serde(default)]
    pub link: Option<Link>,
}

#[derive(Debug, Deserialize)]
pub struct ParentRelationship {
    #[serde(default)]
    pub data: Option<ResourceRef>,
}

#[derive(Debug, Deserialize)]
pub struct ResourceRef {
    pub id: String,
}

/// OpenID Connect user info response.
#[derive(Debug, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub preferred_username: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}
