//! # Tree Walker
//!
//! Depth-first, pre-order traversal of one project's folder/item tree.
//!
//! The walker is driven by an explicit work stack and produces one
//! [`WalkStep`] per call to [`TreeWalker::next_step`]:
//!
//! - `Entry` for every version that exposes a content location, at
//!   `base/<item>/<version>`
//! - `Skipped` for a subtree, item or version that could not be exported
//!
//! Recoverable failures (timeouts, transport errors, vanished nodes, folders
//! the user may not read) become `Skipped` steps and the walk continues with
//! the siblings. Fatal failures (cancellation, no valid token left) end the
//! walk with `Err`.
//!
//! The project's top-level folders are transparent: their children are placed
//! directly under the base path.

use crate::error::{ExportError, Result};
use crate::guard::CallGuard;
use crate::sanitize;
use crate::tokens::TokenSource;
use bridge_traits::storage::{DocumentProvider, NodeKind};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

/// Where a walk starts and which archive path it is rooted at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkRoot {
    pub workspace_id: String,
    pub project_id: String,
    /// Already-sanitized archive path of the project.
    pub base_path: String,
}

/// A version ready to be downloaded into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: String,
    pub item_id: String,
    pub version_id: String,
    pub storage_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    TimedOut,
    Failed(String),
    NoContent,
    DepthExceeded,
    Revisited,
    /// The remote API refused access to the node
    Denied(String),
    /// Content stream broke after the entry was started
    Truncated(String),
}

impl SkipReason {
    pub fn from_error(error: &ExportError) -> Self {
        match error {
            ExportError::TimedOut { .. } => SkipReason::TimedOut,
            ExportError::Denied(msg) => SkipReason::Denied(msg.clone()),
            other => SkipReason::Failed(other.to_string()),
        }
    }
}

/// Identity of something left out of the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipRecord {
    pub workspace_id: String,
    pub project_id: Option<String>,
    pub node_id: Option<String>,
    pub version_id: Option<String>,
    pub path: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkStep {
    Entry(WalkEntry),
    Skipped(SkipRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    /// The project's top-level folder listing
    Root,
    TopFolder,
    Folder,
    Item,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    node_id: Option<String>,
    path: String,
    depth: usize,
}

pub struct TreeWalker<'a> {
    provider: &'a dyn DocumentProvider,
    guard: &'a CallGuard,
    tokens: &'a dyn TokenSource,
    root: WalkRoot,
    max_depth: usize,
    stack: Vec<Frame>,
    pending: VecDeque<WalkStep>,
    visited: HashSet<String>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(
        provider: &'a dyn DocumentProvider,
        guard: &'a CallGuard,
        tokens: &'a dyn TokenSource,
        root: WalkRoot,
        max_depth: usize,
    ) -> Self {
        let stack = vec![Frame {
            kind: FrameKind::Root,
            node_id: None,
            path: root.base_path.clone(),
            depth: 0,
        }];

        Self {
            provider,
            guard,
            tokens,
            root,
            max_depth,
            stack,
            pending: VecDeque::new(),
            visited: HashSet::new(),
        }
    }

    pub fn root(&self) -> &WalkRoot {
        &self.root
    }

    /// Advance the walk. `Ok(None)` once the tree is exhausted.
    pub async fn next_step(&mut self) -> Result<Option<WalkStep>> {
        loop {
            if let Some(step) = self.pending.pop_front() {
                return Ok(Some(step));
            }

            let Some(frame) = self.stack.pop() else {
                return Ok(None);
            };

            if let Some(id) = &frame.node_id {
                if !self.visited.insert(id.clone()) {
                    warn!(node = %id, path = %frame.path, "Node listed twice, not revisiting");
                    return Ok(Some(self.skip(&frame, SkipReason::Revisited)));
                }
            }

            if frame.depth > self.max_depth {
                warn!(path = %frame.path, depth = frame.depth, "Maximum folder depth exceeded");
                return Ok(Some(self.skip(&frame, SkipReason::DepthExceeded)));
            }

            let outcome = match frame.kind {
                FrameKind::Item => self.expand_item(&frame).await,
                _ => self.expand_folder(&frame).await,
            };

            match outcome {
                Ok(()) => continue,
                Err(error) if error.is_recoverable() => {
                    warn!(
                        workspace = %self.root.workspace_id,
                        project = %self.root.project_id,
                        node = frame.node_id.as_deref().unwrap_or("<top>"),
                        path = %frame.path,
                        error = %error,
                        "Skipping subtree"
                    );
                    let reason = SkipReason::from_error(&error);
                    return Ok(Some(self.skip(&frame, reason)));
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn expand_folder(&mut self, frame: &Frame) -> Result<()> {
        let token = self.tokens.bearer().await?;
        let children = self
            .guard
            .call(
                "list folder contents",
                self.provider.list_folder_contents(
                    &self.root.workspace_id,
                    &self.root.project_id,
                    frame.node_id.as_deref(),
                    &token,
                ),
            )
            .await?;

        debug!(path = %frame.path, count = children.len(), "Listed folder");

        // Reverse so the stack pops children in listing order.
        for child in children.into_iter().rev() {
            let (kind, path, depth) = match child.kind {
                NodeKind::Folder if frame.kind == FrameKind::Root => {
                    (FrameKind::TopFolder, frame.path.clone(), frame.depth)
                }
                NodeKind::Folder => (
                    FrameKind::Folder,
                    sanitize::join(&frame.path, &child.display_name),
                    frame.depth + 1,
                ),
                NodeKind::Item => (
                    FrameKind::Item,
                    sanitize::join(&frame.path, &child.display_name),
                    frame.depth,
                ),
                NodeKind::Other(tag) => {
                    debug!(node = %child.id, tag = %tag, "Ignoring unsupported node type");
                    continue;
                }
            };

            self.stack.push(Frame {
                kind,
                node_id: Some(child.id),
                path,
                depth,
            });
        }

        Ok(())
    }

    async fn expand_item(&mut self, frame: &Frame) -> Result<()> {
        let item_id = frame.node_id.clone().unwrap_or_default();
        let token = self.tokens.bearer().await?;
        let versions = self
            .guard
            .call(
                "list item versions",
                self.provider
                    .list_item_versions(&self.root.project_id, &item_id, &token),
            )
            .await?;

        for version in versions {
            let path = sanitize::join(&frame.path, &version.name);
            match version.storage_url {
                Some(storage_url) => self.pending.push_back(WalkStep::Entry(WalkEntry {
                    path,
                    item_id: item_id.clone(),
                    version_id: version.id,
                    storage_url,
                })),
                None => {
                    warn!(
                        item = %item_id,
                        version = %version.id,
                        path = %path,
                        "Version has no content location"
                    );
                    let step = WalkStep::Skipped(SkipRecord {
                        workspace_id: self.root.workspace_id.clone(),
                        project_id: Some(self.root.project_id.clone()),
                        node_id: Some(item_id.clone()),
                        version_id: Some(version.id),
                        path,
                        reason: SkipReason::NoContent,
                    });
                    self.pending.push_back(step);
                }
            }
        }

        Ok(())
    }

    fn skip(&self, frame: &Frame, reason: SkipReason) -> WalkStep {
        WalkStep::Skipped(SkipRecord {
            workspace_id: self.root.workspace_id.clone(),
            project_id: Some(self.root.project_id.clone()),
            node_id: frame.node_id.clone(),
            version_id: None,
            path: frame.path.clone(),
            reason,
        })
    }
}
