//! # Backup Orchestrator
//!
//! Composes the walker, the call guard and the archive builder into the two
//! export workflows.
//!
//! ## Workflow
//!
//! Every export runs in two phases:
//!
//! 1. [`BackupOrchestrator::plan`] runs before any byte is sent. It resolves
//!    everything that should fail the request with a clean status: the
//!    workspace list for a tenant backup, or the target workspace and project
//!    for a project backup.
//! 2. [`BackupOrchestrator::execute`] streams the archive into a sink. From
//!    here on, failures of single nodes are skipped and reported, including
//!    folders the user may not read. Cancellation, a broken sink or a session
//!    that can no longer produce a token stop the run.
//!
//! `execute` asks its [`TokenSource`] for a bearer before every remote call,
//! so a long export keeps working across token renewals.
//!
//! ### Tenant backup
//! For every workspace, list its projects. A workspace without projects
//! becomes a `Workspace/` marker. Every project is walked under
//! `Workspace/Project/`.
//!
//! ### Project backup
//! The single project is walked under `Project/`. The workspace name never
//! appears in entry paths.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let orchestrator = BackupOrchestrator::new(provider, ExportSettings::default());
//! let cancel = CancellationToken::new();
//! let plan = orchestrator.plan(&BackupScope::Tenant, &token, &cancel).await?;
//! let report = orchestrator.execute(plan, &FixedToken::new(token), sink, cancel).await?;
//! ```

use crate::archive::{AppendOutcome, ArchiveBuilder};
use crate::error::{ExportError, Result};
use crate::guard::CallGuard;
use crate::sanitize;
use crate::tokens::TokenSource;
use crate::walker::{SkipReason, SkipRecord, TreeWalker, WalkEntry, WalkRoot, WalkStep};
use bridge_traits::storage::{DocumentProvider, Project, Workspace};
use core_runtime::config::ExportSettings;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// What to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupScope {
    /// Every workspace visible to the token
    Tenant,
    /// One project
    Project {
        workspace_id: String,
        project_id: String,
    },
}

impl BackupScope {
    /// Build a scope from optional query parameters.
    ///
    /// Returns `None` when only one of the two ids is given.
    pub fn from_query(workspace_id: Option<String>, project_id: Option<String>) -> Option<Self> {
        match (workspace_id, project_id) {
            (None, None) => Some(BackupScope::Tenant),
            (Some(workspace_id), Some(project_id)) => Some(BackupScope::Project {
                workspace_id,
                project_id,
            }),
            _ => None,
        }
    }
}

/// A scope resolved against the remote tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupPlan {
    Tenant { workspaces: Vec<Workspace> },
    Project { workspace: Workspace, project: Project },
}

/// Summary of one export run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BackupReport {
    pub entries_written: usize,
    pub directories_written: usize,
    /// Uncompressed content bytes copied into the archive
    pub bytes_written: u64,
    pub skipped: Vec<SkipRecord>,
}

pub struct BackupOrchestrator {
    provider: Arc<dyn DocumentProvider>,
    settings: ExportSettings,
}

impl BackupOrchestrator {
    pub fn new(provider: Arc<dyn DocumentProvider>, settings: ExportSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    fn guard(&self, cancel: CancellationToken) -> CallGuard {
        CallGuard::new(self.settings.call_timeout, cancel)
    }

    /// Resolve `scope` before streaming starts.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the workspace or project does not exist
    /// - `Denied` when the token is rejected
    /// - `Transport` / `TimedOut` when a listing fails
    #[instrument(skip(self, token, cancel))]
    pub async fn plan(
        &self,
        scope: &BackupScope,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<BackupPlan> {
        let guard = self.guard(cancel.clone());
        let workspaces = guard
            .call("list workspaces", self.provider.list_workspaces(token))
            .await?;

        match scope {
            BackupScope::Tenant => {
                info!(workspaces = workspaces.len(), "Planned tenant backup");
                Ok(BackupPlan::Tenant { workspaces })
            }
            BackupScope::Project {
                workspace_id,
                project_id,
            } => {
                let workspace = workspaces
                    .into_iter()
                    .find(|ws| &ws.id == workspace_id)
                    .ok_or_else(|| ExportError::NotFound(format!("workspace {}", workspace_id)))?;

                let project = guard
                    .call(
                        "list projects",
                        self.provider.list_projects(&workspace.id, token),
                    )
                    .await?
                    .into_iter()
                    .find(|p| &p.id == project_id)
                    .ok_or_else(|| ExportError::NotFound(format!("project {}", project_id)))?;

                info!(workspace = %workspace.name, project = %project.name, "Planned project backup");
                Ok(BackupPlan::Project { workspace, project })
            }
        }
    }

    /// Stream the archive for `plan` into `sink`.
    ///
    /// Firing `cancel` aborts any in-flight remote call and ends the run with
    /// `Cancelled`. A `tokens` failure ends the run with `AuthExpired`. The
    /// sink is shut down after the central directory is written.
    #[instrument(skip_all)]
    pub async fn execute<W>(
        &self,
        plan: BackupPlan,
        tokens: &dyn TokenSource,
        sink: W,
        cancel: CancellationToken,
    ) -> Result<BackupReport>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let guard = self.guard(cancel);
        let outcome = self.run(plan, tokens, sink, &guard).await;

        match &outcome {
            Ok(report) => info!(
                entries = report.entries_written,
                directories = report.directories_written,
                bytes = report.bytes_written,
                skipped = report.skipped.len(),
                "Backup complete"
            ),
            Err(ExportError::Cancelled) => info!("Backup cancelled by client"),
            Err(e) => error!(error = %e, "Backup aborted"),
        }

        outcome
    }

    async fn run<W>(
        &self,
        plan: BackupPlan,
        tokens: &dyn TokenSource,
        sink: W,
        guard: &CallGuard,
    ) -> Result<BackupReport>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut archive = ArchiveBuilder::new(sink);
        let mut report = BackupReport::default();

        match plan {
            BackupPlan::Tenant { workspaces } => {
                for workspace in workspaces {
                    self.export_workspace(&workspace, tokens, guard, &mut archive, &mut report)
                        .await?;
                }
            }
            BackupPlan::Project { workspace, project } => {
                let root = WalkRoot {
                    workspace_id: workspace.id,
                    project_id: project.id,
                    base_path: sanitize::sanitize_name(&project.name),
                };
                self.export_project(root, tokens, guard, &mut archive, &mut report)
                    .await?;
            }
        }

        report.entries_written = archive.entries();
        report.directories_written = archive.directories();
        archive.finalize().await?;
        Ok(report)
    }

    async fn export_workspace<W>(
        &self,
        workspace: &Workspace,
        tokens: &dyn TokenSource,
        guard: &CallGuard,
        archive: &mut ArchiveBuilder<W>,
        report: &mut BackupReport,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let workspace_path = sanitize::sanitize_name(&workspace.name);
        let token = tokens.bearer().await?;
        let projects = match guard
            .call(
                "list projects",
                self.provider.list_projects(&workspace.id, &token),
            )
            .await
        {
            Ok(projects) => projects,
            Err(e) if e.is_recoverable() => {
                warn!(workspace = %workspace.id, error = %e, "Skipping workspace");
                report.skipped.push(SkipRecord {
                    workspace_id: workspace.id.clone(),
                    project_id: None,
                    node_id: None,
                    version_id: None,
                    path: workspace_path,
                    reason: SkipReason::from_error(&e),
                });
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if projects.is_empty() {
            info!(workspace = %workspace.name, "No projects found");
            return archive.add_directory(&workspace_path).await;
        }

        for project in projects {
            let root = WalkRoot {
                workspace_id: workspace.id.clone(),
                base_path: sanitize::join(&workspace_path, &project.name),
                project_id: project.id,
            };
            self.export_project(root, tokens, guard, archive, report)
                .await?;
        }

        Ok(())
    }

    async fn export_project<W>(
        &self,
        root: WalkRoot,
        tokens: &dyn TokenSource,
        guard: &CallGuard,
        archive: &mut ArchiveBuilder<W>,
        report: &mut BackupReport,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        info!(project = %root.project_id, path = %root.base_path, "Exporting project");

        let base_path = root.base_path.clone();
        let mut walker = TreeWalker::new(
            self.provider.as_ref(),
            guard,
            tokens,
            root,
            self.settings.max_depth,
        );
        let mut written = 0usize;

        while let Some(step) = walker.next_step().await? {
            match step {
                WalkStep::Skipped(record) => report.skipped.push(record),
                WalkStep::Entry(entry) => {
                    if self
                        .export_version(walker.root(), &entry, tokens, guard, archive, report)
                        .await?
                    {
                        written += 1;
                    }
                }
            }
        }

        if written == 0 {
            info!(path = %base_path, "Project has no exportable content");
            archive.add_directory(&base_path).await?;
        }

        Ok(())
    }

    /// Copy one version into the archive. Returns whether an entry was
    /// written.
    async fn export_version<W>(
        &self,
        root: &WalkRoot,
        entry: &WalkEntry,
        tokens: &dyn TokenSource,
        guard: &CallGuard,
        archive: &mut ArchiveBuilder<W>,
        report: &mut BackupReport,
    ) -> Result<bool>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let skip = |reason: SkipReason| SkipRecord {
            workspace_id: root.workspace_id.clone(),
            project_id: Some(root.project_id.clone()),
            node_id: Some(entry.item_id.clone()),
            version_id: Some(entry.version_id.clone()),
            path: entry.path.clone(),
            reason,
        };

        let token = tokens.bearer().await?;
        let mut content = match guard
            .call(
                "open content",
                self.provider.open_content(&entry.storage_url, &token),
            )
            .await
        {
            Ok(content) => content,
            Err(e) if e.is_recoverable() => {
                warn!(
                    item = %entry.item_id,
                    version = %entry.version_id,
                    path = %entry.path,
                    error = %e,
                    "Failed to open version content"
                );
                report.skipped.push(skip(SkipReason::from_error(&e)));
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let outcome = archive.append(&entry.path, &mut *content, guard).await?;
        report.bytes_written += outcome.bytes();

        if let AppendOutcome::Truncated { error, .. } = outcome {
            report
                .skipped
                .push(skip(SkipReason::Truncated(error.to_string())));
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_from_query() {
        assert_eq!(BackupScope::from_query(None, None), Some(BackupScope::Tenant));
        assert_eq!(
            BackupScope::from_query(Some("b.1".into()), Some("b.p".into())),
            Some(BackupScope::Project {
                workspace_id: "b.1".into(),
                project_id: "b.p".into()
            })
        );
        assert_eq!(BackupScope::from_query(Some("b.1".into()), None), None);
        assert_eq!(BackupScope::from_query(None, Some("b.p".into())), None);
    }

    #[test]
    fn test_report_serializes_skip_reasons() {
        let report = BackupReport {
            entries_written: 1,
            directories_written: 0,
            bytes_written: 3,
            skipped: vec![
                SkipRecord {
                    workspace_id: "w".into(),
                    project_id: Some("p".into()),
                    node_id: Some("i".into()),
                    version_id: None,
                    path: "W/P/i".into(),
                    reason: SkipReason::TimedOut,
                },
                SkipRecord {
                    workspace_id: "w".into(),
                    project_id: Some("p".into()),
                    node_id: Some("f".into()),
                    version_id: None,
                    path: "W/P/Restricted".into(),
                    reason: SkipReason::Denied("APS returned 403".into()),
                },
            ],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["skipped"][0]["reason"]["kind"], "timed_out");
        assert_eq!(json["skipped"][1]["reason"]["kind"], "denied");
        assert_eq!(json["skipped"][1]["reason"]["detail"], "APS returned 403");
        assert_eq!(json["entries_written"], 1);
    }
}
