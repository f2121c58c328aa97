//! Shared application state.

use bridge_traits::http::HttpClient;
use bridge_traits::storage::DocumentProvider;
use bridge_traits::time::SystemClock;
use core_auth::{OAuthConfig, OAuthFlowManager, SessionStore, TokenLifecycleManager};
use core_export::BackupOrchestrator;
use core_runtime::config::{ExportSettings, ServerConfig};
use provider_aps::ApsConnector;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<TokenLifecycleManager>,
    pub provider: Arc<dyn DocumentProvider>,
    pub orchestrator: Arc<BackupOrchestrator>,
    pub export: Arc<ExportSettings>,
}

impl AppState {
    pub fn new(
        auth: Arc<TokenLifecycleManager>,
        provider: Arc<dyn DocumentProvider>,
        export: ExportSettings,
    ) -> Self {
        let orchestrator = Arc::new(BackupOrchestrator::new(provider.clone(), export.clone()));
        Self {
            auth,
            provider,
            orchestrator,
            export: Arc::new(export),
        }
    }

    /// Wire the production APS connector and OAuth flow over `http`.
    pub fn from_config(config: &ServerConfig, http: Arc<dyn HttpClient>) -> Self {
        let credentials = &config.credentials;
        let oauth = OAuthFlowManager::new(
            OAuthConfig::aps(
                credentials.client_id.clone(),
                credentials.client_secret.clone(),
                credentials.callback_url.clone(),
            ),
            http.clone(),
        );
        let auth = TokenLifecycleManager::new(oauth, SessionStore::new(), Arc::new(SystemClock));

        let provider = ApsConnector::new(http).with_request_timeout(config.export.call_timeout);

        Self::new(Arc::new(auth), Arc::new(provider), config.export.clone())
    }
}
