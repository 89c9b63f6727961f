use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use serde::Deserialize;

use crate::auth::AuthClient;
use crate::config::BackendConfig;
use crate::db;
use crate::http;
use crate::list_state::PlanListState;
use crate::session::SessionTracker;
use crate::store::{LocalPlanStore, PlanStore, RemotePlanStore};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct Backend {
    pub auth: Arc<AuthClient>,
    pub plans: RemotePlanStore,
}

impl Backend {
    pub fn connect(config: BackendConfig) -> anyhow::Result<Self> {
        let client = http::build_client()?;
        let auth = Arc::new(AuthClient::new(config, client.clone()));
        let plans = RemotePlanStore::new(client, Arc::clone(&auth));
        Ok(Self { auth, plans })
    }

    pub fn config(&self) -> &BackendConfig {
        self.auth.config()
    }
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub backend: Option<Backend>,
    pub session: SessionTracker,
    pub dashboard: Option<PlanListState>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            backend: None,
            session: SessionTracker::detached(),
            dashboard: None,
        }
    }

    /// Swaps in a backend. The previous tracker registration is released
    /// before the new one is taken.
    pub fn install_backend(&mut self, config: BackendConfig) -> anyhow::Result<()> {
        let backend = Backend::connect(config)?;
        self.session.detach();
        self.session = SessionTracker::attach(&*backend.auth);
        if let Some(ws) = self.workspace.as_deref() {
            attach_session_storage(&backend, ws);
        }
        tracing::info!(url = %backend.config().url, "backend configured");
        self.backend = Some(backend);
        self.close_dashboard();
        Ok(())
    }

    pub fn remove_backend(&mut self) {
        self.session.detach();
        self.session = SessionTracker::detached();
        self.backend = None;
        self.close_dashboard();
    }

    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        let conn = db::open_db(path)?;
        if let Some(backend) = self.backend.as_ref() {
            attach_session_storage(backend, path);
        }
        self.workspace = Some(path.to_path_buf());
        self.db = Some(conn);
        self.close_dashboard();
        Ok(())
    }

    pub fn close_dashboard(&mut self) {
        if let Some(mut dashboard) = self.dashboard.take() {
            dashboard.dispose();
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

// Best effort: without storage the session simply lives in memory.
fn attach_session_storage(backend: &Backend, workspace: &Path) {
    match db::open_db(workspace) {
        Ok(conn) => backend.auth.attach_storage(conn),
        Err(e) => tracing::warn!(error = %e, "session storage unavailable"),
    }
}

/// The backend when one is configured, else the workspace's local store.
pub fn plan_store<'a>(
    db: Option<&'a Connection>,
    backend: Option<&'a Backend>,
) -> Option<Box<dyn PlanStore + 'a>> {
    if let Some(backend) = backend {
        return Some(Box::new(&backend.plans));
    }
    db.map(|conn| Box::new(LocalPlanStore::new(conn)) as Box<dyn PlanStore + 'a>)
}
