// ── Coordinator ──
//
// Owns the connection state machine and the merged peer/status views for
// one engine. User requests and engine callbacks are serialized through a
// single session queue; engine calls go out through a boundary worker so
// nothing here blocks the caller.

mod callbacks;
mod command;
mod session;

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwapOption;
use olm_api::{BoundaryCall, Engine, Peer, SettingsUpdate, Status};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub use callbacks::EngineCallbacks;

use self::command::{Command, CommandEnvelope, CommandResult, SessionEvent};
use crate::config::{ConnectionConfig, CoordinatorConfig};
use crate::error::CoreError;
use crate::exchange::{FieldError, ValidatedConfig, ValidationError};
use crate::model::{ConnectionState, LogLevel};
use crate::provision::TunnelProvisioner;
use crate::store::SessionStore;
use crate::stream::ViewStream;

/// The entry point for hosts and UIs.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Construct once at
/// startup with [`start`](Self::start) and pass it to whatever needs it.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

pub(crate) struct CoordinatorInner {
    config: CoordinatorConfig,
    engine: Arc<dyn Engine>,
    store: Arc<SessionStore>,
    provisioner: Arc<TunnelProvisioner>,
    connection_state: watch::Sender<ConnectionState>,
    /// The config most recently handed to the engine.
    active_config: ArcSwapOption<ValidatedConfig>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    calls_tx: mpsc::UnboundedSender<BoundaryCall>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    /// Create a coordinator for `engine` and spawn its background tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(engine: Arc<dyn Engine>, config: CoordinatorConfig) -> Self {
        let (connection_state, _) = watch::channel(ConnectionState::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (calls_tx, calls_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let inner = Arc::new(CoordinatorInner {
            config,
            engine: Arc::clone(&engine),
            store: Arc::new(SessionStore::new()),
            provisioner: Arc::new(TunnelProvisioner::new()),
            connection_state,
            active_config: ArcSwapOption::empty(),
            events_tx,
            calls_tx,
            cancel: cancel.clone(),
            task_handles: Mutex::new(Vec::new()),
        });

        let handles = vec![
            tokio::spawn(session::session_task(Arc::clone(&inner), events_rx)),
            tokio::spawn(session::boundary_task(engine, calls_rx, cancel)),
        ];
        inner
            .task_handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(handles);

        info!(
            sync_interval = ?inner.config.sync_interval,
            "coordinator started"
        );
        Self { inner }
    }

    /// The handle the engine binding reports callbacks through.
    pub fn callbacks(&self) -> EngineCallbacks {
        EngineCallbacks::new(self.inner.events_tx.clone())
    }

    pub fn provisioner(&self) -> &Arc<TunnelProvisioner> {
        &self.inner.provisioner
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.inner.store
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Validate `config` and ask the engine to start a session.
    ///
    /// State does not change here; it follows the engine's callbacks.
    /// Refused while connected; while registered the new config supersedes
    /// the one in flight.
    pub async fn connect(&self, config: &ConnectionConfig) -> Result<(), CoreError> {
        let validated = config.validate()?;
        self.connect_with(validated).await
    }

    /// Like [`connect`](Self::connect) for an already validated config.
    pub async fn connect_with(&self, config: ValidatedConfig) -> Result<(), CoreError> {
        self.execute(Command::Connect(config)).await.map(drop)
    }

    /// Ask the engine to tear the session down.
    ///
    /// Valid in every state and idempotent. State moves only when the
    /// engine reports `terminated`.
    pub async fn disconnect(&self) {
        if let Err(e) = self.execute(Command::Disconnect).await {
            debug!(error = %e, "disconnect after shutdown ignored");
        }
    }

    /// Reassociate with another organization without reconnecting.
    pub async fn switch_org(&self, org_id: &str) -> Result<(), CoreError> {
        let org_id = org_id.trim();
        if org_id.is_empty() {
            return Err(ValidationError::from(FieldError::new("orgId", "must not be empty")).into());
        }
        self.execute(Command::SwitchOrg {
            org_id: org_id.to_owned(),
        })
        .await
        .map(drop)
    }

    /// Push a partial settings update to the running engine.
    pub async fn update_settings(&self, update: &SettingsUpdate) -> Result<(), CoreError> {
        let settings_json =
            serde_json::to_string(update).map_err(|e| olm_api::Error::Serialization {
                what: "settings update",
                message: e.to_string(),
            })?;
        self.execute(Command::UpdateSettings { settings_json })
            .await
            .map(drop)
    }

    pub async fn set_log_level(&self, level: LogLevel) -> Result<(), CoreError> {
        self.update_settings(&SettingsUpdate {
            log_level: Some(level.to_string()),
        })
        .await
    }

    /// Pull a fresh snapshot now, through the same path as the timer.
    ///
    /// Returns whether a pull was started; nothing happens unless connected.
    pub async fn refresh_now(&self) -> Result<bool, CoreError> {
        match self.execute(Command::RefreshNow).await? {
            CommandResult::Refresh(started) => Ok(started),
            CommandResult::Queued => Ok(false),
        }
    }

    async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.inner
            .events_tx
            .send(SessionEvent::Command(CommandEnvelope {
                command,
                response_tx,
            }))
            .map_err(|_| CoreError::ShutDown)?;
        response_rx.await.map_err(|_| CoreError::ShutDown)?
    }

    /// Stop all background tasks. Further requests fail with `ShutDown`.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handles: Vec<_> = self
            .inner
            .task_handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
        debug!("coordinator shut down");
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.inner.connection_state.borrow().clone()
    }

    pub fn connection_state(&self) -> ViewStream<ConnectionState> {
        ViewStream::new(self.inner.connection_state.subscribe())
    }

    pub fn peers(&self) -> ViewStream<Arc<Vec<Peer>>> {
        self.inner.store.subscribe_peers()
    }

    pub fn status(&self) -> ViewStream<Option<Arc<Status>>> {
        self.inner.store.subscribe_status()
    }

    pub fn active_config(&self) -> Option<Arc<ValidatedConfig>> {
        self.inner.active_config.load_full()
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("state", &*self.inner.connection_state.borrow())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
