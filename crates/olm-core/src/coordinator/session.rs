// ── Session task and background workers ──
//
// `session_task` is the single consumer of the session queue and the only
// writer of connection state, the peer view and the status view.
// `boundary_task` delivers engine calls one at a time off the async
// executor. `status_poll_task` pulls snapshots while connected.

use std::sync::Arc;
use std::time::Duration;

use olm_api::{BoundaryCall, Engine, EngineEvent, decode_peers, decode_status};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::CoordinatorInner;
use super::command::{Command, CommandEnvelope, CommandResult, SessionEvent};
use crate::error::CoreError;
use crate::exchange::ValidatedConfig;
use crate::model::ConnectionState;
use crate::store::Snapshot;

// ── Session task ─────────────────────────────────────────────────────

struct PollTask {
    cancel: CancellationToken,
}

struct Session {
    inner: Arc<CoordinatorInner>,
    /// Bumped whenever polling stops; pulls carry the epoch they began in.
    epoch: u64,
    poll: Option<PollTask>,
}

pub(super) async fn session_task(
    inner: Arc<CoordinatorInner>,
    mut rx: mpsc::UnboundedReceiver<SessionEvent>,
) {
    let cancel = inner.cancel.clone();
    let mut session = Session {
        inner,
        epoch: 0,
        poll: None,
    };

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                session.handle(event);
            }
        }
    }

    session.stop_polling();
    debug!("session task stopped");
}

impl Session {
    fn state(&self) -> ConnectionState {
        self.inner.connection_state.borrow().clone()
    }

    fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Engine(event) => self.on_engine_event(event),
            SessionEvent::Command(CommandEnvelope {
                command,
                response_tx,
            }) => {
                let result = self.on_command(command);
                let _ = response_tx.send(result);
            }
            SessionEvent::Pulled { epoch, snapshot } => self.on_pulled(epoch, snapshot),
        }
    }

    // ── Engine callbacks ─────────────────────────────────────────────

    fn on_engine_event(&mut self, event: EngineEvent) {
        let current = self.state();

        if let EngineEvent::PeerUpdate(body) = &event {
            self.on_peer_update(&current, body);
            return;
        }

        let Some(next) = current.on_event(&event) else {
            return;
        };
        debug!(callback = event.name(), "engine callback");

        if next == ConnectionState::Terminated {
            // Views are cleared before observers learn of the new state.
            self.stop_polling();
            self.inner.store.clear();
            self.publish(&current, next);
            self.inner.provisioner.end_attempt();
            self.inner.active_config.store(None);
            return;
        }

        let entering = next.is_connected() && !current.is_connected();
        let leaving = current.is_connected() && !next.is_connected();
        if leaving {
            self.stop_polling();
        }
        self.publish(&current, next);
        if entering {
            self.start_polling();
        }
    }

    fn on_peer_update(&self, current: &ConnectionState, body: &str) {
        if *current == ConnectionState::Terminated {
            debug!("discarding peer update after termination");
            return;
        }
        match decode_peers(body) {
            Ok(peers) => self.inner.store.apply(Snapshot::Peers(peers)),
            Err(e) => warn!(error = %e, "dropping malformed peer update"),
        }
    }

    fn publish(&self, current: &ConnectionState, next: ConnectionState) {
        if *current != next {
            info!(from = current.kind(), to = next.kind(), "connection state changed");
        }
        self.inner.connection_state.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
    }

    // ── User commands ────────────────────────────────────────────────

    fn on_command(&mut self, command: Command) -> Result<CommandResult, CoreError> {
        match command {
            Command::Connect(config) => self.connect(config),
            Command::Disconnect => {
                info!(state = self.state().kind(), "disconnect requested");
                self.call(BoundaryCall::Disconnect)
            }
            Command::SwitchOrg { org_id } => {
                info!(org_id = %org_id, "organization switch requested");
                self.call(BoundaryCall::SwitchOrg { org_id })
            }
            Command::UpdateSettings { settings_json } => {
                debug!(settings = %settings_json, "live settings update");
                self.call(BoundaryCall::UpdateSettings { settings_json })
            }
            Command::RefreshNow => Ok(CommandResult::Refresh(self.refresh_now())),
        }
    }

    fn connect(&mut self, config: ValidatedConfig) -> Result<CommandResult, CoreError> {
        // A mid-connect config may be superseded; a live session may not.
        let state = self.state();
        if state.is_connected() {
            return Err(CoreError::SessionActive {
                state: state.kind(),
            });
        }

        info!(org_id = config.org_id(), "connect requested");
        self.inner.provisioner.begin_attempt();
        self.inner.active_config.store(Some(Arc::new(config.clone())));
        self.call(BoundaryCall::Connect {
            config_json: config.into_json(),
        })
    }

    fn call(&self, call: BoundaryCall) -> Result<CommandResult, CoreError> {
        self.inner
            .calls_tx
            .send(call)
            .map(|()| CommandResult::Queued)
            .map_err(|_| CoreError::ShutDown)
    }

    // ── Status sync ──────────────────────────────────────────────────

    fn start_polling(&mut self) {
        self.stop_polling();
        let cancel = self.inner.cancel.child_token();
        tokio::spawn(status_poll_task(
            Arc::clone(&self.inner.engine),
            self.inner.events_tx.clone(),
            self.epoch,
            self.inner.config.sync_interval,
            cancel.clone(),
        ));
        self.poll = Some(PollTask { cancel });
        debug!(epoch = self.epoch, "status polling started");
    }

    fn stop_polling(&mut self) {
        self.epoch += 1;
        if let Some(poll) = self.poll.take() {
            poll.cancel.cancel();
            debug!(epoch = self.epoch, "status polling stopped");
        }
    }

    fn refresh_now(&self) -> bool {
        let Some(poll) = self.poll.as_ref() else {
            debug!("refresh ignored while not connected");
            return false;
        };
        let engine = Arc::clone(&self.inner.engine);
        let events = self.inner.events_tx.clone();
        let cancel = poll.cancel.child_token();
        let epoch = self.epoch;
        tokio::spawn(async move {
            pull_once(&engine, &events, epoch, &cancel).await;
        });
        true
    }

    fn on_pulled(&self, epoch: u64, snapshot: Option<Snapshot>) {
        if epoch != self.epoch || !self.state().is_connected() {
            debug!(epoch, current = self.epoch, "discarding stale status pull");
            return;
        }
        if let Some(snapshot) = snapshot {
            self.inner.store.apply(snapshot);
        }
    }
}

// ── Status poll ──────────────────────────────────────────────────────

/// Pull a fresh snapshot on every tick until cancelled.
///
/// The first tick fires immediately so a new connection gets data at once.
/// A zero period means a single pull.
async fn status_poll_task(
    engine: Arc<dyn Engine>,
    events: mpsc::UnboundedSender<SessionEvent>,
    epoch: u64,
    period: Duration,
    cancel: CancellationToken,
) {
    if period.is_zero() {
        pull_once(&engine, &events, epoch, &cancel).await;
        return;
    }

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if !pull_once(&engine, &events, epoch, &cancel).await {
                    break;
                }
            }
        }
    }
}

/// One pull. Returns `false` if cancelled or the session queue is gone.
async fn pull_once(
    engine: &Arc<dyn Engine>,
    events: &mpsc::UnboundedSender<SessionEvent>,
    epoch: u64,
    cancel: &CancellationToken,
) -> bool {
    let snapshot = tokio::select! {
        biased;
        () = cancel.cancelled() => return false,
        snapshot = pull_snapshot(Arc::clone(engine)) => snapshot,
    };
    events.send(SessionEvent::Pulled { epoch, snapshot }).is_ok()
}

async fn pull_snapshot(engine: Arc<dyn Engine>) -> Option<Snapshot> {
    let result = tokio::task::spawn_blocking(move || {
        let status = engine.get_status().and_then(|body| decode_status(&body));
        let peers = engine.get_peers().and_then(|body| decode_peers(&body));
        (status, peers)
    })
    .await;

    let (status, peers) = match result {
        Ok(pair) => pair,
        Err(e) => {
            warn!(error = %e, "status pull did not complete");
            return None;
        }
    };

    let status = status
        .inspect_err(|e| warn!(error = %e, "status pull: bad status"))
        .ok();
    let peers = peers
        .inspect_err(|e| warn!(error = %e, "status pull: bad peer list"))
        .ok();

    match (status, peers) {
        (Some(status), Some(peers)) => Some(Snapshot::Both { status, peers }),
        (Some(status), None) => Some(Snapshot::Status(status)),
        (None, Some(peers)) => Some(Snapshot::Peers(peers)),
        (None, None) => None,
    }
}

// ── Boundary worker ──────────────────────────────────────────────────

/// Deliver queued engine calls in order, each on the blocking pool.
///
/// A failed call is logged and otherwise ignored; state catches up through
/// whatever callback the engine sends next.
pub(super) async fn boundary_task(
    engine: Arc<dyn Engine>,
    mut rx: mpsc::UnboundedReceiver<BoundaryCall>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            call = rx.recv() => {
                let Some(call) = call else { break };
                deliver(&engine, call).await;
            }
        }
    }
    debug!("boundary task stopped");
}

async fn deliver(engine: &Arc<dyn Engine>, call: BoundaryCall) {
    let name = call.name();
    let engine = Arc::clone(engine);
    match tokio::task::spawn_blocking(move || call.deliver(engine.as_ref())).await {
        Ok(Ok(())) => debug!(call = name, "engine call delivered"),
        Ok(Err(e)) => warn!(call = name, error = %e, "engine call failed"),
        Err(e) => warn!(call = name, error = %e, "engine call did not complete"),
    }
}
