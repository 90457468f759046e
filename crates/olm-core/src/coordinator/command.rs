// ── Session queue messages ──
//
// Everything that may touch connection state, the peer view or the status
// view goes through one queue, consumed by the session task.

use olm_api::EngineEvent;
use tokio::sync::oneshot;

use crate::error::CoreError;
use crate::exchange::ValidatedConfig;
use crate::store::Snapshot;

/// A message for the session task.
pub(crate) enum SessionEvent {
    /// A callback from the engine.
    Engine(EngineEvent),
    /// A user request, with its reply channel.
    Command(CommandEnvelope),
    /// Result of a status pull started under `epoch`.
    Pulled {
        epoch: u64,
        snapshot: Option<Snapshot>,
    },
}

/// A user request and the channel its outcome goes back on.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: oneshot::Sender<Result<CommandResult, CoreError>>,
}

#[derive(Debug)]
pub(crate) enum Command {
    Connect(ValidatedConfig),
    Disconnect,
    SwitchOrg { org_id: String },
    UpdateSettings { settings_json: String },
    RefreshNow,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum CommandResult {
    Queued,
    /// Whether a refresh pull was started.
    Refresh(bool),
}
