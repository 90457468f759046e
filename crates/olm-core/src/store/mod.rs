// ── Session view store ──
//
// The merged peer/status view fed by engine pushes and timer pulls.

mod session;

pub use session::{SessionStore, Snapshot};
