use std::sync::Arc;

use tracing::debug;

use crate::infrastructure::app_state::AppState;

/// Periodic sweep task: evicts idle members, deletes expired and emptied
/// parties, and drops expired login sessions. Runs until the process exits.
pub async fn run(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(state.config.reap_interval);
    // The first tick fires immediately; skip it so startup stays quiet
    interval.tick().await;

    loop {
        interval.tick().await;
        if state.party_store.cleanup() {
            debug!("reaper changed party state");
            state.broadcaster.schedule_list_update();
        }
        let dropped = state.sessions.sweep();
        if dropped > 0 {
            debug!(dropped, "reaper removed expired sessions");
        }
    }
}
