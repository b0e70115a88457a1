//! Background reconciliation with the store

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::service::Ledger;

/// Refresh the ledger from the store on a fixed period
pub fn spawn_reconciler(ledger: Ledger, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately and the ledger was just loaded
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = ledger.refresh().await {
                tracing::error!("Ledger refresh failed: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::model::Guest;
    use super::super::snapshot::Snapshot;
    use super::super::store::memory::MemoryStore;
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reconciler_picks_up_store_changes() {
        let store = Arc::new(MemoryStore::default());
        let ledger = Ledger::with_snapshot(store.clone(), Snapshot::new());
        let handle = spawn_reconciler(ledger.clone(), Duration::from_secs(5));

        store.data.lock().unwrap().insert_guest(Guest::new(1, "Ada"));
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert!(ledger.read(|s| s.guest(1).is_some()).await);
        handle.abort();
    }
}
