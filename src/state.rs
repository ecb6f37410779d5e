use crate::controller::CycleOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub finished_at: DateTime<Utc>,
}

/// Last terminal cycle outcome, shared between the scheduler job and the
/// status endpoint.
#[derive(Clone, Default)]
pub struct CycleStatus {
    inner: Arc<RwLock<Option<CycleReport>>>,
}

impl CycleStatus {
    pub async fn record(&self, outcome: CycleOutcome) {
        *self.inner.write().await = Some(CycleReport {
            outcome,
            finished_at: Utc::now(),
        });
    }

    pub async fn last(&self) -> Option<CycleReport> {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_read_back() {
        let status = CycleStatus::default();
        assert!(status.last().await.is_none());

        status.record(CycleOutcome::NoUpdate).await;
        let report = status.last().await.expect("Report should exist");
        assert_eq!(report.outcome, CycleOutcome::NoUpdate);

        status.record(CycleOutcome::SwitchTriggered).await;
        let report = status.last().await.expect("Report should exist");
        assert_eq!(report.outcome, CycleOutcome::SwitchTriggered);
    }
}
