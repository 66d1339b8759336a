// Wait Estimator - predicts wait time from historical service velocity

use crate::domain::{HistoryRecord, QueueId};
use crate::error::Result;
use crate::port::QueueStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// How many recent completions feed the velocity window
const SAMPLE_WINDOW: i64 = 10;

/// Minutes per person assumed until enough history exists
const FALLBACK_SERVICE_MINUTES: f64 = 5.0;

/// Converts recent completion history into a per-person service-time average
/// and produces wait-time predictions.
pub struct WaitEstimator {
    store: Arc<dyn QueueStore>,
}

impl WaitEstimator {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self { store }
    }

    /// Predicted wait in minutes for someone with `rank_ahead` active
    /// parties ahead of them. Zero ahead means zero wait.
    pub async fn predict(&self, queue_id: &QueueId, rank_ahead: i64) -> Result<i64> {
        if rank_ahead <= 0 {
            return Ok(0);
        }
        let avg = self.average_service_minutes(queue_id).await?;
        Ok(estimate_minutes(avg, rank_ahead))
    }

    /// Recompute and overwrite the estimate of every Waiting entry, in
    /// ascending position order. Best-effort: callers run this as a
    /// follow-up and a failure never aborts the triggering transition.
    pub async fn refresh_all(&self, queue_id: &QueueId) -> Result<()> {
        let avg = self.average_service_minutes(queue_id).await?;
        let waiting = self.store.waiting_entries(queue_id).await?;

        for (idx, entry) in waiting.iter().enumerate() {
            // The i-th waiting party still waits out the party being served,
            // hence rank i + 1.
            let minutes = estimate_minutes(avg, idx as i64 + 1);
            self.store.update_entry_estimate(&entry.id, minutes).await?;
        }

        debug!(
            queue_id = %queue_id,
            refreshed = waiting.len(),
            avg_service_minutes = avg,
            "Wait estimates refreshed"
        );
        Ok(())
    }

    /// Refresh wrapper for spawned follow-ups: logs and swallows errors
    pub async fn refresh_all_best_effort(&self, queue_id: &QueueId) {
        if let Err(e) = self.refresh_all(queue_id).await {
            warn!(queue_id = %queue_id, error = %e, "Wait estimate refresh failed");
        }
    }

    async fn average_service_minutes(&self, queue_id: &QueueId) -> Result<f64> {
        let recent = self
            .store
            .recent_completions(queue_id, SAMPLE_WINDOW)
            .await?;
        Ok(average_interval_minutes(&recent))
    }
}

/// Average minutes between consecutive completions across the sampled
/// window (newest first). With fewer than 2 samples there is no interval
/// to measure, so the fixed fallback applies.
fn average_interval_minutes(samples: &[HistoryRecord]) -> f64 {
    let served: Vec<i64> = samples.iter().filter_map(|h| h.served_at).collect();
    if served.len() < 2 {
        return FALLBACK_SERVICE_MINUTES;
    }
    let newest = served[0];
    let oldest = served[served.len() - 1];
    let total_minutes = (newest - oldest) as f64 / 60_000.0;
    total_minutes / (served.len() - 1) as f64
}

fn estimate_minutes(avg_service_minutes: f64, rank_ahead: i64) -> i64 {
    (avg_service_minutes * rank_ahead as f64).ceil() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HistoryStatus;

    fn completion(served_at: i64) -> HistoryRecord {
        HistoryRecord {
            id: format!("h{}", served_at),
            queue_id: "q1".to_string(),
            person_id: "p1".to_string(),
            entry_id: "e1".to_string(),
            joined_at: 0,
            served_at: Some(served_at),
            wait_minutes: 0,
            status: HistoryStatus::Completed,
            recorded_at: served_at,
        }
    }

    #[test]
    fn fallback_below_two_samples() {
        assert_eq!(average_interval_minutes(&[]), FALLBACK_SERVICE_MINUTES);
        assert_eq!(
            average_interval_minutes(&[completion(60_000)]),
            FALLBACK_SERVICE_MINUTES
        );
    }

    #[test]
    fn average_is_the_inter_completion_interval() {
        // 10 completions spaced exactly 4 minutes apart, newest first
        let four_minutes = 4 * 60_000;
        let samples: Vec<HistoryRecord> = (0..10)
            .map(|i| completion((10 - i) * four_minutes))
            .collect();

        let avg = average_interval_minutes(&samples);
        assert!((avg - 4.0).abs() < f64::EPSILON);
        assert_eq!(estimate_minutes(avg, 3), 12);
    }

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_minutes(2.5, 3), 8);
        assert_eq!(estimate_minutes(4.0, 0), 0);
    }

    #[test]
    fn uneven_spacing_averages_out() {
        // Intervals of 2, 4 and 6 minutes across 4 samples: (12 min) / 3
        let samples = vec![
            completion(12 * 60_000),
            completion(6 * 60_000),
            completion(2 * 60_000),
            completion(0),
        ];
        let avg = average_interval_minutes(&samples);
        assert!((avg - 4.0).abs() < f64::EPSILON);
    }
}
