//! Sequential batch enrichment with time-based pacing.

use std::time::Duration;

use tracing::{info, instrument, warn};

use lessonpath_shared::PacingConfig;

use crate::enricher::ItemEnricher;
use crate::pipeline::EnrichmentProgress;
use crate::snapshot::DatasetEntry;

/// Pauses applied between items to stay under provider rate limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingPolicy {
    /// Items per batch; a batch pause follows every full batch.
    pub batch_size: usize,
    pub batch_pause: Duration,
    /// Applied after an item that made at least one live call.
    pub item_pause: Duration,
}

impl PacingPolicy {
    /// No pauses at all.
    pub fn unpaced(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batch_pause: Duration::ZERO,
            item_pause: Duration::ZERO,
        }
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::from(&PacingConfig::default())
    }
}

impl From<&PacingConfig> for PacingPolicy {
    fn from(config: &PacingConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            batch_pause: Duration::from_millis(config.batch_pause_ms),
            item_pause: Duration::from_millis(config.item_pause_ms),
        }
    }
}

/// Counters for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
    /// `(video_id, reason)` for every record that could not be enriched.
    pub failures: Vec<(String, String)>,
    pub live_calls: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

/// Enrich every record in input order.
///
/// Unreadable records and records that fail item-level validation are
/// logged and left exactly as they were; the run always continues to the
/// end of the slice.
#[instrument(skip_all, fields(videos = videos.len(), batch_size = pacing.batch_size))]
pub async fn enrich_all(
    enricher: &mut ItemEnricher<'_>,
    videos: &mut [DatasetEntry],
    pacing: &PacingPolicy,
    progress: &dyn EnrichmentProgress,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    let total = videos.len();
    let batch_size = pacing.batch_size.max(1);

    progress.phase("Enriching videos");

    for (index, entry) in videos.iter_mut().enumerate() {
        let position = index + 1;

        let made_live_call = match entry {
            DatasetEntry::Video(video) => {
                progress.item_progress(position, total, &video.title);
                match enricher.enrich(video).await {
                    Ok(report) => {
                        summary.processed += 1;
                        summary.live_calls += report.live_calls;
                        report.live_calls > 0
                    }
                    Err(e) => {
                        warn!(video_id = %video.video_id, error = %e, "enrichment failed, record left unchanged");
                        summary.failed += 1;
                        summary.failures.push((video.video_id.clone(), e.to_string()));
                        false
                    }
                }
            }
            DatasetEntry::Unreadable(_) => {
                let label = entry
                    .video_id()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("#{position}"));
                progress.item_progress(position, total, &label);
                warn!(record = %label, "unreadable record left unchanged");
                summary.failed += 1;
                summary
                    .failures
                    .push((label, "record could not be read as a video".to_string()));
                false
            }
        };

        if position == total {
            break;
        }

        if made_live_call && !pacing.item_pause.is_zero() {
            tokio::time::sleep(pacing.item_pause).await;
        }

        if position % batch_size == 0 {
            info!(done = position, total, "batch complete");
            if !pacing.batch_pause.is_zero() {
                tokio::time::sleep(pacing.batch_pause).await;
            }
        }
    }

    summary.cache_hits = enricher.cache_hits();
    summary.cache_misses = enricher.cache_misses();

    info!(
        processed = summary.processed,
        failed = summary.failed,
        live_calls = summary.live_calls,
        cache_hits = summary.cache_hits,
        cache_misses = summary.cache_misses,
        "batch enrichment complete"
    );

    summary
}
