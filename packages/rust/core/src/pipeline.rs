//! End-to-end enrichment run: dataset → enriched records → pathways → snapshot.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, instrument};

use lessonpath_completion::CompletionService;
use lessonpath_shared::{AppConfig, RunId};

use crate::batch::{BatchSummary, PacingPolicy, enrich_all};
use crate::enricher::{EnricherSettings, ItemEnricher};
use crate::pathways::{PathwaySettings, synthesize_pathways};
use crate::report::QualityReport;
use crate::snapshot::{DatasetEntry, EnrichedSnapshot, InputDataset, ModelsUsed, SnapshotMetadata};

// ---------------------------------------------------------------------------
// Progress trait
// ---------------------------------------------------------------------------

/// Progress callback for enrichment runs.
pub trait EnrichmentProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Item-level progress within the current phase.
    fn item_progress(&self, current: usize, total: usize, detail: &str);
}

/// No-op enrichment progress.
pub struct SilentEnrichmentProgress;

impl EnrichmentProgress for SilentEnrichmentProgress {
    fn phase(&self, _name: &str) {}
    fn item_progress(&self, _current: usize, _total: usize, _detail: &str) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub enricher: EnricherSettings,
    /// `None` skips pathway synthesis.
    pub pathways: Option<PathwaySettings>,
    pub pacing: PacingPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enricher: EnricherSettings::default(),
            pathways: Some(PathwaySettings::default()),
            pacing: PacingPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            enricher: EnricherSettings::from_config(config),
            pathways: Some(PathwaySettings::from_config(config)),
            pacing: PacingPolicy::from(&config.pacing),
        }
    }
}

/// Everything a run produced.
#[derive(Debug)]
pub struct PipelineResult {
    pub snapshot: EnrichedSnapshot,
    pub summary: BatchSummary,
    pub report: QualityReport,
    pub elapsed: Duration,
}

/// Run enrichment and pathway synthesis over `dataset`.
///
/// Never fails: item and pathway failures degrade to fallbacks or omissions,
/// and the returned snapshot always holds every input record.
#[instrument(skip_all, fields(videos = dataset.videos.len()))]
pub async fn run_pipeline(
    config: &PipelineConfig,
    client: &dyn CompletionService,
    dataset: InputDataset,
    progress: &dyn EnrichmentProgress,
) -> PipelineResult {
    let start = Instant::now();
    let run_id = RunId::new();
    let InputDataset { metadata, mut videos } = dataset;

    info!(%run_id, videos = videos.len(), "starting enrichment run");

    let mut enricher = ItemEnricher::new(client, config.enricher.clone());
    let summary = enrich_all(&mut enricher, &mut videos, &config.pacing, progress).await;

    let learning_pathways = match &config.pathways {
        Some(settings) => {
            let typed = videos.iter().filter_map(DatasetEntry::as_video);
            synthesize_pathways(client, typed, settings, progress).await
        }
        None => {
            info!("pathway synthesis disabled");
            Default::default()
        }
    };

    progress.phase("Building report");

    let models_used = ModelsUsed {
        topic: client.model_for(config.enricher.topic.profile),
        prerequisites: client.model_for(config.enricher.prerequisites.profile),
        pathways: config
            .pathways
            .as_ref()
            .map(|p| client.model_for(p.call.profile)),
    };

    let report = QualityReport::from_run(&videos, &learning_pathways);

    let snapshot = EnrichedSnapshot {
        metadata: SnapshotMetadata {
            run_id,
            total_videos: videos.len(),
            enhanced_with_llm: report.metrics.enhanced,
            processing_date: Utc::now(),
            models_used,
            source_processing_date: metadata.processing_date,
            original_statistics: metadata.statistics,
        },
        videos,
        learning_pathways,
    };

    let elapsed = start.elapsed();

    info!(
        run_id = %snapshot.metadata.run_id,
        total_videos = snapshot.metadata.total_videos,
        enhanced = snapshot.metadata.enhanced_with_llm,
        pathways = snapshot.learning_pathways.len(),
        elapsed_ms = elapsed.as_millis(),
        "enrichment run complete"
    );

    PipelineResult {
        snapshot,
        summary,
        report,
        elapsed,
    }
}
