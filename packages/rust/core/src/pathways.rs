//! Per-domain learning pathway synthesis.
//!
//! One completion call per domain with enough distinct topics. The answer is
//! trusted only as far as it stays inside the domain's observed topic set: a
//! bucket naming any unknown topic is discarded whole.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use lessonpath_completion::CompletionService;
use lessonpath_shared::{
    AppConfig, LearningPathway, ModelProfile, ProficiencyLevel, VideoRecord, normalize_label,
};

use crate::enricher::{FacetSettings, ask};
use crate::extract::{MAX_LIST_ITEMS, extract_keyed_lists};
use crate::pipeline::EnrichmentProgress;
use crate::prompts;

/// Domains with fewer distinct topics than this get no pathway.
pub const MIN_DISTINCT_TOPICS: usize = 3;

/// Call parameters for pathway synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct PathwaySettings {
    pub call: FacetSettings,
    pub timeout: Duration,
}

impl Default for PathwaySettings {
    fn default() -> Self {
        Self {
            call: FacetSettings {
                profile: ModelProfile::Smart,
                temperature: 0.25,
                max_output_tokens: 300,
            },
            timeout: Duration::from_secs(30),
        }
    }
}

impl PathwaySettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let mut settings = Self::default();
        settings.call.profile = config.enrichment.pathway_profile;
        settings.timeout = config.openrouter.timeout();
        settings
    }
}

/// Distinct topics observed in one domain, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainTopics {
    pub domain: String,
    pub topics: Vec<String>,
}

/// Group topics by domain, keeping first-seen order for both.
pub fn group_topics_by_domain<'a>(videos: impl IntoIterator<Item = &'a VideoRecord>) -> Vec<DomainTopics> {
    let mut groups: Vec<DomainTopics> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for video in videos {
        if video.topic.trim().is_empty() {
            continue;
        }
        let slot = *index.entry(video.domain.as_str()).or_insert_with(|| {
            groups.push(DomainTopics {
                domain: video.domain.clone(),
                topics: Vec::new(),
            });
            groups.len() - 1
        });
        let topics = &mut groups[slot].topics;
        if !topics.contains(&video.topic) {
            topics.push(video.topic.clone());
        }
    }

    groups
}

/// Ask for an ordering of each eligible domain's topics and keep what validates.
#[instrument(skip_all)]
pub async fn synthesize_pathways<'a>(
    client: &dyn CompletionService,
    videos: impl IntoIterator<Item = &'a VideoRecord>,
    settings: &PathwaySettings,
    progress: &dyn EnrichmentProgress,
) -> BTreeMap<String, LearningPathway> {
    let eligible: Vec<DomainTopics> = group_topics_by_domain(videos)
        .into_iter()
        .filter(|group| {
            let enough = group.topics.len() >= MIN_DISTINCT_TOPICS;
            if !enough {
                debug!(domain = %group.domain, topics = group.topics.len(), "too few topics for a pathway");
            }
            enough
        })
        .collect();

    progress.phase("Synthesizing learning pathways");

    let mut pathways = BTreeMap::new();
    let total = eligible.len();

    for (i, group) in eligible.iter().enumerate() {
        progress.item_progress(i + 1, total, &group.domain);

        let prompt = prompts::pathway_prompt(&group.domain, &group.topics);
        let request = settings.call.request(prompt, settings.timeout);

        let buckets = match ask(client, &request, extract_keyed_lists).await {
            Ok(buckets) => buckets,
            Err(e) => {
                warn!(domain = %group.domain, error = %e, "pathway synthesis failed, domain omitted");
                continue;
            }
        };

        match validate_pathway(&group.domain, buckets, &group.topics) {
            Some(pathway) => {
                pathways.insert(group.domain.clone(), pathway);
            }
            None => {
                warn!(domain = %group.domain, "no valid pathway buckets, domain omitted");
            }
        }
    }

    info!(
        eligible_domains = total,
        pathways = pathways.len(),
        "pathway synthesis complete"
    );

    pathways
}

/// Keep only buckets whose every entry is a topic in `known`.
///
/// Membership is checked over the whole bucket after label normalization;
/// an entry with no usable characters counts as unknown. Surviving topics
/// are emitted in their observed spelling, without duplicates, capped at
/// [`MAX_LIST_ITEMS`]. Returns `None` when no non-empty bucket survives.
pub fn validate_pathway(
    domain: &str,
    buckets: BTreeMap<String, Vec<String>>,
    known: &[String],
) -> Option<LearningPathway> {
    let mut observed: HashMap<String, &str> = HashMap::new();
    for topic in known {
        let label = normalize_label(topic);
        if !label.is_empty() {
            observed.entry(label).or_insert(topic.as_str());
        }
    }

    let mut pathway = LearningPathway::default();

    for (key, topics) in buckets {
        let Some(level) = bucket_level(&key) else {
            debug!(domain, key = %key, "ignoring unknown pathway bucket");
            continue;
        };

        let unknown: Vec<&String> = topics
            .iter()
            .filter(|t| !observed.contains_key(normalize_label(t).as_str()))
            .collect();
        if !unknown.is_empty() {
            warn!(domain, bucket = %key, ?unknown, "bucket names unknown topics, dropped");
            continue;
        }

        let slot = match level {
            ProficiencyLevel::Beginner => &mut pathway.beginner_path,
            ProficiencyLevel::Intermediate => &mut pathway.intermediate_path,
            ProficiencyLevel::Advanced => &mut pathway.advanced_path,
        };
        if !slot.is_empty() {
            continue;
        }

        let mut seen = HashSet::new();
        for topic in &topics {
            let spelled = observed[normalize_label(topic).as_str()];
            if seen.insert(spelled) {
                slot.push(spelled.to_string());
            }
        }
        slot.truncate(MAX_LIST_ITEMS);
    }

    (!pathway.is_empty()).then_some(pathway)
}

/// `beginner_path` and bare `beginner` both name the beginner bucket.
fn bucket_level(key: &str) -> Option<ProficiencyLevel> {
    let key = normalize_label(key);
    match key.strip_suffix("_path").unwrap_or(&key) {
        "beginner" => Some(ProficiencyLevel::Beginner),
        "intermediate" => Some(ProficiencyLevel::Intermediate),
        "advanced" => Some(ProficiencyLevel::Advanced),
        _ => None,
    }
}
