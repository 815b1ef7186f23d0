//! Per-video enrichment: topic and prerequisites facets.
//!
//! Each facet asks the completion service once per distinct cache key and
//! falls back deterministically when the call or the extraction fails. Both
//! facets are resolved before the record is touched, so a record is either
//! fully enriched or left as it was.

use std::time::Duration;

use tracing::{debug, instrument, warn};

use lessonpath_completion::{CompletionError, CompletionService, PromptRequest};
use lessonpath_shared::{AppConfig, ModelProfile, VideoRecord, naive_topic};

use crate::cache::{CacheKey, EnrichmentCache, Facet, Lookup};
use crate::extract::{ExtractError, extract_label, extract_list};
use crate::prompts;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Model parameters for one kind of completion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacetSettings {
    pub profile: ModelProfile,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl FacetSettings {
    pub fn request(&self, prompt: String, timeout: Duration) -> PromptRequest {
        PromptRequest {
            profile: self.profile,
            prompt,
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            timeout,
        }
    }
}

/// Settings for both item facets.
#[derive(Debug, Clone, PartialEq)]
pub struct EnricherSettings {
    pub topic: FacetSettings,
    pub prerequisites: FacetSettings,
    pub timeout: Duration,
}

impl Default for EnricherSettings {
    fn default() -> Self {
        Self {
            topic: FacetSettings {
                profile: ModelProfile::Smart,
                temperature: 0.25,
                max_output_tokens: 50,
            },
            prerequisites: FacetSettings {
                profile: ModelProfile::Smart,
                temperature: 0.2,
                max_output_tokens: 200,
            },
            timeout: Duration::from_secs(30),
        }
    }
}

impl EnricherSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let mut settings = Self::default();
        settings.topic.profile = config.enrichment.topic_profile;
        settings.prerequisites.profile = config.enrichment.prerequisites_profile;
        settings.timeout = config.openrouter.timeout();
        settings
    }
}

// ---------------------------------------------------------------------------
// Outcomes and errors
// ---------------------------------------------------------------------------

/// A facet value plus whether it came from the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetOutcome<T> {
    pub value: T,
    pub from_model: bool,
}

impl<T> FacetOutcome<T> {
    fn model(value: T) -> Self {
        Self {
            value,
            from_model: true,
        }
    }

    fn fallback(value: T) -> Self {
        Self {
            value,
            from_model: false,
        }
    }
}

/// Why the model path of a facet produced nothing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FacetError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// A record that cannot be enriched at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnrichError {
    #[error("record has no video_id")]
    MissingId,
    #[error("video {video_id} has no title")]
    MissingTitle { video_id: String },
}

/// What enriching one item did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemReport {
    /// Completion calls made (cache misses).
    pub live_calls: usize,
    pub topic_from_model: bool,
    pub prerequisites_from_model: bool,
}

// ---------------------------------------------------------------------------
// ItemEnricher
// ---------------------------------------------------------------------------

/// Enriches single records, memoizing facet outcomes for the run.
pub struct ItemEnricher<'c> {
    client: &'c dyn CompletionService,
    settings: EnricherSettings,
    topics: EnrichmentCache<FacetOutcome<String>>,
    prerequisites: EnrichmentCache<FacetOutcome<Vec<String>>>,
}

impl<'c> ItemEnricher<'c> {
    pub fn new(client: &'c dyn CompletionService, settings: EnricherSettings) -> Self {
        Self {
            client,
            settings,
            topics: EnrichmentCache::new(),
            prerequisites: EnrichmentCache::new(),
        }
    }

    pub fn cache_hits(&self) -> usize {
        self.topics.hits() + self.prerequisites.hits()
    }

    pub fn cache_misses(&self) -> usize {
        self.topics.misses() + self.prerequisites.misses()
    }

    /// Enrich `video` in place.
    ///
    /// Overwrites `topic`, `prerequisite_topics` and `enhanced_with_llm`.
    /// Returns an error, leaving the record untouched, only when the record
    /// itself is unusable.
    #[instrument(skip_all, fields(video_id = %video.video_id))]
    pub async fn enrich(&mut self, video: &mut VideoRecord) -> Result<ItemReport, EnrichError> {
        validate(video)?;

        let topic = self.topic_facet(video).await;
        let prerequisites = self.prerequisites_facet(video).await;

        let live_calls = usize::from(!topic.is_hit()) + usize::from(!prerequisites.is_hit());
        let topic = topic.into_value();
        let prerequisites = prerequisites.into_value();

        let report = ItemReport {
            live_calls,
            topic_from_model: topic.from_model,
            prerequisites_from_model: prerequisites.from_model,
        };

        video.topic = topic.value;
        video.prerequisite_topics = prerequisites.value;
        video.enhanced_with_llm = topic.from_model;

        debug!(
            topic = %video.topic,
            prerequisites = video.prerequisite_topics.len(),
            live_calls,
            "video enriched"
        );

        Ok(report)
    }

    async fn topic_facet(&mut self, video: &VideoRecord) -> Lookup<FacetOutcome<String>> {
        let key = CacheKey::topic(&video.title, &video.domain);
        let client = self.client;
        let settings = self.settings.topic;
        let timeout = self.settings.timeout;

        self.topics
            .get_or_compute(key, || async move {
                let request = settings.request(prompts::topic_prompt(video), timeout);
                match ask(client, &request, extract_label).await {
                    Ok(label) => FacetOutcome::model(label),
                    Err(e) => {
                        log_fallback(Facet::Topic, &video.video_id, &e);
                        FacetOutcome::fallback(naive_topic(&video.title))
                    }
                }
            })
            .await
    }

    async fn prerequisites_facet(&mut self, video: &VideoRecord) -> Lookup<FacetOutcome<Vec<String>>> {
        let key = CacheKey::prerequisites(&video.title, &video.domain, video.level);
        let client = self.client;
        let settings = self.settings.prerequisites;
        let timeout = self.settings.timeout;

        self.prerequisites
            .get_or_compute(key, || async move {
                let request = settings.request(prompts::prerequisites_prompt(video), timeout);
                match ask(client, &request, extract_list).await {
                    Ok(list) => FacetOutcome::model(list),
                    Err(e) => {
                        log_fallback(Facet::Prerequisites, &video.video_id, &e);
                        FacetOutcome::fallback(Vec::new())
                    }
                }
            })
            .await
    }
}

/// One completion call followed by extraction.
pub(crate) async fn ask<T>(
    client: &dyn CompletionService,
    request: &PromptRequest,
    extract: fn(&str) -> Result<T, ExtractError>,
) -> Result<T, FacetError> {
    let text = client.complete(request).await?;
    Ok(extract(&text)?)
}

fn log_fallback(facet: Facet, video_id: &str, error: &FacetError) {
    match error {
        FacetError::Completion(e) => {
            warn!(facet = facet.as_str(), video_id, error = %e, "completion failed, using fallback");
        }
        FacetError::Extract(e) => {
            debug!(facet = facet.as_str(), video_id, error = %e, "unusable completion, using fallback");
        }
    }
}

fn validate(video: &VideoRecord) -> Result<(), EnrichError> {
    if video.video_id.trim().is_empty() {
        return Err(EnrichError::MissingId);
    }
    if video.title.trim().is_empty() {
        return Err(EnrichError::MissingTitle {
            video_id: video.video_id.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use lessonpath_shared::ProficiencyLevel;

    use super::*;
    use crate::testing::{ScriptedClient, is_prerequisites, is_topic};

    fn python_video(id: &str) -> VideoRecord {
        VideoRecord::new(id, "Learn Python Variables Fast").with_domain("python_programming")
    }

    #[tokio::test]
    async fn failing_service_yields_fallbacks() {
        let client = ScriptedClient::failing();
        let mut enricher = ItemEnricher::new(&client, EnricherSettings::default());
        let mut video = python_video("v1");

        let report = enricher.enrich(&mut video).await.expect("enrich");

        assert_eq!(video.topic, "learn_python_variables");
        assert!(video.prerequisite_topics.is_empty());
        assert!(!video.enhanced_with_llm);
        assert_eq!(report.live_calls, 2);
        assert!(!report.topic_from_model);
    }

    #[tokio::test]
    async fn model_answers_are_extracted_and_merged() {
        let client = ScriptedClient::new(|req| {
            if is_topic(req) {
                Ok("Topic: Python Variables".into())
            } else {
                Ok(r#"You will need: ["Basic Syntax", "data-types"]"#.into())
            }
        });
        let mut enricher = ItemEnricher::new(&client, EnricherSettings::default());
        let mut video = python_video("v1");

        let report = enricher.enrich(&mut video).await.expect("enrich");

        assert_eq!(video.topic, "topic_python_variables");
        assert_eq!(video.prerequisite_topics, vec!["basic_syntax", "data_types"]);
        assert!(video.enhanced_with_llm);
        assert!(report.topic_from_model && report.prerequisites_from_model);
    }

    #[tokio::test]
    async fn identical_title_and_domain_hit_the_cache() {
        let client = ScriptedClient::new(|req| {
            if is_topic(req) {
                Ok("python_variables".into())
            } else {
                Ok("[]".into())
            }
        });
        let mut enricher = ItemEnricher::new(&client, EnricherSettings::default());
        let mut first = python_video("v1");
        let mut second = python_video("v2");

        enricher.enrich(&mut first).await.expect("first");
        let report = enricher.enrich(&mut second).await.expect("second");

        assert_eq!(client.calls_where(is_topic), 1);
        assert_eq!(first.topic, second.topic);
        assert_eq!(report.live_calls, 0);
        assert_eq!(enricher.cache_hits(), 2);
    }

    #[tokio::test]
    async fn level_is_part_of_the_prerequisites_key() {
        let client = ScriptedClient::new(|req| {
            if is_topic(req) {
                Ok("python_variables".into())
            } else {
                Ok(r#"["python_basics"]"#.into())
            }
        });
        let mut enricher = ItemEnricher::new(&client, EnricherSettings::default());
        let mut beginner = python_video("v1").with_level(ProficiencyLevel::Beginner);
        let mut advanced = python_video("v2").with_level(ProficiencyLevel::Advanced);

        enricher.enrich(&mut beginner).await.expect("beginner");
        let report = enricher.enrich(&mut advanced).await.expect("advanced");

        assert_eq!(client.calls_where(is_topic), 1);
        assert_eq!(client.calls_where(is_prerequisites), 2);
        assert_eq!(report.live_calls, 1);
    }

    #[tokio::test]
    async fn fallback_outcomes_are_cached_too() {
        let client = ScriptedClient::failing();
        let mut enricher = ItemEnricher::new(&client, EnricherSettings::default());

        enricher.enrich(&mut python_video("v1")).await.expect("v1");
        enricher.enrich(&mut python_video("v2")).await.expect("v2");

        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn unparseable_prerequisites_fall_back_to_empty() {
        let client = ScriptedClient::new(|req| {
            if is_topic(req) {
                Ok("python_variables".into())
            } else {
                Ok("python basics, then numpy".into())
            }
        });
        let mut enricher = ItemEnricher::new(&client, EnricherSettings::default());
        let mut video = python_video("v1");
        video.prerequisite_topics = vec!["stale".into()];

        let report = enricher.enrich(&mut video).await.expect("enrich");

        assert!(video.prerequisite_topics.is_empty());
        assert!(video.enhanced_with_llm);
        assert!(!report.prerequisites_from_model);
    }

    #[tokio::test]
    async fn prerequisites_never_exceed_six() {
        let client = ScriptedClient::new(|req| {
            if is_topic(req) {
                Ok("t".into())
            } else {
                Ok(r#"["a","b","c","d","e","f","g","h","i"]"#.into())
            }
        });
        let mut enricher = ItemEnricher::new(&client, EnricherSettings::default());
        let mut video = python_video("v1");

        enricher.enrich(&mut video).await.expect("enrich");

        assert_eq!(video.prerequisite_topics.len(), 6);
    }

    #[tokio::test]
    async fn requests_use_configured_profiles_and_limits() {
        let client = ScriptedClient::new(|_| Ok("[]".into()));
        let mut settings = EnricherSettings::default();
        settings.topic.profile = ModelProfile::Fast;
        let mut enricher = ItemEnricher::new(&client, settings);

        enricher.enrich(&mut python_video("v1")).await.expect("enrich");

        assert_eq!(
            client.calls_where(|r| is_topic(r)
                && r.profile == ModelProfile::Fast
                && r.max_output_tokens == 50),
            1
        );
        assert_eq!(
            client.calls_where(|r| is_prerequisites(r)
                && r.profile == ModelProfile::Smart
                && r.max_output_tokens == 200),
            1
        );
    }

    #[tokio::test]
    async fn invalid_records_are_rejected_untouched() {
        let client = ScriptedClient::failing();
        let mut enricher = ItemEnricher::new(&client, EnricherSettings::default());

        let mut no_id = VideoRecord::new("", "Some Title");
        let before = no_id.clone();
        assert_eq!(enricher.enrich(&mut no_id).await, Err(EnrichError::MissingId));
        assert_eq!(no_id, before);

        let mut no_title = VideoRecord::new("v9", "   ");
        assert_eq!(
            enricher.enrich(&mut no_title).await,
            Err(EnrichError::MissingTitle {
                video_id: "v9".into()
            })
        );
        assert_eq!(client.calls(), 0);
    }
}
