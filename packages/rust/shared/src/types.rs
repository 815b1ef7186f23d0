//! Core domain types for lessonpath enrichment runs.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Domain assigned to videos that arrive without a `skill_path`.
pub const DEFAULT_DOMAIN: &str = "general";

/// Label used when a title yields no usable characters at all.
const UNTITLED_TOPIC: &str = "untitled";

/// Separator used inside normalized labels.
pub const LABEL_SEPARATOR: char = '_';

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying a single enrichment run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// ModelProfile
// ---------------------------------------------------------------------------

/// Capability tier used to pick a concrete provider model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelProfile {
    Fast,
    Balanced,
    Smart,
    Vision,
    LongContext,
}

impl ModelProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Smart => "smart",
            Self::Vision => "vision",
            Self::LongContext => "long_context",
        }
    }
}

impl std::fmt::Display for ModelProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "smart" => Ok(Self::Smart),
            "vision" => Ok(Self::Vision),
            "long_context" | "long-context" => Ok(Self::LongContext),
            other => Err(format!(
                "unknown model profile '{other}': expected fast, balanced, smart, vision, or long_context"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// ProficiencyLevel
// ---------------------------------------------------------------------------

/// Target audience level of a video.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProficiencyLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl ProficiencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    /// Parse a level label, mapping anything unrecognized to the default.
    pub fn from_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "beginner" => Self::Beginner,
            "advanced" => Self::Advanced,
            _ => Self::Intermediate,
        }
    }
}

impl std::fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lenient_level<'de, D>(deserializer: D) -> std::result::Result<ProficiencyLevel, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(raw) => ProficiencyLevel::from_lenient(&raw),
        _ => ProficiencyLevel::default(),
    })
}

/// `null` reads as the type's default.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Ids arrive as strings or bare numbers; `null` reads as empty.
fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("video_id must be text or a number, got {other}"))),
    }
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.into()
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Normalize free text into a topic label.
///
/// Lowercases, collapses runs of whitespace, hyphens and underscores into a
/// single `_`, and drops every other non-alphanumeric character. The result
/// never starts or ends with the separator. May be empty.
pub fn normalize_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for ch in raw.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || ch == '-' || ch == LABEL_SEPARATOR {
            pending_separator = true;
        } else if ch.is_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push(LABEL_SEPARATOR);
            }
            pending_separator = false;
            out.push(ch);
        }
    }

    out
}

/// Deterministic, network-free topic derived from the first three words of a title.
pub fn naive_topic(title: &str) -> String {
    let joined = title
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();

    let label = normalize_label(&joined);
    if label.is_empty() {
        UNTITLED_TOPIC.into()
    } else {
        label
    }
}

// ---------------------------------------------------------------------------
// VideoRecord
// ---------------------------------------------------------------------------

/// One educational video, as produced by the acquisition stage and
/// mutated in place by enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Unique content identifier.
    #[serde(default, deserialize_with = "lenient_id")]
    pub video_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    /// `None` when the source record carried no description at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Taxonomy label (skill path) used for pathway grouping.
    #[serde(
        rename = "skill_path",
        alias = "domain",
        default = "default_domain",
        deserialize_with = "nullable"
    )]
    pub domain: String,
    #[serde(default, deserialize_with = "lenient_level")]
    pub level: ProficiencyLevel,
    /// Free-text content sample, typically a transcript excerpt.
    #[serde(default, deserialize_with = "nullable")]
    pub content: String,
    /// Normalized topic label.
    #[serde(default, deserialize_with = "nullable")]
    pub topic: String,
    #[serde(default, deserialize_with = "nullable")]
    pub prerequisite_topics: Vec<String>,
    /// Whether the topic came from the model rather than the fallback.
    #[serde(default, deserialize_with = "nullable")]
    pub enhanced_with_llm: bool,
    /// Fields from the source record this tool does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl VideoRecord {
    /// Create a record with defaults for everything but identity and title.
    pub fn new(video_id: impl Into<String>, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            video_id: video_id.into(),
            topic: naive_topic(&title),
            title,
            description: None,
            domain: default_domain(),
            level: ProficiencyLevel::default(),
            content: String::new(),
            prerequisite_topics: Vec::new(),
            enhanced_with_llm: false,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_level(mut self, level: ProficiencyLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Apply input defaults that serde cannot express (derived topic, blank domain).
    pub fn fill_defaults(&mut self) {
        if self.domain.trim().is_empty() {
            self.domain = default_domain();
        }
        if self.topic.trim().is_empty() {
            self.topic = naive_topic(&self.title);
        }
    }

    /// Description text, or a content excerpt of `excerpt_chars` when the
    /// source record had no description field.
    pub fn description_or_excerpt(&self, excerpt_chars: usize) -> String {
        match &self.description {
            Some(description) => description.clone(),
            None => self.content.chars().take(excerpt_chars).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// LearningPathway
// ---------------------------------------------------------------------------

/// Difficulty-bucketed topic ordering for one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningPathway {
    #[serde(default)]
    pub beginner_path: Vec<String>,
    #[serde(default)]
    pub intermediate_path: Vec<String>,
    #[serde(default)]
    pub advanced_path: Vec<String>,
}

impl LearningPathway {
    /// True when no bucket holds a topic.
    pub fn is_empty(&self) -> bool {
        self.beginner_path.is_empty()
            && self.intermediate_path.is_empty()
            && self.advanced_path.is_empty()
    }

    /// Every topic across all buckets, beginner first.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.beginner_path
            .iter()
            .chain(&self.intermediate_path)
            .chain(&self.advanced_path)
            .map(String::as_str)
    }
}
