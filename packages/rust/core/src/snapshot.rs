//! Input dataset loading and enriched snapshot persistence.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use lessonpath_shared::{LearningPathway, LessonpathError, Result, RunId, VideoRecord};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Metadata block of an input document. Only the fields carried into the
/// output are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputMetadata {
    pub processing_date: Option<String>,
    pub statistics: Option<Value>,
}

impl InputMetadata {
    fn from_value(metadata: Option<&Value>) -> Self {
        let Some(metadata) = metadata else {
            return Self::default();
        };
        Self {
            processing_date: metadata
                .get("processing_date")
                .and_then(Value::as_str)
                .map(str::to_string),
            statistics: metadata.get("statistics").cloned(),
        }
    }
}

/// One source record: a typed video, or something that could not be read as
/// one and is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasetEntry {
    Video(VideoRecord),
    Unreadable(Value),
}

impl DatasetEntry {
    /// Type a raw record, applying input defaults. Never fails.
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<VideoRecord>(value.clone()) {
            Ok(mut video) => {
                video.fill_defaults();
                Self::Video(video)
            }
            Err(e) => {
                warn!(error = %e, "unreadable video record, carried through unchanged");
                Self::Unreadable(value)
            }
        }
    }

    pub fn as_video(&self) -> Option<&VideoRecord> {
        match self {
            Self::Video(video) => Some(video),
            Self::Unreadable(_) => None,
        }
    }

    /// Best-effort id for logs and failure reports.
    pub fn video_id(&self) -> Option<&str> {
        match self {
            Self::Video(video) => Some(video.video_id.as_str()),
            Self::Unreadable(raw) => raw.get("video_id").and_then(Value::as_str),
        }
    }
}

/// Records to enrich, plus whatever source metadata came with them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputDataset {
    pub metadata: InputMetadata,
    pub videos: Vec<DatasetEntry>,
}

impl InputDataset {
    /// Typed videos, skipping unreadable entries.
    pub fn typed_videos(&self) -> impl Iterator<Item = &VideoRecord> {
        self.videos.iter().filter_map(DatasetEntry::as_video)
    }
}

/// Parse `{ "metadata": {...}?, "videos": [...] }` or a bare array of videos.
///
/// Only the document shape is strict; each record is typed on its own, so
/// one malformed record never rejects its neighbours.
pub fn parse_dataset(text: &str) -> Result<InputDataset> {
    let document: Value = serde_json::from_str(text)
        .map_err(|e| LessonpathError::parse(format!("input is not valid JSON: {e}")))?;

    let (metadata, records) = match document {
        Value::Array(records) => (InputMetadata::default(), records),
        Value::Object(mut object) => {
            let metadata = InputMetadata::from_value(object.get("metadata"));
            match object.remove("videos") {
                Some(Value::Array(records)) => (metadata, records),
                _ => {
                    return Err(LessonpathError::parse(
                        "invalid input document: `videos` must be a JSON array",
                    ));
                }
            }
        }
        _ => {
            return Err(LessonpathError::parse(
                "input must be a JSON object with a `videos` list or a JSON array",
            ));
        }
    };

    Ok(InputDataset {
        metadata,
        videos: records.into_iter().map(DatasetEntry::from_value).collect(),
    })
}

pub fn load_dataset(path: &Path) -> Result<InputDataset> {
    let text = std::fs::read_to_string(path).map_err(|e| LessonpathError::io(path, e))?;
    let dataset = parse_dataset(&text)?;
    info!(
        path = %path.display(),
        videos = dataset.videos.len(),
        readable = dataset.typed_videos().count(),
        "loaded input dataset"
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Model ids actually used for each call kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelsUsed {
    pub topic: String,
    pub prerequisites: String,
    /// Absent when pathway synthesis was disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pathways: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub run_id: RunId,
    pub total_videos: usize,
    /// Count of records whose topic came from the model.
    pub enhanced_with_llm: usize,
    pub processing_date: DateTime<Utc>,
    pub models_used: ModelsUsed,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_processing_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_statistics: Option<Value>,
}

/// The persisted result of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedSnapshot {
    pub metadata: SnapshotMetadata,
    pub videos: Vec<DatasetEntry>,
    #[serde(default)]
    pub learning_pathways: BTreeMap<String, LearningPathway>,
}

/// Write the snapshot as pretty JSON via a temp file and rename, so an
/// interrupted write never leaves a partial file at `path`.
pub fn write_snapshot(path: &Path, snapshot: &EnrichedSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| LessonpathError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(snapshot).map_err(|e| {
        LessonpathError::validation(format!("snapshot serialization failed: {e}"))
    })?;

    let file_name = path
        .file_name()
        .ok_or_else(|| LessonpathError::validation(format!("not a file path: {}", path.display())))?;
    let temp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    std::fs::write(&temp, json).map_err(|e| LessonpathError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| LessonpathError::io(path, e))?;

    debug!(path = %path.display(), videos = snapshot.videos.len(), "wrote snapshot");
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<EnrichedSnapshot> {
    let text = std::fs::read_to_string(path).map_err(|e| LessonpathError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| {
        LessonpathError::parse(format!("{} is not an enriched snapshot: {e}", path.display()))
    })
}
