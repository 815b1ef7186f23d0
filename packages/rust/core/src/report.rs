//! Run quality metrics, derived from the final records on demand.
//!
//! Unreadable records count toward the total and nowhere else.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use lessonpath_shared::LearningPathway;

use crate::snapshot::DatasetEntry;

/// Topics listed in the sample section of a [`QualityReport`].
pub const SAMPLE_TOPICS: usize = 5;

/// Prerequisites shown per sampled topic.
pub const SAMPLE_PREREQUISITES: usize = 3;

/// Aggregate enrichment metrics for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentReport {
    pub total_videos: usize,
    pub enhanced: usize,
    pub with_prerequisites: usize,
    pub average_prerequisites: f64,
    pub pathway_count: usize,
}

impl EnrichmentReport {
    pub fn from_run(entries: &[DatasetEntry], pathways: &BTreeMap<String, LearningPathway>) -> Self {
        let total_videos = entries.len();
        let videos: Vec<_> = entries.iter().filter_map(DatasetEntry::as_video).collect();
        let enhanced = videos.iter().filter(|v| v.enhanced_with_llm).count();
        let with_prerequisites = videos
            .iter()
            .filter(|v| !v.prerequisite_topics.is_empty())
            .count();
        let prerequisite_total: usize = videos.iter().map(|v| v.prerequisite_topics.len()).sum();

        Self {
            total_videos,
            enhanced,
            with_prerequisites,
            average_prerequisites: ratio(prerequisite_total, total_videos),
            pathway_count: pathways.len(),
        }
    }

    pub fn enhanced_pct(&self) -> f64 {
        ratio(self.enhanced, self.total_videos) * 100.0
    }

    pub fn with_prerequisites_pct(&self) -> f64 {
        ratio(self.with_prerequisites, self.total_videos) * 100.0
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// One enriched topic shown as a spot check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSample {
    pub topic: String,
    pub domain: String,
    pub prerequisites: Vec<String>,
}

/// Printable report: metrics plus the first few enriched topics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub metrics: EnrichmentReport,
    pub samples: Vec<TopicSample>,
}

impl QualityReport {
    pub fn from_run(entries: &[DatasetEntry], pathways: &BTreeMap<String, LearningPathway>) -> Self {
        let samples = entries
            .iter()
            .filter_map(DatasetEntry::as_video)
            .take(SAMPLE_TOPICS)
            .map(|v| TopicSample {
                topic: v.topic.clone(),
                domain: v.domain.clone(),
                prerequisites: v
                    .prerequisite_topics
                    .iter()
                    .take(SAMPLE_PREREQUISITES)
                    .cloned()
                    .collect(),
            })
            .collect();

        Self {
            metrics: EnrichmentReport::from_run(entries, pathways),
            samples,
        }
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metrics;
        writeln!(f, "Enrichment quality report")?;
        writeln!(
            f,
            "  Videos enhanced:          {}/{} ({:.1}%)",
            m.enhanced,
            m.total_videos,
            m.enhanced_pct()
        )?;
        writeln!(
            f,
            "  Videos with prerequisites: {}/{} ({:.1}%)",
            m.with_prerequisites,
            m.total_videos,
            m.with_prerequisites_pct()
        )?;
        writeln!(f, "  Average prerequisites:    {:.2}", m.average_prerequisites)?;
        writeln!(f, "  Learning pathways:        {}", m.pathway_count)?;

        if !self.samples.is_empty() {
            writeln!(f)?;
            writeln!(f, "Sample topics:")?;
            for (i, sample) in self.samples.iter().enumerate() {
                writeln!(f, "  {}. {} ({})", i + 1, sample.topic, sample.domain)?;
                if !sample.prerequisites.is_empty() {
                    writeln!(f, "     Prerequisites: {}", sample.prerequisites.join(", "))?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use lessonpath_shared::VideoRecord;
    use serde_json::json;

    use super::*;

    fn enriched(id: &str, prerequisites: &[&str], enhanced: bool) -> DatasetEntry {
        let mut video = VideoRecord::new(id, format!("Video {id}")).with_domain("web");
        video.prerequisite_topics = prerequisites.iter().map(|s| s.to_string()).collect();
        video.enhanced_with_llm = enhanced;
        DatasetEntry::Video(video)
    }

    #[test]
    fn metrics_from_records() {
        let videos = vec![
            enriched("1", &["a", "b"], true),
            enriched("2", &[], true),
            enriched("3", &["c", "d", "e", "f"], false),
            enriched("4", &[], false),
        ];
        let mut pathways = BTreeMap::new();
        pathways.insert("web".to_string(), LearningPathway::default());

        let report = EnrichmentReport::from_run(&videos, &pathways);

        assert_eq!(report.total_videos, 4);
        assert_eq!(report.enhanced, 2);
        assert_eq!(report.with_prerequisites, 2);
        assert!((report.average_prerequisites - 1.5).abs() < f64::EPSILON);
        assert_eq!(report.pathway_count, 1);
        assert!((report.enhanced_pct() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unreadable_records_count_only_toward_the_total() {
        let entries = vec![
            enriched("1", &["a", "b"], true),
            DatasetEntry::Unreadable(json!({"video_id": "2", "title": null, "content": 3})),
        ];

        let report = QualityReport::from_run(&entries, &BTreeMap::new());

        assert_eq!(report.metrics.total_videos, 2);
        assert_eq!(report.metrics.enhanced, 1);
        assert!((report.metrics.average_prerequisites - 1.0).abs() < f64::EPSILON);
        assert_eq!(report.samples.len(), 1);
        assert!(report.to_string().contains("Videos enhanced:          1/2 (50.0%)"));
    }

    #[test]
    fn zero_videos_do_not_divide_by_zero() {
        let report = EnrichmentReport::from_run(&[], &BTreeMap::new());
        assert_eq!(report.average_prerequisites, 0.0);
        assert_eq!(report.enhanced_pct(), 0.0);
        assert_eq!(report.with_prerequisites_pct(), 0.0);
    }

    #[test]
    fn display_lists_samples_with_three_prerequisites() {
        let videos: Vec<DatasetEntry> = (0..7)
            .map(|i| enriched(&i.to_string(), &["p1", "p2", "p3", "p4"], true))
            .collect();
        let text = QualityReport::from_run(&videos, &BTreeMap::new()).to_string();

        assert!(text.contains("Videos enhanced:          7/7 (100.0%)"));
        assert!(text.contains("  5. video_4 (web)"));
        assert!(!text.contains("  6. "));
        assert!(text.contains("Prerequisites: p1, p2, p3\n"));
        assert!(!text.contains("p4"));
    }
}
