//! Full run against a mock OpenRouter endpoint.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lessonpath_completion::OpenRouterClient;
use lessonpath_core::batch::PacingPolicy;
use lessonpath_core::pipeline::{PipelineConfig, SilentEnrichmentProgress, run_pipeline};
use lessonpath_core::snapshot::{DatasetEntry, load_snapshot, parse_dataset, write_snapshot};
use lessonpath_shared::{ModelsConfig, OpenRouterConfig, RunId, VideoRecord};

const TOPIC: &str = "Extract a concise";
const PREREQUISITES: &str = "Identify the prerequisite";
const PATHWAY: &str = "Create a learning pathway";

fn chat(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "gen-e2e",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    }))
}

async fn mount_topic(server: &MockServer, title: &str, answer: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(body_string_contains(TOPIC))
        .and(body_string_contains(format!("Title: {title}")))
        .respond_with(answer)
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn enriches_caches_and_validates_pathways() {
    let server = MockServer::start().await;

    mount_topic(&server, "HTML Basics", chat("html_basics"), 1).await;
    mount_topic(&server, "CSS Layout", chat("CSS Layout"), 1).await;
    mount_topic(&server, "JavaScript Intro", chat("javascript_intro\n"), 1).await;
    mount_topic(
        &server,
        "Pandas DataFrames Explained",
        ResponseTemplate::new(503).set_body_string("upstream overloaded"),
        1,
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(body_string_contains(PREREQUISITES))
        .respond_with(chat(r#"Prerequisites: ["Computer Basics", "text-editors"]"#))
        .expect(4)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(body_string_contains(PATHWAY))
        .and(body_string_contains("web_development"))
        .respond_with(chat(
            r#"{"beginner_path": ["html_basics", "css_layout"], "advanced_path": ["javascript_intro", "webassembly"]}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let input = r#"{
        "metadata": {"processing_date": "2024-05-01T10:00:00", "statistics": {"videos": 5}},
        "videos": [
            {"video_id": "v1", "title": "HTML Basics", "skill_path": "web_development", "level": "beginner"},
            {"video_id": "v2", "title": "CSS Layout", "skill_path": "web_development", "level": "beginner"},
            {"video_id": "v3", "title": "JavaScript Intro", "skill_path": "web_development"},
            {"video_id": "v4", "title": "HTML Basics", "skill_path": "web_development", "level": "beginner"},
            {"video_id": "v5", "title": "Pandas DataFrames Explained", "skill_path": "data_science", "duration": 612},
            {"video_id": "v6", "title": 42, "skill_path": "data_science"}
        ]
    }"#;
    let dataset = parse_dataset(input).expect("parse input");

    let settings = OpenRouterConfig {
        base_url: format!("{}/api/v1", server.uri()),
        ..OpenRouterConfig::default()
    };
    let client =
        OpenRouterClient::new("test-key", &settings, ModelsConfig::default()).expect("client");

    let mut config = PipelineConfig::default();
    config.pacing = PacingPolicy::unpaced(2);
    config.enricher.timeout = Duration::from_secs(5);

    let result = run_pipeline(&config, &client, dataset, &SilentEnrichmentProgress).await;
    let snapshot = &result.snapshot;

    let videos: Vec<&VideoRecord> = snapshot.videos.iter().filter_map(DatasetEntry::as_video).collect();
    let topics: Vec<&str> = videos.iter().map(|v| v.topic.as_str()).collect();
    assert_eq!(
        topics,
        vec![
            "html_basics",
            "css_layout",
            "javascript_intro",
            "html_basics",
            "pandas_dataframes_explained"
        ]
    );
    for video in &videos {
        assert_eq!(video.prerequisite_topics, vec!["computer_basics", "text_editors"]);
    }
    assert!(!videos[4].enhanced_with_llm);
    assert_eq!(videos[4].extra["duration"], 612);
    assert_eq!(
        snapshot.videos[5],
        DatasetEntry::Unreadable(json!({"video_id": "v6", "title": 42, "skill_path": "data_science"}))
    );

    assert_eq!(snapshot.metadata.total_videos, 6);
    assert_eq!(snapshot.metadata.enhanced_with_llm, 4);
    assert_eq!(snapshot.metadata.models_used.topic, ModelsConfig::default().smart);
    assert_eq!(snapshot.metadata.original_statistics, Some(json!({"videos": 5})));

    assert_eq!(snapshot.learning_pathways.len(), 1);
    let web = &snapshot.learning_pathways["web_development"];
    assert_eq!(web.beginner_path, vec!["html_basics", "css_layout"]);
    assert!(web.intermediate_path.is_empty());
    assert!(web.advanced_path.is_empty());

    assert_eq!(result.summary.processed, 5);
    assert_eq!(result.summary.failed, 1);
    assert_eq!(result.summary.failures[0].0, "v6");
    assert_eq!(result.summary.cache_hits, 2);
    assert_eq!(result.report.metrics.pathway_count, 1);

    let dir = std::env::temp_dir().join(format!("lessonpath-e2e-{}", RunId::new()));
    let out = dir.join("enhanced_learning_data.json");
    write_snapshot(&out, snapshot).expect("write snapshot");
    let reloaded = load_snapshot(&out).expect("reload snapshot");
    assert_eq!(&reloaded, snapshot);
    let _ = std::fs::remove_dir_all(&dir);
}
