//! Prompt templates for the topic, prerequisites, and pathway calls.

use lessonpath_shared::VideoRecord;

/// Description chars shown in the topic prompt.
pub const TOPIC_DESCRIPTION_CHARS: usize = 200;

/// Per-field limits for the prerequisites context block.
pub const CONTEXT_TITLE_CHARS: usize = 200;
pub const CONTEXT_DESCRIPTION_CHARS: usize = 300;
pub const CONTEXT_CONTENT_CHARS: usize = 500;

/// Most topics listed in a pathway prompt.
pub const PATHWAY_TOPIC_LIMIT: usize = 20;

/// Truncate to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

pub fn topic_prompt(video: &VideoRecord) -> String {
    let description = video.description_or_excerpt(TOPIC_DESCRIPTION_CHARS);
    let description = truncate_chars(&description, TOPIC_DESCRIPTION_CHARS);

    format!(
        r#"Extract a concise, meaningful topic name from this educational video.

Title: {title}
Domain: {domain}
Description: {description}

Requirements:
1. Use 2-4 words maximum
2. Use underscores between words
3. Make it searchable and descriptive
4. Focus on the main concept being taught
5. Use technical terms when appropriate

Examples:
- "Learn Python Variables" → "python_variables"
- "Understanding React Hooks Tutorial" → "react_hooks"
- "Deep Dive into Neural Networks" → "neural_networks_fundamentals"

Return ONLY the topic name, nothing else."#,
        title = video.title,
        domain = video.domain,
    )
}

/// `"{title}. {description}. {content}"`, each part truncated first.
pub fn prerequisites_context(video: &VideoRecord) -> String {
    let description = video.description_or_excerpt(CONTEXT_DESCRIPTION_CHARS);
    format!(
        "{}. {}. {}",
        truncate_chars(&video.title, CONTEXT_TITLE_CHARS),
        truncate_chars(&description, CONTEXT_DESCRIPTION_CHARS),
        truncate_chars(&video.content, CONTEXT_CONTENT_CHARS),
    )
}

pub fn prerequisites_prompt(video: &VideoRecord) -> String {
    format!(
        r#"Identify the prerequisite knowledge needed to understand this educational content.

Title: {title}
Domain: {domain}
Level: {level}
Context: {context}

Analyze what concepts, skills, or knowledge a learner should have BEFORE taking this content.

Return a JSON array of prerequisites (3-6 items max). Each should be:
- A single concept/skill (2-4 words)
- Use underscores between words
- Be specific and technical
- Appropriate for the domain

Example outputs:
For "React Hooks Advanced Patterns":
["react_basics", "javascript_es6", "component_lifecycle", "state_management"]

For "Machine Learning with TensorFlow":
["python_programming", "linear_algebra", "calculus_basics", "numpy_pandas"]

For beginner content, return fewer or no prerequisites.
Return ONLY the JSON array, nothing else."#,
        title = video.title,
        domain = video.domain,
        level = video.level,
        context = prerequisites_context(video),
    )
}

/// `topics` must already be distinct; only the first [`PATHWAY_TOPIC_LIMIT`] are listed.
pub fn pathway_prompt(domain: &str, topics: &[String]) -> String {
    let listed = topics
        .iter()
        .take(PATHWAY_TOPIC_LIMIT)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Create a learning pathway for the domain: {domain}

Available topics:
{listed}

Suggest a logical learning sequence. Return a JSON object like:
{{
  "beginner_path": ["topic1", "topic2", "topic3"],
  "intermediate_path": ["topic4", "topic5"],
  "advanced_path": ["topic6"]
}}

Only include topics from the list above. Group by difficulty level.
Return ONLY the JSON object, nothing else."#
    )
}
