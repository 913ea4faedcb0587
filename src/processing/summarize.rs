//! Summarization orchestrator: prompt construction, four-way fan-out, and key-point parsing.

use crate::processing::types::{PipelineError, SummaryOutput, SummarySet};
use crate::summarization::{GenerationClient, GenerationError};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

/// Maximum number of characters of extracted text embedded in a prompt.
pub const SUMMARY_INPUT_LIMIT: usize = 8000;

/// Appended to prompt text that was cut at [`SUMMARY_INPUT_LIMIT`].
pub const TRUNCATION_MARKER: &str = "...";

const BULLET_GLYPHS: [char; 3] = ['-', '*', '•'];

/// The four independent prompt variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// 2-3 sentence summary.
    Short,
    /// One paragraph summary.
    Medium,
    /// 2-3 paragraph summary.
    Long,
    /// 5-7 bullet key points.
    KeyPoints,
}

impl PromptKind {
    /// All variants in the order their results are reported.
    pub const ALL: [Self; 4] = [Self::Short, Self::Medium, Self::Long, Self::KeyPoints];

    fn instruction(self) -> &'static str {
        match self {
            Self::Short => "Summarize the following text in 2-3 sentences:",
            Self::Medium => "Summarize the following text in 1 paragraph (4-6 sentences):",
            Self::Long => "Summarize the following text in 2-3 paragraphs:",
            Self::KeyPoints => "Extract 5-7 key points as a bullet list:",
        }
    }

    /// Short identifier used in logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
            Self::KeyPoints => "key_points",
        }
    }
}

/// Cut `text` to the prompt ceiling, appending the truncation marker when anything was dropped.
///
/// The ceiling counts characters, not bytes, so multi-byte text is never split mid-character.
pub fn truncate_for_prompt(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(SUMMARY_INPUT_LIMIT) {
        None => Cow::Borrowed(text),
        Some((cut, _)) => {
            let mut truncated = String::with_capacity(cut + TRUNCATION_MARKER.len());
            truncated.push_str(&text[..cut]);
            truncated.push_str(TRUNCATION_MARKER);
            Cow::Owned(truncated)
        }
    }
}

/// Build the prompt for `kind`, embedding `text` verbatim.
pub fn build_prompt(kind: PromptKind, text: &str) -> String {
    format!("{}\n\n{}", kind.instruction(), text)
}

/// Parse a bulleted response into ordered key points.
///
/// Each line loses one leading bullet glyph (`-`, `*`, or `•`) and its surrounding whitespace;
/// blank lines are dropped. Every remaining line is kept in order, however many the model
/// returned.
pub fn parse_key_points(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix(BULLET_GLYPHS)
                .unwrap_or(line)
                .trim()
                .to_string()
        })
        .filter(|point| !point.is_empty())
        .collect()
}

/// Fans the four prompts out to the generation client and joins the results.
#[derive(Clone)]
pub struct SummaryOrchestrator {
    client: Option<Arc<dyn GenerationClient>>,
    timeout: Duration,
}

impl SummaryOrchestrator {
    /// Orchestrator over an optional client; `None` means no credential is configured.
    pub fn new(client: Option<Arc<dyn GenerationClient>>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Whether a generation client is available.
    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Generate the three summaries and the key points for `text`.
    ///
    /// All four calls start together and every one is awaited before results are inspected.
    /// If any call fails the whole orchestration fails; no partial summary set is returned.
    pub async fn summarize(&self, text: &str) -> Result<SummaryOutput, PipelineError> {
        let Some(client) = self.client.as_deref() else {
            return Err(PipelineError::Configuration(
                "Gemini API key missing".to_string(),
            ));
        };

        let input = truncate_for_prompt(text);
        if matches!(input, Cow::Owned(_)) {
            tracing::debug!(
                limit = SUMMARY_INPUT_LIMIT,
                "Extracted text truncated for prompting"
            );
        }

        let (short, medium, long, key_points) = tokio::join!(
            self.generate(client, PromptKind::Short, &input),
            self.generate(client, PromptKind::Medium, &input),
            self.generate(client, PromptKind::Long, &input),
            self.generate(client, PromptKind::KeyPoints, &input),
        );

        let summaries = SummarySet {
            short: short?,
            medium: medium?,
            long: long?,
        };
        let key_points = parse_key_points(&key_points?);

        tracing::info!(key_points = key_points.len(), "Summaries generated");
        Ok(SummaryOutput {
            summaries,
            key_points,
        })
    }

    async fn generate(
        &self,
        client: &dyn GenerationClient,
        kind: PromptKind,
        input: &str,
    ) -> Result<String, GenerationError> {
        let prompt = build_prompt(kind, input);
        let result = tokio::time::timeout(self.timeout, client.generate(prompt))
            .await
            .map_err(|_| GenerationError::TimedOut(self.timeout))
            .and_then(|inner| inner);

        match &result {
            Ok(text) => tracing::debug!(prompt = kind.label(), characters = text.len(), "Generation finished"),
            Err(error) => tracing::warn!(prompt = kind.label(), error = %error, "Generation failed"),
        }
        result.map(|text| text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedClient {
        prompts: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
        delay: Duration,
    }

    impl ScriptedClient {
        fn new() -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                fail_on: None,
                delay: Duration::ZERO,
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl GenerationClient for ScriptedClient {
        async fn generate(&self, prompt: String) -> Result<String, GenerationError> {
            self.prompts.lock().expect("lock").push(prompt.clone());
            tokio::time::sleep(self.delay).await;
            if self.fail_on.is_some_and(|prefix| prompt.starts_with(prefix)) {
                return Err(GenerationError::Failed("Gemini returned 503".into()));
            }
            if prompt.starts_with("Extract") {
                Ok("- Point A\n* Point B\n• Point C\n\n".into())
            } else {
                let first_line = prompt.lines().next().unwrap_or_default();
                Ok(format!("  {first_line} -> summary \n"))
            }
        }
    }

    fn orchestrator(client: Arc<ScriptedClient>) -> SummaryOrchestrator {
        SummaryOrchestrator::new(Some(client), Duration::from_secs(5))
    }

    #[test]
    fn key_points_strip_bullets_and_blank_lines() {
        let points = parse_key_points("- Point A\n* Point B\n• Point C\n\n");
        assert_eq!(points, vec!["Point A", "Point B", "Point C"]);
    }

    #[test]
    fn key_points_keep_plain_lines_and_order() {
        let points = parse_key_points("  First\n-   Second  \n\n   \nThird");
        assert_eq!(points, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn key_points_strip_only_one_glyph() {
        let points = parse_key_points("* **Bold** claim");
        assert_eq!(points, vec!["**Bold** claim"]);
    }

    #[test]
    fn key_points_keep_every_line_including_preamble() {
        let raw = "Here are the key points:\n- P1\n- P2\n- P3\n- P4\n- P5\n- P6\n- P7\n";
        let points = parse_key_points(raw);
        assert_eq!(points.len(), 8);
        assert_eq!(points.first().map(String::as_str), Some("Here are the key points:"));
        assert_eq!(points.last().map(String::as_str), Some("P7"));
    }

    #[test]
    fn long_bullet_lists_come_back_whole() {
        let raw = (1..=10).map(|n| format!("- Point {n}\n")).collect::<String>();
        let points = parse_key_points(&raw);
        assert_eq!(points.len(), 10);
        assert_eq!(points.last().map(String::as_str), Some("Point 10"));
    }

    #[test]
    fn short_text_is_not_truncated() {
        let text = "a".repeat(SUMMARY_INPUT_LIMIT);
        let prompt_text = truncate_for_prompt(&text);
        assert!(matches!(prompt_text, Cow::Borrowed(_)));
        assert_eq!(prompt_text, text.as_str());
    }

    #[test]
    fn long_text_is_cut_at_limit_with_marker() {
        let text = "b".repeat(SUMMARY_INPUT_LIMIT + 1);
        let prompt_text = truncate_for_prompt(&text);
        assert_eq!(prompt_text.len(), SUMMARY_INPUT_LIMIT + TRUNCATION_MARKER.len());
        assert!(prompt_text.starts_with(&"b".repeat(SUMMARY_INPUT_LIMIT)));
        assert!(prompt_text.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "é".repeat(SUMMARY_INPUT_LIMIT + 10);
        let prompt_text = truncate_for_prompt(&text);
        let expected = format!("{}{}", "é".repeat(SUMMARY_INPUT_LIMIT), TRUNCATION_MARKER);
        assert_eq!(prompt_text, expected.as_str());
    }

    #[test]
    fn prompts_embed_text_after_instruction() {
        assert_eq!(
            build_prompt(PromptKind::Short, "Body"),
            "Summarize the following text in 2-3 sentences:\n\nBody"
        );
        assert_eq!(
            build_prompt(PromptKind::KeyPoints, "Body"),
            "Extract 5-7 key points as a bullet list:\n\nBody"
        );
    }

    #[tokio::test]
    async fn summarize_issues_four_prompts_and_parses_key_points() {
        let client = Arc::new(ScriptedClient::new());
        let output = orchestrator(client.clone())
            .summarize("The document body.")
            .await
            .expect("summaries");

        assert_eq!(
            output.summaries.short,
            "Summarize the following text in 2-3 sentences: -> summary"
        );
        assert!(output.summaries.medium.contains("1 paragraph"));
        assert!(output.summaries.long.contains("2-3 paragraphs"));
        assert_eq!(output.key_points, vec!["Point A", "Point B", "Point C"]);

        let prompts = client.prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts.iter().all(|prompt| prompt.ends_with("\n\nThe document body.")));
    }

    #[tokio::test]
    async fn summarize_sends_truncated_text() {
        let client = Arc::new(ScriptedClient::new());
        let text = "x".repeat(SUMMARY_INPUT_LIMIT + 500);
        orchestrator(client.clone())
            .summarize(&text)
            .await
            .expect("summaries");

        let expected_tail = format!("\n\n{}{}", "x".repeat(SUMMARY_INPUT_LIMIT), TRUNCATION_MARKER);
        for prompt in client.prompts() {
            assert!(prompt.ends_with(&expected_tail));
        }
    }

    #[tokio::test]
    async fn calls_run_concurrently() {
        let client = Arc::new(ScriptedClient {
            delay: Duration::from_millis(200),
            ..ScriptedClient::new()
        });
        let started = std::time::Instant::now();
        orchestrator(client).summarize("Body").await.expect("summaries");
        assert!(started.elapsed() < Duration::from_millis(700));
    }

    #[tokio::test]
    async fn one_failed_call_fails_everything() {
        let client = Arc::new(ScriptedClient {
            fail_on: Some("Summarize the following text in 2-3 paragraphs"),
            ..ScriptedClient::new()
        });
        let error = orchestrator(client.clone())
            .summarize("Body")
            .await
            .expect_err("long summary failure");

        assert!(matches!(error, PipelineError::Generation(GenerationError::Failed(_))));
        assert_eq!(client.prompts().len(), 4, "every call is still awaited");
    }

    #[tokio::test]
    async fn missing_client_fails_before_any_call() {
        let orchestrator = SummaryOrchestrator::new(None, Duration::from_secs(5));
        assert!(!orchestrator.is_configured());
        let error = orchestrator.summarize("Body").await.expect_err("no client");
        assert!(matches!(error, PipelineError::Configuration(ref message) if message == "Gemini API key missing"));
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let client = Arc::new(ScriptedClient {
            delay: Duration::from_secs(5),
            ..ScriptedClient::new()
        });
        let orchestrator = SummaryOrchestrator::new(Some(client), Duration::from_millis(50));
        let error = orchestrator.summarize("Body").await.expect_err("timeout");
        assert!(matches!(error, PipelineError::Generation(GenerationError::TimedOut(_))));
    }
}
