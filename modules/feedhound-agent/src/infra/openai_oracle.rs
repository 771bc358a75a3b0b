use ai_client::{AiError, OpenAi, StructuredOutput};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use feedhound_common::{Candidate, Context, OracleError, TARGET_POST_CHARS};

use crate::traits::{GenerativeOracle, MediaDescriber, QuoteDraft, ReplyDraft};

// --- Structured records the model answers with ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SelectionRecord {
    /// Why this post was picked (or why none was).
    pub analysis: String,
    /// Id of the chosen post, or null / "none" to pick nothing.
    pub candidate_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResearchTopicRecord {
    pub analysis: String,
    /// A single-sentence research query, or null / "none".
    pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ModeRecord {
    /// "reply" or "quote"
    pub decision: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReplyRecord {
    pub analysis: String,
    pub reply: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuoteRecord {
    pub analysis: String,
    pub tweet: String,
    /// Follow-up posts, one per entry. Empty when no thread is needed.
    #[serde(default)]
    pub thread: Vec<String>,
}

// StructuredOutput comes from the blanket impl for JsonSchema + DeserializeOwned

const MEDIA_SYSTEM_PROMPT: &str = "You are an expert at describing images, breaking down visuals, \
and understanding the deeper and culturally relevant context nestled in images.";

const MEDIA_INSTRUCTION: &str = "Describe the following image in depth. Identify by full name any \
famous characters or persons from pop culture present in the image.";

const CHARACTER_BRIEF: &str = r#"Character:
- You are a sharp-witted dog and top-tier analyst on X, blending dog-like humor with razor-sharp insights.
  You are bold, hilariously self-aware, and too smart for a dog. You spend your days behind the computer learning about hoomans and finance.
  Your posts are relatable, highly shareable, and unapologetically clever with a hint of chaos.
  You never miss an opportunity to go against the consensus and back it up with logic and facts.
  You take a decisive stance and never make half statements or pose half questions.
- Tone: meme-worthy, sarcastic and witty first; confident with hidden cleverness second."#;

const SELECT_MAX_TOKENS: u32 = 500;
const TOPIC_MAX_TOKENS: u32 = 300;
const DECISION_MAX_TOKENS: u32 = 100;
const COMPOSE_MAX_TOKENS: u32 = 1000;
const MEDIA_MAX_TOKENS: u32 = 300;

/// Generative oracle and media describer backed by OpenAI chat completions.
///
/// Every decision uses structured output; the persona text is the system
/// prompt for all of them except image description.
pub struct OpenAiOracle {
    ai: OpenAi,
    vision: OpenAi,
    persona: String,
}

impl OpenAiOracle {
    pub fn new(ai: OpenAi, vision_model: &str, persona: impl Into<String>) -> Self {
        let vision = ai.with_model(vision_model).with_max_tokens(MEDIA_MAX_TOKENS);
        Self {
            ai,
            vision,
            persona: persona.into(),
        }
    }

    async fn ask<T: StructuredOutput>(&self, max_tokens: u32, prompt: String) -> Result<T, OracleError> {
        debug!(record = T::type_name(), chars = prompt.len(), "Oracle prompt");
        self.ai
            .clone()
            .with_max_tokens(max_tokens)
            .extract::<T>(&self.persona, prompt)
            .await
            .map_err(oracle_error)
    }
}

#[async_trait]
impl GenerativeOracle for OpenAiOracle {
    async fn select_best(&self, candidates: &[Candidate]) -> Result<Option<String>, OracleError> {
        let record: SelectionRecord = self
            .ask(SELECT_MAX_TOKENS, selection_prompt(candidates)?)
            .await?;
        info!(analysis = %record.analysis, choice = ?record.candidate_id, "Selection answer");
        Ok(declined_or(record.candidate_id))
    }

    async fn identify_research_topic(
        &self,
        candidate: &Candidate,
    ) -> Result<Option<String>, OracleError> {
        let record: ResearchTopicRecord = self
            .ask(TOPIC_MAX_TOKENS, research_topic_prompt(candidate)?)
            .await?;
        debug!(analysis = %record.analysis, "Research topic answer");
        Ok(declined_or(record.query))
    }

    async fn decide_mode(&self, context: &Context) -> Result<String, OracleError> {
        let record: ModeRecord = self
            .ask(DECISION_MAX_TOKENS, decision_prompt(context)?)
            .await?;
        Ok(record.decision)
    }

    async fn compose_reply(&self, context: &Context) -> Result<ReplyDraft, OracleError> {
        let record: ReplyRecord = self.ask(COMPOSE_MAX_TOKENS, reply_prompt(context)?).await?;
        Ok(ReplyDraft {
            analysis: record.analysis,
            text: record.reply,
        })
    }

    async fn compose_quote(&self, context: &Context) -> Result<QuoteDraft, OracleError> {
        let record: QuoteRecord = self.ask(COMPOSE_MAX_TOKENS, quote_prompt(context)?).await?;
        Ok(QuoteDraft {
            analysis: record.analysis,
            text: record.tweet,
            thread: clean_thread(record.thread),
        })
    }
}

#[async_trait]
impl MediaDescriber for OpenAiOracle {
    async fn describe_media(&self, url: &str) -> Result<String, OracleError> {
        self.vision
            .describe_image(MEDIA_SYSTEM_PROMPT, MEDIA_INSTRUCTION, url)
            .await
            .map_err(oracle_error)
    }
}

fn oracle_error(err: AiError) -> OracleError {
    match err {
        AiError::Parse(msg) => OracleError::Unparseable(msg),
        AiError::EmptyResponse(model) => OracleError::Unparseable(format!("empty response from {model}")),
        other => OracleError::Unavailable(other.to_string()),
    }
}

/// `None` for null, blank or any-case "none"; the trimmed answer otherwise.
fn declined_or(answer: Option<String>) -> Option<String> {
    answer
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty() && !a.eq_ignore_ascii_case("none"))
}

fn clean_thread(thread: Vec<String>) -> Vec<String> {
    thread
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, OracleError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| OracleError::Other(anyhow::Error::new(e).context("Failed to serialize prompt context")))
}

// --- Prompts ---

fn selection_prompt(candidates: &[Candidate]) -> Result<String, OracleError> {
    Ok(format!(
        "Analyze the following posts and pick the single most relevant and newsworthy one: \
the one that is funny, hits hard, has lots of engagement, or is bound to go viral.\n\n\
Posts:\n{}\n\n\
Answer with your reasoning in `analysis` and the chosen post's `id` in `candidate_id`. \
If none of them is worth answering, set `candidate_id` to null.",
        to_json(candidates)?
    ))
}

fn research_topic_prompt(candidate: &Candidate) -> Result<String, OracleError> {
    Ok(format!(
        "Analyze the following post and come up with a research query.\n\n\
The query should identify the core topic being discussed, name any key individuals, \
and be very specific to the contents of the post.\n\n\
Post:\n{}\n\n\
Answer with your reasoning in `analysis` and the query as a single sentence in `query`, \
or null if there is nothing worth researching.",
        to_json(candidate)?
    ))
}

fn decision_prompt(context: &Context) -> Result<String, OracleError> {
    Ok(format!(
        "Read the following post and research summary, then decide how to respond.\n\n\
Rules:\n\
- \"reply\" is the default move; use it whenever a direct response works.\n\
- \"quote\" only if the post is very insightful, has raw data to interpret, and deserves the spotlight.\n\n\
Context:\n{}\n\n\
Answer with exactly \"reply\" or \"quote\" in `decision`.",
        to_json(context)?
    ))
}

fn post_rules() -> String {
    format!(
        "Lean into misspellings and internet slang for doggy flavor. \
Use fewer than {TARGET_POST_CHARS} characters. Avoid hashtags, sporadic punctuation and emojis. \
English only. No quotation marks around the text."
    )
}

fn reply_prompt(context: &Context) -> Result<String, OracleError> {
    Ok(format!(
        "Based on the original post and the research below, write a reply to the original post \
in the words of this character.\n\n{CHARACTER_BRIEF}\n\n\
Context:\n{}\n\n\
Instructions: craft a reply that is fun, relatable and witty, acknowledges the post and its author, \
and invites further engagement. {}\n\n\
Put your interpretation of the post in `analysis` and the reply text in `reply`.",
        to_json(context)?,
        post_rules()
    ))
}

fn quote_prompt(context: &Context) -> Result<String, OracleError> {
    Ok(format!(
        "Based on the original post and the research below, write a quote post in the words of \
this character.\n\n{CHARACTER_BRIEF}\n\n\
Context:\n{}\n\n\
Instructions: craft a short, engaging post with dog-like charm, relatable humor and meme-worthy language. \
Use the research to either comment on the popular sentiment around the topic or make a definitive \
statement about it. {}\n\n\
Put your interpretation in `analysis`, the main post in `tweet`, and any follow-up posts in `thread` \
(one entry per post, each at most 280 characters; leave it empty when no thread is needed).",
        to_json(context)?,
        post_rules()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Context {
        let mut candidate = Candidate::new("1868", "dogs", "dog meme");
        candidate.media_descriptions.push("a corgi in a suit".into());
        Context::new(candidate, Some("Overview: dogs in finance".into()))
    }

    #[test]
    fn none_answers_are_declines() {
        assert_eq!(declined_or(None), None);
        assert_eq!(declined_or(Some("None".into())), None);
        assert_eq!(declined_or(Some("  NONE ".into())), None);
        assert_eq!(declined_or(Some("   ".into())), None);
        assert_eq!(declined_or(Some(" 1868 ".into())), Some("1868".into()));
    }

    #[test]
    fn thread_entries_are_trimmed_and_blanks_dropped() {
        let thread = vec![" first ".to_string(), "".to_string(), "\n".to_string(), "second".to_string()];
        assert_eq!(clean_thread(thread), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn parse_failures_are_unparseable() {
        assert!(matches!(oracle_error(AiError::Parse("bad".into())), OracleError::Unparseable(_)));
        assert!(matches!(
            oracle_error(AiError::Api { status: 500, message: "boom".into() }),
            OracleError::Unavailable(_)
        ));
        assert!(matches!(
            oracle_error(AiError::Network("reset".into())),
            OracleError::Unavailable(_)
        ));
    }

    #[test]
    fn prompts_carry_the_context() {
        let ctx = context();
        let reply = reply_prompt(&ctx).unwrap();
        assert!(reply.contains("a corgi in a suit"));
        assert!(reply.contains("Overview: dogs in finance"));
        assert!(reply.contains("220"));

        let selection = selection_prompt(std::slice::from_ref(&ctx.candidate)).unwrap();
        assert!(selection.contains("\"id\": \"1868\""));
    }

    #[test]
    fn selection_record_schema_is_strict() {
        let schema = SelectionRecord::strict_schema();
        assert_eq!(schema["additionalProperties"], false);
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "candidate_id"));
    }

    #[test]
    fn quote_record_tolerates_missing_thread() {
        let record: QuoteRecord =
            serde_json::from_str(r#"{"analysis": "a", "tweet": "b"}"#).unwrap();
        assert!(record.thread.is_empty());
    }
}
