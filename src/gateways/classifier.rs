//! Rate-limited semantic classification through an OpenAI-compatible
//! chat-completions endpoint.
//!
//! The gateway sends the configured system prompt plus the chapter text
//! and reduces the reply to a three-way [`Verdict`]. Like the page
//! gateway it serializes all calls behind one rate gate, here to
//! protect the provider quota.
//!
//! # Failure mapping
//!
//! - HTTP 429 (or a quota error body) is [`FatalError::QuotaExceeded`]:
//!   the run stops rather than keep hammering an exhausted quota.
//! - A content-policy refusal (`finish_reason: "content_filter"`, or a
//!   400 naming the content policy) is [`Verdict::ContentPolicyRejected`]:
//!   the text was never evaluated, which is not the same as a `No`.
//! - Anything else unexpected is [`FatalError::Classifier`].

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::RunConfig;
use crate::error::FatalError;
use crate::gateways::rate::RateGate;

/// Classifier output for one chapter text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The text semantically matches what the prompt asks about.
    Yes,
    /// The text does not match.
    No,
    /// The provider declined to evaluate the text. Un-evaluated, not
    /// negative.
    ContentPolicyRejected,
}

/// Capability seam for classification, so tests can count and script
/// calls.
pub trait Classify {
    async fn classify(&self, text: &str) -> Result<Verdict, FatalError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Serialized, rate-limited access to the LLM provider.
pub struct ClassifierGateway {
    client: Client,
    gate: RateGate,
    api_base: String,
    api_key: String,
    model: String,
    prompt: String,
}

impl std::fmt::Debug for ClassifierGateway {
    // The API key stays out of debug output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierGateway")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl ClassifierGateway {
    pub fn new(config: &RunConfig) -> Result<Self, FatalError> {
        let api_key = std::env::var(&config.classifier.api_key_env).map_err(|_| {
            FatalError::Config(format!(
                "classifier API key not found in ${}",
                config.classifier.api_key_env
            ))
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(FatalError::HttpClient)?;

        Ok(Self {
            client,
            gate: RateGate::new(Duration::from_millis(config.classifier_interval_ms)),
            api_base: config.classifier.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.classifier.model.clone(),
            prompt: config.prompt.clone(),
        })
    }
}

impl Classify for ClassifierGateway {
    #[instrument(level = "debug", skip_all, fields(text_bytes = text.len()))]
    async fn classify(&self, text: &str) -> Result<Verdict, FatalError> {
        let _permit = self.gate.throttle().await;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &self.prompt,
                },
                Message {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.0,
            max_tokens: 8,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| FatalError::Classifier(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return match classify_failure(status, &body) {
                FailureKind::Quota => Err(FatalError::QuotaExceeded(snippet(&body))),
                FailureKind::ContentPolicy => {
                    warn!("Classifier refused the text on content policy");
                    Ok(Verdict::ContentPolicyRejected)
                }
                FailureKind::Other => Err(FatalError::Classifier(format!(
                    "HTTP {status}: {}",
                    snippet(&body)
                ))),
            };
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| FatalError::Classifier(format!("unparseable response: {e}")))?;

        let Some(choice) = parsed.choices.into_iter().next() else {
            return Err(FatalError::Classifier("response had no choices".to_string()));
        };

        if choice.finish_reason.as_deref() == Some("content_filter") {
            warn!("Classifier stopped on content filter");
            return Ok(Verdict::ContentPolicyRejected);
        }

        let reply = choice.message.content.unwrap_or_default();
        let verdict = verdict_from_reply(&reply);
        debug!(reply = %reply.trim(), ?verdict, "Classifier answered");
        Ok(verdict)
    }
}

enum FailureKind {
    Quota,
    ContentPolicy,
    Other,
}

/// Sort a non-2xx provider response into the three outcomes that matter.
fn classify_failure(status: StatusCode, body: &str) -> FailureKind {
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("insufficient_quota") {
        return FailureKind::Quota;
    }
    if status == StatusCode::BAD_REQUEST
        && (body.contains("content_policy") || body.contains("content_filter"))
    {
        return FailureKind::ContentPolicy;
    }
    FailureKind::Other
}

/// Reduce a free-text reply to a verdict: a trimmed, case-insensitive
/// "yes" prefix affirms, everything else denies.
fn verdict_from_reply(reply: &str) -> Verdict {
    let lowered = reply.trim().to_lowercase();
    if lowered.starts_with("yes") {
        Verdict::Yes
    } else {
        Verdict::No
    }
}

fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    // Back off to a char boundary; provider errors are not always ASCII.
    let mut cut = MAX;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &body[..cut], body.len() - cut)
}
