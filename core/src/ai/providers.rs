//! Per-provider request bodies, endpoints and response parsing.
//!
//! Google uses the `generateContent` schema with the key in the query string;
//! OpenRouter and Cerebras share the OpenAI-style chat completions schema and
//! bearer authentication.

use reqwest::Url;
use serde::Deserialize;

use super::{ProviderId, TranslationError};

const SYSTEM_PROMPT: &str = "You are a helpful translation assistant.";

impl ProviderId {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderId::Google => "https://generativelanguage.googleapis.com",
            ProviderId::OpenRouter => "https://openrouter.ai",
            ProviderId::Cerebras => "https://api.cerebras.ai",
        }
    }

    pub fn uses_bearer_auth(&self) -> bool {
        !matches!(self, ProviderId::Google)
    }

    /// Full request URL under `base`. The Google key travels as `?key=`.
    pub fn endpoint(&self, base: &Url, model: &str, api_key: &str) -> Result<Url, TranslationError> {
        let mut url = base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                TranslationError::Configuration(format!("Invalid endpoint base URL: {base}"))
            })?;
            segments.pop_if_empty();
            match self {
                ProviderId::Google => {
                    segments
                        .extend(["v1beta", "models"])
                        .push(&format!("{model}:generateContent"));
                }
                ProviderId::OpenRouter => {
                    segments.extend(["api", "v1", "chat", "completions"]);
                }
                ProviderId::Cerebras => {
                    segments.extend(["v1", "chat", "completions"]);
                }
            }
        }

        if matches!(self, ProviderId::Google) {
            url.query_pairs_mut().append_pair("key", api_key);
        }

        Ok(url)
    }
}

pub fn build_body(provider: ProviderId, model: &str, prompt: &str) -> serde_json::Value {
    match provider {
        ProviderId::Google => serde_json::json!({
            "contents": [
                {
                    "parts": [
                        { "text": prompt }
                    ]
                }
            ]
        }),
        ProviderId::OpenRouter | ProviderId::Cerebras => serde_json::json!({
            "model": model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ]
        }),
    }
}

/// Pulls the translated text out of a successful response body.
pub fn parse_response(provider: ProviderId, body: &str) -> Result<String, TranslationError> {
    let text = match provider {
        ProviderId::Google => {
            let response: GeminiResponse = serde_json::from_str(body).map_err(|err| {
                TranslationError::InvalidResponse {
                    provider,
                    message: err.to_string(),
                }
            })?;

            if let Some(reason) = response
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
                .filter(|reason| !reason.is_empty())
            {
                return Err(TranslationError::ContentBlocked { reason });
            }

            response
                .candidates
                .and_then(|candidates| candidates.into_iter().next())
                .and_then(|candidate| candidate.content)
                .and_then(|content| content.parts)
                .and_then(|parts| parts.into_iter().next())
                .and_then(|part| part.text)
        }
        ProviderId::OpenRouter | ProviderId::Cerebras => {
            let response: ChatCompletionResponse = serde_json::from_str(body).map_err(|err| {
                TranslationError::InvalidResponse {
                    provider,
                    message: err.to_string(),
                }
            })?;

            response
                .choices
                .and_then(|choices| choices.into_iter().next())
                .and_then(|choice| choice.message)
                .and_then(|message| message.content)
        }
    };

    match text {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(TranslationError::InvalidResponse {
            provider,
            message: "no translated text in response".into(),
        }),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}
