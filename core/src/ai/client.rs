use log::{debug, warn};
use reqwest::{Client, Url};
use std::time::Duration;

use super::providers::parse_response;
use super::{ProviderId, ProviderRequest, TranslateFuture, TranslationError, Translator};
use crate::chunker::Chunk;
use crate::prompt::PromptContext;

/// HTTP translator for one provider, configured once per run.
pub struct ProviderClient {
    http: Client,
    provider: ProviderId,
    api_key: String,
    model: String,
    base_url: Url,
    prompt: PromptContext,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ProviderClient {
    /// Validates credentials before anything touches the network.
    pub fn new(
        provider: ProviderId,
        api_key: Option<&str>,
        model: Option<&str>,
        prompt: PromptContext,
    ) -> Result<Self, TranslationError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| TranslationError::Configuration("API key not filled.".into()))?;
        let model = model
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .ok_or_else(|| TranslationError::Configuration("Model name not filled.".into()))?;

        let base_url = Url::parse(provider.default_base_url()).map_err(|err| {
            TranslationError::Configuration(format!("Invalid endpoint base URL: {err}"))
        })?;

        Ok(Self {
            http: build_http_client(None)?,
            provider,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url,
            prompt,
            timeout: None,
        })
    }

    /// Bounds every request. Without a timeout a hanging provider blocks the
    /// run until it answers.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Result<Self, TranslationError> {
        self.http = build_http_client(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    /// Points the client at another host, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, TranslationError> {
        self.base_url = Url::parse(base_url).map_err(|err| {
            TranslationError::Configuration(format!("Invalid endpoint base URL: {err}"))
        })?;
        Ok(self)
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn request_for(&self, content: &str) -> ProviderRequest {
        ProviderRequest {
            provider: self.provider,
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            source_lang: self.prompt.source_lang.clone(),
            target_lang: self.prompt.target_lang.clone(),
            instruction: self.prompt.instruction.clone(),
            content_type: self.prompt.content_type.clone(),
            format: self.prompt.format,
            content: content.to_string(),
        }
    }

    pub async fn send(&self, request: &ProviderRequest) -> Result<String, TranslationError> {
        let provider = request.provider;
        let url = provider.endpoint(&self.base_url, &request.model, &request.api_key)?;
        let prompt = request.prompt();
        let body = request.body(&prompt);

        debug!(
            "sending {} request (model {}, {} prompt bytes)",
            provider,
            request.model,
            prompt.len()
        );

        let mut builder = self.http.post(url).json(&body);
        if provider.uses_bearer_auth() {
            builder = builder.bearer_auth(&request.api_key);
        }

        let response = builder.send().await.map_err(|err| {
            let message = if err.is_timeout() {
                match self.timeout {
                    Some(timeout) => format!("request timed out after {}s", timeout.as_secs()),
                    None => "request timed out".to_string(),
                }
            } else {
                describe(err)
            };
            warn!("{} request failed: {}", provider, message);
            TranslationError::Network { provider, message }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|err| TranslationError::Network {
            provider,
            message: describe(err),
        })?;

        if !status.is_success() {
            warn!("{} returned HTTP {}", provider, status.as_u16());
            return Err(TranslationError::ProviderHttp {
                provider,
                status: status.as_u16(),
                body: text,
            });
        }

        parse_response(provider, &text)
    }

    pub async fn translate_text(&self, content: &str) -> Result<String, TranslationError> {
        let request = self.request_for(content);
        self.send(&request).await
    }
}

impl Translator for ProviderClient {
    fn name(&self) -> &'static str {
        self.provider.label()
    }

    fn translate_chunk<'a>(&'a self, chunk: &'a Chunk) -> TranslateFuture<'a> {
        Box::pin(self.translate_text(&chunk.content))
    }
}

/// Google carries the API key in the query string, so the URL never goes
/// into an error message.
fn describe(err: reqwest::Error) -> String {
    err.without_url().to_string()
}

fn build_http_client(timeout: Option<Duration>) -> Result<Client, TranslationError> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(|err| {
        TranslationError::Configuration(format!("Failed to initialise HTTP client: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context() -> PromptContext {
        PromptContext::new("notes.txt", "en", "fr")
    }

    async fn client_for(server: &MockServer, provider: ProviderId) -> ProviderClient {
        ProviderClient::new(provider, Some("test-key"), Some("test-model"), context())
            .unwrap()
            .with_base_url(&server.uri())
            .unwrap()
    }

    #[test]
    fn rejects_missing_credentials() {
        let missing_key = ProviderClient::new(ProviderId::Google, None, Some("m"), context());
        assert!(matches!(
            missing_key,
            Err(TranslationError::Configuration(ref message)) if message == "API key not filled."
        ));

        let blank_model =
            ProviderClient::new(ProviderId::Cerebras, Some("key"), Some("   "), context());
        assert!(matches!(
            blank_model,
            Err(TranslationError::Configuration(ref message)) if message == "Model name not filled."
        ));
    }

    #[tokio::test]
    async fn openrouter_sends_bearer_and_chat_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(serde_json::json!({ "model": "test-model" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "Bonjour" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, ProviderId::OpenRouter).await;
        assert_eq!(client.translate_text("Hello").await.unwrap(), "Bonjour");
    }

    #[tokio::test]
    async fn google_passes_key_as_query_parameter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/test-model:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "Salut" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, ProviderId::Google).await;
        assert_eq!(client.translate_text("Hi").await.unwrap(), "Salut");
    }

    #[tokio::test]
    async fn non_success_status_becomes_provider_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = client_for(&server, ProviderId::Cerebras).await;
        let error = client.translate_text("Hi").await.unwrap_err();
        match error {
            TranslationError::ProviderHttp {
                provider,
                status,
                body,
            } => {
                assert_eq!(provider, ProviderId::Cerebras);
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn connection_errors_do_not_leak_the_api_key() {
        // Nothing listens on the discard port.
        let client = ProviderClient::new(
            ProviderId::Google,
            Some("SECRET-API-KEY-123"),
            Some("m"),
            context(),
        )
        .unwrap()
        .with_base_url("http://127.0.0.1:9")
        .unwrap();

        let error = client.translate_text("hi").await.unwrap_err();
        assert!(matches!(error, TranslationError::Network { .. }));
        assert!(!error.to_string().contains("SECRET-API-KEY-123"));
        assert!(!format!("{error:?}").contains("SECRET-API-KEY-123"));
    }

    #[test]
    fn request_carries_everything_the_prompt_needs() {
        let client = ProviderClient::new(
            ProviderId::Cerebras,
            Some("key"),
            Some("m"),
            PromptContext::new("subs.srt", "ja", "de")
                .with_instruction(Some("Keep honorifics".into())),
        )
        .unwrap();

        let mut request = client.request_for("1\n00:00:01,000 --> 00:00:02,000\nこんにちは");
        assert_eq!(request.format, crate::prompt::DocumentFormat::Srt);
        assert_eq!(request.content_type, "SRT");
        let prompt = request.prompt();
        assert!(prompt.contains("- Source Language: ja"));
        assert!(prompt.contains("CUSTOM INSTRUCTION: Keep honorifics"));

        request.target_lang = "fr".into();
        request.instruction = None;
        let prompt = request.prompt();
        assert!(prompt.contains("- Target Language: fr"));
        assert!(!prompt.contains("CUSTOM INSTRUCTION"));
    }

    #[tokio::test]
    async fn slow_provider_hits_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(5))
                    .set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, ProviderId::OpenRouter)
            .await
            .with_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let error = client.translate_text("Hi").await.unwrap_err();
        assert!(matches!(error, TranslationError::Network { .. }));
        assert_eq!(error.code(), "NETWORK_ERROR");
    }
}
