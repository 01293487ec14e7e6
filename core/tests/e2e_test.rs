//! End-to-end tests for the document translation workflow:
//! load, split, translate against a mock provider, merge and export.

use doc_translator_core::ai::ProviderClient;
use doc_translator_core::export::{BundleInfo, BundleMetadata, METADATA_FILE_NAME};
use doc_translator_core::job::{ActivityLog, RunState};
use doc_translator_core::{
    ChunkPlan, Document, MergeMode, PromptContext, ProviderId, TranslationSession,
};
use std::fs::File;
use std::io::Read;
use tempfile::TempDir;
use tokio_test::assert_ok;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Upper-cases the chunk embedded in the prompt. Chunks containing `FAIL`
/// get a 429, chunks containing `BLOCK` a Gemini prompt block.
struct UppercaseProvider {
    provider: ProviderId,
}

fn chunk_from_prompt(prompt: &str) -> String {
    let start = prompt
        .find("INPUT CONTENT:\n")
        .map(|index| index + "INPUT CONTENT:\n".len())
        .unwrap_or(0);
    let end = prompt.rfind("\n\nOUTPUT:").unwrap_or(prompt.len());
    prompt[start..end].to_string()
}

impl Respond for UppercaseProvider {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400),
        };
        let prompt = match self.provider {
            ProviderId::Google => body["contents"][0]["parts"][0]["text"].as_str(),
            _ => body["messages"][1]["content"].as_str(),
        }
        .unwrap_or_default();
        let chunk = chunk_from_prompt(prompt);

        if chunk.contains("FAIL") {
            return ResponseTemplate::new(429).set_body_string("Too Many Requests");
        }
        if chunk.contains("BLOCK") {
            return ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": { "blockReason": "PROHIBITED_CONTENT" }
            }));
        }

        let translated = chunk.to_uppercase();
        match self.provider {
            ProviderId::Google => ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": translated }] } }]
            })),
            _ => ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": translated } }]
            })),
        }
    }
}

async fn mock_provider(provider: ProviderId) -> MockServer {
    let server = MockServer::start().await;
    let route = match provider {
        ProviderId::Google => "/v1beta/models/test-model:generateContent",
        ProviderId::OpenRouter => "/api/v1/chat/completions",
        ProviderId::Cerebras => "/v1/chat/completions",
    };
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(UppercaseProvider { provider })
        .mount(&server)
        .await;
    server
}

fn client(server: &MockServer, provider: ProviderId, document: &Document) -> ProviderClient {
    let prompt = PromptContext::new(document.file_name(), "en", "fr");
    ProviderClient::new(provider, Some("test-key"), Some("test-model"), prompt)
        .unwrap()
        .with_base_url(&server.uri())
        .unwrap()
}

fn lines(items: &[&str]) -> String {
    items.join("\n")
}

#[tokio::test]
async fn test_e2e_translate_and_export_bundle() {
    let server = mock_provider(ProviderId::OpenRouter).await;
    let document = Document::new("story.txt", lines(&["one", "two", "three", "four", "five"]));
    let client = client(&server, ProviderId::OpenRouter, &document);

    let mut session = TranslationSession::new(ChunkPlan::manual(2, 0), MergeMode::Concatenate);
    session.load_document(document);

    let outcome = assert_ok!(session.translate(&client, &ActivityLog::new()).await);
    assert_eq!(outcome.state, RunState::Completed);
    assert_eq!(outcome.completed(), 3);
    assert_eq!(
        session.translated_text(),
        Some("ONE\nTWO\nTHREE\nFOUR\nFIVE")
    );

    let out_dir = TempDir::new().unwrap();
    let translated_path = session.save_translation(out_dir.path(), "fr").unwrap();
    assert_eq!(translated_path.file_name().unwrap(), "story-french.txt");

    let info = BundleInfo {
        source_language: "en",
        target_language: "fr",
        total_chunks: session.chunks().len(),
        provider: ProviderId::OpenRouter,
        model: "test-model",
    };
    let bundle = session.save_bundle(out_dir.path(), &info).unwrap();
    let mut archive = zip_archive(&bundle);

    let mut metadata = String::new();
    archive
        .by_name(METADATA_FILE_NAME)
        .unwrap()
        .read_to_string(&mut metadata)
        .unwrap();
    let metadata: BundleMetadata = serde_json::from_str(&metadata).unwrap();
    assert_eq!(metadata.original_file, "story.txt");
    assert_eq!(metadata.total_chunks, 3);
    assert_eq!(metadata.model, "test-model");
}

fn zip_archive(path: &std::path::Path) -> zip::ZipArchive<File> {
    zip::ZipArchive::new(File::open(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_e2e_rate_limit_stops_remaining_chunks() {
    let server = mock_provider(ProviderId::Cerebras).await;
    let document = Document::new(
        "list.txt",
        lines(&["alpha", "beta", "FAIL here", "gamma", "delta", "epsilon"]),
    );
    let client = client(&server, ProviderId::Cerebras, &document);

    let mut session = TranslationSession::new(ChunkPlan::manual(2, 0), MergeMode::Concatenate);
    session.load_document(document);
    let outcome = session.translate(&client, &ActivityLog::new()).await.unwrap();

    assert_eq!(outcome.state, RunState::FailedChunk);
    let failure = outcome.failure.as_ref().unwrap();
    assert_eq!(failure.index, 1);
    assert_eq!(failure.error.status(), Some(429));
    assert!(outcome.results[2].is_none());
    assert_eq!(session.translated_text(), Some("ALPHA\nBETA"));

    // Only chunks 1 and 2 ever reached the provider.
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);

    let messages = session.activity().messages();
    assert!(messages
        .iter()
        .any(|message| message == "Error on chunk 2: Cerebras API error 429: Too Many Requests"));
}

#[tokio::test]
async fn test_e2e_google_prohibited_content() {
    let server = mock_provider(ProviderId::Google).await;
    let document = Document::new("chat.log", lines(&["BLOCK this", "and this"]));
    let client = client(&server, ProviderId::Google, &document);

    let mut session = TranslationSession::new(ChunkPlan::manual(10, 0), MergeMode::Concatenate);
    session.load_document(document);
    let outcome = session.translate(&client, &ActivityLog::new()).await.unwrap();

    assert_eq!(outcome.state, RunState::FailedChunk);
    let failure = outcome.failure.as_ref().unwrap();
    assert_eq!(
        failure.error.to_string(),
        "Translation failed: Content may violate usage policy. Please try with different text."
    );
    assert!(session.translated_text().is_none());
    assert_eq!(
        session.activity().messages().last().map(String::as_str),
        Some("No translation results to display.")
    );
}

#[tokio::test]
async fn test_e2e_cancel_stops_at_chunk_boundary() {
    let server = mock_provider(ProviderId::OpenRouter).await;
    let document = Document::new("a.md", lines(&["# Title", "body"]));
    let client = client(&server, ProviderId::OpenRouter, &document);

    let mut session = TranslationSession::new(ChunkPlan::manual(1, 0), MergeMode::Concatenate);
    session.load_document(document);

    // A cancel issued while the run is in progress stops it at the next
    // boundary; here it is raised from the progress sink on chunk 1.
    struct CancelOnFirstChunk(doc_translator_core::CancelToken);
    impl doc_translator_core::ProgressSink for CancelOnFirstChunk {
        fn emit(&self, event: &doc_translator_core::ProgressEvent) {
            if event.chunk_index == Some(0) {
                self.0.cancel();
            }
        }
    }

    let sink = CancelOnFirstChunk(session.cancel_token());
    let outcome = session.translate(&client, &sink).await.unwrap();

    assert_eq!(outcome.state, RunState::Cancelled);
    assert_eq!(outcome.completed(), 1);
    assert_eq!(session.translated_text(), Some("# TITLE"));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_e2e_overlap_trimming_reconstructs_document() {
    let server = mock_provider(ProviderId::OpenRouter).await;
    let source: Vec<String> = (1..=12).map(|n| format!("line {n}")).collect();
    let document = Document::new("long.txt", source.join("\n"));
    let client = client(&server, ProviderId::OpenRouter, &document);

    let mut session = TranslationSession::new(ChunkPlan::manual(5, 2), MergeMode::TrimOverlap);
    session.load_document(document);
    let outcome = assert_ok!(session.translate(&client, &ActivityLog::new()).await);
    assert_eq!(outcome.state, RunState::Completed);
    assert_eq!(outcome.total(), 4);

    let expected: Vec<String> = source.iter().map(|line| line.to_uppercase()).collect();
    assert_eq!(session.translated_text(), Some(expected.join("\n").as_str()));
}
