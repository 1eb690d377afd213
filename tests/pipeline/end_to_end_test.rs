//! Both flows driven through the real HTTP client.

use std::sync::Arc;

use serde_json::{json, Value};

use bibenrich::config::RunSettings;
use bibenrich::library::{Attachment, Library, MemoryLibrary, Record};
use bibenrich::pipeline::{AbstractPipeline, TaggingPipeline};
use bibenrich::prompts::PromptBuilder;
use bibenrich::providers::openai::OpenAiProvider;
use bibenrich::providers::LlmProvider;

use crate::http_support::serve_once;

fn reply(content: &str) -> String {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
}

fn no_delay() -> RunSettings {
    RunSettings {
        abstract_delay_ms: 0,
        ..RunSettings::default()
    }
}

#[tokio::test]
async fn abstract_flow_over_http() {
    let (url, server) = serve_once(
        "200 OK",
        "application/json",
        &reply(" A study of Lorem ipsum. "),
    )
    .await;
    let settings = no_delay();
    let provider: Arc<dyn LlmProvider> = Arc::new(
        OpenAiProvider::new(url, "sk-test", settings.request_timeout()).expect("client builds"),
    );
    let memory = Arc::new(MemoryLibrary::new(
        vec![Record::new("r1").with_attachment("a1")],
        vec![Attachment::pdf("a1", Some("Lorem ipsum..."))],
    ));
    let library: Arc<dyn Library> = memory.clone();

    let summary = AbstractPipeline::new(library, provider, PromptBuilder::new("gpt-test"), &settings)
        .run(memory.select(&[]).expect("select all"))
        .await;

    assert_eq!(summary.enriched, 1);
    assert_eq!(
        memory.record("r1").expect("record exists").abstract_note,
        "A study of Lorem ipsum."
    );

    let captured = server.await.expect("server task finishes");
    let sent: Value = serde_json::from_str(&captured.body).expect("body is JSON");
    assert_eq!(sent["messages"][0]["role"], "system");
    assert_eq!(
        sent["messages"][1]["content"],
        "Write a detailed abstract for the following content:\n\nLorem ipsum..."
    );
}

#[tokio::test]
async fn tagging_flow_over_http() {
    let (url, _server) = serve_once(
        "200 OK",
        "application/json",
        &reply("```json\n[\"Bib:Textual Studies-Hexapla\"]\n```"),
    )
    .await;
    let provider: Arc<dyn LlmProvider> = Arc::new(
        OpenAiProvider::new(url, "sk-test", RunSettings::default().request_timeout())
            .expect("client builds"),
    );
    let memory = Arc::new(MemoryLibrary::new(
        vec![Record::new("r1").with_title("On the Hexapla")],
        vec![],
    ));
    let library: Arc<dyn Library> = memory.clone();

    TaggingPipeline::new(library, provider, PromptBuilder::new("gpt-test"))
        .run(memory.select(&[]).expect("select all"))
        .await;

    assert_eq!(
        memory.record("r1").expect("record exists").tags(),
        ["Bib:Textual Studies-Hexapla".to_owned()]
    );
}

#[tokio::test]
async fn http_error_is_a_per_item_skip() {
    let (url, _server) = serve_once(
        "500 Internal Server Error",
        "application/json",
        r#"{"error":"overloaded"}"#,
    )
    .await;
    let provider: Arc<dyn LlmProvider> = Arc::new(
        OpenAiProvider::new(url, "sk-test", RunSettings::default().request_timeout())
            .expect("client builds"),
    );
    let memory = Arc::new(MemoryLibrary::new(
        vec![Record::new("r1").with_title("On the Hexapla")],
        vec![],
    ));
    let library: Arc<dyn Library> = memory.clone();

    let summary = TaggingPipeline::new(library, provider, PromptBuilder::new("gpt-test"))
        .run(memory.select(&[]).expect("select all"))
        .await;

    assert_eq!(summary.failed(), 1);
    assert!(memory.record("r1").expect("record exists").tags().is_empty());
}
