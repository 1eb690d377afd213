//! Tagging flow orchestration.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use bibenrich::library::{Library, MemoryLibrary, Record, SaveMode};
use bibenrich::outcome::SkipReason;
use bibenrich::pipeline::TaggingPipeline;
use bibenrich::prompts::PromptBuilder;
use bibenrich::providers::LlmProvider;

use crate::faulty::FaultyLibrary;
use crate::scripted::{api_error, ScriptedProvider};

fn pipeline(library: &Arc<MemoryLibrary>, provider: &Arc<ScriptedProvider>) -> TaggingPipeline {
    let library: Arc<dyn Library> = library.clone();
    pipeline_over(library, provider)
}

fn pipeline_over(
    library: Arc<dyn Library>,
    provider: &Arc<ScriptedProvider>,
) -> TaggingPipeline {
    let provider: Arc<dyn LlmProvider> = provider.clone();
    TaggingPipeline::new(library, provider, PromptBuilder::new("gpt-test"))
}

fn library_of(records: Vec<Record>) -> Arc<MemoryLibrary> {
    Arc::new(MemoryLibrary::new(records, vec![]))
}

#[tokio::test(start_paused = true)]
async fn fenced_reply_adds_exactly_that_tag_without_pausing() {
    let library = library_of(vec![Record::new("r1").with_title("On the Hexapla")]);
    let provider = Arc::new(ScriptedProvider::always(
        "```json\n[\"Bib:Textual Studies-Hexapla\"]\n```",
        1,
    ));

    let started = Instant::now();
    let summary = pipeline(&library, &provider)
        .run(library.select(&[]).expect("select all"))
        .await;

    let stored = library.record("r1").expect("record exists");
    assert_eq!(stored.tags(), ["Bib:Textual Studies-Hexapla".to_owned()]);
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(library.saves(), vec![("r1".to_owned(), SaveMode::Simple)]);
    assert_eq!(summary.enriched, 1);
}

#[tokio::test]
async fn classification_prompt_uses_title_and_abstract() {
    let library = library_of(vec![Record::new("r1")
        .with_title("On the Hexapla")
        .with_abstract("Origen's six columns.")]);
    let provider = Arc::new(ScriptedProvider::always("[]", 1));

    pipeline(&library, &provider)
        .run(library.select(&[]).expect("select all"))
        .await;

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].messages[1]
        .content
        .contains("On the Hexapla\n\nOrigen's six columns."));
    assert!(requests[0].messages[1]
        .content
        .contains("Textual Studies-Hexapla"));
}

#[tokio::test]
async fn applying_same_tags_twice_keeps_one_copy() {
    let library = library_of(vec![Record::new("r1").with_title("Critical editions")]);
    let provider = Arc::new(ScriptedProvider::always("[\"Bib:Editions\"]", 2));
    let tagging = pipeline(&library, &provider);

    tagging.run(library.select(&[]).expect("select all")).await;
    tagging.run(library.select(&[]).expect("select all")).await;

    let stored = library.record("r1").expect("record exists");
    assert_eq!(stored.tags(), ["Bib:Editions".to_owned()]);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn malformed_replies_leave_tags_unchanged() {
    let library = library_of(vec![
        Record::new("prose").with_title("A").with_tag("Existing"),
        Record::new("object").with_title("B").with_tag("Existing"),
    ]);
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok("not json".to_owned()),
        Ok("```json\n{\"tags\": [\"Bib:Canon\"]}\n```".to_owned()),
    ]));

    let summary = pipeline(&library, &provider)
        .run(library.select(&[]).expect("select all"))
        .await;

    for id in ["prose", "object"] {
        let stored = library.record(id).expect("record exists");
        assert_eq!(stored.tags(), ["Existing".to_owned()]);
        assert!(matches!(summary.reason_for(id), Some(SkipReason::Decode(_))));
    }
    assert!(library.saves().is_empty());
    assert_eq!(summary.failed(), 2);
}

#[tokio::test]
async fn blank_records_are_skipped_before_calling() {
    let library = library_of(vec![Record::new("r1")]);
    let provider = Arc::new(ScriptedProvider::always("[]", 1));

    let summary = pipeline(&library, &provider)
        .run(library.select(&[]).expect("select all"))
        .await;

    assert_eq!(provider.calls(), 0);
    assert!(matches!(summary.reason_for("r1"), Some(SkipReason::EmptyInput)));
    assert_eq!(summary.failed(), 0);
}

#[tokio::test]
async fn tags_outside_vocabulary_are_applied_verbatim() {
    let library = library_of(vec![Record::new("r1").with_title("Misc")]);
    let provider = Arc::new(ScriptedProvider::always("[\"Invented\", \"Bib:Canon\"]", 1));

    pipeline(&library, &provider)
        .run(library.select(&[]).expect("select all"))
        .await;

    let stored = library.record("r1").expect("record exists");
    assert_eq!(
        stored.tags(),
        ["Invented".to_owned(), "Bib:Canon".to_owned()]
    );
}

#[tokio::test]
async fn failed_call_does_not_stop_later_records() {
    let library = library_of(vec![
        Record::new("r1").with_title("First"),
        Record::new("r2").with_title("Second"),
    ]);
    let provider = Arc::new(ScriptedProvider::new(vec![
        Err(api_error(500)),
        Ok("[\"Bib:Philo\"]".to_owned()),
    ]));

    let summary = pipeline(&library, &provider)
        .run(library.select(&[]).expect("select all"))
        .await;

    assert!(library.record("r1").expect("r1").tags().is_empty());
    assert!(library.record("r2").expect("r2").has_tag("Bib:Philo"));
    assert!(matches!(
        summary.reason_for("r1"),
        Some(SkipReason::Completion(_))
    ));
    assert_eq!(summary.enriched, 1);
}

#[tokio::test]
async fn save_failure_is_reported_per_record() {
    let library = library_of(vec![Record::new("r1").with_title("Locked")]);
    let faulty: Arc<dyn Library> =
        Arc::new(FaultyLibrary::new(library.clone()).rejecting_saves_for("r1"));
    let provider = Arc::new(ScriptedProvider::always("[\"Bib:Canon\"]", 1));

    let summary = pipeline_over(faulty, &provider)
        .run(library.select(&[]).expect("select all"))
        .await;

    assert!(library.record("r1").expect("r1").tags().is_empty());
    assert!(matches!(
        summary.reason_for("r1"),
        Some(SkipReason::Persistence(_))
    ));
}

#[tokio::test]
async fn empty_selection_is_a_no_op() {
    let library = library_of(vec![]);
    let provider = Arc::new(ScriptedProvider::always("[]", 1));

    let summary = pipeline(&library, &provider).run(Vec::new()).await;

    assert_eq!(summary.total, 0);
    assert_eq!(provider.calls(), 0);
}
