//! Content gate eligibility rules.

use std::sync::Arc;

use bibenrich::gate::ContentGate;
use bibenrich::library::{Attachment, ItemKind, MemoryLibrary, Record};
use bibenrich::outcome::SkipReason;

use crate::faulty::FaultyLibrary;

const PDF: &str = "application/pdf";

fn html(id: &str) -> Attachment {
    Attachment {
        id: id.to_owned(),
        content_type: "text/html".to_owned(),
        title: "Snapshot".to_owned(),
        text: Some("<p>page</p>".to_owned()),
    }
}

async fn admit(library: &MemoryLibrary, record: &Record) -> Result<String, SkipReason> {
    ContentGate::new(library, PDF).admit(record).await
}

#[tokio::test]
async fn notes_are_not_regular() {
    let library = MemoryLibrary::default();
    let note = Record::new("n1").with_kind(ItemKind::Note).with_attachment("a1");
    assert!(matches!(admit(&library, &note).await, Err(SkipReason::NotRegular)));
}

#[tokio::test]
async fn records_without_attachments_are_skipped() {
    let library = MemoryLibrary::default();
    let record = Record::new("r1").with_title("Lonely");
    assert!(matches!(
        admit(&library, &record).await,
        Err(SkipReason::NoAttachments)
    ));
}

#[tokio::test]
async fn existing_abstract_is_never_overwritten() {
    let library = MemoryLibrary::new(vec![], vec![Attachment::pdf("a1", Some("text"))]);
    let record = Record::new("r1")
        .with_abstract("Already written.")
        .with_attachment("a1");
    assert!(matches!(
        admit(&library, &record).await,
        Err(SkipReason::HasAbstract)
    ));
}

#[tokio::test]
async fn unsupported_attachments_are_passed_over() {
    let library = MemoryLibrary::new(
        vec![],
        vec![html("a1"), Attachment::pdf("a2", Some("Lorem ipsum"))],
    );
    let record = Record::new("r1").with_attachment("a1").with_attachment("a2");
    assert_eq!(admit(&library, &record).await.expect("pdf found"), "Lorem ipsum");
}

#[tokio::test]
async fn only_unsupported_attachments_means_no_supported_attachment() {
    let library = MemoryLibrary::new(vec![], vec![html("a1")]);
    let record = Record::new("r1").with_attachment("a1");
    assert!(matches!(
        admit(&library, &record).await,
        Err(SkipReason::NoSupportedAttachment)
    ));
}

#[tokio::test]
async fn empty_text_stops_at_first_supported_attachment() {
    let library = MemoryLibrary::new(
        vec![],
        vec![
            Attachment::pdf("a1", Some("   ")),
            Attachment::pdf("a2", Some("would have worked")),
        ],
    );
    let record = Record::new("r1").with_attachment("a1").with_attachment("a2");
    assert!(matches!(
        admit(&library, &record).await,
        Err(SkipReason::TextUnavailable { ref attachment }) if attachment == "a1"
    ));
}

#[tokio::test]
async fn missing_text_is_unavailable() {
    let library = MemoryLibrary::new(vec![], vec![Attachment::pdf("a1", None)]);
    let record = Record::new("r1").with_attachment("a1");
    assert!(matches!(
        admit(&library, &record).await,
        Err(SkipReason::TextUnavailable { .. })
    ));
}

#[tokio::test]
async fn text_access_errors_are_failures() {
    let library = Arc::new(MemoryLibrary::new(
        vec![],
        vec![Attachment::pdf("a1", Some("x"))],
    ));
    let faulty = FaultyLibrary::new(library).failing_text_for("a1");
    let record = Record::new("r1").with_attachment("a1");
    let reason = ContentGate::new(&faulty, PDF)
        .admit(&record)
        .await
        .expect_err("text unreadable");
    assert!(matches!(reason, SkipReason::TextAccess { .. }));
    assert!(reason.is_failure());
}

#[tokio::test]
async fn eligible_sequence_is_lazy_ordered_and_single_pass() {
    let library = MemoryLibrary::new(
        vec![],
        vec![
            Attachment::pdf("a1", Some("one")),
            Attachment::pdf("a3", Some("three")),
        ],
    );
    let records = vec![
        Record::new("r1").with_attachment("a1"),
        Record::new("r2"),
        Record::new("r3").with_attachment("a3"),
    ];
    let mut eligible = ContentGate::new(&library, PDF).select_eligible(records);

    let (first, text) = eligible.next().await.expect("r1 eligible");
    assert_eq!((first.id.as_str(), text.as_str()), ("r1", "one"));
    assert!(eligible.take_skipped().is_empty());

    let (second, _) = eligible.next().await.expect("r3 eligible");
    assert_eq!(second.id, "r3");
    let skipped = eligible.take_skipped();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].0, "r2");

    assert!(eligible.next().await.is_none());
    assert!(eligible.next().await.is_none());
}
