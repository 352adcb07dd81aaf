use pretty_assertions::assert_eq;
use spacecopy_core::ContentClient;
use spacecopy_core::Migrator;
use spacecopy_core::propagate::AssetPropagator;
use spacecopy_core::propagate::AttachmentOutcome;
use spacecopy_core::propagate::LabelOutcome;
use spacecopy_test_support::RecordingSleeper;
use spacecopy_test_support::migration_config;
use spacecopy_test_support::source_and_destination;

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(a, b)| ((*a).to_string(), (*b).to_string()))
        .collect()
}

#[tokio::test]
async fn labels_are_copied_as_one_batch_with_namespaces() {
    let (source, destination) = source_and_destination().await;
    let page = source.add_page("Runbook", "<p/>", None);
    source.add_label(&page, "global", "ops");
    source.add_label(&page, "my", "draft");

    let config = migration_config(&source, &destination);
    let report = Migrator::with_sleeper(&config, RecordingSleeper::new())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.labels_copied, 2);
    let copied = destination.only_page_titled("Runbook");
    assert_eq!(copied.labels, pairs(&[("global", "ops"), ("my", "draft")]));
    let label_path = format!("/rest/api/content/{}/label", copied.id);
    assert_eq!(destination.count_requests("POST", &label_path).await, 1);
}

#[tokio::test]
async fn failing_download_does_not_block_siblings() {
    let (source, destination) = source_and_destination().await;
    let page = source.add_page("Diagrams", "<p/>", None);
    source.add_attachment(&page, "first.png", b"\x89PNG first");
    source.add_attachment(&page, "broken.pdf", b"%PDF");
    source.add_attachment(&page, "third.txt", b"third\r\n--not-a-boundary");
    source.fail_download("broken.pdf");

    let config = migration_config(&source, &destination);
    let report = Migrator::with_sleeper(&config, RecordingSleeper::new())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.attachments_copied, 2);
    assert_eq!(report.attachment_failures, 1);
    let copied = destination.only_page_titled("Diagrams");
    assert_eq!(
        copied.attachments,
        vec![
            ("first.png".to_string(), b"\x89PNG first".to_vec()),
            ("third.txt".to_string(), b"third\r\n--not-a-boundary".to_vec()),
        ]
    );
}

#[tokio::test]
async fn label_write_failure_is_swallowed() {
    let (source, destination) = source_and_destination().await;
    let page = source.add_page("Runbook", "<p/>", None);
    source.add_label(&page, "global", "ops");
    source.add_attachment(&page, "notes.txt", b"hello");
    destination.fail_label_writes();

    let config = migration_config(&source, &destination);
    let report = Migrator::with_sleeper(&config, RecordingSleeper::new())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.label_failures, 1);
    assert_eq!(report.attachments_copied, 1);
    assert!(destination.only_page_titled("Runbook").labels.is_empty());
}

#[tokio::test]
async fn disabled_assets_are_not_requested() {
    let (source, destination) = source_and_destination().await;
    let page = source.add_page("Runbook", "<p/>", None);
    source.add_label(&page, "global", "ops");
    source.add_attachment(&page, "notes.txt", b"hello");

    let mut config = migration_config(&source, &destination);
    config.copy_labels = false;
    config.copy_attachments = false;
    let report = Migrator::with_sleeper(&config, RecordingSleeper::new())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.labels_copied + report.attachments_copied, 0);
    let label_path = format!("/rest/api/content/{page}/label");
    let attachment_path = format!("/rest/api/content/{page}/child/attachment");
    assert_eq!(source.count_requests("GET", &label_path).await, 0);
    assert_eq!(source.count_requests("GET", &attachment_path).await, 0);
}

#[tokio::test]
async fn propagator_reports_typed_outcomes() {
    let (source, destination) = source_and_destination().await;
    let page = source.add_page("Runbook", "<p/>", None);
    source.add_attachment(&page, "a.txt", b"a");
    source.add_attachment(&page, "gone.txt", b"g");
    source.fail_download("gone.txt");
    let target = destination.add_page("Runbook", "<p/>", None);

    let config = migration_config(&source, &destination);
    let src = ContentClient::from_config(&config.source, &config, Some(RecordingSleeper::new())).unwrap();
    let dst =
        ContentClient::from_config(&config.destination, &config, Some(RecordingSleeper::new())).unwrap();

    let outcome = AssetPropagator::new(&src, &dst, true, true)
        .propagate(&page, &target)
        .await;

    assert_eq!(outcome.labels, LabelOutcome::NoLabels);
    assert_eq!(
        outcome.attachments,
        Some(AttachmentOutcome {
            copied: 1,
            skipped: 0,
            failed: vec!["gone.txt".to_string()],
            listing_error: None,
        })
    );
}
