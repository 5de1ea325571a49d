//! Integration tests for the intake, update, delete and listing flows.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use common::{pdf_file, OrderBuilder, TestHarness};
use ordarchive::db::orphan_repo;
use ordarchive::extraction::{DocumentExtractor, ExtractionError, ExtractionResult};
use ordarchive::intake::{IntakeError, Prefill, PREFILL_UNAVAILABLE_NOTICE};
use ordarchive::{OrderEventKind, OrderFilter, UploadedFile};

#[tokio::test]
async fn test_add_then_list_contains_exactly_the_new_record() {
    let h = TestHarness::new();

    let record = h
        .service
        .add_order(
            OrderBuilder::new("45-K")
                .employee("Иванов И.И.")
                .description("Ежегодный отпуск")
                .basis("Заявление")
                .build(),
        )
        .await
        .unwrap();

    let listing = h.service.list_orders(&OrderFilter::default()).await.unwrap();
    assert_eq!(listing.len(), 1);
    let listed = &listing[0];
    assert_eq!(listed, &record);
    assert_eq!(listed.order_number, "45-K");
    assert_eq!(listed.order_date, NaiveDate::from_ymd_opt(2026, 2, 15).unwrap());
    assert_eq!(listed.order_type, "Отпуск");
    assert_eq!(listed.employee_name.as_deref(), Some("Иванов И.И."));
    assert_eq!(listed.basis.as_deref(), Some("Заявление"));
    assert!(h.blobs.contains_url(&listed.pdf_url));
}

#[tokio::test]
async fn test_scenario_45_k_is_listed_first() {
    let h = TestHarness::new();
    h.service
        .add_order(OrderBuilder::new("12-Ө").order_type("Основная деятельность").build())
        .await
        .unwrap();

    let record = h
        .service
        .add_order(
            OrderBuilder::new("45-K")
                .date("2026-02-15")
                .order_type("Отпуск")
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(record.order_date.to_string(), "2026-02-15");
    let listing = h.service.list_orders(&OrderFilter::default()).await.unwrap();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].id, record.id);
}

#[tokio::test]
async fn test_listing_is_newest_first() {
    let h = TestHarness::new();
    let mut ids = Vec::new();
    for n in 1..=5 {
        let record = h
            .service
            .add_order(OrderBuilder::new(&format!("{}-K", n)).build())
            .await
            .unwrap();
        ids.push(record.id);
    }

    let listing = h.service.list_orders(&OrderFilter::default()).await.unwrap();
    let listed: Vec<&str> = listing.iter().map(|r| r.id.as_str()).collect();
    let expected: Vec<&str> = ids.iter().rev().map(String::as_str).collect();
    assert_eq!(listed, expected);
    assert!(listing
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));
}

#[tokio::test]
async fn test_missing_required_fields_never_touch_storage() {
    let h = TestHarness::new();

    let cases = vec![
        OrderBuilder::new("").build(),
        OrderBuilder::new("   ").build(),
        OrderBuilder::new("45-K").date("").build(),
        OrderBuilder::new("45-K").date("2026-02-30").build(),
        OrderBuilder::new("45-K").order_type("").build(),
        OrderBuilder::new("45-K").without_file().build(),
        OrderBuilder::new("45-K")
            .file(UploadedFile::new("empty.pdf", Vec::new()))
            .build(),
        OrderBuilder::new("45-K")
            .file(UploadedFile::new("notes.txt", b"hello".to_vec()))
            .build(),
    ];

    for input in cases {
        let err = h.service.add_order(input).await.unwrap_err();
        assert!(matches!(err, IntakeError::Validation(_)), "{:?}", err);
    }

    assert_eq!(h.blobs.store_calls(), 0);
    assert_eq!(h.service.count_orders().await.unwrap(), 0);
}

#[tokio::test]
async fn test_empty_order_number_names_the_field() {
    let h = TestHarness::new();
    match h.service.add_order(OrderBuilder::new("").build()).await {
        Err(IntakeError::Validation(e)) => {
            assert_eq!(e.fields(), vec!["orderNumber"]);
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(h.blobs.len(), 0);
}

#[tokio::test]
async fn test_upload_failure_leaves_no_record() {
    let h = TestHarness::new();
    h.blobs.fail_store(true);

    let err = h
        .service
        .add_order(OrderBuilder::new("45-K").build())
        .await
        .unwrap_err();

    assert!(matches!(err, IntakeError::UploadFailed(_)));
    assert_eq!(h.service.count_orders().await.unwrap(), 0);
}

#[tokio::test]
async fn test_persist_failure_removes_the_stored_blob() {
    let h = TestHarness::new();
    h.break_orders_table();

    let err = h
        .service
        .add_order(OrderBuilder::new("45-K").build())
        .await
        .unwrap_err();

    assert!(matches!(err, IntakeError::Persistence { op: "insert", .. }));
    assert_eq!(h.blobs.store_calls(), 1);
    assert_eq!(h.blobs.len(), 0);
    assert!(orphan_repo::list(&h.db).unwrap().is_empty());
}

#[tokio::test]
async fn test_orphan_recorded_then_reconciled() {
    let h = TestHarness::new();
    h.break_orders_table();
    h.blobs.fail_remove(true);

    h.service
        .add_order(OrderBuilder::new("45-K").build())
        .await
        .unwrap_err();

    let orphans = orphan_repo::list(&h.db).unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(h.blobs.len(), 1);
    assert!(h.blobs.contains_url(&orphans[0].blob_url));

    let report = h.service.reconcile_orphans().await.unwrap();
    assert_eq!((report.attempted, report.removed, report.remaining), (1, 0, 1));

    h.blobs.fail_remove(false);
    let report = h.service.reconcile_orphans().await.unwrap();
    assert_eq!((report.attempted, report.removed, report.remaining), (1, 1, 0));
    assert_eq!(h.blobs.len(), 0);
    assert!(orphan_repo::list(&h.db).unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_twice_is_one_success_and_one_not_found() {
    let h = TestHarness::new();
    let keep = h
        .service
        .add_order(OrderBuilder::new("1-K").build())
        .await
        .unwrap();
    let doomed = h
        .service
        .add_order(OrderBuilder::new("2-K").build())
        .await
        .unwrap();

    let outcome = h
        .service
        .delete_order(&doomed.id, Some(&doomed.pdf_url))
        .await
        .unwrap();
    assert!(outcome.blob_removed);

    let second = h
        .service
        .delete_order(&doomed.id, Some(&doomed.pdf_url))
        .await;
    assert!(matches!(second, Err(IntakeError::NotFound { .. })));

    let listing = h.service.list_orders(&OrderFilter::default()).await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id, keep.id);
    assert!(h.blobs.contains_url(&keep.pdf_url));
}

#[tokio::test]
async fn test_delete_with_blob_already_removed_still_deletes_record() {
    let h = TestHarness::new();
    let record = h
        .service
        .add_order(OrderBuilder::new("45-K").build())
        .await
        .unwrap();
    h.blobs.evict(&record.pdf_url);

    let outcome = h
        .service
        .delete_order(&record.id, Some(&record.pdf_url))
        .await
        .unwrap();

    assert!(!outcome.blob_removed);
    assert!(outcome.blob_error.is_some());
    assert_eq!(h.service.count_orders().await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_uses_stored_url_over_supplied_one() {
    let h = TestHarness::new();
    let a = h
        .service
        .add_order(OrderBuilder::new("1-K").build())
        .await
        .unwrap();
    let b = h
        .service
        .add_order(OrderBuilder::new("2-K").build())
        .await
        .unwrap();

    h.service.delete_order(&a.id, Some(&b.pdf_url)).await.unwrap();

    assert!(!h.blobs.contains_url(&a.pdf_url));
    assert!(h.blobs.contains_url(&b.pdf_url));
}

#[tokio::test]
async fn test_update_never_changes_pdf_url() {
    let h = TestHarness::new();
    let record = h
        .service
        .add_order(OrderBuilder::new("45-K").build())
        .await
        .unwrap();

    let update = OrderBuilder::new("46-K")
        .order_type("ЖҚ - Личный состав")
        .sub_type("командировка")
        .employee("Петров П.П.")
        .pdf_url("https://evil.example.com/other.pdf")
        .without_file()
        .build();
    let updated = h.service.update_order(&record.id, &update).await.unwrap();

    assert_eq!(updated.pdf_url, record.pdf_url);
    assert_eq!(updated.created_at, record.created_at);
    assert_eq!(updated.order_number, "46-K");
    assert_eq!(updated.sub_type.as_deref(), Some("Командировка"));

    let fetched = h.service.get_order(&record.id).await.unwrap();
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn test_update_unknown_and_invalid() {
    let h = TestHarness::new();
    let missing = h
        .service
        .update_order("no-such-id", &OrderBuilder::new("1-K").build())
        .await;
    assert!(matches!(missing, Err(IntakeError::NotFound { .. })));

    let record = h
        .service
        .add_order(OrderBuilder::new("45-K").build())
        .await
        .unwrap();
    let invalid = h
        .service
        .update_order(&record.id, &OrderBuilder::new("").build())
        .await;
    assert!(matches!(invalid, Err(IntakeError::Validation(_))));
    assert_eq!(
        h.service.get_order(&record.id).await.unwrap().order_number,
        "45-K"
    );
}

#[tokio::test]
async fn test_search_returns_exact_matching_subset() {
    let h = TestHarness::new();
    let inputs = vec![
        OrderBuilder::new("45-K").employee("Иванов").build(),
        OrderBuilder::new("12-Ө")
            .order_type("Основная деятельность")
            .description("Создание комиссии по ИВАНОВСКОЙ улице")
            .build(),
        OrderBuilder::new("7-ЖҚ")
            .order_type("Командировка")
            .basis("Служебная записка")
            .build(),
        OrderBuilder::new("100%").build(),
    ];
    for input in inputs {
        h.service.add_order(input).await.unwrap();
    }

    let numbers = |listing: &[ordarchive::ArchiveRecord]| {
        let mut n: Vec<String> = listing.iter().map(|r| r.order_number.clone()).collect();
        n.sort();
        n
    };

    let hits = h.service.list_orders(&OrderFilter::search("иванов")).await.unwrap();
    assert_eq!(numbers(hits.as_slice()), vec!["12-Ө", "45-K"]);

    let hits = h.service.list_orders(&OrderFilter::search("ЗАПИСКА")).await.unwrap();
    assert_eq!(numbers(hits.as_slice()), vec!["7-ЖҚ"]);

    let hits = h.service.list_orders(&OrderFilter::search("отпуск")).await.unwrap();
    assert_eq!(numbers(hits.as_slice()), vec!["100%", "45-K"]);

    let hits = h.service.list_orders(&OrderFilter::search("%")).await.unwrap();
    assert_eq!(numbers(hits.as_slice()), vec!["100%"]);

    let all = h.service.list_orders(&OrderFilter::default()).await.unwrap();
    let blank = h.service.list_orders(&OrderFilter::search("")).await.unwrap();
    assert_eq!(all, blank);
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn test_listing_reflects_mutations_despite_cache() {
    let h = TestHarness::new();
    assert!(h
        .service
        .list_orders(&OrderFilter::default())
        .await
        .unwrap()
        .is_empty());

    let record = h
        .service
        .add_order(OrderBuilder::new("45-K").build())
        .await
        .unwrap();
    assert_eq!(
        h.service.list_orders(&OrderFilter::default()).await.unwrap().len(),
        1
    );

    h.service.delete_order(&record.id, None).await.unwrap();
    assert!(h
        .service
        .list_orders(&OrderFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_mutations_are_broadcast() {
    let h = TestHarness::new();
    let mut rx = h.service.events().subscribe();

    let record = h
        .service
        .add_order(OrderBuilder::new("45-K").build())
        .await
        .unwrap();
    h.service
        .update_order(&record.id, &OrderBuilder::new("46-K").build())
        .await
        .unwrap();
    h.service.delete_order(&record.id, None).await.unwrap();

    let kinds: Vec<OrderEventKind> = (0..3).map(|_| rx.try_recv().unwrap().kind).collect();
    assert_eq!(
        kinds,
        vec![
            OrderEventKind::Created,
            OrderEventKind::Updated,
            OrderEventKind::Deleted
        ]
    );
}

#[tokio::test]
async fn test_same_file_name_twice_yields_two_blobs() {
    let h = TestHarness::new();
    let a = h
        .service
        .add_order(OrderBuilder::new("1-K").file(pdf_file("prikaz.pdf")).build())
        .await
        .unwrap();
    let b = h
        .service
        .add_order(OrderBuilder::new("2-K").file(pdf_file("prikaz.pdf")).build())
        .await
        .unwrap();

    assert_ne!(a.pdf_url, b.pdf_url);
    assert_eq!(h.blobs.len(), 2);
}

struct FixedExtractor(ExtractionResult);

#[async_trait]
impl DocumentExtractor for FixedExtractor {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn extract(
        &self,
        _bytes: &[u8],
        _file_name: &str,
    ) -> Result<ExtractionResult, ExtractionError> {
        Ok(self.0.clone())
    }
}

struct StalledExtractor;

#[async_trait]
impl DocumentExtractor for StalledExtractor {
    fn name(&self) -> &'static str {
        "stalled"
    }

    async fn extract(
        &self,
        _bytes: &[u8],
        _file_name: &str,
    ) -> Result<ExtractionResult, ExtractionError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ExtractionResult::default())
    }
}

#[tokio::test]
async fn test_prefill_available() {
    let result = ExtractionResult {
        order_number: Some("45-К".to_string()),
        order_date: Some("2026-02-15".to_string()),
        ..Default::default()
    };
    let h = TestHarness::with_extractor(Arc::new(FixedExtractor(result.clone())));

    let prefill = h.service.prefill(common::MINIMAL_PDF, "scan.pdf").await;
    assert_eq!(prefill, Prefill::Available(result));
}

#[tokio::test]
async fn test_prefill_disabled_is_advisory() {
    let h = TestHarness::new();
    match h.service.prefill(common::MINIMAL_PDF, "scan.pdf").await {
        Prefill::Unavailable { notice, reason } => {
            assert_eq!(notice, PREFILL_UNAVAILABLE_NOTICE);
            assert_eq!(reason, "extraction disabled");
        }
        other => panic!("expected unavailable prefill, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_prefill_times_out() {
    let h = TestHarness::with_extractor(Arc::new(StalledExtractor));
    let prefill = h.service.prefill(common::MINIMAL_PDF, "scan.pdf").await;
    assert!(matches!(prefill, Prefill::Unavailable { .. }));
}
