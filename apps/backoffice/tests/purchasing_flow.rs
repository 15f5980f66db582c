//! End-to-end purchasing flows through the command layer.

use chrono::NaiveDate;
use lanna_backoffice::commands::{draft, events, listing, matching, purchasing};
use lanna_backoffice::config::BackofficeConfig;
use lanna_backoffice::error::ErrorCode;
use lanna_backoffice::state::{DbState, DraftHeader, DraftLine, DraftState};
use lanna_core::{
    DnDraftPayload, DnLineInput, DocumentKind, DocumentStatus, DomainHint, ListFilter, Money,
    NewMatch, Quantity, TaxRate, TiDraftPayload, TiLineInput,
};
use lanna_db::{Database, DbConfig};

struct Fixture {
    db: DbState,
    config: BackofficeConfig,
    supplier_id: String,
    location_id: String,
    sku_ids: Vec<String>,
}

async fn fixture() -> Fixture {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let supplier_id = db
        .suppliers()
        .insert("S1", "บริษัท สยามฟู้ด จำกัด")
        .await
        .unwrap()
        .id;
    let location_id = db
        .locations()
        .insert("L1", "คลังสินค้าหลัก")
        .await
        .unwrap()
        .id;
    let mut sku_ids = Vec::new();
    for code in ["RICE-001", "RICE-002", "BEV-001"] {
        sku_ids.push(db.skus().insert(code, code).await.unwrap().id);
    }

    Fixture {
        db: DbState::new(db),
        config: BackofficeConfig::default(),
        supplier_id,
        location_id,
        sku_ids,
    }
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
}

impl Fixture {
    fn dn(&self, doc_no: &str, day: u32, quantities: &[i64]) -> DnDraftPayload {
        DnDraftPayload {
            id: None,
            supplier_id: self.supplier_id.clone(),
            location_id: self.location_id.clone(),
            doc_no: Some(doc_no.to_string()),
            doc_date: date(day),
            remark: None,
            domain_hint: DomainHint::Taxed,
            status: None,
            idempotency_key: None,
            lines: quantities
                .iter()
                .enumerate()
                .map(|(i, q)| DnLineInput {
                    line_no: i as u32 + 1,
                    sku_id: self.sku_ids[i % self.sku_ids.len()].clone(),
                    quantity: Quantity::from_units(*q),
                    provisional_unit_cost: Some(Money::from_satang(1250)),
                })
                .collect(),
        }
    }

    fn ti(&self, doc_no: &str, quantities: &[i64]) -> TiDraftPayload {
        TiDraftPayload {
            id: None,
            supplier_id: self.supplier_id.clone(),
            location_id: self.location_id.clone(),
            doc_no: Some(doc_no.to_string()),
            doc_date: date(12),
            remark: None,
            discount_amount: Money::zero(),
            freight_amount: Money::zero(),
            other_charge_amount: Money::zero(),
            status: None,
            idempotency_key: None,
            lines: quantities
                .iter()
                .enumerate()
                .map(|(i, q)| TiLineInput {
                    line_no: i as u32 + 1,
                    sku_id: self.sku_ids[i % self.sku_ids.len()].clone(),
                    quantity: Quantity::from_units(*q),
                    unit_cost: Money::from_satang(10_000),
                    line_discount: Money::zero(),
                    tax_rate: TaxRate::THAI_VAT,
                })
                .collect(),
        }
    }
}

#[tokio::test]
async fn create_forces_draft_status() {
    let fx = fixture().await;
    let mut payload = fx.dn("DN-001", 10, &[5]);
    payload.status = Some(DocumentStatus::Posted);

    let id = purchasing::save_dn_draft(&fx.db, payload).await.unwrap();
    let dn = purchasing::get_dn(&fx.db, &id).await.unwrap();

    assert_eq!(dn.status, DocumentStatus::Draft);
    assert!(dn.posted_at.is_none());
}

#[tokio::test]
async fn delivery_note_from_one_line_to_two() {
    let fx = fixture().await;

    let id = purchasing::save_dn_draft(&fx.db, fx.dn("DN-S1", 10, &[5]))
        .await
        .unwrap();
    let first = purchasing::get_dn(&fx.db, &id).await.unwrap();
    assert_eq!(first.supplier_id, fx.supplier_id);
    assert_eq!(first.location_id, fx.location_id);
    assert_eq!(first.doc_date, date(10));
    assert_eq!(first.domain_hint, DomainHint::Taxed);
    assert_eq!(first.lines.len(), 1);

    let mut update = fx.dn("DN-S1", 10, &[7, 3]);
    update.id = Some(id.clone());
    let same = purchasing::save_dn_draft(&fx.db, update).await.unwrap();
    assert_eq!(same, id);

    let second = purchasing::get_dn(&fx.db, &id).await.unwrap();
    let lines: Vec<(u32, Quantity)> = second.lines.iter().map(|l| (l.line_no, l.quantity)).collect();
    assert_eq!(
        lines,
        vec![(1, Quantity::from_units(7)), (2, Quantity::from_units(3))]
    );
    assert_eq!(second.status, DocumentStatus::Draft);
}

#[tokio::test]
async fn invalid_line_names_the_field_and_writes_nothing() {
    let fx = fixture().await;
    let mut payload = fx.dn("DN-BAD", 10, &[5, 1]);
    payload.lines[1].quantity = Quantity::zero();

    let err = purchasing::save_dn_draft(&fx.db, payload).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(err.field.as_deref(), Some("lines[1].quantity"));

    let page = listing::list_dns(&fx.db, &fx.config, listing::ListRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn post_then_repost_is_a_state_conflict() {
    let fx = fixture().await;
    let id = purchasing::save_dn_draft(&fx.db, fx.dn("DN-002", 10, &[4, 2]))
        .await
        .unwrap();

    purchasing::post_document(&fx.db, DocumentKind::DeliveryNote, &id, "somchai")
        .await
        .unwrap();
    let posted = purchasing::get_dn(&fx.db, &id).await.unwrap();
    assert_eq!(posted.status, DocumentStatus::Posted);
    assert_eq!(posted.posted_by.as_deref(), Some("somchai"));

    let movements = fx.db.inner().stock_movements().list_for_document(&id).await.unwrap();
    assert_eq!(movements.len(), 2);

    let err = purchasing::post_document(&fx.db, DocumentKind::DeliveryNote, &id, "somchai")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::StateConflict);

    // no second round of stock movements, lines untouched
    let again = fx.db.inner().stock_movements().list_for_document(&id).await.unwrap();
    assert_eq!(again.len(), 2);
    assert_eq!(purchasing::get_dn(&fx.db, &id).await.unwrap().lines.len(), 2);
}

#[tokio::test]
async fn voided_document_cannot_be_posted_or_edited() {
    let fx = fixture().await;
    let id = purchasing::save_ti_draft(&fx.db, fx.ti("TI-001", &[1]))
        .await
        .unwrap();

    purchasing::void_document(&fx.db, DocumentKind::TaxInvoice, &id, "malee")
        .await
        .unwrap();

    let err = purchasing::post_document(&fx.db, DocumentKind::TaxInvoice, &id, "malee")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::StateConflict);

    let ti = purchasing::get_ti(&fx.db, &id).await.unwrap();
    assert_eq!(ti.status, DocumentStatus::Void);
    assert!(ti.grand_total_amount.is_none());

    let mut update = fx.ti("TI-001", &[2]);
    update.id = Some(id);
    let err = purchasing::save_ti_draft(&fx.db, update).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::StateConflict);
}

#[tokio::test]
async fn posting_unknown_document_is_not_found() {
    let fx = fixture().await;
    let err = purchasing::post_document(
        &fx.db,
        DocumentKind::DeliveryNote,
        "5f0c8a9e-0000-4000-8000-000000000000",
        "somchai",
    )
    .await
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn tax_invoice_totals_are_stored_on_post() {
    let fx = fixture().await;
    let mut payload = fx.ti("TI-002", &[1]);
    payload.discount_amount = Money::from_satang(1_000);
    payload.freight_amount = Money::from_satang(5_000);

    let preview = purchasing::preview_ti_totals(&payload).unwrap();
    let id = purchasing::save_ti_draft(&fx.db, payload).await.unwrap();
    purchasing::post_document(&fx.db, DocumentKind::TaxInvoice, &id, "malee")
        .await
        .unwrap();

    let ti = purchasing::get_ti(&fx.db, &id).await.unwrap();
    assert_eq!(ti.subtotal_amount, Some(Money::from_satang(10_000)));
    assert_eq!(ti.vat_amount, Some(Money::from_satang(700)));
    assert_eq!(ti.grand_total_amount, Some(Money::from_satang(14_700)));
    assert_eq!(ti.grand_total_amount, Some(preview.grand_total));
}

#[tokio::test]
async fn posting_rule_message_reaches_the_caller() {
    let fx = fixture().await;
    fx.db
        .inner()
        .skus()
        .set_active(&fx.sku_ids[0], false)
        .await
        .unwrap();
    let id = purchasing::save_dn_draft(&fx.db, fx.dn("DN-003", 10, &[1]))
        .await
        .unwrap();

    let err = purchasing::post_document(&fx.db, DocumentKind::DeliveryNote, &id, "somchai")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PostingRejected);
    assert!(err.message.contains("inactive"), "{}", err.message);

    let dn = purchasing::get_dn(&fx.db, &id).await.unwrap();
    assert_eq!(dn.status, DocumentStatus::Draft);
}

#[tokio::test]
async fn date_range_is_inclusive_and_empty_when_reversed() {
    let fx = fixture().await;
    for day in [9, 10, 11, 12] {
        purchasing::save_dn_draft(&fx.db, fx.dn(&format!("DN-D{}", day), day, &[1]))
            .await
            .unwrap();
    }

    let request = |from: u32, to: u32| listing::ListRequest {
        filter: ListFilter {
            date_from: Some(date(from)),
            date_to: Some(date(to)),
            ..ListFilter::default()
        },
        ..listing::ListRequest::default()
    };

    let page = listing::list_dns(&fx.db, &fx.config, request(10, 11)).await.unwrap();
    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|r| r.doc_date >= date(10) && r.doc_date <= date(11)));

    let empty = listing::list_dns(&fx.db, &fx.config, request(12, 9)).await.unwrap();
    assert_eq!(empty.total, 0);
    assert!(empty.items.is_empty());
    assert_eq!(empty.page_count, 0);
}

#[tokio::test]
async fn pages_cover_every_row_exactly_once() {
    let fx = fixture().await;
    for n in 0..25 {
        purchasing::save_dn_draft(&fx.db, fx.dn(&format!("DN-P{:02}", n), (n % 28) + 1, &[1]))
            .await
            .unwrap();
    }

    let mut seen = std::collections::HashSet::new();
    let mut rows = 0;
    for page_no in 1..=3 {
        let page = listing::list_dns(
            &fx.db,
            &fx.config,
            listing::ListRequest {
                page: Some(page_no),
                page_size: Some(10),
                ..listing::ListRequest::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.page_count, 3);
        rows += page.items.len();
        for row in page.items {
            assert!(seen.insert(row.id), "row listed twice");
        }
    }
    assert_eq!(rows, 25);
}

#[tokio::test]
async fn match_without_invoice_line_then_delete() {
    let fx = fixture().await;
    let dn_id = purchasing::save_dn_draft(&fx.db, fx.dn("DN-M1", 10, &[10]))
        .await
        .unwrap();
    let dn_line_id = purchasing::get_dn(&fx.db, &dn_id).await.unwrap().lines[0].id.clone();

    let keep = matching::add_match(
        &fx.db,
        NewMatch {
            ti_line_id: None,
            dn_line_id: dn_line_id.clone(),
            qty_matched: Quantity::from_units(3),
            unit_cost_at_match: Money::from_satang(1200),
            idempotency_key: None,
        },
    )
    .await
    .unwrap();

    let added = matching::add_match(
        &fx.db,
        NewMatch {
            ti_line_id: None,
            dn_line_id: dn_line_id.clone(),
            qty_matched: Quantity::from_units(5),
            unit_cost_at_match: Money::from_satang(1250),
            idempotency_key: None,
        },
    )
    .await
    .unwrap();
    assert!(added.ti_line_id.is_none());
    assert_eq!(added.unit_cost_at_match.satang(), 1250);

    matching::delete_match(&fx.db, &added.id).await.unwrap();

    let remaining = matching::list_matches_for_dn_line(&fx.db, &dn_line_id)
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, keep.id);

    let err = matching::delete_match(&fx.db, &added.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);

    let summary = matching::dn_match_summary(&fx.db, &dn_id).await.unwrap();
    assert_eq!(summary[0].matched, Quantity::from_units(3));
    assert_eq!(summary[0].remaining, Quantity::from_units(7));
}

#[tokio::test]
async fn matches_respect_line_quantities_and_document_state() {
    let fx = fixture().await;
    let dn_id = purchasing::save_dn_draft(&fx.db, fx.dn("DN-M2", 10, &[10]))
        .await
        .unwrap();
    let ti_id = purchasing::save_ti_draft(&fx.db, fx.ti("TI-M2", &[6]))
        .await
        .unwrap();
    let dn_line_id = purchasing::get_dn(&fx.db, &dn_id).await.unwrap().lines[0].id.clone();
    let ti_line_id = purchasing::get_ti(&fx.db, &ti_id).await.unwrap().lines[0].id.clone();

    let input = |units: i64| NewMatch {
        ti_line_id: Some(ti_line_id.clone()),
        dn_line_id: dn_line_id.clone(),
        qty_matched: Quantity::from_units(units),
        unit_cost_at_match: Money::from_satang(10_000),
        idempotency_key: None,
    };

    let err = matching::add_match(&fx.db, input(7)).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);

    let m = matching::add_match(&fx.db, input(6)).await.unwrap();
    assert_eq!(matching::list_matches_for_ti(&fx.db, &ti_id).await.unwrap().len(), 1);

    // matched lines block void of the delivery note
    let err = purchasing::void_document(&fx.db, DocumentKind::DeliveryNote, &dn_id, "somchai")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::StateConflict);

    purchasing::post_document(&fx.db, DocumentKind::TaxInvoice, &ti_id, "malee")
        .await
        .unwrap();
    let err = matching::delete_match(&fx.db, &m.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::StateConflict);
}

#[tokio::test]
async fn draft_editor_submits_through_the_store() {
    let fx = fixture().await;
    let drafts = DraftState::new();

    draft::start_draft(&drafts, DocumentKind::DeliveryNote);
    draft::set_draft_header(
        &drafts,
        DraftHeader {
            supplier_id: fx.supplier_id.clone(),
            location_id: fx.location_id.clone(),
            doc_no: Some("DN-ED1".to_string()),
            doc_date: Some(date(15)),
            ..DraftHeader::default()
        },
    );
    for (sku, units) in fx.sku_ids.iter().zip([1, 2, 3]) {
        draft::add_draft_line(
            &drafts,
            DraftLine {
                line_no: 0,
                sku_id: sku.clone(),
                quantity: Quantity::from_units(units),
                unit_cost: None,
                line_discount: Money::zero(),
                tax_rate: TaxRate::zero(),
            },
        );
    }
    let edited = draft::remove_draft_line(&drafts, 1).unwrap();
    assert_eq!(
        edited.lines.iter().map(|l| l.line_no).collect::<Vec<_>>(),
        vec![1, 2]
    );

    let saved = draft::submit_draft(&fx.db, &drafts).await.unwrap();
    let id = saved.id.clone().unwrap();
    assert!(!saved.dirty);

    // a second submit updates the same document
    draft::remove_draft_line(&drafts, 2).unwrap();
    let resaved = draft::submit_draft(&fx.db, &drafts).await.unwrap();
    assert_eq!(resaved.id.as_deref(), Some(id.as_str()));

    let dn = purchasing::get_dn(&fx.db, &id).await.unwrap();
    assert_eq!(dn.lines.len(), 1);
    assert_eq!(dn.lines[0].quantity, Quantity::from_units(2));

    let reopened = draft::open_dn_draft(&fx.db, &drafts, &id).await.unwrap();
    assert_eq!(reopened.lines.len(), 1);
    assert_eq!(reopened.header.doc_no.as_deref(), Some("DN-ED1"));

    purchasing::post_document(&fx.db, DocumentKind::DeliveryNote, &id, "somchai")
        .await
        .unwrap();
    let err = draft::open_dn_draft(&fx.db, &drafts, &id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::StateConflict);
}

#[tokio::test]
async fn idempotent_create_returns_the_same_document() {
    let fx = fixture().await;
    let mut payload = fx.dn("DN-IDEM", 10, &[1]);
    payload.idempotency_key = Some("form-42".to_string());

    let first = purchasing::save_dn_draft(&fx.db, payload.clone()).await.unwrap();
    let second = purchasing::save_dn_draft(&fx.db, payload).await.unwrap();
    assert_eq!(first, second);

    let page = listing::list_dns(&fx.db, &fx.config, listing::ListRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn events_are_recorded_and_acknowledged() {
    let fx = fixture().await;
    let id = purchasing::save_dn_draft(&fx.db, fx.dn("DN-EV", 10, &[1]))
        .await
        .unwrap();
    purchasing::post_document(&fx.db, DocumentKind::DeliveryNote, &id, "somchai")
        .await
        .unwrap();

    let history = events::document_history(&fx.db, &id).await.unwrap();
    assert_eq!(history.len(), 2);

    let pending = events::pending_events(&fx.db, None).await.unwrap();
    for event in &pending {
        events::acknowledge_event(&fx.db, &event.id).await.unwrap();
    }
    assert!(events::pending_events(&fx.db, None).await.unwrap().is_empty());

    let err = events::acknowledge_event(&fx.db, &pending[0].id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}
