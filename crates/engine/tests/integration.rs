mod common;

use engine::{
    Actor, EngineError, EntityRef, EntryRole, ExpenseCategory, FULL_BP, IntegrationOutcome,
    IntegrationStatus, LedgerCategory, MoneyCents, ProfitabilityRefresh, RevenueCategory,
    SourceType,
};

use common::{
    PurchaseRow, count, engine_with_db, exec, insert_intervention, insert_lot, insert_purchase,
    insert_sale,
};

#[tokio::test]
async fn plain_purchase_creates_one_fully_allocated_expense() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-1", "L001", "confined").await;
    insert_purchase(&db, &PurchaseRow::plain("p-1", "lot-1", "L001")).await;

    let outcome = engine.integrate_purchase("p-1", &Actor::System).await.unwrap();
    assert_eq!(outcome.entry_ids().len(), 1);

    let entries = engine
        .ledger_entries_for_source(SourceType::Purchase, "p-1")
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(
        entry.category,
        LedgerCategory::Expense(ExpenseCategory::CattlePurchase)
    );
    assert_eq!(entry.amount, MoneyCents::from_units(840_000));
    assert_eq!(entry.created_by, Actor::System);
    assert_eq!(entry.due_date, common::day(2026, 2, 10));
    assert_eq!(entry.competence_date, common::day(2026, 1, 10));

    let allocations = engine.allocations_for_entry(entry.id).await.unwrap();
    assert_eq!(allocations.len(), 1);
    assert_eq!(allocations[0].entity, EntityRef::lot("lot-1"));
    assert_eq!(allocations[0].allocated_amount, entry.amount);
    assert_eq!(allocations[0].percentage_bp, 10_000);

    let record = engine
        .integration_record(SourceType::Purchase, "p-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, IntegrationStatus::Processed);
    assert_eq!(record.entry_ids, vec![entry.id]);
    assert_eq!(record.lot_id.as_deref(), Some("lot-1"));
    assert_eq!(record.attempts, 1);
    assert!(!record.needs_recompute);
}

#[tokio::test]
async fn broker_and_carrier_add_commission_and_freight_under_one_cost_center() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-1", "L001", "confined").await;
    insert_purchase(
        &db,
        &PurchaseRow::plain("p-1", "lot-1", "L001").with_broker_and_carrier(),
    )
    .await;

    engine.integrate_purchase("p-1", &Actor::System).await.unwrap();

    let mut amounts: Vec<(EntryRole, MoneyCents)> = engine
        .ledger_entries_for_source(SourceType::Purchase, "p-1")
        .await
        .unwrap()
        .into_iter()
        .map(|entry| (entry.source.unwrap().role, entry.amount))
        .collect();
    amounts.sort_by_key(|(role, _)| role.as_str());
    assert_eq!(
        amounts,
        vec![
            (EntryRole::Commission, MoneyCents::from_units(25_200)),
            (EntryRole::Purchase, MoneyCents::from_units(840_000)),
            (EntryRole::Transport, MoneyCents::from_units(5_000)),
        ]
    );
    assert_eq!(count(&db, "SELECT COUNT(*) FROM allocations").await, 3);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM cost_centers").await, 1);

    let center = engine.cost_center("CC_LOT_L001").await.unwrap().unwrap();
    assert_eq!(center.name, "Lot L001");
    let linked = count(
        &db,
        "SELECT COUNT(*) FROM ledger_entries WHERE cost_center_id IS NOT NULL",
    )
    .await;
    assert_eq!(linked, 3);
}

#[tokio::test]
async fn cost_center_is_created_once_per_lot_code() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-1", "L001", "confined").await;
    insert_purchase(&db, &PurchaseRow::plain("p-1", "lot-1", "L001")).await;
    insert_purchase(&db, &PurchaseRow::plain("p-2", "lot-1", "L001")).await;

    let first = engine
        .ensure_lot_cost_center("L001", &Actor::user("u-1"))
        .await
        .unwrap();
    engine.integrate_purchase("p-1", &Actor::System).await.unwrap();
    engine.integrate_purchase("p-2", &Actor::System).await.unwrap();
    let again = engine
        .ensure_lot_cost_center(" L001 ", &Actor::System)
        .await
        .unwrap();

    assert_eq!(first.id, again.id);
    assert_eq!(first.created_by, Actor::user("u-1"));
    assert_eq!(count(&db, "SELECT COUNT(*) FROM cost_centers").await, 1);

    let err = engine
        .ensure_lot_cost_center("  ", &Actor::System)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSource(_)));
}

#[tokio::test]
async fn sale_revenue_reaches_lot_profitability() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-1", "L001", "ready_for_sale").await;
    insert_sale(&db, "s-1", "lot-1").await;

    let outcome = engine.integrate_sale("s-1", &Actor::System).await.unwrap();
    let IntegrationOutcome::Integrated {
        lot_id,
        profitability,
        adopted,
        ..
    } = outcome
    else {
        panic!("sale was not integrated");
    };
    assert_eq!(lot_id, "lot-1");
    assert!(!adopted);

    let entries = engine
        .ledger_entries_for_source(SourceType::Sale, "s-1")
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].category,
        LedgerCategory::Revenue(RevenueCategory::CattleSale)
    );
    assert_eq!(entries[0].amount, MoneyCents::from_units(800_000));
    assert_eq!(entries[0].competence_date, common::day(2026, 6, 1));
    assert_eq!(entries[0].invoice_number.as_deref(), Some("NF-1"));

    let ProfitabilityRefresh::Fresh(fresh) = profitability else {
        panic!("profitability should be fresh");
    };
    assert_eq!(fresh.sale_revenue, MoneyCents::from_units(800_000));
    assert_eq!(fresh.total_revenue, MoneyCents::from_units(800_000));

    let stored = engine.lot_profitability("lot-1").await.unwrap().unwrap();
    assert!(stored.same_figures(&fresh));
}

#[tokio::test]
async fn second_integration_of_the_same_sale_writes_nothing() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-1", "L001", "ready_for_sale").await;
    insert_sale(&db, "s-1", "lot-1").await;

    engine.integrate_sale("s-1", &Actor::System).await.unwrap();
    let again = engine.integrate_sale("s-1", &Actor::System).await.unwrap();

    assert!(again.is_already_processed());
    assert_eq!(count(&db, "SELECT COUNT(*) FROM ledger_entries").await, 1);
    let record = engine
        .integration_record(SourceType::Sale, "s-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.attempts, 1);
}

#[tokio::test]
async fn intervention_becomes_per_animal_expense() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-1", "L001", "confined").await;
    insert_intervention(&db, "i-1", "lot-1", " vaccination ", 150_000).await;

    engine
        .integrate_intervention("i-1", &Actor::user("vet-7"))
        .await
        .unwrap();

    let entries = engine
        .ledger_entries_for_source(SourceType::Intervention, "i-1")
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].category,
        LedgerCategory::Expense(ExpenseCategory::Vaccine)
    );
    assert_eq!(entries[0].amount, MoneyCents::from_units(1_500));
    assert_eq!(entries[0].created_by, Actor::user("vet-7"));

    let profitability = engine.lot_profitability("lot-1").await.unwrap().unwrap();
    assert_eq!(profitability.costs.veterinary, MoneyCents::from_units(1_500));
}

#[tokio::test]
async fn free_intervention_becomes_a_zero_expense() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-1", "L001", "confined").await;
    insert_intervention(&db, "i-1", "lot-1", "EXAMINATION", 0).await;

    let outcome = engine
        .integrate_intervention("i-1", &Actor::System)
        .await
        .unwrap();
    assert_eq!(outcome.entry_ids().len(), 1);

    let entries = engine
        .ledger_entries_for_source(SourceType::Intervention, "i-1")
        .await
        .unwrap();
    assert_eq!(entries[0].amount, MoneyCents::ZERO);
    let allocations = engine.allocations_for_entry(entries[0].id).await.unwrap();
    assert_eq!(allocations.len(), 1);
    assert_eq!(allocations[0].allocated_amount, MoneyCents::ZERO);
    assert_eq!(allocations[0].percentage_bp, FULL_BP);

    let record = engine
        .integration_record(SourceType::Intervention, "i-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, IntegrationStatus::Processed);
}

#[tokio::test]
async fn sale_without_weight_becomes_a_zero_revenue() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-1", "L001", "ready_for_sale").await;
    insert_sale(&db, "s-0", "lot-1").await;
    exec(
        &db,
        "UPDATE sales SET slaughter_weight_kg = NULL WHERE id = ?",
        vec!["s-0".into()],
    )
    .await;

    let outcome = engine.integrate_sale("s-0", &Actor::System).await.unwrap();
    assert_eq!(outcome.entry_ids().len(), 1);

    let entries = engine
        .ledger_entries_for_source(SourceType::Sale, "s-0")
        .await
        .unwrap();
    assert_eq!(
        entries[0].category,
        LedgerCategory::Revenue(RevenueCategory::CattleSale)
    );
    assert_eq!(entries[0].amount, MoneyCents::ZERO);
    let allocations = engine.allocations_for_entry(entries[0].id).await.unwrap();
    assert_eq!(allocations.len(), 1);
    assert_eq!(allocations[0].entity, EntityRef::lot("lot-1"));
    assert_eq!(allocations[0].percentage_bp, FULL_BP);

    let record = engine
        .integration_record(SourceType::Sale, "s-0")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, IntegrationStatus::Processed);
    let profitability = engine.lot_profitability("lot-1").await.unwrap().unwrap();
    assert_eq!(profitability.sale_revenue, MoneyCents::ZERO);
}

#[tokio::test]
async fn negative_intervention_cost_is_rejected_and_recorded_as_error() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-1", "L001", "confined").await;
    insert_intervention(&db, "i-1", "lot-1", "EXAMINATION", -100).await;

    let err = engine
        .integrate_intervention("i-1", &Actor::System)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSource(_)));

    let record = engine
        .integration_record(SourceType::Intervention, "i-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, IntegrationStatus::Error);
    assert!(record.error_message.is_some());
    assert_eq!(count(&db, "SELECT COUNT(*) FROM ledger_entries").await, 0);
}

#[tokio::test]
async fn missing_source_is_not_found() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .integrate_purchase("nope", &Actor::System)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine
        .integrate_purchase("   ", &Actor::System)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidId(_)));
}

#[tokio::test]
async fn failed_allocation_write_rolls_back_the_entries() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-1", "L001", "confined").await;
    insert_purchase(
        &db,
        &PurchaseRow::plain("p-1", "lot-1", "L001").with_broker_and_carrier(),
    )
    .await;
    exec(&db, "DROP TABLE allocations", vec![]).await;

    let err = engine
        .integrate_purchase("p-1", &Actor::System)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PartialWrite(_)));

    assert_eq!(count(&db, "SELECT COUNT(*) FROM ledger_entries").await, 0);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM cost_centers").await, 0);
    let record = engine
        .integration_record(SourceType::Purchase, "p-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, IntegrationStatus::Error);
    assert!(record.entry_ids.is_empty());
}

#[tokio::test]
async fn errored_source_succeeds_on_retry_once_fixed() {
    let (engine, db) = engine_with_db().await;
    insert_sale(&db, "s-1", "lot-1").await;

    let err = engine.integrate_sale("s-1", &Actor::System).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    insert_lot(&db, "lot-1", "L001", "ready_for_sale").await;
    let outcome = engine.integrate_sale("s-1", &Actor::System).await.unwrap();
    assert_eq!(outcome.entry_ids().len(), 1);

    let record = engine
        .integration_record(SourceType::Sale, "s-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, IntegrationStatus::Processed);
    assert_eq!(record.attempts, 2);
    assert_eq!(record.error_message, None);
}

#[tokio::test]
async fn entries_committed_before_a_lost_status_write_are_adopted() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-1", "L001", "confined").await;
    insert_purchase(&db, &PurchaseRow::plain("p-1", "lot-1", "L001")).await;

    let first = engine.integrate_purchase("p-1", &Actor::System).await.unwrap();
    // The record write is lost: the entries are committed, the record is not.
    exec(&db, "DELETE FROM integration_records", vec![]).await;

    let second = engine.integrate_purchase("p-1", &Actor::System).await.unwrap();
    let IntegrationOutcome::Integrated {
        adopted, entry_ids, ..
    } = &second
    else {
        panic!("purchase should be integrated again");
    };
    assert!(adopted);
    assert_eq!(entry_ids, first.entry_ids());
    assert_eq!(count(&db, "SELECT COUNT(*) FROM ledger_entries").await, 1);

    let record = engine
        .integration_record(SourceType::Purchase, "p-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, IntegrationStatus::Processed);
    assert_eq!(&record.entry_ids, entry_ids);
}

#[tokio::test]
async fn pending_claim_over_committed_entries_adopts_them() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-1", "L001", "confined").await;
    insert_purchase(
        &db,
        &PurchaseRow::plain("p-1", "lot-1", "L001").with_broker_and_carrier(),
    )
    .await;

    let first = engine.integrate_purchase("p-1", &Actor::System).await.unwrap();
    // Another caller committed the entries but never got to mark the record.
    exec(
        &db,
        "UPDATE integration_records SET status = 'PENDING', entry_ids = '[]', \
         processed_at = NULL, lot_id = NULL",
        vec![],
    )
    .await;

    let second = engine.integrate_purchase("p-1", &Actor::System).await.unwrap();
    let IntegrationOutcome::Integrated {
        adopted, entry_ids, ..
    } = &second
    else {
        panic!("purchase should be integrated");
    };
    assert!(adopted);
    let mut expected = first.entry_ids().to_vec();
    let mut got = entry_ids.clone();
    expected.sort();
    got.sort();
    assert_eq!(got, expected);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM ledger_entries").await, 3);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM allocations").await, 3);

    let record = engine
        .integration_record(SourceType::Purchase, "p-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, IntegrationStatus::Processed);
    assert_eq!(record.attempts, 2);
    assert_eq!(record.lot_id.as_deref(), Some("lot-1"));
}

#[tokio::test]
async fn concurrent_integrations_write_one_set_of_entries() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-1", "L001", "confined").await;
    insert_purchase(
        &db,
        &PurchaseRow::plain("p-1", "lot-1", "L001").with_broker_and_carrier(),
    )
    .await;

    let actor = Actor::System;
    let (a, b) = tokio::join!(
        engine.integrate_purchase("p-1", &actor),
        engine.integrate_purchase("p-1", &actor)
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(count(&db, "SELECT COUNT(*) FROM ledger_entries").await, 3);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM allocations").await, 3);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM cost_centers").await, 1);
    let record = engine
        .integration_record(SourceType::Purchase, "p-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, IntegrationStatus::Processed);
}

#[tokio::test]
async fn failed_recompute_leaves_the_lot_stale_until_refreshed() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-1", "L001", "confined").await;
    insert_purchase(&db, &PurchaseRow::plain("p-1", "lot-1", "L001")).await;
    // An entry the profitability calculator cannot read.
    exec(
        &db,
        "INSERT INTO ledger_entries (id, kind, category, description, amount_minor, due_date, \
         competence_date, settled, allocation_method, lot_id, created_by, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            "00000000-0000-0000-0000-000000000001".into(),
            "expense".into(),
            "bogus".into(),
            "imported by hand".into(),
            100i64.into(),
            common::day(2026, 1, 1).into(),
            common::day(2026, 1, 1).into(),
            false.into(),
            "per_lot".into(),
            Some("lot-1".to_string()).into(),
            "system".into(),
            common::day(2026, 1, 1).into(),
        ],
    )
    .await;

    let outcome = engine.integrate_purchase("p-1", &Actor::System).await.unwrap();
    let IntegrationOutcome::Integrated { profitability, .. } = outcome else {
        panic!("purchase should be integrated");
    };
    assert!(profitability.is_stale());
    assert!(engine.lot_profitability("lot-1").await.unwrap().is_none());

    let report = engine.integration_report().await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.stale, 1);

    let still_failing = engine.refresh_stale_profitability().await.unwrap();
    assert_eq!(still_failing.failed.len(), 1);
    assert!(still_failing.refreshed.is_empty());

    exec(
        &db,
        "DELETE FROM ledger_entries WHERE category = 'bogus'",
        vec![],
    )
    .await;
    let refreshed = engine.refresh_stale_profitability().await.unwrap();
    assert_eq!(refreshed.refreshed, vec!["lot-1".to_string()]);

    let report = engine.integration_report().await.unwrap();
    assert_eq!(report.stale, 0);
    let profitability = engine.lot_profitability("lot-1").await.unwrap().unwrap();
    assert_eq!(profitability.costs.purchase, MoneyCents::from_units(840_000));
}
