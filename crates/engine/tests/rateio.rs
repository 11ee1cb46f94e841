mod common;

use engine::{
    Actor, AllocationMethod, EngineError, ExpenseCategory, MoneyCents, RateioOutcome,
    SharedExpenseCmd,
};

use common::{count, day, engine_with_db, insert_lot};

fn feed(amount: MoneyCents) -> SharedExpenseCmd {
    SharedExpenseCmd::new(ExpenseCategory::CattleFeed, "Silage, March", amount, day(2026, 3, 1))
}

#[tokio::test]
async fn shared_expense_is_split_evenly_across_active_lots() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-a", "A", "confined").await;
    insert_lot(&db, "lot-b", "B", "quarantine").await;
    insert_lot(&db, "lot-c", "C", "ready_for_sale").await;
    insert_lot(&db, "lot-sold", "S", "sold").await;

    let expense = engine
        .record_shared_expense(feed(MoneyCents::from_units(9_000)), &Actor::user("u-1"))
        .await
        .unwrap();
    assert_eq!(expense.allocation_method, AllocationMethod::Global);
    assert_eq!(expense.due_date, expense.competence_date);

    let report = engine
        .allocate_global_expenses(&Actor::System)
        .await
        .unwrap();
    assert_eq!(report.outcome, RateioOutcome::Allocated);
    assert_eq!(report.pending_expenses, 1);
    assert_eq!(report.allocated, vec![expense.id]);
    assert_eq!(report.active_lots, vec!["lot-a", "lot-b", "lot-c"]);
    assert!(report.stale_lots.is_empty());

    let allocations = engine.allocations_for_entry(expense.id).await.unwrap();
    assert_eq!(allocations.len(), 3);
    assert!(
        allocations
            .iter()
            .all(|a| a.allocated_amount == MoneyCents::from_units(3_000))
    );
    let total: MoneyCents = allocations.iter().map(|a| a.allocated_amount).sum();
    assert_eq!(total, expense.amount);
    let bp: i64 = allocations.iter().map(|a| a.percentage_bp).sum();
    assert_eq!(bp, 10_000);

    for lot_id in ["lot-a", "lot-b", "lot-c"] {
        let profitability = engine.lot_profitability(lot_id).await.unwrap().unwrap();
        assert_eq!(profitability.costs.feed, MoneyCents::from_units(3_000));
    }
    assert!(engine.lot_profitability("lot-sold").await.unwrap().is_none());
}

#[tokio::test]
async fn uneven_amounts_keep_every_cent() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-a", "A", "confined").await;
    insert_lot(&db, "lot-b", "B", "confined").await;
    insert_lot(&db, "lot-c", "C", "confined").await;

    let expense = engine
        .record_shared_expense(feed(MoneyCents::new(10_000)), &Actor::System)
        .await
        .unwrap();
    engine
        .allocate_global_expenses(&Actor::System)
        .await
        .unwrap();

    let mut amounts: Vec<i64> = engine
        .allocations_for_entry(expense.id)
        .await
        .unwrap()
        .iter()
        .map(|a| a.allocated_amount.cents())
        .collect();
    amounts.sort_unstable();
    assert_eq!(amounts, vec![3_333, 3_333, 3_334]);
}

#[tokio::test]
async fn second_run_allocates_nothing() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-a", "A", "confined").await;
    insert_lot(&db, "lot-b", "B", "confined").await;
    engine
        .record_shared_expense(feed(MoneyCents::from_units(500)), &Actor::System)
        .await
        .unwrap();

    engine
        .allocate_global_expenses(&Actor::System)
        .await
        .unwrap();
    let again = engine
        .allocate_global_expenses(&Actor::System)
        .await
        .unwrap();

    assert_eq!(again.outcome, RateioOutcome::NothingPending);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM allocations").await, 2);
}

#[tokio::test]
async fn no_active_lots_leaves_expenses_pending() {
    let (engine, db) = engine_with_db().await;
    insert_lot(&db, "lot-sold", "S", "sold").await;
    engine
        .record_shared_expense(feed(MoneyCents::from_units(9_000)), &Actor::System)
        .await
        .unwrap();
    engine
        .record_shared_expense(feed(MoneyCents::from_units(1_000)), &Actor::System)
        .await
        .unwrap();

    let report = engine
        .allocate_global_expenses(&Actor::System)
        .await
        .unwrap();
    assert_eq!(report.outcome, RateioOutcome::NoActiveLots);
    assert_eq!(report.pending_expenses, 2);
    assert!(report.allocated.is_empty());
    assert_eq!(count(&db, "SELECT COUNT(*) FROM allocations").await, 0);

    insert_lot(&db, "lot-a", "A", "confined").await;
    let later = engine
        .allocate_global_expenses(&Actor::System)
        .await
        .unwrap();
    assert_eq!(later.outcome, RateioOutcome::Allocated);
    assert_eq!(later.allocated.len(), 2);
    let profitability = engine.lot_profitability("lot-a").await.unwrap().unwrap();
    assert_eq!(profitability.costs.feed, MoneyCents::from_units(10_000));
}

#[tokio::test]
async fn nothing_pending_without_global_expenses() {
    let (engine, _db) = engine_with_db().await;

    let report = engine
        .allocate_global_expenses(&Actor::System)
        .await
        .unwrap();
    assert_eq!(report.outcome, RateioOutcome::NothingPending);
    assert_eq!(report.pending_expenses, 0);
}

#[tokio::test]
async fn shared_expense_needs_a_positive_amount_and_a_description() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .record_shared_expense(feed(MoneyCents::ZERO), &Actor::System)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let blank = SharedExpenseCmd::new(
        ExpenseCategory::Labor,
        "   ",
        MoneyCents::from_units(10),
        day(2026, 3, 1),
    );
    let err = engine
        .record_shared_expense(blank, &Actor::System)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidValue(_)));
}
