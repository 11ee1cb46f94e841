#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement, Value};

use engine::Engine;
use migration::MigratorTrait;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub async fn exec(db: &DatabaseConnection, sql: &str, values: Vec<Value>) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(backend, sql, values))
        .await
        .unwrap();
}

pub async fn count(db: &DatabaseConnection, sql: &str) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(backend, sql.to_string()))
        .await
        .unwrap()
        .unwrap();
    row.try_get_by_index::<i64>(0).unwrap()
}

pub async fn insert_lot(db: &DatabaseConnection, id: &str, code: &str, status: &str) {
    exec(
        db,
        "INSERT INTO lots (id, code, status, initial_quantity, purchase_weight_kg, purchase_date) \
         VALUES (?, ?, ?, ?, ?, ?)",
        vec![
            id.into(),
            code.into(),
            status.into(),
            100i64.into(),
            45_000.0f64.into(),
            day(2026, 1, 10).into(),
        ],
    )
    .await;
}

pub struct PurchaseRow {
    pub id: String,
    pub lot_id: String,
    pub lot_code: String,
    pub broker_id: Option<String>,
    pub carrier_id: Option<String>,
    pub weight_kg: f64,
    pub price_per_arroba_cents: i64,
    pub commission_percentage: Option<f64>,
    pub transport_cents: Option<i64>,
    pub quantity: i64,
}

impl PurchaseRow {
    /// 100 head, 45 000 kg at 280.00 per arroba.
    pub fn plain(id: &str, lot_id: &str, lot_code: &str) -> Self {
        Self {
            id: id.to_string(),
            lot_id: lot_id.to_string(),
            lot_code: lot_code.to_string(),
            broker_id: None,
            carrier_id: None,
            weight_kg: 45_000.0,
            price_per_arroba_cents: 28_000,
            commission_percentage: None,
            transport_cents: None,
            quantity: 100,
        }
    }

    pub fn with_broker_and_carrier(mut self) -> Self {
        self.broker_id = Some("broker-1".to_string());
        self.commission_percentage = Some(3.0);
        self.carrier_id = Some("carrier-1".to_string());
        self.transport_cents = Some(500_000);
        self
    }
}

pub async fn insert_purchase(db: &DatabaseConnection, row: &PurchaseRow) {
    exec(
        db,
        "INSERT INTO purchases (id, lot_id, lot_code, vendor_id, broker_id, carrier_id, \
         payer_account_id, purchase_weight_kg, price_per_arroba_minor, commission_percentage, \
         transport_value_minor, initial_quantity, purchase_date, payment_date) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            row.id.clone().into(),
            row.lot_id.clone().into(),
            row.lot_code.clone().into(),
            "vendor-1".into(),
            row.broker_id.clone().into(),
            row.carrier_id.clone().into(),
            Some("account-1".to_string()).into(),
            row.weight_kg.into(),
            row.price_per_arroba_cents.into(),
            row.commission_percentage.into(),
            row.transport_cents.into(),
            row.quantity.into(),
            day(2026, 1, 10).into(),
            Some(day(2026, 2, 10)).into(),
        ],
    )
    .await;
}

/// 40 000 kg at 300.00 per arroba, slaughtered on 2026-06-01.
pub async fn insert_sale(db: &DatabaseConnection, id: &str, lot_id: &str) {
    exec(
        db,
        "INSERT INTO sales (id, lot_id, buyer_id, slaughter_weight_kg, price_per_arroba_minor, \
         invoice_number, sale_number, payment_date, slaughter_date) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            id.into(),
            lot_id.into(),
            Some("buyer-1".to_string()).into(),
            Some(40_000.0f64).into(),
            Some(30_000i64).into(),
            Some("NF-1".to_string()).into(),
            Some("V-1".to_string()).into(),
            Some(day(2026, 6, 15)).into(),
            Some(day(2026, 6, 1)).into(),
        ],
    )
    .await;
}

pub async fn insert_intervention(
    db: &DatabaseConnection,
    id: &str,
    lot_id: &str,
    kind: &str,
    cost_cents: i64,
) {
    exec(
        db,
        "INSERT INTO interventions (id, lot_id, intervention_type, total_cost_minor, \
         intervention_date) VALUES (?, ?, ?, ?, ?)",
        vec![
            id.into(),
            lot_id.into(),
            kind.into(),
            cost_cents.into(),
            day(2026, 3, 1).into(),
        ],
    )
    .await;
}
