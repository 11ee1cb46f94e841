//! Converters from business events to ledger entries.
//!
//! Pure functions: they read one source record and return the entries to
//! write, each with its single 100% allocation. Persisting them (and the
//! integration record bookkeeping) is the coordinator's job.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    Actor, Allocation, AllocationMethod, EngineError, EntityRef, EntryRole, ExpenseCategory,
    Intervention, LedgerCategory, LedgerEntry, Lot, MoneyCents, Purchase, ResultEngine,
    RevenueCategory, Sale, SourceRef, SourceType, allocations, category_for_intervention,
};

/// What a converter needs besides the source record.
#[derive(Clone, Debug)]
pub struct ConversionContext {
    pub arroba_divisor: f64,
    pub actor: Actor,
    pub now: DateTime<Utc>,
    /// Cost center the entries roll up to, when the lot has one.
    pub cost_center_id: Option<Uuid>,
}

/// A ledger entry ready to be written together with its allocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedEntry {
    pub entry: LedgerEntry,
    pub allocation: Allocation,
}

impl PlannedEntry {
    pub fn role(&self) -> Option<EntryRole> {
        self.entry.source.as_ref().map(|source| source.role)
    }
}

struct EntrySpec<'a> {
    category: LedgerCategory,
    role: EntryRole,
    description: String,
    amount: MoneyCents,
    due_date: DateTime<Utc>,
    competence_date: DateTime<Utc>,
    allocation_method: AllocationMethod,
    lot_id: &'a str,
    counterparty_id: Option<String>,
}

fn plan(
    source_type: SourceType,
    source_id: &str,
    spec: EntrySpec<'_>,
    ctx: &ConversionContext,
) -> ResultEngine<PlannedEntry> {
    let mut entry = LedgerEntry::new(
        spec.category,
        spec.description,
        spec.amount,
        spec.due_date,
        spec.competence_date,
        spec.allocation_method,
        ctx.actor.clone(),
        ctx.now,
    )
    .map_err(|err| {
        EngineError::InvalidSource(format!(
            "{} {source_id} ({}): {err}",
            source_type.as_str(),
            spec.role.as_str()
        ))
    })?;
    entry.source = Some(SourceRef {
        source_type,
        source_id: source_id.to_string(),
        role: spec.role,
    });
    entry.lot_id = Some(spec.lot_id.to_string());
    entry.cost_center_id = ctx.cost_center_id;
    entry.counterparty_id = spec.counterparty_id;

    let allocation = allocations::single(&entry, EntityRef::lot(spec.lot_id));
    Ok(PlannedEntry { entry, allocation })
}

fn positive(value: Option<MoneyCents>) -> Option<MoneyCents> {
    value.filter(|v| v.is_positive())
}

/// Purchase cost, plus freight and broker commission when present.
pub fn purchase_entries(
    purchase: &Purchase,
    ctx: &ConversionContext,
) -> ResultEngine<Vec<PlannedEntry>> {
    let purchase_cost = MoneyCents::weight_value(
        purchase.purchase_weight_kg,
        purchase.price_per_arroba,
        ctx.arroba_divisor,
    )?;
    let lot_code = purchase.lot_code.trim();
    let lot_id = purchase.lot_id.as_str();
    let due_date = purchase.payment_date.unwrap_or(purchase.purchase_date);
    let competence_date = purchase.purchase_date;
    let spec = move |category: ExpenseCategory,
                     role: EntryRole,
                     description: String,
                     amount: MoneyCents,
                     counterparty_id: Option<String>| EntrySpec {
        category: LedgerCategory::Expense(category),
        role,
        description,
        amount,
        due_date,
        competence_date,
        allocation_method: AllocationMethod::PerLot,
        lot_id,
        counterparty_id,
    };

    let mut planned = Vec::with_capacity(3);

    let mut main = plan(
        SourceType::Purchase,
        &purchase.id,
        spec(
            ExpenseCategory::CattlePurchase,
            EntryRole::Purchase,
            format!("Cattle purchase - Lot {lot_code}"),
            purchase_cost,
            Some(purchase.vendor_id.clone()),
        ),
        ctx,
    )?;
    main.entry.payer_account_id = purchase.payer_account_id.clone();
    main.entry.notes = Some(format!(
        "{} animals, {}kg total",
        purchase.initial_quantity, purchase.purchase_weight_kg
    ));
    planned.push(main);

    if let (Some(carrier_id), Some(transport_value)) =
        (&purchase.carrier_id, positive(purchase.transport_value))
    {
        let mut transport = plan(
            SourceType::Purchase,
            &purchase.id,
            spec(
                ExpenseCategory::Transport,
                EntryRole::Transport,
                format!("Freight - Lot {lot_code}"),
                transport_value,
                Some(carrier_id.clone()),
            ),
            ctx,
        )?;
        transport.entry.payer_account_id = purchase.payer_account_id.clone();
        planned.push(transport);
    }

    if let (Some(broker_id), Some(percentage)) = (
        &purchase.broker_id,
        purchase.commission_percentage.filter(|p| *p > 0.0),
    ) {
        let commission_value = purchase_cost.percent(percentage)?;
        let mut commission = plan(
            SourceType::Purchase,
            &purchase.id,
            spec(
                ExpenseCategory::Commission,
                EntryRole::Commission,
                format!("Broker commission - Lot {lot_code}"),
                commission_value,
                Some(broker_id.clone()),
            ),
            ctx,
        )?;
        commission.entry.payer_account_id = purchase.payer_account_id.clone();
        planned.push(commission);
    }

    Ok(planned)
}

/// Sale revenue for the lot of the originating purchase.
pub fn sale_entries(
    sale: &Sale,
    lot: &Lot,
    ctx: &ConversionContext,
) -> ResultEngine<Vec<PlannedEntry>> {
    let value = MoneyCents::weight_value(
        sale.slaughter_weight_kg.unwrap_or(0.0),
        sale.price_per_arroba.unwrap_or(MoneyCents::ZERO),
        ctx.arroba_divisor,
    )?;
    let competence_date = sale
        .slaughter_date
        .or(sale.shipment_date)
        .unwrap_or(ctx.now);
    let due_date = sale
        .payment_date
        .or(sale.expected_date)
        .unwrap_or(competence_date);

    let mut planned = plan(
        SourceType::Sale,
        &sale.id,
        EntrySpec {
            category: LedgerCategory::Revenue(RevenueCategory::CattleSale),
            role: EntryRole::Sale,
            description: format!("Cattle sale - Lot {}", lot.code),
            amount: value,
            due_date,
            competence_date,
            allocation_method: AllocationMethod::PerLot,
            lot_id: &sale.lot_id,
            counterparty_id: sale.buyer_id.clone(),
        },
        ctx,
    )?;
    planned.entry.invoice_number = sale.invoice_number.clone();
    planned.entry.notes = sale.sale_number.as_ref().map(|n| format!("Sale {n}"));
    Ok(vec![planned])
}

/// Veterinary expense for an intervention.
pub fn intervention_entries(
    intervention: &Intervention,
    ctx: &ConversionContext,
) -> ResultEngine<Vec<PlannedEntry>> {
    let category = category_for_intervention(&intervention.intervention_type);
    let mut planned = plan(
        SourceType::Intervention,
        &intervention.id,
        EntrySpec {
            category: LedgerCategory::Expense(category),
            role: EntryRole::Intervention,
            description: format!(
                "{} - Lot {}",
                intervention.intervention_type.trim(),
                intervention.lot_id
            ),
            amount: intervention.total_cost,
            due_date: intervention.intervention_date,
            competence_date: intervention.intervention_date,
            allocation_method: AllocationMethod::PerAnimal,
            lot_id: &intervention.lot_id,
            counterparty_id: None,
        },
        ctx,
    )?;
    planned.entry.notes = intervention.notes.clone();
    Ok(vec![planned])
}
