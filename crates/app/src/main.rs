use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{Actor, Engine, ExpenseCategory, MoneyCents, SharedExpenseCmd, SourceType};
use migration::{Migrator, MigratorTrait};
use serde::Serialize;
use settings::Database;

mod settings;

type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "rebanho")]
#[command(about = "Turns herd events into ledger entries and keeps lot profitability current")]
struct Cli {
    /// Settings file, looked up like `settings` (TOML).
    #[arg(long)]
    config: Option<String>,

    /// Database connection string; overrides the `[database]` setting.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// User the writes are attributed to; the system actor when omitted.
    #[arg(long)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one purchase, sale or intervention into ledger entries.
    Integrate {
        #[arg(value_enum)]
        source: SourceArg,
        id: String,
    },
    /// Split unallocated global expenses across the active lots.
    AllocateGlobal,
    /// Record a farm-wide expense for the next rateio run.
    SharedExpense(SharedExpenseArgs),
    /// Recompute lots whose profitability fell behind.
    RefreshStale,
    /// Drop and recompute the whole profitability cache.
    Rebuild,
    /// Integration records by status, with failures.
    Report,
    /// Integrate every source event not processed yet.
    Backlog,
    /// Ledger totals for entries with competence in `[from, to)`.
    Summary {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Cached profitability of one lot, or of all lots.
    Profitability { lot_id: Option<String> },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceArg {
    Purchase,
    Sale,
    Intervention,
}

impl From<SourceArg> for SourceType {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Purchase => SourceType::Purchase,
            SourceArg::Sale => SourceType::Sale,
            SourceArg::Intervention => SourceType::Intervention,
        }
    }
}

#[derive(Args, Debug)]
struct SharedExpenseArgs {
    /// Expense category, e.g. `cattle_feed` or `labor`.
    #[arg(long)]
    category: String,
    #[arg(long)]
    description: String,
    /// Amount in currency units, e.g. `1250,00`.
    #[arg(long)]
    amount: MoneyCents,
    #[arg(long)]
    competence: NaiveDate,
    #[arg(long)]
    due: Option<NaiveDate>,
    #[arg(long)]
    counterparty: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "rebanho={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = match cli.database_url.as_deref() {
        Some(url) => connect(url.to_string()).await?,
        None => parse_database(&settings.database).await?,
    };
    let engine = Engine::builder()
        .database(db)
        .settings(settings.engine)
        .build()
        .await?;
    let actor = cli.user.map_or(Actor::System, Actor::user);

    match cli.command {
        Command::Integrate { source, id } => {
            let outcome = engine.integrate(source.into(), &id, &actor).await?;
            print_json(&outcome)?;
        }
        Command::AllocateGlobal => {
            let report = engine.allocate_global_expenses(&actor).await?;
            print_json(&report)?;
        }
        Command::SharedExpense(args) => {
            let category = ExpenseCategory::try_from(args.category.as_str())?;
            let mut cmd = SharedExpenseCmd::new(
                category,
                args.description,
                args.amount,
                start_of_day(args.competence),
            );
            if let Some(due) = args.due {
                cmd = cmd.due_date(start_of_day(due));
            }
            if let Some(counterparty) = args.counterparty {
                cmd = cmd.counterparty_id(counterparty);
            }
            if let Some(notes) = args.notes {
                cmd = cmd.notes(notes);
            }
            let entry = engine.record_shared_expense(cmd, &actor).await?;
            print_json(&entry)?;
        }
        Command::RefreshStale => {
            let report = engine.refresh_stale_profitability().await?;
            print_json(&report)?;
        }
        Command::Rebuild => {
            let report = engine.rebuild_all_profitability().await?;
            print_json(&report)?;
        }
        Command::Report => {
            let report = engine.integration_report().await?;
            print_json(&report)?;
        }
        Command::Backlog => {
            let report = engine.integrate_backlog(&actor).await?;
            if !report.failures.is_empty() {
                tracing::warn!("{} source events could not be integrated", report.failures.len());
            }
            print_json(&report)?;
        }
        Command::Summary { from, to } => {
            let summary = engine
                .financial_summary(start_of_day(from), start_of_day(to))
                .await?;
            print_json(&summary)?;
        }
        Command::Profitability { lot_id: Some(lot_id) } => {
            match engine.lot_profitability(&lot_id).await? {
                Some(profitability) => print_json(&profitability)?,
                None => tracing::info!("no profitability computed yet for lot {lot_id}"),
            }
        }
        Command::Profitability { lot_id: None } => {
            let all = engine.list_lot_profitability().await?;
            print_json(&all)?;
        }
    }

    Ok(())
}

async fn connect(url: String) -> AppResult<sea_orm::DatabaseConnection> {
    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

async fn parse_database(config: &settings::Database) -> AppResult<sea_orm::DatabaseConnection> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };
    connect(url).await
}
