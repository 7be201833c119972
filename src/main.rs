use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use account_ledger::config::AppConfig;
use account_ledger::domain::account::{Account, AccountCommand, AccountEvent, AccountType, Currency, Money};
use account_ledger::domain::user::{User, UserCommand, UserEvent};
use account_ledger::event_sourcing::{
    CommandError, CommandHandler, EventLog, EventStore, InMemoryEventLog, PostgresEventLog,
};
use account_ledger::metrics::Metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    // Initialize structured logging with environment-based filtering.
    // RUST_LOG wins over the configured default.
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(config.logging.with_thread_ids))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter))
        )
        .init();

    tracing::info!("🚀 Starting account ledger demo");

    // === 1. Pick the event log backend ===
    let log: Arc<dyn EventLog> = match &config.database {
        Some(database) => {
            tracing::info!("Connecting to Postgres...");
            let postgres = PostgresEventLog::connect(database).await?;
            postgres.ensure_schema().await?;
            Arc::new(postgres)
        }
        None => {
            tracing::info!("No database configured, using the in-memory event log");
            Arc::new(InMemoryEventLog::new())
        }
    };

    // === 2. Metrics and one registry per aggregate ===
    let metrics = Arc::new(Metrics::new()?);

    let account_registry = Arc::new(AccountEvent::registry());
    let user_registry = Arc::new(UserEvent::registry());
    tracing::debug!(
        account_kinds = ?account_registry.registered_kinds(),
        user_kinds = ?user_registry.registered_kinds(),
        "Event registries built"
    );

    let accounts = CommandHandler::<Account>::new(Arc::new(
        EventStore::new(log.clone(), account_registry).with_metrics(metrics.clone()),
    ));
    let users = CommandHandler::<User>::new(Arc::new(
        EventStore::new(log.clone(), user_registry).with_metrics(metrics.clone()),
    ));
    let retry = config.retry_config();

    // === 3. Register a user ===
    let user_id = users
        .register_user("ada@example.com", "ada", Some("Ada"), Some("Lovelace"))
        .await?;
    users.handle(user_id, &UserCommand::VerifyEmail, Some(user_id)).await?;
    users.handle(user_id, &UserCommand::RecordLogin, Some(user_id)).await?;

    // === 4. Account lifecycle ===
    let account_id = accounts
        .open_account(
            "Checking",
            "Everyday spending",
            AccountType::Checking,
            Money::from_major(100, Currency::Usd),
            user_id,
        )
        .await?;

    let version = accounts
        .add_transaction(
            account_id,
            Money::from_major(-30, Currency::Usd),
            "Weekly shop",
            "Groceries",
            Some(user_id),
            retry.clone(),
        )
        .await?;

    if let Some(root) = accounts.load(account_id).await? {
        tracing::info!(
            account_id = %account_id,
            version = version,
            balance = %root.state().balance,
            "✅ Transaction recorded"
        );
    }

    accounts
        .handle(account_id, &AccountCommand::DeactivateAccount, Some(user_id))
        .await?;

    // A second deactivate is a silent no-op.
    let unchanged = accounts
        .handle(account_id, &AccountCommand::DeactivateAccount, Some(user_id))
        .await?;
    tracing::info!(version = unchanged, "Deactivating twice appended nothing");

    match accounts
        .add_transaction(
            account_id,
            Money::from_major(-5, Currency::Usd),
            "Coffee",
            "Food",
            Some(user_id),
            retry,
        )
        .await
    {
        Err(CommandError::Validation(err)) => {
            tracing::warn!(account_id = %account_id, error = %err, "Transaction rejected as expected");
        }
        Err(err) => return Err(err.into()),
        Ok(version) => tracing::error!(version = version, "Transaction on an inactive account was accepted"),
    }

    // === 5. Read models straight from the log ===
    let history = accounts.event_store().load_by_aggregate_type("Account").await?;
    for envelope in &history.events {
        tracing::info!(
            aggregate_id = %envelope.aggregate_id,
            version = envelope.sequence_number,
            event_type = %envelope.event_type,
            "Account event"
        );
    }

    let version = accounts.event_store().current_version(account_id).await?;
    tracing::info!(account_id = %account_id, version = version, "🏁 Demo complete");

    println!("{}", metrics.render()?);
    Ok(())
}
