use uuid::Uuid;

use crate::event_sourcing::{CommandError, CommandHandler};

use super::aggregate::Account;
use super::commands::AccountCommand;
use super::errors::AccountError;
use super::value_objects::{AccountType, Money};

// ============================================================================
// Account Command Handler
// ============================================================================

pub type AccountCommandHandler = CommandHandler<Account>;

impl CommandHandler<Account> {
    /// Open a new account under a fresh id. Returns the id.
    pub async fn open_account(
        &self,
        name: &str,
        description: &str,
        account_type: AccountType,
        initial_balance: Money,
        owner_id: Uuid,
    ) -> Result<Uuid, CommandError<AccountError>> {
        let account_id = Uuid::now_v7();
        let command = AccountCommand::OpenAccount {
            name: name.to_string(),
            description: description.to_string(),
            account_type,
            initial_balance,
            owner_id,
        };

        self.handle(account_id, &command, Some(owner_id)).await?;

        tracing::info!(
            account_id = %account_id,
            owner_id = %owner_id,
            initial_balance = %initial_balance,
            "Account opened"
        );
        Ok(account_id)
    }

    /// Record a transaction, retrying on concurrency conflicts.
    pub async fn add_transaction(
        &self,
        account_id: Uuid,
        amount: Money,
        description: &str,
        category: &str,
        actor_id: Option<Uuid>,
        retry: crate::utils::RetryConfig,
    ) -> Result<i64, CommandError<AccountError>> {
        let command = AccountCommand::AddTransaction {
            amount,
            description: description.to_string(),
            category: category.to_string(),
        };

        self.handle_with_retry(account_id, &command, actor_id, retry).await
    }
}
