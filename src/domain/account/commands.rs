use uuid::Uuid;
use super::value_objects::{AccountType, Money};

// ============================================================================
// Account Domain Commands
// ============================================================================

#[derive(Debug, Clone)]
pub enum AccountCommand {
    OpenAccount {
        name: String,
        description: String,
        account_type: AccountType,
        initial_balance: Money,
        owner_id: Uuid,
    },
    UpdateAccount {
        name: String,
        description: String,
    },
    AddTransaction {
        amount: Money,
        description: String,
        category: String,
    },
    DeactivateAccount,
    ActivateAccount,
    /// Manual correction to an absolute balance.
    AdjustBalance {
        new_balance: Money,
        reason: Option<String>,
    },
    CloseAccount {
        reason: Option<String>,
    },
    ReopenAccount {
        reason: Option<String>,
    },
}
