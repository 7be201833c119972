use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::event_sourcing::core::{Aggregate, EventEnvelope};
use super::commands::AccountCommand;
use super::errors::AccountError;
use super::events::*;
use super::value_objects::{AccountType, Money};

// ============================================================================
// Account Aggregate - Business Logic
// ============================================================================
//
// Lifecycle:
//   (new) --Created--> Active <--Deactivated/Activated--> Inactive
//   Active|Inactive --Closed--> Closed --Reopened--> Active
//
// Balances may go negative; there is no overdraft check.
//
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    pub account_id: Uuid,
    pub name: String,
    pub description: String,
    pub account_type: AccountType,
    pub balance: Money,
    pub owner_id: Uuid,
    pub is_active: bool,
    pub is_closed: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn is_initialized(&self) -> bool {
        self.created_at.is_some()
    }

    fn validate_initialized(&self) -> Result<(), AccountError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(AccountError::NotInitialized)
        }
    }

    fn validate_open(&self) -> Result<(), AccountError> {
        self.validate_initialized()?;
        if self.is_closed {
            return Err(AccountError::Closed);
        }
        Ok(())
    }

    fn validate_active(&self) -> Result<(), AccountError> {
        self.validate_open()?;
        if !self.is_active {
            return Err(AccountError::NotActive);
        }
        Ok(())
    }

    fn validate_currency(&self, amount: &Money) -> Result<(), AccountError> {
        if !self.balance.same_currency(amount) {
            return Err(AccountError::CurrencyMismatch {
                expected: self.balance.currency,
                actual: amount.currency,
            });
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), AccountError> {
    if name.trim().is_empty() {
        return Err(AccountError::EmptyName);
    }
    Ok(())
}

impl Aggregate for Account {
    type Event = AccountEvent;
    type Command = AccountCommand;
    type Error = AccountError;

    fn aggregate_type() -> &'static str {
        "Account"
    }

    fn apply(&mut self, envelope: &EventEnvelope<Self::Event>) {
        match &envelope.event_data {
            AccountEvent::Created(e) => {
                self.account_id = envelope.aggregate_id;
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.account_type = e.account_type;
                self.balance = e.initial_balance;
                self.owner_id = e.owner_id;
                self.is_active = true;
                self.is_closed = false;
                self.created_at = Some(e.created_at);
            }
            AccountEvent::Updated(e) => {
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.updated_at = Some(e.updated_at);
            }
            AccountEvent::TransactionAdded(e) => {
                // handle_command only emits transactions whose sum fits.
                match self.balance.checked_add(&e.amount) {
                    Some(balance) => self.balance = balance,
                    None => tracing::warn!(
                        account_id = %envelope.aggregate_id,
                        version = envelope.sequence_number,
                        "Ignoring transaction that overflows the balance"
                    ),
                }
                self.updated_at = Some(e.transaction_date);
            }
            AccountEvent::Deactivated(e) => {
                self.is_active = false;
                self.updated_at = Some(e.deactivated_at);
            }
            AccountEvent::Activated(e) => {
                self.is_active = true;
                self.updated_at = Some(e.activated_at);
            }
            AccountEvent::BalanceAdjusted(e) => {
                self.balance = e.new_balance;
                self.updated_at = Some(e.adjusted_at);
            }
            AccountEvent::Closed(e) => {
                self.is_active = false;
                self.is_closed = true;
                self.closed_at = Some(e.closed_at);
                self.updated_at = Some(e.closed_at);
            }
            AccountEvent::Reopened(e) => {
                self.is_active = true;
                self.is_closed = false;
                self.closed_at = None;
                self.updated_at = Some(e.reopened_at);
            }
        }
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let now = Utc::now();

        match command {
            AccountCommand::OpenAccount { name, description, account_type, initial_balance, owner_id } => {
                if self.is_initialized() {
                    return Err(AccountError::AlreadyExists);
                }
                validate_name(name)?;
                if owner_id.is_nil() {
                    return Err(AccountError::NilOwner);
                }

                Ok(vec![AccountEvent::Created(AccountCreated {
                    name: name.clone(),
                    description: description.clone(),
                    account_type: *account_type,
                    initial_balance: *initial_balance,
                    owner_id: *owner_id,
                    created_at: now,
                })])
            }

            AccountCommand::UpdateAccount { name, description } => {
                self.validate_open()?;
                validate_name(name)?;

                Ok(vec![AccountEvent::Updated(AccountUpdated {
                    name: name.clone(),
                    description: description.clone(),
                    updated_at: now,
                })])
            }

            AccountCommand::AddTransaction { amount, description, category } => {
                self.validate_active()?;
                self.validate_currency(amount)?;
                self.balance.checked_add(amount).ok_or(AccountError::BalanceOverflow)?;

                Ok(vec![AccountEvent::TransactionAdded(TransactionAdded {
                    amount: *amount,
                    description: description.clone(),
                    category: category.clone(),
                    transaction_date: now,
                })])
            }

            AccountCommand::DeactivateAccount => {
                self.validate_initialized()?;
                if !self.is_active {
                    return Ok(vec![]); // Already inactive
                }

                Ok(vec![AccountEvent::Deactivated(AccountDeactivated { deactivated_at: now })])
            }

            AccountCommand::ActivateAccount => {
                self.validate_open()?;
                if self.is_active {
                    return Ok(vec![]); // Already active
                }

                Ok(vec![AccountEvent::Activated(AccountActivated { activated_at: now })])
            }

            AccountCommand::AdjustBalance { new_balance, reason } => {
                self.validate_open()?;
                self.validate_currency(new_balance)?;
                if *new_balance == self.balance {
                    return Ok(vec![]);
                }

                let adjustment = new_balance
                    .checked_sub(&self.balance)
                    .ok_or(AccountError::BalanceOverflow)?;

                Ok(vec![AccountEvent::BalanceAdjusted(AccountBalanceAdjusted {
                    previous_balance: self.balance,
                    new_balance: *new_balance,
                    adjustment,
                    reason: reason.clone(),
                    adjusted_at: now,
                })])
            }

            AccountCommand::CloseAccount { reason } => {
                self.validate_initialized()?;
                if self.is_closed {
                    return Ok(vec![]); // Already closed
                }

                Ok(vec![AccountEvent::Closed(AccountClosed {
                    final_balance: self.balance,
                    reason: reason.clone(),
                    closed_at: now,
                })])
            }

            AccountCommand::ReopenAccount { reason } => {
                self.validate_initialized()?;
                if !self.is_closed {
                    return Err(AccountError::NotClosed);
                }

                Ok(vec![AccountEvent::Reopened(AccountReopened {
                    reason: reason.clone(),
                    reopened_at: now,
                })])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Currency;
    use crate::event_sourcing::core::AggregateRoot;

    fn usd(major: i64) -> Money {
        Money::from_major(major, Currency::Usd)
    }

    fn open_command() -> AccountCommand {
        AccountCommand::OpenAccount {
            name: "Checking".to_string(),
            description: "Everyday spending".to_string(),
            account_type: AccountType::Checking,
            initial_balance: usd(100),
            owner_id: Uuid::new_v4(),
        }
    }

    fn opened() -> AggregateRoot<Account> {
        let mut root = AggregateRoot::<Account>::new(Uuid::new_v4());
        root.execute(&open_command(), None).unwrap();
        root
    }

    fn spend(amount: Money) -> AccountCommand {
        AccountCommand::AddTransaction {
            amount: amount.negate(),
            description: "Groceries".to_string(),
            category: "Food".to_string(),
        }
    }

    #[test]
    fn test_open_account() {
        let root = opened();
        let account = root.state();

        assert_eq!(account.account_id, root.id());
        assert_eq!(account.name, "Checking");
        assert_eq!(account.balance, usd(100));
        assert!(account.is_active);
        assert!(!account.is_closed);
        assert_eq!(root.uncommitted_events()[0].event_type, "AccountCreated");
    }

    #[test]
    fn test_open_validation() {
        let root = AggregateRoot::<Account>::new(Uuid::new_v4());

        let blank = AccountCommand::OpenAccount {
            name: "   ".to_string(),
            description: String::new(),
            account_type: AccountType::Savings,
            initial_balance: usd(0),
            owner_id: Uuid::new_v4(),
        };
        assert_eq!(root.state().handle_command(&blank), Err(AccountError::EmptyName));

        let orphan = AccountCommand::OpenAccount {
            name: "Savings".to_string(),
            description: String::new(),
            account_type: AccountType::Savings,
            initial_balance: usd(0),
            owner_id: Uuid::nil(),
        };
        assert_eq!(root.state().handle_command(&orphan), Err(AccountError::NilOwner));

        assert_eq!(opened().state().handle_command(&open_command()), Err(AccountError::AlreadyExists));
    }

    #[test]
    fn test_commands_require_creation() {
        let account = Account::default();
        assert_eq!(account.handle_command(&spend(usd(1))), Err(AccountError::NotInitialized));
        assert_eq!(
            account.handle_command(&AccountCommand::DeactivateAccount),
            Err(AccountError::NotInitialized)
        );
    }

    #[test]
    fn test_transaction_may_overdraw() {
        let mut root = opened();
        root.execute(&spend(usd(30)), None).unwrap();
        assert_eq!(root.state().balance.to_string(), "70.00 USD");

        root.execute(&spend(usd(500)), None).unwrap();
        assert_eq!(root.state().balance, usd(-430));
    }

    #[test]
    fn test_transaction_that_overflows_is_rejected() {
        let mut root = opened();
        let huge = Money::from_minor(i64::MAX - 100, Currency::Usd);
        root.execute(&AccountCommand::AdjustBalance { new_balance: huge, reason: None }, None).unwrap();

        let top_up = AccountCommand::AddTransaction {
            amount: Money::from_minor(200, Currency::Usd),
            description: "Salary".to_string(),
            category: "Income".to_string(),
        };
        assert_eq!(root.execute(&top_up, None), Err(AccountError::BalanceOverflow));
        assert_eq!(root.state().balance, huge);
        assert_eq!(root.uncommitted_events().len(), 2);
    }

    #[test]
    fn test_transaction_currency_must_match() {
        let root = opened();
        let euros = AccountCommand::AddTransaction {
            amount: Money::from_major(5, Currency::Eur),
            description: "Coffee".to_string(),
            category: "Food".to_string(),
        };

        assert!(matches!(
            root.state().handle_command(&euros),
            Err(AccountError::CurrencyMismatch { expected: Currency::Usd, actual: Currency::Eur })
        ));
    }

    #[test]
    fn test_deactivate_and_activate_are_idempotent() {
        let mut root = opened();

        assert_eq!(root.execute(&AccountCommand::ActivateAccount, None).unwrap(), 0);
        assert_eq!(root.execute(&AccountCommand::DeactivateAccount, None).unwrap(), 1);
        assert_eq!(root.execute(&AccountCommand::DeactivateAccount, None).unwrap(), 0);
        assert!(!root.state().is_active);

        assert_eq!(root.state().handle_command(&spend(usd(1))), Err(AccountError::NotActive));

        assert_eq!(root.execute(&AccountCommand::ActivateAccount, None).unwrap(), 1);
        assert!(root.state().is_active);
        assert_eq!(root.uncommitted_events().len(), 3);
    }

    #[test]
    fn test_balance_adjustment_records_delta() {
        let mut root = opened();
        let command = AccountCommand::AdjustBalance {
            new_balance: usd(80),
            reason: Some("Bank reconciliation".to_string()),
        };
        root.execute(&command, None).unwrap();

        match &root.uncommitted_events()[1].event_data {
            AccountEvent::BalanceAdjusted(e) => {
                assert_eq!(e.previous_balance, usd(100));
                assert_eq!(e.adjustment, usd(-20));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(root.state().balance, usd(80));

        // Adjusting to the current balance is a no-op.
        assert_eq!(root.execute(&command, None).unwrap(), 0);
    }

    #[test]
    fn test_close_and_reopen() {
        let mut root = opened();
        root.execute(&spend(usd(25)), None).unwrap();
        root.execute(&AccountCommand::CloseAccount { reason: None }, None).unwrap();

        let account = root.state();
        assert!(account.is_closed);
        assert!(!account.is_active);
        match &root.uncommitted_events()[2].event_data {
            AccountEvent::Closed(e) => assert_eq!(e.final_balance, usd(75)),
            other => panic!("unexpected event {other:?}"),
        }

        assert_eq!(account.handle_command(&spend(usd(1))), Err(AccountError::Closed));
        assert_eq!(account.handle_command(&AccountCommand::ActivateAccount), Err(AccountError::Closed));
        assert_eq!(
            account.handle_command(&AccountCommand::UpdateAccount {
                name: "Renamed".to_string(),
                description: String::new(),
            }),
            Err(AccountError::Closed)
        );
        assert_eq!(root.execute(&AccountCommand::CloseAccount { reason: None }, None).unwrap(), 0);

        root.execute(&AccountCommand::ReopenAccount { reason: Some("Customer request".to_string()) }, None)
            .unwrap();
        assert!(root.state().is_active);
        assert!(!root.state().is_closed);
        assert_eq!(
            root.state().handle_command(&AccountCommand::ReopenAccount { reason: None }),
            Err(AccountError::NotClosed)
        );
    }

    #[test]
    fn test_replay_matches_live_state() {
        let mut root = opened();
        root.execute(&spend(usd(30)), None).unwrap();
        root.execute(
            &AccountCommand::UpdateAccount {
                name: "Main".to_string(),
                description: "Renamed".to_string(),
            },
            None,
        )
        .unwrap();
        root.execute(&AccountCommand::DeactivateAccount, None).unwrap();

        let history = root.uncommitted_events().to_vec();
        let replayed = AggregateRoot::<Account>::replay_from(root.id(), &history);

        assert_eq!(replayed.state(), root.state());
        assert_eq!(replayed.version(), 4);
    }
}
