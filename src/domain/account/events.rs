use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event_family;
use crate::event_sourcing::core::DomainEvent;
use super::value_objects::{AccountType, Money};

// ============================================================================
// Account Domain Events
// ============================================================================
//
// The aggregate id travels on the envelope, so payloads only carry what
// their own transition needs. Kind names are persisted: never rename them.
//
// ============================================================================

/// Union type for all account events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AccountEvent {
    Created(AccountCreated),
    Updated(AccountUpdated),
    TransactionAdded(TransactionAdded),
    Deactivated(AccountDeactivated),
    Activated(AccountActivated),
    BalanceAdjusted(AccountBalanceAdjusted),
    Closed(AccountClosed),
    Reopened(AccountReopened),
}

event_family!(AccountEvent {
    Created(AccountCreated),
    Updated(AccountUpdated),
    TransactionAdded(TransactionAdded),
    Deactivated(AccountDeactivated),
    Activated(AccountActivated),
    BalanceAdjusted(AccountBalanceAdjusted),
    Closed(AccountClosed),
    Reopened(AccountReopened),
});

// Individual event types

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountCreated {
    pub name: String,
    pub description: String,
    pub account_type: AccountType,
    pub initial_balance: Money,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl DomainEvent for AccountCreated {
    fn event_type() -> &'static str { "AccountCreated" }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdated {
    pub name: String,
    pub description: String,
    pub updated_at: DateTime<Utc>,
}

impl DomainEvent for AccountUpdated {
    fn event_type() -> &'static str { "AccountUpdated" }
}

/// Signed: negative amounts are spending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionAdded {
    pub amount: Money,
    pub description: String,
    pub category: String,
    pub transaction_date: DateTime<Utc>,
}

impl DomainEvent for TransactionAdded {
    fn event_type() -> &'static str { "TransactionAdded" }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDeactivated {
    pub deactivated_at: DateTime<Utc>,
}

impl DomainEvent for AccountDeactivated {
    fn event_type() -> &'static str { "AccountDeactivated" }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountActivated {
    pub activated_at: DateTime<Utc>,
}

impl DomainEvent for AccountActivated {
    fn event_type() -> &'static str { "AccountActivated" }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalanceAdjusted {
    pub previous_balance: Money,
    pub new_balance: Money,
    pub adjustment: Money,
    pub reason: Option<String>,
    pub adjusted_at: DateTime<Utc>,
}

impl DomainEvent for AccountBalanceAdjusted {
    fn event_type() -> &'static str { "AccountBalanceAdjusted" }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountClosed {
    pub final_balance: Money,
    pub reason: Option<String>,
    pub closed_at: DateTime<Utc>,
}

impl DomainEvent for AccountClosed {
    fn event_type() -> &'static str { "AccountClosed" }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountReopened {
    pub reason: Option<String>,
    pub reopened_at: DateTime<Utc>,
}

impl DomainEvent for AccountReopened {
    fn event_type() -> &'static str { "AccountReopened" }
}
