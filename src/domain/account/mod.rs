// ============================================================================
// Account Domain - Business Logic for Account Aggregate
// ============================================================================
//
// This module contains ALL Account-specific code:
// - Value objects (Money, Currency, AccountType)
// - Events (AccountCreated, TransactionAdded, AccountClosed, etc.)
// - Commands (OpenAccount, AddTransaction, etc.)
// - Errors (AccountError enum)
// - Aggregate (Account with business logic)
// - Command Handler helpers
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use command_handler::*;
