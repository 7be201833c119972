use super::value_objects::Currency;

// ============================================================================
// Account Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AccountError {
    #[error("Account name cannot be empty")]
    EmptyName,

    #[error("Owner id cannot be nil")]
    NilOwner,

    #[error("Account already exists")]
    AlreadyExists,

    #[error("Account must be active to perform this operation")]
    NotActive,

    #[error("Account is closed")]
    Closed,

    #[error("Account must be closed to reopen")]
    NotClosed,

    #[error("Currency mismatch: account holds {expected}, got {actual}")]
    CurrencyMismatch { expected: Currency, actual: Currency },

    #[error("Balance would overflow")]
    BalanceOverflow,

    #[error("Aggregate not initialized")]
    NotInitialized,
}
