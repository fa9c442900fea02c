//! Error types for ledger operations.

use thiserror::Error;

use crate::Amount;
use crate::model::{ProductId, UserId};

/// Rejected constructor, deposit or withdrawal arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("price must not be negative, got {0}")]
    NegativePrice(Amount),

    #[error("quantity must be a non-negative count, got {0}")]
    InvalidQuantity(i64),

    #[error("warranty years must be a non-negative count, got {0}")]
    InvalidWarranty(i64),

    #[error("balance must not be negative, got {0}")]
    NegativeBalance(Amount),

    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Amount),

    #[error("purchase quantity must be at least 1")]
    ZeroQuantity,

    #[error("amount overflow")]
    Overflow,

    #[error("duplicate product id {0}")]
    DuplicateProductId(ProductId),
}

/// Error from a withdrawal on a single account.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Amount, requested: Amount },
}

/// Top-level error returned by [`Ledger`](super::Ledger) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("not enough '{name}' in stock: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: u32,
        requested: u32,
    },

    #[error("insufficient funds for user {user}: balance {balance}, required {required}")]
    InsufficientFunds {
        user: UserId,
        balance: Amount,
        required: Amount,
    },
}

impl LedgerError {
    pub(crate) fn from_account(user: UserId, err: AccountError) -> Self {
        match err {
            AccountError::Validation(e) => LedgerError::Validation(e),
            AccountError::InsufficientFunds { balance, requested } => {
                LedgerError::InsufficientFunds {
                    user,
                    balance,
                    required: requested,
                }
            }
        }
    }
}
