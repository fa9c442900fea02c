use crate::Amount;

use super::{AccountError, ValidationError};

/// A marketplace user with a private balance.
/// The balance only changes through [`deposit`](User::deposit) and [`withdraw`](User::withdraw).
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    name: String,
    balance: Amount,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            balance: Amount::ZERO,
        }
    }

    /// Restore a user with an existing balance, e.g. from the store.
    pub fn with_balance(
        name: impl Into<String>,
        balance: Amount,
    ) -> Result<Self, ValidationError> {
        if balance.is_negative() {
            return Err(ValidationError::NegativeBalance(balance));
        }
        Ok(Self {
            name: name.into(),
            balance,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Credit the balance and return the new one.
    pub fn deposit(&mut self, amount: Amount) -> Result<Amount, ValidationError> {
        if !amount.is_positive() {
            return Err(ValidationError::NonPositiveAmount(amount));
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(ValidationError::Overflow)?;
        Ok(self.balance)
    }

    /// Debit the balance and return the new one.
    pub fn withdraw(&mut self, amount: Amount) -> Result<Amount, AccountError> {
        if !amount.is_positive() {
            return Err(ValidationError::NonPositiveAmount(amount).into());
        }
        if amount > self.balance {
            return Err(AccountError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(self.balance)
    }
}
