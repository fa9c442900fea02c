//! The marketplace ledger.
//!
//! The ledger owns the product catalog and the user accounts and is the only
//! place where stock and balances change together. A purchase checks every
//! precondition before touching anything, so a failed purchase leaves both
//! the product and the user exactly as they were.

use std::collections::HashSet;
use tracing::info;

use crate::Amount;
use crate::model::{Product, ProductDraft, ProductId, UserId};

mod account;
pub use account::User;

mod error;
pub use error::{AccountError, LedgerError, ValidationError};

/// First id handed out by an empty catalog.
pub const FIRST_PRODUCT_ID: ProductId = 1001;

/// Outcome of a successful purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub product: ProductId,
    pub user: UserId,
    pub quantity: u32,
    pub total: Amount,
    /// Stock left after the purchase.
    pub remaining: u32,
    /// User balance after the purchase.
    pub balance: Amount,
}

/// Product catalog and user accounts.
#[derive(Debug, Clone)]
pub struct Ledger {
    products: Vec<Product>,
    users: Vec<User>,
    /// Next product id; always greater than every id in `products`.
    next_product_id: ProductId,
}

/// Public API
impl Ledger {
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
            users: Vec::new(),
            next_product_id: FIRST_PRODUCT_ID,
        }
    }

    /// Rebuild a ledger from loaded state.
    ///
    /// The id sequence restarts after the highest loaded id.
    pub fn from_parts(products: Vec<Product>, users: Vec<User>) -> Result<Self, ValidationError> {
        let mut seen = HashSet::with_capacity(products.len());
        for product in &products {
            if !seen.insert(product.id()) {
                return Err(ValidationError::DuplicateProductId(product.id()));
            }
        }

        let next_product_id = match products.iter().map(Product::id).max() {
            Some(max) => max.checked_add(1).ok_or(ValidationError::Overflow)?,
            None => FIRST_PRODUCT_ID,
        };

        Ok(Self {
            products,
            users,
            next_product_id,
        })
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id() == id)
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(id)
    }

    /// The id the next added product will get.
    pub fn next_product_id(&self) -> ProductId {
        self.next_product_id
    }

    /// Validate a draft and add it to the catalog under the next id.
    pub fn add_product(&mut self, draft: ProductDraft) -> Result<Product, LedgerError> {
        let id = self.next_product_id;
        let next = id.checked_add(1).ok_or(ValidationError::Overflow)?;
        let product = Product::new(id, draft)?;

        info!(product = id, name = product.name(), "product added");
        self.next_product_id = next;
        self.products.push(product.clone());
        Ok(product)
    }

    /// Register a user with a zero balance.
    pub fn add_user(&mut self, name: &str) -> Result<UserId, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        self.users.push(User::new(name));
        let id = self.users.len() - 1;
        info!(user = id, name, "user registered");
        Ok(id)
    }

    /// Credit a user's balance and return the new one.
    pub fn deposit(&mut self, user: UserId, amount: Amount) -> Result<Amount, LedgerError> {
        let account = self
            .users
            .get_mut(user)
            .ok_or(LedgerError::UserNotFound(user))?;
        let balance = account.deposit(amount)?;
        info!(user, amount = %amount, balance = %balance, "deposit applied");
        Ok(balance)
    }

    /// Debit a user's balance and return the new one.
    pub fn withdraw(&mut self, user: UserId, amount: Amount) -> Result<Amount, LedgerError> {
        let account = self
            .users
            .get_mut(user)
            .ok_or(LedgerError::UserNotFound(user))?;
        let balance = account
            .withdraw(amount)
            .map_err(|e| LedgerError::from_account(user, e))?;
        info!(user, amount = %amount, balance = %balance, "withdrawal applied");
        Ok(balance)
    }

    /// Sell `quantity` units of a product to a user.
    ///
    /// Either both the stock and the balance are reduced, or neither is.
    pub fn purchase(
        &mut self,
        product: ProductId,
        user: UserId,
        quantity: u32,
    ) -> Result<Receipt, LedgerError> {
        let result = self.apply_purchase(product, user, quantity);
        match &result {
            Ok(receipt) => info!(
                product,
                user,
                quantity,
                total = %receipt.total,
                remaining = receipt.remaining,
                balance = %receipt.balance,
                "purchase applied"
            ),
            Err(e) => info!(product, user, quantity, reason = %e, "purchase skipped"),
        }
        result
    }
}

/// Private API
impl Ledger {
    /// Apply a purchase:
    /// - Find the product and the user
    /// - Ensure enough stock and enough balance for `price * quantity`
    /// - Withdraw the total, then take the units from stock
    fn apply_purchase(
        &mut self,
        product_id: ProductId,
        user_id: UserId,
        quantity: u32,
    ) -> Result<Receipt, LedgerError> {
        // products and users are disjoint fields, so both can be borrowed mutably
        let product = self
            .products
            .iter_mut()
            .find(|p| p.id() == product_id)
            .ok_or(LedgerError::ProductNotFound(product_id))?;
        let user = self
            .users
            .get_mut(user_id)
            .ok_or(LedgerError::UserNotFound(user_id))?;

        if quantity == 0 {
            return Err(ValidationError::ZeroQuantity.into());
        }

        if product.quantity() < quantity {
            return Err(LedgerError::InsufficientStock {
                name: product.name().to_string(),
                available: product.quantity(),
                requested: quantity,
            });
        }

        let total = product
            .price()
            .checked_mul(quantity)
            .ok_or(ValidationError::Overflow)?;

        if user.balance() < total {
            return Err(LedgerError::InsufficientFunds {
                user: user_id,
                balance: user.balance(),
                required: total,
            });
        }

        // Nothing below can fail: stock and balance were checked above.
        // A free product skips the withdrawal, which rejects a zero amount.
        let balance = if total.is_positive() {
            user.withdraw(total)
                .map_err(|e| LedgerError::from_account(user_id, e))?
        } else {
            user.balance()
        };
        product.take(quantity);

        Ok(Receipt {
            product: product_id,
            user: user_id,
            quantity,
            total,
            remaining: product.quantity(),
            balance,
        })
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
