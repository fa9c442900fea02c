//! Core domain types for the marketplace catalog.

use std::fmt;

use crate::Amount;
use crate::ledger::ValidationError;

/// Product identifier.
pub type ProductId = u32;

/// User identifier: position of the user in the ledger.
pub type UserId = usize;

/// Type-specific payload of a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductKind {
    Electronic { warranty_years: u32 },
    Food { expiry_date: String },
}

impl ProductKind {
    /// The tag used in persisted and exported records.
    pub fn label(&self) -> &'static str {
        match self {
            ProductKind::Electronic { .. } => "Electronic",
            ProductKind::Food { .. } => "Food",
        }
    }
}

/// Unvalidated variant payload, as typed by an operator or read from a file.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantDraft {
    Electronic { warranty_years: i64 },
    Food { expiry_date: String },
}

/// Unvalidated product fields. Turned into a [`Product`] once an id is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub price: Amount,
    pub quantity: i64,
    pub variant: VariantDraft,
}

impl ProductDraft {
    pub fn electronic(
        name: impl Into<String>,
        price: Amount,
        quantity: i64,
        warranty_years: i64,
    ) -> Self {
        Self {
            name: name.into(),
            price,
            quantity,
            variant: VariantDraft::Electronic { warranty_years },
        }
    }

    pub fn food(
        name: impl Into<String>,
        price: Amount,
        quantity: i64,
        expiry_date: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            price,
            quantity,
            variant: VariantDraft::Food {
                expiry_date: expiry_date.into(),
            },
        }
    }
}

/// A catalog item.
///
/// Fields are private: price and quantity are validated on construction and
/// quantity only changes through a purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    id: ProductId,
    name: String,
    price: Amount,
    quantity: u32,
    kind: ProductKind,
}

impl Product {
    /// Validate a draft and build the product under the given id.
    pub fn new(id: ProductId, draft: ProductDraft) -> Result<Self, ValidationError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if draft.price.is_negative() {
            return Err(ValidationError::NegativePrice(draft.price));
        }
        let quantity = u32::try_from(draft.quantity)
            .map_err(|_| ValidationError::InvalidQuantity(draft.quantity))?;
        let kind = match draft.variant {
            VariantDraft::Electronic { warranty_years } => ProductKind::Electronic {
                warranty_years: u32::try_from(warranty_years)
                    .map_err(|_| ValidationError::InvalidWarranty(warranty_years))?,
            },
            VariantDraft::Food { expiry_date } => ProductKind::Food {
                expiry_date: expiry_date.trim().to_string(),
            },
        };

        Ok(Self {
            id,
            name: name.to_string(),
            price: draft.price,
            quantity,
            kind,
        })
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Amount {
        self.price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn kind(&self) -> &ProductKind {
        &self.kind
    }

    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }

    /// Value of the whole stock (`price * quantity`), `None` on overflow.
    pub fn stock_value(&self) -> Option<Amount> {
        self.price.checked_mul(self.quantity)
    }

    /// Remove units from stock. Callers check availability first.
    pub(crate) fn take(&mut self, quantity: u32) {
        debug_assert!(quantity <= self.quantity);
        self.quantity -= quantity;
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} - {} ({} pcs)",
            self.id, self.name, self.price, self.quantity
        )?;
        match &self.kind {
            ProductKind::Electronic { warranty_years } => {
                write!(f, " | warranty: {warranty_years}y")?
            }
            ProductKind::Food { expiry_date } => write!(f, " | expires: {expiry_date}")?,
        }
        let status = if self.in_stock() { "in stock" } else { "sold out" };
        write!(f, " | {status}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laptop() -> ProductDraft {
        ProductDraft::electronic("MacBook Pro", Amount::from_units(2000), 5, 2)
    }

    #[test]
    fn valid_electronic() {
        let product = Product::new(1001, laptop()).unwrap();
        assert_eq!(product.id(), 1001);
        assert_eq!(product.name(), "MacBook Pro");
        assert_eq!(product.price(), Amount::from_units(2000));
        assert_eq!(product.quantity(), 5);
        assert_eq!(
            product.kind(),
            &ProductKind::Electronic { warranty_years: 2 }
        );
    }

    #[test]
    fn valid_food_trims_fields() {
        let draft = ProductDraft::food("  Olma ", Amount::from_units(2), 50, " 2026-05-10 ");
        let product = Product::new(1002, draft).unwrap();
        assert_eq!(product.name(), "Olma");
        assert_eq!(
            product.kind(),
            &ProductKind::Food {
                expiry_date: "2026-05-10".to_string()
            }
        );
    }

    #[test]
    fn zero_price_and_quantity_are_allowed() {
        let draft = ProductDraft::electronic("Sample", Amount::ZERO, 0, 0);
        let product = Product::new(1, draft).unwrap();
        assert!(!product.in_stock());
    }

    #[test]
    fn negative_price_fails() {
        let mut draft = laptop();
        draft.price = Amount::from_units(-1);
        assert_eq!(
            Product::new(1001, draft),
            Err(ValidationError::NegativePrice(Amount::from_units(-1)))
        );
    }

    #[test]
    fn negative_quantity_fails() {
        let mut draft = laptop();
        draft.quantity = -3;
        assert_eq!(
            Product::new(1001, draft),
            Err(ValidationError::InvalidQuantity(-3))
        );
    }

    #[test]
    fn oversized_quantity_fails() {
        let mut draft = laptop();
        draft.quantity = i64::from(u32::MAX) + 1;
        assert!(matches!(
            Product::new(1001, draft),
            Err(ValidationError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn negative_warranty_fails() {
        let draft = ProductDraft::electronic("Phone", Amount::from_units(10), 1, -1);
        assert_eq!(
            Product::new(1001, draft),
            Err(ValidationError::InvalidWarranty(-1))
        );
    }

    #[test]
    fn blank_name_fails() {
        let draft = ProductDraft::food("   ", Amount::from_units(1), 1, "2030-01-01");
        assert_eq!(Product::new(1001, draft), Err(ValidationError::EmptyName));
    }

    #[test]
    fn stock_value() {
        let product = Product::new(1001, laptop()).unwrap();
        assert_eq!(product.stock_value(), Some(Amount::from_units(10_000)));
    }

    #[test]
    fn display() {
        let product = Product::new(1001, laptop()).unwrap();
        assert_eq!(
            product.to_string(),
            "[1001] MacBook Pro - 2000.00 (5 pcs) | warranty: 2y | in stock"
        );

        let food = Product::new(
            1002,
            ProductDraft::food("Olma", Amount::from_units(2), 0, "2026-05-10"),
        )
        .unwrap();
        assert_eq!(
            food.to_string(),
            "[1002] Olma - 2.00 (0 pcs) | expires: 2026-05-10 | sold out"
        );
    }
}
