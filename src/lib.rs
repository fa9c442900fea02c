pub mod amount;
pub mod cli;
pub mod config;
pub mod csv;
pub mod ledger;
pub mod market;
pub mod model;
pub mod store;

pub use amount::Amount;
pub use ledger::{Ledger, LedgerError, Receipt, User, ValidationError};
pub use market::{Command, Marketplace};
pub use model::{Product, ProductDraft, ProductId, ProductKind, UserId};
pub use store::{JsonStore, Store};
