//! Persistence of the ledger to a JSON file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::Amount;
use crate::ledger::{Ledger, User, ValidationError};
use crate::model::{Product, ProductDraft, ProductId, ProductKind, VariantDraft};

/// Errors that can occur when loading or saving a snapshot
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("{}: malformed data: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid stored data: {0}")]
    Invalid(#[from] ValidationError),
}

/// A product as stored, tagged by its variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProductRecord {
    Electronic {
        id: ProductId,
        name: String,
        price: Amount,
        quantity: i64,
        warranty_years: i64,
    },
    Food {
        id: ProductId,
        name: String,
        price: Amount,
        quantity: i64,
        expiry_date: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub balance: Amount,
}

/// Serializable image of a [`Ledger`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub products: Vec<ProductRecord>,
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

impl From<&Product> for ProductRecord {
    fn from(product: &Product) -> Self {
        let id = product.id();
        let name = product.name().to_string();
        let price = product.price();
        let quantity = i64::from(product.quantity());
        match product.kind() {
            ProductKind::Electronic { warranty_years } => ProductRecord::Electronic {
                id,
                name,
                price,
                quantity,
                warranty_years: i64::from(*warranty_years),
            },
            ProductKind::Food { expiry_date } => ProductRecord::Food {
                id,
                name,
                price,
                quantity,
                expiry_date: expiry_date.clone(),
            },
        }
    }
}

impl TryFrom<ProductRecord> for Product {
    type Error = ValidationError;

    fn try_from(record: ProductRecord) -> Result<Self, Self::Error> {
        let (id, draft) = match record {
            ProductRecord::Electronic {
                id,
                name,
                price,
                quantity,
                warranty_years,
            } => (
                id,
                ProductDraft {
                    name,
                    price,
                    quantity,
                    variant: VariantDraft::Electronic { warranty_years },
                },
            ),
            ProductRecord::Food {
                id,
                name,
                price,
                quantity,
                expiry_date,
            } => (
                id,
                ProductDraft {
                    name,
                    price,
                    quantity,
                    variant: VariantDraft::Food { expiry_date },
                },
            ),
        };
        Product::new(id, draft)
    }
}

impl Snapshot {
    pub fn of(ledger: &Ledger) -> Self {
        Self {
            products: ledger.products().iter().map(ProductRecord::from).collect(),
            users: ledger
                .users()
                .iter()
                .map(|u| UserRecord {
                    name: u.name().to_string(),
                    balance: u.balance(),
                })
                .collect(),
        }
    }

    /// Validate every record and rebuild the ledger.
    pub fn into_ledger(self) -> Result<Ledger, ValidationError> {
        let products = self
            .products
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let users = self
            .users
            .into_iter()
            .map(|u| User::with_balance(u.name, u.balance))
            .collect::<Result<Vec<_>, _>>()?;
        Ledger::from_parts(products, users)
    }
}

/// Load and save of ledger state.
pub trait Store {
    fn load(&self) -> Result<Snapshot, StoreError>;
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// Load and validate into a ledger.
    fn load_ledger(&self) -> Result<Ledger, StoreError> {
        Ok(self.load()?.into_ledger()?)
    }
}

/// Pretty-printed JSON file. A missing file loads as an empty snapshot.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Store for JsonStore {
    fn load(&self) -> Result<Snapshot, StoreError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no data file, starting empty");
                return Ok(Snapshot::default());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let snapshot: Snapshot = serde_json::from_str(&data).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        debug!(
            path = %self.path.display(),
            products = snapshot.products.len(),
            users = snapshot.users.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(snapshot).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, data).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), "snapshot saved");
        Ok(())
    }
}

/// Keeps the last saved snapshot in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Snapshot,
    saves: usize,
}

impl MemoryStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot, saves: 0 }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl Store for MemoryStore {
    fn load(&self) -> Result<Snapshot, StoreError> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.snapshot = snapshot.clone();
        self.saves += 1;
        Ok(())
    }
}
