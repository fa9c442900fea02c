//! The marketplace session.
//!
//! A [`Marketplace`] owns the ledger, the store and the current user. It
//! applies operator commands and saves the ledger after every change. It can
//! be driven directly through [`Marketplace::handle`] or as a service through
//! [`Marketplace::run`], which answers requests arriving on a stream.

use std::fmt;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::Amount;
use crate::ledger::{Ledger, LedgerError, Receipt, ValidationError};
use crate::model::{Product, ProductDraft, ProductId, UserId};
use crate::store::{Snapshot, Store, StoreError};

/// An operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ListProducts,
    Register { name: String },
    Deposit { amount: Amount },
    Purchase { product: ProductId, quantity: u32 },
    AddProduct(ProductDraft),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::ListProducts => "list",
            Command::Register { .. } => "register",
            Command::Deposit { .. } => "deposit",
            Command::Purchase { .. } => "purchase",
            Command::AddProduct(_) => "add product",
        }
    }

    fn mutates(&self) -> bool {
        !matches!(self, Command::ListProducts)
    }
}

/// Result of a successful command.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Products(Vec<Product>),
    Registered { user: UserId, name: String },
    Deposited { amount: Amount, balance: Amount },
    Purchased { name: String, receipt: Receipt },
    ProductAdded(Product),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Products(products) if products.is_empty() => write!(f, "catalog is empty"),
            Reply::Products(products) => {
                for (i, product) in products.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{product}")?;
                }
                Ok(())
            }
            Reply::Registered { name, .. } => write!(f, "welcome, {name}"),
            Reply::Deposited { amount, balance } => {
                write!(f, "deposited {amount}, balance {balance}")
            }
            Reply::Purchased { name, receipt } => write!(
                f,
                "bought {} x {name} for {}, balance {}",
                receipt.quantity, receipt.total, receipt.balance
            ),
            Reply::ProductAdded(product) => write!(f, "added {product}"),
        }
    }
}

/// Current user and balance, shown in the menu header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Status {
    pub user: Option<String>,
    pub balance: Amount,
}

/// Session-level error.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("no user registered")]
    NoCurrentUser,

    #[error("{0}")]
    Ledger(#[from] LedgerError),

    /// The change was applied in memory but could not be persisted.
    #[error("failed to save: {0}")]
    Store(#[from] StoreError),
}

impl From<ValidationError> for MarketError {
    fn from(err: ValidationError) -> Self {
        MarketError::Ledger(err.into())
    }
}

/// A command together with the channel its response goes to.
#[derive(Debug)]
pub struct Request {
    pub command: Command,
    pub respond_to: oneshot::Sender<Response>,
}

/// Answer to a [`Request`]: the outcome plus the status after it.
#[derive(Debug)]
pub struct Response {
    pub outcome: Result<Reply, MarketError>,
    pub status: Status,
}

/// Ledger, store and current user of one operator session.
pub struct Marketplace<S> {
    ledger: Ledger,
    store: S,
    current_user: Option<UserId>,
}

/// Public API
impl<S: Store> Marketplace<S> {
    /// Load the ledger from the store. The first stored user becomes current.
    pub fn open(store: S) -> Result<Self, StoreError> {
        let ledger = store.load_ledger()?;
        let current_user = if ledger.users().is_empty() {
            None
        } else {
            Some(0)
        };
        info!(
            products = ledger.products().len(),
            users = ledger.users().len(),
            "marketplace opened"
        );
        Ok(Self {
            ledger,
            store,
            current_user,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn current_user(&self) -> Option<UserId> {
        self.current_user
    }

    pub fn status(&self) -> Status {
        match self.current_user.and_then(|id| self.ledger.user(id)) {
            Some(user) => Status {
                user: Some(user.name().to_string()),
                balance: user.balance(),
            },
            None => Status::default(),
        }
    }

    /// Add products without going through a command, e.g. a csv import.
    /// Invalid drafts are logged and skipped; the ledger is saved once at the end.
    pub fn import(
        &mut self,
        drafts: impl IntoIterator<Item = ProductDraft>,
    ) -> Result<usize, StoreError> {
        let mut added = 0;
        for draft in drafts {
            match self.ledger.add_product(draft) {
                Ok(_) => added += 1,
                Err(e) => warn!(reason = %e, "product skipped"),
            }
        }
        if added > 0 {
            self.save()?;
        }
        Ok(added)
    }

    /// Apply a single command on top of the current state
    pub fn handle(&mut self, command: Command) -> Result<Reply, MarketError> {
        let name = command.name();
        let mutates = command.mutates();
        let result = self.apply(command);
        match &result {
            Ok(_) => info!(command = name, "command applied"),
            Err(e) => info!(command = name, reason = %e, "command skipped"),
        }
        let reply = result?;
        if mutates {
            self.save()?;
        }
        Ok(reply)
    }

    /// Answer requests until the stream ends
    pub async fn run(&mut self, mut requests: impl Stream<Item = Request> + Unpin) {
        while let Some(Request {
            command,
            respond_to,
        }) = requests.next().await
        {
            // a failed command should not stop the session
            let outcome = self.handle(command);
            let response = Response {
                outcome,
                status: self.status(),
            };
            if respond_to.send(response).is_err() {
                warn!("requester went away before the response was sent");
            }
        }
    }
}

/// Private API
impl<S: Store> Marketplace<S> {
    fn apply(&mut self, command: Command) -> Result<Reply, MarketError> {
        match command {
            Command::ListProducts => Ok(Reply::Products(self.ledger.products().to_vec())),
            Command::Register { name } => {
                let user = self.ledger.add_user(&name)?;
                self.current_user = Some(user);
                Ok(Reply::Registered {
                    user,
                    name: name.trim().to_string(),
                })
            }
            Command::Deposit { amount } => {
                let user = self.current_user.ok_or(MarketError::NoCurrentUser)?;
                let balance = self.ledger.deposit(user, amount)?;
                Ok(Reply::Deposited { amount, balance })
            }
            Command::Purchase { product, quantity } => {
                let user = self.current_user.ok_or(MarketError::NoCurrentUser)?;
                let receipt = self.ledger.purchase(product, user, quantity)?;
                let name = self
                    .ledger
                    .product(product)
                    .map(|p| p.name().to_string())
                    .unwrap_or_default();
                Ok(Reply::Purchased { name, receipt })
            }
            Command::AddProduct(draft) => {
                let product = self.ledger.add_product(draft)?;
                Ok(Reply::ProductAdded(product))
            }
        }
    }

    fn save(&mut self) -> Result<(), StoreError> {
        let snapshot = Snapshot::of(&self.ledger);
        self.store.save(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    // test utils

    fn units(value: i64) -> Amount {
        Amount::from_units(value)
    }

    fn empty() -> Marketplace<MemoryStore> {
        Marketplace::open(MemoryStore::default()).unwrap()
    }

    fn stocked() -> Marketplace<MemoryStore> {
        let mut market = empty();
        market
            .handle(Command::AddProduct(ProductDraft::electronic(
                "MacBook Pro",
                units(2000),
                5,
                2,
            )))
            .unwrap();
        market
            .handle(Command::Register {
                name: "Bekzod".to_string(),
            })
            .unwrap();
        market
            .handle(Command::Deposit {
                amount: units(5000),
            })
            .unwrap();
        market
    }

    #[test]
    fn open_empty_store_has_no_user() {
        let market = empty();
        assert_eq!(market.current_user(), None);
        assert_eq!(market.status(), Status::default());
    }

    #[test]
    fn open_selects_first_stored_user() {
        let mut store = MemoryStore::default();
        let snapshot = Snapshot::of(stocked().ledger());
        store.save(&snapshot).unwrap();

        let market = Marketplace::open(store).unwrap();
        assert_eq!(market.current_user(), Some(0));
        assert_eq!(
            market.status(),
            Status {
                user: Some("Bekzod".to_string()),
                balance: units(5000),
            }
        );
    }

    #[test]
    fn deposit_without_user_fails() {
        let mut market = empty();
        let result = market.handle(Command::Deposit { amount: units(1) });
        assert!(matches!(result, Err(MarketError::NoCurrentUser)));
        assert_eq!(market.store().saves(), 0);
    }

    #[test]
    fn purchase_saves_new_state() {
        let mut market = stocked();
        let saves = market.store().saves();

        let reply = market
            .handle(Command::Purchase {
                product: 1001,
                quantity: 2,
            })
            .unwrap();
        assert_eq!(
            reply.to_string(),
            "bought 2 x MacBook Pro for 4000.00, balance 1000.00"
        );
        assert_eq!(market.store().saves(), saves + 1);

        let saved = market.store().snapshot().clone().into_ledger().unwrap();
        assert_eq!(saved.product(1001).unwrap().quantity(), 3);
        assert_eq!(saved.users()[0].balance(), units(1000));
    }

    #[test]
    fn failed_purchase_does_not_save() {
        let mut market = stocked();
        let saves = market.store().saves();

        let result = market.handle(Command::Purchase {
            product: 1001,
            quantity: 6,
        });
        assert!(matches!(
            result,
            Err(MarketError::Ledger(LedgerError::InsufficientStock { .. }))
        ));
        assert_eq!(market.store().saves(), saves);
        assert_eq!(market.status().balance, units(5000));
    }

    #[test]
    fn list_does_not_save() {
        let mut market = stocked();
        let saves = market.store().saves();

        let reply = market.handle(Command::ListProducts).unwrap();
        assert_eq!(
            reply.to_string(),
            "[1001] MacBook Pro - 2000.00 (5 pcs) | warranty: 2y | in stock"
        );
        assert_eq!(market.store().saves(), saves);
    }

    #[test]
    fn empty_catalog_message() {
        let mut market = empty();
        let reply = market.handle(Command::ListProducts).unwrap();
        assert_eq!(reply.to_string(), "catalog is empty");
    }

    #[test]
    fn register_switches_current_user() {
        let mut market = stocked();
        let reply = market
            .handle(Command::Register {
                name: " Ali ".to_string(),
            })
            .unwrap();
        assert_eq!(
            reply,
            Reply::Registered {
                user: 1,
                name: "Ali".to_string()
            }
        );
        assert_eq!(market.status().balance, Amount::ZERO);
    }

    #[test]
    fn invalid_deposit_is_reported() {
        let mut market = stocked();
        let result = market.handle(Command::Deposit { amount: units(-5) });
        assert!(matches!(
            result,
            Err(MarketError::Ledger(LedgerError::Validation(
                ValidationError::NonPositiveAmount(_)
            )))
        ));
    }

    #[test]
    fn import_skips_invalid_drafts() {
        let mut market = empty();
        let added = market
            .import(vec![
                ProductDraft::electronic("Phone", units(10), 1, 1),
                ProductDraft::food("Bad", units(-1), 1, "x"),
                ProductDraft::food("Olma", units(2), 10, "2026-05-10"),
            ])
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(market.store().saves(), 1);
        let ids: Vec<_> = market.ledger().products().iter().map(Product::id).collect();
        assert_eq!(ids, vec![1001, 1002]);
    }

    // Async run()

    async fn send(
        sender: &tokio::sync::mpsc::Sender<Request>,
        command: Command,
    ) -> oneshot::Receiver<Response> {
        let (respond_to, response) = oneshot::channel();
        sender.send(Request { command, respond_to }).await.unwrap();
        response
    }

    #[tokio::test]
    async fn run_answers_requests_and_continues_after_errors() {
        let mut market = stocked();
        let (sender, receiver) = tokio::sync::mpsc::channel(16);

        let too_many = send(
            &sender,
            Command::Purchase {
                product: 1001,
                quantity: 60,
            },
        )
        .await;
        let ok = send(
            &sender,
            Command::Purchase {
                product: 1001,
                quantity: 1,
            },
        )
        .await;
        drop(sender);

        market
            .run(tokio_stream::wrappers::ReceiverStream::new(receiver))
            .await;

        let first = too_many.await.unwrap();
        assert!(first.outcome.is_err());
        assert_eq!(first.status.balance, units(5000));

        let second = ok.await.unwrap();
        assert!(second.outcome.is_ok());
        assert_eq!(second.status.balance, units(3000));
        assert_eq!(market.ledger().product(1001).unwrap().quantity(), 4);
    }
}
