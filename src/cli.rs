//! Interactive menu.
//!
//! The prompt loop is blocking: it reads one command, hands it to the
//! marketplace service and waits for the response before prompting again.

use std::io::{self, BufRead, Write};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::Amount;
use crate::amount::ParseAmountError;
use crate::market::{Command, Request, Response, Status};
use crate::model::{ProductDraft, ProductId};

/// Operator input that could not be turned into a command
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("unknown menu option '{0}'")]
    UnknownChoice(String),

    #[error("{field}: '{input}' is not a whole number")]
    InvalidNumber { field: &'static str, input: String },

    #[error("{0}")]
    InvalidAmount(#[from] ParseAmountError),

    #[error("unknown product type '{0}', expected e or f")]
    UnknownProductType(String),

    #[error("input closed")]
    Closed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Show the menu and read the next command.
    ///
    /// Returns `Ok(None)` when the operator exits or input ends. With no user
    /// registered the only command offered is registration.
    pub fn next_command(&mut self, status: &Status) -> Result<Option<Command>, PromptError> {
        let result = self.read_command(status);
        match result {
            Err(PromptError::Closed) => Ok(None),
            other => other,
        }
    }

    /// Print the outcome of a command.
    pub fn show(&mut self, response: &Response) -> io::Result<()> {
        match &response.outcome {
            Ok(reply) => writeln!(self.output, "{reply}"),
            Err(e) => writeln!(self.output, "error: {e}"),
        }
    }

    pub fn report(&mut self, err: &PromptError) -> io::Result<()> {
        writeln!(self.output, "error: {err}")
    }

    fn read_command(&mut self, status: &Status) -> Result<Option<Command>, PromptError> {
        let Some(user) = &status.user else {
            let name = self.ask("Welcome! Enter your name: ")?;
            return Ok(Some(Command::Register { name }));
        };

        writeln!(
            self.output,
            "\n--- MARKETPLACE | user: {user} | balance: {} ---",
            status.balance
        )?;
        writeln!(self.output, "1. List products")?;
        writeln!(self.output, "2. Deposit")?;
        writeln!(self.output, "3. Purchase")?;
        writeln!(self.output, "4. Admin: add product")?;
        writeln!(self.output, "0. Exit")?;

        let choice = self.ask("Choice: ")?;
        let command = match choice.as_str() {
            "1" => Command::ListProducts,
            "2" => Command::Deposit {
                amount: self.ask("Amount: ")?.parse::<Amount>()?,
            },
            "3" => Command::Purchase {
                product: self.ask_number::<ProductId>("product id", "Product id: ")?,
                quantity: self.ask_number::<u32>("quantity", "Quantity: ")?,
            },
            "4" => Command::AddProduct(self.ask_product()?),
            "0" => return Ok(None),
            _ => return Err(PromptError::UnknownChoice(choice)),
        };
        Ok(Some(command))
    }

    fn ask_product(&mut self) -> Result<ProductDraft, PromptError> {
        let kind = self.ask("Type (e = electronic, f = food): ")?;
        let name = self.ask("Name: ")?;
        let price = self.ask("Price: ")?.parse::<Amount>()?;
        let quantity = self.ask_number::<i64>("quantity", "Quantity: ")?;
        match kind.to_ascii_lowercase().as_str() {
            "e" | "electronic" => {
                let warranty = self.ask_number::<i64>("warranty years", "Warranty years: ")?;
                Ok(ProductDraft::electronic(name, price, quantity, warranty))
            }
            "f" | "food" => {
                let expiry = self.ask("Expiry date: ")?;
                Ok(ProductDraft::food(name, price, quantity, expiry))
            }
            _ => Err(PromptError::UnknownProductType(kind)),
        }
    }

    fn ask_number<T: std::str::FromStr>(
        &mut self,
        field: &'static str,
        prompt: &str,
    ) -> Result<T, PromptError> {
        let input = self.ask(prompt)?;
        input
            .parse()
            .map_err(|_| PromptError::InvalidNumber { field, input })
    }

    /// Print a prompt and read one trimmed line.
    fn ask(&mut self, prompt: &str) -> Result<String, PromptError> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PromptError::Closed);
        }
        Ok(line.trim().to_string())
    }
}

/// Drive the menu against a marketplace service until the operator exits.
///
/// Must run on a thread where blocking is allowed, e.g. under
/// `tokio::task::spawn_blocking`.
pub fn run_prompt<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    requests: mpsc::Sender<Request>,
    mut status: Status,
) -> io::Result<()> {
    loop {
        let command = match prompter.next_command(&status) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(()),
            Err(PromptError::Io(e)) => return Err(e),
            Err(e) => {
                prompter.report(&e)?;
                continue;
            }
        };

        let (respond_to, response) = oneshot::channel();
        if requests
            .blocking_send(Request {
                command,
                respond_to,
            })
            .is_err()
        {
            warn!("marketplace service stopped");
            return Ok(());
        }
        let Ok(response) = response.blocking_recv() else {
            warn!("marketplace service dropped the request");
            return Ok(());
        };

        prompter.show(&response)?;
        status = response.status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Marketplace;
    use crate::store::MemoryStore;
    use std::io::Cursor;
    use tokio_stream::wrappers::ReceiverStream;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn signed_in() -> Status {
        Status {
            user: Some("Bekzod".to_string()),
            balance: Amount::from_units(5000),
        }
    }

    #[test]
    fn asks_for_name_without_user() {
        let mut p = prompter("Bekzod\n");
        let command = p.next_command(&Status::default()).unwrap();
        assert_eq!(
            command,
            Some(Command::Register {
                name: "Bekzod".to_string()
            })
        );
    }

    #[test]
    fn menu_shows_user_and_balance() {
        let mut p = prompter("1\n");
        assert_eq!(
            p.next_command(&signed_in()).unwrap(),
            Some(Command::ListProducts)
        );
        let out = String::from_utf8(p.into_output()).unwrap();
        assert!(out.contains("user: Bekzod | balance: 5000.00"));
        assert!(out.contains("3. Purchase"));
    }

    #[test]
    fn reads_deposit_and_purchase() {
        let mut p = prompter("2\n250.5\n3\n1001\n2\n");
        assert_eq!(
            p.next_command(&signed_in()).unwrap(),
            Some(Command::Deposit {
                amount: Amount::from_float(250.5)
            })
        );
        assert_eq!(
            p.next_command(&signed_in()).unwrap(),
            Some(Command::Purchase {
                product: 1001,
                quantity: 2
            })
        );
    }

    #[test]
    fn reads_products_of_both_types() {
        let mut p = prompter("4\ne\nPhone\n100\n3\n1\n4\nf\nOlma\n2\n50\n2026-05-10\n");
        assert_eq!(
            p.next_command(&signed_in()).unwrap(),
            Some(Command::AddProduct(ProductDraft::electronic(
                "Phone",
                Amount::from_units(100),
                3,
                1
            )))
        );
        assert_eq!(
            p.next_command(&signed_in()).unwrap(),
            Some(Command::AddProduct(ProductDraft::food(
                "Olma",
                Amount::from_units(2),
                50,
                "2026-05-10"
            )))
        );
    }

    #[test]
    fn negative_quantity_reaches_validation() {
        let mut p = prompter("4\ne\nPhone\n100\n-3\n1\n");
        let Some(Command::AddProduct(draft)) = p.next_command(&signed_in()).unwrap() else {
            panic!("expected add product");
        };
        assert_eq!(draft.quantity, -3);
    }

    #[test]
    fn bad_input_is_an_error() {
        let mut p = prompter("9\n3\nabc\n2\nlots\n4\nx\nToy\n1\n1\n");
        assert!(matches!(
            p.next_command(&signed_in()),
            Err(PromptError::UnknownChoice(c)) if c == "9"
        ));
        assert!(matches!(
            p.next_command(&signed_in()),
            Err(PromptError::InvalidNumber {
                field: "product id",
                ..
            })
        ));
        assert!(matches!(
            p.next_command(&signed_in()),
            Err(PromptError::InvalidAmount(_))
        ));
        assert!(matches!(
            p.next_command(&signed_in()),
            Err(PromptError::UnknownProductType(t)) if t == "x"
        ));
    }

    #[test]
    fn out_of_range_deposit_is_rejected() {
        let mut p = prompter("2\n1e20\n4\ne\nTab\nNaN\n1\n1\n");
        assert!(matches!(
            p.next_command(&signed_in()),
            Err(PromptError::InvalidAmount(_))
        ));
        assert!(matches!(
            p.next_command(&signed_in()),
            Err(PromptError::InvalidAmount(_))
        ));
    }

    #[test]
    fn exit_and_end_of_input_stop() {
        let mut p = prompter("0\n");
        assert_eq!(p.next_command(&signed_in()).unwrap(), None);
        assert_eq!(p.next_command(&signed_in()).unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn session_round_trip() {
        let mut market = Marketplace::open(MemoryStore::default()).unwrap();
        let status = market.status();
        let (sender, receiver) = mpsc::channel(16);

        let input = "Bekzod\n2\n5000\n4\ne\nMacBook Pro\n2000\n5\n2\n3\n1001\n2\n3\n1001\n9\n0\n";
        let prompt = tokio::task::spawn_blocking(move || {
            let mut p = prompter(input);
            run_prompt(&mut p, sender, status).unwrap();
            String::from_utf8(p.into_output()).unwrap()
        });

        market.run(ReceiverStream::new(receiver)).await;
        let out = prompt.await.unwrap();

        assert!(out.contains("welcome, Bekzod"));
        assert!(out.contains("deposited 5000.00, balance 5000.00"));
        assert!(out.contains("bought 2 x MacBook Pro for 4000.00, balance 1000.00"));
        assert!(out.contains("error: not enough 'MacBook Pro' in stock"));
        assert!(out.contains("balance: 1000.00"));

        let ledger = market.ledger();
        assert_eq!(ledger.product(1001).unwrap().quantity(), 3);
        assert_eq!(ledger.users()[0].balance(), Amount::from_units(1000));
    }
}
