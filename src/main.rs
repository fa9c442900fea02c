use std::io;
use std::process::ExitCode;

use marketplace::cli::{Prompter, run_prompt};
use marketplace::config::{Config, Mode, USAGE};
use marketplace::csv::{read_products, write_products_stdout};
use marketplace::{JsonStore, Marketplace};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let mut market = match Marketplace::open(JsonStore::new(&config.data_path)) {
        Ok(market) => market,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match config.mode {
        Mode::Interactive => interactive(market).await,
        Mode::Import(path) => {
            let rows = match read_products(&path) {
                Ok(rows) => rows,
                Err(e) => {
                    error!("{e}");
                    return ExitCode::FAILURE;
                }
            };
            let drafts = rows.filter_map(|row| match row {
                Ok(draft) => Some(draft),
                Err(e) => {
                    warn!("{e}");
                    None
                }
            });
            match market.import(drafts) {
                Ok(added) => {
                    println!("imported {added} products");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("{e}");
                    ExitCode::FAILURE
                }
            }
        }
        Mode::Export => match write_products_stdout(market.ledger().products()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{e}");
                ExitCode::FAILURE
            }
        },
    }
}

async fn interactive(mut market: Marketplace<JsonStore>) -> ExitCode {
    let status = market.status();
    let (request_sender, request_receiver) = tokio::sync::mpsc::channel(16);

    let prompt = tokio::task::spawn_blocking(move || {
        let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
        run_prompt(&mut prompter, request_sender, status)
    });

    market.run(ReceiverStream::new(request_receiver)).await;

    match prompt.await {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            error!("terminal error: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("prompt task failed: {e}");
            ExitCode::FAILURE
        }
    }
}
