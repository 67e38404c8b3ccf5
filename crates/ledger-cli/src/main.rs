use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::builder::NonEmptyStringValueParser;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use ledger_core::{print_chain, Ledger, LedgerConfig, Transaction};
use ledger_storage::SledStore;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "Single-node proof-of-work ledger")]
struct Cli {
    /// Directory holding the ledger database
    #[arg(long, global = true, default_value = "./ledger-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a blockchain and send the genesis reward to ADDRESS
    #[command(name = "createblockchain")]
    CreateBlockchain {
        #[arg(long, value_name = "ADDRESS", value_parser = NonEmptyStringValueParser::new())]
        addr: String,
    },
    /// Print the balance of ADDRESS
    Balance {
        #[arg(long, value_name = "ADDRESS", value_parser = NonEmptyStringValueParser::new())]
        addr: String,
    },
    /// Print every block from the tip back to genesis
    #[command(name = "printchain")]
    PrintChain,
    /// Send AMOUNT coins from one address to another
    Send {
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        from: String,
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        to: String,
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        amount: u64,
    },
}

fn main() -> ExitCode {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = LedgerConfig::default();
    match cli.cmd {
        Command::CreateBlockchain { addr } => {
            let store = open_store(&cli.data_dir)?;
            let ledger = Ledger::create(store, &addr, config)?;
            ledger.close()?;
            println!("Done!");
        }
        Command::Balance { addr } => {
            let ledger = Ledger::open(open_store(&cli.data_dir)?, config)?;
            let balance = ledger.balance(&addr)?;
            ledger.close()?;
            println!("Balance of {addr:?}: {balance}");
        }
        Command::PrintChain => {
            let ledger = Ledger::open(open_store(&cli.data_dir)?, config)?;
            print!("{}", print_chain(&ledger)?);
            ledger.close()?;
        }
        Command::Send { from, to, amount } => {
            let mut ledger = Ledger::open(open_store(&cli.data_dir)?, config)?;
            let tx = Transaction::new_transfer(&from, &to, amount, &ledger)?;
            info!(txid = %tx.id_hex(), "mining transfer");
            ledger.mine_block(vec![tx])?;
            ledger.close()?;
            println!("Success!");
        }
    }
    Ok(())
}

fn open_store(data_dir: &Path) -> Result<SledStore> {
    SledStore::open(data_dir)
        .with_context(|| format!("cannot open ledger database in {}", data_dir.display()))
}
