//! Transfers command - read transfer records

use anyhow::Result;
use clap::Subcommand;

use super::{describe, get_context};
use crate::output::{print_transfer, transfers_table};

#[derive(Subcommand)]
pub enum TransfersCommands {
    /// List transfer records, newest last
    List {
        /// Only records owned by this account
        #[arg(long)]
        account: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one transfer record
    Show {
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: TransfersCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        TransfersCommands::List { account, json } => {
            let transfers = match account {
                Some(id) => ctx.query_service.list_account_transfers(id),
                None => ctx.query_service.list_transfers(),
            }
            .map_err(describe)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&transfers)?);
                return Ok(());
            }
            if transfers.is_empty() {
                println!("No transfers found.");
                return Ok(());
            }
            println!("{}", transfers_table(&transfers));
        }
        TransfersCommands::Show { id, json } => {
            let transfer = ctx.query_service.get_transfer(id).map_err(describe)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&transfer)?);
            } else {
                print_transfer(&transfer);
            }
        }
    }

    Ok(())
}
