//! Accounts command - create, inspect and manage accounts

use anyhow::{Context, Result};
use clap::Subcommand;
use dialoguer::{Confirm, Input};
use rust_decimal::Decimal;

use super::{describe, get_context, logged};
use crate::output::{self, accounts_table, print_account};

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// List all accounts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one account
    Show {
        /// Account id
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Open a new ACTIVE account (prompts for missing fields)
    Create {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        iban: Option<String>,
        /// Opening balance, defaults to 0.00
        #[arg(long)]
        amount: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change name, IBAN or balance; omitted fields keep their value
    Update {
        /// Account id
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        iban: Option<String>,
        /// New available amount
        #[arg(long)]
        amount: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Freeze an account
    Freeze {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Unfreeze an account
    Unfreeze {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Delete an account that has no transfers
    Delete {
        id: i64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },
}

pub(crate) fn parse_amount(raw: &str) -> Result<Decimal> {
    raw.trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid amount: {}", raw))
}

fn prompt(label: &str, given: Option<String>) -> Result<String> {
    match given {
        Some(value) => Ok(value),
        None => Ok(Input::<String>::new().with_prompt(label).interact_text()?),
    }
}

pub fn run(command: AccountsCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        AccountsCommands::List { json } => {
            let accounts = ctx.query_service.list_accounts().map_err(describe)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&accounts)?);
                return Ok(());
            }
            if accounts.is_empty() {
                println!("No accounts found.");
                return Ok(());
            }
            println!("{}", accounts_table(&accounts));
        }
        AccountsCommands::Show { id, json } => {
            let account = ctx.query_service.get_account(id).map_err(describe)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&account)?);
            } else {
                print_account(&account);
            }
        }
        AccountsCommands::Create { name, iban, amount, json } => {
            let name = prompt("Name", name)?;
            let iban = prompt("IBAN", iban)?;
            let amount = amount.as_deref().map(parse_amount).transpose()?;

            let account = logged("create_account", || {
                ctx.account_service.create(&name, &iban, amount)
            })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&account)?);
            } else {
                output::success(&format!("Created account {} ({})", account.id, account.name));
            }
        }
        AccountsCommands::Update { id, name, iban, amount, json } => {
            let current = ctx.query_service.get_account(id).map_err(describe)?;
            let name = name.unwrap_or(current.name);
            let iban = iban.unwrap_or(current.iban);
            let amount = match amount {
                Some(raw) => parse_amount(&raw)?,
                None => current.available_amount,
            };

            let account = logged("update_account", || {
                ctx.account_service.update(id, &name, &iban, amount)
            })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&account)?);
            } else {
                output::success(&format!("Updated account {}", account.id));
                print_account(&account);
            }
        }
        AccountsCommands::Freeze { id, json } => {
            let account = logged("freeze_account", || ctx.account_service.freeze(id))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&account)?);
            } else {
                output::success(&format!("Account {} is {}", account.id, account.status));
            }
        }
        AccountsCommands::Unfreeze { id, json } => {
            let account = logged("unfreeze_account", || ctx.account_service.unfreeze(id))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&account)?);
            } else {
                output::success(&format!("Account {} is {}", account.id, account.status));
            }
        }
        AccountsCommands::Delete { id, force } => {
            if !force
                && !Confirm::new()
                    .with_prompt(format!("Delete account {}?", id))
                    .default(false)
                    .interact()?
            {
                println!("Cancelled.");
                return Ok(());
            }

            logged("delete_account", || ctx.account_service.delete(id))?;
            output::success(&format!("Deleted account {}", id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 12.50 ").unwrap(), Decimal::new(1250, 2));
        assert!(parse_amount("twelve").is_err());
    }
}
