//! Status command - ledger summary

use anyhow::Result;
use colored::Colorize;

use super::{describe, get_context, get_ledger_dir};
use crate::output::create_table;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let summary = ctx.query_service.summary().map_err(describe)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", "Ledger Status".bold());
    println!();

    let mut table = create_table();
    table.add_row(vec!["Accounts".to_string(), summary.accounts.to_string()]);
    table.add_row(vec!["Frozen".to_string(), summary.frozen_accounts.to_string()]);
    table.add_row(vec!["Transfer records".to_string(), summary.transfer_records.to_string()]);
    table.add_row(vec!["Total balance".to_string(), summary.total_balance.to_string()]);
    println!("{}", table);

    println!();
    println!("Ledger directory: {}", get_ledger_dir()?.display().to_string().dimmed());
    if ctx.config.allow_seed {
        println!("{}", "Seeding enabled".dimmed());
    }

    Ok(())
}
