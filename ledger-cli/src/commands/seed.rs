//! Seed command - create the demo accounts

use anyhow::Result;

use super::{get_context, logged};
use crate::output::{self, accounts_table};

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;

    if !ctx.config.allow_seed && !json {
        output::info("Seeding is disabled. Set ledger.allowSeed in settings.json or LEDGER_ALLOW_SEED=true.");
    }

    let accounts = logged("seed_accounts", || ctx.account_service.seed())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    output::success(&format!("Created {} demo accounts", accounts.len()));
    println!("{}", accounts_table(&accounts));
    Ok(())
}
