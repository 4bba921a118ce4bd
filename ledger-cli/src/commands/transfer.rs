//! Transfer command - move funds between two accounts

use anyhow::Result;
use ledger_core::TransferOrder;

use super::accounts::parse_amount;
use super::{describe, get_context, logged};
use crate::output::{self, print_transfer};

pub fn run(
    from: i64,
    to: i64,
    amount: &str,
    idempotency_key: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let amount = parse_amount(amount)?;
    let order = TransferOrder::new(from, to, amount)
        .map_err(describe)?
        .with_idempotency_key(idempotency_key);

    let receipt = logged("transfer", || ctx.transfer_service.submit(order))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&receipt.pair.debit)?);
        return Ok(());
    }

    if receipt.replayed {
        output::warning("Idempotency key already used; showing the original transfer");
    } else {
        output::success(&format!(
            "Moved {} from account {} to account {}",
            receipt.pair.debit.amount, from, to
        ));
    }
    print_transfer(&receipt.pair.debit);
    print_transfer(&receipt.pair.credit);

    Ok(())
}
