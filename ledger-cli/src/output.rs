//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};
use ledger_core::{Account, AccountStatus, Transfer};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn status_label(status: AccountStatus) -> String {
    match status {
        AccountStatus::Active => status.as_str().green().to_string(),
        AccountStatus::Frozen => status.as_str().blue().to_string(),
    }
}

pub fn accounts_table(accounts: &[Account]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["ID", "Name", "IBAN", "Status", "Available"]);
    for account in accounts {
        table.add_row(vec![
            Cell::new(account.id),
            Cell::new(&account.name),
            Cell::new(&account.iban),
            Cell::new(status_label(account.status)),
            Cell::new(account.available_amount).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn transfers_table(transfers: &[Transfer]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["ID", "Account", "Beneficiary", "Type", "Amount", "Created"]);
    for transfer in transfers {
        table.add_row(vec![
            Cell::new(transfer.id),
            Cell::new(transfer.account_id),
            Cell::new(transfer.beneficiary_account_id),
            Cell::new(transfer.transfer_type.as_str()),
            Cell::new(transfer.amount).set_alignment(CellAlignment::Right),
            Cell::new(transfer.created_on.format("%Y-%m-%d %H:%M:%S")),
        ]);
    }
    table
}

/// Key/value view of a single account
pub fn print_account(account: &Account) {
    println!("{}", format!("Account {}", account.id).bold());
    println!("  Name:       {}", account.name);
    println!("  IBAN:       {}", account.iban);
    println!("  Status:     {}", status_label(account.status));
    println!("  Available:  {}", account.available_amount);
    println!("  Created:    {}", account.created_on.to_rfc3339());
    println!("  Modified:   {}", account.modified_on.to_rfc3339());
}

pub fn print_transfer(transfer: &Transfer) {
    println!("{}", format!("Transfer {}", transfer.id).bold());
    println!("  Type:         {}", transfer.transfer_type.as_str());
    println!("  Account:      {}", transfer.account_id);
    println!("  Beneficiary:  {}", transfer.beneficiary_account_id);
    println!("  Amount:       {}", transfer.amount);
    println!("  Created:      {}", transfer.created_on.to_rfc3339());
}
