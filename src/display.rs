//! Plain-text rendering of drafts and ledgers for the terminal.
//!
//! Draft amounts are shown exactly as entered. Ledger figures are shown exactly as the backend
//! reported them.

use crate::model::{AccountLedger, BalanceSummary, JournalDraft};

const RULE_WIDTH: usize = 96;

/// The line grid of a draft followed by its totals.
pub fn format_draft(draft: &JournalDraft) -> String {
    let mut output = String::new();
    output.push_str(&format!("Draft:       {}\n", draft.id()));
    output.push_str(&format!("Date:        {}\n", draft.entry_date()));
    let description = if draft.description().trim().is_empty() {
        "(no description)"
    } else {
        draft.description()
    };
    output.push_str(&format!("Description: {description}\n\n"));

    output.push_str(&format!(
        "{:>3}  {:20} {:30} {:>14} {:>14}\n",
        "#", "Account", "Description", "Debit", "Credit"
    ));
    output.push_str(&"-".repeat(85));
    output.push('\n');
    for (i, line) in draft.lines().iter().enumerate() {
        output.push_str(&format!(
            "{:>3}  {:20} {:30} {:>14} {:>14}\n",
            i + 1,
            truncate(line.account_id(), 20),
            truncate(line.description(), 30),
            truncate(line.debit_amount().as_str(), 14),
            truncate(line.credit_amount().as_str(), 14),
        ));
    }
    output.push('\n');
    output.push_str(&format_balance(&draft.balance()));
    output
}

/// Totals, the difference when there is one, and whether the entry balances.
pub fn format_balance(balance: &BalanceSummary) -> String {
    let mut output = String::new();
    output.push_str(&format!("Total debit:  {:#}\n", balance.total_debit));
    output.push_str(&format!("Total credit: {:#}\n", balance.total_credit));
    if balance.is_balanced {
        output.push_str("Balanced\n");
    } else if balance.difference.is_zero() {
        output.push_str("Not balanced: no amounts entered\n");
    } else {
        output.push_str(&format!("Difference:   {:#}\n", balance.difference));
        output.push_str("Not balanced\n");
    }
    output
}

/// One row per draft.
pub fn format_draft_list(drafts: &[JournalDraft]) -> String {
    if drafts.is_empty() {
        return "No drafts found.\n".to_string();
    }
    let mut output = String::new();
    output.push_str(&format!(
        "{:8}  {:10}  {:30} {:>5} {:>16}  {}\n",
        "Id", "Date", "Description", "Lines", "Debit", "Status"
    ));
    output.push_str(&"-".repeat(84));
    output.push('\n');
    for draft in drafts {
        let balance = draft.balance();
        let status = if draft.can_submit() {
            "ready"
        } else if balance.is_balanced {
            "incomplete"
        } else {
            "unbalanced"
        };
        let id = draft.id().to_string();
        output.push_str(&format!(
            "{:8}  {:10}  {:30} {:>5} {:>16}  {}\n",
            &id[..8],
            draft.entry_date().to_string(),
            truncate(draft.description(), 30),
            draft.lines().len(),
            balance.total_debit.to_string(),
            status
        ));
    }
    output
}

/// The account header, opening balance, one row per posting, and the closing totals.
pub fn format_ledger(ledger: &AccountLedger) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{} {} ({}, normal balance {})\n",
        ledger.account_code,
        ledger.account_name,
        ledger.account_type,
        ledger.account_type.normal_side()
    ));
    output.push_str(&format!("Opening balance: {:#}\n\n", ledger.opening_balance));

    if ledger.entries.is_empty() {
        output.push_str("No entries in this period.\n");
    } else {
        output.push_str(&format!(
            "{:10}  {:10}  {:30} {:>13} {:>13} {:>13}\n",
            "Date", "Reference", "Description", "Debit", "Credit", "Balance"
        ));
        output.push_str(&"-".repeat(RULE_WIDTH));
        output.push('\n');
        for row in &ledger.entries {
            let description = if row.line_description.trim().is_empty() {
                row.description.as_str()
            } else {
                row.line_description.as_str()
            };
            output.push_str(&format!(
                "{:10}  {:10}  {:30} {:>13} {:>13} {:>13}\n",
                truncate(&row.entry_date, 10),
                truncate(&row.reference_number, 10),
                truncate(description, 30),
                blank_if_zero(row.debit_amount.is_zero(), row.debit_amount.to_string()),
                blank_if_zero(row.credit_amount.is_zero(), row.credit_amount.to_string()),
                row.running_balance.to_string(),
            ));
        }
        output.push_str(&"-".repeat(RULE_WIDTH));
        output.push('\n');
        output.push_str(&format!(
            "{:54} {:>13} {:>13}\n",
            "Totals",
            ledger.total_debit.to_string(),
            ledger.total_credit.to_string()
        ));
    }
    output.push_str(&format!("\nClosing balance: {:#}\n", ledger.closing_balance));
    output
}

fn blank_if_zero(is_zero: bool, s: String) -> String {
    if is_zero {
        String::new()
    } else {
        s
    }
}

/// Shortens `s` to at most `max_len` characters, ending in "..." when cut.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}
