//! Types that represent the core data model: money, journal drafts and account ledgers.
mod amount;
mod journal;
mod ledger;

pub use amount::{Amount, AmountError, CURRENCY_SYMBOL};
pub use journal::{
    can_submit, evaluate_balance, BalanceSummary, CreateJournalEntry, CreateJournalLine,
    EnteredAmount, EntryType, JournalDraft, JournalLine, LineField, ValidationError, MIN_LINES,
};
pub use ledger::{fold_running_balance, AccountLedger, AccountType, DateRange, LedgerRow, Side};
