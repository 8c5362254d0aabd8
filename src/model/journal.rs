//! Manually-entered double-entry journal entries.
//!
//! A `JournalDraft` is edited locally, line by line, and only becomes a `CreateJournalEntry`
//! request once it passes `check`. The backend owns the entry after it has been posted.

use crate::model::{Amount, AmountError};
use crate::Result;
use anyhow::bail;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// A draft never has fewer lines than this; it is the least needed to balance a transaction.
pub const MIN_LINES: usize = 2;

/// An amount exactly as it was typed into a journal line.
///
/// The text is kept so that editing one cell never reformats it. It is parsed, leniently, only
/// when totals are computed.
#[derive(Default, Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnteredAmount(String);

impl EnteredAmount {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Like `new`, but refuses a number above `MAX_RUPEES`. Text that is not a number is kept.
    pub fn try_new(text: impl Into<String>) -> std::result::Result<Self, AmountError> {
        let text = text.into();
        match Amount::from_str(&text) {
            Err(e) if e.is_too_large() => Err(e),
            _ => Ok(Self(text)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The parsed amount; empty or non-numeric text is zero.
    pub fn amount(&self) -> Amount {
        Amount::parse_lenient(&self.0)
    }
}

impl Display for EnteredAmount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EnteredAmount {
    fn from(value: &str) -> Self {
        EnteredAmount::new(value)
    }
}

/// One row of a journal draft.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JournalLine {
    account_id: String,
    description: String,
    debit_amount: EnteredAmount,
    credit_amount: EnteredAmount,
}

impl JournalLine {
    pub fn new(
        account_id: impl Into<String>,
        description: impl Into<String>,
        debit_amount: impl Into<EnteredAmount>,
        credit_amount: impl Into<EnteredAmount>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            description: description.into(),
            debit_amount: debit_amount.into(),
            credit_amount: credit_amount.into(),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn debit_amount(&self) -> &EnteredAmount {
        &self.debit_amount
    }

    pub fn credit_amount(&self) -> &EnteredAmount {
        &self.credit_amount
    }

    pub fn debit(&self) -> Amount {
        self.debit_amount.amount()
    }

    pub fn credit(&self) -> Amount {
        self.credit_amount.amount()
    }

    /// True if an account has been chosen for this line.
    pub fn has_account(&self) -> bool {
        !self.account_id.trim().is_empty()
    }

    /// Sets one field. No other field is touched, and nothing is touched if an amount is too
    /// large.
    pub fn set(
        &mut self,
        field: LineField,
        value: impl Into<String>,
    ) -> std::result::Result<(), AmountError> {
        let value = value.into();
        match field {
            LineField::Account => self.account_id = value,
            LineField::Description => self.description = value,
            LineField::Debit => self.debit_amount = EnteredAmount::try_new(value)?,
            LineField::Credit => self.credit_amount = EnteredAmount::try_new(value)?,
        }
        Ok(())
    }
}

/// The editable cells of a `JournalLine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineField {
    Account,
    Description,
    Debit,
    Credit,
}

serde_plain::derive_display_from_serialize!(LineField);
serde_plain::derive_fromstr_from_deserialize!(LineField);

/// Debit and credit totals of a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceSummary {
    pub total_debit: Amount,
    pub total_credit: Amount,
    /// `|total_debit - total_credit|`, unrounded.
    pub difference: Amount,
    /// The difference is under one paisa, and there is some debit activity.
    pub is_balanced: bool,
}

impl BalanceSummary {
    fn from_totals(total_debit: Amount, total_credit: Amount) -> Self {
        let difference = (total_debit - total_credit).abs();
        Self {
            total_debit,
            total_credit,
            difference,
            is_balanced: within_tolerance(difference) && total_debit.is_positive(),
        }
    }
}

/// Differences below one paisa are rounding noise.
fn within_tolerance(difference: Amount) -> bool {
    difference.value() < Decimal::new(1, 2)
}

/// Totals the lines and decides whether they balance.
///
/// Unparseable amounts count as zero. The entry balances when the exact difference of the totals
/// is less than one paisa, so `100` against `99.991` balances while `100` against `99.99` does
/// not. An entry with no debits never balances.
pub fn evaluate_balance(lines: &[JournalLine]) -> BalanceSummary {
    BalanceSummary::from_totals(
        lines.iter().map(JournalLine::debit).sum(),
        lines.iter().map(JournalLine::credit).sum(),
    )
}

/// True if `draft` may be posted. See `JournalDraft::check` for the reason when it may not.
pub fn can_submit(draft: &JournalDraft) -> bool {
    draft.check().is_ok()
}

/// Why a draft cannot be posted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("the entry has no debit amounts")]
    NoActivity,

    #[error(
        "the entry is out of balance by {difference:#} (debits {total_debit:#}, credits {total_credit:#})"
    )]
    Unbalanced {
        total_debit: Amount,
        total_credit: Amount,
        difference: Amount,
    },

    #[error("a description is required")]
    MissingDescription,

    #[error("no line has an account")]
    NoAccount,
}

/// A journal entry being edited locally.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JournalDraft {
    id: Uuid,
    created_at: DateTime<Utc>,
    entry_date: NaiveDate,
    description: String,
    lines: Vec<JournalLine>,
}

impl JournalDraft {
    /// A new draft with exactly two empty lines.
    pub fn new(entry_date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            entry_date,
            description: description.into(),
            lines: vec![JournalLine::default(); MIN_LINES],
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn entry_date(&self) -> NaiveDate {
        self.entry_date
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn lines(&self) -> &[JournalLine] {
        &self.lines
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_entry_date(&mut self, entry_date: NaiveDate) {
        self.entry_date = entry_date;
    }

    /// Appends `line` and returns its index.
    pub fn add_line(&mut self, line: JournalLine) -> usize {
        self.lines.push(line);
        self.lines.len() - 1
    }

    /// Removes the line at `index`. Returns `false`, leaving the draft unchanged, if that would
    /// leave fewer than `MIN_LINES` lines or if there is no such line.
    pub fn remove_line(&mut self, index: usize) -> bool {
        if self.lines.len() <= MIN_LINES || index >= self.lines.len() {
            return false;
        }
        self.lines.remove(index);
        true
    }

    /// Sets one field of the line at `index`.
    pub fn set_line(
        &mut self,
        index: usize,
        field: LineField,
        value: impl Into<String>,
    ) -> Result<()> {
        let count = self.lines.len();
        match self.lines.get_mut(index) {
            Some(line) => {
                line.set(field, value)?;
                Ok(())
            }
            None => bail!(
                "Line {} does not exist, the draft has {count} lines",
                index + 1
            ),
        }
    }

    pub fn balance(&self) -> BalanceSummary {
        evaluate_balance(&self.lines)
    }

    /// Returns the first reason this draft cannot be posted, if any.
    pub fn check(&self) -> std::result::Result<(), ValidationError> {
        let summary = self.balance();
        if !within_tolerance(summary.difference) {
            return Err(ValidationError::Unbalanced {
                total_debit: summary.total_debit,
                total_credit: summary.total_credit,
                difference: summary.difference,
            });
        }
        if !summary.is_balanced {
            return Err(ValidationError::NoActivity);
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::MissingDescription);
        }
        if !self.lines.iter().any(JournalLine::has_account) {
            return Err(ValidationError::NoAccount);
        }
        Ok(())
    }

    pub fn can_submit(&self) -> bool {
        can_submit(self)
    }

    /// Builds the request body for posting this draft. Lines without an account are left out.
    pub fn to_request(&self) -> std::result::Result<CreateJournalEntry, ValidationError> {
        self.check()?;
        let lines = self
            .lines
            .iter()
            .filter(|line| line.has_account())
            .map(|line| CreateJournalLine {
                account_id: line.account_id.trim().to_string(),
                description: line.description.clone(),
                debit_amount: line.debit(),
                credit_amount: line.credit(),
            })
            .collect();
        Ok(CreateJournalEntry {
            entry_date: self.entry_date,
            description: self.description.trim().to_string(),
            entry_type: EntryType::Journal,
            lines,
        })
    }
}

/// The kind of journal entry being created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    /// A manual journal entry.
    #[default]
    Journal,
}

serde_plain::derive_display_from_serialize!(EntryType);

/// Body of `POST /api/journal-entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJournalEntry {
    pub entry_date: NaiveDate,
    pub description: String,
    pub entry_type: EntryType,
    pub lines: Vec<CreateJournalLine>,
}

impl CreateJournalEntry {
    pub fn balance(&self) -> BalanceSummary {
        BalanceSummary::from_totals(
            self.lines.iter().map(|l| l.debit_amount).sum(),
            self.lines.iter().map(|l| l.credit_amount).sum(),
        )
    }
}

/// One line of a `CreateJournalEntry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJournalLine {
    pub account_id: String,
    pub description: String,
    pub debit_amount: Amount,
    pub credit_amount: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn line(debit: &str, credit: &str) -> JournalLine {
        JournalLine::new("", "", debit, credit)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
    }

    #[test]
    fn test_empty_lines_do_not_balance() {
        let summary = evaluate_balance(&[]);
        assert!(!summary.is_balanced);
        assert!(summary.total_debit.is_zero());
        assert!(summary.total_credit.is_zero());
    }

    #[test]
    fn test_equal_totals_balance() {
        let summary = evaluate_balance(&[line("100", "0"), line("0", "100")]);
        assert_eq!(summary.total_debit.value(), dec!(100));
        assert_eq!(summary.total_credit.value(), dec!(100));
        assert!(summary.difference.is_zero());
        assert!(summary.is_balanced);
    }

    #[test]
    fn test_sub_paisa_difference_balances() {
        let summary = evaluate_balance(&[line("100", "0"), line("0", "99.995")]);
        assert_eq!(summary.difference.value(), dec!(0.005));
        assert!(summary.is_balanced);
    }

    #[test]
    fn test_two_paise_difference_does_not_balance() {
        let summary = evaluate_balance(&[line("100", "0"), line("0", "99.98")]);
        assert_eq!(summary.difference.value(), dec!(0.02));
        assert!(!summary.is_balanced);
    }

    #[test]
    fn test_one_paisa_difference_does_not_balance() {
        let summary = evaluate_balance(&[line("100", "0"), line("0", "99.99")]);
        assert_eq!(summary.difference.value(), dec!(0.01));
        assert!(!summary.is_balanced);
    }

    #[test]
    fn test_any_difference_under_one_paisa_balances() {
        let summary = evaluate_balance(&[line("100", "0"), line("0", "99.994")]);
        assert_eq!(summary.difference.value(), dec!(0.006));
        assert!(summary.is_balanced);

        // The totals round to different paise, but are still less than one paisa apart.
        let summary = evaluate_balance(&[line("100.005", "0"), line("0", "99.996")]);
        assert_eq!(summary.difference.value(), dec!(0.009));
        assert!(summary.is_balanced);

        let summary = evaluate_balance(&[line("100", "0"), line("0", "99.9901")]);
        assert!(summary.is_balanced);
    }

    #[test]
    fn test_check_accepts_sub_paisa_difference() {
        let mut draft = JournalDraft::new(date(), "Rounding");
        draft.set_line(0, LineField::Account, "a").unwrap();
        draft.set_line(0, LineField::Debit, "100.005").unwrap();
        draft.set_line(1, LineField::Account, "b").unwrap();
        draft.set_line(1, LineField::Credit, "99.996").unwrap();
        assert_eq!(draft.check(), Ok(()));
    }

    #[test]
    fn test_oversized_amounts_are_refused_and_cannot_overflow() {
        let huge = "79228162514264337593543950335";
        let mut draft = JournalDraft::new(date(), "");
        let err = draft.set_line(0, LineField::Debit, huge).unwrap_err();
        assert!(err.to_string().contains("larger than the largest allowed amount"));
        assert_eq!(draft.lines()[0], JournalLine::default());
        assert!(EnteredAmount::try_new(huge).is_err());
        assert!(EnteredAmount::try_new("not a number").is_ok());

        // Text that never went through `try_new`, e.g. an edited draft file, counts as zero.
        let summary = evaluate_balance(&[line(huge, ""), line(huge, "")]);
        assert!(summary.total_debit.is_zero());
        assert!(!summary.is_balanced);
    }

    #[test]
    fn test_blank_and_garbage_amounts_are_zero() {
        let summary = evaluate_balance(&[line("", "abc"), line("250", ""), line("x", "250")]);
        assert_eq!(summary.total_debit.value(), dec!(250));
        assert_eq!(summary.total_credit.value(), dec!(250));
        assert!(summary.is_balanced);
    }

    #[test]
    fn test_credit_only_is_not_balanced() {
        let summary = evaluate_balance(&[line("", "100"), line("", "")]);
        assert!(!summary.is_balanced);
    }

    #[test]
    fn test_new_draft_has_two_empty_lines() {
        let draft = JournalDraft::new(date(), "");
        assert_eq!(draft.lines().len(), MIN_LINES);
        assert!(draft.lines().iter().all(|l| *l == JournalLine::default()));
    }

    #[test]
    fn test_remove_line_keeps_two() {
        let mut draft = JournalDraft::new(date(), "");
        assert!(!draft.remove_line(0));
        assert_eq!(draft.lines().len(), 2);

        draft.add_line(line("1", ""));
        assert!(draft.remove_line(2));
        assert_eq!(draft.lines().len(), 2);
        assert!(!draft.remove_line(1));
        assert_eq!(draft.lines().len(), 2);
    }

    #[test]
    fn test_remove_line_out_of_range() {
        let mut draft = JournalDraft::new(date(), "");
        draft.add_line(line("1", ""));
        assert!(!draft.remove_line(3));
        assert_eq!(draft.lines().len(), 3);
    }

    #[test]
    fn test_add_line_unbounded() {
        let mut draft = JournalDraft::new(date(), "");
        for i in 0..50 {
            assert_eq!(draft.add_line(JournalLine::default()), i + 2);
        }
        assert_eq!(draft.lines().len(), 52);
    }

    #[test]
    fn test_set_line_touches_one_line() {
        let mut draft = JournalDraft::new(date(), "");
        draft.set_line(0, LineField::Account, "acc-a").unwrap();
        draft.set_line(1, LineField::Credit, "10").unwrap();
        let before = draft.lines()[1].clone();

        draft.set_line(0, LineField::Debit, "10").unwrap();
        draft.set_line(0, LineField::Description, "cash").unwrap();

        assert_eq!(draft.lines()[1], before);
        assert_eq!(draft.lines()[0].account_id(), "acc-a");
        assert_eq!(draft.lines()[0].debit_amount().as_str(), "10");
        assert_eq!(draft.lines()[0].description(), "cash");
    }

    #[test]
    fn test_set_line_keeps_text_as_entered() {
        let mut draft = JournalDraft::new(date(), "");
        draft.set_line(0, LineField::Debit, "₹1,000").unwrap();
        assert_eq!(draft.lines()[0].debit_amount().as_str(), "₹1,000");
        assert_eq!(draft.lines()[0].debit().value(), dec!(1000));
    }

    #[test]
    fn test_set_line_missing_index() {
        let mut draft = JournalDraft::new(date(), "");
        let err = draft.set_line(5, LineField::Debit, "1").unwrap_err();
        assert!(err.to_string().contains("Line 6 does not exist"));
    }

    #[test]
    fn test_can_submit_requires_description() {
        let mut draft = JournalDraft::new(date(), "");
        draft.set_line(0, LineField::Account, "a").unwrap();
        draft.set_line(0, LineField::Debit, "100").unwrap();
        draft.set_line(1, LineField::Account, "b").unwrap();
        draft.set_line(1, LineField::Credit, "100").unwrap();
        assert!(draft.balance().is_balanced);
        assert!(!can_submit(&draft));
        assert_eq!(draft.check(), Err(ValidationError::MissingDescription));

        draft.set_description("   ");
        assert!(!draft.can_submit());
    }

    #[test]
    fn test_can_submit_requires_an_account() {
        let mut draft = JournalDraft::new(date(), "Adjustment");
        draft.set_line(0, LineField::Debit, "100").unwrap();
        draft.set_line(1, LineField::Credit, "100").unwrap();
        assert!(!can_submit(&draft));
        assert_eq!(draft.check(), Err(ValidationError::NoAccount));

        draft.set_line(1, LineField::Account, "  ").unwrap();
        assert!(!can_submit(&draft));
    }

    #[test]
    fn test_check_reports_imbalance() {
        let mut draft = JournalDraft::new(date(), "Adjustment");
        draft.set_line(0, LineField::Debit, "100").unwrap();
        draft.set_line(1, LineField::Credit, "60").unwrap();
        match draft.check() {
            Err(ValidationError::Unbalanced { difference, .. }) => {
                assert_eq!(difference.value(), dec!(40))
            }
            other => panic!("expected Unbalanced, got {other:?}"),
        }
        let message = draft.check().unwrap_err().to_string();
        assert!(message.contains("out of balance by ₹40.00"), "{message}");
    }

    #[test]
    fn test_check_reports_no_activity() {
        let draft = JournalDraft::new(date(), "Nothing");
        assert_eq!(draft.check(), Err(ValidationError::NoActivity));
        assert!(draft.to_request().is_err());
    }

    #[test]
    fn test_opening_balance_request_body() {
        let mut draft = JournalDraft::new(date(), "Opening balance");
        draft.set_line(0, LineField::Account, "A").unwrap();
        draft.set_line(0, LineField::Debit, "5000").unwrap();
        draft.set_line(1, LineField::Account, "B").unwrap();
        draft.set_line(1, LineField::Credit, "5000").unwrap();
        assert!(can_submit(&draft));

        let body = serde_json::to_value(draft.to_request().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "entry_date": "2025-04-01",
                "description": "Opening balance",
                "entry_type": "JOURNAL",
                "lines": [
                    {"account_id": "A", "description": "", "debit_amount": 5000, "credit_amount": 0},
                    {"account_id": "B", "description": "", "debit_amount": 0, "credit_amount": 5000}
                ]
            })
        );
    }

    #[test]
    fn test_request_skips_lines_without_account() {
        let mut draft = JournalDraft::new(date(), "Parts purchase");
        draft.set_line(0, LineField::Account, " inv-parts ").unwrap();
        draft.set_line(0, LineField::Debit, "1200.50").unwrap();
        draft.set_line(1, LineField::Account, "bank").unwrap();
        draft.set_line(1, LineField::Credit, "1200.50").unwrap();
        draft.add_line(JournalLine::new("", "note only", "", ""));

        let request = draft.to_request().unwrap();
        assert_eq!(request.lines.len(), 2);
        assert_eq!(request.lines[0].account_id, "inv-parts");
        assert_eq!(request.lines[0].debit_amount.value(), dec!(1200.50));
        assert!(request.balance().is_balanced);
    }

    #[test]
    fn test_draft_serde_keeps_entered_text() {
        let mut draft = JournalDraft::new(date(), "x");
        draft.set_line(0, LineField::Debit, "1,000").unwrap();
        let json = serde_json::to_string(&draft).unwrap();
        let back: JournalDraft = serde_json::from_str(&json).unwrap();
        assert_eq!(draft, back);
        assert!(json.contains("\"debit_amount\":\"1,000\""));
    }
}
