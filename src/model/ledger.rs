//! Per-account ledger reports as returned by the backend.

use crate::model::Amount;
use crate::utils::null_as_default;
use anyhow::anyhow;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The side on which an account normally carries its balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Debit,
    Credit,
}

serde_plain::derive_display_from_serialize!(Side);

/// The classification of a ledger account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

impl AccountType {
    pub const ALL: [AccountType; 5] = [
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Equity,
        AccountType::Income,
        AccountType::Expense,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AccountType::Asset => "Asset",
            AccountType::Liability => "Liability",
            AccountType::Equity => "Equity",
            AccountType::Income => "Income",
            AccountType::Expense => "Expense",
        }
    }

    pub fn normal_side(&self) -> Side {
        match self {
            AccountType::Asset | AccountType::Expense => Side::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Income => Side::Credit,
        }
    }
}

impl Display for AccountType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AccountType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asset" | "assets" => Ok(AccountType::Asset),
            "liability" | "liabilities" => Ok(AccountType::Liability),
            "equity" => Ok(AccountType::Equity),
            "income" | "revenue" => Ok(AccountType::Income),
            "expense" | "expenses" => Ok(AccountType::Expense),
            _ => Err(anyhow!("Unknown account type '{s}'")),
        }
    }
}

impl Serialize for AccountType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for AccountType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AccountType::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Optional date bounds for ledger and export requests. Both ends are inclusive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }

    /// True if `date` falls before the start of the range.
    pub fn is_before(&self, date: NaiveDate) -> bool {
        self.start.is_some_and(|start| date < start)
    }

    /// The start formatted as `YYYY-MM-DD`, or an empty string when unbounded.
    pub fn start_param(&self) -> String {
        self.start.map(|d| d.to_string()).unwrap_or_default()
    }

    /// The end formatted as `YYYY-MM-DD`, or an empty string when unbounded.
    pub fn end_param(&self) -> String {
        self.end.map(|d| d.to_string()).unwrap_or_default()
    }
}

/// One posted journal line affecting the account, as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    #[serde(default, deserialize_with = "null_as_default")]
    pub entry_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reference_number: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub line_description: String,
    #[serde(default)]
    pub debit_amount: Amount,
    #[serde(default)]
    pub credit_amount: Amount,
    #[serde(default)]
    pub running_balance: Amount,
}

/// Response of `GET /api/journal-entries/accounts/{account_id}/ledger`.
///
/// All figures are displayed exactly as received; the backend owns the sign convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLedger {
    #[serde(default, deserialize_with = "null_as_default")]
    pub account_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub account_name: String,
    pub account_type: AccountType,
    #[serde(default)]
    pub opening_balance: Amount,
    #[serde(default)]
    pub entries: Vec<LedgerRow>,
    #[serde(default)]
    pub total_debit: Amount,
    #[serde(default)]
    pub total_credit: Amount,
    #[serde(default)]
    pub closing_balance: Amount,
}

/// Folds `(debit, credit)` pairs into running balances starting from `opening`:
/// `running[i] = running[i - 1] + debit[i] - credit[i]`.
pub fn fold_running_balance<I>(opening: Amount, movements: I) -> Vec<Amount>
where
    I: IntoIterator<Item = (Amount, Amount)>,
{
    movements
        .into_iter()
        .scan(opening, |balance, (debit, credit)| {
            *balance = *balance + debit - credit;
            Some(*balance)
        })
        .collect()
}
