//! Implements the `Backend` trait in memory for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without a Battwheels OS server. When a path is given, the state is written
//! back after every post so that consecutive CLI invocations see each other's entries.

use crate::api::{ApiError, Backend, CreatedEntry, ExportFormat, RequestContext};
use crate::model::{
    fold_running_balance, AccountLedger, AccountType, Amount, CreateJournalEntry, DateRange,
    LedgerRow, MIN_LINES,
};
use crate::{utils, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

/// An account in the seeded chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TestAccount {
    pub(crate) id: String,
    pub(crate) code: String,
    pub(crate) name: String,
    pub(crate) account_type: AccountType,
}

/// An entry accepted by the test backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PostedEntry {
    pub(crate) entry_id: String,
    pub(crate) reference_number: String,
    pub(crate) entry: CreateJournalEntry,
}

/// Everything the test backend knows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TestBackendState {
    pub(crate) accounts: Vec<TestAccount>,
    pub(crate) entries: Vec<PostedEntry>,
}

impl Default for TestBackendState {
    fn default() -> Self {
        Self {
            accounts: seed_accounts(),
            entries: Vec::new(),
        }
    }
}

/// An implementation of the `Backend` trait that does not use a server.
pub(crate) struct TestBackend {
    state: TestBackendState,
    path: Option<PathBuf>,
}

impl TestBackend {
    /// A backend that keeps its state only in memory.
    pub(crate) fn new(state: TestBackendState) -> Self {
        Self { state, path: None }
    }

    /// Loads the state stored at `path`, or starts from the seed data if there is none yet.
    pub(crate) async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.is_file() {
            utils::deserialize(&path)
                .await
                .context("Unable to load the test backend state")?
        } else {
            TestBackendState::default()
        };
        debug!("Test backend state at {}", path.display());
        let mut backend = Self::new(state);
        backend.path = Some(path);
        Ok(backend)
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &TestBackendState {
        &self.state
    }

    async fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => utils::serialize(path, &self.state).await,
            None => Ok(()),
        }
    }

    fn account(&self, id: &str) -> Option<&TestAccount> {
        self.state.accounts.iter().find(|a| a.id == id)
    }

    /// The same rules the server applies before accepting an entry.
    fn validate(&self, entry: &CreateJournalEntry) -> std::result::Result<(), ApiError> {
        if entry.description.trim().is_empty() {
            return Err(reject("Description is required"));
        }
        if entry.lines.len() < MIN_LINES {
            return Err(reject(format!(
                "A journal entry needs at least {MIN_LINES} lines"
            )));
        }
        for line in &entry.lines {
            if self.account(&line.account_id).is_none() {
                return Err(reject(format!(
                    "Account '{}' does not exist",
                    line.account_id
                )));
            }
            if line.debit_amount.is_negative() || line.credit_amount.is_negative() {
                return Err(reject("Amounts cannot be negative"));
            }
        }
        let balance = entry.balance();
        if !balance.is_balanced {
            return Err(reject(format!(
                "Total debits ({}) must equal total credits ({})",
                balance.total_debit, balance.total_credit
            )));
        }
        Ok(())
    }

    /// Posted entries within `range`, ordered by entry date then reference number.
    fn posted_in(&self, range: &DateRange) -> Vec<&PostedEntry> {
        let mut entries: Vec<&PostedEntry> = self
            .state
            .entries
            .iter()
            .filter(|e| range.contains(e.entry.entry_date))
            .collect();
        entries.sort_by(|a, b| {
            (a.entry.entry_date, &a.reference_number).cmp(&(b.entry.entry_date, &b.reference_number))
        });
        entries
    }

    fn ledger(&self, account: &TestAccount, range: &DateRange) -> AccountLedger {
        let opening_balance: Amount = self
            .state
            .entries
            .iter()
            .filter(|e| range.is_before(e.entry.entry_date))
            .flat_map(|e| e.entry.lines.iter())
            .filter(|l| l.account_id == account.id)
            .map(|l| l.debit_amount - l.credit_amount)
            .sum();

        let mut entries: Vec<LedgerRow> = Vec::new();
        for posted in self.posted_in(range) {
            for line in posted.entry.lines.iter().filter(|l| l.account_id == account.id) {
                entries.push(LedgerRow {
                    entry_date: posted.entry.entry_date.to_string(),
                    reference_number: posted.reference_number.clone(),
                    description: posted.entry.description.clone(),
                    line_description: line.description.clone(),
                    debit_amount: line.debit_amount,
                    credit_amount: line.credit_amount,
                    running_balance: Amount::ZERO,
                });
            }
        }

        let running = fold_running_balance(
            opening_balance,
            entries.iter().map(|r| (r.debit_amount, r.credit_amount)),
        );
        for (row, balance) in entries.iter_mut().zip(running.iter()) {
            row.running_balance = *balance;
        }

        AccountLedger {
            account_code: account.code.clone(),
            account_name: account.name.clone(),
            account_type: account.account_type,
            opening_balance,
            total_debit: entries.iter().map(|r| r.debit_amount).sum(),
            total_credit: entries.iter().map(|r| r.credit_amount).sum(),
            closing_balance: running.last().copied().unwrap_or(opening_balance),
            entries,
        }
    }

    fn export_csv(&self, range: &DateRange) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;
        for posted in self.posted_in(range) {
            for line in &posted.entry.lines {
                let (code, name) = self.account_labels(&line.account_id);
                writer.write_record([
                    posted.entry.entry_date.to_string(),
                    posted.reference_number.clone(),
                    posted.entry.description.clone(),
                    code,
                    name,
                    line.description.clone(),
                    plain(line.debit_amount),
                    plain(line.credit_amount),
                ])?;
            }
        }
        writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Unable to finish the CSV export: {e}"))
    }

    fn export_tally(&self, range: &DateRange) -> Vec<u8> {
        let mut xml = String::from(
            "<ENVELOPE>\n <HEADER>\n  <TALLYREQUEST>Import Data</TALLYREQUEST>\n </HEADER>\n \
            <BODY>\n  <IMPORTDATA>\n   <REQUESTDESC>\n    <REPORTNAME>Vouchers</REPORTNAME>\n   \
            </REQUESTDESC>\n   <REQUESTDATA>\n",
        );
        for posted in self.posted_in(range) {
            xml.push_str("    <TALLYMESSAGE xmlns:UDF=\"TallyUDF\">\n");
            xml.push_str("     <VOUCHER VCHTYPE=\"Journal\" ACTION=\"Create\">\n");
            xml.push_str(&format!(
                "      <DATE>{}</DATE>\n",
                posted.entry.entry_date.format("%Y%m%d")
            ));
            xml.push_str("      <VOUCHERTYPENAME>Journal</VOUCHERTYPENAME>\n");
            xml.push_str(&format!(
                "      <VOUCHERNUMBER>{}</VOUCHERNUMBER>\n",
                escape_xml(&posted.reference_number)
            ));
            xml.push_str(&format!(
                "      <NARRATION>{}</NARRATION>\n",
                escape_xml(&posted.entry.description)
            ));
            for line in &posted.entry.lines {
                let (_, name) = self.account_labels(&line.account_id);
                // Tally records debits as negative amounts that are "deemed positive"
                let (deemed_positive, amount) = if line.debit_amount.is_zero() {
                    ("No", line.credit_amount)
                } else {
                    ("Yes", -(line.debit_amount - line.credit_amount))
                };
                xml.push_str("      <ALLLEDGERENTRIES.LIST>\n");
                xml.push_str(&format!(
                    "       <LEDGERNAME>{}</LEDGERNAME>\n",
                    escape_xml(&name)
                ));
                xml.push_str(&format!(
                    "       <ISDEEMEDPOSITIVE>{deemed_positive}</ISDEEMEDPOSITIVE>\n"
                ));
                xml.push_str(&format!("       <AMOUNT>{}</AMOUNT>\n", plain(amount)));
                xml.push_str("      </ALLLEDGERENTRIES.LIST>\n");
            }
            xml.push_str("     </VOUCHER>\n    </TALLYMESSAGE>\n");
        }
        xml.push_str("   </REQUESTDATA>\n  </IMPORTDATA>\n </BODY>\n</ENVELOPE>\n");
        xml.into_bytes()
    }

    fn account_labels(&self, account_id: &str) -> (String, String) {
        match self.account(account_id) {
            Some(a) => (a.code.clone(), a.name.clone()),
            None => (String::new(), account_id.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl Backend for TestBackend {
    async fn create_journal_entry(
        &mut self,
        _ctx: &RequestContext,
        entry: &CreateJournalEntry,
    ) -> Result<CreatedEntry> {
        self.validate(entry)?;
        let reference_number = format!("JE-{:05}", self.state.entries.len() + 1);
        let entry_id = Uuid::new_v4().to_string();
        self.state.entries.push(PostedEntry {
            entry_id: entry_id.clone(),
            reference_number: reference_number.clone(),
            entry: entry.clone(),
        });
        self.save().await?;
        debug!("Test backend accepted {reference_number}");
        Ok(CreatedEntry {
            entry_id: Some(entry_id),
            reference_number: Some(reference_number),
        })
    }

    async fn account_ledger(
        &mut self,
        _ctx: &RequestContext,
        account_id: &str,
        range: &DateRange,
    ) -> Result<AccountLedger> {
        let account = self.account(account_id).ok_or_else(|| ApiError::Status {
            status: 404,
            message: format!("Account '{account_id}' not found"),
        })?;
        Ok(self.ledger(account, range))
    }

    async fn export(
        &mut self,
        _ctx: &RequestContext,
        format: ExportFormat,
        range: &DateRange,
    ) -> Result<Vec<u8>> {
        match format {
            ExportFormat::Csv => self.export_csv(range),
            ExportFormat::Tally => Ok(self.export_tally(range)),
        }
    }
}

const CSV_HEADER: [&str; 8] = [
    "Date",
    "Reference",
    "Description",
    "Account Code",
    "Account Name",
    "Line Description",
    "Debit",
    "Credit",
];

fn reject(message: impl Into<String>) -> ApiError {
    ApiError::Rejected {
        code: Some(1),
        message: message.into(),
    }
}

/// Two decimal places, no grouping or symbol.
fn plain(amount: Amount) -> String {
    format!("{:.2}", amount.value())
}

fn escape_xml(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// The seeded chart of accounts of an EV service workshop.
fn seed_accounts() -> Vec<TestAccount> {
    [
        ("acc-cash", "1100", "Cash in Hand", AccountType::Asset),
        ("acc-bank", "1200", "HDFC Current Account", AccountType::Asset),
        ("acc-receivables", "1300", "Accounts Receivable", AccountType::Asset),
        ("acc-inventory", "1400", "Spare Parts Inventory", AccountType::Asset),
        ("acc-capital", "3100", "Owner's Capital", AccountType::Equity),
        ("acc-service-revenue", "4100", "Service Revenue", AccountType::Income),
        ("acc-parts-expense", "5100", "Parts Consumed", AccountType::Expense),
    ]
    .into_iter()
    .map(|(id, code, name, account_type)| TestAccount {
        id: id.to_string(),
        code: code.to_string(),
        name: name.to_string(),
        account_type,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CreateJournalLine;
    use crate::model::EntryType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn ctx() -> RequestContext {
        RequestContext::new("test-token", "org-test").unwrap()
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    fn line(account: &str, debit: rust_decimal::Decimal, credit: rust_decimal::Decimal) -> CreateJournalLine {
        CreateJournalLine {
            account_id: account.to_string(),
            description: String::new(),
            debit_amount: Amount::new(debit),
            credit_amount: Amount::new(credit),
        }
    }

    fn entry(on: NaiveDate, description: &str, lines: Vec<CreateJournalLine>) -> CreateJournalEntry {
        CreateJournalEntry {
            entry_date: on,
            description: description.to_string(),
            entry_type: EntryType::Journal,
            lines,
        }
    }

    async fn seeded() -> TestBackend {
        let mut backend = TestBackend::new(TestBackendState::default());
        let entries = [
            entry(
                date(3, 31),
                "Capital introduced",
                vec![line("acc-cash", dec!(10000), dec!(0)), line("acc-capital", dec!(0), dec!(10000))],
            ),
            entry(
                date(4, 2),
                "Battery swap service",
                vec![
                    line("acc-cash", dec!(2500), dec!(0)),
                    line("acc-service-revenue", dec!(0), dec!(2500)),
                ],
            ),
            entry(
                date(4, 5),
                "Parts bought for cash",
                vec![
                    line("acc-parts-expense", dec!(1200.50), dec!(0)),
                    line("acc-cash", dec!(0), dec!(1200.50)),
                ],
            ),
        ];
        for e in &entries {
            backend.create_journal_entry(&ctx(), e).await.unwrap();
        }
        backend
    }

    #[tokio::test]
    async fn test_create_assigns_reference_numbers() {
        let backend = seeded().await;
        let refs: Vec<&str> = backend
            .state()
            .entries
            .iter()
            .map(|e| e.reference_number.as_str())
            .collect();
        assert_eq!(refs, vec!["JE-00001", "JE-00002", "JE-00003"]);
    }

    #[tokio::test]
    async fn test_create_rejects_unbalanced() {
        let mut backend = TestBackend::new(TestBackendState::default());
        let e = entry(
            date(4, 1),
            "Off by one",
            vec![line("acc-cash", dec!(100), dec!(0)), line("acc-capital", dec!(0), dec!(99))],
        );
        let err = backend.create_journal_entry(&ctx(), &e).await.unwrap_err();
        match err.downcast_ref::<ApiError>().unwrap() {
            ApiError::Rejected { code, .. } => assert_eq!(*code, Some(1)),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(backend.state().entries.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_account_and_short_entries() {
        let mut backend = TestBackend::new(TestBackendState::default());
        let unknown = entry(
            date(4, 1),
            "Mystery",
            vec![line("acc-nope", dec!(5), dec!(0)), line("acc-cash", dec!(0), dec!(5))],
        );
        let err = backend
            .create_journal_entry(&ctx(), &unknown)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("acc-nope"));

        let short = entry(date(4, 1), "One line", vec![line("acc-cash", dec!(0), dec!(0))]);
        assert!(backend.create_journal_entry(&ctx(), &short).await.is_err());
    }

    #[tokio::test]
    async fn test_ledger_running_balance_matches_fold() {
        let mut backend = seeded().await;
        let range = DateRange::new(Some(date(4, 1)), Some(date(4, 30)));
        let ledger = backend
            .account_ledger(&ctx(), "acc-cash", &range)
            .await
            .unwrap();

        assert_eq!(ledger.account_name, "Cash in Hand");
        assert_eq!(ledger.opening_balance.value(), dec!(10000));
        assert_eq!(ledger.entries.len(), 2);

        let expected = fold_running_balance(
            ledger.opening_balance,
            ledger
                .entries
                .iter()
                .map(|r| (r.debit_amount, r.credit_amount)),
        );
        let actual: Vec<Amount> = ledger.entries.iter().map(|r| r.running_balance).collect();
        assert_eq!(actual, expected);
        assert_eq!(ledger.closing_balance.value(), dec!(11299.50));
        assert_eq!(ledger.total_debit.value(), dec!(2500));
        assert_eq!(ledger.total_credit.value(), dec!(1200.50));
    }

    #[tokio::test]
    async fn test_ledger_unknown_account() {
        let mut backend = seeded().await;
        let err = backend
            .account_ledger(&ctx(), "acc-nope", &DateRange::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ApiError>().unwrap(),
            ApiError::Status { status: 404, .. }
        ));
    }

    #[tokio::test]
    async fn test_ledger_empty_range_keeps_opening() {
        let mut backend = seeded().await;
        let range = DateRange::new(Some(date(5, 1)), None);
        let ledger = backend
            .account_ledger(&ctx(), "acc-cash", &range)
            .await
            .unwrap();
        assert!(ledger.entries.is_empty());
        assert_eq!(ledger.opening_balance, ledger.closing_balance);
        assert_eq!(ledger.closing_balance.value(), dec!(11299.50));
    }

    #[tokio::test]
    async fn test_export_csv() {
        let mut backend = seeded().await;
        let range = DateRange::new(Some(date(4, 1)), Some(date(4, 3)));
        let bytes = backend
            .export(&ctx(), ExportFormat::Csv, &range)
            .await
            .unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "JE-00002");
        assert_eq!(&rows[0][4], "Cash in Hand");
        assert_eq!(&rows[0][6], "2500.00");
        assert_eq!(&rows[1][7], "2500.00");
    }

    #[tokio::test]
    async fn test_export_tally_escapes() {
        let mut backend = TestBackend::new(TestBackendState::default());
        let e = entry(
            date(4, 9),
            "Tyres & tubes <bulk>",
            vec![
                line("acc-inventory", dec!(800), dec!(0)),
                line("acc-bank", dec!(0), dec!(800)),
            ],
        );
        backend.create_journal_entry(&ctx(), &e).await.unwrap();
        let bytes = backend
            .export(&ctx(), ExportFormat::Tally, &DateRange::default())
            .await
            .unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        assert!(xml.contains("<NARRATION>Tyres &amp; tubes &lt;bulk&gt;</NARRATION>"));
        assert!(xml.contains("<DATE>20250409</DATE>"));
        assert!(xml.contains("<AMOUNT>-800.00</AMOUNT>"));
        assert!(xml.contains("<LEDGERNAME>HDFC Current Account</LEDGERNAME>"));
    }

    #[tokio::test]
    async fn test_state_persists_between_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let mut first = TestBackend::load(&path).await.unwrap();
        let e = entry(
            date(4, 1),
            "Float",
            vec![line("acc-cash", dec!(50), dec!(0)), line("acc-capital", dec!(0), dec!(50))],
        );
        first.create_journal_entry(&ctx(), &e).await.unwrap();

        let second = TestBackend::load(&path).await.unwrap();
        assert_eq!(second.state().entries.len(), 1);
        assert_eq!(second.state().entries[0].entry, e);
    }
}
