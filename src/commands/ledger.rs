use crate::api::{self, Mode};
use crate::commands::Out;
use crate::display::format_ledger;
use crate::error::{ErrorType, IntoResult};
use crate::model::{AccountLedger, DateRange};
use crate::{Config, Result};
use anyhow::{anyhow, Context};

/// Fetches and renders the ledger of `account_id` between the optional `range` bounds.
pub async fn ledger(
    config: &Config,
    mode: Mode,
    account_id: &str,
    range: DateRange,
) -> Result<Out<AccountLedger>> {
    let account_id = account_id.trim();
    if account_id.is_empty() {
        return Err(anyhow!("An account id is required")).pub_result(ErrorType::Validation);
    }
    if let (Some(start), Some(end)) = (range.start, range.end) {
        if start > end {
            return Err(anyhow!("The start date {start} is after the end date {end}"))
                .pub_result(ErrorType::Validation);
        }
    }

    let ctx = config
        .request_context()
        .await
        .pub_result(ErrorType::Config)?;
    let mut backend = api::backend(config, mode)
        .await
        .pub_result(ErrorType::Config)?;
    let ledger = backend
        .account_ledger(&ctx, account_id, &range)
        .await
        .with_context(|| format!("Unable to load the ledger of account '{account_id}'"))
        .pub_result(ErrorType::Request)?;

    let display = format_ledger(&ledger);
    Ok(Out::new(
        format!(
            "Ledger of {} {} with {} entries",
            ledger.account_code,
            ledger.account_name,
            ledger.entries.len()
        ),
        ledger,
    )
    .with_display(display))
}
