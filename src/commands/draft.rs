//! Handlers for `battwheels draft ...`. Drafts never leave the machine until they are posted.

use crate::args::LineArgs;
use crate::commands::Out;
use crate::display::{format_draft, format_draft_list};
use crate::error::{ErrorType, IntoResult};
use crate::model::{EnteredAmount, JournalDraft, JournalLine, LineField, MIN_LINES};
use crate::{Config, Result};
use anyhow::anyhow;
use chrono::{Local, NaiveDate};

/// Starts a draft with two empty lines, dated `date` or today.
pub async fn draft_new(
    config: &Config,
    description: Option<&str>,
    date: Option<NaiveDate>,
) -> Result<Out<JournalDraft>> {
    let entry_date = date.unwrap_or_else(|| Local::now().date_naive());
    let draft = JournalDraft::new(entry_date, description.unwrap_or_default());
    save(config, &draft).await?;
    let display = format_draft(&draft);
    Ok(Out::new(format!("Created draft {}", draft.id()), draft).with_display(display))
}

pub async fn draft_list(config: &Config) -> Result<Out<Vec<JournalDraft>>> {
    let drafts = config
        .drafts()
        .list()
        .await
        .pub_result(ErrorType::Storage)?;
    let display = format_draft_list(&drafts);
    Ok(Out::new(format!("Found {} drafts", drafts.len()), drafts).with_display(display))
}

pub async fn draft_show(config: &Config, draft: &str) -> Result<Out<JournalDraft>> {
    let draft = resolve(config, draft).await?;
    let display = format_draft(&draft);
    let message = match draft.check() {
        Ok(()) => "The draft is ready to post".to_string(),
        Err(e) => format!("The draft cannot be posted yet: {e}"),
    };
    Ok(Out::new(message, draft).with_display(display))
}

/// Changes the description and/or the entry date.
pub async fn draft_edit(
    config: &Config,
    draft: &str,
    description: Option<&str>,
    date: Option<NaiveDate>,
) -> Result<Out<JournalDraft>> {
    if description.is_none() && date.is_none() {
        return Err(anyhow!("Nothing to change, pass --description or --date"))
            .pub_result(ErrorType::Validation);
    }
    let mut draft = resolve(config, draft).await?;
    if let Some(description) = description {
        draft.set_description(description);
    }
    if let Some(date) = date {
        draft.set_entry_date(date);
    }
    save(config, &draft).await?;
    let display = format_draft(&draft);
    Ok(Out::new(format!("Updated draft {}", draft.id()), draft).with_display(display))
}

/// Appends a line built from `line`; missing fields are empty.
pub async fn draft_add_line(
    config: &Config,
    draft: &str,
    line: &LineArgs,
) -> Result<Out<JournalDraft>> {
    let amount = |text: &Option<String>| {
        EnteredAmount::try_new(text.clone().unwrap_or_default()).pub_result(ErrorType::Validation)
    };
    let (debit, credit) = (amount(&line.debit)?, amount(&line.credit)?);
    let mut draft = resolve(config, draft).await?;
    let index = draft.add_line(JournalLine::new(
        line.account.clone().unwrap_or_default(),
        line.description.clone().unwrap_or_default(),
        debit,
        credit,
    ));
    save(config, &draft).await?;
    let display = format_draft(&draft);
    Ok(Out::new(format!("Added line {}", index + 1), draft).with_display(display))
}

/// Sets the given fields of line `line_number` (starting at 1). Other lines are untouched.
pub async fn draft_set_line(
    config: &Config,
    draft: &str,
    line_number: usize,
    line: &LineArgs,
) -> Result<Out<JournalDraft>> {
    if line.is_empty() {
        return Err(anyhow!(
            "Nothing to change, pass --account, --description, --debit or --credit"
        ))
        .pub_result(ErrorType::Validation);
    }
    let index = to_index(line_number)?;
    let mut draft = resolve(config, draft).await?;
    let updates = [
        (LineField::Account, &line.account),
        (LineField::Description, &line.description),
        (LineField::Debit, &line.debit),
        (LineField::Credit, &line.credit),
    ];
    for (field, value) in updates {
        if let Some(value) = value {
            draft
                .set_line(index, field, value.as_str())
                .pub_result(ErrorType::Validation)?;
        }
    }
    save(config, &draft).await?;
    let display = format_draft(&draft);
    Ok(Out::new(format!("Updated line {line_number}"), draft).with_display(display))
}

/// Removes line `line_number` (starting at 1) unless that would leave fewer than two lines.
pub async fn draft_remove_line(
    config: &Config,
    draft: &str,
    line_number: usize,
) -> Result<Out<JournalDraft>> {
    let index = to_index(line_number)?;
    let mut draft = resolve(config, draft).await?;
    if !draft.remove_line(index) {
        let reason = if index >= draft.lines().len() {
            format!("the draft has {} lines", draft.lines().len())
        } else {
            format!("a draft needs at least {MIN_LINES} lines")
        };
        return Err(anyhow!("Line {line_number} was not removed, {reason}"))
            .pub_result(ErrorType::Validation);
    }
    save(config, &draft).await?;
    let display = format_draft(&draft);
    Ok(Out::new(format!("Removed line {line_number}"), draft).with_display(display))
}

pub async fn draft_discard(config: &Config, draft: &str) -> Result<Out<()>> {
    let draft = resolve(config, draft).await?;
    config
        .drafts()
        .delete(draft.id())
        .await
        .pub_result(ErrorType::Storage)?;
    Ok(format!("Discarded draft {}", draft.id()).into())
}

pub(super) async fn resolve(config: &Config, draft: &str) -> Result<JournalDraft> {
    config
        .drafts()
        .resolve(draft)
        .await
        .pub_result(ErrorType::Storage)
}

async fn save(config: &Config, draft: &JournalDraft) -> Result<()> {
    config
        .drafts()
        .save(draft)
        .await
        .pub_result(ErrorType::Storage)?;
    Ok(())
}

fn to_index(line_number: usize) -> Result<usize> {
    line_number
        .checked_sub(1)
        .ok_or_else(|| anyhow!("Line numbers start at 1"))
        .pub_result(ErrorType::Validation)
}
