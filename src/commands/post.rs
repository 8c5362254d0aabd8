//! Handles `battwheels post`: validate, send, back up, and forget the draft.

use crate::api::{self, CreatedEntry, Mode};
use crate::backup::POSTED;
use crate::commands::draft::resolve;
use crate::commands::Out;
use crate::display::format_balance;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What `post` reports back.
#[derive(Debug, Clone, Serialize)]
pub struct Posted {
    pub draft_id: Uuid,
    #[serde(flatten)]
    pub created: CreatedEntry,
    /// Where the request body was copied, if that worked.
    pub backup: Option<PathBuf>,
}

/// Posts the draft identified by `draft` as a journal entry.
///
/// Nothing is sent unless the draft balances, has a description and has at least one line with
/// an account. Once the backend accepts the entry the draft is deleted and the request body is
/// written to the backups directory. Neither failing turns the post into an error, since the
/// backend already owns the entry. If the backend rejects it, the draft is left as it was.
pub async fn post(config: &Config, mode: Mode, draft: &str) -> Result<Out<Posted>> {
    let draft = resolve(config, draft).await?;
    let request = draft
        .to_request()
        .with_context(|| format!("Draft {} cannot be posted", draft.id()))
        .pub_result(ErrorType::Validation)?;

    let ctx = config
        .request_context()
        .await
        .pub_result(ErrorType::Config)?;
    let mut backend = api::backend(config, mode)
        .await
        .pub_result(ErrorType::Config)?;
    debug!("Posting draft {} with {} lines", draft.id(), request.lines.len());
    let created = backend
        .create_journal_entry(&ctx, &request)
        .await
        .context("The journal entry was not accepted")
        .pub_result(ErrorType::Request)?;

    match config.drafts().delete(draft.id()).await {
        Ok(()) => info!("Removed draft {} after posting", draft.id()),
        Err(e) => warn!(
            "Draft {} was posted but could not be removed, discard it before posting again: {e:#}",
            draft.id()
        ),
    }
    let backup = match config.backup().save_json(POSTED, &request).await {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("Unable to back up the posted entry: {e:#}");
            None
        }
    };

    let message = match &created.reference_number {
        Some(reference) => format!("Posted journal entry {reference}"),
        None => "Posted journal entry".to_string(),
    };
    let display = format_balance(&request.balance());
    Ok(Out::new(
        message,
        Posted {
            draft_id: draft.id(),
            created,
            backup,
        },
    )
    .with_display(display))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::args::LineArgs;
    use crate::commands::{draft_new, draft_set_line};
    use crate::model::ValidationError;
    use crate::test::TestEnv;
    use crate::PubError;

    fn line(account: &str, debit: Option<&str>, credit: Option<&str>) -> LineArgs {
        LineArgs {
            account: Some(account.to_string()),
            description: None,
            debit: debit.map(str::to_string),
            credit: credit.map(str::to_string),
        }
    }

    async fn draft(config: &Config, debit: &str, credit: &str) -> String {
        let out = draft_new(config, Some("Workshop float"), None).await.unwrap();
        let id = out.structure().unwrap().id().to_string();
        draft_set_line(config, &id, 1, &line("acc-cash", Some(debit), None))
            .await
            .unwrap();
        draft_set_line(config, &id, 2, &line("acc-capital", None, Some(credit)))
            .await
            .unwrap();
        id
    }

    fn inner(err: &anyhow::Error) -> &anyhow::Error {
        err.downcast_ref::<PubError>().unwrap().inner()
    }

    fn backups(config: &Config) -> Vec<String> {
        std::fs::read_dir(config.backups())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with("posted."))
            .collect()
    }

    #[tokio::test]
    async fn test_post_deletes_draft_and_writes_one_backup() {
        let env = TestEnv::new().await;
        let config = env.config();
        let id = draft(&config, "₹5,000.00", "5000").await;

        let out = post(&config, Mode::Testing, &id).await.unwrap();
        let posted = out.structure().unwrap();
        assert_eq!(posted.created.reference_number.as_deref(), Some("JE-00001"));
        assert_eq!(out.message(), "Posted journal entry JE-00001");

        assert!(config.drafts().list().await.unwrap().is_empty());
        let names = backups(&config);
        assert_eq!(names.len(), 1);
        let backup = posted.backup.as_ref().unwrap();
        let body: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(backup).unwrap()).unwrap();
        assert_eq!(body["entry_type"], "JOURNAL");
        assert_eq!(body["lines"][0]["debit_amount"], 5000);

        let backend = env.backend().await;
        assert_eq!(backend.state().entries.len(), 1);
    }

    #[tokio::test]
    async fn test_post_succeeds_when_backup_fails() {
        let env = TestEnv::new().await;
        let config = env.config();
        let id = draft(&config, "750", "750").await;
        std::fs::remove_dir_all(config.backups()).unwrap();
        std::fs::write(config.backups(), "not a directory").unwrap();

        let out = post(&config, Mode::Testing, &id).await.unwrap();
        let posted = out.structure().unwrap();
        assert_eq!(posted.created.reference_number.as_deref(), Some("JE-00001"));
        assert!(posted.backup.is_none());
        assert!(config.drafts().list().await.unwrap().is_empty());

        // The draft is gone, so posting it again cannot create a second entry.
        assert!(post(&config, Mode::Testing, &id).await.is_err());
        assert_eq!(env.backend().await.state().entries.len(), 1);
    }

    #[tokio::test]
    async fn test_post_unbalanced_sends_nothing() {
        let env = TestEnv::new().await;
        let config = env.config();
        let id = draft(&config, "100", "99.98").await;

        let err = post(&config, Mode::Testing, &id).await.unwrap_err();
        assert_eq!(crate::error_type(&err), Some(ErrorType::Validation));
        assert!(matches!(
            inner(&err).downcast_ref::<ValidationError>(),
            Some(ValidationError::Unbalanced { .. })
        ));

        assert_eq!(config.drafts().list().await.unwrap().len(), 1);
        assert!(backups(&config).is_empty());
        assert!(!config.test_backend_path().exists());
    }

    #[tokio::test]
    async fn test_post_rejected_keeps_draft() {
        let env = TestEnv::new().await;
        let config = env.config();
        let out = draft_new(&config, Some("Unknown account"), None).await.unwrap();
        let id = out.structure().unwrap().id().to_string();
        draft_set_line(&config, &id, 1, &line("acc-nope", Some("10"), None))
            .await
            .unwrap();
        draft_set_line(&config, &id, 2, &line("acc-cash", None, Some("10")))
            .await
            .unwrap();

        let err = post(&config, Mode::Testing, &id).await.unwrap_err();
        assert_eq!(crate::error_type(&err), Some(ErrorType::Request));
        assert!(matches!(
            inner(&err).downcast_ref::<ApiError>(),
            Some(ApiError::Rejected { .. })
        ));
        assert_eq!(config.drafts().list().await.unwrap().len(), 1);
        assert!(backups(&config).is_empty());
    }
}
