//! Journal drafts stored as one JSON file per draft in `$BATTWHEELS_HOME/drafts`.

use crate::model::JournalDraft;
use crate::{utils, Result};
use anyhow::{bail, Context};
use std::path::PathBuf;
use tracing::{debug, trace};
use uuid::Uuid;

const EXTENSION: &str = "json";

/// Reads and writes `JournalDraft` files.
#[derive(Debug, Clone)]
pub struct DraftStore {
    dir: PathBuf,
}

impl DraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.{EXTENSION}"))
    }

    /// Writes `draft`, replacing any earlier version of it.
    pub async fn save(&self, draft: &JournalDraft) -> Result<PathBuf> {
        let path = self.path(draft.id());
        utils::serialize(&path, draft).await?;
        debug!("Saved draft {} to {}", draft.id(), path.display());
        Ok(path)
    }

    pub async fn load(&self, id: Uuid) -> Result<JournalDraft> {
        let path = self.path(id);
        if !path.is_file() {
            bail!("Draft {id} does not exist");
        }
        utils::deserialize(&path).await
    }

    /// All drafts, oldest first.
    pub async fn list(&self) -> Result<Vec<JournalDraft>> {
        let mut drafts = Vec::new();
        for id in self.ids().await? {
            drafts.push(self.load(id).await?);
        }
        drafts.sort_by_key(|d| (d.created_at(), d.id()));
        Ok(drafts)
    }

    /// Finds the one draft whose id starts with `prefix` (case-insensitive, dashes optional).
    pub async fn resolve(&self, prefix: &str) -> Result<JournalDraft> {
        let wanted = normalize(prefix);
        if wanted.is_empty() {
            bail!("A draft id is required");
        }
        let matches: Vec<Uuid> = self
            .ids()
            .await?
            .into_iter()
            .filter(|id| normalize(&id.to_string()).starts_with(&wanted))
            .collect();
        match matches.as_slice() {
            [] => bail!("No draft matches '{prefix}'"),
            [id] => self.load(*id).await,
            many => bail!(
                "'{prefix}' matches {} drafts, use more characters of the id",
                many.len()
            ),
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        utils::remove(self.path(id)).await?;
        debug!("Deleted draft {id}");
        Ok(())
    }

    async fn ids(&self) -> Result<Vec<Uuid>> {
        let mut ids = Vec::new();
        let mut dir = utils::read_dir(&self.dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            match path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok())
            {
                Some(id) => ids.push(id),
                None => trace!("Skipping {}", path.display()),
            }
        }
        Ok(ids)
    }
}

fn normalize(id: &str) -> String {
    id.trim().replace('-', "").to_ascii_lowercase()
}
