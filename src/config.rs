//! Configuration file handling.
//!
//! The configuration file is stored at `$BATTWHEELS_HOME/config.json` and holds the backend URL,
//! the organization to act on and the number of posted-request backups to keep. The access token
//! is kept separately in `$BATTWHEELS_HOME/.secrets/token.json`.

use crate::api::RequestContext;
use crate::backup::Backup;
use crate::drafts::DraftStore;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

const APP_NAME: &str = "battwheels";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 20;
const SECRETS: &str = ".secrets";
const BACKUPS: &str = ".backups";
const DRAFTS: &str = "drafts";
const TOKEN_JSON: &str = "token.json";
const CONFIG_JSON: &str = "config.json";
const TEST_BACKEND_JSON: &str = ".test-backend.json";

/// Overrides the stored access token when set.
pub const TOKEN_ENV: &str = "BATTWHEELS_TOKEN";
/// Overrides the configured organization id when set.
pub const ORG_ID_ENV: &str = "BATTWHEELS_ORG_ID";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$BATTWHEELS_HOME` and from there it loads `$BATTWHEELS_HOME/config.json`. It
/// provides paths to the other items that are expected in a certain location within the home
/// directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    secrets: PathBuf,
    drafts: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    api_url: Url,
}

impl Config {
    /// Creates the home directory, its subdirectories and an initial `config.json`.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of the data directory, e.g.
    ///   `$HOME/battwheels`
    /// - `api_url` - Base URL of the Battwheels OS backend, e.g. `https://api.battwheels.in`
    /// - `organization_id` - The organization every request is made on behalf of
    ///
    /// # Errors
    /// - Returns an error if `api_url` is not an http(s) URL or if any file operation fails.
    pub async fn create(
        dir: impl Into<PathBuf>,
        api_url: &str,
        organization_id: &str,
    ) -> Result<Self> {
        let api_url = parse_api_url(api_url)?;
        if organization_id.trim().is_empty() {
            bail!("The organization id cannot be empty");
        }

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the battwheels home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let backups = root.join(BACKUPS);
        utils::make_dir(&backups).await?;
        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;
        let drafts = root.join(DRAFTS);
        utils::make_dir(&drafts).await?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            api_url: api_url.to_string(),
            organization_id: organization_id.trim().to_string(),
            backup_copies: BACKUP_COPIES,
        };
        config_file.save(&config_path).await?;
        debug!("Created config at {}", config_path.display());

        Ok(Self {
            root,
            backups,
            secrets,
            drafts,
            config_path,
            config_file,
            api_url,
        })
    }

    /// This will
    /// - validate that the home directory and the config file exist
    /// - load the config file
    /// - validate that the backups, secrets and drafts directories exist
    /// - return the loaded configuration object
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The battwheels home directory is missing, run 'battwheels init'")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let api_url = parse_api_url(&config_file.api_url)
            .with_context(|| format!("Invalid api_url in {}", config_path.display()))?;

        let config = Self {
            root: root.clone(),
            backups: root.join(BACKUPS),
            secrets: root.join(SECRETS),
            drafts: root.join(DRAFTS),
            config_path,
            config_file,
            api_url,
        };
        for dir in [&config.backups, &config.secrets, &config.drafts] {
            if !dir.is_dir() {
                bail!("The directory '{}' is missing", dir.display())
            }
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn drafts_dir(&self) -> &Path {
        &self.drafts
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn organization_id(&self) -> &str {
        &self.config_file.organization_id
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    pub fn token_path(&self) -> PathBuf {
        self.secrets.join(TOKEN_JSON)
    }

    /// Where the in-memory test backend keeps its state between invocations.
    pub fn test_backend_path(&self) -> PathBuf {
        self.root.join(TEST_BACKEND_JSON)
    }

    /// Creates a new `Backup` instance for managing backup files.
    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }

    /// The store holding journal drafts.
    pub fn drafts(&self) -> DraftStore {
        DraftStore::new(&self.drafts)
    }

    /// Stores `token` as the access token used for every backend request.
    pub async fn save_token(&self, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            bail!("The access token cannot be empty");
        }
        let file = TokenFile {
            access_token: token.to_string(),
        };
        let json = serde_json::to_string_pretty(&file).context("Unable to serialize token")?;
        utils::write_private(self.token_path(), json).await
    }

    /// Builds the `RequestContext` for backend calls, preferring `BATTWHEELS_TOKEN` and
    /// `BATTWHEELS_ORG_ID` over the stored values.
    pub async fn request_context(&self) -> Result<RequestContext> {
        self.request_context_with(
            std::env::var(TOKEN_ENV).ok(),
            std::env::var(ORG_ID_ENV).ok(),
        )
        .await
    }

    async fn request_context_with(
        &self,
        env_token: Option<String>,
        env_org: Option<String>,
    ) -> Result<RequestContext> {
        let token = match env_token.filter(|t| !t.trim().is_empty()) {
            Some(token) => token,
            None => {
                let path = self.token_path();
                if !path.is_file() {
                    bail!(
                        "No access token found. Run 'battwheels auth --token <TOKEN>' or set \
                        {TOKEN_ENV}"
                    );
                }
                let file: TokenFile = utils::deserialize(&path).await?;
                file.access_token
            }
        };
        let organization_id = env_org
            .filter(|o| !o.trim().is_empty())
            .unwrap_or_else(|| self.organization_id().to_string());
        RequestContext::new(token, organization_id)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "battwheels",
///   "config_version": 1,
///   "api_url": "https://api.battwheels.in/",
///   "organization_id": "org_7f3a21",
///   "backup_copies": 20
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "battwheels"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Base URL of the backend
    api_url: String,

    /// Sent as `X-Organization-ID` on every request
    organization_id: String,

    /// Number of posted-request backups to keep
    #[serde(default = "default_backup_copies")]
    backup_copies: u32,
}

fn default_backup_copies() -> u32 {
    BACKUP_COPIES
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if it belongs to another app.
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        utils::serialize(path.as_ref(), self)
            .await
            .context("Unable to write config file")
    }
}

/// The stored access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenFile {
    access_token: String,
}

/// Parses the backend base URL. Only http and https are accepted.
fn parse_api_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).with_context(|| format!("'{url}' is not a valid URL"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => bail!("The API URL must use http or https, got '{other}'"),
    }
}
