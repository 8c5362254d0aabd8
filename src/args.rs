//! These structs provide the CLI interface for the battwheels CLI.

use crate::api::ExportFormat;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// battwheels: post journal entries to Battwheels OS and read its ledgers.
///
/// Journal entries are drafted locally: create a draft, fill in its lines, and post it once the
/// debits equal the credits. Account ledgers and CSV or Tally exports are read from the same
/// backend.
///
/// Start with 'battwheels init' and 'battwheels auth'.
#[derive(Debug, Parser, Clone)]
#[command(name = "battwheels", version)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration file.
    ///
    /// This is the first command you should run. By default the data directory is
    /// $HOME/battwheels; pass --battwheels-home to put it somewhere else.
    Init(InitArgs),
    /// Store the access token used for every request.
    ///
    /// The token is written to $BATTWHEELS_HOME/.secrets/token.json. Setting BATTWHEELS_TOKEN
    /// overrides it.
    Auth(AuthArgs),
    /// Create, inspect and edit journal entry drafts.
    Draft(DraftArgs),
    /// Validate a draft and post it as a journal entry. The draft is deleted once it is accepted.
    Post(PostArgs),
    /// Show the ledger of one account.
    Ledger(LedgerArgs),
    /// Download journal entries as CSV or Tally XML.
    Export(ExportArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where battwheels data and configuration is held. Defaults to ~/battwheels
    #[arg(long, env = "BATTWHEELS_HOME", default_value_t = default_battwheels_home())]
    battwheels_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, battwheels_home: PathBuf) -> Self {
        Self {
            log_level,
            battwheels_home: battwheels_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn battwheels_home(&self) -> &DisplayPath {
        &self.battwheels_home
    }
}

/// Args for the `battwheels init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The base URL of the Battwheels OS backend, e.g. https://api.battwheels.in
    #[arg(long)]
    api_url: String,

    /// The organization that journal entries are posted for. Sent as X-Organization-ID.
    #[arg(long)]
    organization_id: String,
}

impl InitArgs {
    pub fn new(api_url: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            organization_id: organization_id.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }
}

/// Args for the `battwheels auth` command.
#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// The bearer token issued by Battwheels OS.
    #[arg(long)]
    token: String,
}

impl AuthArgs {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Args for the `battwheels draft` command.
#[derive(Debug, Parser, Clone)]
pub struct DraftArgs {
    #[command(subcommand)]
    command: DraftCommand,
}

impl DraftArgs {
    pub fn new(command: DraftCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &DraftCommand {
        &self.command
    }
}

/// Draft ids may be shortened to any unique prefix. Line numbers start at 1.
#[derive(Subcommand, Debug, Clone)]
pub enum DraftCommand {
    /// Start a new draft with two empty lines.
    New(DraftNewArgs),
    /// List all drafts.
    List,
    /// Show a draft's lines and totals.
    Show(DraftRef),
    /// Change a draft's description or entry date.
    Edit(DraftEditArgs),
    /// Append a line.
    AddLine(AddLineArgs),
    /// Change fields of an existing line.
    SetLine(SetLineArgs),
    /// Remove a line. A draft always keeps at least two lines.
    RemoveLine(RemoveLineArgs),
    /// Delete a draft without posting it.
    Discard(DraftRef),
}

#[derive(Debug, Parser, Clone, Default)]
pub struct DraftNewArgs {
    /// The narration of the entry.
    #[arg(long)]
    pub description: Option<String>,

    /// The entry date as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Parser, Clone)]
pub struct DraftRef {
    /// The draft id or a unique prefix of it.
    pub draft: String,
}

#[derive(Debug, Parser, Clone)]
pub struct DraftEditArgs {
    /// The draft id or a unique prefix of it.
    pub draft: String,

    #[arg(long)]
    pub description: Option<String>,

    /// The entry date as YYYY-MM-DD.
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

/// The fields of a journal line. Amounts are kept exactly as typed, e.g. "₹5,000.00".
#[derive(Debug, Parser, Clone, Default)]
pub struct LineArgs {
    /// The account id.
    #[arg(long)]
    pub account: Option<String>,

    /// The line narration.
    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub debit: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub credit: Option<String>,
}

impl LineArgs {
    pub fn is_empty(&self) -> bool {
        self.account.is_none()
            && self.description.is_none()
            && self.debit.is_none()
            && self.credit.is_none()
    }
}

#[derive(Debug, Parser, Clone)]
pub struct AddLineArgs {
    /// The draft id or a unique prefix of it.
    pub draft: String,

    #[clap(flatten)]
    pub line: LineArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct SetLineArgs {
    /// The draft id or a unique prefix of it.
    pub draft: String,

    /// The line number, starting at 1.
    pub line_number: usize,

    #[clap(flatten)]
    pub line: LineArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct RemoveLineArgs {
    /// The draft id or a unique prefix of it.
    pub draft: String,

    /// The line number, starting at 1.
    pub line_number: usize,
}

/// Args for the `battwheels post` command.
#[derive(Debug, Parser, Clone)]
pub struct PostArgs {
    /// The draft id or a unique prefix of it.
    pub draft: String,
}

/// Args for the `battwheels ledger` command.
#[derive(Debug, Parser, Clone)]
pub struct LedgerArgs {
    /// The account id.
    pub account_id: String,

    /// First day to include, YYYY-MM-DD.
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Last day to include, YYYY-MM-DD.
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
}

/// Args for the `battwheels export` command.
#[derive(Debug, Parser, Clone)]
pub struct ExportArgs {
    /// The file format.
    #[arg(value_enum)]
    pub format: ExportFormat,

    /// First day to include, YYYY-MM-DD.
    #[arg(long)]
    pub date_from: Option<NaiveDate>,

    /// Last day to include, YYYY-MM-DD.
    #[arg(long)]
    pub date_to: Option<NaiveDate>,

    /// Where to write the file. Defaults to journal-entries-<from>-<to>.<ext> in the current
    /// directory.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

fn default_battwheels_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("battwheels"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --battwheels-home or BATTWHEELS_HOME instead of relying on the \
                default home directory. If you continue using the program right now, you may \
                have problems!",
            );
            PathBuf::from("battwheels")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
