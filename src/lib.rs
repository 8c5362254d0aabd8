//! battwheels: a command-line client for the Battwheels OS accounting backend.
//!
//! Journal entries are drafted locally, checked for balance, and posted to the backend. Account
//! ledgers and CSV / Tally exports are fetched with the same credentials.

pub mod api;
pub mod args;
mod backup;
pub mod commands;
mod config;
pub mod display;
mod drafts;
mod error;
pub mod model;
mod utils;


pub use api::{Mode, RequestContext};
pub use backup::Backup;
pub use config::Config;
pub use drafts::DraftStore;
pub use error::{error_type, Error, ErrorType, IntoResult, PubError, Result};
