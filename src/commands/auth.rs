//! Handles `battwheels auth`, which stores the access token.

use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use tracing::debug;

/// Writes `token` to `$BATTWHEELS_HOME/.secrets/token.json`, readable only by the current user.
///
/// # Errors
/// Returns an error if the token is empty or cannot be written.
pub async fn auth(config: &Config, token: &str) -> Result<Out<()>> {
    config
        .save_token(token)
        .await
        .context("Unable to store the access token")
        .pub_result(ErrorType::Config)?;
    debug!("Token written to {}", config.token_path().display());
    Ok("The access token was saved".into())
}
