use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its subdirectories and an initial `config.json` file.
///
/// # Arguments
/// - `battwheels_home` - The directory that will be the root of data directory, e.g.
///   `$HOME/battwheels`
/// - `api_url` - The base URL of the Battwheels OS backend.
/// - `organization_id` - The organization that requests are made for.
///
/// # Errors
/// - Returns an error if the URL is invalid or any file operations fail.
pub async fn init(battwheels_home: &Path, api_url: &str, organization_id: &str) -> Result<Out<()>> {
    let config = Config::create(battwheels_home, api_url, organization_id)
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;
    Ok(format!(
        "Successfully created the battwheels directory at {}. Next, run 'battwheels auth --token \
        <TOKEN>'",
        config.root().display()
    )
    .into())
}
