use crate::api::{self, ExportFormat, Mode};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::DateRange;
use crate::{utils, Config, Result};
use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What `export` wrote.
#[derive(Debug, Clone, Serialize)]
pub struct Exported {
    pub format: ExportFormat,
    pub path: PathBuf,
    pub bytes: usize,
}

/// `journal-entries-<from>-<to>.<ext>`, with `all` standing in for an open bound.
pub fn default_export_path(format: ExportFormat, range: &DateRange) -> PathBuf {
    let bound = |d: Option<chrono::NaiveDate>| d.map_or_else(|| "all".to_string(), |d| d.to_string());
    PathBuf::from(format!(
        "journal-entries-{}-{}.{}",
        bound(range.start),
        bound(range.end),
        format.extension()
    ))
}

/// Downloads an export and writes it, byte for byte, to `output` or the default path.
pub async fn export(
    config: &Config,
    mode: Mode,
    format: ExportFormat,
    range: DateRange,
    output: Option<&Path>,
) -> Result<Out<Exported>> {
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_export_path(format, &range));

    let ctx = config
        .request_context()
        .await
        .pub_result(ErrorType::Config)?;
    let mut backend = api::backend(config, mode)
        .await
        .pub_result(ErrorType::Config)?;
    let bytes = backend
        .export(&ctx, format, &range)
        .await
        .with_context(|| format!("Unable to download the {format} export"))
        .pub_result(ErrorType::Request)?;

    utils::write(&path, &bytes)
        .await
        .pub_result(ErrorType::Storage)?;

    Ok(Out::new(
        format!("Wrote {} bytes to {}", bytes.len(), path.display()),
        Exported {
            format,
            path,
            bytes: bytes.len(),
        },
    ))
}
