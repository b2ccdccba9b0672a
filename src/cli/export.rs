//! `herdbook export pdf|excel`

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use super::output::print_ok;
use super::App;
use crate::services::dates;
use crate::services::export::{default_file_name, save_blob, ExportFormat};
use crate::services::policy::Resource;
use crate::types::Result;

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(value_enum)]
    format: ExportFormat,

    /// Directory to save the report in
    #[arg(long, value_name = "DIR", default_value = ".")]
    out: PathBuf,
}

#[derive(Debug, Serialize)]
struct Saved {
    path: PathBuf,
    bytes: usize,
}

impl ExportArgs {
    pub async fn run(self, app: &App) -> Result<()> {
        app.ctx.require_view(Resource::Export)?;

        let download = app.api.download_export(self.format).await?;
        let name = download
            .file_name
            .unwrap_or_else(|| default_file_name(self.format, dates::today()));
        let path = save_blob(&self.out, &name, &download.bytes).await?;

        if app.json {
            return print_ok(Saved {
                path,
                bytes: download.bytes.len(),
            });
        }
        println!("Saved {}", path.display());
        Ok(())
    }
}
