//! Saving report downloads (PDF / Excel) to disk

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::types::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Pdf,
    Excel,
}

impl ExportFormat {
    /// Endpoint path under the API base URL
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Pdf => "/export/pdf",
            Self::Excel => "/export/excel",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Excel => "xlsx",
        }
    }
}

/// Name used when the server does not suggest one
pub fn default_file_name(format: ExportFormat, on: NaiveDate) -> String {
    format!("milk-report-{}.{}", on.format("%Y-%m-%d"), format.extension())
}

fn disposition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)filename\*?=(?:UTF-8'')?"?([^";]+)"?"#).expect("valid regex")
    })
}

/// File name suggested by a `Content-Disposition` header, stripped of any
/// directory components
pub fn file_name_from_disposition(header: &str) -> Option<String> {
    let raw = disposition_re().captures(header)?.get(1)?.as_str().trim();
    Path::new(raw)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "..")
        .map(String::from)
}

/// First path in `dir` named `name`, `stem-1.ext`, `stem-2.ext`, ... that does not exist
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("export");
    let ext = as_path.extension().and_then(|e| e.to_str());

    (1..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{}-{}.{}", stem, n, ext)),
            None => dir.join(format!("{}-{}", stem, n)),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Write a downloaded blob without clobbering an earlier export
pub async fn save_blob(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = unique_path(dir, name);
    tokio::fs::write(&path, bytes).await?;
    log::info!("saved {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}
