use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Local, TimeZone};
use imagegen_rs::payload_of;
use tracing::{debug, error, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{QueueError, Result};
use crate::prompt::is_prompt_whitespace;
use crate::types::PromptResult;
use crate::FlagGuard;

/// Used when a prompt sanitizes to nothing.
pub const FALLBACK_FILENAME: &str = "generated_image";

const MAX_NAME_LEN: usize = 50;

/// Turn a prompt into a filesystem-friendly stem.
///
/// Lower-cases, keeps only `[a-z0-9]`, whitespace and `-`, collapses each
/// whitespace run into one `_`, and truncates to 50 characters. May return
/// an empty string. Whitespace follows [`is_prompt_whitespace`].
pub fn sanitize_prompt(prompt: &str) -> String {
    let mut out = String::new();
    let mut in_space = false;
    for c in prompt.to_lowercase().chars() {
        if is_prompt_whitespace(c) {
            if !in_space {
                out.push('_');
                in_space = true;
            }
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            out.push(c);
            in_space = false;
        }
    }
    out.chars().take(MAX_NAME_LEN).collect()
}

/// File name for the `index`-th (0-based) image of a prompt.
pub fn image_filename(prompt: &str, index: usize) -> String {
    let stem = sanitize_prompt(prompt);
    let stem = if stem.is_empty() {
        FALLBACK_FILENAME
    } else {
        stem.as_str()
    };
    format!("{}_{}.jpeg", stem, index + 1)
}

/// `generated_images_dd-MM-yyyy-HH-mm.zip`
pub fn archive_name<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("generated_images_{}.zip", now.format("%d-%m-%Y-%H-%M"))
}

/// Build an in-memory zip holding every image of every successful result.
///
/// Images whose data URI has no payload are skipped. If two images map to
/// the same file name, the later one wins.
pub fn build_archive(results: &[PromptResult]) -> Result<Vec<u8>> {
    let mut entries: Vec<(String, Vec<u8>)> = Vec::new();

    for result in results.iter().filter(|r| r.has_images()) {
        for (i, image) in result.images().iter().enumerate() {
            let Some(payload) = payload_of(image) else {
                continue;
            };
            let bytes = STANDARD.decode(payload.trim())?;
            let name = image_filename(&result.prompt, i);
            match entries.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => entry.1 = bytes,
                None => entries.push((name, bytes)),
            }
        }
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in &entries {
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(name.as_str(), options)?;
        zip.write_all(bytes)?;
    }
    Ok(zip.finish()?.into_inner())
}

/// Write a single image to `dir` under its sanitized file name.
pub async fn save_image(data_uri: &str, prompt: &str, index: usize, dir: &Path) -> Result<PathBuf> {
    let payload = payload_of(data_uri)
        .ok_or_else(|| QueueError::InvalidImage("image has no payload".into()))?;
    let bytes = STANDARD.decode(payload.trim())?;
    let path = dir.join(image_filename(prompt, index));
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Packages successful results into a zip file on disk.
///
/// One export runs at a time; a second request while one is in progress
/// is ignored.
#[derive(Debug, Default)]
pub struct ResultArchiver {
    zipping: AtomicBool,
}

impl ResultArchiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_zipping(&self) -> bool {
        self.zipping.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Archive a snapshot of `results` into `dir` and return the zip's path.
    ///
    /// Existing archives are never overwritten: a second export in the same
    /// minute is written as `generated_images_<timestamp> (1).zip`.
    ///
    /// Returns `None` if an export is already running or anything fails; a
    /// failure is logged and leaves no partial file behind.
    pub async fn save_to_dir(&self, results: &[PromptResult], dir: &Path) -> Option<PathBuf> {
        let Some(_guard) = FlagGuard::try_acquire(&self.zipping) else {
            debug!("Archive already in progress, ignoring request");
            return None;
        };

        match Self::write_archive(results.to_vec(), dir).await {
            Ok(path) => {
                info!(path = %path.display(), "Archive written");
                Some(path)
            }
            Err(e) => {
                error!(error = %e, "Failed to create zip file");
                None
            }
        }
    }

    async fn write_archive(results: Vec<PromptResult>, dir: &Path) -> Result<PathBuf> {
        let bytes = tokio::task::spawn_blocking(move || build_archive(&results))
            .await
            .map_err(|e| QueueError::Task(e.to_string()))??;

        let path = unused_path(dir, &archive_name(&Local::now())).await?;
        let partial = path.with_extension("zip.part");
        if let Err(e) = write_then_rename(&partial, &path, &bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
        Ok(path)
    }
}

/// `dir/name`, or `dir/<stem> (n).zip` for the first `n` not already taken.
async fn unused_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    if !tokio::fs::try_exists(&path).await? {
        return Ok(path);
    }
    let stem = name.strip_suffix(".zip").unwrap_or(name);
    let mut n = 1;
    loop {
        let candidate = dir.join(format!("{} ({}).zip", stem, n));
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}

async fn write_then_rename(partial: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(partial, bytes).await?;
    tokio::fs::rename(partial, path).await?;
    Ok(())
}
