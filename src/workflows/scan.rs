use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use walkdir::WalkDir;

use crate::domain::models::{subtitle_path_for, Resolution};
use crate::infra::{SubtitleCatalog, SubtitleTransfer};
use crate::workflows::resolver::Resolver;

/// Outcome of one run over every scanned video.
#[derive(Debug, Default)]
pub struct RunReport {
    pub downloaded: usize,
    pub not_found: usize,
    pub skipped: usize,
    pub failures: Vec<(PathBuf, String)>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

pub fn is_video(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .is_some_and(|mime| mime.type_() == mime_guess::mime::VIDEO)
}

/// Walks `root` (a file or a directory, recursively) and resolves subtitles
/// for every video without a sibling `.srt`.
///
/// Per-file errors are collected in the report unless `fail_fast` is set,
/// in which case the first one aborts the walk.
pub fn scan<C, T>(root: &Path, resolver: &mut Resolver<C, T>, fail_fast: bool) -> Result<RunReport>
where
    C: SubtitleCatalog,
    T: SubtitleTransfer,
{
    let mut report = RunReport::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                if fail_fast {
                    return Err(e).with_context(|| format!("Failed to read {path:?}"));
                }
                error!(path = %path.display(), "Failed to read: {e}");
                report.failures.push((path, e.to_string()));
                continue;
            }
        };

        if entry.file_type().is_dir() {
            debug!(dir = %entry.path().display(), "Scanning directory");
            continue;
        }

        let path = entry.path();
        if !is_video(path) {
            continue;
        }
        process_file(path, resolver, fail_fast, &mut report)?;
    }

    Ok(report)
}

fn process_file<C, T>(
    file_path: &Path,
    resolver: &mut Resolver<C, T>,
    fail_fast: bool,
    report: &mut RunReport,
) -> Result<()>
where
    C: SubtitleCatalog,
    T: SubtitleTransfer,
{
    let file_name = file_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    if subtitle_path_for(file_path).exists() {
        println!("Skipping: {file_name}");
        report.skipped += 1;
        return Ok(());
    }

    match resolver.resolve(file_path) {
        Ok(Resolution::Downloaded { subtitle_path, .. }) => {
            debug!(subtitle = %subtitle_path.display(), "Installed subtitle");
            println!("- {file_name} : OK");
            report.downloaded += 1;
        }
        Ok(Resolution::NotFound) => {
            println!("- Subtitles not found for `{file_name}`");
            report.not_found += 1;
        }
        Err(e) => {
            if fail_fast {
                return Err(e).with_context(|| format!("Error processing {file_path:?}"));
            }
            error!(file = %file_name, "Error processing {file_path:?}: {e}");
            report.failures.push((file_path.to_path_buf(), e.to_string()));
        }
    }

    Ok(())
}
