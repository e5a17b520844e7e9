use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::editor;
use crate::extractor::CommentOccurrence;
use crate::preview;
use crate::util;

const CODE_ARCHIVE_DIR_NAME: &str = "code-archive";
const OPERATION_INDEX_DIR_NAME: &str = "operation-index";
const CHANGES_HTML_DIR_NAME: &str = "changes-html";
const SUMMARY_DIR_NAME: &str = "summary";
const OPERATION_INDEX_FILE_EXTENSION: &str = ".dat";
const SUMMARY_FILE_EXTENSION: &str = ".json";
const CHANGES_HTML_FILE_EXTENSION: &str = ".html";

/// What one archive run recorded about a single source file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileArchivingSummary<'a> {
    relative_path: String,
    items: Vec<&'a CommentOccurrence>,
}

/// Timestamp that names all artifacts of one archive run, for example
/// "2022-07-31T21-09-48_543". Contains no characters that are special
/// in file names.
pub fn create_run_id() -> String {
    Utc::now().format("%Y-%m-%dT%H-%M-%S_%3f").to_string()
}

/// Moves the given occurrences out of their source files: each affected
/// file is backed up, rewritten without the comments (or deleted when
/// nothing remains) and recorded in the archive index and summary.
/// A change report in HTML is written before any file is touched.
pub fn archive_comments(
    config: &RunConfig,
    occurrences: &[CommentOccurrence],
    emit: &mut dyn FnMut(&str),
) -> Result<()> {
    archive_comments_with_run_id(config, occurrences, &create_run_id(), emit)
}

pub fn archive_comments_with_run_id(
    config: &RunConfig,
    occurrences: &[CommentOccurrence],
    run_id: &str,
    emit: &mut dyn FnMut(&str),
) -> Result<()> {
    let map = util::files_to_comments_map(occurrences);

    let mut output: Vec<String> = Vec::new();
    output.push(String::new());
    output.push(if map.is_empty() {
        "No occurrences found and no archiving needed.".to_string()
    } else {
        "Archiving result:".to_string()
    });
    output.push(String::new());

    write_html_file(config, run_id, occurrences)?;

    for (path, comments) in &map {
        let line = process_file(config, run_id, Path::new(path), comments)
            .with_context(|| format!("Unexpected error while processing file '{path}'"))?;
        output.push(line);
    }
    for line in &output {
        emit(line);
    }
    Ok(())
}

fn write_html_file(
    config: &RunConfig,
    run_id: &str,
    occurrences: &[CommentOccurrence],
) -> Result<()> {
    let dir = archive_root_dir(config)?.join(CHANGES_HTML_DIR_NAME);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Could not create directory '{}'", dir.display()))?;
    let html = preview::render_html(occurrences)?;
    let dest = dir.join(format!("{run_id}{CHANGES_HTML_FILE_EXTENSION}"));
    fs::write(&dest, html)
        .with_context(|| format!("Could not write change report '{}'", dest.display()))?;
    Ok(())
}

fn archive_root_dir(config: &RunConfig) -> Result<PathBuf> {
    let root = PathBuf::from(&config.archive_root_path);
    fs::create_dir_all(&root)
        .with_context(|| format!("Could not create archive directory '{}'", root.display()))?;
    Ok(root)
}

/// Returns the index line for the file, for example "src/Main.kt:2 comments removed".
fn process_file(
    config: &RunConfig,
    run_id: &str,
    file: &Path,
    comments: &[&CommentOccurrence],
) -> Result<String> {
    let text = fs::read_to_string(file)?;
    let owned: Vec<CommentOccurrence> = comments.iter().map(|&c| c.clone()).collect();
    let cleaned = editor::remove_occurrences(&text, &owned)?;
    copy_to_archive(config, run_id, file)?;
    let info = add_file_to_index(config, run_id, file, comments.len(), cleaned.is_empty())?;
    add_summary_to_archive(config, run_id, file, comments)?;
    update_file(file, &cleaned)?;
    Ok(info)
}

fn copy_to_archive(config: &RunConfig, run_id: &str, file: &Path) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File '{}' does not exist", file.display());
    }
    let dest = file_location_in_archive(config, run_id, file)?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create directory '{}'", parent.display()))?;
    }
    fs::copy(file, &dest).with_context(|| {
        format!(
            "Could not copy '{}' to '{}'",
            file.display(),
            dest.display()
        )
    })?;
    Ok(())
}

fn file_location_in_archive(config: &RunConfig, run_id: &str, file: &Path) -> Result<PathBuf> {
    let parent = file
        .parent()
        .ok_or_else(|| anyhow::anyhow!("File '{}' has no parent dir", file.display()))?;
    let file_name = file
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("File '{}' has no name", file.display()))?;
    let relative = util::relative_path(&parent.to_string_lossy(), &config.source_root_path);

    let mut result = archive_root_dir(config)?;
    result.push(CODE_ARCHIVE_DIR_NAME);
    if !relative.is_empty() {
        result.push(&relative);
    }
    result.push(run_id);
    result.push(file_name);
    Ok(result)
}

fn add_file_to_index(
    config: &RunConfig,
    run_id: &str,
    file: &Path,
    comment_count: usize,
    file_becomes_empty: bool,
) -> Result<String> {
    let dir = archive_root_dir(config)?.join(OPERATION_INDEX_DIR_NAME);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Could not create directory '{}'", dir.display()))?;
    let dest = dir.join(format!("{run_id}{OPERATION_INDEX_FILE_EXTENSION}"));

    let relative =
        util::relative_path(&file.to_string_lossy(), &config.source_root_path).replace('\\', "/");
    let removed_info = if file_becomes_empty {
        "file removed".to_string()
    } else if comment_count == 1 {
        "1 comment removed".to_string()
    } else {
        format!("{comment_count} comments removed")
    };
    let info = format!("{relative}:{removed_info}");

    let mut index = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&dest)
        .with_context(|| format!("Could not open index file '{}'", dest.display()))?;
    writeln!(index, "{info}")?;
    Ok(info)
}

fn add_summary_to_archive(
    config: &RunConfig,
    run_id: &str,
    file: &Path,
    comments: &[&CommentOccurrence],
) -> Result<()> {
    let dir = archive_root_dir(config)?.join(SUMMARY_DIR_NAME).join(run_id);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Could not create directory '{}'", dir.display()))?;
    let relative =
        util::relative_path(&file.to_string_lossy(), &config.source_root_path).replace('\\', "/");
    let summary = FileArchivingSummary {
        relative_path: relative,
        items: comments.to_vec(),
    };
    let json = serde_json::to_string(&summary)?;
    let dest = summary_dest_file(&dir, file);
    fs::write(&dest, json)
        .with_context(|| format!("Could not write summary '{}'", dest.display()))?;
    Ok(())
}

// Several source files may share one name, so the summary file name
// gets a numeric suffix once taken.
fn summary_dest_file(dir: &Path, file: &Path) -> PathBuf {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let (stem, _) = util::filename_and_extension(&name);
    let mut index = 0;
    loop {
        let suffix = if index == 0 {
            String::new()
        } else {
            format!("-{index}")
        };
        let candidate = dir.join(format!("{stem}{suffix}{SUMMARY_FILE_EXTENSION}"));
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}

fn update_file(file: &Path, cleaned: &str) -> Result<()> {
    if cleaned.is_empty() {
        fs::remove_file(file)
            .with_context(|| format!("Could not remove '{}'", file.display()))?;
        return Ok(());
    }
    let parent = file
        .parent()
        .ok_or_else(|| anyhow::anyhow!("File '{}' has no parent dir", file.display()))?;
    let suffix = file
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let mut temp_file = tempfile::Builder::new()
        .prefix(".mothball_")
        .suffix(&suffix)
        .tempfile_in(parent)
        .with_context(|| format!("Could not create temp file next to '{}'", file.display()))?;
    temp_file.write_all(cleaned.as_bytes())?;
    temp_file
        .into_temp_path()
        .persist(file)
        .with_context(|| format!("Could not update '{}'", file.display()))?;
    Ok(())
}
