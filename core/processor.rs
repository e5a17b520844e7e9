use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::archiver;
use crate::config::{RunConfig, StringFilter};
use crate::extractor::{CommentOccurrence, OccurrenceExtractor, TagPair};
use crate::file_finder::{self, Action, MothballArgs, PreviewFormat};
use crate::preview;

const INFO_OUTPUT_PREFIX: &str = "INFO:";

/// Runs the preview or archive action for the given options and config.
///
/// Every line is passed to `emit` and buffered. Unless the preview
/// itself is the output file (HTML format), the buffered lines are
/// written to the output file at the end.
pub fn run(args: &MothballArgs, config: &RunConfig, emit: &mut dyn FnMut(&str)) -> Result<()> {
    let action = args.checked_action()?;
    let written_externally = action == Action::Preview && args.format == PreviewFormat::Html;
    let output_file = prepare_output_file(args, written_externally)?;

    let mut buffer = String::new();
    let mut out = |line: &str| {
        buffer.push_str(line);
        buffer.push('\n');
        emit(line);
    };

    let occurrences = find_all_occurrences(config, &mut out)?;
    match action {
        Action::Preview => preview::print_preview(args, config, &occurrences, &mut out)?,
        Action::Archive => archiver::archive_comments(config, &occurrences, &mut |line| {
            out(&info_line(line))
        })?,
        Action::WriteSampleConfig => {
            anyhow::bail!("Writing a sample config file does not require a processor run")
        }
    }

    if let Some(output) = output_file {
        fs::write(&output, &buffer)
            .with_context(|| format!("Could not write output file '{}'", output.display()))?;
    }
    Ok(())
}

fn info_line(message: &str) -> String {
    format!("{INFO_OUTPUT_PREFIX} {message}")
}

fn prepare_output_file(args: &MothballArgs, written_externally: bool) -> Result<Option<PathBuf>> {
    if written_externally {
        return Ok(None);
    }
    let output = match &args.output {
        Some(output) => output.clone(),
        None => return Ok(None),
    };
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|_| {
                anyhow::anyhow!(
                    "Could not find or create parent directory for output path '{}'",
                    output.display()
                )
            })?;
        }
    }
    Ok(Some(output))
}

fn find_all_occurrences(
    config: &RunConfig,
    out: &mut dyn FnMut(&str),
) -> Result<Vec<CommentOccurrence>> {
    let files = read_filtered_source_files(config, out)?;
    out(&info_line(&format!(
        "Source files matching filters: {}",
        files.len()
    )));
    let occurrences = find_occurrences_in_files(config, &files)?;
    out(&info_line(&format!(
        "Occurrences found: {}",
        occurrences.len()
    )));
    Ok(occurrences)
}

fn read_filtered_source_files(
    config: &RunConfig,
    out: &mut dyn FnMut(&str),
) -> Result<Vec<PathBuf>> {
    let found = file_finder::find_source_files(config)?;
    out(&info_line(&format!(
        "Total files in source directory '{}': {}",
        config.source_root_path, found.total
    )));
    write_info_list(
        out,
        "Included paths: ",
        &format_path_filters(&config.include_paths),
        " - ",
        "",
    );
    write_info_list(
        out,
        "Excluded paths: ",
        &format_path_filters(&config.exclude_paths),
        " - ",
        "",
    );
    write_info_list(
        out,
        "Included file endings: ",
        &config.include_file_endings,
        " - \"",
        "\"",
    );
    Ok(found.matching)
}

fn format_path_filters(filters: &[StringFilter]) -> Vec<String> {
    filters.iter().map(|filter| filter.describe()).collect()
}

fn write_info_list(
    out: &mut dyn FnMut(&str),
    title: &str,
    items: &[String],
    item_prefix: &str,
    item_suffix: &str,
) {
    out(&info_line(title));
    for item in items {
        out(&info_line(&format!("{item_prefix}{item}{item_suffix}")));
    }
}

fn comment_tag_pairs(config: &RunConfig) -> (Vec<TagPair>, Vec<TagPair>) {
    let remove = config
        .block_comments_to_remove
        .iter()
        .cloned()
        .chain(
            config
                .line_comments_to_remove
                .iter()
                .map(|tag| TagPair::new(tag, "\n")),
        )
        .collect();
    let keep = config
        .block_comments_to_keep
        .iter()
        .cloned()
        .chain(
            config
                .line_comments_to_keep
                .iter()
                .map(|tag| TagPair::new(tag, "\n")),
        )
        .collect();
    (remove, keep)
}

fn find_occurrences_in_files(
    config: &RunConfig,
    files: &[PathBuf],
) -> Result<Vec<CommentOccurrence>> {
    let (remove, keep) = comment_tag_pairs(config);
    let extractor = OccurrenceExtractor::new(remove, keep);
    let results: Vec<Result<Vec<CommentOccurrence>, String>> = files
        .par_iter()
        .map(|path| {
            let text = fs::read_to_string(path).map_err(map_err_to_string(path, "Read"))?;
            Ok(extractor.find_occurrences(&text, &path.to_string_lossy()))
        })
        .collect();
    let mut occurrences = Vec::new();
    for result in results {
        occurrences.extend(result.map_err(anyhow::Error::msg)?);
    }
    Ok(occurrences)
}

fn map_err_to_string<E: std::fmt::Display>(p: &Path, c: &str) -> impl Fn(E) -> String {
    let d = p.display().to_string();
    move |e| format!("{} failed for {}: {}", c, d, e)
}
