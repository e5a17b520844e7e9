use std::collections::BTreeMap;

use crate::extractor::CommentOccurrence;

/// Strips the base path plus at most one leading path separator.
pub fn relative_path(file_path: &str, base: &str) -> String {
    let rest = file_path.get(base.len()..).unwrap_or("");
    let rest = rest.strip_prefix('\\').unwrap_or(rest);
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    rest.to_string()
}

/// Splits a filename at the last dot. The extension is returned without
/// the dot and is empty if there is none.
pub fn filename_and_extension(full: &str) -> (&str, &str) {
    match full.rfind('.') {
        None => (full, ""),
        Some(_) if full.ends_with('.') => (&full[..full.len() - 1], ""),
        Some(pos) => (&full[..pos], &full[pos + 1..]),
    }
}

/// Groups occurrences by file path, sorted by path. The per file lists
/// keep the order of the input.
pub fn files_to_comments_map(
    occurrences: &[CommentOccurrence],
) -> BTreeMap<&str, Vec<&CommentOccurrence>> {
    let mut result: BTreeMap<&str, Vec<&CommentOccurrence>> = BTreeMap::new();
    for occurrence in occurrences {
        result
            .entry(occurrence.file_path.as_str())
            .or_default()
            .push(occurrence);
    }
    result
}
