use serde::Serialize;

use crate::scanner::{ScanOutcome, TagScanner};

const STRING_START: &str = "\"";
const RAW_STRING_START: &str = "\"\"\"";
const RAW_STRING_END: &str = "\"\"\"";

/// A pair of literal delimiters for a comment style or skip region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPair {
    pub start: String,
    pub end: String,
}

impl TagPair {
    pub fn new(start: &str, end: &str) -> Self {
        TagPair {
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}

/// Inclusive byte range into one text snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CharRange {
    pub first: usize,
    pub last: usize,
}

/// Inclusive 1-based line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineRange {
    pub first: u32,
    pub last: u32,
}

/// One contiguous span of text identified for removal. Valid only against
/// the snapshot it was extracted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentOccurrence {
    pub file_path: String,
    pub pos: CharRange,
    pub lines: LineRange,
    #[serde(rename = "commentText")]
    pub text: String,
}

/// Finds the comment occurrences to remove in source text.
///
/// Tag categories: "remove" pairs mark removable comments, "keep" pairs mark
/// comments that are skipped without being inspected, and ordinary string
/// literals are skipped honoring backslash escapes. Raw strings (triple
/// quote) contain no escapes and are treated like keep blocks.
pub struct OccurrenceExtractor {
    remove: Vec<TagPair>,
    skip: Vec<TagPair>,
}

impl OccurrenceExtractor {
    pub fn new(remove: Vec<TagPair>, keep: Vec<TagPair>) -> Self {
        let mut skip = keep;
        match skip.iter_mut().find(|pair| pair.start == RAW_STRING_START) {
            Some(pair) => pair.end = RAW_STRING_END.to_string(),
            None => skip.push(TagPair::new(RAW_STRING_START, RAW_STRING_END)),
        }
        OccurrenceExtractor { remove, skip }
    }

    /// Scans `text` and returns the ascending, non-overlapping list of
    /// removable occurrences. `file_path` is carried through unchanged.
    ///
    /// Scanning is fail-soft: an unterminated remove block, keep block or
    /// string literal stops the scan and the occurrences collected so far
    /// are returned. The one exception is a line comment whose closing line
    /// break is missing at end of text; that still counts as complete.
    pub fn find_occurrences(&self, text: &str, file_path: &str) -> Vec<CommentOccurrence> {
        let mut result: Vec<CommentOccurrence> = Vec::new();
        let line_breaks = find_all_positions(text, "\n");
        let search_tags = self.search_tags();
        let mut scanner = TagScanner::new(text);

        loop {
            let tag = match scanner.read_until_or_end(&search_tags, false, false) {
                ScanOutcome::Found { tag, .. } => tag,
                ScanOutcome::NotFound { .. } => return result,
            };
            if let Some(end_tag) = lookup_end(&self.remove, tag) {
                let start_pos = scanner.pos() - tag.len();
                let terminated = scanner.read_until_or_end(&[end_tag], false, true).found();
                if !terminated && end_tag != "\n" {
                    // unterminated block: the lexical structure of the rest
                    // of the file cannot be trusted
                    return result;
                }
                let end_pos = scanner.pos() - 1;
                let occurrence =
                    build_occurrence(text, file_path, &line_breaks, start_pos, end_pos);
                push_merged(&mut result, occurrence, text);
            } else if let Some(end_tag) = lookup_end(&self.skip, tag) {
                if !scanner.read_until_or_end(&[end_tag], false, true).found() {
                    return result;
                }
            } else if !skip_past_string_end(&mut scanner) {
                // stray unmatched quote: everything after it would be
                // scanned with inverted string context
                return result;
            }
        }
    }

    fn search_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = Vec::new();
        tags.extend(self.skip.iter().map(|pair| pair.start.as_str()));
        tags.extend(self.remove.iter().map(|pair| pair.start.as_str()));
        tags.push(STRING_START);
        // longest first so a tag like "/**" is matched before its prefix "/*"
        tags.sort_by_key(|tag| std::cmp::Reverse(tag.len()));
        tags
    }
}

fn lookup_end<'a>(pairs: &'a [TagPair], start: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|pair| pair.start == start)
        .map(|pair| pair.end.as_str())
}

fn build_occurrence(
    text: &str,
    file_path: &str,
    line_breaks: &[usize],
    start: usize,
    end: usize,
) -> CommentOccurrence {
    CommentOccurrence {
        file_path: file_path.to_string(),
        pos: CharRange {
            first: start,
            last: end,
        },
        lines: LineRange {
            first: line_number(start, line_breaks),
            last: line_number(end, line_breaks),
        },
        text: text[start..=end].to_string(),
    }
}

/// Appends `occurrence`, merging it with the previous one when only
/// whitespace separates them (two comment lines split by a blank line are
/// one logical block of commented-out code).
fn push_merged(result: &mut Vec<CommentOccurrence>, occurrence: CommentOccurrence, text: &str) {
    match result.pop() {
        Some(previous) if only_whitespace_between(&previous, &occurrence, text) => {
            result.push(merge_occurrences(previous, occurrence, text));
        }
        Some(previous) => {
            result.push(previous);
            result.push(occurrence);
        }
        None => result.push(occurrence),
    }
}

fn only_whitespace_between(
    first: &CommentOccurrence,
    second: &CommentOccurrence,
    text: &str,
) -> bool {
    text[first.pos.last + 1..second.pos.first]
        .chars()
        .all(|c| matches!(c, '\t' | '\r' | '\n' | ' '))
}

fn merge_occurrences(
    first: CommentOccurrence,
    second: CommentOccurrence,
    text: &str,
) -> CommentOccurrence {
    let pos = CharRange {
        first: first.pos.first,
        last: second.pos.last,
    };
    CommentOccurrence {
        file_path: first.file_path,
        pos,
        lines: LineRange {
            first: first.lines.first,
            last: second.lines.last,
        },
        text: text[pos.first..=pos.last].to_string(),
    }
}

/// Advances the scanner past the closing quote of an ordinary string
/// literal, honoring backslash escapes. Returns false if the text ends
/// before the string does.
fn skip_past_string_end(scanner: &mut TagScanner) -> bool {
    let mut escaped = false;
    let mut amount = 0;
    for c in scanner.remaining().chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            scanner.skip(amount + 1);
            return true;
        }
        amount += c.len_utf8();
    }
    scanner.skip(amount);
    false
}

fn find_all_positions(text: &str, needle: &str) -> Vec<usize> {
    text.match_indices(needle).map(|(index, _)| index).collect()
}

/// Line of `pos`, counting line breaks strictly below it. A position sitting
/// on a line break belongs to that line. `line_breaks` must be ascending.
fn line_number(pos: usize, line_breaks: &[usize]) -> u32 {
    line_breaks.partition_point(|&b| b < pos) as u32 + 1
}
