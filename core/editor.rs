use crate::extractor::{CharRange, CommentOccurrence};

/// Contract violation in the occurrence list handed to the editor.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("occurrence {first}..{last} is outside the text (length {len})")]
    OutOfBounds { first: usize, last: usize, len: usize },

    #[error("occurrences {a_first}..{a_last} and {b_first}..{b_last} overlap")]
    Overlapping {
        a_first: usize,
        a_last: usize,
        b_first: usize,
        b_last: usize,
    },
}

/// Deletes all occurrences from `text`, tidying the surrounding whitespace
/// so no stray blank lines, trailing spaces or glued tokens remain.
///
/// The occurrences must reference exactly this text. They are applied from
/// the highest start position down, so earlier deletions never invalidate
/// the positions still pending. An empty result means the whole file content
/// was commented-out code and the file itself should go.
pub fn remove_occurrences(
    text: &str,
    occurrences: &[CommentOccurrence],
) -> Result<String, EditError> {
    if occurrences.is_empty() {
        return Ok(text.to_string());
    }
    check_bounds(text, occurrences)?;

    let mut ordered: Vec<&CommentOccurrence> = occurrences.iter().collect();
    ordered.sort_by_key(|occurrence| occurrence.pos.first);
    check_sorted_overlap(&ordered)?;

    let mut result = text.to_string();
    for occurrence in ordered.iter().rev() {
        result = remove_one(&result, occurrence);
    }
    Ok(result)
}

fn check_bounds(text: &str, occurrences: &[CommentOccurrence]) -> Result<(), EditError> {
    let len = text.len();
    for occurrence in occurrences {
        let CharRange { first, last } = occurrence.pos;
        if first > last
            || last >= len
            || !text.is_char_boundary(first)
            || !text.is_char_boundary(last + 1)
        {
            return Err(EditError::OutOfBounds { first, last, len });
        }
    }
    Ok(())
}

fn check_sorted_overlap(ordered: &[&CommentOccurrence]) -> Result<(), EditError> {
    for pair in ordered.windows(2) {
        if pair[1].pos.first <= pair[0].pos.last {
            return Err(EditError::Overlapping {
                a_first: pair[0].pos.first,
                a_last: pair[0].pos.last,
                b_first: pair[1].pos.first,
                b_last: pair[1].pos.last,
            });
        }
    }
    Ok(())
}

/// Removes one occurrence. How much adjoining whitespace goes with it
/// depends on what shares its lines:
/// - a comment alone on its line(s) disappears with the whole line(s),
/// - a multi-line comment between code keeps one line break as separator,
/// - an inline comment between code keeps the tokens apart with one space.
fn remove_one(text: &str, occurrence: &CommentOccurrence) -> String {
    let line_style = occurrence.text.ends_with('\n');
    let before = line_text_before(text, occurrence.pos.first);
    let after = if line_style {
        ""
    } else {
        line_text_after(text, occurrence.pos.last)
    };
    let blank_before = before.trim().is_empty();
    let blank_after = after.trim().is_empty();
    let multi_line = occurrence.lines.first < occurrence.lines.last;

    let mut first = occurrence.pos.first;
    let mut last = occurrence.pos.last;
    if multi_line {
        if blank_before {
            first -= before.len();
        }
        if blank_after {
            last += after.len();
            if blank_before {
                // the occurrence owned its lines completely, so the line
                // break that closed them goes too
                if char_at(text, last + 1) == Some('\r') {
                    last += 1;
                }
                if char_at(text, last + 1) == Some('\n') {
                    last += 1;
                }
            }
        }
    } else if blank_before && blank_after {
        first -= before.len();
        last += after.len();
    }

    let prefix = if first > 0 {
        text[..first].trim_end_matches([' ', '\t'])
    } else {
        ""
    };
    let suffix = if last + 1 < text.len() {
        &text[last + 1..]
    } else {
        ""
    };

    let mut line_break = "";
    let mut space = "";
    if !blank_before && line_style {
        line_break = "\n";
    }
    if !blank_before && !blank_after {
        if multi_line {
            line_break = "\n";
        } else if !prefix.ends_with(' ') && !suffix.starts_with(' ') {
            space = " ";
        }
    }

    let mut result = String::with_capacity(prefix.len() + 1 + suffix.len());
    result.push_str(prefix);
    result.push_str(line_break);
    result.push_str(space);
    result.push_str(suffix);
    result
}

/// Text on the line of `pos` before it, back to the previous line break
/// (exclusive) or the start of the text.
fn line_text_before(text: &str, pos: usize) -> &str {
    match text[..pos].rfind('\n') {
        Some(found) => &text[found + 1..pos],
        None => &text[..pos],
    }
}

/// Text on the line of `pos` after it, forward to the next line break
/// (exclusive) or the end of the text.
fn line_text_after(text: &str, pos: usize) -> &str {
    if pos < text.len() && text.as_bytes()[pos] == b'\n' {
        return "";
    }
    let from = pos + 1;
    if from >= text.len() {
        return "";
    }
    match text[from..].find('\n') {
        Some(found) => &text[from..from + found],
        None => &text[from..],
    }
}

fn char_at(text: &str, pos: usize) -> Option<char> {
    text.get(pos..).and_then(|rest| rest.chars().next())
}
