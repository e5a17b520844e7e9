/// Result of a scan: either some tag matched, or the rest of the text was
/// consumed without a match. "No match" is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome<'t, 's> {
    Found { tag: &'t str, text: &'s str },
    NotFound { text: &'s str },
}

impl<'t, 's> ScanOutcome<'t, 's> {
    pub fn found(&self) -> bool {
        matches!(self, ScanOutcome::Found { .. })
    }

    pub fn tag(&self) -> Option<&'t str> {
        match *self {
            ScanOutcome::Found { tag, .. } => Some(tag),
            ScanOutcome::NotFound { .. } => None,
        }
    }

    pub fn text(&self) -> &'s str {
        match *self {
            ScanOutcome::Found { text, .. } | ScanOutcome::NotFound { text } => text,
        }
    }
}

/// Cursor-based scanner that finds the earliest of several literal tags.
///
/// Positions are byte offsets; every position the scanner produces lies on a
/// char boundary. Case-insensitive matching folds ASCII only, so offsets are
/// stable under folding.
pub struct TagScanner<'s> {
    text: &'s str,
    pos: usize,
}

impl<'s> TagScanner<'s> {
    pub fn new(text: &'s str) -> Self {
        TagScanner { text, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Text from the cursor to the end, tied to the scanned text's lifetime
    /// rather than to this borrow.
    pub fn remaining(&self) -> &'s str {
        &self.text[self.pos..]
    }

    /// Advances the cursor by `amount` bytes.
    pub fn skip(&mut self, amount: usize) {
        self.pos = (self.pos + amount).min(self.text.len());
    }

    /// Moves the cursor to just after the first match of `tag` at or after
    /// the cursor. Returns false and leaves the cursor unchanged if `tag`
    /// does not occur.
    pub fn skip_to(&mut self, tag: &str, ignore_case: bool) -> bool {
        match self.find_from(tag, self.pos, ignore_case) {
            Some(index) => {
                self.pos = index + tag.len();
                true
            }
            None => false,
        }
    }

    /// Scans from the cursor for the earliest match among `tags`.
    ///
    /// On a match the cursor advances past the matched tag and the text
    /// before the match is returned (including the tag itself when
    /// `include_tag` is set). Without a match all remaining text is returned
    /// and the cursor moves to the end.
    ///
    /// Ties at the same position go to the tag listed first, so callers that
    /// sort tags by descending length get longest-match behavior for tags
    /// that are prefixes of one another (such as "/*" and "/**").
    pub fn read_until_or_end<'t>(
        &mut self,
        tags: &[&'t str],
        ignore_case: bool,
        include_tag: bool,
    ) -> ScanOutcome<'t, 's> {
        let mut best: Option<(usize, &'t str)> = None;
        for &tag in tags {
            if let Some(index) = self.find_from(tag, self.pos, ignore_case) {
                match best {
                    Some((best_index, _)) if index >= best_index => {}
                    _ => best = Some((index, tag)),
                }
            }
        }
        let text = self.text;
        match best {
            Some((index, tag)) => {
                let end = if include_tag { index + tag.len() } else { index };
                let before = &text[self.pos..end];
                self.pos = index + tag.len();
                ScanOutcome::Found { tag, text: before }
            }
            None => {
                let rest = &text[self.pos..];
                self.pos = text.len();
                ScanOutcome::NotFound { text: rest }
            }
        }
    }

    fn find_from(&self, tag: &str, from: usize, ignore_case: bool) -> Option<usize> {
        let from = from.min(self.text.len());
        if !ignore_case {
            return self.text[from..].find(tag).map(|index| index + from);
        }
        let haystack = self.text.as_bytes();
        let needle = tag.as_bytes();
        let last_start = haystack.len().checked_sub(needle.len())?;
        (from..=last_start).find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
    }
}
