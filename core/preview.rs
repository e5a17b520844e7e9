use anyhow::{Context, Result};
use std::fs;

use crate::config::RunConfig;
use crate::extractor::CommentOccurrence;
use crate::file_finder::{MothballArgs, PreviewFormat};
use crate::util;

const MAX_BEGINNING_PREVIEW_LENGTH: usize = 40;
const MULTILINE_MAX_LINES_START: usize = 2;
const MULTILINE_MAX_LINES_END: usize = 2;
const MULTILINE_INDENT: &str = "    ";

const HTML_PREFIX: &str = r#"<!DOCTYPE html>
<html>
<head>
<style>
body {color:white;background-color: black;}
p, div, span    {font-family:monospace;}
.file {
  background-color: white;
  color:black;
}
.plain {
  color: white;
}
.occurrence {
  background-color: #aa8800;
  color: white;
}
</style>
</head>
<body>
<h1>Mothball - Comment Occurrences</h1>
"#;

const HTML_SUFFIX: &str = "\n</body>\n</html>";

struct TextSection<'a> {
    text: &'a str,
    highlight: bool,
}

/// Emits one preview line per occurrence, or writes the whole preview
/// to the output file when the format is HTML.
pub fn print_preview(
    args: &MothballArgs,
    config: &RunConfig,
    occurrences: &[CommentOccurrence],
    emit: &mut dyn FnMut(&str),
) -> Result<()> {
    if args.format == PreviewFormat::Html {
        let output = match &args.output {
            Some(output) => output,
            None => anyhow::bail!(
                "If preview format is HTML, an output file needs to be specified. Parameter: '-o'"
            ),
        };
        let html = render_html(occurrences)?;
        fs::write(output, html)
            .with_context(|| format!("Could not write HTML preview to '{}'", output.display()))?;
        return Ok(());
    }
    for occurrence in occurrences {
        match args.format {
            PreviewFormat::BeginningOfText => {
                emit(&beginning_line(occurrence, &config.source_root_path));
            }
            PreviewFormat::Multiline => {
                emit(&multiline_block(occurrence, &config.source_root_path));
            }
            PreviewFormat::Html => {}
        }
    }
    Ok(())
}

/// One line per occurrence: relative path, first line number and the
/// start of the comment with line breaks shown as "\n".
pub fn beginning_line(occurrence: &CommentOccurrence, source_root: &str) -> String {
    let cleaned = occurrence.text.replace('\r', "").replace('\n', "\\n");
    let preview = if cleaned.chars().count() > MAX_BEGINNING_PREVIEW_LENGTH {
        let cut: String = cleaned
            .chars()
            .take(MAX_BEGINNING_PREVIEW_LENGTH - 3)
            .collect();
        format!("{cut}...")
    } else {
        cleaned
    };
    let path = util::relative_path(&occurrence.file_path, source_root);
    format!("{path}:{}> {preview}", occurrence.lines.first)
}

/// A header line plus the indented comment text. Comments longer than
/// five lines are shortened to the first and last two with "[...]"
/// in between.
pub fn multiline_block(occurrence: &CommentOccurrence, source_root: &str) -> String {
    let cleaned = occurrence.text.replace('\r', "").replace('\t', "    ");
    let cleaned = cleaned.strip_suffix('\n').unwrap_or(&cleaned);
    let lines: Vec<&str> = cleaned.split('\n').collect();
    let separator = format!("\n{MULTILINE_INDENT}");

    let max_total = MULTILINE_MAX_LINES_START + 1 + MULTILINE_MAX_LINES_END;
    let preview = if lines.len() <= max_total {
        format!("{MULTILINE_INDENT}{}", lines.join(&separator))
    } else {
        let head = lines[..MULTILINE_MAX_LINES_START].join(&separator);
        let tail = lines[lines.len() - MULTILINE_MAX_LINES_END..].join(&separator);
        format!(
            "{MULTILINE_INDENT}{head}\n{MULTILINE_INDENT}[...]\n{MULTILINE_INDENT}{tail}"
        )
    };
    let path = util::relative_path(&occurrence.file_path, source_root);
    format!(
        "{path}:{}-{}>\n{preview}",
        occurrence.lines.first, occurrence.lines.last
    )
}

/// Builds the full HTML document with every occurrence highlighted in
/// its surrounding file text. Reads the affected files from disk.
pub fn render_html(occurrences: &[CommentOccurrence]) -> Result<String> {
    let map = util::files_to_comments_map(occurrences);
    let mut html = String::from(HTML_PREFIX);
    for (path, comments) in &map {
        html.push_str(&format!("\n<h2 class=\"file\">{path}</h2>\n"));
        let text = fs::read_to_string(path)
            .with_context(|| format!("Could not read file '{path}'"))?;
        for section in highlighted_and_plain_sections(&text, comments) {
            let css_class = if section.highlight { "occurrence" } else { "plain" };
            html.push_str(&format!(
                "<span class=\"{css_class}\">{}</span>\n",
                escape_html(section.text)
            ));
        }
    }
    if map.is_empty() {
        html.push_str("<span class=\"plain\">(No comments to be removed)</span>");
    }
    html.push_str(HTML_SUFFIX);
    Ok(html)
}

fn highlighted_and_plain_sections<'a>(
    full_text: &'a str,
    comments: &[&'a CommentOccurrence],
) -> Vec<TextSection<'a>> {
    let mut result = Vec::new();
    let mut pos = 0;
    for comment in comments {
        result.push(TextSection {
            text: &full_text[pos..comment.pos.first],
            highlight: false,
        });
        result.push(TextSection {
            text: &comment.text,
            highlight: true,
        });
        pos = comment.pos.last + 1;
    }
    if pos < full_text.len() {
        result.push(TextSection {
            text: &full_text[pos..],
            highlight: false,
        });
    }
    result
}

fn escape_html(text: &str) -> String {
    text.replace('\r', "")
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace(' ', "&nbsp;")
        .replace('\t', "&nbsp;&nbsp;&nbsp;&nbsp;")
        .replace('\n', "<br/>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{CharRange, LineRange};

    fn occurrence(path: &str, first: usize, last: usize, lines: (u32, u32), text: &str) -> CommentOccurrence {
        CommentOccurrence {
            file_path: path.to_string(),
            pos: CharRange { first, last },
            lines: LineRange {
                first: lines.0,
                last: lines.1,
            },
            text: text.to_string(),
        }
    }

    #[test]
    fn beginning_line_shows_path_line_and_text() {
        let o = occurrence("/proj/src/A.kt", 0, 7, (3, 3), "//short\n");
        assert_eq!(beginning_line(&o, "/proj"), "src/A.kt:3> //short\\n");
    }

    #[test]
    fn beginning_line_truncates_long_comments() {
        let text = format!("/*{}*/", "x".repeat(50));
        let o = occurrence("/proj/A.kt", 0, 53, (1, 1), &text);
        let line = beginning_line(&o, "/proj");
        assert_eq!(line, format!("A.kt:1> /*{}...", "x".repeat(35)));
        assert_eq!(line.len(), "A.kt:1> ".len() + 40);
    }

    #[test]
    fn multiline_block_indents_all_lines() {
        let o = occurrence("/proj/A.kt", 10, 21, (3, 4), "//a\n//b\n");
        assert_eq!(
            multiline_block(&o, "/proj"),
            "A.kt:3-4>\n    //a\n    //b"
        );
    }

    #[test]
    fn multiline_block_shortens_long_comments() {
        let o = occurrence("/proj/A.kt", 0, 16, (1, 6), "/*1\n2\n3\n4\n5\n6*/");
        assert_eq!(
            multiline_block(&o, "/proj"),
            "A.kt:1-6>\n    /*1\n    2\n    [...]\n    5\n    6*/"
        );
    }

    #[test]
    fn multiline_block_expands_tabs_and_drops_carriage_returns() {
        let o = occurrence("/proj/A.kt", 0, 11, (1, 2), "//x\r\n//\ty\n");
        assert_eq!(
            multiline_block(&o, "/proj"),
            "A.kt:1-2>\n    //x\n    //    y"
        );
    }

    #[test]
    fn html_escaping() {
        assert_eq!(
            escape_html("a & <b> \"c\"\t\r\n"),
            "a&nbsp;&amp;&nbsp;&lt;b&gt;&nbsp;&quot;c&quot;&nbsp;&nbsp;&nbsp;&nbsp;<br/>"
        );
    }

    #[test]
    fn html_preview_highlights_occurrences_in_file_text() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("A.kt");
        fs::write(&file, "a /*b*/ c").unwrap();
        let path = file.to_string_lossy().to_string();

        let html = render_html(&[occurrence(&path, 2, 6, (1, 1), "/*b*/")]).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>Mothball - Comment Occurrences</h1>"));
        assert!(html.contains(&format!("<h2 class=\"file\">{path}</h2>")));
        assert!(html.contains(
            "<span class=\"plain\">a&nbsp;</span>\n<span class=\"occurrence\">/*b*/</span>\n<span class=\"plain\">&nbsp;c</span>\n"
        ));
        assert!(html.ends_with("\n</body>\n</html>"));
    }

    #[test]
    fn html_preview_without_occurrences_says_so() {
        let html = render_html(&[]).unwrap();
        assert!(html.contains("<span class=\"plain\">(No comments to be removed)</span>"));
    }

    #[test]
    fn html_format_writes_the_output_file_and_emits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("preview.html");
        let args = MothballArgs {
            format: PreviewFormat::Html,
            output: Some(output.clone()),
            ..MothballArgs::default()
        };
        let config = sample_run_config();
        let mut lines: Vec<String> = Vec::new();
        print_preview(&args, &config, &[], &mut |line| lines.push(line.to_string())).unwrap();
        assert!(lines.is_empty());
        let written = fs::read_to_string(&output).unwrap();
        assert!(written.contains("(No comments to be removed)"));
    }

    #[test]
    fn html_format_without_output_file_is_an_error() {
        let args = MothballArgs {
            format: PreviewFormat::Html,
            output: None,
            ..MothballArgs::default()
        };
        let mut emit = |_: &str| {};
        let error = print_preview(&args, &sample_run_config(), &[], &mut emit).unwrap_err();
        assert!(error.to_string().contains("an output file needs to be specified"));
    }

    fn sample_run_config() -> RunConfig {
        crate::config::parse_config(crate::config::sample_config_text()).unwrap()
    }
}
