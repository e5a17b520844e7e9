use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;

const CONFIG_FILE_ENDINGS: &[&str] = &[".yaml", ".yml"];

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    about = "Finds, previews and archives commented-out code (main arguments)",
    long_about = "These are the main arguments for previewing and archiving commented-out code."
)]
pub struct MothballArgs {
    #[clap(
        short = 'a',
        long = "action",
        value_enum,
        help = "Action to perform: p = preview occurrences, a = archive occurrences, c = write a sample config file"
    )]
    pub action: Option<Action>,

    #[clap(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to the YAML config file (must end in .yaml or .yml)"
    )]
    pub config: Option<PathBuf>,

    #[clap(
        short = 'f',
        long = "format",
        value_enum,
        default_value = "m",
        help = "Preview format: b = beginning of text, m = multiline, h = HTML"
    )]
    pub format: PreviewFormat,

    #[clap(
        short = 'o',
        long = "output",
        value_name = "FILE",
        help = "Path of the output file (required for HTML previews and sample config files)"
    )]
    pub output: Option<PathBuf>,

    #[clap(long, help = "Skip the confirmation prompt")]
    pub no_confirm: bool,
}

impl Default for MothballArgs {
    fn default() -> Self {
        MothballArgs {
            action: None,
            config: None,
            format: PreviewFormat::Multiline,
            output: None,
            no_confirm: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    #[clap(name = "p", alias = "preview")]
    Preview,
    #[clap(name = "a", alias = "archive")]
    Archive,
    #[clap(name = "c", alias = "sample-config")]
    WriteSampleConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PreviewFormat {
    #[clap(name = "b", alias = "beginning")]
    BeginningOfText,
    #[clap(name = "m", alias = "multiline")]
    Multiline,
    #[clap(name = "h", alias = "html")]
    Html,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    #[clap(about = "Generate shell completion scripts")]
    Completion(CompletionArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct CompletionArgs {
    #[clap(value_parser = clap::value_parser!(clap_complete::Shell))]
    pub shell: clap_complete::Shell,
}

#[derive(Debug, Parser, Clone)]
#[clap(
    name = "mothball",
    version = "0.1.0",
    about = "Finds, previews and archives commented-out code",
    long_about = "Scans source files for commented-out code based on configured comment tags.\nOccurrences can be previewed in several formats or moved into an archive directory.",
    propagate_version = true
)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub command: Option<Command>,

    #[clap(flatten)]
    pub main_opts: MothballArgs,
}

impl MothballArgs {
    /// Checks that the given options form a usable combination and
    /// returns the selected action.
    pub fn checked_action(&self) -> Result<Action> {
        let action = match self.action {
            Some(action) => action,
            None => anyhow::bail!("Missing action parameter '-a'"),
        };
        if action != Action::WriteSampleConfig {
            let config = match &self.config {
                Some(config) => config,
                None => anyhow::bail!("Missing config file path parameter '-c'"),
            };
            let name = config.to_string_lossy();
            if !CONFIG_FILE_ENDINGS.iter().any(|e| name.ends_with(e)) {
                anyhow::bail!(
                    "Config filename must have one of these endings: {}",
                    CONFIG_FILE_ENDINGS.join(", ")
                );
            }
        }
        if self.format == PreviewFormat::Html {
            let output = match &self.output {
                Some(output) => output,
                None => anyhow::bail!(
                    "If preview format is HTML, an output file needs to be specified. Parameter: '-o'"
                ),
            };
            if !output.to_string_lossy().to_lowercase().ends_with(".html") {
                anyhow::bail!(
                    "If preview format is HTML the file ending of the output file must be '.html'"
                );
            }
        }
        Ok(action)
    }
}

#[derive(Debug)]
pub struct SourceFiles {
    /// Number of files below the source root that pass the path filters.
    pub total: usize,
    /// Files that also pass the file ending filter, sorted by path.
    pub matching: Vec<PathBuf>,
}

pub fn find_source_files(config: &RunConfig) -> Result<SourceFiles> {
    let root = Path::new(&config.source_root_path);
    if !root.is_dir() {
        anyhow::bail!(
            "Source dir '{}' is not a valid directory",
            config.source_root_path
        );
    }
    let mut w = WalkBuilder::new(root);
    w.standard_filters(false);
    w.hidden(false);
    let mut total = 0;
    let mut matching = Vec::new();
    for i in w.build() {
        let e = match i {
            Ok(e) => e,
            Err(e) => {
                eprintln!("Warn: {}", e);
                continue;
            }
        };
        if !e.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let relative = match e.path().strip_prefix(root) {
            Ok(r) => r.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };
        // Path filters see the sub path with a leading slash, the ending
        // filter sees it without.
        let sub_path = format!("/{relative}");
        if !matches_path_filters(&sub_path, config) {
            continue;
        }
        total += 1;
        if matches_ending(&relative, &config.include_file_endings) {
            matching.push(e.into_path());
        }
    }
    matching.sort();
    Ok(SourceFiles { total, matching })
}

fn matches_path_filters(sub_path: &str, config: &RunConfig) -> bool {
    if !config.include_paths.is_empty()
        && !config.include_paths.iter().any(|f| f.matches(sub_path))
    {
        return false;
    }
    config.exclude_paths.iter().all(|f| !f.matches(sub_path))
}

fn matches_ending(relative: &str, endings: &[String]) -> bool {
    endings.iter().any(|ending| relative.ends_with(ending))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StringFilter, StringMatchType};
    use std::fs;

    fn args_for(action: Option<Action>) -> MothballArgs {
        MothballArgs {
            action,
            ..MothballArgs::default()
        }
    }

    #[test]
    fn action_is_required() {
        let error = args_for(None).checked_action().unwrap_err();
        assert!(error.to_string().contains("Missing action parameter '-a'"));
    }

    #[test]
    fn config_is_required_for_preview_and_archive() {
        for action in [Action::Preview, Action::Archive] {
            let error = args_for(Some(action)).checked_action().unwrap_err();
            assert!(error
                .to_string()
                .contains("Missing config file path parameter '-c'"));
        }
    }

    #[test]
    fn sample_config_action_needs_no_config() {
        let action = args_for(Some(Action::WriteSampleConfig))
            .checked_action()
            .unwrap();
        assert_eq!(action, Action::WriteSampleConfig);
    }

    #[test]
    fn config_file_ending_is_checked() {
        let mut args = args_for(Some(Action::Preview));
        args.config = Some(PathBuf::from("settings.txt"));
        let error = args.checked_action().unwrap_err();
        assert!(error
            .to_string()
            .contains("Config filename must have one of these endings"));

        args.config = Some(PathBuf::from("settings.yml"));
        assert_eq!(args.checked_action().unwrap(), Action::Preview);
    }

    #[test]
    fn html_format_requires_html_output_file() {
        let mut args = args_for(Some(Action::Preview));
        args.config = Some(PathBuf::from("settings.yaml"));
        args.format = PreviewFormat::Html;
        let error = args.checked_action().unwrap_err();
        assert!(error
            .to_string()
            .contains("an output file needs to be specified"));

        args.output = Some(PathBuf::from("out.txt"));
        let error = args.checked_action().unwrap_err();
        assert!(error.to_string().contains("must be '.html'"));

        args.output = Some(PathBuf::from("out.HTML"));
        assert_eq!(args.checked_action().unwrap(), Action::Preview);
    }

    #[test]
    fn short_option_names_are_parsed() {
        let cli = CliArgs::try_parse_from([
            "mothball", "-a", "p", "-c", "mothball.yaml", "-f", "b",
        ])
        .unwrap();
        assert_eq!(cli.main_opts.action, Some(Action::Preview));
        assert_eq!(cli.main_opts.format, PreviewFormat::BeginningOfText);
        assert_eq!(cli.main_opts.config, Some(PathBuf::from("mothball.yaml")));
    }

    fn write_file(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn finder_config(root: &Path) -> RunConfig {
        RunConfig {
            archive_root_path: "/archive".to_string(),
            source_root_path: root.to_string_lossy().replace('\\', "/"),
            include_paths: vec![
                StringFilter::new("/src/main/java/", StringMatchType::StartsWith),
                StringFilter::new("/src/main/kotlin/", StringMatchType::StartsWith),
            ],
            exclude_paths: vec![StringFilter::new("/gen/", StringMatchType::Contains)],
            include_file_endings: vec![".kt".to_string()],
            block_comments_to_remove: Vec::new(),
            block_comments_to_keep: Vec::new(),
            line_comments_to_remove: Vec::new(),
            line_comments_to_keep: Vec::new(),
        }
    }

    #[test]
    fn files_are_filtered_by_path_and_ending() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_file(&root.join("src/main/java/App.kt"), "x");
        write_file(&root.join("src/main/java/Readme.md"), "x");
        write_file(&root.join("src/main/java/gen/Gen.kt"), "x");
        write_file(&root.join("src/main/kotlin/Lib.kt"), "x");
        write_file(&root.join("docs/Notes.kt"), "x");

        let found = find_source_files(&finder_config(root)).unwrap();
        assert_eq!(found.total, 3);
        assert_eq!(
            found.matching,
            vec![
                root.join("src/main/java/App.kt"),
                root.join("src/main/kotlin/Lib.kt"),
            ]
        );
    }

    #[test]
    fn missing_source_root_is_an_error() {
        let error = find_source_files(&finder_config(Path::new("/no/such/dir"))).unwrap_err();
        assert!(error.to_string().contains("is not a valid directory"));
    }
}
