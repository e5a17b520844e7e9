pub mod archiver;
pub mod config;
pub mod editor;
pub mod extractor;
pub mod file_finder;
pub mod preview;
pub mod processor;
pub mod scanner;
pub mod util;

pub use archiver::{archive_comments, create_run_id};
pub use config::{RunConfig, StringFilter, StringMatchType, read_config, write_sample_config};
pub use editor::{EditError, remove_occurrences};
pub use extractor::{CharRange, CommentOccurrence, LineRange, OccurrenceExtractor, TagPair};

pub use file_finder::{
    Action, CliArgs, Command, CompletionArgs, MothballArgs, PreviewFormat, SourceFiles,
    find_source_files,
};

pub use preview::{print_preview, render_html};
pub use processor::run;
pub use scanner::{ScanOutcome, TagScanner};

#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{message}")]
    Config { message: String },
}
