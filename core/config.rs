use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::CoreError;
use crate::extractor::TagPair;

const KEY_CONFIG_VERSION: &str = "mothball config version";
const KEY_ARCHIVE_ROOT_PATH: &str = "archive root path";
const KEY_SOURCE_ROOT_PATH: &str = "source root path";
const KEY_INCLUDE_PATHS: &str = "include paths";
const KEY_EXCLUDE_PATHS: &str = "exclude paths";
const KEY_INCLUDE_FILE_ENDINGS: &str = "include file endings";
const KEY_BLOCK_COMMENTS_TO_REMOVE: &str = "block comments to remove";
const KEY_BLOCK_COMMENTS_TO_KEEP: &str = "block comments to keep";
const KEY_LINE_COMMENTS_TO_REMOVE: &str = "line comments to remove";
const KEY_LINE_COMMENTS_TO_KEEP: &str = "line comments to keep";

const BLOCK_TAGS_SEPARATOR: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringMatchType {
    Exact,
    StartsWith,
    EndsWith,
    Contains,
}

/// Path filter parsed from a config entry:
/// `*x` matches endings, `x*` beginnings, `*x*` substrings, `x` exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringFilter {
    pub text: String,
    pub match_type: StringMatchType,
}

impl StringFilter {
    pub fn new(text: impl Into<String>, match_type: StringMatchType) -> Self {
        StringFilter {
            text: text.into(),
            match_type,
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self.match_type {
            StringMatchType::Exact => value == self.text,
            StringMatchType::StartsWith => value.starts_with(&self.text),
            StringMatchType::EndsWith => value.ends_with(&self.text),
            StringMatchType::Contains => value.contains(&self.text),
        }
    }

    pub fn describe(&self) -> String {
        let kind = match self.match_type {
            StringMatchType::Exact => "is",
            StringMatchType::StartsWith => "starts with",
            StringMatchType::EndsWith => "ends with",
            StringMatchType::Contains => "contains",
        };
        format!("{kind} '{}'", self.text)
    }
}

/// Validated run configuration. The root paths use forward slashes and
/// never end with a separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub archive_root_path: String,
    pub source_root_path: String,
    pub include_paths: Vec<StringFilter>,
    pub exclude_paths: Vec<StringFilter>,
    pub include_file_endings: Vec<String>,
    pub block_comments_to_remove: Vec<TagPair>,
    pub block_comments_to_keep: Vec<TagPair>,
    pub line_comments_to_remove: Vec<String>,
    pub line_comments_to_keep: Vec<String>,
}

/// A config value that may be written as a scalar or as a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Entry {
    One(String),
    Many(Vec<String>),
}

impl Entry {
    fn into_vec(self) -> Vec<String> {
        match self {
            Entry::One(value) => vec![value],
            Entry::Many(values) => values,
        }
    }
}

// Option<Option<..>> keeps "key absent" and "key present without value"
// apart: the first is an error, the second an empty list. Serde folds a
// null value into the outer Option, so present keys go through
// `present_key` to land in `Some`.
fn present_key<'de, D>(deserializer: D) -> Result<Option<Option<Entry>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Entry>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(rename = "mothball config version")]
    version: Option<serde_yaml::Value>,
    #[serde(rename = "archive root path", default, deserialize_with = "present_key")]
    archive_root_path: Option<Option<Entry>>,
    #[serde(rename = "source root path", default, deserialize_with = "present_key")]
    source_root_path: Option<Option<Entry>>,
    #[serde(rename = "include paths", default, deserialize_with = "present_key")]
    include_paths: Option<Option<Entry>>,
    #[serde(rename = "exclude paths", default, deserialize_with = "present_key")]
    exclude_paths: Option<Option<Entry>>,
    #[serde(rename = "include file endings", default, deserialize_with = "present_key")]
    include_file_endings: Option<Option<Entry>>,
    #[serde(rename = "block comments to remove", default, deserialize_with = "present_key")]
    block_comments_to_remove: Option<Option<Entry>>,
    #[serde(rename = "block comments to keep", default, deserialize_with = "present_key")]
    block_comments_to_keep: Option<Option<Entry>>,
    #[serde(rename = "line comments to remove", default, deserialize_with = "present_key")]
    line_comments_to_remove: Option<Option<Entry>>,
    #[serde(rename = "line comments to keep", default, deserialize_with = "present_key")]
    line_comments_to_keep: Option<Option<Entry>>,
}

pub fn read_config(path: &Path) -> Result<RunConfig, CoreError> {
    if !path.exists() {
        return Err(config_error(format!(
            "There is no file at location '{}'.",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(config_error(format!(
            "Location '{}' does not point to a file.",
            path.display()
        )));
    }
    let text = fs::read_to_string(path)?;
    let raw: RawConfig = serde_yaml::from_str(&text).map_err(|error| {
        config_error(format!(
            "Could not parse YAML data from '{}': {error}",
            path.display()
        ))
    })?;
    build_config(raw)
}

pub fn parse_config(text: &str) -> Result<RunConfig, CoreError> {
    let raw: RawConfig = serde_yaml::from_str(text)
        .map_err(|error| config_error(format!("Could not parse YAML data: {error}")))?;
    build_config(raw)
}

fn build_config(raw: RawConfig) -> Result<RunConfig, CoreError> {
    check_version(raw.version)?;

    let archive_root = require(raw.archive_root_path, KEY_ARCHIVE_ROOT_PATH)?;
    if archive_root.is_empty() {
        return Err(value_may_not_be_empty(KEY_ARCHIVE_ROOT_PATH));
    }
    if archive_root.len() != 1 {
        return Err(config_error(format!(
            "'{KEY_ARCHIVE_ROOT_PATH}' may only contain one item"
        )));
    }
    let source_root = require(raw.source_root_path, KEY_SOURCE_ROOT_PATH)?;
    if source_root.is_empty() {
        return Err(value_may_not_be_empty(KEY_SOURCE_ROOT_PATH));
    }
    if source_root.len() != 1 {
        return Err(config_error(format!(
            "'{KEY_SOURCE_ROOT_PATH}' may only contain one item"
        )));
    }

    let include_paths = require(raw.include_paths, KEY_INCLUDE_PATHS)?;
    if include_paths.is_empty() {
        return Err(value_may_not_be_empty(KEY_INCLUDE_PATHS));
    }
    let exclude_paths = require(raw.exclude_paths, KEY_EXCLUDE_PATHS)?;
    let endings = require(raw.include_file_endings, KEY_INCLUDE_FILE_ENDINGS)?;
    if endings.is_empty() {
        return Err(value_may_not_be_empty(KEY_INCLUDE_FILE_ENDINGS));
    }

    let block_comments_to_remove =
        parse_block_comments(require(raw.block_comments_to_remove, KEY_BLOCK_COMMENTS_TO_REMOVE)?)?;
    let block_comments_to_keep =
        parse_block_comments(require(raw.block_comments_to_keep, KEY_BLOCK_COMMENTS_TO_KEEP)?)?;
    let line_comments_to_remove =
        require(raw.line_comments_to_remove, KEY_LINE_COMMENTS_TO_REMOVE)?;
    let line_comments_to_keep = require(raw.line_comments_to_keep, KEY_LINE_COMMENTS_TO_KEEP)?;
    check_no_empty_tags(&line_comments_to_remove, KEY_LINE_COMMENTS_TO_REMOVE)?;
    check_no_empty_tags(&line_comments_to_keep, KEY_LINE_COMMENTS_TO_KEEP)?;

    let include_filters = parse_filters(include_paths, KEY_INCLUDE_PATHS)?;
    for filter in &include_filters {
        if filter.match_type == StringMatchType::Exact {
            return Err(config_error(format!(
                "Wrong include path '{}': All include paths must contain an asterisk ('*'). Example: 'src/main/java/*'",
                filter.text
            )));
        }
    }
    let exclude_filters = parse_filters(exclude_paths, KEY_EXCLUDE_PATHS)?;

    let include_file_endings = endings
        .iter()
        .map(|item| parse_file_ending(item))
        .collect::<Result<Vec<_>, _>>()?;

    check_unique_start_tags(
        &block_comments_to_remove,
        &block_comments_to_keep,
        &line_comments_to_remove,
        &line_comments_to_keep,
    )?;

    Ok(RunConfig {
        archive_root_path: normalize_root(&archive_root[0]),
        source_root_path: normalize_root(&source_root[0]),
        include_paths: include_filters,
        exclude_paths: exclude_filters,
        include_file_endings,
        block_comments_to_remove,
        block_comments_to_keep,
        line_comments_to_remove,
        line_comments_to_keep,
    })
}

fn config_error(message: impl Into<String>) -> CoreError {
    CoreError::Config {
        message: message.into(),
    }
}

fn value_may_not_be_empty(key: &str) -> CoreError {
    config_error(format!("Value of '{key}' may not be empty"))
}

fn require(field: Option<Option<Entry>>, key: &str) -> Result<Vec<String>, CoreError> {
    match field {
        None => Err(config_error(format!("Missing definition of '{key}'"))),
        Some(None) => Ok(Vec::new()),
        Some(Some(entry)) => Ok(entry.into_vec()),
    }
}

fn check_version(value: Option<serde_yaml::Value>) -> Result<(), CoreError> {
    use serde_yaml::Value;

    let value = value
        .ok_or_else(|| config_error(format!("Missing definition of '{KEY_CONFIG_VERSION}'")))?;
    let version = match &value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        Value::Sequence(items) if items.len() == 1 => match &items[0] {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        },
        _ => None,
    };
    if version != Some(1) {
        return Err(config_error(format!(
            "Value of '{KEY_CONFIG_VERSION}' must be 1"
        )));
    }
    Ok(())
}

fn parse_block_comments(items: Vec<String>) -> Result<Vec<TagPair>, CoreError> {
    items
        .iter()
        .map(|item| {
            let parts: Vec<&str> = item.split(BLOCK_TAGS_SEPARATOR).collect();
            if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
                return Err(config_error(format!(
                    "Could not read comment start and end from '{item}'. Expected format 'start...end' as e.g. in '/*...*/'"
                )));
            }
            Ok(TagPair::new(parts[0], parts[1]))
        })
        .collect()
}

fn check_no_empty_tags(tags: &[String], key: &str) -> Result<(), CoreError> {
    if tags.iter().any(String::is_empty) {
        return Err(config_error(format!(
            "Value of '{key}' may not contain empty entries"
        )));
    }
    Ok(())
}

fn parse_filters(items: Vec<String>, key: &str) -> Result<Vec<StringFilter>, CoreError> {
    items
        .iter()
        .map(|item| parse_filter(&item.replace('\\', "/"), key))
        .collect()
}

fn parse_filter(item: &str, key: &str) -> Result<StringFilter, CoreError> {
    if item == "*" {
        return Ok(StringFilter::new("", StringMatchType::Contains));
    }
    if item.is_empty() {
        return Err(filter_error(key, "the filter may not be empty"));
    }

    let asterisks = item.matches('*').count();
    let plain = item.replace('*', "");

    if item.starts_with('*') && item.ends_with('*') && asterisks == 2 {
        return Ok(StringFilter::new(plain, StringMatchType::Contains));
    }
    if asterisks > 1 {
        return Err(filter_error(key, "there may only be 1 '*' per filter"));
    }

    let match_type = if asterisks == 0 {
        StringMatchType::Exact
    } else if item.starts_with('*') {
        StringMatchType::EndsWith
    } else if item.ends_with('*') {
        StringMatchType::StartsWith
    } else {
        return Err(filter_error(
            key,
            "the '*' may only occur at the beginning and/or at the end",
        ));
    };
    Ok(StringFilter::new(plain, match_type))
}

fn filter_error(key: &str, reason: &str) -> CoreError {
    config_error(format!("Could not read filter in {key}: {reason}"))
}

fn parse_file_ending(item: &str) -> Result<String, CoreError> {
    if !item.starts_with('*') {
        return Err(config_error(format!(
            "Wrong file ending '{item}'. File ending must start with '*.'"
        )));
    }
    if item.matches('*').count() > 1 {
        return Err(config_error(format!(
            "Wrong file ending '{item}'. File ending may only contain 1 '*'."
        )));
    }
    Ok(item.replace('*', ""))
}

fn check_unique_start_tags(
    block_remove: &[TagPair],
    block_keep: &[TagPair],
    line_remove: &[String],
    line_keep: &[String],
) -> Result<(), CoreError> {
    let mut seen = std::collections::HashSet::new();
    let all_starts = block_remove
        .iter()
        .map(|pair| pair.start.as_str())
        .chain(block_keep.iter().map(|pair| pair.start.as_str()))
        .chain(line_remove.iter().map(String::as_str))
        .chain(line_keep.iter().map(String::as_str));
    for start in all_starts {
        if !seen.insert(start) {
            return Err(config_error(format!(
                "The start tags of all comments need to be unique, but '{start}' occurs multiple times"
            )));
        }
    }
    Ok(())
}

fn normalize_root(path: &str) -> String {
    let forward = path.replace('\\', "/");
    match forward.strip_suffix('/') {
        Some(stripped) => stripped.to_string(),
        None => forward.to_string(),
    }
}

/// Writes the sample config, creating missing parent directories.
pub fn write_sample_config(path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|_| {
                config_error(format!(
                    "Could not find or create parent directory of path '{}'",
                    path.display()
                ))
            })?;
        }
    }
    fs::write(path, sample_config_text())?;
    Ok(())
}

pub fn sample_config_text() -> &'static str {
    r#"mothball config version: 1
archive root path: /home/me/my-archive-for-project-abc
source root path: /home/me/my-project-abc
include paths:
  - /src/main/java/*
  - /src/main/kotlin/*
  - /src/test/java/*
  - /src/test/kotlin/*
exclude paths:
  - "*/gen/*"
  - "*IntegrationTest.*"
include file endings:
  - "*.kt"
  - "*.java"
block comments to remove:
  - /*...*/
block comments to keep:
  - /**...*/
line comments to remove:
  - //
line comments to keep:
  - "//:"
  - //*
"#
}
