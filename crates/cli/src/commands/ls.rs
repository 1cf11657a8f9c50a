//! ls command - List entries under a prefix
//!
//! Pages are fetched lazily from the store, so `--limit` stops listing early on large prefixes.

use std::path::PathBuf;

use clap::Args;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets};
use cosn_core::{FileMetadata, ListMode};
use futures::StreamExt;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, format_size, format_time};

/// List entries under a prefix
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Prefix to list
    #[arg(default_value = "/")]
    pub prefix: String,

    /// List every key under the prefix instead of grouping by directory
    #[arg(short, long)]
    pub recursive: bool,

    /// Entries requested per page
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_keys: u32,

    /// Stop after this many entries
    #[arg(long)]
    pub limit: Option<usize>,

    /// Only show entries whose name matches this glob
    #[arg(short = 'P', long)]
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize)]
struct LsEntry {
    key: String,
    is_dir: bool,
    size_bytes: u64,
    last_modified: String,
}

impl From<&FileMetadata> for LsEntry {
    fn from(meta: &FileMetadata) -> Self {
        Self {
            key: meta.key.clone(),
            is_dir: meta.is_dir(),
            size_bytes: meta.size,
            last_modified: meta.mod_time.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct LsOutput {
    prefix: String,
    entries: Vec<LsEntry>,
    total_size: u64,
    truncated: bool,
}

/// Last path component, ignoring a trailing delimiter
fn entry_name(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

fn matches_pattern(pattern: Option<&glob::Pattern>, key: &str) -> bool {
    pattern.is_none_or(|p| p.matches(entry_name(key)))
}

/// Execute the ls command
pub async fn execute(args: LsArgs, config: Option<PathBuf>, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let pattern = match args.pattern.as_deref().map(glob::Pattern::new).transpose() {
        Ok(pattern) => pattern,
        Err(e) => {
            formatter.error(&format!("Invalid pattern: {e}"));
            return ExitCode::UsageError;
        }
    };

    let store = match super::open_store(config, &formatter).await {
        Ok(store) => store,
        Err(code) => return code,
    };

    let mode = ListMode::recursive(args.recursive);
    let mut pages = std::pin::pin!(store.list_pages(&args.prefix, mode, args.max_keys));
    let mut entries: Vec<FileMetadata> = Vec::new();
    let mut truncated = false;

    while let Some(page) = pages.next().await {
        let page = match page {
            Ok(page) => page,
            Err(e) => return super::fail(&formatter, "Failed to list", &e),
        };

        entries.extend(
            page.common_prefixes
                .into_iter()
                .chain(page.files)
                .filter(|meta| matches_pattern(pattern.as_ref(), &meta.key)),
        );

        if let Some(limit) = args.limit
            && entries.len() >= limit
        {
            truncated = entries.len() > limit || page.next_marker.is_some();
            entries.truncate(limit);
            break;
        }
    }

    entries.sort_by(|a, b| a.key.cmp(&b.key));
    let total_size = entries.iter().map(|e| e.size).sum();

    if formatter.is_json() {
        formatter.json(&LsOutput {
            prefix: args.prefix.clone(),
            entries: entries.iter().map(LsEntry::from).collect(),
            total_size,
            truncated,
        });
        return ExitCode::Success;
    }

    if entries.is_empty() {
        return ExitCode::Success;
    }

    formatter.line(&render_table(&entries, formatter.colors_enabled()).to_string());
    if truncated {
        formatter.warning(&format!("Output limited to {} entries", entries.len()));
    }
    ExitCode::Success
}

fn render_table(entries: &[FileMetadata], colors: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(vec!["Modified", "Size", "Name"]);
    if !colors {
        table.force_no_tty();
    }

    for entry in entries {
        let (size, name) = if entry.is_dir() {
            (
                Cell::new("DIR"),
                Cell::new(&entry.key)
                    .fg(Color::Blue)
                    .add_attribute(Attribute::Bold),
            )
        } else {
            (
                Cell::new(format_size(entry.size)).fg(Color::Green),
                Cell::new(&entry.key),
            )
        };
        let modified = if entry.is_dir() && entry.mod_time == jiff::Timestamp::UNIX_EPOCH {
            Cell::new("")
        } else {
            Cell::new(format_time(entry.mod_time)).add_attribute(Attribute::Dim)
        };
        table.add_row(vec![modified, size, name]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_name() {
        assert_eq!(entry_name("/logs/2024/app.log"), "app.log");
        assert_eq!(entry_name("/logs/2024/"), "2024");
        assert_eq!(entry_name("plain"), "plain");
    }

    #[test]
    fn test_matches_pattern() {
        let pattern = glob::Pattern::new("*.log").unwrap();
        assert!(matches_pattern(Some(&pattern), "/logs/app.log"));
        assert!(!matches_pattern(Some(&pattern), "/logs/app.txt"));
        assert!(matches_pattern(None, "/anything"));

        let dirs = glob::Pattern::new("20*").unwrap();
        assert!(matches_pattern(Some(&dirs), "/logs/2024/"));
    }

    #[test]
    fn test_render_table() {
        let entries = vec![
            FileMetadata::common_prefix("/logs/2024/"),
            FileMetadata::file("/logs/app.log", 2048, None),
        ];
        let rendered = render_table(&entries, false).to_string();
        assert!(rendered.contains("DIR"));
        assert!(rendered.contains("/logs/2024/"));
        assert!(rendered.contains("2 KiB"));
        assert!(rendered.contains("/logs/app.log"));
    }

    #[test]
    fn test_ls_entry_json() {
        let entry = LsEntry::from(&FileMetadata::common_prefix("/a/"));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["is_dir"], true);
        assert_eq!(json["size_bytes"], 0);
    }
}
