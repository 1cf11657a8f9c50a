//! mkdir command - Create directory markers

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Create directories
#[derive(Args, Debug)]
pub struct MkdirArgs {
    /// Directories to create
    #[arg(required = true)]
    pub keys: Vec<String>,

    /// Also create a marker for every missing parent directory
    #[arg(short, long)]
    pub parents: bool,
}

#[derive(Debug, Serialize)]
struct MkdirOutput {
    created: Vec<String>,
}

/// Directory keys to create for `key`, outermost first
fn markers_for(key: &str, parents: bool) -> Vec<String> {
    let trimmed = key.trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    if !parents {
        return vec![format!("/{trimmed}/")];
    }

    let mut path = String::from("/");
    trimmed
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            path.push_str(segment);
            path.push('/');
            path.clone()
        })
        .collect()
}

/// Execute the mkdir command
pub async fn execute(args: MkdirArgs, config: Option<PathBuf>, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let store = match super::open_store(config, &formatter).await {
        Ok(store) => store,
        Err(code) => return code,
    };

    let mut created = Vec::new();
    for key in &args.keys {
        for marker in markers_for(key, args.parents) {
            if args.parents {
                match store.retrieve_metadata(&marker).await {
                    Ok(Some(_)) => continue,
                    Ok(None) => {}
                    Err(e) => return super::fail(&formatter, "Failed to stat", &e),
                }
            }
            if let Err(e) = store.store_empty_file(&marker).await {
                return super::fail(&formatter, "Failed to create directory", &e);
            }
            formatter.success(&format!("Created {}", formatter.style_dir(&marker)));
            created.push(marker);
        }
    }

    if formatter.is_json() {
        formatter.json(&MkdirOutput { created });
    }
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_single() {
        assert_eq!(markers_for("/a/b", false), vec!["/a/b/"]);
        assert_eq!(markers_for("a/b/", false), vec!["/a/b/"]);
        assert!(markers_for("/", false).is_empty());
    }

    #[test]
    fn test_markers_with_parents() {
        assert_eq!(markers_for("/a/b/c", true), vec!["/a/", "/a/b/", "/a/b/c/"]);
        assert_eq!(markers_for("a//b", true), vec!["/a/", "/a/b/"]);
    }
}
