//! Reading repository URLs from a plain-text list.

use std::path::Path;

/// Read repository URLs from `path`, one per line.
///
/// Lines are trimmed; blank lines are skipped. No URL validation happens
/// here, unsupported hosts are rejected when an import runs.
pub fn read_repo_urls(path: impl AsRef<Path>) -> std::io::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    Ok(parse_repo_urls(&contents))
}

fn parse_repo_urls(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
