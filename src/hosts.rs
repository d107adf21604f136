//! Host list loading.
//!
//! One host per line, read from a file or stdin. Blank lines and `#`
//! comments are skipped; order of first appearance is the dispatch order and
//! duplicates are kept, each becoming its own job.

use crate::error::HostListError;
use std::io::Read;
use std::path::Path;

pub fn load_hosts(path: Option<&Path>) -> Result<Vec<String>, HostListError> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path).map_err(|source| HostListError::Read {
            path: path.display().to_string(),
            source,
        })?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(HostListError::Stdin)?;
            buf
        }
    };
    Ok(parse_hosts(&raw))
}

fn parse_hosts(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
