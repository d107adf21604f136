//! Drain-time reporting.
//!
//! Join mode partitions jobs by byte-identical accumulated output: a single
//! hash pass, never pairwise comparison. Group order follows the first job
//! to produce each distinct text.

use std::collections::HashMap;
use std::io::{self, Write};

/// Hosts sharing one byte-identical output text.
#[derive(Debug, PartialEq, Eq)]
pub struct OutputGroup<'a> {
    pub hosts: Vec<&'a str>,
    pub output: &'a [u8],
}

/// Partition `(host, output)` entries into groups of identical output.
///
/// The empty output is a valid group. Entries are visited in order, so the
/// first entry with a given text fixes that group's position.
pub fn group_by_output(entries: &[(String, Vec<u8>)]) -> Vec<OutputGroup<'_>> {
    let mut index: HashMap<&[u8], usize> = HashMap::new();
    let mut groups: Vec<OutputGroup<'_>> = Vec::new();
    for (host, output) in entries {
        match index.get(output.as_slice()) {
            Some(&slot) => groups[slot].hosts.push(host),
            None => {
                index.insert(output, groups.len());
                groups.push(OutputGroup {
                    hosts: vec![host],
                    output,
                });
            }
        }
    }
    groups
}

/// Print each group as a `[host,host]` header followed by the shared text.
pub fn write_summary<W: Write>(w: &mut W, groups: &[OutputGroup<'_>]) -> io::Result<()> {
    for group in groups {
        writeln!(w, "[{}]", group.hosts.join(","))?;
        w.write_all(group.output)?;
        if !group.output.is_empty() && group.output.last() != Some(&b'\n') {
            w.write_all(b"\n")?;
        }
    }
    Ok(())
}

/// The observational progress line. Never touches dispatch state.
pub fn write_progress<W: Write>(w: &mut W, completed: usize, total: usize) -> io::Result<()> {
    writeln!(w, "finished {completed}/{total}")
}
