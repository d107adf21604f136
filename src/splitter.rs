//! Incremental newline splitting over arbitrary byte chunks.
//!
//! Transport output arrives split at whatever boundaries the pipe reads
//! produced, so a chunk may hold zero, one, or many line endings. The
//! splitter holds the trailing fragment back until more data arrives or the
//! stream closes, which is what lets line mode prefix hosts at per-line
//! granularity instead of per-chunk.

/// Per-stream line assembly buffer.
#[derive(Debug, Default)]
pub struct LineSplitter {
    partial: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every complete line it finishes.
    ///
    /// Lines are returned in arrival order with the terminating newline
    /// stripped. Any trailing bytes after the last newline are retained for
    /// the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let mut line = std::mem::take(&mut self.partial);
            line.extend_from_slice(&rest[..pos]);
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(line);
            rest = &rest[pos + 1..];
        }
        self.partial.extend_from_slice(rest);
        lines
    }

    /// Close the stream, flushing the retained fragment as a final line.
    ///
    /// Returns `None` when nothing was pending. The splitter must not be fed
    /// again after closing.
    pub fn close(&mut self) -> Option<Vec<u8>> {
        if self.partial.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.partial))
        }
    }
}
