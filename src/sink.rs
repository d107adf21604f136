//! Output aggregation policies.
//!
//! Every running job feeds `(job, host, stream, chunk)` events into one
//! sink. The sink decides what to render immediately and what to buffer:
//!
//! - [`LineSink`] interleaves hosts at line granularity, prefixing each line.
//! - [`GroupSink`] streams raw chunks, writing a host header only when the
//!   writing host changes.
//! - [`JoinSink`] buffers everything and defers rendering to the drain-time
//!   summary, which joins hosts with byte-identical output.
//!
//! Sinks are generic over their writers so tests capture output instead of
//! printing.

use crate::splitter::LineSplitter;
use crate::summary;
use std::collections::HashMap;
use std::io::{self, Write};
use std::time::Duration;

/// Index of a job in the run's canonical host order.
///
/// Accumulation and header tracking key off this, not the host string, so
/// duplicate host entries in the input list stay independent jobs.
pub type JobId = usize;

/// Which of the child's two output channels a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamSource {
    Stdout,
    Stderr,
}

/// Consumer of job output and completion events.
///
/// `on_job_complete` is guaranteed to arrive after every data event for that
/// job, exactly once per job. `finish` runs once at drain.
pub trait OutputSink: Send {
    fn on_data(
        &mut self,
        job: JobId,
        host: &str,
        source: StreamSource,
        chunk: &[u8],
    ) -> io::Result<()>;

    fn on_job_complete(
        &mut self,
        job: JobId,
        host: &str,
        status: i32,
        duration: Duration,
    ) -> io::Result<()>;

    fn finish(&mut self) -> io::Result<()>;
}

fn report_exit<E: Write>(err: &mut E, host: &str, status: i32) -> io::Result<()> {
    writeln!(err, "[{host}] exited with code {status}")
}

/// Line mode: one `LineSplitter` per (job, stream), each complete line
/// written immediately as `[host] line` to the matching output channel.
pub struct LineSink<W, E> {
    out: W,
    err: E,
    silent: bool,
    report_exit_codes: bool,
    splitters: HashMap<(JobId, StreamSource), LineSplitter>,
}

impl<W: Write + Send, E: Write + Send> LineSink<W, E> {
    pub fn new(out: W, err: E, silent: bool, report_exit_codes: bool) -> Self {
        Self {
            out,
            err,
            silent,
            report_exit_codes,
            splitters: HashMap::new(),
        }
    }

    /// Recover the writers, for callers that captured output.
    pub fn into_writers(self) -> (W, E) {
        (self.out, self.err)
    }

    fn write_line(&mut self, host: &str, source: StreamSource, line: &[u8]) -> io::Result<()> {
        let target: &mut dyn Write = match source {
            StreamSource::Stdout => &mut self.out,
            StreamSource::Stderr => &mut self.err,
        };
        target.write_all(format!("[{host}] ").as_bytes())?;
        target.write_all(line)?;
        target.write_all(b"\n")
    }
}

impl<W: Write + Send, E: Write + Send> OutputSink for LineSink<W, E> {
    fn on_data(
        &mut self,
        job: JobId,
        host: &str,
        source: StreamSource,
        chunk: &[u8],
    ) -> io::Result<()> {
        if self.silent {
            return Ok(());
        }
        let lines = self
            .splitters
            .entry((job, source))
            .or_default()
            .feed(chunk);
        for line in lines {
            self.write_line(host, source, &line)?;
        }
        Ok(())
    }

    fn on_job_complete(
        &mut self,
        job: JobId,
        host: &str,
        status: i32,
        _duration: Duration,
    ) -> io::Result<()> {
        // Flush unterminated trailing fragments as final lines.
        for source in [StreamSource::Stdout, StreamSource::Stderr] {
            if let Some(mut splitter) = self.splitters.remove(&(job, source)) {
                if let Some(line) = splitter.close() {
                    if !self.silent {
                        self.write_line(host, source, &line)?;
                    }
                }
            }
        }
        if self.report_exit_codes {
            report_exit(&mut self.err, host, status)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()?;
        self.err.flush()
    }
}

/// Group mode: raw chunks streamed live, a `[host]` header emitted only when
/// the immediately previous chunk came from a different job.
///
/// Rapidly interleaving hosts still repeat headers; that is the cost of
/// streaming grouped output live instead of buffering.
pub struct GroupSink<W, E> {
    out: W,
    err: E,
    silent: bool,
    report_exit_codes: bool,
    last_written: Option<JobId>,
}

impl<W: Write + Send, E: Write + Send> GroupSink<W, E> {
    pub fn new(out: W, err: E, silent: bool, report_exit_codes: bool) -> Self {
        Self {
            out,
            err,
            silent,
            report_exit_codes,
            last_written: None,
        }
    }

    pub fn into_writers(self) -> (W, E) {
        (self.out, self.err)
    }
}

impl<W: Write + Send, E: Write + Send> OutputSink for GroupSink<W, E> {
    fn on_data(
        &mut self,
        job: JobId,
        host: &str,
        source: StreamSource,
        chunk: &[u8],
    ) -> io::Result<()> {
        let target: &mut dyn Write = match source {
            StreamSource::Stdout => &mut self.out,
            StreamSource::Stderr => &mut self.err,
        };
        if self.last_written != Some(job) {
            writeln!(target, "[{host}]")?;
            self.last_written = Some(job);
        }
        if !self.silent {
            target.write_all(chunk)?;
        }
        Ok(())
    }

    fn on_job_complete(
        &mut self,
        _job: JobId,
        host: &str,
        status: i32,
        _duration: Duration,
    ) -> io::Result<()> {
        if self.report_exit_codes {
            report_exit(&mut self.err, host, status)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()?;
        self.err.flush()
    }
}

/// Join mode: accumulate every chunk (stdout and stderr merged) per job,
/// render nothing until drain, then print hosts grouped by identical output.
pub struct JoinSink<W, E> {
    out: W,
    err: E,
    report_exit_codes: bool,
    total: usize,
    completed: usize,
    // Accumulators in discovery order, indexed through `slots`.
    slots: HashMap<JobId, usize>,
    entries: Vec<(String, Vec<u8>)>,
}

impl<W: Write + Send, E: Write + Send> JoinSink<W, E> {
    pub fn new(out: W, err: E, total: usize, report_exit_codes: bool) -> Self {
        Self {
            out,
            err,
            report_exit_codes,
            total,
            completed: 0,
            slots: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn into_writers(self) -> (W, E) {
        (self.out, self.err)
    }

    fn slot(&mut self, job: JobId, host: &str) -> usize {
        *self.slots.entry(job).or_insert_with(|| {
            self.entries.push((host.to_string(), Vec::new()));
            self.entries.len() - 1
        })
    }
}

impl<W: Write + Send, E: Write + Send> OutputSink for JoinSink<W, E> {
    fn on_data(
        &mut self,
        job: JobId,
        host: &str,
        _source: StreamSource,
        chunk: &[u8],
    ) -> io::Result<()> {
        let slot = self.slot(job, host);
        self.entries[slot].1.extend_from_slice(chunk);
        Ok(())
    }

    fn on_job_complete(
        &mut self,
        job: JobId,
        host: &str,
        status: i32,
        _duration: Duration,
    ) -> io::Result<()> {
        // A job that produced no output still needs an accumulator entry;
        // the empty string is a valid summary group.
        self.slot(job, host);
        self.completed += 1;
        summary::write_progress(&mut self.err, self.completed, self.total)?;
        if self.report_exit_codes {
            report_exit(&mut self.err, host, status)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        let groups = summary::group_by_output(&self.entries);
        summary::write_summary(&mut self.out, &groups)?;
        self.out.flush()?;
        self.err.flush()
    }
}
