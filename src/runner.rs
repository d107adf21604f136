//! Per-host job execution.
//!
//! A job spawns the transport process with piped stdio, pumps both output
//! streams to the dispatcher's event channel as raw chunks, and reports its
//! exit exactly once. All chunk events for a job precede its exit event;
//! nothing here touches shared state, only the channel.

use crate::command::CommandTemplate;
use crate::sink::{JobId, StreamSource};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Exit status recorded when the transport cannot be spawned at all.
pub const SPAWN_FAILURE_STATUS: i32 = 127;

const CHUNK_SIZE: usize = 8192;

/// Event delivered from a job task to the dispatcher loop.
#[derive(Debug)]
pub enum JobEvent {
    Data {
        job: JobId,
        source: StreamSource,
        chunk: Vec<u8>,
    },
    Exited {
        job: JobId,
        status: i32,
        duration: Duration,
    },
}

/// Spawn one job's transport process and stream its events.
///
/// The returned handle is for the pump task itself; completion is signalled
/// through the channel, not the handle. A spawn failure is reported as a
/// normal exit with [`SPAWN_FAILURE_STATUS`].
pub fn spawn_job(
    job: JobId,
    host: String,
    template: &CommandTemplate,
    events: mpsc::Sender<JobEvent>,
) -> JoinHandle<()> {
    let program = template.program().to_string();
    let args = template.args_for(&host);
    tokio::spawn(async move {
        let started = Instant::now();
        tracing::debug!(host = %host, "spawning: {} {}", program, args.join(" "));

        let mut child = match Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(host = %host, "failed to spawn {}: {}", program, e);
                let _ = events
                    .send(JobEvent::Exited {
                        job,
                        status: SPAWN_FAILURE_STATUS,
                        duration: started.elapsed(),
                    })
                    .await;
                return;
            }
        };

        let stdout_pump = pump_stream(job, StreamSource::Stdout, child.stdout.take(), events.clone());
        let stderr_pump = pump_stream(job, StreamSource::Stderr, child.stderr.take(), events.clone());

        let status = match child.wait().await {
            Ok(status) => exit_code(status),
            Err(e) => {
                tracing::warn!(host = %host, "wait failed: {}", e);
                SPAWN_FAILURE_STATUS
            }
        };

        // Both pumps drain to EOF before the exit event goes out, so every
        // chunk for this job is already on the channel.
        let _ = stdout_pump.await;
        let _ = stderr_pump.await;

        let _ = events
            .send(JobEvent::Exited {
                job,
                status,
                duration: started.elapsed(),
            })
            .await;
    })
}

/// Forward raw chunks from one stream until EOF.
///
/// A read error is ordinary stream termination: it ends the pump but never
/// the job, whose exit event still fires.
fn pump_stream<R>(
    job: JobId,
    source: StreamSource,
    stream: Option<R>,
    events: mpsc::Sender<JobEvent>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut stream) = stream else {
            return;
        };
        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = buf[..n].to_vec();
                    if events
                        .send(JobEvent::Data { job, source, chunk })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!("stream {:?} of job {} closed with error: {}", source, job, e);
                    break;
                }
            }
        }
    })
}

fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportOptions;

    fn template(program: &str, remote: &[&str]) -> CommandTemplate {
        let transport = TransportOptions {
            program: Some(program.to_string()),
            ..Default::default()
        };
        CommandTemplate::new(&transport, remote.iter().map(|s| s.to_string()).collect())
    }

    async fn drain(mut rx: mpsc::Receiver<JobEvent>) -> (Vec<u8>, Option<i32>) {
        let mut stdout = Vec::new();
        let mut status = None;
        while let Some(event) = rx.recv().await {
            match event {
                JobEvent::Data {
                    source: StreamSource::Stdout,
                    chunk,
                    ..
                } => stdout.extend_from_slice(&chunk),
                JobEvent::Data { .. } => {}
                JobEvent::Exited { status: code, .. } => {
                    status = Some(code);
                    break;
                }
            }
        }
        (stdout, status)
    }

    #[tokio::test]
    async fn streams_output_then_exit() {
        let (tx, rx) = mpsc::channel(16);
        // argv is `<host> <command...>`; echo prints both.
        let handle = spawn_job(0, "h1".to_string(), &template("echo", &["hello"]), tx);
        let (stdout, status) = drain(rx).await;
        handle.await.unwrap();
        assert_eq!(stdout, b"h1 hello\n");
        assert_eq!(status, Some(0));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported() {
        let (tx, rx) = mpsc::channel(16);
        // `false` ignores its arguments and exits 1.
        let handle = spawn_job(0, "h1".to_string(), &template("false", &["x"]), tx);
        let (_, status) = drain(rx).await;
        handle.await.unwrap();
        assert_eq!(status, Some(1));
    }

    #[tokio::test]
    async fn spawn_failure_reports_127() {
        let (tx, rx) = mpsc::channel(16);
        let handle = spawn_job(
            0,
            "h1".to_string(),
            &template("/nonexistent/transport-exe", &["x"]),
            tx,
        );
        let (stdout, status) = drain(rx).await;
        handle.await.unwrap();
        assert!(stdout.is_empty());
        assert_eq!(status, Some(SPAWN_FAILURE_STATUS));
    }
}
