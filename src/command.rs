//! Transport argument vector construction.
//!
//! The template is built once from the transport options and shared by every
//! job; only the host and the remote command vary per invocation. The
//! transport's protocol is never inspected here, we only hand it argv.

use crate::config::TransportOptions;

const DEFAULT_TRANSPORT: &str = "ssh";

/// Argument vector template shared by all jobs in a run.
#[derive(Debug, Clone)]
pub struct CommandTemplate {
    program: String,
    base_args: Vec<String>,
    remote_command: Vec<String>,
}

impl CommandTemplate {
    pub fn new(transport: &TransportOptions, remote_command: Vec<String>) -> Self {
        let mut base_args = Vec::new();
        if transport.quiet {
            base_args.push("-q".to_string());
        }
        if let Some(identity) = &transport.identity_file {
            base_args.push("-i".to_string());
            base_args.push(identity.clone());
        }
        if let Some(port) = transport.port {
            base_args.push("-p".to_string());
            base_args.push(port.to_string());
        }
        if let Some(login) = &transport.login_user {
            base_args.push("-l".to_string());
            base_args.push(login.clone());
        }
        if transport.no_strict_host_key_checking {
            base_args.push("-o".to_string());
            base_args.push("StrictHostKeyChecking=no".to_string());
        }

        Self {
            program: transport
                .program
                .clone()
                .unwrap_or_else(|| DEFAULT_TRANSPORT.to_string()),
            base_args,
            remote_command,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument list for one host: base flags, host, remote command.
    pub fn args_for(&self, host: &str) -> Vec<String> {
        let mut args =
            Vec::with_capacity(self.base_args.len() + 1 + self.remote_command.len());
        args.extend(self.base_args.iter().cloned());
        args.push(host.to_string());
        args.extend(self.remote_command.iter().cloned());
        args
    }

    /// Rendering of the full invocation for dry-run and debug logging.
    pub fn render(&self, host: &str) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args_for(host));
        parts.join(" ")
    }
}
