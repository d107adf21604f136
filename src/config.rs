//! Validated run configuration.
//!
//! The CLI layer produces a `Config`; `validate` enforces every constraint
//! before any job is admitted, so a bad combination can never start work.

use crate::error::ConfigError;

/// How output from concurrently running hosts is aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Interleave at line granularity, each line prefixed with its host.
    #[default]
    Line,
    /// Stream raw chunks, emitting a host header only on host change.
    Group,
    /// Buffer everything, then print hosts grouped by identical output.
    Join,
}

/// Options forwarded to the transport executable's argument vector.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Transport executable, `ssh` unless overridden.
    pub program: Option<String>,
    pub identity_file: Option<String>,
    pub login_user: Option<String>,
    pub port: Option<u16>,
    /// Pass `-q` to the transport.
    pub quiet: bool,
    /// Pass `-o StrictHostKeyChecking=no`.
    pub no_strict_host_key_checking: bool,
}

/// The validated configuration record handed to the dispatcher.
#[derive(Debug, Clone)]
pub struct Config {
    pub max_concurrency: i64,
    pub output_mode: OutputMode,
    pub silent: bool,
    pub dry_run: bool,
    pub report_exit_codes: bool,
    pub transport: TransportOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            output_mode: OutputMode::default(),
            silent: false,
            dry_run: false,
            report_exit_codes: false,
            transport: TransportOptions::default(),
        }
    }
}

impl Config {
    /// Check cross-option constraints. Called once, before dispatch.
    pub fn validate(&self, command: &[String]) -> Result<(), ConfigError> {
        if self.max_concurrency < 1 {
            return Err(ConfigError::InvalidConcurrency(self.max_concurrency));
        }
        if self.output_mode == OutputMode::Join && self.silent {
            return Err(ConfigError::SilentJoin);
        }
        if command.is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        Ok(())
    }
}
