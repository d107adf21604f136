//! Command-line surface.
//!
//! Parsing only; every cross-option constraint that clap cannot express
//! lives in [`Config::validate`](crate::config::Config::validate).

use crate::config::{Config, OutputMode, TransportOptions};
use clap::Parser;
use std::path::PathBuf;

/// Run a command on many hosts in parallel over ssh.
#[derive(Parser, Debug)]
#[command(name = "scatter", version, about, long_about = None)]
pub struct Cli {
    /// Maximum number of jobs to run concurrently
    #[arg(short = 'm', long = "max-jobs", default_value_t = 10, value_name = "N")]
    pub max_jobs: i64,

    /// Host list file, one host per line (stdin when omitted)
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Group output by host as it streams
    #[arg(short = 'g', long, conflicts_with = "join")]
    pub group: bool,

    /// Buffer all output, then join hosts with identical output
    #[arg(short = 'j', long)]
    pub join: bool,

    /// Suppress remote output
    #[arg(short = 's', long)]
    pub silent: bool,

    /// Print the invocations without running anything
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Report each host's exit code as it completes
    #[arg(short = 'e', long = "exit-codes")]
    pub exit_codes: bool,

    /// Identity file passed to ssh as -i
    #[arg(short = 'i', long, value_name = "FILE")]
    pub identity: Option<String>,

    /// Login user passed to ssh as -l
    #[arg(short = 'l', long, value_name = "USER")]
    pub login: Option<String>,

    /// Port passed to ssh as -p
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Pass -q to ssh
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Pass -o StrictHostKeyChecking=no to ssh
    #[arg(long = "no-strict")]
    pub no_strict: bool,

    /// Transport executable to invoke instead of ssh
    #[arg(long = "ssh-exe", value_name = "PATH")]
    pub ssh_exe: Option<String>,

    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Command to run on each host
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Cli {
    pub fn to_config(&self) -> Config {
        let output_mode = if self.join {
            OutputMode::Join
        } else if self.group {
            OutputMode::Group
        } else {
            OutputMode::Line
        };
        Config {
            max_concurrency: self.max_jobs,
            output_mode,
            silent: self.silent,
            dry_run: self.dry_run,
            report_exit_codes: self.exit_codes,
            transport: TransportOptions {
                program: self.ssh_exe.clone(),
                identity_file: self.identity.clone(),
                login_user: self.login.clone(),
                port: self.port,
                quiet: self.quiet,
                no_strict_host_key_checking: self.no_strict,
            },
        }
    }
}
