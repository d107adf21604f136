//! # Scatter
//!
//! Run one command on many remote hosts concurrently, with bounded
//! parallelism and multiplexed output.
//!
//! ## Usage
//!
//! ```bash
//! scatter -f hosts.txt -m 20 uptime
//! echo web{1..9} | tr ' ' '\n' | scatter -j uname -r
//! ```
//!
//! ## Modules
//!
//! - `cli` - Command-line argument surface
//! - `config` - Validated run configuration and output modes
//! - `command` - Transport argument vector construction
//! - `dispatcher` - Bounded-concurrency event loop owning all run state
//! - `hosts` - Host list loading from file or stdin
//! - `runner` - Per-host transport process spawning and stream pumping
//! - `sink` - The three output aggregation policies (line, group, join)
//! - `splitter` - Incremental newline splitting over byte chunks
//! - `summary` - Drain-time grouping and progress reporting
pub mod cli;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod hosts;
pub mod runner;
pub mod sink;
pub mod splitter;
pub mod summary;
