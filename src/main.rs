use clap::Parser;
use scatter::cli::Cli;
use scatter::config::{Config, OutputMode};
use scatter::sink::{GroupSink, JoinSink, LineSink, OutputSink};
use scatter::{dispatcher, hosts};
use std::io;
use tracing::debug;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(io::stderr)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("scatter started with verbosity level: {}", cli.verbose);

    match run(cli).await {
        Ok(status_sum) => std::process::exit(status_sum),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = cli.to_config();
    config.validate(&cli.command)?;
    let hosts = hosts::load_hosts(cli.file.as_deref())?;
    let mut sink = build_sink(&config, hosts.len());
    let summary = dispatcher::run(&config, hosts, cli.command, sink.as_mut()).await?;
    Ok(summary.status_sum)
}

fn build_sink(config: &Config, total: usize) -> Box<dyn OutputSink> {
    match config.output_mode {
        OutputMode::Line => Box::new(LineSink::new(
            io::stdout(),
            io::stderr(),
            config.silent,
            config.report_exit_codes,
        )),
        OutputMode::Group => Box::new(GroupSink::new(
            io::stdout(),
            io::stderr(),
            config.silent,
            config.report_exit_codes,
        )),
        OutputMode::Join => Box::new(JoinSink::new(
            io::stdout(),
            io::stderr(),
            total,
            config.report_exit_codes,
        )),
    }
}
