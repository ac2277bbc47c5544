//! pulse-one CLI 진입점

use anyhow::Result;
use clap::Parser;
use tracing::Level;

fn main() -> Result<()> {
    let cli = pulse_one::cli::Cli::parse();

    // 로깅 초기화 (RUST_LOG 우선, 기본 INFO / --verbose 시 DEBUG)
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(pulse_one::cli::run(cli))
}
