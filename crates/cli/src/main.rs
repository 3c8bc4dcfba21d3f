mod cmd;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cmd::{BuildArgs, cmd_build};

/// Cross-compile a Go project for a matrix of platforms.
#[derive(Parser)]
#[command(name = "pbuild", author, about, long_about = None, disable_version_flag = true)]
struct Cli {
  #[command(flatten)]
  build: BuildArgs,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_filter = if cli.build.verbose {
    "pbuild_lib=debug,pbuild=debug"
  } else {
    "warn"
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  cmd_build(&cli.build)
}
