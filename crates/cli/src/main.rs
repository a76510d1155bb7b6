mod cmd;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::print_error;

/// antbuild - package manifest-driven applications
#[derive(Parser)]
#[command(name = "antbuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build an application directory into a destination
  Build {
    /// Application source directory (contains index.xml)
    source: PathBuf,

    /// Output directory, replaced on every build
    destination: PathBuf,

    /// Minify scripts, strip dev blocks and formatting whitespace
    #[arg(long)]
    uglify: bool,

    /// Archive the output into <id>.app
    #[arg(long)]
    compress: bool,

    /// Toolchain file (default: $ANTBUILD_TOOLCHAIN or the user config file)
    #[arg(long)]
    toolchain: Option<PathBuf>,

    /// Print the build result as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show an application's scope, sections and tasks without building
  Inspect {
    /// Application source directory (contains index.xml)
    source: PathBuf,

    /// Print as JSON
    #[arg(long)]
    json: bool,
  },
}

fn init_logging(verbose: bool) {
  let default = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let result = match cli.command {
    Commands::Build {
      source,
      destination,
      uglify,
      compress,
      toolchain,
      json,
    } => cmd::cmd_build(
      &cmd::BuildArgs {
        source,
        destination,
        uglify,
        compress,
        toolchain,
      },
      json,
      cli.verbose,
    ),
    Commands::Inspect { source, json } => cmd::cmd_inspect(&source, json),
  };

  if let Err(e) = result {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}
