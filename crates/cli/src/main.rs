use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::build::build;
use crate::serve::serve;

mod build;
mod config;
mod js;
mod log;
mod manifest;
mod report;
mod serve;

/// Build and serve the dashboard page
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print extra information while working
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Colorize output
    #[arg(long, global = true, value_enum, default_value_t = When::Auto)]
    color: When,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the page into the dist directory
    #[command(visible_alias = "b")]
    Build(Build),

    /// Start a local development server
    #[command(visible_alias = "s")]
    Serve(Serve),
}

#[derive(Debug, Clone, Args)]
struct Build {
    /// Build with optimizations
    #[arg(short, long)]
    release: bool,

    /// Output directory relative to the package root, overrides `package.metadata.dashboard.dist`
    #[arg(short, long)]
    dist: Option<PathBuf>,

    /// Embed the auto-reload script into index.html
    #[arg(long, value_enum, default_value_t = When::Auto)]
    autoreload: When,
}

#[derive(Debug, Args)]
struct Serve {
    #[command(flatten)]
    build: Build,

    /// Port to listen on, overrides `package.metadata.dashboard.port`
    #[arg(short, long)]
    port: Option<u16>,

    /// Don't rebuild when sources change
    #[arg(long)]
    no_watch: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum When {
    Auto,
    Always,
    Never,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        log::enable_verbose_output();
    }

    let color = match cli.color {
        When::Auto => log::stderr_is_tty(),
        When::Always => true,
        When::Never => false,
    };

    if color {
        log::enable_color_output();
    }

    let res = match &cli.command {
        Command::Build(b) => build(b).map(drop),
        Command::Serve(s) => serve(s),
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
