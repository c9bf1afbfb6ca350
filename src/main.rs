mod diff;
mod normalize;
mod processor;
mod slash_path;
mod sniff;
mod status;

use std::{
    io::{BufWriter, IsTerminal as _, Write as _},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, ValueEnum};
use env_logger::{Builder, Env};
use log::debug;
use owo_colors::OwoColorize;
use processor::{Mode, Reporter, visit_path};
use status::ExitStatus;

#[derive(Parser)]
#[command(
    name = "nwn",
    version,
    about = "Strip trailing whitespace from the ends of lines"
)]
struct Cli {
    /// Write result to (source) file instead of stdout.
    #[arg(short = 'w')]
    write: bool,

    /// Display diffs instead of rewriting files.
    #[arg(short = 'd')]
    diff: bool,

    #[arg(long, default_value_t = ColorOutput::Auto)]
    color: ColorOutput,

    /// Log each file as it is processed.
    #[arg(short, long)]
    verbose: bool,

    /// Files or directories to process. Directories are walked recursively.
    paths: Vec<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy)]
enum ColorOutput {
    Auto,
    Always,
    Never,
}

impl std::fmt::Display for ColorOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorOutput::Auto => write!(f, "auto"),
            ColorOutput::Always => write!(f, "always"),
            ColorOutput::Never => write!(f, "never"),
        }
    }
}

impl ColorOutput {
    fn enabled_for_stderr(self) -> bool {
        match self {
            ColorOutput::Auto => std::io::stderr().is_terminal(),
            ColorOutput::Always => true,
            ColorOutput::Never => false,
        }
    }
}

/// Prints one line per error to stderr.
struct StderrReporter {
    color: bool,
}

impl Reporter for StderrReporter {
    fn report(&mut self, path: &Path, error: &anyhow::Error) {
        if self.color {
            eprintln!("{}: {}: {error:#}", "error".red(), path.display());
        } else {
            eprintln!("error: {}: {error:#}", path.display());
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let env = Env::new()
        .filter_or("NWN_LOG", default_level)
        .write_style("NWN_LOG_STYLE");
    Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .init();

    let mode = Mode {
        write: cli.write,
        diff: cli.diff,
    };
    let mut reporter = StderrReporter {
        color: cli.color.enabled_for_stderr(),
    };

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let mut status = ExitStatus::Clean;
    for path in &cli.paths {
        status.escalate(visit_path(path, mode, &mut out, &mut reporter));
    }

    if let Err(error) = out.flush() {
        reporter.report(Path::new("<stdout>"), &anyhow::Error::new(error));
        status.escalate(ExitStatus::Error);
    }

    debug!("Finished with status {status}");
    status.into()
}
