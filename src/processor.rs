use std::{
    borrow::Cow,
    fs,
    io::{Read as _, Write},
    path::Path,
};

use anyhow::{Context as _, Result, anyhow};
use log::{debug, info};
use walkdir::WalkDir;

use crate::{
    diff::unified_diff,
    normalize::strip_trailing_whitespace,
    slash_path::{orig_label, to_slash},
    sniff::is_image,
    status::ExitStatus,
};

/// What to do with files that have trailing whitespace.
#[derive(Clone, Copy, Debug, Default)]
pub struct Mode {
    /// Rewrite the file in place.
    pub write: bool,
    /// Print a unified diff.
    pub diff: bool,
}

impl Mode {
    /// Neither flag set: the (possibly fixed) content goes to the output.
    fn print_contents(self) -> bool {
        !self.write && !self.diff
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    SkippedImage,
    Unchanged,
    Changed,
}

impl From<Outcome> for ExitStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::SkippedImage | Outcome::Unchanged => ExitStatus::Clean,
            Outcome::Changed => ExitStatus::Changed,
        }
    }
}

/// Receives per-path errors. Reporting one never stops the run.
pub trait Reporter {
    fn report(&mut self, path: &Path, error: &anyhow::Error);
}

/// Process a single file.
pub fn process_file(path: &Path, mode: Mode, out: &mut impl Write) -> Result<Outcome> {
    let mut file =
        fs::File::open(path).with_context(|| anyhow!("Failed to open {}", path.display()))?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)
        .with_context(|| anyhow!("Failed to read {}", path.display()))?;
    drop(file);

    if is_image(&contents) {
        info!("Skipping image {}", path.display());
        writeln!(out, "skip image file {}", path.display())
            .context("Failed to write to output")?;
        return Ok(Outcome::SkippedImage);
    }

    // Borrowed means no match, so the content is byte-identical.
    let Cow::Owned(stripped) = strip_trailing_whitespace(&contents) else {
        if mode.print_contents() {
            out.write_all(&contents).context("Failed to write to output")?;
        }
        return Ok(Outcome::Unchanged);
    };

    if mode.write {
        write_preserving_permissions(path, &stripped)?;
        info!("Fixed {}", path.display());
    }

    if mode.diff {
        let diff = unified_diff(&contents, &stripped, path).context("failed to diff")?;
        writeln!(out, "diff -u {} {}", orig_label(path), to_slash(path))
            .and_then(|()| out.write_all(&diff))
            .context("Failed to write to output")?;
    }

    if mode.print_contents() {
        out.write_all(&stripped).context("Failed to write to output")?;
    }

    Ok(Outcome::Changed)
}

/// Overwrite `path`, keeping whatever permission bits it had. If they can't
/// be read the file is written anyway and keeps whatever the OS gives it.
fn write_preserving_permissions(path: &Path, contents: &[u8]) -> Result<()> {
    let permissions = fs::metadata(path).map(|m| m.permissions()).ok();
    if permissions.is_none() {
        debug!("Couldn't read permissions of {}", path.display());
    }

    fs::write(path, contents).with_context(|| anyhow!("Failed to write {}", path.display()))?;

    if let Some(permissions) = permissions {
        fs::set_permissions(path, permissions)
            .with_context(|| anyhow!("Failed to set permissions on {}", path.display()))?;
    }
    Ok(())
}

fn process_and_report(
    path: &Path,
    mode: Mode,
    out: &mut impl Write,
    reporter: &mut impl Reporter,
) -> ExitStatus {
    debug!("Processing {}", path.display());
    match process_file(path, mode, out) {
        Ok(outcome) => outcome.into(),
        Err(error) => {
            reporter.report(path, &error);
            ExitStatus::Error
        }
    }
}

/// Process a path given on the command line: a single file, or every
/// regular file under a directory. Returns the combined status for the path.
pub fn visit_path(
    path: &Path,
    mode: Mode,
    out: &mut impl Write,
    reporter: &mut impl Reporter,
) -> ExitStatus {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(error) => {
            let error =
                anyhow::Error::new(error).context(format!("Failed to stat {}", path.display()));
            reporter.report(path, &error);
            return ExitStatus::Error;
        }
    };

    if !metadata.is_dir() {
        return process_and_report(path, mode, out, reporter);
    }

    let mut status = ExitStatus::Clean;
    for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                status.escalate(process_and_report(entry.path(), mode, out, reporter));
            }
            // Links are followed to files but never descended into.
            Ok(entry) if entry.path_is_symlink() => match fs::metadata(entry.path()) {
                Ok(target) if target.is_file() => {
                    status.escalate(process_and_report(entry.path(), mode, out, reporter));
                }
                Ok(_) => {
                    debug!("Skipping {} (link to a directory)", entry.path().display());
                }
                Err(error) => {
                    let error = anyhow::Error::new(error)
                        .context(format!("Failed to follow link {}", entry.path().display()));
                    reporter.report(entry.path(), &error);
                    status.escalate(ExitStatus::Error);
                }
            },
            Ok(entry) => {
                debug!("Skipping {} (not a regular file)", entry.path().display());
            }
            Err(error) => {
                let error_path = error.path().unwrap_or(path).to_owned();
                reporter.report(&error_path, &anyhow::Error::new(error));
                status.escalate(ExitStatus::Error);
            }
        }
    }
    status
}
