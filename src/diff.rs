use std::{io::Write as _, path::Path, process::Command};

use anyhow::{Context as _, Result, anyhow, bail};
use log::debug;
use tempfile::NamedTempFile;

use crate::slash_path::{orig_label, to_slash};

/// Produce a unified diff between `original` and `modified` using the system
/// `diff -u`, with the header lines relabelled as `<filename>.orig` and
/// `<filename>`.
///
/// Both temporary files are removed when this returns, on every path.
pub fn unified_diff(original: &[u8], modified: &[u8], filename: &Path) -> Result<Vec<u8>> {
    run_diff("diff", &std::env::temp_dir(), original, modified, filename)
}

fn run_diff(
    program: &str,
    temp_dir: &Path,
    original: &[u8],
    modified: &[u8],
    filename: &Path,
) -> Result<Vec<u8>> {
    let original_file = write_temp_file(temp_dir, original)?;
    let modified_file = write_temp_file(temp_dir, modified)?;

    debug!(
        "Running {program} -u {} {}",
        original_file.path().display(),
        modified_file.path().display()
    );

    let output = Command::new(program)
        .arg("-u")
        .arg(original_file.path())
        .arg(modified_file.path())
        .output()
        .with_context(|| anyhow!("Failed to run {program} -u"))?;

    // diff exits with 1 when the files differ, which is the expected case.
    // Anything else means it couldn't compare them.
    if !output.status.success() && output.status.code() != Some(1) {
        bail!(
            "{program} -u failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let mut combined = output.stdout;
    combined.extend_from_slice(&output.stderr);

    replace_temp_filenames(&combined, filename)
}

fn write_temp_file(dir: &Path, contents: &[u8]) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("nwn")
        .tempfile_in(dir)
        .context("Failed to create temporary file")?;
    file.write_all(contents)
        .and_then(|()| file.flush())
        .with_context(|| anyhow!("Failed to write temporary file {:?}", file.path()))?;
    Ok(file)
}

/// Replace the temporary filenames in the first two lines of a diff with the
/// real one, keeping the timestamps:
///
/// ```text
/// --- /tmp/nwnAbC123	2024-02-03 19:13:00.280468375 -0500
/// +++ /tmp/nwnXyZ789	2024-02-03 19:13:00.280468375 -0500
/// ```
///
/// becomes
///
/// ```text
/// --- path/to/file.txt.orig	2024-02-03 19:13:00.280468375 -0500
/// +++ path/to/file.txt	2024-02-03 19:13:00.280468375 -0500
/// ```
pub fn replace_temp_filenames(diff: &[u8], filename: &Path) -> Result<Vec<u8>> {
    let mut lines = diff.splitn(3, |&b| b == b'\n');
    let (Some(line_0), Some(line_1), Some(rest)) = (lines.next(), lines.next(), lines.next())
    else {
        bail!("got unexpected diff for {}", filename.display());
    };

    let timestamp = |line: &[u8]| -> Vec<u8> {
        memchr::memrchr(b'\t', line)
            .map(|i| line[i..].to_vec())
            .unwrap_or_default()
    };

    let mut out = Vec::with_capacity(diff.len() + 2 * filename.as_os_str().len());
    out.extend_from_slice(format!("--- {}", orig_label(filename)).as_bytes());
    out.extend_from_slice(&timestamp(line_0));
    out.push(b'\n');
    out.extend_from_slice(format!("+++ {}", to_slash(filename)).as_bytes());
    out.extend_from_slice(&timestamp(line_1));
    out.push(b'\n');
    out.extend_from_slice(rest);
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_replace_temp_filenames() {
        let diff = b"--- /tmp/nwn316145376\t2017-02-03 19:13:00.280468375 -0500\n\
                     +++ /tmp/nwn617882815\t2017-02-03 19:13:00.280468375 -0500\n\
                     @@ -1 +1 @@\n\
                     -a \n\
                     +a\n";
        let replaced = replace_temp_filenames(diff, "dir/file.txt".as_ref()).unwrap();
        assert_eq!(
            String::from_utf8(replaced).unwrap(),
            "--- dir/file.txt.orig\t2017-02-03 19:13:00.280468375 -0500\n\
             +++ dir/file.txt\t2017-02-03 19:13:00.280468375 -0500\n\
             @@ -1 +1 @@\n\
             -a \n\
             +a\n"
        );
    }

    #[test]
    fn test_replace_temp_filenames_without_timestamps() {
        let diff = b"--- a\n+++ b\n";
        let replaced = replace_temp_filenames(diff, "f".as_ref()).unwrap();
        assert_eq!(replaced, b"--- f.orig\n+++ f\n");
    }

    #[test]
    fn test_replace_temp_filenames_too_short() {
        for diff in [&b""[..], b"--- only one line", b"--- a\n+++ b"] {
            let err = replace_temp_filenames(diff, "f.txt".as_ref()).unwrap_err();
            assert_eq!(err.to_string(), "got unexpected diff for f.txt");
        }
    }

    #[test]
    fn test_unified_diff() {
        let diff = unified_diff(b"a \nb\t\nc\n", b"a\nb\nc\n", "some/file.txt".as_ref()).unwrap();
        let diff = String::from_utf8(diff).unwrap();
        let lines: Vec<&str> = diff.lines().collect();
        assert!(lines[0].starts_with("--- some/file.txt.orig"), "{diff}");
        assert!(lines[1].starts_with("+++ some/file.txt"), "{diff}");
        assert!(lines.contains(&"-a "), "{diff}");
        assert!(lines.contains(&"+a"), "{diff}");
        assert!(lines.contains(&"-b\t"), "{diff}");
        assert!(lines.contains(&"+b"), "{diff}");
        assert!(lines.contains(&" c"), "{diff}");
    }

    fn assert_empty(dir: &Path) {
        let left: Vec<_> = std::fs::read_dir(dir).unwrap().collect();
        assert!(left.is_empty(), "{left:?}");
    }

    #[test]
    fn test_temp_files_removed_on_success() {
        let dir = tempfile::TempDir::new().unwrap();
        let diff = run_diff("diff", dir.path(), b"a \n", b"a\n", "f.txt".as_ref()).unwrap();
        assert!(diff.starts_with(b"--- f.txt.orig"));
        assert_empty(dir.path());
    }

    #[test]
    fn test_missing_diff_program() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = run_diff(
            "nwn-no-such-diff-program",
            dir.path(),
            b"a \n",
            b"a\n",
            "f.txt".as_ref(),
        )
        .unwrap_err();
        assert!(
            err.to_string()
                .starts_with("Failed to run nwn-no-such-diff-program -u"),
            "{err:#}"
        );
        assert_empty(dir.path());
    }

    #[cfg(unix)]
    #[test]
    fn test_diff_program_without_output() {
        // `false` exits 1 like a real diff but prints nothing.
        let dir = tempfile::TempDir::new().unwrap();
        let err = run_diff("false", dir.path(), b"a \n", b"a\n", "f.txt".as_ref()).unwrap_err();
        assert_eq!(err.to_string(), "got unexpected diff for f.txt");
        assert_empty(dir.path());
    }

    #[cfg(unix)]
    #[test]
    fn test_diff_program_trouble_status() {
        // `sh -u <file> <file>` runs the first file as a script; `a` isn't a
        // command so it exits 127, which is neither "same" nor "different".
        let dir = tempfile::TempDir::new().unwrap();
        let err = run_diff("sh", dir.path(), b"a \n", b"a\n", "f.txt".as_ref()).unwrap_err();
        assert!(err.to_string().starts_with("sh -u failed"), "{err:#}");
        assert_empty(dir.path());
    }
}
