//! Shell script generation for the deletion plan.
//!
//! The script is the only artifact the engine writes. It lists, for every
//! duplicate set, the file that is kept (as a comment) followed by one `rm`
//! line per removable copy:
//!
//! ```text
//! #! /bin/bash
//! # >>>>> Extensions found in dupes: .jpg .mp4
//!
//! # Keep: "/volume1/photo/a/1.jpg"
//! rm "/volume1/photo/b/1.jpg"
//! ```
//!
//! Paths are absolute and double-quoted, with `\`, `"`, `$` and backtick
//! escaped. Script files are created with `create_new` and never overwrite
//! an existing file.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dedupe::output::ScriptOutput;
//!
//! let output = ScriptOutput::new(&plan);
//! let path = output.write_to_dir(Path::new("."))?;
//! ```

use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::plan::DeletionPlan;

/// Suffixes tried after the plain name is taken.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Formatter for the deletion script.
#[derive(Debug, Clone, Copy)]
pub struct ScriptOutput<'a> {
    /// The plan to render
    pub plan: &'a DeletionPlan,
}

impl<'a> ScriptOutput<'a> {
    /// Create a new script output formatter.
    #[must_use]
    pub fn new(plan: &'a DeletionPlan) -> Self {
        Self { plan }
    }

    /// Write the generated script to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "#! /bin/bash")?;
        writeln!(
            writer,
            "# >>>>> Extensions found in dupes: {}",
            self.plan.extensions_line()
        )?;

        for set in &self.plan.sets {
            writeln!(writer)?;
            writer.write_all(b"# Keep: ")?;
            writer.write_all(&quote_path(&set.keep().absolute_path, true))?;
            writeln!(writer)?;
            for file in set.removals() {
                writer.write_all(b"rm ")?;
                writer.write_all(&quote_path(&file.absolute_path, false))?;
                writeln!(writer)?;
            }
        }

        Ok(())
    }

    /// Write the script into `dir` under a fresh timestamped name.
    ///
    /// Returns the path of the created file. If the default name is taken,
    /// `-1`, `-2`, ... is appended before the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn write_to_dir(&self, dir: &Path) -> io::Result<PathBuf> {
        let base = self.plan.script_file_name();
        let stem = base.trim_end_matches(".sh");

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                base.clone()
            } else {
                format!("{stem}-{attempt}.sh")
            };
            let path = dir.join(name);

            match open_new_script(&path) {
                Ok(file) => {
                    let mut writer = BufWriter::new(file);
                    self.write_to(&mut writer)?;
                    writer.flush()?;
                    log::info!("Deletion script written to {}", path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    log::debug!("{} already exists, trying another name", path.display());
                }
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free script name for {base} in {}", dir.display()),
        ))
    }
}

#[cfg(unix)]
fn open_new_script(path: &Path) -> io::Result<std::fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o755)
        .open(path)
}

#[cfg(not(unix))]
fn open_new_script(path: &Path) -> io::Result<std::fs::File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;

    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    Cow::Owned(path.to_string_lossy().into_owned().into_bytes())
}

/// Double-quote a path for bash.
///
/// In comments, line breaks are written as `\n` and `\r` so the path cannot
/// end the comment early.
fn quote_path(path: &Path, in_comment: bool) -> Vec<u8> {
    let raw = path_bytes(path);
    let mut quoted = Vec::with_capacity(raw.len() + 2);
    quoted.push(b'"');
    for &byte in raw.iter() {
        match byte {
            b'\\' | b'"' | b'$' | b'`' => {
                quoted.push(b'\\');
                quoted.push(byte);
            }
            b'\n' if in_comment => quoted.extend_from_slice(b"\\n"),
            b'\r' if in_comment => quoted.extend_from_slice(b"\\r"),
            _ => quoted.push(byte),
        }
    }
    quoted.push(b'"');
    quoted
}
