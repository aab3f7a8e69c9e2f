use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Result, StandingError};

pub const FIELD_SEPARATOR: char = '|';

/// A delimited text ledger that is always read and written as a whole.
///
/// Every mutation is load-modify-rewrite. There is no locking: two processes
/// rewriting the same ledger concurrently can silently lose one update, so
/// callers must keep to a single writer per file.
#[derive(Debug, Clone)]
pub struct LedgerFile {
    path: PathBuf,
    header: Option<&'static str>,
}

impl LedgerFile {
    pub fn new(path: impl Into<PathBuf>, header: Option<&'static str>) -> Self {
        Self {
            path: path.into(),
            header,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the body lines with their 1-based line numbers, for queries.
    ///
    /// A missing or unreadable file degrades to an empty body. Blank lines
    /// are dropped. If the first line is not the expected header it is
    /// logged and kept as a body line.
    pub fn read_body(&self) -> Vec<(usize, String)> {
        match self.read_contents() {
            Ok(contents) => self.body_lines(&contents),
            Err(e) => {
                warn!("Could not read ledger {}: {}; treating as empty", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Read the body before a rewrite.
    ///
    /// Only a missing file counts as empty. Any other read failure is
    /// returned, and the caller must not rewrite the ledger.
    pub fn load_for_update(&self) -> Result<Vec<(usize, String)>> {
        let contents = self
            .read_contents()
            .map_err(|e| StandingError::storage(&self.path, e))?;
        Ok(self.body_lines(&contents))
    }

    fn read_contents(&self) -> io::Result<String> {
        match fs::read_to_string(&self.path) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Ledger {} does not exist yet, treating as empty", self.path.display());
                Ok(String::new())
            }
            other => other,
        }
    }

    fn body_lines(&self, contents: &str) -> Vec<(usize, String)> {
        let mut body = Vec::new();
        let mut header_checked = self.header.is_none();

        for (idx, raw) in contents.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            if !header_checked {
                header_checked = true;
                if Some(line.trim()) == self.header {
                    continue;
                }
                warn!(
                    "Ledger {} is missing its header, reading line {} as data",
                    self.path.display(),
                    idx + 1
                );
            }

            body.push((idx + 1, line.to_string()));
        }

        body
    }

    /// Replace the whole file with the header followed by `body`.
    ///
    /// The new contents are written to a temporary file beside the ledger
    /// and renamed over it. Failures are returned, never swallowed.
    pub fn rewrite(&self, body: &[String]) -> Result<()> {
        let dir = self.parent_dir();
        fs::create_dir_all(&dir).map_err(|e| StandingError::storage(&self.path, e))?;

        let mut contents = String::new();
        if let Some(header) = self.header {
            contents.push_str(header);
            contents.push('\n');
        }
        for line in body {
            contents.push_str(line);
            contents.push('\n');
        }

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| StandingError::storage(&self.path, e))?;
        tmp.write_all(contents.as_bytes())
            .map_err(|e| StandingError::storage(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| StandingError::storage(&self.path, e.error))?;

        debug!("Rewrote ledger {} ({} lines)", self.path.display(), body.len());
        Ok(())
    }

    /// Create the ledger with only its header if it does not exist.
    /// Returns `true` when a new file was written.
    pub fn ensure_exists(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.rewrite(&[])?;
        Ok(true)
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Split a ledger line into trimmed fields.
pub fn split_fields(line: &str) -> Vec<&str> {
    line.split(FIELD_SEPARATOR).map(str::trim).collect()
}

/// Strip characters that would break the line-and-pipe layout.
pub fn sanitize_field(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            FIELD_SEPARATOR => '/',
            '\r' | '\n' => ' ',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
