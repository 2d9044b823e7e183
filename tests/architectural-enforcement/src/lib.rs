//! Architectural Enforcement
//!
//! Source scanners shared by the structural tests in `tests/`:
//! - No blocking I/O inside async functions
//! - No sleeping in production code
//! - Transcript mutation stays inside the store, the reply fold and the
//!   reset gate
//!
//! Only production code is scanned. Each source file is cut at its first
//! `#[cfg(test)]` line, since unit test modules sit at the end of a file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Source directories holding production code, relative to the workspace
pub const PRODUCTION_DIRS: &[&str] = &["chat/core/src", "chat/cli/src"];

/// Workspace root, resolved from this package's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// A production source file
#[derive(Debug)]
pub struct SourceFile {
    /// Path relative to the workspace root
    pub path: PathBuf,
    /// Lines before the test module
    pub lines: Vec<String>,
}

impl SourceFile {
    /// File name without directories
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }

    /// Production lines with comments stripped, numbered from 1
    pub fn code_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .map(|(idx, line)| (idx + 1, code_part(line)))
    }
}

/// Every `.rs` file under [`PRODUCTION_DIRS`]
///
/// # Panics
///
/// When a production directory is missing, so a moved crate cannot make
/// the scans pass vacuously.
#[must_use]
pub fn production_files() -> Vec<SourceFile> {
    let root = workspace_root();
    let mut files = Vec::new();

    for dir in PRODUCTION_DIRS {
        let base = root.join(dir);
        assert!(base.exists(), "missing production directory {dir}");

        for entry in walkdir::WalkDir::new(&base)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            let Ok(content) = fs::read_to_string(path) else {
                continue;
            };
            let lines = content
                .lines()
                .take_while(|line| !line.trim_start().starts_with("#[cfg(test)]"))
                .map(str::to_string)
                .collect();
            let relative = path.strip_prefix(&root).unwrap_or(path).to_path_buf();
            files.push(SourceFile {
                path: relative,
                lines,
            });
        }
    }

    files
}

/// The part of a line before any `//` comment
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Kind of function a line belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FnKind {
    /// Plain `fn`
    Sync,
    /// `async fn`
    Async,
}

/// Classify a line that declares a function, with any visibility prefix
#[must_use]
pub fn fn_declaration(line: &str) -> Option<FnKind> {
    let mut rest = code_part(line).trim();
    for prefix in ["pub(crate) ", "pub(super) ", "pub ", "const ", "unsafe "] {
        rest = rest.strip_prefix(prefix).unwrap_or(rest);
    }
    if rest.starts_with("async fn ") {
        Some(FnKind::Async)
    } else if rest.starts_with("fn ") {
        Some(FnKind::Sync)
    } else {
        None
    }
}

/// Nearest function declaration at or above `idx`
#[must_use]
pub fn enclosing_fn<S: AsRef<str>>(lines: &[S], idx: usize) -> Option<FnKind> {
    lines[..=idx.min(lines.len().saturating_sub(1))]
        .iter()
        .rev()
        .find_map(|line| fn_declaration(line.as_ref()))
}

/// A rule broken at a specific line
#[derive(Debug)]
pub struct Violation {
    /// File, relative to the workspace root
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Offending code
    pub code: String,
    /// Which rule
    pub reason: &'static str,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} - {}: {}",
            self.path.display(),
            self.line,
            self.reason,
            self.code.trim()
        )
    }
}

/// Panic with a readable list if any violation was found
///
/// # Panics
///
/// Whenever `violations` is non-empty.
pub fn assert_clean(title: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n{title}\n");
    for violation in violations {
        eprintln!("  {violation}");
    }
    panic!(
        "\nFound {} violation(s) in production code.",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_declaration() {
        assert_eq!(fn_declaration("fn main() {"), Some(FnKind::Sync));
        assert_eq!(
            fn_declaration("    pub async fn submit(&mut self) {"),
            Some(FnKind::Async)
        );
        assert_eq!(
            fn_declaration("pub(crate) fn mutate<R>(&self) -> R {"),
            Some(FnKind::Sync)
        );
        assert_eq!(fn_declaration("let f = || {"), None);
        assert_eq!(fn_declaration("// fn commented() {}"), None);
    }

    #[test]
    fn test_enclosing_fn() {
        let code = [
            "async fn bad() {",
            "    let x = std::fs::read_to_string(\"f\");",
            "}",
            "fn fine() {",
            "    let y = std::fs::read_to_string(\"g\");",
            "}",
        ];
        assert_eq!(enclosing_fn(&code, 1), Some(FnKind::Async));
        assert_eq!(enclosing_fn(&code, 4), Some(FnKind::Sync));
    }

    #[test]
    fn test_code_part_strips_comments() {
        assert_eq!(code_part("let a = 1; // std::fs::read"), "let a = 1; ");
    }

    #[test]
    fn test_production_files_found() {
        let files = production_files();
        assert!(files.iter().any(|f| f.file_name() == "store.rs"));
        assert!(files.iter().any(|f| f.file_name() == "main.rs"));
    }
}
