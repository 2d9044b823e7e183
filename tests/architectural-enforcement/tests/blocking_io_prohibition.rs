//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async functions in production code MUST NOT block the
//! runtime. Use `tokio::fs`, `tokio::io` and async `reqwest`, not
//! `std::fs`, `std::net`, `std::process` or `reqwest::blocking`.
//!
//! Blocking calls in plain `fn`s are acceptable: config loading runs before
//! the session starts.

use architectural_enforcement::{
    assert_clean, enclosing_fn, production_files, FnKind, Violation,
};

const FORBIDDEN: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("std::io::stdin()", "Blocking stdin"),
    ("std::io::stdout()", "Blocking stdout"),
    ("std::thread::sleep", "Blocking sleep"),
];

#[test]
fn test_no_blocking_io_in_async_functions() {
    let mut violations = Vec::new();

    for file in production_files() {
        for (number, code) in file.code_lines() {
            if code.contains("reqwest::blocking") {
                violations.push(Violation {
                    path: file.path.clone(),
                    line: number,
                    code: code.to_string(),
                    reason: "Blocking HTTP client",
                });
                continue;
            }

            let Some(&(_, reason)) = FORBIDDEN.iter().find(|(pattern, _)| code.contains(pattern))
            else {
                continue;
            };

            if enclosing_fn(&file.lines, number - 1) == Some(FnKind::Async) {
                violations.push(Violation {
                    path: file.path.clone(),
                    line: number,
                    code: code.to_string(),
                    reason,
                });
            }
        }
    }

    assert_clean("Blocking I/O inside async functions:", &violations);
}

#[test]
fn test_no_blocking_imports() {
    let mut violations = Vec::new();

    for file in production_files() {
        for (number, code) in file.code_lines() {
            let code = code.trim();
            if code.starts_with("use std::fs") || code.starts_with("use std::net") {
                violations.push(Violation {
                    path: file.path.clone(),
                    line: number,
                    code: code.to_string(),
                    reason: "Blocking module imported",
                });
            }
        }
    }

    assert_clean("Blocking modules imported in production code:", &violations);
}
